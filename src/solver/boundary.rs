use super::mesh::Mesh;
use super::types::{FaceId, Linear, Scalar, Vector};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryConditionType {
    /// Dirichlet.
    FixedValue,
    /// Neumann, gradient along the outward face normal.
    FixedGradient,
}

impl BoundaryConditionType {
    pub fn as_str(self) -> &'static str {
        match self {
            BoundaryConditionType::FixedValue => "fixedValue",
            BoundaryConditionType::FixedGradient => "fixedGradient",
        }
    }
}

impl std::str::FromStr for BoundaryConditionType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "fixedValue" | "fixed_value" => Ok(BoundaryConditionType::FixedValue),
            "fixedGradient" | "fixed_gradient" => Ok(BoundaryConditionType::FixedGradient),
            _ => Err(format!("unknown boundary condition type: {}", value)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundaryCondition<T> {
    pub kind: BoundaryConditionType,
    pub value: T,
}

impl<T> BoundaryCondition<T> {
    pub fn fixed_value(value: T) -> Self {
        Self {
            kind: BoundaryConditionType::FixedValue,
            value,
        }
    }

    pub fn fixed_gradient(value: T) -> Self {
        Self {
            kind: BoundaryConditionType::FixedGradient,
            value,
        }
    }

    pub fn is_fixed_value(&self) -> bool {
        self.kind == BoundaryConditionType::FixedValue
    }
}

impl<T: Linear> BoundaryCondition<T> {
    pub fn zero_gradient() -> Self {
        Self::fixed_gradient(T::zero())
    }
}

/// Velocity and pressure conditions attached to one boundary face.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Boundaries {
    pub velocity: BoundaryCondition<Vector>,
    pub pressure: BoundaryCondition<Scalar>,
}

impl Boundaries {
    pub fn new(velocity: BoundaryCondition<Vector>, pressure: BoundaryCondition<Scalar>) -> Self {
        Self { velocity, pressure }
    }

    /// No-slip stationary wall.
    pub fn wall() -> Self {
        Self::moving_wall(Vector::zeros())
    }

    /// No-slip wall sliding with `velocity`.
    pub fn moving_wall(velocity: Vector) -> Self {
        Self {
            velocity: BoundaryCondition::fixed_value(velocity),
            pressure: BoundaryCondition::zero_gradient(),
        }
    }

    /// Prescribed inflow velocity.
    pub fn inlet(velocity: Vector) -> Self {
        Self {
            velocity: BoundaryCondition::fixed_value(velocity),
            pressure: BoundaryCondition::zero_gradient(),
        }
    }

    /// Prescribed static pressure with fully developed velocity.
    pub fn outlet(pressure: Scalar) -> Self {
        Self {
            velocity: BoundaryCondition::zero_gradient(),
            pressure: BoundaryCondition::fixed_value(pressure),
        }
    }

    /// Same conditions as [`Boundaries::outlet`]; reads better on the upstream end of a
    /// pressure-driven channel.
    pub fn pressure_inlet(pressure: Scalar) -> Self {
        Self::outlet(pressure)
    }
}

impl Default for Boundaries {
    fn default() -> Self {
        Self::wall()
    }
}

/// Velocity conditions as stored on the mesh.
pub fn velocity_boundaries(mesh: &Mesh) -> impl Fn(FaceId) -> BoundaryCondition<Vector> + Sync + '_ {
    move |face| mesh.face_boundaries(face).velocity
}

/// Pressure conditions as stored on the mesh.
pub fn pressure_boundaries(mesh: &Mesh) -> impl Fn(FaceId) -> BoundaryCondition<Scalar> + Sync + '_ {
    move |face| mesh.face_boundaries(face).pressure
}

/// Homogeneous version of the pressure conditions, for the pressure correction.
///
/// Each face keeps its condition type; the value is zero, so fixed pressures get a
/// zero correction and gradient faces get a zero correction gradient.
pub fn pressure_correction_boundaries(
    mesh: &Mesh,
) -> impl Fn(FaceId) -> BoundaryCondition<Scalar> + Sync + '_ {
    move |face| BoundaryCondition {
        kind: mesh.face_boundaries(face).pressure.kind,
        value: 0.0,
    }
}

/// Zero normal gradient on every boundary, for auxiliary fields (VbyA, cell gradients).
pub fn zero_gradient_boundaries<T: Linear>(_face: FaceId) -> BoundaryCondition<T> {
    BoundaryCondition::zero_gradient()
}
