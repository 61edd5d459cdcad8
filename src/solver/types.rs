use nalgebra::{Matrix2, Vector2};
use std::fmt::Debug;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

pub type Scalar = f64;
pub type Vector = Vector2<f64>;
pub type Tensor = Matrix2<f64>;

pub type CellId = usize;
pub type FaceId = usize;

/// Values that can be summed and scaled: the bias and coefficient types of a stencil.
pub trait Linear:
    Copy
    + Debug
    + PartialEq
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Neg<Output = Self>
    + Mul<Scalar, Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign<Scalar>
{
    fn zero() -> Self;

    /// Largest absolute component.
    fn max_abs(&self) -> Scalar;

    fn is_finite(&self) -> bool;
}

impl Linear for Scalar {
    fn zero() -> Self {
        0.0
    }

    fn max_abs(&self) -> Scalar {
        self.abs()
    }

    fn is_finite(&self) -> bool {
        f64::is_finite(*self)
    }
}

impl Linear for Vector {
    fn zero() -> Self {
        Vector::zeros()
    }

    fn max_abs(&self) -> Scalar {
        self.x.abs().max(self.y.abs())
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Linear for Tensor {
    fn zero() -> Self {
        Tensor::zeros()
    }

    fn max_abs(&self) -> Scalar {
        self.iter().fold(0.0, |acc, v| acc.max(v.abs()))
    }

    fn is_finite(&self) -> bool {
        self.iter().all(|v| v.is_finite())
    }
}

/// Outer product with type promotion.
///
/// The closed table is Scalar x Scalar -> Scalar, Scalar x Vector -> Vector,
/// Vector x Scalar -> Vector and Vector x Vector -> Tensor (`u * v^T`).
pub trait Product<Rhs> {
    type Output: Linear;

    fn product(self, rhs: Rhs) -> Self::Output;
}

impl Product<Scalar> for Scalar {
    type Output = Scalar;

    fn product(self, rhs: Scalar) -> Scalar {
        self * rhs
    }
}

impl Product<Vector> for Scalar {
    type Output = Vector;

    fn product(self, rhs: Vector) -> Vector {
        rhs * self
    }
}

impl Product<Scalar> for Vector {
    type Output = Vector;

    fn product(self, rhs: Scalar) -> Vector {
        self * rhs
    }
}

impl Product<Vector> for Vector {
    type Output = Tensor;

    fn product(self, rhs: Vector) -> Tensor {
        self * rhs.transpose()
    }
}

/// Gradient of a field value: Vector for scalar fields, Tensor for vector fields.
pub type GradientOf<T> = <T as Product<Vector>>::Output;

/// A per-cell unknown (pressure or velocity).
pub trait FieldValue: Linear + Product<Scalar, Output = Self> + Product<Vector> {
    /// Directional derivative `grad . direction`.
    fn contract(gradient: GradientOf<Self>, direction: Vector) -> Self;

    /// Applies a symmetric 2x2 metric to the spatial index of a gradient.
    fn transform_gradient(gradient: GradientOf<Self>, metric: &Tensor) -> GradientOf<Self>;
}

impl FieldValue for Scalar {
    fn contract(gradient: Vector, direction: Vector) -> Scalar {
        gradient.dot(&direction)
    }

    fn transform_gradient(gradient: Vector, metric: &Tensor) -> Vector {
        metric * gradient
    }
}

impl FieldValue for Vector {
    fn contract(gradient: Tensor, direction: Vector) -> Vector {
        gradient * direction
    }

    fn transform_gradient(gradient: Tensor, metric: &Tensor) -> Tensor {
        gradient * metric.transpose()
    }
}

/// Largest absolute component over a whole field.
pub fn field_max_abs<T: Linear>(field: &[T]) -> Scalar {
    field.iter().fold(0.0, |acc, v| acc.max(v.max_abs()))
}
