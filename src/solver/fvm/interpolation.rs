use crate::solver::boundary::{BoundaryCondition, BoundaryConditionType};
use crate::solver::linear_combination::LinearCombination;
use crate::solver::mesh::{
    cell_to_cell_unit_vector, distance_cell_to_cell, distance_cell_to_face,
    distance_cell_to_face_in_direction, Mesh,
};
use crate::solver::types::{FaceId, FieldValue};

/// Face value of a field as a stencil over cell unknowns.
///
/// Boundary faces inject their condition: a fixed value is a pure bias, a fixed
/// gradient extrapolates from the owner. Interior faces interpolate linearly between
/// owner and neighbour, measuring distances along the face normal, or along the
/// owner-to-neighbour line when non-orthogonal correction is on.
pub fn value_on_face<T, B>(mesh: &Mesh, face: FaceId, boundaries: &B) -> LinearCombination<T>
where
    T: FieldValue,
    B: Fn(FaceId) -> BoundaryCondition<T>,
{
    let (owner, neighbor) = mesh.face_cells(face);

    let Some(neighbor) = neighbor else {
        let bc = boundaries(face);
        return match bc.kind {
            BoundaryConditionType::FixedValue => LinearCombination::from_bias(bc.value),
            BoundaryConditionType::FixedGradient => {
                let dist = distance_cell_to_face(mesh, owner, face);
                LinearCombination::from_term(1.0, owner).with_bias(bc.value * dist)
            }
        };
    };

    let coeff_from = if mesh.use_non_orthogonal_correction {
        let e = cell_to_cell_unit_vector(mesh, owner, neighbor);
        let d_from = distance_cell_to_face_in_direction(mesh, owner, face, e);
        let d_between = distance_cell_to_cell(mesh, owner, neighbor);
        1.0 - d_from / d_between
    } else {
        let d_from = distance_cell_to_face(mesh, owner, face);
        let d_to = distance_cell_to_face(mesh, neighbor, face);
        1.0 - d_from / (d_from + d_to)
    };

    LinearCombination::from_terms([(coeff_from, owner), (1.0 - coeff_from, neighbor)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::boundary::zero_gradient_boundaries;
    use crate::solver::mesh::generate_structured_rect_mesh;
    use crate::solver::types::Scalar;

    #[test]
    fn interior_face_is_midpoint_average_on_uniform_grid() {
        let mesh = generate_structured_rect_mesh(3, 1, 3.0, 1.0);
        let face = (0..mesh.num_faces())
            .find(|&f| mesh.face_cells(f) == (0, Some(1)))
            .unwrap();
        let stencil = value_on_face(&mesh, face, &zero_gradient_boundaries::<Scalar>);
        assert_eq!(stencil.coeff_of(0), Some(0.5));
        assert_eq!(stencil.coeff_of(1), Some(0.5));
        assert_eq!(stencil.bias, 0.0);
    }

    #[test]
    fn boundary_conditions_are_injected() {
        let mesh = generate_structured_rect_mesh(2, 1, 2.0, 1.0);
        let face = mesh.boundary_faces().next().unwrap();
        let owner = mesh.face_owner(face);

        let fixed = value_on_face(&mesh, face, &|_| BoundaryCondition::fixed_value(3.0));
        assert!(fixed.is_empty());
        assert_eq!(fixed.bias, 3.0);

        let gradient = value_on_face(&mesh, face, &|_| BoundaryCondition::fixed_gradient(2.0));
        let dist = distance_cell_to_face(&mesh, owner, face);
        assert_eq!(gradient.coeff_of(owner), Some(1.0));
        assert!((gradient.bias - 2.0 * dist).abs() < 1e-14);
    }
}
