//! Cell gradients, face gradients and face-normal derivatives as stencils.

use super::interpolation::value_on_face;
use crate::solver::boundary::{BoundaryCondition, BoundaryConditionType};
use crate::solver::linear_combination::LinearCombination;
use crate::solver::mesh::{
    cell_to_cell_unit_vector, cell_to_face_vector, distance_cell_to_cell, distance_cell_to_face,
    Mesh,
};
use crate::solver::scheme::GradientScheme;
use crate::solver::types::{CellId, FaceId, FieldValue, Tensor, Vector};

pub fn cell_gradient<T, B>(
    mesh: &Mesh,
    cell: CellId,
    boundaries: &B,
    scheme: GradientScheme,
) -> LinearCombination<T, Vector>
where
    T: FieldValue,
    B: Fn(FaceId) -> BoundaryCondition<T>,
{
    match scheme {
        GradientScheme::GreenGauss => green_gauss_gradient(mesh, cell, boundaries),
        GradientScheme::LeastSquares => least_squares_gradient(mesh, cell, boundaries),
    }
}

/// `sum(phi_f * S_f) / V` over the faces of `cell`, `S_f` pointing out of `cell`.
pub fn green_gauss_gradient<T, B>(
    mesh: &Mesh,
    cell: CellId,
    boundaries: &B,
) -> LinearCombination<T, Vector>
where
    T: FieldValue,
    B: Fn(FaceId) -> BoundaryCondition<T>,
{
    let mut gradient = LinearCombination::new();
    for &face in mesh.cell_faces(cell) {
        gradient += value_on_face(mesh, face, boundaries) * mesh.face_area_vector_from(cell, face);
    }
    gradient / mesh.cell_volume(cell)
}

/// Inverse-distance weighted least-squares fit of the differences to the
/// neighbours (or to boundary face values).
///
/// Falls back to Green-Gauss if the normal equations are singular, which happens
/// when every neighbour lies on one line.
pub fn least_squares_gradient<T, B>(
    mesh: &Mesh,
    cell: CellId,
    boundaries: &B,
) -> LinearCombination<T, Vector>
where
    T: FieldValue,
    B: Fn(FaceId) -> BoundaryCondition<T>,
{
    let mut normal_matrix = Tensor::zeros();
    let mut rhs: LinearCombination<T, Vector> = LinearCombination::new();

    for &face in mesh.cell_faces(cell) {
        let (r, mut change) = match mesh.other_cell(cell, face) {
            Some(other) => (
                mesh.cell_centroid(other) - mesh.cell_centroid(cell),
                LinearCombination::from_term(1.0, other),
            ),
            None => (
                cell_to_face_vector(mesh, cell, face),
                value_on_face(mesh, face, boundaries),
            ),
        };
        change.sub_term(1.0, cell);

        let weight = 1.0 / r.norm();
        normal_matrix += r * r.transpose() * weight;
        rhs += change * (r * weight);
    }

    match normal_matrix.try_inverse() {
        Some(inverse) => {
            rhs.transform(&inverse);
            rhs
        }
        None => {
            log::warn!(
                "singular least-squares metric at cell {}, using Green-Gauss",
                cell
            );
            green_gauss_gradient(mesh, cell, boundaries)
        }
    }
}

/// Inverse-distance weighted average of the owner and neighbour gradients.
pub fn average_face_gradient<T, B>(
    mesh: &Mesh,
    face: FaceId,
    boundaries: &B,
    scheme: GradientScheme,
) -> LinearCombination<T, Vector>
where
    T: FieldValue,
    B: Fn(FaceId) -> BoundaryCondition<T>,
{
    let (owner, neighbor) = mesh.face_cells(face);
    let owner_gradient = cell_gradient(mesh, owner, boundaries, scheme);
    let Some(neighbor) = neighbor else {
        return owner_gradient;
    };

    let d_owner = distance_cell_to_face(mesh, owner, face);
    let d_neighbor = distance_cell_to_face(mesh, neighbor, face);
    let owner_weight = d_neighbor / (d_owner + d_neighbor);

    owner_gradient * owner_weight
        + cell_gradient(mesh, neighbor, boundaries, scheme) * (1.0 - owner_weight)
}

/// Face gradient; on non-orthogonal meshes the component along the cell-to-cell
/// line is replaced by the two-point difference.
pub fn face_gradient<T, B>(
    mesh: &Mesh,
    face: FaceId,
    boundaries: &B,
    scheme: GradientScheme,
) -> LinearCombination<T, Vector>
where
    T: FieldValue,
    B: Fn(FaceId) -> BoundaryCondition<T>,
{
    let average = average_face_gradient(mesh, face, boundaries, scheme);
    let (owner, Some(neighbor)) = mesh.face_cells(face) else {
        return average;
    };
    if !mesh.use_non_orthogonal_correction {
        return average;
    }

    let e = cell_to_cell_unit_vector(mesh, owner, neighbor);
    let d = distance_cell_to_cell(mesh, owner, neighbor);
    let mut difference: LinearCombination<T> =
        LinearCombination::from_terms([(-1.0 / d, owner), (1.0 / d, neighbor)]);
    difference -= average.dot(e);

    average + difference * e
}

/// Derivative across `face` along its normal oriented out of `from`.
///
/// On non-orthogonal meshes the normal is split into a part along the cell-to-cell
/// line, discretized with the two-point difference, and a remainder that uses the
/// least-squares face gradient.
pub fn face_normal_gradient<T, B>(
    mesh: &Mesh,
    from: CellId,
    face: FaceId,
    boundaries: &B,
) -> LinearCombination<T>
where
    T: FieldValue,
    B: Fn(FaceId) -> BoundaryCondition<T>,
{
    let Some(to) = mesh.other_cell(from, face) else {
        let bc = boundaries(face);
        return match bc.kind {
            BoundaryConditionType::FixedGradient => LinearCombination::from_bias(bc.value),
            BoundaryConditionType::FixedValue => {
                let dist = distance_cell_to_face(mesh, from, face);
                LinearCombination::from_term(-1.0 / dist, from).with_bias(bc.value * (1.0 / dist))
            }
        };
    };

    let d = distance_cell_to_cell(mesh, from, to);
    let difference = LinearCombination::from_terms([(-1.0 / d, from), (1.0 / d, to)]);
    if !mesh.use_non_orthogonal_correction {
        return difference;
    }

    let n = mesh.face_area_vector_from(from, face) / mesh.face_area(face);
    let e = cell_to_cell_unit_vector(mesh, from, to);
    let orthogonal = e / n.dot(&e);
    let non_orthogonal = n - orthogonal;

    difference * orthogonal.norm()
        + average_face_gradient(mesh, face, boundaries, GradientScheme::LeastSquares)
            .dot(non_orthogonal)
}
