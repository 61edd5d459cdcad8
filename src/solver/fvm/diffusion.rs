use super::gradient::face_normal_gradient;
use crate::solver::boundary::BoundaryCondition;
use crate::solver::linear_combination::LinearCombination;
use crate::solver::mesh::Mesh;
use crate::solver::types::{CellId, FaceId, FieldValue};

/// `sum(|S_f| * dphi/dn)` over the faces of `cell`: the integrated Laplacian.
pub fn diffusion_flux_over_cell<T, B>(
    mesh: &Mesh,
    cell: CellId,
    boundaries: &B,
) -> LinearCombination<T>
where
    T: FieldValue,
    B: Fn(FaceId) -> BoundaryCondition<T>,
{
    let mut flux = LinearCombination::new();
    for &face in mesh.cell_faces(cell) {
        flux += face_normal_gradient(mesh, cell, face, boundaries) * mesh.face_area(face);
    }
    flux
}
