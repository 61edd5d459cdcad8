//! Distances and directions between cell and face centroids.

use super::structs::Mesh;
use crate::solver::types::{CellId, FaceId, Scalar, Vector};

/// Distance from the cell centroid to the face line, measured along the face normal.
pub fn distance_cell_to_face(mesh: &Mesh, cell: CellId, face: FaceId) -> Scalar {
    distance_cell_to_face_in_direction(mesh, cell, face, mesh.face_normal(face))
}

/// Projection of the centroid-to-face vector onto the unit `direction`.
pub fn distance_cell_to_face_in_direction(
    mesh: &Mesh,
    cell: CellId,
    face: FaceId,
    direction: Vector,
) -> Scalar {
    let offset = mesh.face_centroid(face) - mesh.cell_centroid(cell);
    offset.dot(&direction).abs()
}

pub fn distance_cell_to_cell(mesh: &Mesh, from: CellId, to: CellId) -> Scalar {
    (mesh.cell_centroid(to) - mesh.cell_centroid(from)).norm()
}

pub fn cell_to_cell_unit_vector(mesh: &Mesh, from: CellId, to: CellId) -> Vector {
    (mesh.cell_centroid(to) - mesh.cell_centroid(from)).normalize()
}

/// Vector from the cell centroid to the face centroid.
pub fn cell_to_face_vector(mesh: &Mesh, cell: CellId, face: FaceId) -> Vector {
    mesh.face_centroid(face) - mesh.cell_centroid(cell)
}
