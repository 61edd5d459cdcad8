use super::gradient::face_normal_gradient;
use super::interpolation::value_on_face;
use crate::solver::boundary::{zero_gradient_boundaries, BoundaryCondition};
use crate::solver::mesh::Mesh;
use crate::solver::types::{FaceId, Scalar, Vector};

/// Cell fields read by the face-velocity interpolation.
#[derive(Clone, Copy)]
pub struct RhieChowFields<'a> {
    pub velocity: &'a [Vector],
    pub pressure: &'a [Scalar],
    pub pressure_gradient: &'a [Vector],
    /// Cell volume over the momentum diagonal.
    pub vbya: &'a [Scalar],
}

/// Face velocity with the pressure-weighted correction
/// `-VbyA_f * (dp/dn - avg(grad p) . n) * n` on interior faces.
///
/// `dp/dn` is the compact two-point derivative, the same operator used by the
/// pressure-correction equation; the averaged gradient comes from the cell
/// gradients. Boundary faces return the plain interpolated velocity.
pub fn rhie_chow_velocity_on_face<BU, BP>(
    mesh: &Mesh,
    face: FaceId,
    fields: RhieChowFields<'_>,
    velocity_boundaries: &BU,
    pressure_boundaries: &BP,
) -> Vector
where
    BU: Fn(FaceId) -> BoundaryCondition<Vector>,
    BP: Fn(FaceId) -> BoundaryCondition<Scalar>,
{
    let velocity = value_on_face(mesh, face, velocity_boundaries).evaluate(fields.velocity);
    if mesh.is_boundary_face(face) {
        return velocity;
    }

    let vbya = value_on_face(mesh, face, &zero_gradient_boundaries::<Scalar>).evaluate(fields.vbya);
    let normal = mesh.face_normal(face);
    let normal_gradient = face_normal_gradient(mesh, mesh.face_owner(face), face, pressure_boundaries)
        .evaluate(fields.pressure);
    let average_gradient = value_on_face(mesh, face, &zero_gradient_boundaries::<Vector>)
        .evaluate(fields.pressure_gradient);

    velocity - normal * (vbya * (normal_gradient - average_gradient.dot(&normal)))
}
