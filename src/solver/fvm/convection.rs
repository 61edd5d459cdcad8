use super::gradient::{cell_gradient, face_gradient};
use super::interpolation::value_on_face;
use crate::solver::boundary::BoundaryCondition;
use crate::solver::linear_combination::LinearCombination;
use crate::solver::mesh::{cell_to_face_vector, Mesh};
use crate::solver::scheme::{ConvectionScheme, GradientScheme};
use crate::solver::types::{CellId, FaceId, FieldValue, Scalar};

/// Convected face value. `mass_flux` is the flux through `face` in the owner's
/// orientation and decides which side is upstream (owner when zero).
pub fn convection_face_value<T, B>(
    mesh: &Mesh,
    face: FaceId,
    boundaries: &B,
    mass_flux: Scalar,
    scheme: ConvectionScheme,
) -> LinearCombination<T>
where
    T: FieldValue,
    B: Fn(FaceId) -> BoundaryCondition<T>,
{
    let (owner, Some(neighbor)) = mesh.face_cells(face) else {
        return value_on_face(mesh, face, boundaries);
    };
    let (upstream, downstream) = if mass_flux < 0.0 {
        (neighbor, owner)
    } else {
        (owner, neighbor)
    };

    match scheme {
        ConvectionScheme::Upwind => LinearCombination::from_term(1.0, upstream),
        ConvectionScheme::Downwind => LinearCombination::from_term(1.0, downstream),
        ConvectionScheme::CentralDifference => value_on_face(mesh, face, boundaries),
        ConvectionScheme::Fromm | ConvectionScheme::SecondOrderUpwind | ConvectionScheme::Quick => {
            let gradient_scheme = if mesh.use_non_orthogonal_correction {
                GradientScheme::LeastSquares
            } else {
                GradientScheme::GreenGauss
            };
            let d = cell_to_face_vector(mesh, upstream, face);
            let upstream_gradient = cell_gradient(mesh, upstream, boundaries, gradient_scheme);
            let base = LinearCombination::from_term(1.0, upstream);

            match scheme {
                ConvectionScheme::Fromm => base + upstream_gradient.dot(d),
                ConvectionScheme::SecondOrderUpwind => {
                    let face_grad = face_gradient(mesh, face, boundaries, gradient_scheme);
                    base + (upstream_gradient * 2.0 - face_grad).dot(d)
                }
                _ => {
                    let face_grad = face_gradient(mesh, face, boundaries, gradient_scheme);
                    base + (upstream_gradient + face_grad).dot(d) * 0.5
                }
            }
        }
    }
}

/// Net convective outflow of `cell`: `sum(F_f * phi_f)` with `F_f` outward from `cell`.
pub fn convection_flux_over_cell<T, B>(
    mesh: &Mesh,
    cell: CellId,
    boundaries: &B,
    mass_fluxes: &[Scalar],
    scheme: ConvectionScheme,
) -> LinearCombination<T>
where
    T: FieldValue,
    B: Fn(FaceId) -> BoundaryCondition<T>,
{
    let mut flux = LinearCombination::new();
    for &face in mesh.cell_faces(cell) {
        let mass_flux = mass_fluxes[face];
        let outward = if mesh.face_owner(face) == cell {
            mass_flux
        } else {
            -mass_flux
        };
        flux += convection_face_value(mesh, face, boundaries, mass_flux, scheme) * outward;
    }
    flux
}
