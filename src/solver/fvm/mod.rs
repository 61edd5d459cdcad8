//! Finite-volume operators. Every routine returns a stencil over cell unknowns and
//! takes the boundary conditions of the field as a `Fn(FaceId) -> BoundaryCondition<T>`.

pub mod convection;
pub mod diffusion;
pub mod gradient;
pub mod interpolation;
pub mod rhie_chow;

pub use convection::{convection_face_value, convection_flux_over_cell};
pub use diffusion::diffusion_flux_over_cell;
pub use gradient::{
    average_face_gradient, cell_gradient, face_gradient, face_normal_gradient,
    green_gauss_gradient, least_squares_gradient,
};
pub use interpolation::value_on_face;
pub use rhie_chow::{rhie_chow_velocity_on_face, RhieChowFields};
