//! Built-in demonstration cases: a mesh with its boundary conditions and a
//! configuration the case is known to converge with.

use crate::solver::boundary::{Boundaries, BoundaryCondition};
use crate::solver::mesh::{
    generate_structured_backward_step_mesh, generate_structured_rect_mesh, BoundarySides, Mesh,
    Patch,
};
use crate::solver::{SolverConfig, Vector};

pub const CASE_NAMES: [&str; 3] = ["channel", "cavity", "step"];

pub struct Case {
    pub name: String,
    pub mesh: Mesh,
    pub config: SolverConfig,
}

/// Unit density and viscosity with strong under-relaxation. The time window is
/// only read by transient runs.
pub fn laminar_config() -> SolverConfig {
    SolverConfig {
        density: 1.0,
        viscosity: 1.0,
        velocity_relaxation: 0.3,
        pressure_relaxation: 0.1,
        max_iterations: 5000,
        time_step: 0.01,
        time_begin: 0.0,
        time_end: 0.1,
        ..Default::default()
    }
}

/// Builds one of [`CASE_NAMES`]; `nx`/`ny` override the default resolution.
pub fn build_case(name: &str, nx: Option<usize>, ny: Option<usize>) -> Result<Case, String> {
    let mesh = match name {
        "channel" => channel_mesh(nx.unwrap_or(40), ny.unwrap_or(10)),
        "cavity" => cavity_mesh(nx.unwrap_or(20), ny.unwrap_or(20))?,
        "step" => step_mesh(nx.unwrap_or(60), ny.unwrap_or(20)),
        other => {
            return Err(format!(
                "unknown case '{other}', expected one of {}",
                CASE_NAMES.join(", ")
            ))
        }
    };
    Ok(Case {
        name: name.to_string(),
        mesh,
        config: laminar_config(),
    })
}

/// Pressure-driven channel, 2 x 1.
fn channel_mesh(nx: usize, ny: usize) -> Mesh {
    let mut mesh = generate_structured_rect_mesh(nx, ny, 2.0, 1.0);
    mesh.apply_boundary_sides(BoundarySides::pressure_channel(1.0, 0.0));
    mesh
}

fn cavity_mesh(nx: usize, ny: usize) -> Result<Mesh, String> {
    let mut mesh = generate_structured_rect_mesh(nx, ny, 1.0, 1.0);
    mesh.set_top_boundary(Boundaries::moving_wall(Vector::new(1.0, 0.0)));
    // pin the pressure level on one bottom face
    let reference = mesh
        .patch_faces(Patch::Bottom)
        .next()
        .ok_or("cavity mesh has no bottom faces")?;
    mesh.set_face_boundary(
        reference,
        Boundaries::new(
            BoundaryCondition::fixed_value(Vector::zeros()),
            BoundaryCondition::fixed_value(0.0),
        ),
    );
    Ok(mesh)
}

fn step_mesh(nx: usize, ny: usize) -> Mesh {
    let mut mesh = generate_structured_backward_step_mesh(nx, ny, 6.0, 2.0, 1.0, 1.0);
    mesh.set_left_boundary(Boundaries::inlet(Vector::new(1.0, 0.0)));
    mesh.set_right_boundary(Boundaries::outlet(0.0));
    mesh
}
