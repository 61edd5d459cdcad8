use fvflow::solver::boundary::{Boundaries, BoundaryCondition};
use fvflow::cases::laminar_config;
use fvflow::solver::mesh::{
    generate_structured_rect_mesh, generate_structured_trapezoid_mesh, Mesh, Patch,
};
use fvflow::solver::{
    ConvectionScheme, GradientScheme, SimpleSolver, SolveStatus, SolverConfig, Vector,
    ZeroResidualPolicy,
};

fn inlet_channel() -> Mesh {
    let mut mesh = generate_structured_rect_mesh(10, 5, 2.0, 1.0);
    mesh.set_left_boundary(Boundaries::inlet(Vector::new(1.0, 0.0)));
    mesh.set_right_boundary(Boundaries::outlet(0.0));
    mesh
}

fn closed_box_with_reference(lid: Vector) -> Mesh {
    let mut mesh = generate_structured_rect_mesh(10, 10, 1.0, 1.0);
    mesh.set_top_boundary(Boundaries::moving_wall(lid));
    let reference = mesh.patch_faces(Patch::Bottom).next().unwrap();
    mesh.set_face_boundary(
        reference,
        Boundaries::new(
            BoundaryCondition::fixed_value(Vector::zeros()),
            BoundaryCondition::fixed_value(0.0),
        ),
    );
    mesh
}

#[test]
fn bounded_channel_converges_before_the_cap() {
    let config = SolverConfig {
        density: 1.0,
        viscosity: 0.1,
        max_iterations: 2000,
        ..Default::default()
    };
    let mut solver = SimpleSolver::new(inlet_channel(), config);
    let status = solver.solve().unwrap();
    let history = solver.residual_history();
    println!("{:?} after {} iterations", status, history.len());

    assert_eq!(status, SolveStatus::Converged);
    assert!(solver.is_converged());
    assert!(history.len() < 2000);
    let last = history[history.len() - 1];
    assert!(last.pressure_residual < 1e-5);
    assert!(last.velocity_residual.is_finite());
}

#[test]
fn lid_driven_cavity_converges() {
    let config = SolverConfig {
        density: 1.0,
        viscosity: 0.1,
        max_iterations: 3000,
        ..Default::default()
    };
    let mut solver = SimpleSolver::new(closed_box_with_reference(Vector::new(1.0, 0.0)), config);
    let status = solver.solve().unwrap();
    println!("{:?} after {} iterations", status, solver.residual_history().len());
    assert_eq!(status, SolveStatus::Converged);

    // the lid drags the top row along
    let mesh = solver.mesh();
    let velocity = solver.velocity(0).unwrap();
    let top = 9 * 10 + 4;
    let bottom = 4;
    assert!(velocity[top].x > 0.0);
    assert!(velocity[bottom].x < velocity[top].x);
    assert!(mesh.num_cells() == velocity.len());
}

#[test]
fn exact_zero_residual_follows_policy() {
    let still = SolverConfig {
        density: 1.0,
        viscosity: 1.0,
        max_iterations: 50,
        ..Default::default()
    };

    let mut solver = SimpleSolver::new(closed_box_with_reference(Vector::zeros()), still.clone());
    assert_eq!(solver.solve().unwrap(), SolveStatus::Diverged);
    assert!(!solver.is_converged());
    assert_eq!(solver.residual_history().len(), 1);
    assert_eq!(solver.pressure_residual(), 0.0);

    let lenient = SolverConfig {
        zero_residual: ZeroResidualPolicy::Converged,
        ..still
    };
    let mut solver = SimpleSolver::new(closed_box_with_reference(Vector::zeros()), lenient);
    assert_eq!(solver.solve().unwrap(), SolveStatus::Converged);
    assert!(solver.is_converged());
    assert!(solver.velocity(0).unwrap().iter().all(|u| *u == Vector::zeros()));
}

#[test]
fn iteration_cap_is_reported() {
    let config = SolverConfig {
        density: 1.0,
        viscosity: 0.1,
        max_iterations: 3,
        ..Default::default()
    };
    let mut solver = SimpleSolver::new(inlet_channel(), config);
    assert_eq!(solver.solve().unwrap(), SolveStatus::MaxIterationsReached);
    assert_eq!(solver.residual_history().len(), 3);
    assert_eq!(solver.time_point_count(), 1);
}

#[test]
fn skewed_channel_converges_across_schemes() {
    let combinations = [
        (false, GradientScheme::GreenGauss, ConvectionScheme::CentralDifference),
        (false, GradientScheme::LeastSquares, ConvectionScheme::Upwind),
        (true, GradientScheme::GreenGauss, ConvectionScheme::Fromm),
        (true, GradientScheme::LeastSquares, ConvectionScheme::Quick),
        (true, GradientScheme::LeastSquares, ConvectionScheme::SecondOrderUpwind),
    ];

    for (non_orthogonal, gradient_scheme, convection_scheme) in combinations {
        let mut mesh = generate_structured_trapezoid_mesh(20, 10, 2.0, 1.0, 0.4);
        mesh.set_left_boundary(Boundaries::inlet(Vector::new(1.0, 0.0)));
        mesh.set_right_boundary(Boundaries::outlet(0.0));
        mesh.use_non_orthogonal_correction = non_orthogonal;
        let config = SolverConfig {
            gradient_scheme,
            convection_scheme,
            ..laminar_config()
        };

        let mut solver = SimpleSolver::new(mesh, config);
        let status = solver.solve().unwrap();
        let mesh = solver.mesh();
        let fluxes = solver.mass_fluxes();
        let inflow: f64 = -mesh.patch_faces(Patch::Left).map(|f| fluxes[f]).sum::<f64>();
        let outflow: f64 = mesh.patch_faces(Patch::Right).map(|f| fluxes[f]).sum();
        println!(
            "non-orth {} {:?} {:?}: {:?} after {} iterations, in {:.6} out {:.6}",
            non_orthogonal,
            gradient_scheme,
            convection_scheme,
            status,
            solver.residual_history().len(),
            inflow,
            outflow
        );

        assert_eq!(status, SolveStatus::Converged);
        assert!(inflow > 0.0);
        assert!((inflow - outflow).abs() < 1e-4 * inflow);
        assert!(solver.max_mass_imbalance() < 1e-5);
    }
}
