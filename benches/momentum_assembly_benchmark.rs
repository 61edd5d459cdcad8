use criterion::{criterion_group, criterion_main, Criterion};
use fvflow::solver::boundary::Boundaries;
use fvflow::solver::mesh::generate_structured_rect_mesh;
use fvflow::solver::{SimpleSolver, SolverConfig, Vector};

fn channel_solver(nx: usize, ny: usize) -> SimpleSolver {
    let mut mesh = generate_structured_rect_mesh(nx, ny, 4.0, 1.0);
    mesh.set_left_boundary(Boundaries::inlet(Vector::new(1.0, 0.0)));
    mesh.set_right_boundary(Boundaries::outlet(0.0));
    let config = SolverConfig {
        density: 1.0,
        viscosity: 0.01,
        log_interval: 0,
        ..Default::default()
    };
    let mut solver = SimpleSolver::new(mesh, config);
    // warm up so fluxes and gradients are non-trivial
    for _ in 0..5 {
        let _ = solver.iterate();
    }
    solver
}

fn momentum_assembly_benchmark(c: &mut Criterion) {
    let solver = channel_solver(160, 40);

    let mut group = c.benchmark_group("momentum_assembly");
    group.sample_size(20);
    group.bench_function("generate_momentum_system", |b| {
        b.iter(|| solver.generate_momentum_system());
    });
    group.bench_function("generate_pressure_correction_system", |b| {
        b.iter(|| solver.generate_pressure_correction_system());
    });
    group.finish();
}

fn simple_iteration_benchmark(c: &mut Criterion) {
    let mut solver = channel_solver(80, 20);

    let mut group = c.benchmark_group("simple_iteration");
    group.sample_size(10);
    group.bench_function("iterate", |b| {
        b.iter(|| {
            let _ = solver.iterate();
        });
    });
    group.finish();
}

criterion_group!(benches, momentum_assembly_benchmark, simple_iteration_benchmark);
criterion_main!(benches);
