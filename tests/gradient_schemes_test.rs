use fvflow::solver::boundary::{zero_gradient_boundaries, BoundaryCondition};
use fvflow::solver::fvm::{
    cell_gradient, diffusion_flux_over_cell, face_normal_gradient, green_gauss_gradient,
};
use fvflow::solver::mesh::{
    generate_structured_rect_mesh, generate_structured_trapezoid_mesh, Mesh,
};
use fvflow::solver::scheme::GradientScheme;
use fvflow::solver::types::{FaceId, Scalar, Vector};

fn linear_field(mesh: &Mesh, g: Vector, offset: Scalar) -> Vec<Scalar> {
    (0..mesh.num_cells())
        .map(|c| g.dot(&mesh.cell_centroid(c).coords) + offset)
        .collect()
}

#[test]
fn green_gauss_center_stencil_is_central_difference() {
    let (dx, dy) = (0.5, 2.0);
    let mesh = generate_structured_rect_mesh(3, 3, 3.0 * dx, 3.0 * dy);
    let stencil = green_gauss_gradient(&mesh, 4, &zero_gradient_boundaries::<Scalar>);
    println!("{:?}", stencil);

    let expect = |cell: usize, coeff: Vector| {
        let actual = stencil.coeff_of(cell).unwrap();
        assert!((actual - coeff).norm() < 1e-12, "cell {}: {:?}", cell, actual);
    };
    expect(1, Vector::new(0.0, -1.0 / (2.0 * dy)));
    expect(7, Vector::new(0.0, 1.0 / (2.0 * dy)));
    expect(3, Vector::new(-1.0 / (2.0 * dx), 0.0));
    expect(5, Vector::new(1.0 / (2.0 * dx), 0.0));

    let center = stencil.coeff_of(4).unwrap_or_else(Vector::zeros);
    assert!(center.norm() < 1e-12);
    assert!(stencil.bias.norm() < 1e-12);
    for corner in [0, 2, 6, 8] {
        assert!(stencil.coeff_of(corner).is_none());
    }
}

#[test]
fn both_schemes_recover_linear_gradient_on_interior_cells() {
    let mesh = generate_structured_rect_mesh(5, 4, 2.5, 1.0);
    let g = Vector::new(-1.5, 4.0);
    let field = linear_field(&mesh, g, 3.0);
    let bc = zero_gradient_boundaries::<Scalar>;

    for scheme in [GradientScheme::GreenGauss, GradientScheme::LeastSquares] {
        for j in 1..3 {
            for i in 1..4 {
                let cell = j * 5 + i;
                let grad = cell_gradient(&mesh, cell, &bc, scheme).evaluate(&field);
                assert!((grad - g).norm() < 1e-10, "{}: cell {}", scheme.as_str(), cell);
            }
        }
    }
}

#[test]
fn non_orthogonal_normal_gradient_is_exact_for_linear_fields() {
    let mut mesh = generate_structured_trapezoid_mesh(6, 5, 1.0, 1.0, 0.35);
    let skew = mesh.calculate_max_skewness();
    println!("max skewness {:.4}", skew);
    assert!(mesh.enable_non_orthogonal_correction_if_skewed(1e-6));

    let g = Vector::new(0.7, -2.0);
    let field = linear_field(&mesh, g, -1.0);
    let exact = |face: FaceId| {
        BoundaryCondition::fixed_value(g.dot(&mesh.face_centroid(face).coords) - 1.0)
    };

    for face in 0..mesh.num_faces() {
        let (owner, Some(_)) = mesh.face_cells(face) else {
            continue;
        };
        let fng = face_normal_gradient(&mesh, owner, face, &exact).evaluate(&field);
        let expected = g.dot(&mesh.face_normal(face));
        assert!((fng - expected).abs() < 1e-9, "face {}: {} vs {}", face, fng, expected);
    }
}

#[test]
fn diffusion_of_a_linear_field_vanishes_away_from_boundaries() {
    let mesh = generate_structured_rect_mesh(4, 4, 1.0, 2.0);
    let field = linear_field(&mesh, Vector::new(3.0, 1.0), 0.0);
    for cell in [5, 6, 9, 10] {
        let laplacian = diffusion_flux_over_cell(&mesh, cell, &zero_gradient_boundaries::<Scalar>)
            .evaluate(&field);
        assert!(laplacian.abs() < 1e-10, "cell {}: {}", cell, laplacian);
    }
}
