use fvflow::solver::linear_combination::{LinearCombination, Term};
use fvflow::solver::types::{Scalar, Vector};

/// Small deterministic generator so the property checks are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next_f64(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((self.0 >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
    }

    fn next_index(&mut self, n: usize) -> usize {
        ((self.next_f64() + 1.0) * 0.5 * n as f64) as usize % n
    }
}

fn random_stencil(rng: &mut Lcg, n: usize) -> LinearCombination<Vector> {
    let mut lc = LinearCombination::new();
    for _ in 0..6 {
        lc.add_term(rng.next_f64(), rng.next_index(n));
    }
    lc.add_bias(Vector::new(rng.next_f64(), rng.next_f64()));
    lc
}

fn assert_same(a: &LinearCombination<Vector>, b: &LinearCombination<Vector>) {
    assert!((a.bias - b.bias).norm() < 1e-12, "{:?} vs {:?}", a.bias, b.bias);
    for term in &a.terms {
        let other = b.coeff_of(term.idx).unwrap_or(0.0);
        assert!((term.coeff - other).abs() < 1e-12, "idx {}", term.idx);
    }
    for term in &b.terms {
        let other = a.coeff_of(term.idx).unwrap_or(0.0);
        assert!((term.coeff - other).abs() < 1e-12, "idx {}", term.idx);
    }
}

#[test]
fn adding_a_term_merges_or_appends() {
    let mut rng = Lcg(7);
    for _ in 0..50 {
        let mut lc = random_stencil(&mut rng, 10);
        let existing = lc.terms[0].idx;
        let before = lc.terms.len();
        lc += Term::new(1.5, existing);
        assert_eq!(lc.terms.len(), before);

        lc += Term::new(1.5, 10 + before);
        assert_eq!(lc.terms.len(), before + 1);
    }
}

#[test]
fn scaling_by_zero_clears_even_non_finite_content() {
    let mut lc: LinearCombination<Scalar> = LinearCombination::from_term(f64::NAN, 3);
    lc.add_term(f64::INFINITY, 4);
    lc.add_bias(f64::NAN);

    lc *= 0.0;
    assert!(lc.is_empty());
    assert_eq!(lc.bias, 0.0);
}

#[test]
fn group_laws_hold() {
    let mut rng = Lcg(42);
    for _ in 0..50 {
        let a = random_stencil(&mut rng, 8);
        let b = random_stencil(&mut rng, 8);

        let round_trip = (a.clone() + b.clone()) - b;
        assert_same(&round_trip, &a);

        let cancelled = a.clone() + (-a);
        assert!(cancelled.bias.norm() < 1e-15);
        assert!(cancelled.terms.iter().all(|t| t.coeff.abs() < 1e-15));
    }
}

#[test]
fn evaluation_is_linear() {
    let mut rng = Lcg(2024);
    let field: Vec<Vector> = (0..8)
        .map(|_| Vector::new(rng.next_f64(), rng.next_f64()))
        .collect();
    for _ in 0..50 {
        let a = random_stencil(&mut rng, 8);
        let b = random_stencil(&mut rng, 8);
        let combined = (a.clone() + b.clone()).evaluate(&field);
        let separate = a.evaluate(&field) + b.evaluate(&field);
        assert!((combined - separate).norm() < 1e-12);
    }
}

#[test]
fn vector_coefficients_contract_back_to_scalar_stencils() {
    let mut lc: LinearCombination<Scalar> = LinearCombination::from_term(2.0, 0);
    lc.add_term(-1.0, 1);
    lc.add_bias(0.5);

    let direction = Vector::new(3.0, -4.0);
    let promoted = lc.clone() * direction;
    assert_eq!(promoted.coeff_of(0), Some(Vector::new(6.0, -8.0)));
    assert_eq!(promoted.bias, Vector::new(1.5, -2.0));

    let unit = direction / direction.norm();
    let back = promoted.dot(unit);
    let field = [0.25, -2.0];
    assert!((back.evaluate(&field) - lc.evaluate(&field) * direction.norm()).abs() < 1e-12);
}
