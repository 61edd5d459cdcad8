//! Symbolic stencils: `bias + sum(coeff_i * unknown[idx_i])`.
//!
//! Every discretization routine returns a [`LinearCombination`]. Rows of the
//! assembled systems are read from `terms` directly; [`LinearCombination::evaluate`]
//! is only used against fields that are already known.

use super::types::{CellId, FieldValue, Linear, Product, Scalar, Vector};
use std::fmt;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Term<C> {
    pub coeff: C,
    pub idx: CellId,
}

impl<C> Term<C> {
    pub fn new(coeff: C, idx: CellId) -> Self {
        Self { coeff, idx }
    }
}

pub struct LinearCombination<V, C = Scalar>
where
    V: Product<C>,
{
    pub terms: Vec<Term<C>>,
    pub bias: <V as Product<C>>::Output,
}

impl<V, C> Clone for LinearCombination<V, C>
where
    V: Product<C>,
    C: Clone,
{
    fn clone(&self) -> Self {
        Self {
            terms: self.terms.clone(),
            bias: self.bias,
        }
    }
}

impl<V, C> fmt::Debug for LinearCombination<V, C>
where
    V: Product<C>,
    C: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinearCombination")
            .field("terms", &self.terms)
            .field("bias", &self.bias)
            .finish()
    }
}

impl<V, C> Default for LinearCombination<V, C>
where
    V: Product<C>,
    C: Linear,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V, C> LinearCombination<V, C>
where
    V: Product<C>,
    C: Linear,
{
    pub fn new() -> Self {
        Self {
            terms: Vec::new(),
            bias: <<V as Product<C>>::Output as Linear>::zero(),
        }
    }

    pub fn from_bias(bias: <V as Product<C>>::Output) -> Self {
        Self {
            terms: Vec::new(),
            bias,
        }
    }

    pub fn from_term(coeff: C, idx: CellId) -> Self {
        Self {
            terms: vec![Term::new(coeff, idx)],
            bias: <<V as Product<C>>::Output as Linear>::zero(),
        }
    }

    /// Builds a stencil from distinct `(coeff, idx)` pairs.
    ///
    /// Panics if an index repeats; use `+=` to accumulate instead.
    pub fn from_terms<I>(terms: I) -> Self
    where
        I: IntoIterator<Item = (C, CellId)>,
    {
        let terms: Vec<Term<C>> = terms
            .into_iter()
            .map(|(coeff, idx)| Term::new(coeff, idx))
            .collect();
        for (i, term) in terms.iter().enumerate() {
            assert!(
                terms[..i].iter().all(|t| t.idx != term.idx),
                "duplicate unknown index {} in stencil",
                term.idx
            );
        }
        Self {
            terms,
            bias: <<V as Product<C>>::Output as Linear>::zero(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn coeff_of(&self, idx: CellId) -> Option<C> {
        self.terms.iter().find(|t| t.idx == idx).map(|t| t.coeff)
    }

    pub fn add_term(&mut self, coeff: C, idx: CellId) {
        match self.terms.iter_mut().find(|t| t.idx == idx) {
            Some(term) => term.coeff += coeff,
            None => self.terms.push(Term::new(coeff, idx)),
        }
    }

    pub fn sub_term(&mut self, coeff: C, idx: CellId) {
        self.add_term(-coeff, idx);
    }

    pub fn add_bias(&mut self, value: <V as Product<C>>::Output) {
        self.bias += value;
    }

    pub fn sub_bias(&mut self, value: <V as Product<C>>::Output) {
        self.bias -= value;
    }

    pub fn with_bias(mut self, value: <V as Product<C>>::Output) -> Self {
        self.add_bias(value);
        self
    }

    /// Scales all coefficients and the bias. A factor of exactly zero clears the stencil.
    pub fn scale(&mut self, factor: Scalar) {
        if factor == 0.0 {
            self.terms.clear();
            self.bias = <<V as Product<C>>::Output as Linear>::zero();
            return;
        }
        for term in &mut self.terms {
            term.coeff *= factor;
        }
        self.bias *= factor;
    }

    /// Orders terms by unknown index.
    pub fn sort_terms(&mut self) {
        self.terms.sort_by_key(|t| t.idx);
    }

    pub fn sorted(mut self) -> Self {
        self.sort_terms();
        self
    }

    /// Substitutes a known field: `bias + sum(field[idx] * coeff)`.
    pub fn evaluate(&self, field: &[V]) -> <V as Product<C>>::Output
    where
        V: Copy,
    {
        self.terms
            .iter()
            .fold(self.bias, |acc, t| acc + field[t.idx].product(t.coeff))
    }

    fn merge(&mut self, other: &Self, sign: Scalar) {
        for term in &other.terms {
            self.add_term(term.coeff * sign, term.idx);
        }
        self.bias += other.bias * sign;
    }
}

impl<V> LinearCombination<V, Vector>
where
    V: FieldValue,
{
    /// Projects every coefficient and the bias onto `direction`.
    pub fn dot(&self, direction: Vector) -> LinearCombination<V> {
        LinearCombination {
            terms: self
                .terms
                .iter()
                .map(|t| Term::new(t.coeff.dot(&direction), t.idx))
                .collect(),
            bias: V::contract(self.bias, direction),
        }
    }

    /// Left-multiplies the spatial index of every coefficient and the bias by `metric`.
    pub fn transform(&mut self, metric: &nalgebra::Matrix2<f64>) {
        for term in &mut self.terms {
            term.coeff = metric * term.coeff;
        }
        self.bias = V::transform_gradient(self.bias, metric);
    }
}

impl<V, C> AddAssign<Term<C>> for LinearCombination<V, C>
where
    V: Product<C>,
    C: Linear,
{
    fn add_assign(&mut self, rhs: Term<C>) {
        self.add_term(rhs.coeff, rhs.idx);
    }
}

impl<V, C> SubAssign<Term<C>> for LinearCombination<V, C>
where
    V: Product<C>,
    C: Linear,
{
    fn sub_assign(&mut self, rhs: Term<C>) {
        self.sub_term(rhs.coeff, rhs.idx);
    }
}

impl<V, C> AddAssign<&LinearCombination<V, C>> for LinearCombination<V, C>
where
    V: Product<C>,
    C: Linear,
{
    fn add_assign(&mut self, rhs: &LinearCombination<V, C>) {
        self.merge(rhs, 1.0);
    }
}

impl<V, C> AddAssign for LinearCombination<V, C>
where
    V: Product<C>,
    C: Linear,
{
    fn add_assign(&mut self, rhs: LinearCombination<V, C>) {
        self.merge(&rhs, 1.0);
    }
}

impl<V, C> SubAssign<&LinearCombination<V, C>> for LinearCombination<V, C>
where
    V: Product<C>,
    C: Linear,
{
    fn sub_assign(&mut self, rhs: &LinearCombination<V, C>) {
        self.merge(rhs, -1.0);
    }
}

impl<V, C> SubAssign for LinearCombination<V, C>
where
    V: Product<C>,
    C: Linear,
{
    fn sub_assign(&mut self, rhs: LinearCombination<V, C>) {
        self.merge(&rhs, -1.0);
    }
}

impl<V, C> MulAssign<Scalar> for LinearCombination<V, C>
where
    V: Product<C>,
    C: Linear,
{
    fn mul_assign(&mut self, rhs: Scalar) {
        self.scale(rhs);
    }
}

impl<V, C> DivAssign<Scalar> for LinearCombination<V, C>
where
    V: Product<C>,
    C: Linear,
{
    fn div_assign(&mut self, rhs: Scalar) {
        self.scale(1.0 / rhs);
    }
}

impl<V, C> Add for LinearCombination<V, C>
where
    V: Product<C>,
    C: Linear,
{
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl<V, C> Sub for LinearCombination<V, C>
where
    V: Product<C>,
    C: Linear,
{
    type Output = Self;

    fn sub(mut self, rhs: Self) -> Self {
        self -= rhs;
        self
    }
}

impl<V, C> Add<Term<C>> for LinearCombination<V, C>
where
    V: Product<C>,
    C: Linear,
{
    type Output = Self;

    fn add(mut self, rhs: Term<C>) -> Self {
        self += rhs;
        self
    }
}

impl<V, C> Neg for LinearCombination<V, C>
where
    V: Product<C>,
    C: Linear,
{
    type Output = Self;

    fn neg(mut self) -> Self {
        for term in &mut self.terms {
            term.coeff = -term.coeff;
        }
        self.bias = -self.bias;
        self
    }
}

impl<V, C> Mul<Scalar> for LinearCombination<V, C>
where
    V: Product<C>,
    C: Linear,
{
    type Output = Self;

    fn mul(mut self, rhs: Scalar) -> Self {
        self.scale(rhs);
        self
    }
}

impl<V, C> Mul<LinearCombination<V, C>> for Scalar
where
    V: Product<C>,
    C: Linear,
{
    type Output = LinearCombination<V, C>;

    fn mul(self, mut rhs: LinearCombination<V, C>) -> LinearCombination<V, C> {
        rhs.scale(self);
        rhs
    }
}

impl<V, C> Div<Scalar> for LinearCombination<V, C>
where
    V: Product<C>,
    C: Linear,
{
    type Output = Self;

    fn div(mut self, rhs: Scalar) -> Self {
        self.scale(1.0 / rhs);
        self
    }
}

/// Right outer product `stencil * v`: Scalar coefficients become Vector coefficients.
impl<V> Mul<Vector> for LinearCombination<V>
where
    V: FieldValue,
{
    type Output = LinearCombination<V, Vector>;

    fn mul(self, rhs: Vector) -> LinearCombination<V, Vector> {
        LinearCombination {
            terms: self
                .terms
                .into_iter()
                .map(|t| Term::new(t.coeff.product(rhs), t.idx))
                .collect(),
            bias: <V as Product<Vector>>::product(self.bias, rhs),
        }
    }
}

/// Left outer product `v * stencil` for scalar stencils.
impl Mul<LinearCombination<Scalar>> for Vector {
    type Output = LinearCombination<Scalar, Vector>;

    fn mul(self, rhs: LinearCombination<Scalar>) -> LinearCombination<Scalar, Vector> {
        LinearCombination {
            terms: rhs
                .terms
                .into_iter()
                .map(|t| Term::new(self * t.coeff, t.idx))
                .collect(),
            bias: self * rhs.bias,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LinearCombination<Scalar> {
        LinearCombination::from_terms([(2.0, 0), (-1.0, 3)]).with_bias(0.5)
    }

    #[test]
    fn adding_existing_index_merges() {
        let mut l = sample();
        l += Term::new(1.0, 3);
        assert_eq!(l.terms.len(), 2);
        assert_eq!(l.coeff_of(3), Some(0.0));

        l += Term::new(1.0, 7);
        assert_eq!(l.terms.len(), 3);
    }

    #[test]
    fn zero_scale_clears_even_nan() {
        let mut l = sample().with_bias(f64::NAN);
        l.add_term(f64::INFINITY, 1);
        l *= 0.0;
        assert!(l.is_empty());
        assert_eq!(l.bias, 0.0);
    }

    #[test]
    fn evaluate_substitutes_field() {
        let field = [1.0, 10.0, 100.0, 1000.0];
        assert_eq!(sample().evaluate(&field), 0.5 + 2.0 - 1000.0);
    }

    #[test]
    fn outer_product_then_dot_recovers_projection() {
        let direction = Vector::new(0.6, 0.8);
        let promoted = sample() * direction;
        assert_eq!(promoted.coeff_of(0), Some(Vector::new(1.2, 1.6)));
        let back = promoted.dot(direction);
        assert!((back.coeff_of(0).unwrap() - 2.0).abs() < 1e-14);
        assert!((back.bias - 0.5).abs() < 1e-14);
    }

    #[test]
    fn vector_field_stencil_promotes_to_tensor() {
        let mut l: LinearCombination<Vector> = LinearCombination::from_term(1.0, 0);
        l.add_bias(Vector::new(1.0, 2.0));
        let g = l * Vector::new(0.0, 1.0);
        let field = [Vector::new(3.0, 4.0)];
        let t = g.evaluate(&field);
        assert_eq!(t * Vector::new(0.0, 1.0), Vector::new(4.0, 6.0));
        assert_eq!(t * Vector::new(1.0, 0.0), Vector::zeros());
    }

    #[test]
    #[should_panic(expected = "duplicate unknown index")]
    fn duplicate_indices_rejected_at_construction() {
        let _ = LinearCombination::<Scalar>::from_terms([(1.0, 2), (3.0, 2)]);
    }
}
