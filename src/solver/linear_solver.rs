use crate::solver::types::Linear;
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use wide::f64x4;

#[derive(Clone, Debug)]
pub struct SparseMatrix {
    pub values: Vec<f64>,
    pub col_indices: Vec<usize>,
    pub row_offsets: Vec<usize>,
    pub n_rows: usize,
    pub n_cols: usize,
}

impl SparseMatrix {
    pub fn new(n_rows: usize, n_cols: usize) -> Self {
        Self {
            values: Vec::new(),
            col_indices: Vec::new(),
            row_offsets: vec![0; n_rows + 1],
            n_rows,
            n_cols,
        }
    }

    /// Builds CSR storage; entries keep their triplet order within each row.
    pub fn from_triplets(n_rows: usize, n_cols: usize, triplets: &[(usize, usize, f64)]) -> Self {
        let mut row_counts = vec![0; n_rows];
        for &(r, c, _) in triplets {
            assert!(r < n_rows && c < n_cols, "triplet ({}, {}) out of bounds", r, c);
            row_counts[r] += 1;
        }

        let mut row_offsets = vec![0; n_rows + 1];
        for i in 0..n_rows {
            row_offsets[i + 1] = row_offsets[i] + row_counts[i];
        }

        let mut mat = Self::new(n_rows, n_cols);
        mat.row_offsets = row_offsets.clone();
        mat.values = vec![0.0; triplets.len()];
        mat.col_indices = vec![0; triplets.len()];

        let mut current_row_indices = row_offsets;

        for &(r, c, v) in triplets {
            let idx = current_row_indices[r];
            mat.values[idx] = v;
            mat.col_indices[idx] = c;
            current_row_indices[r] += 1;
        }

        mat
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// `(col, value)` pairs of one row.
    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.row_offsets[row]..self.row_offsets[row + 1];
        self.col_indices[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter().copied())
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.row(row)
            .filter(|&(c, _)| c == col)
            .map(|(_, v)| v)
            .sum()
    }

    pub fn diagonal_index(&self, row: usize) -> Option<usize> {
        (self.row_offsets[row]..self.row_offsets[row + 1]).find(|&k| self.col_indices[k] == row)
    }

    pub fn diagonal(&self) -> Vec<f64> {
        (0..self.n_rows)
            .map(|i| self.diagonal_index(i).map_or(0.0, |k| self.values[k]))
            .collect()
    }

    pub fn mat_vec_mul(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(x.len(), self.n_cols);
        assert_eq!(y.len(), self.n_rows);

        for i in 0..self.n_rows {
            let mut sum = 0.0;
            for j in self.row_offsets[i]..self.row_offsets[i + 1] {
                sum += self.values[j] * x[self.col_indices[j]];
            }
            y[i] = sum;
        }
    }

    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut dense = DMatrix::zeros(self.n_rows, self.n_cols);
        for i in 0..self.n_rows {
            for (j, v) in self.row(i) {
                dense[(i, j)] += v;
            }
        }
        dense
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinearSolverKind {
    #[default]
    BiCgStab,
    DenseLu,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearSolverSettings {
    pub kind: LinearSolverKind,
    /// Residual target relative to `||b||` (iterative solvers only).
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for LinearSolverSettings {
    fn default() -> Self {
        Self {
            kind: LinearSolverKind::BiCgStab,
            tolerance: 1e-10,
            max_iterations: 10_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearSolveStats {
    pub iterations: usize,
    pub residual: f64,
    pub initial_residual: f64,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LinearSolveError {
    #[error("no convergence after {iterations} iterations: residual {residual:.3e} > {tolerance:.3e}")]
    NotConverged {
        iterations: usize,
        residual: f64,
        tolerance: f64,
    },

    #[error("BiCGStab breakdown at iteration {iteration}")]
    Breakdown { iteration: usize },

    #[error("matrix is singular")]
    Singular,

    #[error("non-finite value in linear solve")]
    NonFinite,
}

/// Solves `A X = B` column by column. `guess` seeds the iterative solver.
pub fn solve_system(
    a: &SparseMatrix,
    rhs: &[Vec<f64>],
    guess: Option<&[Vec<f64>]>,
    settings: &LinearSolverSettings,
) -> Result<Vec<Vec<f64>>, LinearSolveError> {
    assert_eq!(a.n_rows, a.n_cols, "linear system must be square");
    for column in rhs {
        assert_eq!(column.len(), a.n_rows, "right-hand side has wrong length");
    }
    if let Some(guess) = guess {
        assert_eq!(guess.len(), rhs.len(), "initial guess has wrong column count");
    }

    match settings.kind {
        LinearSolverKind::DenseLu => solve_dense_lu(a, rhs),
        LinearSolverKind::BiCgStab => rhs
            .par_iter()
            .enumerate()
            .map(|(col, b)| {
                let mut x = match guess {
                    Some(guess) => guess[col].clone(),
                    None => vec![0.0; b.len()],
                };
                let stats =
                    solve_bicgstab(a, b, &mut x, settings.max_iterations, settings.tolerance)?;
                log::trace!(
                    "BiCGStab column {}: {} iterations, residual {:.3e} (initial {:.3e})",
                    col,
                    stats.iterations,
                    stats.residual,
                    stats.initial_residual
                );
                Ok(x)
            })
            .collect(),
    }
}

/// Factorizes once and back-substitutes every column.
pub fn solve_dense_lu(
    a: &SparseMatrix,
    rhs: &[Vec<f64>],
) -> Result<Vec<Vec<f64>>, LinearSolveError> {
    let lu = a.to_dense().lu();
    rhs.iter()
        .map(|b| {
            let x = lu
                .solve(&DVector::from_column_slice(b))
                .ok_or(LinearSolveError::Singular)?;
            if x.iter().any(|v| !v.is_finite()) {
                return Err(LinearSolveError::NonFinite);
            }
            Ok(x.as_slice().to_vec())
        })
        .collect()
}

/// Jacobi-preconditioned BiCGStab. `tol` is relative to `||b||`.
pub fn solve_bicgstab(
    a: &SparseMatrix,
    b: &[f64],
    x: &mut [f64],
    max_iter: usize,
    tol: f64,
) -> Result<LinearSolveStats, LinearSolveError> {
    let n = b.len();
    let b_norm = norm(b);
    if b_norm == 0.0 {
        x.fill(0.0);
        return Ok(LinearSolveStats {
            iterations: 0,
            residual: 0.0,
            initial_residual: 0.0,
        });
    }
    let target = tol * b_norm;

    let inv_diag: Vec<f64> = a
        .diagonal()
        .into_iter()
        .map(|d| if d != 0.0 { 1.0 / d } else { 1.0 })
        .collect();

    // r = b - Ax
    let mut r = vec![0.0; n];
    a.mat_vec_mul(x, &mut r);
    axpby(1.0, b, -1.0, &mut r);

    let init_resid = norm(&r);
    if !init_resid.is_finite() {
        return Err(LinearSolveError::NonFinite);
    }
    if init_resid <= target {
        return Ok(LinearSolveStats {
            iterations: 0,
            residual: init_resid,
            initial_residual: init_resid,
        });
    }

    let r0 = r.clone();
    let mut rho_old = 1.0;
    let mut alpha = 1.0;
    let mut omega = 1.0;
    let mut v = vec![0.0; n];
    let mut p = vec![0.0; n];
    let mut y = vec![0.0; n];
    let mut s = vec![0.0; n];
    let mut z = vec![0.0; n];
    let mut t = vec![0.0; n];

    let mut resid = init_resid;

    for iter in 0..max_iter {
        let rho_new = dot(&r0, &r);
        if !rho_new.is_finite() {
            return Err(LinearSolveError::NonFinite);
        }
        if rho_new == 0.0 {
            return Err(LinearSolveError::Breakdown { iteration: iter });
        }

        if iter == 0 {
            p.copy_from_slice(&r);
        } else {
            let beta = (rho_new / rho_old) * (alpha / omega);
            let v_beta = f64x4::splat(beta);
            let v_omega = f64x4::splat(omega);

            let mut i = 0;
            while i + 4 <= n {
                let vr = f64x4::from(&r[i..i + 4]);
                let vp = f64x4::from(&p[i..i + 4]);
                let vv = f64x4::from(&v[i..i + 4]);
                let res = vr + v_beta * (vp - v_omega * vv);
                let res_arr: [f64; 4] = res.into();
                p[i..i + 4].copy_from_slice(&res_arr);
                i += 4;
            }
            while i < n {
                p[i] = r[i] + beta * (p[i] - omega * v[i]);
                i += 1;
            }
        }

        precondition(&inv_diag, &p, &mut y);
        a.mat_vec_mul(&y, &mut v);
        let r0_v = dot(&r0, &v);
        if r0_v == 0.0 || !r0_v.is_finite() {
            return Err(LinearSolveError::Breakdown { iteration: iter });
        }
        alpha = rho_new / r0_v;

        // s = r - alpha v
        s.copy_from_slice(&r);
        axpby(-alpha, &v, 1.0, &mut s);

        let s_norm = norm(&s);
        if s_norm <= target {
            axpby(alpha, &y, 1.0, x);
            return Ok(LinearSolveStats {
                iterations: iter + 1,
                residual: s_norm,
                initial_residual: init_resid,
            });
        }

        precondition(&inv_diag, &s, &mut z);
        a.mat_vec_mul(&z, &mut t);
        let t_t = dot(&t, &t);
        if t_t == 0.0 {
            return Err(LinearSolveError::Breakdown { iteration: iter });
        }
        omega = dot(&t, &s) / t_t;

        let v_alpha = f64x4::splat(alpha);
        let v_omega = f64x4::splat(omega);
        let mut i = 0;
        while i + 4 <= n {
            let vx = f64x4::from(&x[i..i + 4]);
            let vy = f64x4::from(&y[i..i + 4]);
            let vz = f64x4::from(&z[i..i + 4]);
            let vs = f64x4::from(&s[i..i + 4]);
            let vt = f64x4::from(&t[i..i + 4]);

            let res_x = vx + v_alpha * vy + v_omega * vz;
            let res_r = vs - v_omega * vt;

            let res_x_arr: [f64; 4] = res_x.into();
            let res_r_arr: [f64; 4] = res_r.into();

            x[i..i + 4].copy_from_slice(&res_x_arr);
            r[i..i + 4].copy_from_slice(&res_r_arr);
            i += 4;
        }
        while i < n {
            x[i] += alpha * y[i] + omega * z[i];
            r[i] = s[i] - omega * t[i];
            i += 1;
        }

        resid = norm(&r);
        if !resid.is_finite() {
            return Err(LinearSolveError::NonFinite);
        }
        if resid <= target {
            return Ok(LinearSolveStats {
                iterations: iter + 1,
                residual: resid,
                initial_residual: init_resid,
            });
        }
        if omega == 0.0 {
            return Err(LinearSolveError::Breakdown { iteration: iter });
        }

        rho_old = rho_new;
    }

    Err(LinearSolveError::NotConverged {
        iterations: max_iter,
        residual: resid,
        tolerance: target,
    })
}

/// Implicit under-relaxation of an assembled system:
/// `b_i += (1/factor - 1) * A_ii * previous_i`, then `A_ii /= factor`.
pub fn relax_system<T: Linear>(a: &mut SparseMatrix, rhs: &mut [T], previous: &[T], factor: f64) {
    assert!(factor > 0.0, "relaxation factor must be positive, got {}", factor);
    assert_eq!(rhs.len(), a.n_rows);
    assert_eq!(previous.len(), a.n_rows);

    for (row, (b, &prev)) in rhs.iter_mut().zip(previous).enumerate() {
        let k = a
            .diagonal_index(row)
            .unwrap_or_else(|| panic!("row {} has no diagonal entry", row));
        let diagonal = a.values[k];
        *b += prev * ((1.0 / factor - 1.0) * diagonal);
        a.values[k] = diagonal / factor;
    }
}

fn precondition(inv_diag: &[f64], input: &[f64], output: &mut [f64]) {
    let n = input.len();
    let mut i = 0;
    while i + 4 <= n {
        let vd = f64x4::from(&inv_diag[i..i + 4]);
        let vi = f64x4::from(&input[i..i + 4]);
        let res: [f64; 4] = (vd * vi).into();
        output[i..i + 4].copy_from_slice(&res);
        i += 4;
    }
    while i < n {
        output[i] = inv_diag[i] * input[i];
        i += 1;
    }
}

/// `y = alpha * x + beta * y`
fn axpby(alpha: f64, x: &[f64], beta: f64, y: &mut [f64]) {
    let n = x.len();
    let v_alpha = f64x4::splat(alpha);
    let v_beta = f64x4::splat(beta);
    let mut i = 0;
    while i + 4 <= n {
        let vx = f64x4::from(&x[i..i + 4]);
        let vy = f64x4::from(&y[i..i + 4]);
        let res: [f64; 4] = (v_alpha * vx + v_beta * vy).into();
        y[i..i + 4].copy_from_slice(&res);
        i += 4;
    }
    while i < n {
        y[i] = alpha * x[i] + beta * y[i];
        i += 1;
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    let mut sum = f64x4::splat(0.0);
    let mut i = 0;
    let n = a.len();
    while i + 4 <= n {
        let va = f64x4::from(&a[i..i + 4]);
        let vb = f64x4::from(&b[i..i + 4]);
        sum += va * vb;
        i += 4;
    }
    let mut s = sum.reduce_add();
    while i < n {
        s += a[i] * b[i];
        i += 1;
    }
    s
}

fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 1D Poisson matrix with Dirichlet ends: tridiag(-1, 2, -1).
    fn poisson_1d(n: usize) -> SparseMatrix {
        let mut triplets = Vec::new();
        for i in 0..n {
            if i > 0 {
                triplets.push((i, i - 1, -1.0));
            }
            triplets.push((i, i, 2.0));
            if i + 1 < n {
                triplets.push((i, i + 1, -1.0));
            }
        }
        SparseMatrix::from_triplets(n, n, &triplets)
    }

    #[test]
    fn bicgstab_solves_poisson() {
        let n = 37;
        let a = poisson_1d(n);
        let expected: Vec<f64> = (0..n).map(|i| (i as f64 * 0.3).cos()).collect();
        let mut b = vec![0.0; n];
        a.mat_vec_mul(&expected, &mut b);

        let mut x = vec![0.0; n];
        let stats = solve_bicgstab(&a, &b, &mut x, 500, 1e-12).unwrap();
        println!("BiCGStab: {} iterations", stats.iterations);
        for (xi, ei) in x.iter().zip(&expected) {
            assert!((xi - ei).abs() < 1e-8);
        }
    }

    #[test]
    fn dense_and_iterative_agree_on_nonsymmetric_system() {
        let n = 9;
        let mut triplets = Vec::new();
        for i in 0..n {
            triplets.push((i, i, 4.0));
            if i > 0 {
                triplets.push((i, i - 1, -1.5));
            }
            if i + 1 < n {
                triplets.push((i, i + 1, -0.5));
            }
        }
        let a = SparseMatrix::from_triplets(n, n, &triplets);
        let rhs = vec![(0..n).map(|i| i as f64).collect::<Vec<_>>(), vec![1.0; n]];

        let dense = solve_system(
            &a,
            &rhs,
            None,
            &LinearSolverSettings {
                kind: LinearSolverKind::DenseLu,
                ..Default::default()
            },
        )
        .unwrap();
        let iterative = solve_system(&a, &rhs, None, &LinearSolverSettings::default()).unwrap();
        for (d, it) in dense.iter().zip(&iterative) {
            for (u, v) in d.iter().zip(it) {
                assert!((u - v).abs() < 1e-8);
            }
        }
    }

    #[test]
    fn iteration_cap_is_reported() {
        let a = poisson_1d(64);
        let b = vec![1.0; 64];
        let mut x = vec![0.0; 64];
        let err = solve_bicgstab(&a, &b, &mut x, 2, 1e-14).unwrap_err();
        assert!(matches!(err, LinearSolveError::NotConverged { iterations: 2, .. }));
    }

    #[test]
    fn singular_dense_system_is_reported() {
        let a = SparseMatrix::from_triplets(2, 2, &[(0, 0, 1.0), (0, 1, 1.0), (1, 0, 1.0), (1, 1, 1.0)]);
        let err = solve_dense_lu(&a, &[vec![1.0, 2.0]]).unwrap_err();
        assert_eq!(err, LinearSolveError::Singular);
    }

    #[test]
    fn relaxation_preserves_fixed_point() {
        let mut a = poisson_1d(4);
        let solution = vec![1.0, -2.0, 0.5, 3.0];
        let mut rhs = vec![0.0; 4];
        a.mat_vec_mul(&solution, &mut rhs);

        relax_system(&mut a, &mut rhs, &solution, 0.7);
        assert!((a.get(1, 1) - 2.0 / 0.7).abs() < 1e-12);

        let mut check = vec![0.0; 4];
        a.mat_vec_mul(&solution, &mut check);
        for (c, b) in check.iter().zip(&rhs) {
            assert!((c - b).abs() < 1e-12);
        }
    }

    #[test]
    fn zero_rhs_gives_zero_solution() {
        let a = poisson_1d(5);
        let mut x = vec![3.0; 5];
        let stats = solve_bicgstab(&a, &[0.0; 5], &mut x, 10, 1e-10).unwrap();
        assert_eq!(stats.iterations, 0);
        assert!(x.iter().all(|&v| v == 0.0));
    }
}
