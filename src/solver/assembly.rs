//! Scatter of per-cell stencils into a sparse system.

use crate::solver::linear_combination::LinearCombination;
use crate::solver::linear_solver::SparseMatrix;
use crate::solver::types::{CellId, FieldValue};
use rayon::prelude::*;

/// Assembles `A x = b` from one stencil per row, `stencil_i = 0`.
///
/// Rows are built in parallel and concatenated in row order, with terms sorted by
/// column, so the matrix layout does not depend on scheduling. Every row carries a
/// diagonal entry, stored as zero if the stencil has none.
pub fn assemble_system<T, F>(n_rows: usize, stencil: F) -> (SparseMatrix, Vec<T>)
where
    T: FieldValue,
    F: Fn(CellId) -> LinearCombination<T> + Sync,
{
    let rows: Vec<LinearCombination<T>> = (0..n_rows)
        .into_par_iter()
        .map(|row| {
            let mut eqn = stencil(row);
            if eqn.coeff_of(row).is_none() {
                eqn.add_term(0.0, row);
            }
            eqn.sorted()
        })
        .collect();

    let nnz = rows.iter().map(|r| r.terms.len()).sum();
    let mut triplets = Vec::with_capacity(nnz);
    let mut rhs = Vec::with_capacity(n_rows);
    for (row, eqn) in rows.into_iter().enumerate() {
        for term in &eqn.terms {
            assert!(term.idx < n_rows, "row {} references unknown {}", row, term.idx);
            triplets.push((row, term.idx, term.coeff));
        }
        rhs.push(-eqn.bias);
    }

    (SparseMatrix::from_triplets(n_rows, n_rows, &triplets), rhs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::types::{Scalar, Vector};

    #[test]
    fn rows_are_sorted_and_bias_negated() {
        let (a, b) = assemble_system::<Scalar, _>(3, |row| {
            let mut eqn = LinearCombination::from_term(-3.0, row);
            eqn.add_term(1.0, 2);
            eqn.add_bias(row as f64);
            eqn
        });
        assert_eq!(a.col_indices[a.row_offsets[0]..a.row_offsets[1]], [0, 2]);
        assert_eq!(a.get(1, 1), -3.0);
        assert_eq!(b, vec![0.0, -1.0, -2.0]);
        assert_eq!(a.get(2, 2), -2.0);
    }

    #[test]
    fn missing_diagonal_is_inserted_as_zero() {
        let (a, b) = assemble_system::<Vector, _>(2, |row| {
            LinearCombination::from_term(1.0, 1 - row).with_bias(Vector::new(1.0, 2.0))
        });
        assert_eq!(a.nnz(), 4);
        assert_eq!(a.diagonal(), vec![0.0, 0.0]);
        assert_eq!(b[0], Vector::new(-1.0, -2.0));
    }

    #[test]
    fn assembly_is_reproducible() {
        let stencil = |row: usize| {
            let mut eqn = LinearCombination::<Scalar>::new();
            for k in (0..8).rev() {
                eqn.add_term(1.0 / (1.0 + (row * 8 + k) as f64), (row + k) % 50);
            }
            eqn
        };
        let (a1, _) = assemble_system(50, stencil);
        let (a2, _) = assemble_system(50, stencil);
        assert_eq!(a1.values, a2.values);
        assert_eq!(a1.col_indices, a2.col_indices);
    }
}
