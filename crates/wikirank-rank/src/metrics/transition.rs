//! Row-stochastic working copy of an adjacency matrix.
//!
//! # Layout
//!
//! ```text
//! row form        weights[row_ptr[i]..row_ptr[i+1]] = 1 / out_degree(i)
//! transpose form  in_src/in_weight[in_ptr[j]..in_ptr[j+1]] = sources of j
//! ```
//!
//! The caller's [`AdjacencyMatrix`] is never touched: weights are copied
//! into `f64` storage and normalized there. The row form backs inspection
//! (every non-dangling row sums to 1); the transpose form lets one
//! power-iteration step compute each output entry independently, so the
//! product parallelizes over output rows with no reduction.

use rayon::prelude::*;
use tracing::{debug, instrument};
use wikirank_core::graph::{AdjacencyMatrix, NodeId};

/// Normalized transition weights plus the dangling-row set.
#[derive(Debug, Clone)]
pub struct TransitionMatrix {
    n: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<NodeId>,
    weights: Vec<f64>,
    out_degree: Vec<f64>,
    dangling: Vec<usize>,
    in_ptr: Vec<usize>,
    in_src: Vec<NodeId>,
    in_weight: Vec<f64>,
}

impl TransitionMatrix {
    /// Normalize a private copy of `adjacency`.
    #[must_use]
    #[instrument(skip(adjacency), fields(n = adjacency.dim(), nnz = adjacency.nnz()))]
    pub fn from_adjacency(adjacency: &AdjacencyMatrix) -> Self {
        let n = adjacency.dim();
        let row_ptr = adjacency.row_ptr().to_vec();

        let out_degree: Vec<f64> = (0..n)
            .into_par_iter()
            .map(|i| adjacency.row_sum(i))
            .collect();

        let mut col_idx = Vec::with_capacity(adjacency.nnz());
        let mut weights = Vec::with_capacity(adjacency.nnz());
        for i in 0..n {
            col_idx.extend_from_slice(adjacency.row_indices(i));
            weights.extend(adjacency.row_values(i).iter().map(|&v| f64::from(v)));
        }

        // Split the flat weight buffer into disjoint per-row slices.
        let mut rows: Vec<&mut [f64]> = Vec::with_capacity(n);
        let mut rest = weights.as_mut_slice();
        for i in 0..n {
            let (row, tail) = std::mem::take(&mut rest).split_at_mut(row_ptr[i + 1] - row_ptr[i]);
            rows.push(row);
            rest = tail;
        }
        rows.par_iter_mut()
            .zip(out_degree.par_iter())
            .filter(|(_, degree)| **degree > 0.0)
            .for_each(|(row, degree)| {
                for w in row.iter_mut() {
                    *w /= *degree;
                }
            });

        let dangling: Vec<usize> = (0..n).filter(|&i| out_degree[i] <= 0.0).collect();
        let (in_ptr, in_src, in_weight) = transpose(n, &row_ptr, &col_idx, &weights);

        debug!(dangling = dangling.len(), "transition matrix ready");

        Self {
            n,
            row_ptr,
            col_idx,
            weights,
            out_degree,
            dangling,
            in_ptr,
            in_src,
            in_weight,
        }
    }

    #[must_use]
    pub const fn dim(&self) -> usize {
        self.n
    }

    /// Original (un-normalized) row sum of row `i`.
    #[must_use]
    pub fn out_degree(&self, i: usize) -> f64 {
        self.out_degree[i]
    }

    /// Columns of row `i`, aligned with [`Self::row_weights`].
    #[must_use]
    pub fn row_indices(&self, i: usize) -> &[NodeId] {
        &self.col_idx[self.row_ptr[i]..self.row_ptr[i + 1]]
    }

    /// Normalized weights of row `i`.
    #[must_use]
    pub fn row_weights(&self, i: usize) -> &[f64] {
        &self.weights[self.row_ptr[i]..self.row_ptr[i + 1]]
    }

    /// Rows with out-degree zero, ascending.
    #[must_use]
    pub fn dangling(&self) -> &[usize] {
        &self.dangling
    }

    /// Total score currently held by dangling rows.
    ///
    /// Summed sequentially so the result does not depend on thread count.
    #[must_use]
    pub fn dangling_mass(&self, scores: &[f64]) -> f64 {
        self.dangling.iter().map(|&i| scores[i]).sum()
    }

    /// Left-multiply: `out[j] = Σ_i scores[i] · w(i, j)`.
    ///
    /// # Panics
    ///
    /// Panics if either slice length differs from [`Self::dim`].
    pub fn pull(&self, scores: &[f64], out: &mut [f64]) {
        assert_eq!(scores.len(), self.n, "score vector length");
        assert_eq!(out.len(), self.n, "output vector length");

        out.par_iter_mut().enumerate().for_each(|(j, slot)| {
            let span = self.in_ptr[j]..self.in_ptr[j + 1];
            *slot = self.in_src[span.clone()]
                .iter()
                .zip(&self.in_weight[span])
                .map(|(&i, &w)| scores[i as usize] * w)
                .sum();
        });
    }
}

/// Counting-sort transpose of a CSR matrix.
fn transpose(
    n: usize,
    row_ptr: &[usize],
    col_idx: &[NodeId],
    weights: &[f64],
) -> (Vec<usize>, Vec<NodeId>, Vec<f64>) {
    let mut in_ptr = vec![0_usize; n + 1];
    for &j in col_idx {
        in_ptr[j as usize + 1] += 1;
    }
    for j in 0..n {
        in_ptr[j + 1] += in_ptr[j];
    }

    let mut cursor = in_ptr.clone();
    let mut in_src: Vec<NodeId> = vec![0; col_idx.len()];
    let mut in_weight = vec![0.0_f64; col_idx.len()];
    for i in 0..n {
        let Ok(source) = NodeId::try_from(i) else {
            break;
        };
        for k in row_ptr[i]..row_ptr[i + 1] {
            let j = col_idx[k] as usize;
            in_src[cursor[j]] = source;
            in_weight[cursor[j]] = weights[k];
            cursor[j] += 1;
        }
    }
    (in_ptr, in_src, in_weight)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(n: usize, edges: &[(NodeId, NodeId)]) -> AdjacencyMatrix {
        AdjacencyMatrix::from_edges(n, edges.to_vec()).expect("valid edges")
    }

    #[test]
    fn rows_sum_to_one_and_dangling_rows_stay_empty() {
        let adj = matrix(4, &[(0, 1), (0, 2), (0, 3), (1, 2), (3, 0)]);
        let t = TransitionMatrix::from_adjacency(&adj);

        for i in [0, 1, 3] {
            let sum: f64 = t.row_weights(i).iter().sum();
            assert!((sum - 1.0).abs() < 1e-12, "row {i} sums to {sum}");
        }
        assert!(t.row_weights(2).is_empty());
        assert_eq!(t.dangling(), [2]);
        assert!((t.out_degree(0) - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn caller_matrix_is_left_unnormalized() {
        let adj = matrix(2, &[(0, 0), (0, 1)]);
        let before = adj.clone();
        let _ = TransitionMatrix::from_adjacency(&adj);
        assert_eq!(adj, before);
        assert!((adj.row_sum(0) - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn pull_matches_dense_product() {
        let adj = matrix(3, &[(0, 1), (0, 2), (1, 2), (2, 0)]);
        let t = TransitionMatrix::from_adjacency(&adj);
        let x = [0.2, 0.3, 0.5];
        let mut out = [0.0; 3];
        t.pull(&x, &mut out);

        // x · P by hand: col0 = 0.5, col1 = 0.1, col2 = 0.1 + 0.3.
        let expected = [0.5, 0.1, 0.4];
        for (got, want) in out.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12, "{got} vs {want}");
        }
    }

    #[test]
    fn dangling_mass_sums_dangling_entries() {
        let adj = matrix(3, &[(0, 1)]);
        let t = TransitionMatrix::from_adjacency(&adj);
        assert_eq!(t.dangling(), [1, 2]);
        assert!((t.dangling_mass(&[0.5, 0.25, 0.25]) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn empty_matrix_is_fine() {
        let t = TransitionMatrix::from_adjacency(&AdjacencyMatrix::empty(0));
        assert_eq!(t.dim(), 0);
        let mut out: [f64; 0] = [];
        t.pull(&[], &mut out);
    }
}
