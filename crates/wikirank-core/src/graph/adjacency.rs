//! Compressed sparse row (CSR) adjacency matrix.
//!
//! ```text
//! row_ptr[0]   = 0
//! row_ptr[i+1] = row_ptr[i] + |row i|
//! row i        = col_idx[row_ptr[i] .. row_ptr[i+1]]   (sorted, unique)
//! ```
//!
//! Every stored cell holds `1.0`: duplicate edges collapse rather than
//! accumulate, so the matrix encodes a binary "links to" relation.
//! The matrix is immutable once built; centrality code normalizes a
//! private copy. A matrix that did not come from [`AdjacencyMatrix::from_edges`]
//! (a deserialized cache entry) must pass [`AdjacencyMatrix::validate`]
//! before any row is sliced.

use serde::{Deserialize, Serialize};

use crate::error::RankError;
use crate::graph::index::NodeId;

/// N×N sparse nonnegative matrix in CSR form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdjacencyMatrix {
    n: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<NodeId>,
    values: Vec<f32>,
}

impl AdjacencyMatrix {
    /// An `n × n` matrix with no stored cells.
    #[must_use]
    pub fn empty(n: usize) -> Self {
        Self {
            n,
            row_ptr: vec![0; n + 1],
            col_idx: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Build from `(row, col)` pairs in one allocation.
    ///
    /// Pairs are sorted and deduplicated first; each surviving pair becomes
    /// a unit cell.
    ///
    /// # Errors
    ///
    /// Returns [`RankError::UnknownNodeId`] if any endpoint is `>= n`.
    pub fn from_edges(n: usize, mut edges: Vec<(NodeId, NodeId)>) -> Result<Self, RankError> {
        if let Some(&(r, c)) = edges
            .iter()
            .find(|&&(r, c)| r as usize >= n || c as usize >= n)
        {
            return Err(RankError::UnknownNodeId {
                id: (r as usize).max(c as usize),
                len: n,
            });
        }

        edges.sort_unstable();
        edges.dedup();

        let mut row_ptr = vec![0_usize; n + 1];
        for &(r, _) in &edges {
            row_ptr[r as usize + 1] += 1;
        }
        for i in 0..n {
            row_ptr[i + 1] += row_ptr[i];
        }

        let col_idx: Vec<NodeId> = edges.into_iter().map(|(_, c)| c).collect();
        let values = vec![1.0_f32; col_idx.len()];

        Ok(Self {
            n,
            row_ptr,
            col_idx,
            values,
        })
    }

    /// Check the CSR invariants listed in the module docs.
    ///
    /// # Errors
    ///
    /// Returns [`RankError::InconsistentGraph`] naming the first violation.
    pub fn validate(&self) -> Result<(), RankError> {
        let fail = |reason: String| Err(RankError::InconsistentGraph(reason));

        if self.row_ptr.len() != self.n + 1 {
            return fail(format!(
                "row_ptr has {} entries for {} rows",
                self.row_ptr.len(),
                self.n
            ));
        }
        if self.row_ptr[0] != 0 {
            return fail(format!("row_ptr starts at {}", self.row_ptr[0]));
        }
        if let Some(i) = self.row_ptr.windows(2).position(|w| w[0] > w[1]) {
            return fail(format!("row_ptr decreases at row {i}"));
        }
        let nnz = self.row_ptr[self.n];
        if nnz != self.col_idx.len() || nnz != self.values.len() {
            return fail(format!(
                "row_ptr ends at {nnz} but {} columns and {} values are stored",
                self.col_idx.len(),
                self.values.len()
            ));
        }
        if let Some(&c) = self.col_idx.iter().find(|&&c| c as usize >= self.n) {
            return fail(format!("column {c} out of range for {} nodes", self.n));
        }
        for i in 0..self.n {
            if self.row_indices(i).windows(2).any(|w| w[0] >= w[1]) {
                return fail(format!("row {i} is not strictly ascending"));
            }
        }
        Ok(())
    }

    /// Matrix dimension N.
    #[must_use]
    pub const fn dim(&self) -> usize {
        self.n
    }

    /// Number of stored (nonzero) cells.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.col_idx.len()
    }

    /// Row pointer array (length N + 1).
    #[must_use]
    pub fn row_ptr(&self) -> &[usize] {
        &self.row_ptr
    }

    /// Column indices of row `i`, ascending.
    #[must_use]
    pub fn row_indices(&self, i: usize) -> &[NodeId] {
        &self.col_idx[self.row_ptr[i]..self.row_ptr[i + 1]]
    }

    /// Stored values of row `i`, aligned with [`Self::row_indices`].
    #[must_use]
    pub fn row_values(&self, i: usize) -> &[f32] {
        &self.values[self.row_ptr[i]..self.row_ptr[i + 1]]
    }

    /// Sum of row `i` (its out-degree for a binary matrix).
    #[must_use]
    pub fn row_sum(&self, i: usize) -> f64 {
        self.row_values(i).iter().map(|&v| f64::from(v)).sum()
    }

    /// Value at `(i, j)`; zero when the cell is not stored.
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> f32 {
        if i >= self.n {
            return 0.0;
        }
        let Ok(j) = NodeId::try_from(j) else {
            return 0.0;
        };
        self.row_indices(i)
            .binary_search(&j)
            .map_or(0.0, |pos| self.row_values(i)[pos])
    }

    /// Returns `true` if the edge `i → j` exists.
    #[must_use]
    pub fn contains(&self, i: usize, j: usize) -> bool {
        i < self.n
            && NodeId::try_from(j).is_ok_and(|j| self.row_indices(i).binary_search(&j).is_ok())
    }

    /// Rows with no stored cells.
    pub fn empty_rows(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.n).filter(|&i| self.row_ptr[i] == self.row_ptr[i + 1])
    }

    /// All stored cells as `(row, col, value)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, NodeId, f32)> + '_ {
        (0..self.n).flat_map(move |i| {
            self.row_indices(i)
                .iter()
                .zip(self.row_values(i))
                .map(move |(&j, &v)| (i, j, v))
        })
    }
}
