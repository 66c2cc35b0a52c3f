//! Top-k view of a score vector.
//!
//! Nodes are ranked by absolute score, so the same routine serves
//! centrality vectors and sign-ambiguous singular vectors. Ties break on
//! the smaller id, which keeps the output stable across runs.

use std::cmp::Ordering;

use serde::Serialize;
use wikirank_core::error::RankError;
use wikirank_core::graph::NameIndex;

pub use wikirank_core::config::SortOrder;

/// One row of a ranked listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedNode {
    pub id: usize,
    pub name: String,
    pub score: f64,
}

fn by_magnitude(scores: &[f64], a: usize, b: usize) -> Ordering {
    scores[b]
        .abs()
        .total_cmp(&scores[a].abs())
        .then_with(|| a.cmp(&b))
}

/// The `k` nodes with the largest absolute score.
///
/// `k` is clamped to the vector length. [`SortOrder::Descending`] lists the
/// strongest first; [`SortOrder::Ascending`] lists the same `k` nodes
/// weakest first.
///
/// # Errors
///
/// Returns [`RankError::UnknownNodeId`] if `scores` has entries beyond the
/// end of `index`.
pub fn top_k(
    scores: &[f64],
    index: &NameIndex,
    k: usize,
    order: SortOrder,
) -> Result<Vec<RankedNode>, RankError> {
    if scores.len() > index.len() {
        return Err(RankError::UnknownNodeId {
            id: index.len(),
            len: index.len(),
        });
    }

    let k = k.min(scores.len());
    if k == 0 {
        return Ok(Vec::new());
    }

    let mut ids: Vec<usize> = (0..scores.len()).collect();
    if k < ids.len() {
        ids.select_nth_unstable_by(k - 1, |&a, &b| by_magnitude(scores, a, b));
        ids.truncate(k);
    }
    ids.sort_unstable_by(|&a, &b| by_magnitude(scores, a, b));
    if order == SortOrder::Ascending {
        ids.reverse();
    }

    ids.into_iter()
        .map(|id| {
            Ok(RankedNode {
                id,
                name: index.name(id)?.to_owned(),
                score: scores[id],
            })
        })
        .collect()
}
