//! Dominant singular pair of the raw adjacency matrix.
//!
//! Used as an independent check on power iteration: the left singular
//! vector scores pages as hubs (they link to important pages), the right
//! one as authorities (important pages link to them). On well-connected
//! graphs the authority ordering should broadly agree with centrality.
//!
//! This goes through a dense decomposition, so it refuses graphs larger
//! than a configurable node cap.

use anyhow::{Result, anyhow, bail};
use nalgebra::DMatrix;
use serde::Serialize;
use tracing::{info, instrument};
use wikirank_core::graph::AdjacencyMatrix;

/// Default node cap for the dense decomposition.
pub const DEFAULT_MAX_NODES: usize = 2_000;

/// Largest singular value with its left (hub) and right (authority) vectors.
#[derive(Debug, Clone, Serialize)]
pub struct SingularPair {
    pub value: f64,
    pub hubs: Vec<f64>,
    pub authorities: Vec<f64>,
}

/// Decompose `adjacency` and keep the dominant component.
///
/// Signs are normalized so the vectors have a nonnegative sum.
///
/// # Errors
///
/// Fails if the matrix has more than `max_nodes` rows or the
/// decomposition does not converge.
#[instrument(skip(adjacency), fields(n = adjacency.dim()))]
pub fn principal_singular_pair(adjacency: &AdjacencyMatrix, max_nodes: usize) -> Result<SingularPair> {
    let n = adjacency.dim();
    if n == 0 {
        return Ok(SingularPair {
            value: 0.0,
            hubs: Vec::new(),
            authorities: Vec::new(),
        });
    }
    if n > max_nodes {
        bail!("Too many nodes for dense SVD cross-check ({n} > {max_nodes})");
    }

    let mut dense = DMatrix::<f64>::zeros(n, n);
    for (i, j, v) in adjacency.iter() {
        dense[(i, j as usize)] = f64::from(v);
    }

    let svd = dense
        .try_svd(true, true, f64::EPSILON, 0)
        .ok_or_else(|| anyhow!("SVD did not converge"))?;
    let u = svd.u.as_ref().ok_or_else(|| anyhow!("SVD returned no left vectors"))?;
    let v_t = svd
        .v_t
        .as_ref()
        .ok_or_else(|| anyhow!("SVD returned no right vectors"))?;

    let (k, &value) = svd
        .singular_values
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .ok_or_else(|| anyhow!("SVD returned no singular values"))?;

    let mut hubs: Vec<f64> = u.column(k).iter().copied().collect();
    let mut authorities: Vec<f64> = v_t.row(k).iter().copied().collect();
    if hubs.iter().sum::<f64>() < 0.0 {
        hubs.iter_mut().for_each(|x| *x = -*x);
        authorities.iter_mut().for_each(|x| *x = -*x);
    }

    info!(value, "principal singular pair computed");
    Ok(SingularPair {
        value,
        hubs,
        authorities,
    })
}
