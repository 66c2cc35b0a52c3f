#![forbid(unsafe_code)]
//! wikirank-rank: centrality scores and ranked views over a link graph.
//!
//! # Conventions
//!
//! - **Errors**: numerical entry points return
//!   [`wikirank_core::RankError`]; the dense SVD check returns
//!   `anyhow::Result`.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `debug!`).

pub mod metrics;
pub mod report;

pub use metrics::pagerank::{
    CentralityConfig, CentralityEngine, CentralityResult, StopReason, centrality,
};
pub use report::{RankedNode, SortOrder, top_k};
