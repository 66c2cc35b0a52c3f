//! Centrality metrics over a built link graph.
//!
//! - **Power iteration** (`pagerank`): damped stationary distribution of
//!   the random surfer, with dangling-mass redistribution.
//! - **Transition matrix** (`transition`): the row-normalized working copy
//!   the iteration runs on.
//! - **SVD** (`svd`): dominant singular pair of the raw matrix, for
//!   cross-checking small graphs.
//!
//! ```rust,ignore
//! use wikirank_rank::metrics::pagerank::{CentralityConfig, CentralityEngine};
//!
//! let engine = CentralityEngine::new(&graph.adjacency);
//! let result = engine.run(&CentralityConfig::default())?;
//! if !result.converged() {
//!     // best-effort vector; inspect result.error
//! }
//! ```

pub mod pagerank;
pub mod svd;
pub mod transition;
