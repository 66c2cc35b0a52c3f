//! Link graph module: dense ids and sparse adjacency.
//!
//! ## Pipeline
//!
//! ```text
//! link triples + RedirectMap
//!        ↓  build::build_link_graph()
//! (row, col) pairs, NameIndex (first-seen ids)
//!        ↓  sort + dedup, one allocation
//! AdjacencyMatrix (CSR, unit cells)
//! ```
//!
//! ## Typical Usage
//!
//! ```rust,ignore
//! use wikirank_core::graph::{BuildOptions, build_link_graph};
//! use wikirank_core::redirect::RedirectResolver;
//!
//! let (redirects, _) = RedirectResolver::new(ns.clone()).resolve(redirect_reader)?;
//! let graph = build_link_graph(link_reader, &redirects, &BuildOptions::default())?;
//! println!("nodes={} edges={}", graph.node_count(), graph.edge_count());
//! ```

pub mod adjacency;
pub mod build;
pub mod index;

pub use adjacency::AdjacencyMatrix;
pub use build::{
    BuildOptions, GraphBuilder, IngestStats, LinkGraph, build_link_graph, validate_limit,
};
pub use index::{NameIndex, NodeId};
