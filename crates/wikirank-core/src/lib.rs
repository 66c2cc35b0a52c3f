//! wikirank-core: the ingest half of wikirank.
//!
//! Streams N-Triples-style redirect and link dumps, collapses redirect
//! chains into a single-step [`redirect::RedirectMap`], and packs the
//! resolved link relation into a sparse [`graph::AdjacencyMatrix`] with a
//! dense [`graph::NameIndex`].
//!
//! # Conventions
//!
//! - **Errors**: library operations return [`error::RankError`]; file and
//!   config plumbing returns `anyhow::Result` with context.
//! - **Logging**: `tracing` macros only. Per-line noise goes to `debug!`,
//!   stage summaries and progress to `info!`, suspicious input to `warn!`.

#![forbid(unsafe_code)]

pub mod cache;
pub mod config;
pub mod error;
pub mod graph;
pub mod progress;
pub mod redirect;
pub mod triple;

pub use error::{ErrorCode, RankError};
