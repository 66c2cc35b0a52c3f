//! Link-graph construction from a raw link-triple stream.
//!
//! # Overview
//!
//! Each link triple `subject → object` is resolved through the
//! [`RedirectMap`], both endpoints are interned into the [`NameIndex`]
//! (subject first), and the `(row, col)` pair is recorded. Once the stream
//! ends, or the optional edge limit is hit, the pairs are sorted,
//! deduplicated and packed into an [`AdjacencyMatrix`] sized to the final
//! index.
//!
//! ## Truncation
//!
//! The limit is a strict prefix cutoff on ingested edges, not a sample.
//! Once it is reached the reader looks ahead for one more triple, and the
//! graph is marked truncated only if one exists.
//!
//! ## Determinism
//!
//! Ids depend only on the order in which resolved names first appear, so
//! identical input and identical limit produce identical output.

#![allow(clippy::module_name_repetitions)]

use std::io::BufRead;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::RankError;
use crate::graph::adjacency::AdjacencyMatrix;
use crate::graph::index::{NameIndex, NodeId};
use crate::progress::Progress;
use crate::redirect::RedirectMap;
use crate::triple::{Namespace, StreamStats, Triple, TripleReader};

// ---------------------------------------------------------------------------
// LinkGraph
// ---------------------------------------------------------------------------

/// Counters describing one ingest pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    /// Line accounting of the link stream.
    pub stream: StreamStats,
    /// Edges accepted before deduplication.
    pub edges_read: u64,
    /// Whether the edge limit cut off a triple that would have been ingested.
    pub truncated: bool,
}

/// The built graph: adjacency structure plus the id ↔ name arena.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkGraph {
    pub adjacency: AdjacencyMatrix,
    pub index: NameIndex,
    pub stats: IngestStats,
}

impl LinkGraph {
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.index.len()
    }

    /// Distinct edges (after duplicate collapse).
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.adjacency.nnz()
    }

    /// Nodes with no outgoing edge.
    #[must_use]
    pub fn dangling_count(&self) -> usize {
        self.adjacency.empty_rows().count()
    }

    /// Check the adjacency layout and that it is sized to the index.
    ///
    /// # Errors
    ///
    /// Returns [`RankError::InconsistentGraph`] on the first violation.
    pub fn validate(&self) -> Result<(), RankError> {
        self.adjacency.validate()?;
        if self.adjacency.dim() != self.index.len() {
            return Err(RankError::InconsistentGraph(format!(
                "{}-node matrix for {} names",
                self.adjacency.dim(),
                self.index.len()
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Options for [`build_link_graph`].
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub namespace: Namespace,
    /// Maximum number of edges to ingest.
    pub limit: Option<usize>,
    /// Progress batch size in lines (0 disables).
    pub progress_interval: u64,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            namespace: Namespace::default(),
            limit: None,
            progress_interval: Progress::DEFAULT_INTERVAL,
        }
    }
}

/// Reject a zero edge limit; `None` means unbounded.
///
/// # Errors
///
/// Returns [`RankError::InvalidParameter`] for `Some(0)`.
pub fn validate_limit(limit: Option<usize>) -> Result<(), RankError> {
    if limit == Some(0) {
        return Err(RankError::invalid("limit", 0, "must be a positive edge count"));
    }
    Ok(())
}

/// Two-phase builder: accumulate resolved pairs, then pack once.
#[derive(Debug)]
pub struct GraphBuilder<'r> {
    redirects: &'r RedirectMap,
    index: NameIndex,
    edges: Vec<(NodeId, NodeId)>,
    limit: Option<usize>,
    truncated: bool,
}

impl<'r> GraphBuilder<'r> {
    #[must_use]
    pub fn new(redirects: &'r RedirectMap) -> Self {
        Self {
            redirects,
            index: NameIndex::new(),
            edges: Vec::new(),
            limit: None,
            truncated: false,
        }
    }

    /// Cap the number of edges accepted.
    ///
    /// # Errors
    ///
    /// Returns [`RankError::InvalidParameter`] for a zero limit.
    pub fn with_limit(mut self, limit: Option<usize>) -> Result<Self, RankError> {
        validate_limit(limit)?;
        self.limit = limit;
        Ok(self)
    }

    /// Returns `true` once the edge limit has been reached.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.limit.is_some_and(|limit| self.edges.len() >= limit)
    }

    /// Record one link after redirect resolution.
    ///
    /// Returns `Ok(false)` (recording nothing, marking the graph truncated)
    /// when the limit is already reached.
    ///
    /// # Errors
    ///
    /// Returns [`RankError::IdSpaceExhausted`] if a new name has no id left.
    pub fn push(&mut self, subject: &str, object: &str) -> Result<bool, RankError> {
        if self.is_full() {
            self.truncated = true;
            return Ok(false);
        }
        let i = self.index.intern(self.redirects.resolve(subject))?;
        let j = self.index.intern(self.redirects.resolve(object))?;
        self.edges.push((i, j));
        Ok(true)
    }

    /// Consume triples until the stream ends or the limit is reached.
    ///
    /// At the limit one more item is pulled from `triples`; any item there,
    /// including a read error, marks the graph truncated.
    ///
    /// # Errors
    ///
    /// Propagates the first read error before the limit and any id
    /// exhaustion.
    pub fn extend<I>(&mut self, triples: I) -> Result<(), RankError>
    where
        I: IntoIterator<Item = Result<Triple, RankError>>,
    {
        let mut triples = triples.into_iter();
        while !self.is_full() {
            let Some(triple) = triples.next() else {
                break;
            };
            let triple = triple?;
            self.push(&triple.subject, &triple.object)?;
        }
        if self.is_full() && triples.next().is_some() {
            self.truncated = true;
        }
        Ok(())
    }

    /// Pack the recorded pairs into the final [`LinkGraph`].
    ///
    /// # Errors
    ///
    /// Only fails if an internal id is out of range, which indicates a bug.
    pub fn finish(self, stream: StreamStats) -> Result<LinkGraph, RankError> {
        let truncated = self.truncated;
        let edges_read = self.edges.len() as u64;
        let adjacency = AdjacencyMatrix::from_edges(self.index.len(), self.edges)?;

        info!(
            nodes = self.index.len(),
            edges = adjacency.nnz(),
            edges_read,
            truncated,
            "link graph built"
        );

        Ok(LinkGraph {
            adjacency,
            index: self.index,
            stats: IngestStats {
                stream,
                edges_read,
                truncated,
            },
        })
    }
}

/// Read a link stream and build its [`LinkGraph`].
///
/// # Errors
///
/// Returns [`RankError::InvalidParameter`] for a zero limit and
/// [`RankError::Io`] if the reader fails.
#[instrument(skip(reader, redirects, options), fields(limit = ?options.limit))]
pub fn build_link_graph<R: BufRead>(
    reader: R,
    redirects: &RedirectMap,
    options: &BuildOptions,
) -> Result<LinkGraph, RankError> {
    let mut builder = GraphBuilder::new(redirects).with_limit(options.limit)?;
    let mut triples = TripleReader::new(
        reader,
        options.namespace.clone(),
        Progress::new("links", options.progress_interval),
    );
    builder.extend(triples.by_ref())?;
    builder.finish(triples.stats())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
