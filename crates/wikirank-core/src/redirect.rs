//! Redirect resolution: raw redirect edges closed under transitivity.
//!
//! # Pipeline
//!
//! ```text
//! redirect triples
//!        ↓  RedirectResolver::read_graph()
//! RedirectGraph (name → name, may chain or cycle)
//!        ↓  RedirectGraph::close()
//! RedirectMap (every key → final target in one lookup)
//! ```
//!
//! # Closure
//!
//! Each key is resolved by walking `key → g[key] → g[g[key]] → …` over the
//! *raw* relation with a per-walk visited set. The walk ends as soon as the
//! next hop is absent ([`ChainEnd::Terminal`]) or was already visited on
//! this walk ([`ChainEnd::Cycle`]). In the cycle case the key resolves to
//! the last name reached before the revisit, so for `A → B → C → A` the
//! key `A` resolves to `C`. A self-redirect `A → A` resolves to `A`.
//!
//! Terminal walks are memoized: every name on an acyclic path shares the
//! same terminal, so long chains are walked once.
//!
//! Duplicate sources keep the last target seen in the stream.

use std::collections::{HashMap, HashSet};
use std::io::BufRead;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::{info, instrument, warn};

use crate::error::RankError;
use crate::progress::Progress;
use crate::triple::{Namespace, StreamStats, Triple, TripleReader};

/// Largest number of cycle members echoed into a warning.
const CYCLE_SAMPLE: usize = 5;

// ---------------------------------------------------------------------------
// Raw relation
// ---------------------------------------------------------------------------

/// How a redirect walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainEnd<'a> {
    /// Reached a name with no outgoing redirect.
    Terminal(&'a str),
    /// The next hop was already visited; carries the last name reached.
    Cycle(&'a str),
}

impl<'a> ChainEnd<'a> {
    #[must_use]
    pub const fn target(self) -> &'a str {
        match self {
            Self::Terminal(name) | Self::Cycle(name) => name,
        }
    }
}

/// The redirect relation exactly as read, before closure.
#[derive(Debug, Clone, Default)]
pub struct RedirectGraph {
    edges: HashMap<String, String>,
}

impl RedirectGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `source → target`, replacing any earlier target for `source`.
    pub fn insert(&mut self, source: impl Into<String>, target: impl Into<String>) {
        self.edges.insert(source.into(), target.into());
    }

    /// Build the relation from a stream of redirect triples.
    ///
    /// # Errors
    ///
    /// Propagates the first read error from `triples`.
    pub fn from_triples<I>(triples: I) -> Result<Self, RankError>
    where
        I: IntoIterator<Item = Result<Triple, RankError>>,
    {
        let mut graph = Self::new();
        for triple in triples {
            let Triple { subject, object } = triple?;
            graph.insert(subject, object);
        }
        Ok(graph)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Direct (single-hop) target of `name`, if any.
    #[must_use]
    pub fn target(&self, name: &str) -> Option<&str> {
        self.edges.get(name).map(String::as_str)
    }

    /// Follow the chain starting at `source` to its end.
    ///
    /// A name with no outgoing redirect is its own terminal.
    #[must_use]
    pub fn walk<'a>(&'a self, source: &'a str) -> ChainEnd<'a> {
        self.walk_memo(source, &mut HashMap::new())
    }

    fn walk_memo<'a>(
        &'a self,
        source: &'a str,
        memo: &mut HashMap<&'a str, &'a str>,
    ) -> ChainEnd<'a> {
        let Some(first) = self.edges.get(source) else {
            return ChainEnd::Terminal(source);
        };

        let mut seen: HashSet<&'a str> = HashSet::from([source]);
        let mut path: Vec<&'a str> = vec![source];
        let mut current: &'a str = first.as_str();

        let end = loop {
            if let Some(&terminal) = memo.get(current) {
                break ChainEnd::Terminal(terminal);
            }
            seen.insert(current);
            match self.edges.get(current) {
                None => break ChainEnd::Terminal(current),
                Some(next) if seen.contains(next.as_str()) => break ChainEnd::Cycle(current),
                Some(next) => {
                    path.push(current);
                    current = next.as_str();
                }
            }
        };

        if let ChainEnd::Terminal(terminal) = end {
            for name in path {
                memo.insert(name, terminal);
            }
        }
        end
    }

    /// Close the relation under transitivity.
    #[must_use]
    #[instrument(skip(self, progress), fields(redirects = self.edges.len()))]
    pub fn close(&self, progress: Progress) -> RedirectMap {
        let mut memo: HashMap<&str, &str> = HashMap::with_capacity(self.edges.len());
        let mut targets: HashMap<String, String> = HashMap::with_capacity(self.edges.len());
        let mut cycle_breaks = 0_usize;

        for (done, source) in self.edges.keys().enumerate() {
            let end = self.walk_memo(source, &mut memo);
            if matches!(end, ChainEnd::Cycle(_)) {
                cycle_breaks += 1;
            }
            targets.insert(source.clone(), end.target().to_owned());
            progress.observe(done as u64 + 1);
        }

        if cycle_breaks > 0 {
            warn!(cycle_breaks, "redirect chains ended on a cycle");
        }
        info!(redirects = targets.len(), "redirect closure complete");

        RedirectMap {
            targets,
            cycle_breaks,
        }
    }

    /// Groups of names that redirect to one another in a loop.
    ///
    /// Each group is a strongly connected component of the raw relation
    /// with more than one member, or a single self-redirecting name.
    /// Members and groups are sorted for deterministic output.
    #[must_use]
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let mut graph = DiGraph::<&str, ()>::new();
        let mut node_map: HashMap<&str, NodeIndex> = HashMap::with_capacity(self.edges.len());

        for (source, target) in &self.edges {
            let s = *node_map
                .entry(source.as_str())
                .or_insert_with(|| graph.add_node(source.as_str()));
            let t = *node_map
                .entry(target.as_str())
                .or_insert_with(|| graph.add_node(target.as_str()));
            graph.add_edge(s, t, ());
        }

        let mut groups: Vec<Vec<String>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
            .map(|scc| {
                let mut members: Vec<String> =
                    scc.into_iter().map(|idx| graph[idx].to_string()).collect();
                members.sort_unstable();
                members
            })
            .collect();
        groups.sort_unstable();

        if let Some(first) = groups.first() {
            let sample: Vec<&str> = first.iter().take(CYCLE_SAMPLE).map(String::as_str).collect();
            warn!(groups = groups.len(), ?sample, "redirect cycles present");
        }
        groups
    }
}

// ---------------------------------------------------------------------------
// Closed map
// ---------------------------------------------------------------------------

/// Canonical-name lookup closed under transitivity.
///
/// Read-only once built. Names absent from the map are their own
/// canonical form.
#[derive(Debug, Clone, Default)]
pub struct RedirectMap {
    targets: HashMap<String, String>,
    cycle_breaks: usize,
}

impl RedirectMap {
    /// The identity mapping: resolves every name to itself.
    #[must_use]
    pub fn identity() -> Self {
        Self::default()
    }

    /// Resolve `name` to its canonical target in one lookup.
    #[must_use]
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.targets.get(name).map_or(name, String::as_str)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.targets.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Number of keys whose walk was stopped by the cycle guard.
    #[must_use]
    pub const fn cycle_breaks(&self) -> usize {
        self.cycle_breaks
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.targets.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Reads a redirect stream and produces its closed [`RedirectMap`].
#[derive(Debug, Clone)]
pub struct RedirectResolver {
    namespace: Namespace,
    progress_interval: u64,
}

impl RedirectResolver {
    #[must_use]
    pub const fn new(namespace: Namespace) -> Self {
        Self {
            namespace,
            progress_interval: Progress::DEFAULT_INTERVAL,
        }
    }

    /// Set the progress batch size (0 disables progress events).
    #[must_use]
    pub const fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Parse the raw relation without closing it.
    ///
    /// # Errors
    ///
    /// Returns [`RankError::Io`] if the reader fails.
    #[instrument(skip_all)]
    pub fn read_graph<R: BufRead>(&self, reader: R) -> Result<(RedirectGraph, StreamStats), RankError> {
        let mut triples = TripleReader::new(
            reader,
            self.namespace.clone(),
            Progress::new("redirects", self.progress_interval),
        );
        let graph = RedirectGraph::from_triples(triples.by_ref())?;
        Ok((graph, triples.stats()))
    }

    /// Parse and close the redirect relation.
    ///
    /// # Errors
    ///
    /// Returns [`RankError::Io`] if the reader fails.
    pub fn resolve<R: BufRead>(&self, reader: R) -> Result<(RedirectMap, StreamStats), RankError> {
        let (graph, stats) = self.read_graph(reader)?;
        let map = graph.close(Progress::new("closure", self.progress_interval));
        Ok((map, stats))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
