//! Subcommand handlers plus the input plumbing they share.

pub mod graph;
pub mod rank;
pub mod redirects;

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tracing::{info, warn};

use wikirank_core::cache::{CacheKey, GraphCache};
use wikirank_core::config::RankConfig;
use wikirank_core::graph::{BuildOptions, LinkGraph, build_link_graph, validate_limit};
use wikirank_core::redirect::{RedirectMap, RedirectResolver};
use wikirank_core::triple::{Namespace, StreamStats};

/// Reader buffer size for multi-gigabyte dumps.
const INPUT_BUFFER_BYTES: usize = 1 << 20;

/// Input flags shared by commands that build the link graph.
#[derive(Args, Debug, Clone)]
pub struct GraphInputArgs {
    /// Redirect triples (N-Triples, uncompressed; `-` for stdin).
    #[arg(long, value_name = "PATH")]
    pub redirects: PathBuf,

    /// Link triples (N-Triples, uncompressed; `-` for stdin).
    #[arg(long, value_name = "PATH")]
    pub links: PathBuf,

    /// Stop after this many link edges (strict prefix of the stream).
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// Resource namespace prefix stripped from URIs.
    #[arg(long, value_name = "URI")]
    pub namespace: Option<String>,

    /// Skip the graph cache for this run.
    #[arg(long)]
    pub no_cache: bool,

    /// Use this graph cache directory (enables the cache even if the config
    /// turns it off).
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

/// Open `path` for buffered reading; `-` is stdin.
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(BufReader::with_capacity(
            INPUT_BUFFER_BYTES,
            io::stdin(),
        )));
    }
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(Box::new(BufReader::with_capacity(INPUT_BUFFER_BYTES, file)))
}

/// Namespace from the flag if given, else from config.
pub fn namespace(flag: Option<&str>, config: &RankConfig) -> Namespace {
    flag.map_or_else(|| config.input.namespace.clone(), Namespace::new)
}

/// Read and close the redirect relation.
pub fn load_redirects(
    path: &Path,
    namespace: Namespace,
    config: &RankConfig,
) -> Result<(RedirectMap, StreamStats)> {
    let reader = open_input(path)?;
    let resolver =
        RedirectResolver::new(namespace).with_progress_interval(config.input.progress_interval);
    resolver
        .resolve(reader)
        .with_context(|| format!("Failed to read redirects from {}", path.display()))
}

/// Redirect accounting, present only when redirects were actually read.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RedirectSummary {
    pub redirects: usize,
    pub cycle_breaks: usize,
    pub stream: StreamStats,
}

/// A link graph and where it came from.
#[derive(Debug)]
pub struct LoadedGraph {
    pub graph: LinkGraph,
    pub redirects: Option<RedirectSummary>,
    pub from_cache: bool,
}

fn open_cache(args: &GraphInputArgs, config: &RankConfig) -> Option<GraphCache> {
    if args.no_cache {
        return None;
    }
    let dir = args
        .cache_dir
        .clone()
        .or_else(|| config.cache.resolved_dir())?;
    match GraphCache::open(&dir) {
        Ok(cache) => Some(cache),
        Err(e) => {
            warn!(error = %format!("{e:#}"), "graph cache unavailable");
            None
        }
    }
}

/// Build the link graph, consulting the content-addressed cache first.
pub fn load_graph(args: &GraphInputArgs, config: &RankConfig) -> Result<LoadedGraph> {
    let namespace = namespace(args.namespace.as_deref(), config);
    let limit = args.limit.or(config.input.limit);
    // Before hashing or reading either input.
    validate_limit(limit)?;

    let cache = open_cache(args, config);
    let key = match &cache {
        Some(_) => CacheKey::from_inputs(&args.redirects, &args.links, &namespace, limit)?,
        None => None,
    };

    if let (Some(cache), Some(key)) = (&cache, &key) {
        if let Some(graph) = cache.load(key) {
            return Ok(LoadedGraph {
                graph,
                redirects: None,
                from_cache: true,
            });
        }
    }

    let (redirects, redirect_stream) = load_redirects(&args.redirects, namespace.clone(), config)?;
    let options = BuildOptions {
        namespace,
        limit,
        progress_interval: config.input.progress_interval,
    };
    let graph = build_link_graph(open_input(&args.links)?, &redirects, &options)
        .with_context(|| format!("Failed to build link graph from {}", args.links.display()))?;

    if let (Some(cache), Some(key)) = (&cache, &key) {
        match cache.store(key, &graph) {
            Ok(path) => info!(path = %path.display(), "graph cached"),
            Err(e) => warn!(error = %format!("{e:#}"), "failed to write graph cache"),
        }
    }

    Ok(LoadedGraph {
        graph,
        redirects: Some(RedirectSummary {
            redirects: redirects.len(),
            cycle_breaks: redirects.cycle_breaks(),
            stream: redirect_stream,
        }),
        from_cache: false,
    })
}
