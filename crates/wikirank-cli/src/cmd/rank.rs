use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tracing::info;

use wikirank_core::config::RankConfig;
use wikirank_rank::metrics::pagerank::{CentralityConfig, CentralityEngine, StopReason};
use wikirank_rank::metrics::svd::{DEFAULT_MAX_NODES, principal_singular_pair};
use wikirank_rank::report::{RankedNode, SortOrder, top_k};

use crate::cmd::{GraphInputArgs, RedirectSummary, load_graph};
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

/// Arguments for `wr rank`.
#[derive(Args, Debug)]
pub struct RankArgs {
    #[command(flatten)]
    pub input: GraphInputArgs,

    /// Number of names to list.
    #[arg(long, short = 'k', value_name = "K")]
    pub top: Option<usize>,

    /// List the top-k weakest first.
    #[arg(long)]
    pub ascending: bool,

    /// Probability of following a link, strictly between 0 and 1.
    #[arg(long)]
    pub damping: Option<f64>,

    /// Iteration cap for power iteration.
    #[arg(long)]
    pub max_iter: Option<usize>,

    /// Per-node convergence tolerance.
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Also rank hubs and authorities from a dense SVD (small graphs only).
    #[arg(long)]
    pub svd: bool,

    /// Node cap for `--svd`.
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_NODES)]
    pub svd_max_nodes: usize,

    /// Write every score with the id→name list as JSON to PATH (`-` for
    /// stdout, replacing the report).
    #[arg(long, value_name = "PATH")]
    pub dump: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct SvdReport {
    singular_value: f64,
    hubs: Vec<RankedNode>,
    authorities: Vec<RankedNode>,
}

#[derive(Debug, Serialize)]
struct RankReport {
    nodes: usize,
    edges: usize,
    dangling: usize,
    from_cache: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirects: Option<RedirectSummary>,
    damping: f64,
    iterations: usize,
    error: f64,
    stop: StopReason,
    order: SortOrder,
    top: Vec<RankedNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    svd: Option<SvdReport>,
}

#[derive(Debug, Serialize)]
struct ScoreDump<'a> {
    iterations: usize,
    stop: StopReason,
    names: &'a [String],
    scores: &'a [f64],
}

fn centrality_config(args: &RankArgs, config: &RankConfig) -> CentralityConfig {
    let base = CentralityConfig::from(&config.centrality);
    CentralityConfig {
        damping: args.damping.unwrap_or(base.damping),
        tolerance: args.tolerance.unwrap_or(base.tolerance),
        max_iter: args.max_iter.unwrap_or(base.max_iter),
    }
}

/// Execute `wr rank`.
pub fn run_rank(args: &RankArgs, output: OutputMode, config: &RankConfig) -> Result<()> {
    let settings = centrality_config(args, config);
    // Fail before the (possibly long) ingest.
    settings.validate()?;

    let loaded = load_graph(&args.input, config)?;
    let graph = &loaded.graph;

    let result = CentralityEngine::new(&graph.adjacency).run(&settings)?;

    if let Some(path) = &args.dump {
        let dump = ScoreDump {
            iterations: result.iterations,
            stop: result.stop,
            names: graph.index.names(),
            scores: &result.scores,
        };
        if path.as_os_str() == "-" {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            serde_json::to_writer(&mut out, &dump)?;
            writeln!(out)?;
            return Ok(());
        }
        write_dump(path, &dump)?;
        info!(path = %path.display(), scores = dump.scores.len(), "scores written");
    }

    let order = if args.ascending {
        SortOrder::Ascending
    } else {
        config.report.order
    };
    let k = args.top.unwrap_or(config.report.top_k);
    let top = top_k(&result.scores, &graph.index, k, order)?;

    let svd = if args.svd {
        let pair = principal_singular_pair(&graph.adjacency, args.svd_max_nodes)?;
        Some(SvdReport {
            singular_value: pair.value,
            hubs: top_k(&pair.hubs, &graph.index, k, order)?,
            authorities: top_k(&pair.authorities, &graph.index, k, order)?,
        })
    } else {
        None
    };

    let report = RankReport {
        nodes: graph.node_count(),
        edges: graph.edge_count(),
        dangling: graph.dangling_count(),
        from_cache: loaded.from_cache,
        redirects: loaded.redirects,
        damping: settings.damping,
        iterations: result.iterations,
        error: result.error,
        stop: result.stop,
        order,
        top,
        svd,
    };

    render_mode(output, &report, render_text, render_pretty)
}

fn write_dump(path: &Path, dump: &ScoreDump<'_>) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer(&mut out, dump)?;
    writeln!(out)?;
    out.flush()
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn stop_label(stop: StopReason) -> &'static str {
    match stop {
        StopReason::Converged => "converged",
        StopReason::MaxIterations => "max-iterations",
        StopReason::Cancelled => "cancelled",
    }
}

fn write_rows(w: &mut dyn Write, rows: &[RankedNode]) -> io::Result<()> {
    for (rank, row) in rows.iter().enumerate() {
        writeln!(w, "{}\t{}\t{:.6e}", rank + 1, row.name, row.score)?;
    }
    Ok(())
}

fn render_text(report: &RankReport, w: &mut dyn Write) -> io::Result<()> {
    writeln!(
        w,
        "nodes {} edges {} iterations {} stop {}",
        report.nodes,
        report.edges,
        report.iterations,
        stop_label(report.stop)
    )?;
    write_rows(w, &report.top)?;
    if let Some(svd) = &report.svd {
        writeln!(w, "hubs")?;
        write_rows(w, &svd.hubs)?;
        writeln!(w, "authorities")?;
        write_rows(w, &svd.authorities)?;
    }
    Ok(())
}

fn write_table(w: &mut dyn Write, rows: &[RankedNode]) -> io::Result<()> {
    let width = rows.iter().map(|r| r.name.chars().count()).max().unwrap_or(4).max(4);
    writeln!(w, "{:>4}  {:<width$}  {:>14}", "#", "NAME", "SCORE")?;
    for (rank, row) in rows.iter().enumerate() {
        writeln!(w, "{:>4}  {:<width$}  {:>14.6e}", rank + 1, row.name, row.score)?;
    }
    Ok(())
}

fn render_pretty(report: &RankReport, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, "Graph")?;
    pretty_kv(w, "Nodes", report.nodes.to_string())?;
    pretty_kv(w, "Edges", report.edges.to_string())?;
    pretty_kv(w, "Dangling", report.dangling.to_string())?;
    pretty_kv(w, "Source", if report.from_cache { "cache" } else { "input" })?;
    if let Some(redirects) = &report.redirects {
        pretty_kv(w, "Redirects", redirects.redirects.to_string())?;
    }
    writeln!(w)?;

    pretty_section(w, "Centrality")?;
    pretty_kv(w, "Damping", report.damping.to_string())?;
    pretty_kv(w, "Iterations", report.iterations.to_string())?;
    pretty_kv(w, "Error", format!("{:.3e}", report.error))?;
    pretty_kv(w, "Stop", stop_label(report.stop))?;
    writeln!(w)?;

    let order = match report.order {
        SortOrder::Descending => "descending",
        SortOrder::Ascending => "ascending",
    };
    pretty_section(w, &format!("Top {} ({order})", report.top.len()))?;
    write_table(w, &report.top)?;

    if let Some(svd) = &report.svd {
        writeln!(w)?;
        pretty_section(w, &format!("SVD hubs (σ₁ = {:.4})", svd.singular_value))?;
        write_table(w, &svd.hubs)?;
        writeln!(w)?;
        pretty_section(w, "SVD authorities")?;
        write_table(w, &svd.authorities)?;
    }
    Ok(())
}
