use std::io::{self, Write};

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use wikirank_core::config::RankConfig;
use wikirank_core::graph::IngestStats;

use crate::cmd::{GraphInputArgs, RedirectSummary, load_graph};
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

/// Arguments for `wr graph`.
#[derive(Args, Debug)]
pub struct GraphArgs {
    #[command(flatten)]
    pub input: GraphInputArgs,
}

#[derive(Debug, Serialize)]
struct GraphReport {
    nodes: usize,
    edges: usize,
    dangling: usize,
    from_cache: bool,
    ingest: IngestStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirects: Option<RedirectSummary>,
}

/// Execute `wr graph`: build (or load) the link graph and report its shape.
pub fn run_graph(args: &GraphArgs, output: OutputMode, config: &RankConfig) -> Result<()> {
    let loaded = load_graph(&args.input, config)?;
    let graph = &loaded.graph;

    let report = GraphReport {
        nodes: graph.node_count(),
        edges: graph.edge_count(),
        dangling: graph.dangling_count(),
        from_cache: loaded.from_cache,
        ingest: graph.stats,
        redirects: loaded.redirects,
    };

    render_mode(output, &report, render_text, render_pretty)
}

fn render_text(report: &GraphReport, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "nodes {}", report.nodes)?;
    writeln!(w, "edges {}", report.edges)?;
    writeln!(w, "dangling {}", report.dangling)?;
    writeln!(w, "edges_read {}", report.ingest.edges_read)?;
    writeln!(w, "truncated {}", report.ingest.truncated)?;
    writeln!(w, "malformed {}", report.ingest.stream.malformed)?;
    if let Some(r) = &report.redirects {
        writeln!(w, "redirects {}", r.redirects)?;
        writeln!(w, "cycle_breaks {}", r.cycle_breaks)?;
    }
    Ok(())
}

fn render_pretty(report: &GraphReport, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, "Link graph")?;
    pretty_kv(w, "Nodes", report.nodes.to_string())?;
    pretty_kv(w, "Edges", report.edges.to_string())?;
    pretty_kv(w, "Dangling", report.dangling.to_string())?;
    pretty_kv(w, "Source", if report.from_cache { "cache" } else { "input" })?;
    writeln!(w)?;

    pretty_section(w, "Link stream")?;
    let stream = &report.ingest.stream;
    pretty_kv(w, "Lines", stream.lines.to_string())?;
    pretty_kv(w, "Triples", stream.triples.to_string())?;
    pretty_kv(w, "Malformed", stream.malformed.to_string())?;
    pretty_kv(w, "Edges read", report.ingest.edges_read.to_string())?;
    if report.ingest.truncated {
        pretty_kv(w, "Truncated", "yes (edge limit reached)")?;
    }

    if let Some(r) = &report.redirects {
        writeln!(w)?;
        pretty_section(w, "Redirects")?;
        pretty_kv(w, "Resolved", r.redirects.to_string())?;
        pretty_kv(w, "Cycle breaks", r.cycle_breaks.to_string())?;
        pretty_kv(w, "Malformed", r.stream.malformed.to_string())?;
    }
    Ok(())
}
