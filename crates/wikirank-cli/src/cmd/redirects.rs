use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use wikirank_core::config::RankConfig;
use wikirank_core::progress::Progress;
use wikirank_core::redirect::{ChainEnd, RedirectResolver};
use wikirank_core::triple::StreamStats;

use crate::cmd::{namespace, open_input};
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

/// Arguments for `wr redirects`.
#[derive(Args, Debug)]
pub struct RedirectsArgs {
    /// Redirect triples (N-Triples, uncompressed; `-` for stdin).
    #[arg(long, value_name = "PATH")]
    pub redirects: PathBuf,

    /// Resource namespace prefix stripped from URIs.
    #[arg(long, value_name = "URI")]
    pub namespace: Option<String>,

    /// List redirect cycles.
    #[arg(long)]
    pub cycles: bool,

    /// Canonical names to resolve.
    #[arg(value_name = "NAME")]
    pub names: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Resolution {
    name: String,
    target: String,
    cycle: bool,
}

#[derive(Debug, Serialize)]
struct RedirectReport {
    redirects: usize,
    cycle_breaks: usize,
    stream: StreamStats,
    resolutions: Vec<Resolution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cycles: Option<Vec<Vec<String>>>,
}

/// Execute `wr redirects`: close the redirect relation and query it.
pub fn run_redirects(args: &RedirectsArgs, output: OutputMode, config: &RankConfig) -> Result<()> {
    let resolver = RedirectResolver::new(namespace(args.namespace.as_deref(), config))
        .with_progress_interval(config.input.progress_interval);
    let (graph, stream) = resolver
        .read_graph(open_input(&args.redirects)?)
        .with_context(|| format!("Failed to read redirects from {}", args.redirects.display()))?;
    let map = graph.close(Progress::new("closure", config.input.progress_interval));

    let resolutions = args
        .names
        .iter()
        .map(|name| Resolution {
            name: name.clone(),
            target: map.resolve(name).to_owned(),
            cycle: matches!(graph.walk(name), ChainEnd::Cycle(_)),
        })
        .collect();

    let report = RedirectReport {
        redirects: map.len(),
        cycle_breaks: map.cycle_breaks(),
        stream,
        resolutions,
        cycles: args.cycles.then(|| graph.cycles()),
    };

    render_mode(output, &report, render_text, render_pretty)
}

fn render_text(report: &RedirectReport, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "redirects {}", report.redirects)?;
    writeln!(w, "cycle_breaks {}", report.cycle_breaks)?;
    for r in &report.resolutions {
        writeln!(w, "{}\t{}", r.name, r.target)?;
    }
    for cycle in report.cycles.iter().flatten() {
        writeln!(w, "cycle\t{}", cycle.join("\t"))?;
    }
    Ok(())
}

fn render_pretty(report: &RedirectReport, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, "Redirects")?;
    pretty_kv(w, "Resolved", report.redirects.to_string())?;
    pretty_kv(w, "Cycle breaks", report.cycle_breaks.to_string())?;
    pretty_kv(w, "Malformed", report.stream.malformed.to_string())?;

    if !report.resolutions.is_empty() {
        writeln!(w)?;
        pretty_section(w, "Lookups")?;
        for r in &report.resolutions {
            let marker = if r.cycle { "  (cycle)" } else { "" };
            writeln!(w, "{} → {}{marker}", r.name, r.target)?;
        }
    }

    if let Some(cycles) = &report.cycles {
        writeln!(w)?;
        pretty_section(w, &format!("Cycles ({})", cycles.len()))?;
        for cycle in cycles {
            writeln!(w, "{}", cycle.join(" ↔ "))?;
        }
    }
    Ok(())
}
