#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use wikirank_core::ErrorCode;
use wikirank_core::config::{RankConfig, load_config};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "wikirank: link centrality for encyclopedia dumps",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Config file (defaults to ./wikirank.toml, then the user config dir).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Shorthand for `--format json`.
    #[arg(long, global = true, hide = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        resolve_output_mode(self.format, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Ranking",
        about = "Rank pages by link centrality",
        long_about = "Resolve redirects, build the link graph and rank every page with damped power iteration.",
        after_help = "EXAMPLES:\n    # Top 10 pages\n    wr rank --redirects redirects.nt --links links.nt\n\n    # Top 25 from the first million links\n    wr rank --redirects redirects.nt --links links.nt --limit 1000000 -k 25\n\n    # Every score, for downstream tools\n    wr rank --redirects redirects.nt --links links.nt --dump scores.json\n\n    # Emit machine-readable output\n    wr rank --redirects redirects.nt --links links.nt --format json"
    )]
    Rank(cmd::rank::RankArgs),

    #[command(
        next_help_heading = "Inspection",
        about = "Build the link graph and report its shape",
        long_about = "Resolve redirects and build the link graph without ranking it. Populates the graph cache.",
        after_help = "EXAMPLES:\n    # Node, edge and dangling counts\n    wr graph --redirects redirects.nt --links links.nt\n\n    # Emit machine-readable output\n    wr graph --redirects redirects.nt --links links.nt --format json"
    )]
    Graph(cmd::graph::GraphArgs),

    #[command(
        next_help_heading = "Inspection",
        about = "Close the redirect relation and look names up",
        long_about = "Read redirect triples, close them transitively and resolve the given names.",
        after_help = "EXAMPLES:\n    # Resolve two names\n    wr redirects --redirects redirects.nt Rust_lang UK\n\n    # List redirect cycles\n    wr redirects --redirects redirects.nt --cycles"
    )]
    Redirects(cmd::redirects::RedirectsArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("WIKIRANK_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "wikirank_core=debug,wikirank_rank=debug,wr=debug,info"
        } else {
            "wikirank_core=info,wikirank_rank=info,wr=info,warn"
        })
    });

    let format = env::var("WIKIRANK_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    // stdout carries reports; logs go to stderr.
    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn dispatch(command: &Commands, output: OutputMode, config: &RankConfig) -> anyhow::Result<()> {
    match command {
        Commands::Rank(args) => cmd::rank::run_rank(args, output, config),
        Commands::Graph(args) => cmd::graph::run_graph(args, output, config),
        Commands::Redirects(args) => cmd::redirects::run_redirects(args, output, config),
    }
}

fn main() -> anyhow::Result<ExitCode> {
    init_tracing();

    let cli = Cli::parse();

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let project_root = env::current_dir()?;
    let output = cli.output_mode();

    let config = match load_config(cli.config.as_deref(), &project_root) {
        Ok(config) => config,
        Err(e) => {
            let code = ErrorCode::ConfigParseError;
            let err = CliError::with_details(
                format!("{}: {e:#}", code.message()),
                code.hint().unwrap_or_default(),
                code.code(),
            );
            render_error(output, &err)?;
            return Ok(ExitCode::FAILURE);
        }
    };

    match dispatch(&cli.command, output, &config) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            render_error(output, &CliError::from(&err))?;
            Ok(ExitCode::FAILURE)
        }
    }
}
