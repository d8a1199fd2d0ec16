//! # graphpress CLI
//!
//! Command-line interface for compiling a note-graph export into a
//! static-site document tree.

mod commands;

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "graphpress")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Graph export (JSON array of block records)
    graph_json: PathBuf,

    /// Folder holding the graph's asset files
    assets: PathBuf,

    /// Output folder; its contents are replaced except preserved paths
    destination: PathBuf,

    /// Publish blocks unless they are marked `public:: false`
    ///
    /// Accepts an optional value: `--assume-public=false` keeps opt-in mode
    /// even when the config file enables it.
    #[arg(long, value_name = "BOOL", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    assume_public: Option<bool>,

    /// Optional YAML configuration file
    #[arg(long, env = "GRAPHPRESS_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::INFO.into()
            }),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let options = commands::ExportOptions {
        graph_json: cli.graph_json,
        assets: cli.assets,
        destination: cli.destination,
        assume_public: cli.assume_public,
        config: cli.config,
    };
    commands::export_graph(&options).map(|_| ())
}
