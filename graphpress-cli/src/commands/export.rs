//! Export command implementation.

use anyhow::{Context, Result};
use graphpress_core::{ExportConfig, ExportSummary, GraphCompiler, TreeExporter};
use std::path::PathBuf;

/// Paths and flags gathered from the command line
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub graph_json: PathBuf,
    pub assets: PathBuf,
    pub destination: PathBuf,
    pub assume_public: Option<bool>,
    pub config: Option<PathBuf>,
}

/// Load configuration; an explicit `--assume-public` value overrides the file
fn load_config(options: &ExportOptions) -> Result<ExportConfig> {
    let config = match &options.config {
        Some(path) => {
            tracing::info!("Loading config from {:?}", path);
            ExportConfig::from_file(path)
                .with_context(|| format!("Failed to load configuration {:?}", path))?
        }
        None => ExportConfig::default(),
    };

    match options.assume_public {
        Some(assume_public) => Ok(config.with_assume_public(assume_public)),
        None => Ok(config),
    }
}

/// Compile the graph and write the document tree
pub fn export_graph(options: &ExportOptions) -> Result<ExportSummary> {
    let config = load_config(options)?;
    tracing::info!(
        "Exporting {:?} to {:?} ({})",
        options.graph_json,
        options.destination,
        if config.assume_public { "opt-out" } else { "opt-in" }
    );

    let store = GraphCompiler::load_store(&options.graph_json)
        .with_context(|| format!("Failed to load graph {:?}", options.graph_json))?;

    let compiler = GraphCompiler::new(config);
    let compiled = compiler.compile(&store).context("Failed to compile graph")?;

    TreeExporter::new(compiler.config())
        .export(&compiled, &options.assets, &options.destination)
        .with_context(|| format!("Failed to export to {:?}", options.destination))
}
