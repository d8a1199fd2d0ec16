//! Materializes a compiled graph as a directory tree of index documents.

use crate::compiler::CompiledGraph;
use crate::config::ExportConfig;
use crate::frontmatter::{render_document, FrontmatterError};
use crate::models::ResolvedBlock;
use graphpress_types::BlockId;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

const STAGING_PREFIX: &str = ".graphpress-staging-";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("I/O error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("Failed to encode front matter for block {id}: {source}")]
    FrontMatter {
        id: BlockId,
        source: FrontmatterError,
    },

    #[error("Parent directory of destination does not exist: {0}")]
    MissingParent(PathBuf),
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> ExportError + '_ {
    move |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Counts reported after a successful export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub documents: usize,
    pub duplicates: usize,
    pub assets: usize,
}

/// Writes documents and referenced assets into a destination folder
pub struct TreeExporter<'c> {
    config: &'c ExportConfig,
}

impl<'c> TreeExporter<'c> {
    pub fn new(config: &'c ExportConfig) -> Self {
        Self { config }
    }

    /// Export everything, replacing the destination's previous contents.
    ///
    /// The tree is staged inside the destination first; the old contents
    /// are only removed once staging has fully succeeded.
    pub fn export(
        &self,
        compiled: &CompiledGraph<'_>,
        assets_src: &Path,
        destination: &Path,
    ) -> Result<ExportSummary, ExportError> {
        prepare_destination(destination)?;

        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(destination)
            .map_err(io_error(destination))?;

        let mut summary = ExportSummary::default();
        self.write_tree(compiled, staging.path(), &mut summary)?;
        summary.assets = self.copy_assets(compiled, assets_src, staging.path())?;

        self.clear_destination(destination, staging.path())?;
        self.promote(staging.path(), destination)?;
        staging.close().map_err(io_error(destination))?;

        tracing::info!(
            "Exported {} documents ({} duplicate paths skipped), copied {} assets",
            summary.documents,
            summary.duplicates,
            summary.assets
        );
        Ok(summary)
    }

    fn write_tree(
        &self,
        compiled: &CompiledGraph<'_>,
        root: &Path,
        summary: &mut ExportSummary,
    ) -> Result<(), ExportError> {
        let home = compiled.home(&self.config.home_property).map(|b| b.id());
        if let Some(id) = home {
            tracing::info!("Writing block {} as the home page", id);
        }

        let mut stack: Vec<&ResolvedBlock<'_>> = compiled.roots().collect();
        stack.reverse();

        while let Some(block) = stack.pop() {
            if block.record.is_showable() {
                let dir = if Some(block.id()) == home {
                    root.to_path_buf()
                } else {
                    join_segments(root, &block.path)
                };
                self.write_document(block, &dir, summary)?;
            } else {
                tracing::debug!("Block {} has no content; no document written", block.id());
            }

            stack.extend(compiled.children(block.id()).into_iter().rev());
        }

        Ok(())
    }

    fn write_document(
        &self,
        block: &ResolvedBlock<'_>,
        dir: &Path,
        summary: &mut ExportSummary,
    ) -> Result<(), ExportError> {
        let file = dir.join(&self.config.index_file);
        if file.exists() {
            tracing::warn!(
                "Duplicate output path {:?} for block {}; keeping the existing document",
                file,
                block.id()
            );
            summary.duplicates += 1;
            return Ok(());
        }

        let document = render_document(block, self.config).map_err(|source| {
            ExportError::FrontMatter {
                id: block.id(),
                source,
            }
        })?;

        fs::create_dir_all(dir).map_err(io_error(dir))?;
        fs::write(&file, document).map_err(io_error(&file))?;
        tracing::debug!("Wrote {:?}", file);
        summary.documents += 1;
        Ok(())
    }

    /// Copy only the assets retained content mentions
    fn copy_assets(
        &self,
        compiled: &CompiledGraph<'_>,
        assets_src: &Path,
        root: &Path,
    ) -> Result<usize, ExportError> {
        let target_dir = root.join(&self.config.assets_dir);
        fs::create_dir_all(&target_dir).map_err(io_error(&target_dir))?;

        if !assets_src.is_dir() {
            tracing::warn!("Assets folder {:?} not found; no assets copied", assets_src);
            return Ok(0);
        }

        let available: HashMap<String, PathBuf> = WalkDir::new(assets_src)
            .min_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let relative = e.path().strip_prefix(assets_src).ok()?;
                let key = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                Some((key, e.path().to_path_buf()))
            })
            .collect();

        let mut copied = 0;
        for name in compiled.referenced_assets() {
            let Some(source) = available.get(&name) else {
                tracing::warn!("Referenced asset {} not found in {:?}", name, assets_src);
                continue;
            };
            let target = join_segments(&target_dir, &name);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(io_error(parent))?;
            }
            fs::copy(source, &target).map_err(io_error(&target))?;
            copied += 1;
        }

        tracing::info!("Copied {} assets", copied);
        Ok(copied)
    }

    fn is_preserved(&self, name: &str) -> bool {
        self.config.preserve.iter().any(|kept| {
            kept.trim_matches('/')
                .split('/')
                .next()
                .is_some_and(|top| top == name)
        })
    }

    /// Remove previous output, keeping preserved entries and the staging dir
    fn clear_destination(&self, destination: &Path, staging: &Path) -> Result<(), ExportError> {
        let staging_name = staging.file_name();
        for entry in fs::read_dir(destination).map_err(io_error(destination))? {
            let entry = entry.map_err(io_error(destination))?;
            let path = entry.path();
            // Compared by name: the destination may be given as a relative path.
            if Some(entry.file_name().as_os_str()) == staging_name {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            if self.is_preserved(&name) {
                tracing::debug!("Preserving {:?}", path);
                continue;
            }

            let file_type = entry.file_type().map_err(io_error(&path))?;
            if file_type.is_dir() {
                fs::remove_dir_all(&path).map_err(io_error(&path))?;
            } else {
                fs::remove_file(&path).map_err(io_error(&path))?;
            }
        }
        Ok(())
    }

    /// Move staged entries into the destination
    fn promote(&self, staging: &Path, destination: &Path) -> Result<(), ExportError> {
        let mut staged: Vec<PathBuf> = fs::read_dir(staging)
            .map_err(io_error(staging))?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<_, _>>()
            .map_err(io_error(staging))?;
        staged.sort();

        for source in staged {
            let Some(name) = source.file_name() else {
                continue;
            };
            let target = destination.join(name);
            if target.exists() {
                tracing::warn!(
                    "Preserved path {:?} collides with exported content; leaving it untouched",
                    target
                );
                continue;
            }
            fs::rename(&source, &target).map_err(io_error(&target))?;
        }
        Ok(())
    }
}

fn prepare_destination(destination: &Path) -> Result<(), ExportError> {
    if destination.is_dir() {
        return Ok(());
    }
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.is_dir() {
            return Err(ExportError::MissingParent(parent.to_path_buf()));
        }
    }
    fs::create_dir(destination).map_err(io_error(destination))
}

/// Join a `/`-separated output path onto `base`
fn join_segments(base: &Path, path: &str) -> PathBuf {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .fold(base.to_path_buf(), |acc, segment| acc.join(segment))
}
