//! Batch compilation of a loaded graph into rendered, filtered blocks.

use crate::config::ExportConfig;
use crate::graph::LinkGraph;
use crate::models::{BlockRecord, ResolvedBlock};
use crate::paths::{PathError, PathMap, PathResolver};
use crate::publicity::{PublicityFilter, PublicityRegistry};
use crate::render::assets::AssetLinks;
use crate::render::{ContentRenderer, RenderContext};
use crate::store::{BlockStore, StoreError};
use graphpress_types::BlockId;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Failed to read graph {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid graph: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid block hierarchy: {0}")]
    Path(#[from] PathError),
}

/// Runs every stage, each to completion before the next begins
pub struct GraphCompiler {
    config: ExportConfig,
}

impl GraphCompiler {
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Read and decode the graph export at `path`
    pub fn load_store(path: &Path) -> Result<BlockStore, CompileError> {
        let json = std::fs::read_to_string(path).map_err(|source| CompileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(BlockStore::from_json_str(&json)?)
    }

    /// Resolve, filter and render every block in `store`
    pub fn compile<'s>(&self, store: &'s BlockStore) -> Result<CompiledGraph<'s>, CompileError> {
        let paths = PathResolver::new(store, self.config.normalized_notes_root()).resolve_all()?;
        let siblings = store.sibling_indices()?;
        let graph = LinkGraph::build(store, &paths);

        let assets = AssetLinks::new(&self.config.assets_dir);
        let resolved: Vec<ResolvedBlock<'s>> = store
            .iter()
            .filter_map(|record| resolve_block(record, &paths, &siblings, &graph, &assets))
            .collect();

        let filter = PublicityFilter::from_config(&self.config);
        let registry = filter.compute(store);
        let retained = filter.filter(resolved, &registry);

        let renderer = ContentRenderer::new(RenderContext {
            store,
            graph: &graph,
            registry: &registry,
            config: &self.config,
        });
        let blocks: BTreeMap<BlockId, ResolvedBlock<'s>> = retained
            .into_iter()
            .map(|block| (block.id(), renderer.render(block)))
            .collect();

        tracing::info!("Compiled {} of {} blocks", blocks.len(), store.len());
        Ok(CompiledGraph {
            store,
            blocks,
            registry,
            paths,
        })
    }
}

fn resolve_block<'s>(
    record: &'s BlockRecord,
    paths: &PathMap,
    siblings: &HashMap<BlockId, usize>,
    graph: &LinkGraph,
    assets: &AssetLinks,
) -> Option<ResolvedBlock<'s>> {
    let path = paths.get(record.id)?.to_string();

    let mut asset_names = assets.names_in(record.content_str());
    if record.is_page() {
        if let Some(image) = record.properties.get("image").and_then(|v| assets.image_property(v)) {
            if !asset_names.contains(&image) {
                asset_names.push(image);
            }
        }
    }

    Some(ResolvedBlock {
        record,
        path,
        sibling_index: siblings.get(&record.id).copied().unwrap_or(1),
        parent: record.parent_id.and_then(|id| paths.reference(id)),
        page: record.page_id.and_then(|id| paths.reference(id)),
        namespace: record.namespace_id.and_then(|id| paths.reference(id)),
        links: graph.links(record),
        backlinks: graph.backlinks(record.id),
        aliases: graph.aliases(record),
        relationships: graph.relationships(record.id),
        assets: asset_names,
        title: String::new(),
        body: String::new(),
    })
}

/// The public, redacted and rendered block set
pub struct CompiledGraph<'s> {
    store: &'s BlockStore,
    blocks: BTreeMap<BlockId, ResolvedBlock<'s>>,
    registry: PublicityRegistry,
    paths: PathMap,
}

impl<'s> CompiledGraph<'s> {
    pub fn get(&self, id: BlockId) -> Option<&ResolvedBlock<'s>> {
        self.blocks.get(&id)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Retained blocks in id order
    pub fn blocks(&self) -> impl Iterator<Item = &ResolvedBlock<'s>> {
        self.blocks.values()
    }

    /// Retained pages in id order
    pub fn pages(&self) -> impl Iterator<Item = &ResolvedBlock<'s>> {
        self.blocks.values().filter(|b| b.is_page())
    }

    /// Retained blocks with no parent in the graph: pages, and orphans
    /// whose parent was purged from the export
    pub fn roots(&self) -> impl Iterator<Item = &ResolvedBlock<'s>> {
        self.blocks
            .values()
            .filter(move |b| self.store.parent_of(b.record).is_none())
    }

    /// Retained children of `id`, ordered by sibling index then id
    pub fn children(&self, id: BlockId) -> Vec<&ResolvedBlock<'s>> {
        let mut children: Vec<&ResolvedBlock<'s>> = self
            .store
            .children_of(id)
            .iter()
            .filter_map(|child| self.blocks.get(child))
            .collect();
        children.sort_by_key(|b| (b.sibling_index, b.id()));
        children
    }

    /// First retained page carrying a true `property`
    pub fn home(&self, property: &str) -> Option<&ResolvedBlock<'s>> {
        self.pages()
            .find(|page| page.record.bool_property(property) == Some(true))
    }

    pub fn registry(&self) -> &PublicityRegistry {
        &self.registry
    }

    pub fn paths(&self) -> &PathMap {
        &self.paths
    }

    /// Asset names referenced by retained blocks, sorted and deduplicated
    pub fn referenced_assets(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .blocks
            .values()
            .flat_map(|b| b.assets.iter().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn graph_json() -> String {
        json!([
            {"id": 1, "uuid": "p-1", "original-name": "Trip", "properties": {"public": true, "image": "../assets/cover.jpg"}},
            {"id": 2, "uuid": "b-2", "content": "Flights ((b-4)) ![](../assets/ticket.pdf)",
             "page": {"id": 1}, "parent": {"id": 1}, "refs": [{"id": 4}]},
            {"id": 3, "uuid": "p-3", "original-name": "Journal"},
            {"id": 4, "uuid": "b-4", "content": "Secret", "page": {"id": 3}, "parent": {"id": 3},
             "properties": {"public": false}},
            {"id": 5, "uuid": "b-5", "content": "second", "page": {"id": 1}, "parent": {"id": 1}, "left": {"id": 2}},
            {"uuid": "no-id"}
        ])
        .to_string()
    }

    #[test]
    fn test_compile_filters_and_renders() {
        let store = BlockStore::from_json_str(&graph_json()).unwrap();
        let compiled = GraphCompiler::new(ExportConfig::default()).compile(&store).unwrap();

        let ids: Vec<u64> = compiled.blocks().map(|b| b.id().as_u64()).collect();
        assert_eq!(ids, vec![1, 2, 5]);

        let flights = compiled.get(BlockId::new(2)).unwrap();
        assert_eq!(flights.body, "Flights [redacted](-) ![](/assets/ticket.pdf)");
        assert_eq!(flights.title, "Flights redacted ![](/assets/ticket.pdf)");
        assert_eq!(flights.page.as_ref().map(|p| p.path.as_str()), Some("notes/trip"));

        let second = compiled.get(BlockId::new(5)).unwrap();
        assert_eq!(second.sibling_index, 2);
        let children: Vec<u64> = compiled
            .children(BlockId::new(1))
            .iter()
            .map(|b| b.id().as_u64())
            .collect();
        assert_eq!(children, vec![2, 5]);

        assert_eq!(compiled.referenced_assets(), vec!["cover.jpg", "ticket.pdf"]);
    }

    #[test]
    fn test_assume_public_keeps_unmarked_pages() {
        let store = BlockStore::from_json_str(&graph_json()).unwrap();
        let config = ExportConfig::default().with_assume_public(true);
        let compiled = GraphCompiler::new(config).compile(&store).unwrap();

        assert!(compiled.get(BlockId::new(3)).is_some());
        assert!(compiled.get(BlockId::new(4)).is_none());
        assert_eq!(compiled.pages().count(), 2);
    }

    #[test]
    fn test_public_block_under_private_page_is_not_a_root() {
        let json = json!([
            {"id": 1, "uuid": "p-1", "original-name": "Trip", "properties": {"public": true}},
            {"id": 2, "uuid": "b-2", "content": "see ((b-4))", "page": {"id": 1}, "parent": {"id": 1},
             "refs": [{"id": 4}]},
            {"id": 3, "uuid": "p-3", "original-name": "Secret Diary"},
            {"id": 4, "uuid": "b-4", "content": "shared", "page": {"id": 3}, "parent": {"id": 3},
             "properties": {"public": true}},
            {"id": 5, "uuid": "b-5", "content": "orphan", "page": {"id": 9}, "parent": {"id": 9},
             "properties": {"public": true}}
        ])
        .to_string();
        let store = BlockStore::from_json_str(&json).unwrap();
        let compiled = GraphCompiler::new(ExportConfig::default()).compile(&store).unwrap();

        let roots: Vec<u64> = compiled.roots().map(|b| b.id().as_u64()).collect();
        assert_eq!(roots, vec![1, 5]);
        assert!(compiled.get(BlockId::new(4)).is_none());

        let referring = compiled.get(BlockId::new(2)).unwrap();
        assert_eq!(referring.body, "see [redacted](-)");
        assert!(!referring.links.iter().any(|r| r.path.contains("secret-diary")));
    }

    #[test]
    fn test_sibling_cycle_is_fatal() {
        let json = json!([
            {"id": 1, "uuid": "p"},
            {"id": 2, "uuid": "a", "parent": {"id": 1}, "page": {"id": 1}, "left": {"id": 3}},
            {"id": 3, "uuid": "b", "parent": {"id": 1}, "page": {"id": 1}, "left": {"id": 2}}
        ])
        .to_string();
        let store = BlockStore::from_json_str(&json).unwrap();
        let result = GraphCompiler::new(ExportConfig::default()).compile(&store);
        assert!(matches!(result, Err(CompileError::Store(StoreError::SiblingCycle(_)))));
    }

    #[test]
    fn test_missing_graph_file() {
        let result = GraphCompiler::load_store(Path::new("/nonexistent/graph.json"));
        assert!(matches!(result, Err(CompileError::Io { .. })));
    }
}
