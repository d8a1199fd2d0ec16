//! Hierarchical output paths derived from each block's ancestor chain.

use crate::models::BlockRecord;
use crate::slug::path_slug;
use crate::store::BlockStore;
use graphpress_types::{BlockId, BlockRef};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PathError {
    #[error("Parent chain of block {0} is cyclic")]
    Cycle(BlockId),
}

/// Path segment contributed by a single block
///
/// Pages use their display name; nested blocks use their uuid, since
/// content is neither unique nor filesystem-safe.
pub fn path_component(block: &BlockRecord) -> String {
    if block.is_page() {
        path_slug(&block.display_name())
    } else {
        path_slug(&block.uuid)
    }
}

/// Complete id → path map, computed once for every block
#[derive(Debug, Clone, Default)]
pub struct PathMap {
    paths: HashMap<BlockId, String>,
}

impl PathMap {
    pub fn get(&self, id: BlockId) -> Option<&str> {
        self.paths.get(&id).map(String::as_str)
    }

    /// Resolved reference, or `None` for ids outside the graph
    pub fn reference(&self, id: BlockId) -> Option<BlockRef> {
        self.get(id).map(|path| BlockRef::new(id, path))
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Computes block paths under a fixed notes root
pub struct PathResolver<'a> {
    store: &'a BlockStore,
    root: String,
}

impl<'a> PathResolver<'a> {
    pub fn new(store: &'a BlockStore, notes_root: &str) -> Self {
        Self {
            store,
            root: notes_root.trim_matches('/').to_string(),
        }
    }

    /// Root-to-block chain, ending with `block` itself
    pub fn ancestors(&self, block: &'a BlockRecord) -> Result<Vec<&'a BlockRecord>, PathError> {
        let mut chain = vec![block];
        let mut seen = HashSet::from([block.id]);
        let mut current = block;

        while let Some(parent) = self.store.parent_of(current) {
            if !seen.insert(parent.id) {
                return Err(PathError::Cycle(block.id));
            }
            chain.push(parent);
            current = parent;
        }

        chain.reverse();
        Ok(chain)
    }

    /// Path of a single block, without memoisation
    pub fn path_of(&self, block: &'a BlockRecord) -> Result<String, PathError> {
        let components: Vec<String> = self
            .ancestors(block)?
            .into_iter()
            .map(path_component)
            .collect();
        Ok(self.join(&components.join("/")))
    }

    /// Paths for every block in the store.
    ///
    /// Each block's path is its parent's path plus its own component, so
    /// shared prefixes are computed once.
    pub fn resolve_all(&self) -> Result<PathMap, PathError> {
        let mut paths: HashMap<BlockId, String> = HashMap::with_capacity(self.store.len());

        for block in self.store.iter() {
            if paths.contains_key(&block.id) {
                continue;
            }

            let mut pending = vec![block];
            let mut on_chain = HashSet::from([block.id]);
            let mut base: Option<String> = None;
            let mut current = block;

            while let Some(parent) = self.store.parent_of(current) {
                if let Some(known) = paths.get(&parent.id) {
                    base = Some(known.clone());
                    break;
                }
                if !on_chain.insert(parent.id) {
                    return Err(PathError::Cycle(block.id));
                }
                pending.push(parent);
                current = parent;
            }

            let mut prefix = base.unwrap_or_else(|| self.root.clone());
            for record in pending.into_iter().rev() {
                prefix = join_path(&prefix, &path_component(record));
                paths.insert(record.id, prefix.clone());
            }
        }

        tracing::info!("Resolved {} block paths", paths.len());
        Ok(PathMap { paths })
    }

    fn join(&self, rest: &str) -> String {
        join_path(&self.root, rest)
    }
}

fn join_path(prefix: &str, component: &str) -> String {
    if prefix.is_empty() {
        component.to_string()
    } else {
        format!("{}/{}", prefix, component)
    }
}
