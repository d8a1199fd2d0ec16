//! Publish eligibility and redaction of private destinations.

use crate::config::ExportConfig;
use crate::models::{BlockRecord, RelationLabel, Relationship, ResolvedBlock};
use crate::store::BlockStore;
use graphpress_types::{BlockId, BlockRef};
use std::collections::HashMap;

pub const PUBLIC_PROPERTY: &str = "public";
pub const NAME_VISIBLE_PROPERTY: &str = "name-visible";

/// Complete id → publish-eligibility map
#[derive(Debug, Clone, Default)]
pub struct PublicityRegistry {
    entries: HashMap<BlockId, bool>,
}

impl PublicityRegistry {
    /// Unknown ids are never public
    pub fn is_public(&self, id: BlockId) -> bool {
        self.entries.get(&id).copied().unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn public_count(&self) -> usize {
        self.entries.values().filter(|public| **public).count()
    }

    /// The reference itself, or its redacted form when the target is private
    pub fn redact(&self, reference: &BlockRef, token: &str) -> BlockRef {
        if self.is_public(reference.id) {
            reference.clone()
        } else {
            reference.redact(token)
        }
    }

    pub fn redact_all(&self, references: &[BlockRef], token: &str) -> Vec<BlockRef> {
        references.iter().map(|r| self.redact(r, token)).collect()
    }
}

/// Decides publicity under an opt-in or opt-out assumption
#[derive(Debug, Clone)]
pub struct PublicityFilter {
    assume_public: bool,
    token: String,
}

impl PublicityFilter {
    pub fn new(assume_public: bool, token: impl Into<String>) -> Self {
        Self {
            assume_public,
            token: token.into(),
        }
    }

    pub fn from_config(config: &ExportConfig) -> Self {
        Self::new(config.assume_public, config.redaction_token.clone())
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Explicit `public` property, if the block carries one
    pub fn explicit(record: &BlockRecord) -> Option<bool> {
        record.bool_property(PUBLIC_PROPERTY)
    }

    /// Pages use their own property or the mode default; nested blocks
    /// without an explicit property follow their owning page.
    pub fn compute(&self, store: &BlockStore) -> PublicityRegistry {
        let mut entries = HashMap::with_capacity(store.len());

        for page in store.iter().filter(|b| b.is_page()) {
            let public = Self::explicit(page).unwrap_or(self.assume_public);
            entries.insert(page.id, public);
        }

        for block in store.iter().filter(|b| !b.is_page()) {
            let public = Self::explicit(block).unwrap_or_else(|| {
                match store.owning_page(block) {
                    Some(page) => entries.get(&page.id).copied().unwrap_or(false),
                    None => {
                        tracing::debug!("Block {} has no owning page; not public", block.id);
                        false
                    }
                }
            });
            entries.insert(block.id, public);
        }

        // Nothing below a private ancestor is ever reached by the export walk.
        let withdrawn: Vec<BlockId> = store
            .iter()
            .filter(|b| entries.get(&b.id).copied().unwrap_or(false))
            .filter(|b| below_private(store, b, &entries))
            .map(|b| b.id)
            .collect();
        for id in withdrawn {
            tracing::debug!("Block {} sits below a private block; not public", id);
            entries.insert(id, false);
        }

        let registry = PublicityRegistry { entries };
        let public_pages = store
            .iter()
            .filter(|b| b.is_page() && registry.is_public(b.id))
            .count();
        tracing::info!(
            "Found {} public blocks, {} public pages",
            registry.public_count(),
            public_pages
        );
        registry
    }

    /// Keep public blocks and redact every edge pointing at a private one
    pub fn filter<'g>(
        &self,
        blocks: Vec<ResolvedBlock<'g>>,
        registry: &PublicityRegistry,
    ) -> Vec<ResolvedBlock<'g>> {
        blocks
            .into_iter()
            .filter(|block| registry.is_public(block.id()))
            .map(|block| self.redact(block, registry))
            .collect()
    }

    /// Copy of `block` with private destinations replaced by the token
    pub fn redact<'g>(
        &self,
        mut block: ResolvedBlock<'g>,
        registry: &PublicityRegistry,
    ) -> ResolvedBlock<'g> {
        let token = self.token.as_str();
        block.links = registry.redact_all(&block.links, token);
        block.backlinks = registry.redact_all(&block.backlinks, token);
        block.aliases = registry.redact_all(&block.aliases, token);
        block.namespace = block.namespace.as_ref().map(|r| registry.redact(r, token));
        block.parent = block.parent.as_ref().map(|r| registry.redact(r, token));
        block.page = block.page.as_ref().map(|r| registry.redact(r, token));

        block.relationships = std::mem::take(&mut block.relationships)
            .into_iter()
            .map(|(relationship, targets)| {
                let label = match relationship.label {
                    RelationLabel::Link(target) => {
                        RelationLabel::Link(registry.redact(&target, token))
                    }
                    text => text,
                };
                let key = Relationship {
                    label,
                    direction: relationship.direction,
                };
                (key, registry.redact_all(&targets, token))
            })
            .collect();
        block
    }
}

fn below_private(store: &BlockStore, block: &BlockRecord, entries: &HashMap<BlockId, bool>) -> bool {
    let mut current = block;
    for _ in 0..store.len() {
        match store.parent_of(current) {
            Some(parent) if !entries.get(&parent.id).copied().unwrap_or(false) => return true,
            Some(parent) => current = parent,
            None => return false,
        }
    }
    true
}

/// Whether a private target may still show its human label
pub fn name_visible(record: &BlockRecord) -> bool {
    record.bool_property(NAME_VISIBLE_PROPERTY).unwrap_or(false)
}
