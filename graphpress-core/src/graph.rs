//! Link graph: forward links, backlinks, aliases and typed relationships.

use crate::models::{BlockRecord, RelationLabel, Relationship, TypedRelationships};
use crate::paths::PathMap;
use crate::render::properties::strip_properties;
use crate::store::BlockStore;
use graphpress_types::{BlockId, BlockRef, Direction};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};

static SINGLE_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\[\[[^\[\]]+\]\]|\(\([^()]+\)\))$").unwrap());

/// Derived link indices over the whole store
#[derive(Debug, Default)]
pub struct LinkGraph {
    backlinks: HashMap<BlockId, Vec<BlockId>>,
    aliased_by: HashMap<BlockId, Vec<BlockId>>,
    relationships: HashMap<BlockId, BTreeMap<Relationship, Vec<BlockId>>>,
    paths: PathMap,
}

impl LinkGraph {
    /// Build every index in one pass; needs the complete path map
    pub fn build(store: &BlockStore, paths: &PathMap) -> Self {
        let mut graph = LinkGraph {
            paths: paths.clone(),
            ..Default::default()
        };

        for candidate in store.iter() {
            // References the parent already carries are implied for the child.
            let implied: &[BlockId] = store
                .parent_of(candidate)
                .map(|p| p.inherited_linked_ids.as_slice())
                .unwrap_or(&[]);

            let mut seen = HashSet::new();
            for target in &candidate.linked_ids {
                if !seen.insert(*target) || implied.contains(target) {
                    continue;
                }
                if store.get(*target).is_none() {
                    tracing::debug!("Block {} links to unknown block {}", candidate.id, target);
                    continue;
                }
                graph.backlinks.entry(*target).or_default().push(candidate.id);
            }

            for target in &candidate.alias_ids {
                graph.aliased_by.entry(*target).or_default().push(candidate.id);
            }

            if let Some(relationship) = extract_relationship(candidate, paths) {
                graph.add_relationship(store, candidate, relationship);
            }
        }

        let edge_count: usize = graph.relationships.values().map(BTreeMap::len).sum();
        tracing::info!(
            "Built link graph: {} backlink targets, {} typed relationships",
            graph.backlinks.len(),
            edge_count
        );
        graph
    }

    fn add_relationship(
        &mut self,
        store: &BlockStore,
        declaring: &BlockRecord,
        relationship: Relationship,
    ) {
        let Some(parent) = store.parent_of(declaring) else {
            tracing::debug!("Relationship block {} has no parent", declaring.id);
            return;
        };
        let values = store.children_of(declaring.id);
        if values.is_empty() {
            return;
        }

        match relationship.direction {
            Direction::LeftToRight => {
                self.push_edge(parent.id, &relationship, values);
            }
            Direction::RightToLeft => {
                for value in values {
                    self.push_edge(*value, &relationship, &[parent.id]);
                }
            }
        }
    }

    fn push_edge(&mut self, owner: BlockId, relationship: &Relationship, targets: &[BlockId]) {
        let endpoints = self
            .relationships
            .entry(owner)
            .or_default()
            .entry(relationship.clone())
            .or_default();
        for target in targets {
            if !endpoints.contains(target) {
                endpoints.push(*target);
            }
        }
    }

    fn references(&self, ids: impl IntoIterator<Item = BlockId>) -> Vec<BlockRef> {
        let mut seen = HashSet::new();
        ids.into_iter()
            .filter(|id| seen.insert(*id))
            .filter_map(|id| self.paths.reference(id))
            .collect()
    }

    /// Blocks addressed by the block's own references, in reference order
    pub fn links(&self, block: &BlockRecord) -> Vec<BlockRef> {
        self.references(block.linked_ids.iter().copied())
    }

    /// Inbound references, minus those already implied by the referrer's parent
    pub fn backlinks(&self, id: BlockId) -> Vec<BlockRef> {
        self.references(self.backlinks.get(&id).into_iter().flatten().copied())
    }

    /// Own alias targets plus the blocks declaring this block as an alias
    pub fn aliases(&self, block: &BlockRecord) -> Vec<BlockRef> {
        let inbound = self.aliased_by.get(&block.id).into_iter().flatten().copied();
        self.references(block.alias_ids.iter().copied().chain(inbound))
    }

    pub fn relationships(&self, id: BlockId) -> TypedRelationships {
        self.relationships
            .get(&id)
            .map(|edges| {
                edges
                    .iter()
                    .map(|(relationship, targets)| {
                        (relationship.clone(), self.references(targets.iter().copied()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Arrow declared by the block's content, ignoring property lines
pub fn relationship_direction(content: &str) -> Option<Direction> {
    let text = strip_properties(content);
    let trimmed = text.trim();
    if trimmed.ends_with(Direction::LeftToRight.indicator()) {
        Some(Direction::LeftToRight)
    } else if trimmed.starts_with(Direction::RightToLeft.indicator()) {
        Some(Direction::RightToLeft)
    } else {
        None
    }
}

/// Typed relationship declared by a block, if any
///
/// A remainder that is exactly one reference token, on a block with
/// exactly one linked id, becomes a link label; anything else is text.
pub fn extract_relationship(block: &BlockRecord, paths: &PathMap) -> Option<Relationship> {
    let content = block.content.as_deref()?;
    let direction = relationship_direction(content)?;

    let text = strip_properties(content);
    let trimmed = text.trim();
    let remainder = match direction {
        Direction::LeftToRight => trimmed.strip_suffix(direction.indicator()),
        Direction::RightToLeft => trimmed.strip_prefix(direction.indicator()),
    }?
    .trim();

    if remainder.is_empty() {
        tracing::debug!("Ignoring unlabeled relationship on block {}", block.id);
        return None;
    }

    let link_label = match block.linked_ids.as_slice() {
        [only] if SINGLE_REFERENCE.is_match(remainder) => paths.reference(*only),
        _ => None,
    };

    let label = match link_label {
        Some(target) => RelationLabel::Link(target),
        None => RelationLabel::Text(remainder.to_string()),
    };

    Some(Relationship { label, direction })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::PathResolver;

    fn page(id: u64, name: &str) -> BlockRecord {
        let mut record = BlockRecord::new(id, format!("page-{id}"));
        record.original_name = Some(name.to_string());
        record
    }

    fn nested(id: u64, parent: u64, page: u64, content: &str) -> BlockRecord {
        let mut record = BlockRecord::new(id, format!("uuid-{id}"));
        record.parent_id = Some(BlockId::new(parent));
        record.page_id = Some(BlockId::new(page));
        record.content = Some(content.to_string());
        record
    }

    fn build(records: Vec<BlockRecord>) -> (BlockStore, LinkGraph) {
        let store = BlockStore::from_records(records);
        let paths = PathResolver::new(&store, "notes").resolve_all().unwrap();
        let graph = LinkGraph::build(&store, &paths);
        (store, graph)
    }

    fn ids(refs: &[BlockRef]) -> Vec<u64> {
        refs.iter().map(|r| r.id.as_u64()).collect()
    }

    #[test]
    fn test_links_dedup_and_skip_unknown() {
        let mut source = nested(2, 1, 1, "see [[Books]]");
        source.linked_ids = vec![BlockId::new(3), BlockId::new(99), BlockId::new(3)];
        let (store, graph) = build(vec![page(1, "Home"), source, page(3, "Books")]);

        let links = graph.links(store.get(BlockId::new(2)).unwrap());
        assert_eq!(ids(&links), vec![3]);
        assert_eq!(links[0].path, "notes/books");
    }

    #[test]
    fn test_backlinks_suppressed_when_parent_inherits() {
        let mut parent = nested(2, 1, 1, "about [[Books]]");
        parent.linked_ids = vec![BlockId::new(3)];
        parent.inherited_linked_ids = vec![BlockId::new(1), BlockId::new(3)];

        let mut child = nested(4, 2, 1, "more on [[Books]]");
        child.linked_ids = vec![BlockId::new(3)];

        let mut unrelated = nested(5, 1, 1, "also [[Books]]");
        unrelated.linked_ids = vec![BlockId::new(3)];

        let (_, graph) = build(vec![page(1, "Home"), parent, page(3, "Books"), child, unrelated]);

        let backlinks = graph.backlinks(BlockId::new(3));
        assert_eq!(ids(&backlinks), vec![2, 5]);
    }

    #[test]
    fn test_aliases_are_symmetric() {
        let mut primary = page(1, "Japan");
        primary.alias_ids = vec![BlockId::new(2)];
        let (store, graph) = build(vec![primary, page(2, "Nihon"), page(3, "Elsewhere")]);

        let japan = store.get(BlockId::new(1)).unwrap();
        let nihon = store.get(BlockId::new(2)).unwrap();
        assert_eq!(ids(&graph.aliases(japan)), vec![2]);
        assert_eq!(ids(&graph.aliases(nihon)), vec![1]);
        assert!(graph.aliases(store.get(BlockId::new(3)).unwrap()).is_empty());
    }

    #[test]
    fn test_direction_detection() {
        assert_eq!(relationship_direction("author of ->"), Some(Direction::LeftToRight));
        assert_eq!(relationship_direction("<- written by"), Some(Direction::RightToLeft));
        assert_eq!(
            relationship_direction("parent ->\nid:: 6489f1a2"),
            Some(Direction::LeftToRight)
        );
        assert_eq!(relationship_direction("a -> b"), None);
    }

    #[test]
    fn test_right_arrow_points_parent_at_children() {
        let (_, graph) = build(vec![
            page(1, "Alice"),
            nested(2, 1, 1, "author of ->"),
            nested(3, 2, 1, "[[Book One]]"),
            nested(4, 2, 1, "[[Book Two]]"),
        ]);

        let relationships = graph.relationships(BlockId::new(1));
        assert_eq!(relationships.len(), 1);
        let (relationship, targets) = relationships.iter().next().unwrap();
        assert_eq!(relationship.label, RelationLabel::Text("author of".into()));
        assert_eq!(relationship.direction, Direction::LeftToRight);
        assert_eq!(ids(targets), vec![3, 4]);
    }

    #[test]
    fn test_left_arrow_points_children_at_parent() {
        let (_, graph) = build(vec![
            page(1, "Alice"),
            nested(2, 1, 1, "<- cited by"),
            nested(3, 2, 1, "paper"),
        ]);

        let relationships = graph.relationships(BlockId::new(3));
        let (relationship, targets) = relationships.iter().next().unwrap();
        assert_eq!(relationship.direction, Direction::RightToLeft);
        assert_eq!(ids(targets), vec![1]);
        assert!(graph.relationships(BlockId::new(1)).is_empty());
    }

    #[test]
    fn test_single_link_label_prefers_linked_block() {
        let mut declaring = nested(2, 1, 1, "[[Friend]] ->");
        declaring.linked_ids = vec![BlockId::new(5)];
        let (store, graph) = build(vec![
            page(1, "Alice"),
            declaring,
            nested(3, 2, 1, "Bob"),
            page(5, "Friend"),
        ]);

        let paths = PathResolver::new(&store, "notes").resolve_all().unwrap();
        let relationship =
            extract_relationship(store.get(BlockId::new(2)).unwrap(), &paths).unwrap();
        match relationship.label {
            RelationLabel::Link(target) => {
                assert_eq!(target.id, BlockId::new(5));
                assert_eq!(target.path, "notes/friend");
            }
            other => panic!("expected link label, got {:?}", other),
        }
        assert_eq!(graph.relationships(BlockId::new(1)).len(), 1);
    }

    #[test]
    fn test_two_links_fall_back_to_text() {
        let mut declaring = nested(2, 1, 1, "[[A]] and [[B]] ->");
        declaring.linked_ids = vec![BlockId::new(5), BlockId::new(6)];
        let store = BlockStore::from_records(vec![page(1, "Root"), declaring]);
        let paths = PathResolver::new(&store, "notes").resolve_all().unwrap();

        let relationship =
            extract_relationship(store.get(BlockId::new(2)).unwrap(), &paths).unwrap();
        assert_eq!(relationship.label, RelationLabel::Text("[[A]] and [[B]]".into()));
    }

    #[test]
    fn test_empty_label_is_ignored() {
        let store = BlockStore::from_records(vec![page(1, "Root"), nested(2, 1, 1, " -> ")]);
        let paths = PathResolver::new(&store, "notes").resolve_all().unwrap();
        assert!(extract_relationship(store.get(BlockId::new(2)).unwrap(), &paths).is_none());
    }

    #[test]
    fn test_repeated_declarations_merge() {
        let (_, graph) = build(vec![
            page(1, "Alice"),
            nested(2, 1, 1, "likes ->"),
            nested(3, 2, 1, "tea"),
            nested(4, 1, 1, "likes ->"),
            nested(5, 4, 1, "cake"),
        ]);
        let relationships = graph.relationships(BlockId::new(1));
        assert_eq!(relationships.len(), 1);
        assert_eq!(ids(relationships.values().next().unwrap()), vec![3, 5]);
    }
}
