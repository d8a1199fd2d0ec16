//! Block store: decodes raw export records into an id-indexed arena.

use crate::models::{BlockRecord, Properties};
use graphpress_types::BlockId;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Graph JSON is not valid: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Graph JSON must be an array of block records")]
    NotAnArray,

    #[error("Left-sibling chain starting at block {0} is cyclic")]
    SiblingCycle(BlockId),
}

/// Foreign key as exported: either a bare id or an object wrapping one
#[derive(Deserialize)]
#[serde(untagged)]
enum RawRef {
    Bare(u64),
    Wrapped {
        #[serde(alias = "db/id")]
        id: Option<u64>,
    },
}

impl RawRef {
    fn id(&self) -> Option<BlockId> {
        match self {
            RawRef::Bare(id) => Some(BlockId::new(*id)),
            RawRef::Wrapped { id } => id.map(BlockId::new),
        }
    }
}

/// Record shape accepted from the export, in short or qualified key form
#[derive(Deserialize)]
struct RawRecord {
    #[serde(alias = "db/id")]
    id: Option<u64>,
    #[serde(alias = "block/uuid")]
    uuid: Option<String>,

    #[serde(alias = "block/name")]
    name: Option<String>,
    #[serde(rename = "original-name", alias = "block/original-name")]
    original_name: Option<String>,
    #[serde(alias = "block/content")]
    content: Option<String>,

    #[serde(alias = "block/page")]
    page: Option<RawRef>,
    #[serde(alias = "block/parent")]
    parent: Option<RawRef>,
    #[serde(alias = "block/left")]
    left: Option<RawRef>,
    #[serde(alias = "block/namespace")]
    namespace: Option<RawRef>,

    #[serde(alias = "block/properties")]
    properties: Option<Properties>,
    #[serde(rename = "pre-block?", alias = "block/pre-block?")]
    preblock: Option<bool>,
    #[serde(alias = "block/format")]
    format: Option<String>,
    #[serde(rename = "collapsed?", alias = "block/collapsed?")]
    collapsed: Option<bool>,

    #[serde(rename = "updated-at", alias = "block/updated-at")]
    updated_at: Option<serde_json::Number>,
    #[serde(rename = "created-at", alias = "block/created-at")]
    created_at: Option<serde_json::Number>,

    #[serde(default, alias = "block/refs")]
    refs: Vec<RawRef>,
    #[serde(default, rename = "path-refs", alias = "block/path-refs")]
    path_refs: Vec<RawRef>,
    #[serde(default, alias = "block/alias")]
    alias: Vec<RawRef>,
}

fn trimmed_name(name: Option<String>) -> Option<String> {
    name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

fn timestamp(number: Option<serde_json::Number>) -> Option<i64> {
    let number = number?;
    number
        .as_i64()
        .or_else(|| number.as_f64().map(|f| f as i64))
}

fn ref_ids(refs: &[RawRef]) -> Vec<BlockId> {
    refs.iter().filter_map(RawRef::id).collect()
}

impl RawRecord {
    /// `None` when the record has no id or no uuid
    fn into_record(self) -> Option<BlockRecord> {
        let id = self.id?;
        let uuid = self.uuid.filter(|u| !u.trim().is_empty())?;

        Some(BlockRecord {
            id: BlockId::new(id),
            uuid,
            name: trimmed_name(self.name),
            original_name: trimmed_name(self.original_name),
            content: self.content,
            page_id: self.page.as_ref().and_then(RawRef::id),
            parent_id: self.parent.as_ref().and_then(RawRef::id),
            left_id: self.left.as_ref().and_then(RawRef::id),
            namespace_id: self.namespace.as_ref().and_then(RawRef::id),
            properties: self.properties.unwrap_or_default(),
            preblock: self.preblock.unwrap_or(false),
            format: self.format,
            collapsed: self.collapsed.unwrap_or(false),
            updated_at: timestamp(self.updated_at),
            created_at: timestamp(self.created_at),
            linked_ids: ref_ids(&self.refs),
            inherited_linked_ids: ref_ids(&self.path_refs),
            alias_ids: ref_ids(&self.alias),
        })
    }
}

/// Id-indexed arena of every loaded record
#[derive(Debug, Default)]
pub struct BlockStore {
    blocks: BTreeMap<BlockId, BlockRecord>,
    children: BTreeMap<BlockId, Vec<BlockId>>,
}

impl BlockStore {
    /// Build the store from decoded records, dropping malformed ones
    pub fn load(records: Vec<Value>) -> Self {
        let total = records.len();
        let mut blocks = BTreeMap::new();

        for (idx, value) in records.into_iter().enumerate() {
            let record = match serde_json::from_value::<RawRecord>(value) {
                Ok(raw) => raw.into_record(),
                Err(err) => {
                    tracing::warn!("Dropping record #{}: {}", idx, err);
                    continue;
                }
            };

            match record {
                Some(record) => {
                    if blocks.contains_key(&record.id) {
                        tracing::warn!("Duplicate block id {}; keeping the last record", record.id);
                    }
                    blocks.insert(record.id, record);
                }
                None => tracing::warn!("Dropping record #{}: missing id or uuid", idx),
            }
        }

        tracing::info!("Loaded {} of {} records", blocks.len(), total);
        Self::from_records(blocks.into_values())
    }

    /// Decode a JSON array of records
    pub fn from_json_str(json: &str) -> Result<Self, StoreError> {
        match serde_json::from_str::<Value>(json)? {
            Value::Array(records) => Ok(Self::load(records)),
            _ => Err(StoreError::NotAnArray),
        }
    }

    /// Build the store from already-decoded records
    pub fn from_records(records: impl IntoIterator<Item = BlockRecord>) -> Self {
        let blocks: BTreeMap<BlockId, BlockRecord> =
            records.into_iter().map(|r| (r.id, r)).collect();

        let mut children: BTreeMap<BlockId, Vec<BlockId>> = BTreeMap::new();
        for block in blocks.values() {
            if let Some(parent_id) = block.parent_id {
                children.entry(parent_id).or_default().push(block.id);
            }
        }

        Self { blocks, children }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, id: BlockId) -> Option<&BlockRecord> {
        self.blocks.get(&id)
    }

    /// All records in id order
    pub fn iter(&self) -> impl Iterator<Item = &BlockRecord> {
        self.blocks.values()
    }

    pub fn parent_of(&self, block: &BlockRecord) -> Option<&BlockRecord> {
        block.parent_id.and_then(|id| self.get(id))
    }

    pub fn page_of(&self, block: &BlockRecord) -> Option<&BlockRecord> {
        block.page_id.and_then(|id| self.get(id))
    }

    pub fn namespace_of(&self, block: &BlockRecord) -> Option<&BlockRecord> {
        block.namespace_id.and_then(|id| self.get(id))
    }

    /// Page that owns a block: its explicit page, else the root of its parent chain
    pub fn owning_page<'a>(&'a self, block: &'a BlockRecord) -> Option<&'a BlockRecord> {
        if block.is_page() {
            return Some(block);
        }
        if let Some(page) = self.page_of(block) {
            return Some(page);
        }

        let mut current = block;
        for _ in 0..=self.blocks.len() {
            match self.parent_of(current) {
                Some(parent) => current = parent,
                None => return current.is_page().then_some(current),
            }
        }
        None
    }

    /// Direct children ids, in id order
    pub fn children_of(&self, id: BlockId) -> &[BlockId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Blocks named in this block's own alias list
    pub fn aliases_of(&self, block: &BlockRecord) -> Vec<&BlockRecord> {
        block.alias_ids.iter().filter_map(|id| self.get(*id)).collect()
    }

    /// Blocks this block references (raw, with duplicates)
    pub fn links_of(&self, block: &BlockRecord) -> Vec<&BlockRecord> {
        block.linked_ids.iter().filter_map(|id| self.get(*id)).collect()
    }

    /// Blocks referencing this block (raw, unsuppressed)
    pub fn backlinks_of(&self, block: &BlockRecord) -> Vec<&BlockRecord> {
        self.blocks
            .values()
            .filter(|b| b.linked_ids.contains(&block.id))
            .collect()
    }

    /// 1-based position of a block in its left-sibling chain
    pub fn sibling_index_of(&self, block: &BlockRecord) -> Result<usize, StoreError> {
        let mut index = 1;
        let mut visited = HashSet::from([block.id]);
        let mut current = block;

        while let Some(left) = current.left_id.and_then(|id| self.get(id)) {
            if !visited.insert(left.id) {
                return Err(StoreError::SiblingCycle(block.id));
            }
            index += 1;
            current = left;
        }

        Ok(index)
    }

    /// Sibling index of every block, sharing work between chain members
    pub fn sibling_indices(&self) -> Result<HashMap<BlockId, usize>, StoreError> {
        let mut indices: HashMap<BlockId, usize> = HashMap::with_capacity(self.blocks.len());

        for block in self.blocks.values() {
            if indices.contains_key(&block.id) {
                continue;
            }

            // Walk left until a known index or the head, then unwind.
            let mut chain = vec![block.id];
            let mut on_chain = HashSet::from([block.id]);
            let mut base = 0;
            let mut current = block;

            while let Some(left) = current.left_id.and_then(|id| self.get(id)) {
                if let Some(&known) = indices.get(&left.id) {
                    base = known;
                    break;
                }
                if !on_chain.insert(left.id) {
                    return Err(StoreError::SiblingCycle(block.id));
                }
                chain.push(left.id);
                current = left;
            }

            for (offset, id) in chain.iter().rev().enumerate() {
                indices.insert(*id, base + offset + 1);
            }
        }

        Ok(indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn child(id: u64, parent: u64, left: Option<u64>) -> BlockRecord {
        let mut record = BlockRecord::new(id, format!("uuid-{id}"));
        record.parent_id = Some(BlockId::new(parent));
        record.page_id = Some(BlockId::new(parent));
        record.left_id = left.map(BlockId::new);
        record
    }

    #[test]
    fn test_load_short_keys() {
        let store = BlockStore::load(vec![json!({
            "id": 1,
            "uuid": "u1",
            "original-name": " Trip ",
            "name": "trip",
            "properties": {"public": true},
            "refs": [{"id": 2}, {"id": 3}],
            "path-refs": [{"id": 4}],
            "alias": [{"id": 5}],
            "created-at": 1700000000000u64,
            "collapsed?": true
        })]);

        let record = store.get(BlockId::new(1)).unwrap();
        assert_eq!(record.original_name.as_deref(), Some("Trip"));
        assert_eq!(record.linked_ids, vec![BlockId::new(2), BlockId::new(3)]);
        assert_eq!(record.inherited_linked_ids, vec![BlockId::new(4)]);
        assert_eq!(record.alias_ids, vec![BlockId::new(5)]);
        assert_eq!(record.created_at, Some(1_700_000_000_000));
        assert!(record.collapsed);
        assert!(record.is_page());
    }

    #[test]
    fn test_load_qualified_keys() {
        let store = BlockStore::load(vec![json!({
            "db/id": 10,
            "block/uuid": "u10",
            "block/content": "hello",
            "block/page": {"db/id": 1},
            "block/parent": {"db/id": 1},
            "block/left": {"db/id": 1},
            "block/pre-block?": false,
            "block/refs": [{"db/id": 1}]
        })]);

        let record = store.get(BlockId::new(10)).unwrap();
        assert_eq!(record.content.as_deref(), Some("hello"));
        assert_eq!(record.parent_id, Some(BlockId::new(1)));
        assert_eq!(record.linked_ids, vec![BlockId::new(1)]);
    }

    #[test]
    fn test_drops_malformed_records() {
        let store = BlockStore::load(vec![
            json!({"id": 1}),
            json!({"uuid": "orphan"}),
            json!({"id": "not-a-number", "uuid": "x"}),
            json!("not an object"),
            json!({"id": 2, "uuid": "ok"}),
        ]);
        assert_eq!(store.len(), 1);
        assert!(store.get(BlockId::new(2)).is_some());
    }

    #[test]
    fn test_from_json_str_requires_array() {
        assert!(matches!(
            BlockStore::from_json_str(r#"{"id": 1}"#),
            Err(StoreError::NotAnArray)
        ));
        assert!(BlockStore::from_json_str("[").is_err());
        let store = BlockStore::from_json_str(r#"[{"id": 1, "uuid": "a"}]"#).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_children_index() {
        let store = BlockStore::from_records(vec![
            BlockRecord::new(1, "page"),
            child(3, 1, Some(2)),
            child(2, 1, None),
        ]);
        assert_eq!(store.children_of(BlockId::new(1)), &[BlockId::new(2), BlockId::new(3)]);
        assert!(store.children_of(BlockId::new(2)).is_empty());
    }

    #[test]
    fn test_unresolvable_references_are_none() {
        let mut record = child(2, 99, Some(98));
        record.namespace_id = Some(BlockId::new(97));
        record.linked_ids = vec![BlockId::new(96)];
        let store = BlockStore::from_records(vec![record.clone()]);

        assert!(store.parent_of(&record).is_none());
        assert!(store.page_of(&record).is_none());
        assert!(store.namespace_of(&record).is_none());
        assert!(store.links_of(&record).is_empty());
        assert_eq!(store.sibling_index_of(&record).unwrap(), 1);
    }

    #[test]
    fn test_sibling_index_counts_hops() {
        let store = BlockStore::from_records(vec![
            BlockRecord::new(1, "page"),
            child(2, 1, None),
            child(3, 1, Some(2)),
            child(4, 1, Some(3)),
        ]);
        let index = |id| store.sibling_index_of(store.get(BlockId::new(id)).unwrap()).unwrap();
        assert_eq!(index(2), 1);
        assert_eq!(index(3), 2);
        assert_eq!(index(4), 3);

        let all = store.sibling_indices().unwrap();
        assert_eq!(all[&BlockId::new(4)], 3);
        assert_eq!(all[&BlockId::new(1)], 1);
    }

    #[test]
    fn test_sibling_cycle_is_an_error() {
        let store = BlockStore::from_records(vec![
            BlockRecord::new(1, "page"),
            child(2, 1, Some(3)),
            child(3, 1, Some(2)),
        ]);
        let block = store.get(BlockId::new(2)).unwrap();
        assert!(matches!(
            store.sibling_index_of(block),
            Err(StoreError::SiblingCycle(_))
        ));
        assert!(store.sibling_indices().is_err());
    }

    #[test]
    fn test_owning_page_walks_parents() {
        let mut nested = BlockRecord::new(3, "nested");
        nested.parent_id = Some(BlockId::new(2));
        let mut middle = BlockRecord::new(2, "middle");
        middle.parent_id = Some(BlockId::new(1));

        let store = BlockStore::from_records(vec![BlockRecord::new(1, "page"), middle, nested]);
        let nested = store.get(BlockId::new(3)).unwrap();
        assert_eq!(store.owning_page(nested).map(|p| p.id), Some(BlockId::new(1)));
    }

    #[test]
    fn test_raw_backlinks_and_aliases() {
        let mut target = BlockRecord::new(1, "target");
        target.alias_ids = vec![BlockId::new(3)];
        let mut source = child(2, 1, None);
        source.linked_ids = vec![BlockId::new(1), BlockId::new(1)];
        let store = BlockStore::from_records(vec![target, source, BlockRecord::new(3, "alias")]);

        let target = store.get(BlockId::new(1)).unwrap();
        assert_eq!(store.backlinks_of(target).len(), 1);
        assert_eq!(store.aliases_of(target)[0].id, BlockId::new(3));
        assert_eq!(store.links_of(store.get(BlockId::new(2)).unwrap()).len(), 2);
    }
}
