//! Content model structs for block records and their resolved form.

use graphpress_types::{BlockId, BlockRef, Direction};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Free-form block properties, ordered by key
pub type Properties = serde_json::Map<String, Value>;

/// A single exported record, frozen after loading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub id: BlockId,
    pub uuid: String,

    /// Lowercased page name (page-identity blocks only)
    pub name: Option<String>,
    /// Page name as typed by the author
    pub original_name: Option<String>,
    pub content: Option<String>,

    pub page_id: Option<BlockId>,
    pub parent_id: Option<BlockId>,
    pub left_id: Option<BlockId>,
    pub namespace_id: Option<BlockId>,

    pub properties: Properties,
    /// Marks the page-properties pseudo-block
    pub preblock: bool,
    pub format: Option<String>,
    pub collapsed: bool,

    /// Epoch milliseconds
    pub updated_at: Option<i64>,
    pub created_at: Option<i64>,

    pub linked_ids: Vec<BlockId>,
    pub inherited_linked_ids: Vec<BlockId>,
    pub alias_ids: Vec<BlockId>,
}

impl BlockRecord {
    /// Minimal record, used by loaders and tests
    pub fn new(id: u64, uuid: impl Into<String>) -> Self {
        Self {
            id: BlockId::new(id),
            uuid: uuid.into(),
            name: None,
            original_name: None,
            content: None,
            page_id: None,
            parent_id: None,
            left_id: None,
            namespace_id: None,
            properties: Properties::new(),
            preblock: false,
            format: None,
            collapsed: false,
            updated_at: None,
            created_at: None,
            linked_ids: Vec::new(),
            inherited_linked_ids: Vec::new(),
            alias_ids: Vec::new(),
        }
    }

    /// A page is a hierarchy root: no owning page and no parent
    pub fn is_page(&self) -> bool {
        self.page_id.is_none() && self.parent_id.is_none()
    }

    /// Display name of a page, falling back to its id
    pub fn display_name(&self) -> String {
        self.original_name
            .as_deref()
            .or(self.name.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| self.id.to_string())
    }

    /// Eligible for its own output document
    pub fn is_showable(&self) -> bool {
        let has_content = self
            .content
            .as_deref()
            .map(|c| !c.trim().is_empty())
            .unwrap_or(false);
        self.is_page() || (!self.preblock && has_content)
    }

    /// Explicit boolean property, accepting `true`/`false` or their string forms
    pub fn bool_property(&self, key: &str) -> Option<bool> {
        match self.properties.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn content_str(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

/// Label of a typed relationship
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RelationLabel {
    /// Literal text left after removing the arrow
    Text(String),
    /// The single block the declaration links to
    Link(BlockRef),
}

/// A directed, labeled edge declared by an arrow block
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Relationship {
    pub label: RelationLabel,
    pub direction: Direction,
}

impl Relationship {
    /// Header key: `label ->` or `<- label`
    pub fn header_key(&self) -> String {
        let label = match &self.label {
            RelationLabel::Text(text) => text.as_str(),
            RelationLabel::Link(target) => target.path.as_str(),
        };
        match self.direction {
            Direction::LeftToRight => format!("{} {}", label, self.direction.indicator()),
            Direction::RightToLeft => format!("{} {}", self.direction.indicator(), label),
        }
    }
}

pub type TypedRelationships = BTreeMap<Relationship, Vec<BlockRef>>;

/// A record with everything derived from the whole graph attached
#[derive(Debug, Clone)]
pub struct ResolvedBlock<'g> {
    pub record: &'g BlockRecord,
    pub path: String,
    /// 1-based position among siblings
    pub sibling_index: usize,

    pub parent: Option<BlockRef>,
    pub page: Option<BlockRef>,
    pub namespace: Option<BlockRef>,

    pub links: Vec<BlockRef>,
    pub backlinks: Vec<BlockRef>,
    pub aliases: Vec<BlockRef>,
    pub relationships: TypedRelationships,

    /// Asset file names mentioned by this block
    pub assets: Vec<String>,

    /// Display title, filled in by the renderer
    pub title: String,
    /// Rendered body, filled in by the renderer
    pub body: String,
}

impl<'g> ResolvedBlock<'g> {
    pub fn id(&self) -> BlockId {
        self.record.id
    }

    pub fn is_page(&self) -> bool {
        self.record.is_page()
    }

    /// Copy with the renderer's output attached
    pub fn with_rendered(mut self, title: String, body: String) -> Self {
        self.title = title;
        self.body = body;
        self
    }
}
