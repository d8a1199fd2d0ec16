//! Shared types for graphpress
//!
//! This crate provides the identifier and edge types passed between the
//! graph-resolution stages and the exporter.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Block identifier (the numeric primary key of an exported record)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub u64);

impl BlockId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for BlockId {
    fn from(id: u64) -> Self {
        BlockId(id)
    }
}

impl From<BlockId> for u64 {
    fn from(id: BlockId) -> Self {
        id.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A resolved reference to another block: its id plus its output path.
///
/// `redacted` is set when the target is not public; `path` then holds the
/// redaction token instead of the real destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockRef {
    pub id: BlockId,
    pub path: String,
    #[serde(default)]
    pub redacted: bool,
}

impl BlockRef {
    pub fn new(id: BlockId, path: impl Into<String>) -> Self {
        Self {
            id,
            path: path.into(),
            redacted: false,
        }
    }

    /// Copy of this reference pointing at `token` instead of the real path
    pub fn redact(&self, token: &str) -> Self {
        Self {
            id: self.id,
            path: token.to_string(),
            redacted: true,
        }
    }
}

/// Direction of a typed relationship edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// `label ->`: the parent points at the declaring block's children
    LeftToRight,
    /// `<- label`: the declaring block's children point at the parent
    RightToLeft,
}

impl Direction {
    pub fn indicator(&self) -> &'static str {
        match self {
            Direction::LeftToRight => "->",
            Direction::RightToLeft => "<-",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_keeps_id() {
        let reference = BlockRef::new(BlockId::new(7), "notes/trip");
        let redacted = reference.redact("-");
        assert_eq!(redacted.id, BlockId::new(7));
        assert_eq!(redacted.path, "-");
        assert!(redacted.redacted);
        assert!(!reference.redacted);
    }

    #[test]
    fn test_direction_indicator() {
        assert_eq!(Direction::LeftToRight.indicator(), "->");
        assert_eq!(Direction::RightToLeft.indicator(), "<-");
    }
}
