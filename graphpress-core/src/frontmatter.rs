//! Front matter headers for exported documents.

use crate::config::ExportConfig;
use crate::models::ResolvedBlock;
use chrono::{DateTime, Utc};
use graphpress_types::BlockRef;
use regex::Regex;
use serde_yaml::{Mapping, Value};
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrontmatterError {
    #[error("Invalid YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Property {key} cannot be encoded: {source}")]
    Property {
        key: String,
        source: serde_yaml::Error,
    },
}

static FRONTMATTER_REGEX: OnceLock<Regex> = OnceLock::new();

fn frontmatter_regex() -> &'static Regex {
    FRONTMATTER_REGEX.get_or_init(|| Regex::new(r"(?s)^---\r?\n(.*?)\r?\n---\r?\n(.*)$").unwrap())
}

fn paths(refs: &[BlockRef]) -> Value {
    Value::Sequence(refs.iter().map(|r| Value::String(r.path.clone())).collect())
}

fn timestamp(millis: Option<i64>) -> Option<Value> {
    let moment: DateTime<Utc> = DateTime::from_timestamp_millis(millis?)?;
    Some(Value::String(moment.to_rfc3339()))
}

fn insert(header: &mut Mapping, key: &str, value: Value) {
    if header.insert(Value::String(key.to_string()), value).is_some() {
        tracing::warn!("Header key {:?} was set twice; keeping the computed value", key);
    }
}

/// Header mapping for one block, keys in their fixed output order
pub fn build_front_matter(
    block: &ResolvedBlock<'_>,
    config: &ExportConfig,
) -> Result<Mapping, FrontmatterError> {
    let mut header = Mapping::new();
    insert(&mut header, "title", Value::String(block.title.clone()));

    for (key, value) in &block.record.properties {
        let encoded = serde_yaml::to_value(value).map_err(|source| FrontmatterError::Property {
            key: key.clone(),
            source,
        })?;
        insert(&mut header, config.header_key(key), encoded);
    }

    // Redacted link labels share one key; their targets are merged.
    for (relationship, targets) in &block.relationships {
        let key = Value::String(relationship.header_key());
        let merged = header.get_mut(&key).and_then(Value::as_sequence_mut);
        match (merged, paths(targets)) {
            (Some(existing), Value::Sequence(more)) => existing.extend(more),
            (_, value) => {
                header.insert(key, value);
            }
        }
    }

    for (key, refs) in [
        ("backlinks", &block.backlinks),
        ("aliases", &block.aliases),
        ("links", &block.links),
    ] {
        if !refs.is_empty() {
            insert(&mut header, key, paths(refs));
        }
    }

    if let Some(namespace) = &block.namespace {
        insert(&mut header, "namespace", Value::String(namespace.path.clone()));
    }
    if !block.is_page() {
        if let Some(page) = &block.page {
            insert(&mut header, "page", Value::String(page.path.clone()));
        }
        if let Some(parent) = &block.parent {
            insert(&mut header, "parent", Value::String(parent.path.clone()));
        }
    }
    if block.record.collapsed {
        insert(&mut header, "collapsed", Value::Bool(true));
    }
    if let Some(date) = timestamp(block.record.created_at) {
        insert(&mut header, "date", date);
    }
    if let Some(lastmod) = timestamp(block.record.updated_at) {
        insert(&mut header, "lastmod", lastmod);
    }

    let block_type = if block.is_page() { "page" } else { "block" };
    insert(&mut header, "block-type", Value::String(block_type.to_string()));
    insert(&mut header, "weight", Value::Number((block.sibling_index as u64).into()));

    Ok(header)
}

/// Full document text: `---`, the YAML header, `---`, then the body
pub fn render_document(
    block: &ResolvedBlock<'_>,
    config: &ExportConfig,
) -> Result<String, FrontmatterError> {
    let header = build_front_matter(block, config)?;
    let yaml = serde_yaml::to_string(&header)?;
    Ok(format!("---\n{}---\n{}\n", yaml, block.body))
}

/// Split a written document back into its header and body
///
/// Returns an empty mapping and the whole text when no header is present.
///
/// # Example
///
/// ```
/// use graphpress_core::frontmatter::parse_front_matter;
///
/// let document = "---\ntitle: Trip\nweight: 1\n---\nPacking list\n";
/// let (header, body) = parse_front_matter(document).unwrap();
/// assert_eq!(header.get("title").and_then(|v| v.as_str()), Some("Trip"));
/// assert_eq!(body, "Packing list");
/// ```
pub fn parse_front_matter(document: &str) -> Result<(Mapping, String), FrontmatterError> {
    let Some(captures) = frontmatter_regex().captures(document) else {
        return Ok((Mapping::new(), document.to_string()));
    };

    let yaml = captures.get(1).map(|m| m.as_str()).unwrap_or("");
    let body = captures.get(2).map(|m| m.as_str()).unwrap_or("");

    let header: Mapping = if yaml.trim().is_empty() {
        Mapping::new()
    } else {
        serde_yaml::from_str(yaml)?
    };
    let body = body.strip_suffix('\n').unwrap_or(body);
    Ok((header, body.to_string()))
}
