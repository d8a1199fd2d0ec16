//! Export configuration parsing and management.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),
}

/// Export settings, optionally loaded from a `graphpress.yml` file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Treat blocks as public unless they say `public:: false`
    pub assume_public: bool,

    /// Prefix of every block path and the output subdirectory for notes
    pub notes_root: String,

    /// File name of each section document
    pub index_file: String,

    /// Asset folder name, both in block content and in the output tree
    pub assets_dir: String,

    /// Destination entries kept when the destination is emptied
    pub preserve: Vec<String>,

    /// Path substituted for links to non-public blocks
    pub redaction_token: String,

    /// Label substituted for the title of non-public blocks
    pub redacted_label: String,

    /// Page property marking the page written at the destination root
    pub home_property: String,

    /// Maximum length of a derived block title
    pub title_max_chars: usize,

    /// Property keys renamed to avoid clashing with generated header keys
    pub reserved_keys: BTreeMap<String, String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            assume_public: false,
            notes_root: "notes".to_string(),
            index_file: "_index.md".to_string(),
            assets_dir: "assets".to_string(),
            preserve: vec!["files".to_string()],
            redaction_token: "-".to_string(),
            redacted_label: "redacted".to_string(),
            home_property: "home".to_string(),
            title_max_chars: 100,
            reserved_keys: default_reserved_keys(),
        }
    }
}

fn default_reserved_keys() -> BTreeMap<String, String> {
    [
        ("url", "external-url"),
        ("links", "external-links"),
        ("aliases", "external-aliases"),
        ("title", "external-title"),
        ("weight", "external-weight"),
        // Keys the header computes itself
        ("backlinks", "external-backlinks"),
        ("namespace", "external-namespace"),
        ("page", "external-page"),
        ("parent", "external-parent"),
        ("collapsed", "external-collapsed"),
        ("date", "external-date"),
        ("lastmod", "external-lastmod"),
        ("block-type", "external-block-type"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl ExportConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&contents)
    }

    /// Parse configuration from YAML text; missing keys take their defaults
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Builder-style override used by the CLI flag
    pub fn with_assume_public(mut self, assume_public: bool) -> Self {
        self.assume_public = assume_public;
        self
    }

    /// Property key as it should appear in the generated header
    pub fn header_key<'a>(&'a self, key: &'a str) -> &'a str {
        self.reserved_keys
            .get(key)
            .map(String::as_str)
            .unwrap_or(key)
    }

    /// Notes root without leading/trailing slashes
    pub fn normalized_notes_root(&self) -> &str {
        self.notes_root.trim_matches('/')
    }
}
