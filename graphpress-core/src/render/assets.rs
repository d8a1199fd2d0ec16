//! Relative asset references.

use regex::Regex;
use serde_json::Value;
use std::borrow::Cow;

/// Rewrites `(../assets/NAME)` to `(/assets/NAME)` and lists the names
#[derive(Debug, Clone)]
pub struct AssetLinks {
    assets_dir: String,
    pattern: Option<Regex>,
}

impl AssetLinks {
    pub fn new(assets_dir: &str) -> Self {
        let assets_dir = assets_dir.trim_matches('/').to_string();
        let source = format!(r"(?i)\(\.\./{}/([^)\s]+)\)", regex::escape(&assets_dir));
        let pattern = match Regex::new(&source) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!("Skipping asset rewriting for folder {:?}: {}", assets_dir, e);
                None
            }
        };
        Self { assets_dir, pattern }
    }

    /// Root-relative asset references
    pub fn normalize<'c>(&self, content: &'c str) -> Cow<'c, str> {
        match &self.pattern {
            Some(re) => re.replace_all(content, |caps: &regex::Captures| {
                format!("(/{}/{})", self.assets_dir, &caps[1])
            }),
            None => Cow::Borrowed(content),
        }
    }

    /// Asset file names mentioned in content, in order of first mention
    pub fn names_in(&self, content: &str) -> Vec<String> {
        let Some(re) = &self.pattern else {
            return Vec::new();
        };
        let mut names: Vec<String> = Vec::new();
        for caps in re.captures_iter(content) {
            let name = caps[1].to_string();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// File name referenced by an `image` property value
    pub fn image_property(&self, value: &Value) -> Option<String> {
        let text = value.as_str()?.trim();
        if let Some(name) = self.names_in(text).into_iter().next() {
            return Some(name);
        }

        let marker = format!("{}/", self.assets_dir);
        let (_, rest) = text.rsplit_once(marker.as_str())?;
        let name = rest.trim_end_matches(')').rsplit('/').next()?.trim();
        (!name.is_empty()).then(|| name.to_string())
    }
}
