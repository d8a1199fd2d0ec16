//! Inline `key:: value` property lines.

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

static PROPERTY_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[^\s:]+::(?:\s.*)?$").unwrap());

/// Whether a single line is an inline property declaration
pub fn is_property_line(line: &str) -> bool {
    PROPERTY_LINE.is_match(line.trim_end_matches('\r'))
}

/// Remove every property line, leaving content without any untouched
pub fn strip_properties(content: &str) -> Cow<'_, str> {
    if !content.contains("::") || !content.split('\n').any(is_property_line) {
        return Cow::Borrowed(content);
    }

    let kept: Vec<&str> = content
        .split('\n')
        .filter(|line| !is_property_line(line))
        .collect();
    Cow::Owned(kept.join("\n"))
}
