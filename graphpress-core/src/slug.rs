//! Slug generation for path components.

use once_cell::sync::Lazy;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

static HYPHEN_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").unwrap());

/// Convert a string to a URL-safe slug
///
/// Rules:
/// - Lowercase
/// - Replace whitespace and underscores with hyphens
/// - Remove special characters (except hyphens)
/// - Collapse multiple hyphens
/// - Trim leading/trailing hyphens
///
/// # Examples
///
/// ```
/// use graphpress_core::slugify;
///
/// assert_eq!(slugify("Hello World"), "hello-world");
/// assert_eq!(slugify("Trip / Japan 2023"), "trip-japan-2023");
/// assert_eq!(slugify("C++ Programming"), "c-programming");
/// ```
pub fn slugify(input: &str) -> String {
    let lowercased = input.to_lowercase();

    let cleaned = lowercased
        .graphemes(true)
        .filter_map(|g| match g {
            " " | "_" | "\t" | "\n" | "\r\n" | "/" => Some("-"),
            _ => {
                let c = g.chars().next()?;
                if c.is_alphanumeric() || c == '-' {
                    Some(g)
                } else {
                    None
                }
            }
        })
        .collect::<String>();

    let collapsed = HYPHEN_RUNS.replace_all(&cleaned, "-");
    collapsed.trim_matches('-').to_string()
}

/// Slug for a single path component, falling back to percent-encoding
/// when slugification leaves nothing usable.
///
/// ```
/// use graphpress_core::slug::path_slug;
///
/// assert_eq!(path_slug("Reading List"), "reading-list");
/// assert_eq!(path_slug("???"), "%3F%3F%3F");
/// ```
pub fn path_slug(component: &str) -> String {
    let slug = slugify(component);
    if slug.is_empty() {
        utf8_percent_encode(component.trim(), NON_ALPHANUMERIC).to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("Reading List"), "reading-list");
    }

    #[test]
    fn test_special_characters() {
        assert_eq!(slugify("Rust & Safety"), "rust-safety");
        assert_eq!(slugify("Node.js Tips"), "nodejs-tips");
        assert_eq!(slugify("What's new?"), "whats-new");
    }

    #[test]
    fn test_namespace_separator() {
        assert_eq!(slugify("projects/garden"), "projects-garden");
    }

    #[test]
    fn test_unicode() {
        assert_eq!(slugify("Café"), "café");
        assert_eq!(slugify("日記"), "日記");
    }

    #[test]
    fn test_uuid_is_stable() {
        let uuid = "6489f1a2-0b4c-4f4e-9d1e-2b7a6c5d4e3f";
        assert_eq!(slugify(uuid), uuid);
        assert_eq!(slugify(&uuid.to_uppercase()), uuid);
    }

    #[test]
    fn test_leading_trailing_hyphens() {
        assert_eq!(slugify("  Hello World  "), "hello-world");
        assert_eq!(slugify("-Leading Hyphen"), "leading-hyphen");
    }

    #[test]
    fn test_empty_and_special_only() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_path_slug_fallback() {
        assert_eq!(path_slug("!!!"), "%21%21%21");
        assert_eq!(path_slug("Inbox"), "inbox");
    }
}
