//! External media embeds rewritten as site shortcodes.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::borrow::Cow;

static MEDIA_EMBED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\{\{\s*(youtube|vimeo|twitter|tweet|video)\s+([^\s}]+)\s*\}\}").unwrap()
});

/// Supported media providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    YouTube,
    Vimeo,
    Twitter,
}

impl Provider {
    fn from_directive(directive: &str, url: &str) -> Option<Self> {
        match directive.to_ascii_lowercase().as_str() {
            "youtube" => Some(Provider::YouTube),
            "vimeo" => Some(Provider::Vimeo),
            "twitter" | "tweet" => Some(Provider::Twitter),
            "video" => {
                let host = url_host(url).to_ascii_lowercase();
                if host.contains("youtu") {
                    Some(Provider::YouTube)
                } else if host.contains("vimeo") {
                    Some(Provider::Vimeo)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Shortcode for `url`, or `None` when the url lacks the needed segments
    pub fn shortcode(self, url: &str) -> Option<String> {
        match self {
            Provider::YouTube => {
                let id = query_param(url, "v").or_else(|| last_segment(url))?;
                Some(format!("{{{{< youtube {} >}}}}", id))
            }
            Provider::Vimeo => {
                let id = last_segment(url)?;
                Some(format!("{{{{< vimeo {} >}}}}", id))
            }
            Provider::Twitter => {
                let segments = segments(url);
                if segments.len() < 3 {
                    return None;
                }
                let user = segments[segments.len() - 3];
                let id = segments[segments.len() - 1];
                Some(format!("{{{{< tweet user=\"{}\" id=\"{}\" >}}}}", user, id))
            }
        }
    }
}

fn without_query(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

fn segments(url: &str) -> Vec<&str> {
    without_query(url).split('/').filter(|s| !s.is_empty()).collect()
}

fn last_segment(url: &str) -> Option<&str> {
    segments(url).pop()
}

fn url_host(url: &str) -> &str {
    let rest = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    rest.split('/').next().unwrap_or(rest)
}

fn query_param<'u>(url: &'u str, key: &str) -> Option<&'u str> {
    let (_, query) = url.split_once('?')?;
    let query = query.split('#').next().unwrap_or(query);
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, v)| *k == key && !v.is_empty())
        .map(|(_, v)| v)
}

/// Convert every recognised media directive; unknown ones stay as written
pub fn convert(content: &str) -> Cow<'_, str> {
    MEDIA_EMBED.replace_all(content, |caps: &Captures| {
        let url = &caps[2];
        Provider::from_directive(&caps[1], url)
            .and_then(|provider| provider.shortcode(url))
            .unwrap_or_else(|| caps[0].to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_youtube_short_link() {
        assert_eq!(
            convert("watch {{youtube https://youtu.be/abc123}}"),
            "watch {{< youtube abc123 >}}"
        );
    }

    #[test]
    fn test_youtube_watch_param() {
        assert_eq!(
            convert("{{youtube https://www.youtube.com/watch?v=xyz789&t=10}}"),
            "{{< youtube xyz789 >}}"
        );
    }

    #[test]
    fn test_vimeo() {
        assert_eq!(
            convert("{{vimeo https://vimeo.com/76979871}}"),
            "{{< vimeo 76979871 >}}"
        );
    }

    #[test]
    fn test_twitter_and_tweet() {
        let expected = r#"{{< tweet user="rustlang" id="1234" >}}"#;
        assert_eq!(convert("{{twitter https://twitter.com/rustlang/status/1234}}"), expected);
        assert_eq!(convert("{{tweet https://x.com/rustlang/status/1234?s=20}}"), expected);
    }

    #[test]
    fn test_short_twitter_url_untouched() {
        let content = "{{twitter status/1234}}";
        assert_eq!(convert(content), content);
    }

    #[test]
    fn test_video_routed_by_host() {
        assert_eq!(
            convert("{{video https://youtu.be/abc123}}"),
            "{{< youtube abc123 >}}"
        );
        assert_eq!(
            convert("{{video https://vimeo.com/42}}"),
            "{{< vimeo 42 >}}"
        );
        let other = "{{video https://example.com/clip.mp4}}";
        assert_eq!(convert(other), other);
    }

    #[test]
    fn test_no_directive_is_identity() {
        let content = "{{embed [[Notes]]}} stays";
        assert!(matches!(convert(content), Cow::Borrowed(_)));
    }
}
