//! Page and block reference syntax, matched per destination.

use regex::Regex;

/// The six reference forms, in precedence order within each family
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LinkKind {
    /// `{{embed [[Name]]}}`
    PageEmbed,
    /// `[text]([[Name]])`
    PageAlias,
    /// `[[Name]]`
    PageReference,
    /// `{{embed ((uuid))}}`
    BlockEmbed,
    /// `[text](((uuid)))`
    BlockAlias,
    /// `((uuid))`
    BlockReference,
}

const PAGE_KINDS: [LinkKind; 3] = [
    LinkKind::PageEmbed,
    LinkKind::PageAlias,
    LinkKind::PageReference,
];

const BLOCK_KINDS: [LinkKind; 3] = [
    LinkKind::BlockEmbed,
    LinkKind::BlockAlias,
    LinkKind::BlockReference,
];

/// How matched references are rewritten
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Site links and include directives
    Markup,
    /// Bare labels, for titles
    Readable,
}

impl LinkKind {
    pub fn for_destination(is_page: bool) -> &'static [LinkKind] {
        if is_page {
            &PAGE_KINDS
        } else {
            &BLOCK_KINDS
        }
    }

    /// Lower wins when two matches start at the same offset
    pub fn precedence(self) -> u8 {
        match self {
            LinkKind::PageEmbed | LinkKind::BlockEmbed => 0,
            LinkKind::PageAlias | LinkKind::BlockAlias => 1,
            LinkKind::PageReference | LinkKind::BlockReference => 2,
        }
    }

    /// Case-insensitive pattern for `token`; alias forms capture their text
    pub fn pattern(self, token: &str) -> String {
        let token = regex::escape(token.trim());
        match self {
            LinkKind::PageEmbed => format!(r"(?i)\{{\{{embed\s*\[\[\s*{token}\s*\]\]\s*\}}\}}"),
            LinkKind::PageAlias => format!(r"(?i)\[([^\[\]]*)\]\(\s*\[\[\s*{token}\s*\]\]\s*\)"),
            LinkKind::PageReference => format!(r"(?i)\[\[\s*{token}\s*\]\]"),
            LinkKind::BlockEmbed => format!(r"(?i)\{{\{{embed\s*\(\(\s*{token}\s*\)\)\s*\}}\}}"),
            LinkKind::BlockAlias => format!(r"(?i)\[([^\[\]]*)\]\(\s*\(\(\s*{token}\s*\)\)\s*\)"),
            LinkKind::BlockReference => format!(r"(?i)\(\(\s*{token}\s*\)\)"),
        }
    }

    pub fn regex(self, token: &str) -> Result<Regex, regex::Error> {
        Regex::new(&self.pattern(token))
    }

    /// Replacement text for one match
    pub fn render(self, mode: RenderMode, dest: &Destination, text: Option<&str>) -> String {
        let text = text.unwrap_or(&dest.label);
        match (mode, self) {
            (RenderMode::Readable, LinkKind::PageAlias | LinkKind::BlockAlias) => text.to_string(),
            (RenderMode::Readable, _) => dest.label.clone(),
            (RenderMode::Markup, LinkKind::PageEmbed) => {
                format!("{{{{< links/page-embed \"{}\" >}}}}", dest.path)
            }
            (RenderMode::Markup, LinkKind::BlockEmbed) => {
                format!("{{{{< links/block-embed \"{}\" >}}}}", dest.path)
            }
            (RenderMode::Markup, LinkKind::PageAlias | LinkKind::BlockAlias) => {
                format!("[{}]({})", text, dest.path)
            }
            (RenderMode::Markup, LinkKind::PageReference | LinkKind::BlockReference) => {
                format!("[{}]({})", dest.label, dest.path)
            }
        }
    }
}

/// A resolved link target as the renderer sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// Raw token in source text: display name for pages, uuid for blocks
    pub token: String,
    /// Output path or the redaction token
    pub path: String,
    /// Human-readable label
    pub label: String,
    pub is_page: bool,
}

/// One accepted span of the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkMatch {
    pub start: usize,
    pub end: usize,
    pub kind: LinkKind,
    pub destination: usize,
    pub text: Option<String>,
}

/// Collect all non-overlapping reference spans across every destination.
///
/// Earliest start wins; ties go to the higher-precedence form.
pub fn collect_matches(
    content: &str,
    destinations: &[Destination],
) -> Result<Vec<LinkMatch>, regex::Error> {
    let mut candidates = Vec::new();

    for (index, dest) in destinations.iter().enumerate() {
        if dest.token.trim().is_empty() {
            continue;
        }
        for kind in LinkKind::for_destination(dest.is_page) {
            let re = kind.regex(&dest.token)?;
            for caps in re.captures_iter(content) {
                let Some(whole) = caps.get(0) else {
                    continue;
                };
                candidates.push(LinkMatch {
                    start: whole.start(),
                    end: whole.end(),
                    kind: *kind,
                    destination: index,
                    text: caps.get(1).map(|m| m.as_str().to_string()),
                });
            }
        }
    }

    candidates.sort_by_key(|m| (m.start, m.kind.precedence(), std::cmp::Reverse(m.end)));

    let mut accepted: Vec<LinkMatch> = Vec::with_capacity(candidates.len());
    let mut cursor = 0;
    for candidate in candidates {
        if candidate.start < cursor {
            continue;
        }
        cursor = candidate.end;
        accepted.push(candidate);
    }
    Ok(accepted)
}

/// Rewrite `content` once, left to right, replacing each accepted span
pub fn rewrite(
    content: &str,
    matches: &[LinkMatch],
    destinations: &[Destination],
    mode: RenderMode,
) -> String {
    let mut out = String::with_capacity(content.len());
    let mut cursor = 0;
    for m in matches {
        out.push_str(&content[cursor..m.start]);
        let dest = &destinations[m.destination];
        out.push_str(&m.kind.render(mode, dest, m.text.as_deref()));
        cursor = m.end;
    }
    out.push_str(&content[cursor..]);
    out
}
