//! Block content rendering.
//!
//! Raw block text goes through four ordered passes: asset paths, link and
//! embed substitution, external media shortcodes, then inline property
//! stripping. Property stripping runs last so earlier passes still see
//! the full text; shortcodes run after links so directive text is never
//! taken for a reference.

pub mod assets;
pub mod links;
pub mod properties;
pub mod shortcodes;

use crate::config::ExportConfig;
use crate::graph::LinkGraph;
use crate::models::{BlockRecord, ResolvedBlock};
use crate::publicity::{name_visible, PublicityRegistry};
use crate::store::BlockStore;
use assets::AssetLinks;
use graphpress_types::BlockRef;
use links::{collect_matches, rewrite, Destination};
pub use links::{LinkKind, RenderMode};

/// Nesting limit when a block label needs another block's rendering
pub const MAX_LABEL_DEPTH: usize = 2;

/// Title used when a block has no usable first line
pub const UNTITLED: &str = "Untitled";

/// Everything a render needs from the surrounding graph
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    pub store: &'a BlockStore,
    pub graph: &'a LinkGraph,
    pub registry: &'a PublicityRegistry,
    pub config: &'a ExportConfig,
}

pub struct ContentRenderer<'a> {
    ctx: RenderContext<'a>,
    assets: AssetLinks,
}

impl<'a> ContentRenderer<'a> {
    pub fn new(ctx: RenderContext<'a>) -> Self {
        Self {
            assets: AssetLinks::new(&ctx.config.assets_dir),
            ctx,
        }
    }

    pub fn assets(&self) -> &AssetLinks {
        &self.assets
    }

    /// Attach the rendered body and title to a resolved block
    pub fn render<'g>(&self, block: ResolvedBlock<'g>) -> ResolvedBlock<'g> {
        let body = self.render_content(block.record.content_str(), &block.links, RenderMode::Markup, 0);
        let title = self.title(block.record, &block.links);
        tracing::debug!("Rendered block {} ({} bytes)", block.id(), body.len());
        block.with_rendered(title, body)
    }

    /// Run the full pass pipeline over `content`
    pub fn render_content(
        &self,
        content: &str,
        links: &[BlockRef],
        mode: RenderMode,
        depth: usize,
    ) -> String {
        let text = self.assets.normalize(content);
        let text = self.substitute_links(&text, links, mode, depth);
        let text = shortcodes::convert(&text);
        properties::strip_properties(&text).into_owned()
    }

    /// Display title: the page name, or a block's first readable line
    pub fn title(&self, record: &BlockRecord, links: &[BlockRef]) -> String {
        let title = if record.is_page() {
            record.display_name()
        } else {
            let readable = self.render_content(record.content_str(), links, RenderMode::Readable, 0);
            truncate_line(first_line(&readable), self.ctx.config.title_max_chars)
        };

        let title = title.replace("\\#", "#");
        if title.trim().is_empty() {
            UNTITLED.to_string()
        } else {
            title
        }
    }

    fn substitute_links(
        &self,
        content: &str,
        links: &[BlockRef],
        mode: RenderMode,
        depth: usize,
    ) -> String {
        if links.is_empty() {
            return content.to_string();
        }

        let destinations = self.destinations(links, depth);
        match collect_matches(content, &destinations) {
            Ok(matches) => rewrite(content, &matches, &destinations, mode),
            Err(e) => {
                tracing::warn!("Skipping link rewriting for a block: {}", e);
                content.to_string()
            }
        }
    }

    fn destinations(&self, links: &[BlockRef], depth: usize) -> Vec<Destination> {
        links
            .iter()
            .filter_map(|link| {
                let record = self.ctx.store.get(link.id)?;
                let token = if record.is_page() {
                    record.display_name()
                } else {
                    record.uuid.clone()
                };
                Some(Destination {
                    token,
                    path: link.path.clone(),
                    label: self.label(link, record, depth),
                    is_page: record.is_page(),
                })
            })
            .collect()
    }

    fn label(&self, link: &BlockRef, record: &BlockRecord, depth: usize) -> String {
        if link.redacted && !name_visible(record) {
            return self.ctx.config.redacted_label.clone();
        }
        if record.is_page() {
            return record.display_name();
        }
        // Past the nesting limit a block is named by its uuid, which its
        // public path already carries.
        if depth >= MAX_LABEL_DEPTH {
            return record.uuid.clone();
        }
        self.block_label(record, depth)
    }

    /// First line of a block's readable rendering
    fn block_label(&self, record: &BlockRecord, depth: usize) -> String {
        let links = self.visible_links(record);
        let readable =
            self.render_content(record.content_str(), &links, RenderMode::Readable, depth + 1);
        let line = truncate_line(first_line(&readable), self.ctx.config.title_max_chars);

        if line.is_empty() {
            UNTITLED.to_string()
        } else {
            line
        }
    }

    fn visible_links(&self, record: &BlockRecord) -> Vec<BlockRef> {
        let links = self.ctx.graph.links(record);
        self.ctx
            .registry
            .redact_all(&links, &self.ctx.config.redaction_token)
    }
}

fn first_line(text: &str) -> &str {
    text.trim_start_matches(['\n', '\r'])
        .lines()
        .next()
        .unwrap_or("")
        .trim()
}

/// Cut `line` to at most `max` characters on a word boundary, ending in `...`
pub fn truncate_line(line: &str, max: usize) -> String {
    if line.chars().count() <= max {
        return line.to_string();
    }

    let budget = max.saturating_sub(3);
    let head: String = line.chars().take(budget).collect();
    let words: Vec<&str> = head.split(' ').collect();
    let kept = if words.len() > 1 {
        words[..words.len() - 1].join(" ")
    } else {
        head.clone()
    };
    format!("{}...", kept.trim_end())
}
