//! # graphpress-core
//!
//! Core library for compiling a note-graph export into a static-site
//! document tree.
//!
//! This crate loads block records, resolves their hierarchical paths and
//! link structure, filters out private content, renders block text, and
//! writes the resulting documents.

pub mod compiler;
pub mod config;
pub mod export;
pub mod frontmatter;
pub mod graph;
pub mod models;
pub mod paths;
pub mod publicity;
pub mod render;
pub mod slug;
pub mod store;

pub use compiler::{CompileError, CompiledGraph, GraphCompiler};
pub use config::{ConfigError, ExportConfig};
pub use export::{ExportError, ExportSummary, TreeExporter};
pub use graph::LinkGraph;
pub use models::{BlockRecord, RelationLabel, Relationship, ResolvedBlock, TypedRelationships};
pub use paths::{PathError, PathMap, PathResolver};
pub use publicity::{PublicityFilter, PublicityRegistry};
pub use render::{ContentRenderer, RenderContext};
pub use slug::slugify;
pub use store::{BlockStore, StoreError};

pub use graphpress_types::{BlockId, BlockRef, Direction};
