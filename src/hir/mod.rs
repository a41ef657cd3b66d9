//! High-level model: indexed files, keywords and import links.
//!
//! This module provides:
//! - [`SourceFile`], [`Keyword`] - Records built from parse results
//! - [`KeywordId`] - Keyword handles that name their owning file by key
//! - [`SymbolIndex`] - The keyword repository with incremental updates
//! - [`resolve_import`] and [`SymbolIndex::resolve_all_imports`] - Resource
//!   import resolution
//!
//! Depends on `base` and `syntax` only.

mod ids;
mod index;
mod model;
mod resolve;

pub use ids::KeywordId;
pub use index::{IndexSummary, SymbolIndex};
pub use model::{Keyword, ResourceImport, SourceFile, keyword_key};
pub use resolve::{FileProbe, ResolvedPath, is_computed, resolve_import};
