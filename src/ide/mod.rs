//! IDE features: the keyword query engine.
//!
//! This module sits between the symbol index and whatever drives the
//! editor. Everything here reads the index and never mutates it.
//!
//! ## Design Principles
//!
//! 1. **Pure functions**: Take an index and a prefix, return suggestions
//! 2. **No editor types**: Payloads are our own, converted by the host
//! 3. **Never fails**: A query always returns a list, possibly empty
//!
//! ## Usage
//!
//! ```ignore
//! use rfcomplete::ide::{CompletionOptions, completions};
//!
//! let suggestions = completions(&index, "BuiltIn.lo", Some(path), &CompletionOptions::default());
//! ```

mod completion;
mod fuzzy;
mod scope;

pub use completion::{
    CompletionOptions, ReplacementSpan, Suggestion, SuggestionKind, bdd_variants,
    completion_prefix, completions, keyword_suggestions, library_name_suggestions,
};
pub use fuzzy::{UNIFORM_SCORE, score};
pub use scope::{CandidateFiles, ScopeContext, ScopeKind, ScopeResolution, default_files, detect_scope};
