//! # rfcomplete-base
//!
//! Core library for Robot Framework keyword indexing, import resolution and
//! autocomplete queries.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! project → Workspace, settings, file access, library acquisition
//!   ↓
//! ide     → Query engine (scope detection, fuzzy ranking, suggestions)
//!   ↓
//! hir     → Symbol index, file records, import resolution
//!   ↓
//! syntax  → Recognition, robot parser, libdoc parser
//!   ↓
//! base    → Primitives (identity keys, positions)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use rfcomplete::project::{ProcessGenerator, RealFs, Settings, Workspace};
//!
//! let workspace = Workspace::new(Settings::default(), RealFs, ProcessGenerator::new(script))?;
//! workspace.open_project("/path/to/project");
//! let suggestions = workspace.suggestions("BuiltIn.lo", Some(path));
//! ```

/// Foundation types: identity keys, line/column positions
pub mod base;

pub mod error;

/// High-level model: file records, keyword index, import resolution
pub mod hir;

/// Query engine: scopes, ranking and suggestion payloads
pub mod ide;

/// Workspace management and library acquisition
pub mod project;

/// Recognizers and parsers for robot source and libdoc XML
pub mod syntax;

pub use error::{Error, Result};
pub use project::{ReloadOutcome, Settings, Workspace};
