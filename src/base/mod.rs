//! Foundation types shared by every layer.
//!
//! This module provides:
//! - [`IdentityKey`] - Normalized, case-folded primary key of an indexed file
//! - [`LineCol`], [`LineIndex`] - Line/column conversion
//! - [`TextSize`] - Byte offsets into source text
//!
//! This module has NO dependencies on other rfcomplete modules.

mod identity;
mod span;

pub use identity::{IdentityKey, normalize_identity, normalize_path};
pub use span::{LineCol, LineIndex, TextSize};

// Re-export text-size types for convenience
pub use text_size;
