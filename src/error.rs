//! Crate-wide error type.
//!
//! Errors surface only at I/O and decoding boundaries. Parsers degrade to
//! best-effort values and the query layer never fails, so most public
//! operations return plain values.

use std::path::PathBuf;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{}' is {size} bytes, the limit is {limit}", path.display())]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("invalid libdoc xml: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("invalid generator output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid exclude pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("documentation generator failed: {0}")]
    Generator(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
