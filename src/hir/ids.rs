//! Keyword handles.

use std::fmt;

use crate::base::IdentityKey;

/// Names a keyword by its owning file and its place in that file's keyword
/// list.
///
/// The index's name map stores these instead of references, so a file can
/// be replaced without touching other files. A handle is only valid until
/// its file is reindexed.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct KeywordId {
    pub file: IdentityKey,
    pub ordinal: usize,
}

impl KeywordId {
    pub fn new(file: IdentityKey, ordinal: usize) -> Self {
        Self { file, ordinal }
    }
}

impl fmt::Display for KeywordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.file, self.ordinal)
    }
}
