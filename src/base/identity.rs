//! Identity keys for indexed files.

use std::borrow::Borrow;
use std::fmt;
use std::path::{Path, PathBuf};

use smol_str::SmolStr;

/// The primary key of a file record in the index.
///
/// Test-suite files are keyed by their normalized path, libraries by their
/// normalized name. Keys are always lower-cased and use `/` as separator, so
/// two spellings of the same path compare equal.
///
/// Keys are only ever produced by [`normalize_identity`].
#[derive(Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct IdentityKey(SmolStr);

impl IdentityKey {
    /// Get the key as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether this key lies inside the subtree rooted at `root`.
    ///
    /// A key is inside its own subtree. `/a/b` is inside `/a` but `/ab` is not.
    pub fn is_within(&self, root: &IdentityKey) -> bool {
        let key = self.as_str();
        let root = root.as_str();
        if root.is_empty() {
            return true;
        }
        match key.strip_prefix(root) {
            Some(rest) => rest.is_empty() || rest.starts_with('/') || root.ends_with('/'),
            None => false,
        }
    }
}

impl fmt::Debug for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdentityKey({:?})", self.0.as_str())
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for IdentityKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for IdentityKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derive the identity key for a path or library name.
///
/// Every place that derives or compares a key goes through here.
pub fn normalize_identity(path: impl AsRef<str>) -> IdentityKey {
    let normalized = lexical_normalize(path.as_ref());
    IdentityKey(SmolStr::new(normalized.to_lowercase()))
}

/// Lexically normalize a filesystem path without touching the disk.
///
/// Collapses repeated separators, `.` segments and resolvable `..` segments.
/// Case is preserved.
pub fn normalize_path(path: &Path) -> PathBuf {
    PathBuf::from(lexical_normalize(&path.to_string_lossy()))
}

fn lexical_normalize(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }
    let unified = path.replace('\\', "/");
    let absolute = unified.starts_with('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if absolute => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    match (absolute, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_case_folded() {
        assert_eq!(
            normalize_identity("/Project/Suite.robot"),
            normalize_identity("/project/suite.ROBOT")
        );
    }

    #[test]
    fn test_identity_collapses_segments() {
        let key = normalize_identity("/a/./b//c/../d.robot");
        assert_eq!(key.as_str(), "/a/b/d.robot");
    }

    #[test]
    fn test_identity_unifies_separators() {
        let key = normalize_identity("C:\\Tests\\Common.robot");
        assert_eq!(key.as_str(), "c:/tests/common.robot");
    }

    #[test]
    fn test_relative_parent_segments_are_kept() {
        assert_eq!(normalize_identity("../lib/x.robot").as_str(), "../lib/x.robot");
        assert_eq!(normalize_identity("a/../..").as_str(), "..");
    }

    #[test]
    fn test_library_names_are_keys_too() {
        assert_eq!(normalize_identity("BuiltIn").as_str(), "builtin");
    }

    #[test]
    fn test_is_within() {
        let root = normalize_identity("/proj");
        assert!(normalize_identity("/proj/a.robot").is_within(&root));
        assert!(normalize_identity("/proj").is_within(&root));
        assert!(!normalize_identity("/project2/a.robot").is_within(&root));
    }

    #[test]
    fn test_normalize_path_preserves_case() {
        let path = normalize_path(Path::new("/Proj/./Res/../Keywords.robot"));
        assert_eq!(path, PathBuf::from("/Proj/Keywords.robot"));
    }
}
