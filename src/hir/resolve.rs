//! Import resolution: linking `Resource` declarations to indexed files.
//!
//! Resolution runs in two passes. The first pass links every import whose
//! target is already indexed and reports targets that exist on disk but are
//! not indexed (resources outside the scanned roots). The caller indexes
//! those and, if anything new was added, runs a second pass.
//!
//! Library imports are not resolved here. They carry no path and are matched
//! by name at query time.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::trace;

use super::index::SymbolIndex;
use crate::base::{IdentityKey, normalize_identity, normalize_path};

/// Minimal filesystem view needed to validate import targets.
pub trait FileProbe {
    fn is_file(&self, path: &Path) -> bool;
}

/// A declared import that points at a real file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Normalized path, case preserved.
    pub path: PathBuf,
    pub key: IdentityKey,
}

/// True if the path is built from variables (`${ROOT}/x.robot`).
pub fn is_computed(path: &str) -> bool {
    path.find("${")
        .is_some_and(|start| path[start + 2..].contains('}'))
}

/// Resolve a declared import path against the importing file's directory.
///
/// Computed paths are never resolved. The target must be an existing file.
pub fn resolve_import(
    declared: &str,
    base_dir: &Path,
    probe: &(impl FileProbe + ?Sized),
) -> Option<ResolvedPath> {
    if is_computed(declared) {
        return None;
    }
    let declared = normalize_path(Path::new(declared));
    let candidate = if declared.is_absolute() {
        declared
    } else {
        normalize_path(&base_dir.join(declared))
    };
    if !probe.is_file(&candidate) {
        return None;
    }
    Some(ResolvedPath {
        key: normalize_identity(candidate.to_string_lossy()),
        path: candidate,
    })
}

impl SymbolIndex {
    /// Resolve the resource imports of one file.
    ///
    /// Returns paths of real files that are imported but not indexed.
    pub fn resolve_imports(
        &mut self,
        key: &IdentityKey,
        probe: &(impl FileProbe + ?Sized),
    ) -> BTreeSet<PathBuf> {
        let mut missing = BTreeSet::new();
        let Some(file) = self.file(key) else {
            return missing;
        };
        let Some(base_dir) = file.base_dir() else {
            return missing;
        };

        let mut updates = Vec::new();
        for (i, import) in file.resources.iter().enumerate() {
            let resolved = match resolve_import(&import.declared_path, base_dir, probe) {
                Some(target) if self.contains(&target.key) => Some(target.key),
                Some(target) => {
                    missing.insert(target.path);
                    None
                }
                None => {
                    trace!(file = %key, import = %import.declared_path, "unresolved import");
                    None
                }
            };
            if resolved != import.resolved {
                updates.push((i, resolved));
            }
        }
        self.set_resolved(key, updates);
        missing
    }

    /// Resolve the resource imports of every indexed file.
    pub fn resolve_all_imports(&mut self, probe: &(impl FileProbe + ?Sized)) -> BTreeSet<PathBuf> {
        let keys: Vec<IdentityKey> = self
            .files()
            .filter(|file| !file.resources.is_empty())
            .map(|file| file.key.clone())
            .collect();
        keys.iter()
            .flat_map(|key| self.resolve_imports(key, probe))
            .collect()
    }
}
