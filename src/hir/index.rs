//! The symbol index: every indexed file and a keyword-name lookup over them.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use tracing::debug;

use super::ids::KeywordId;
use super::model::{Keyword, SourceFile, file_stem, keyword_key};
use crate::base::{IdentityKey, normalize_identity, normalize_path};
use crate::syntax::ParsedFile;

/// All indexed files and their keywords.
///
/// Two views over the same records are kept in sync:
/// - `files`: identity key → file record
/// - `by_name`: lowercased keyword name → ids of the keywords with that name
///
/// Records are immutable once installed. Replacing a file builds the new
/// record completely and then swaps it in, so readers never observe a
/// half-updated keyword list.
#[derive(Clone, Debug, Default)]
pub struct SymbolIndex {
    files: IndexMap<IdentityKey, Arc<SourceFile>>,
    by_name: FxHashMap<SmolStr, Vec<KeywordId>>,
}

impl SymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a file record, replacing any record under the same key.
    pub fn add_file(&mut self, file: SourceFile) -> IdentityKey {
        let key = file.key.clone();
        self.unlink_keywords(&key);
        for keyword in &file.keywords {
            self.by_name
                .entry(keyword.key())
                .or_default()
                .push(keyword.id.clone());
        }
        debug!(
            key = %key,
            keywords = file.keywords.len(),
            library = file.is_library,
            "indexed file"
        );
        self.files.insert(key.clone(), Arc::new(file));
        key
    }

    /// Index a parsed robot file. Its display name is the file stem.
    pub fn add_resource(&mut self, parsed: ParsedFile, path: &Path) -> IdentityKey {
        let path = normalize_path(path);
        let key = normalize_identity(path.to_string_lossy());
        let name = file_stem(&path);
        self.add_file(SourceFile::from_parsed(key, name, Some(path), parsed))
    }

    /// Index parsed library documentation under the library's name.
    pub fn add_library(
        &mut self,
        parsed: ParsedFile,
        name: &str,
        doc_path: Option<&Path>,
        source_path: Option<&Path>,
    ) -> IdentityKey {
        let file = SourceFile::from_parsed(
            normalize_identity(name),
            name,
            doc_path.map(normalize_path),
            parsed,
        )
        .into_library(source_path.map(Path::to_path_buf));
        self.add_file(file)
    }

    /// Remove a file and its keywords.
    pub fn remove_file(&mut self, key: &IdentityKey) -> Option<Arc<SourceFile>> {
        self.unlink_keywords(key);
        self.files.shift_remove(key)
    }

    /// Drop every file inside `subtree`, or everything when `None`.
    pub fn reset(&mut self, subtree: Option<&Path>) {
        match subtree {
            Some(root) => {
                let root = normalize_identity(normalize_path(root).to_string_lossy());
                self.files.retain(|key, _| !key.is_within(&root));
            }
            None => self.files.clear(),
        }
        self.rebuild();
    }

    /// Recompute the keyword-name map from the file records.
    pub fn rebuild(&mut self) {
        self.by_name.clear();
        for file in self.files.values() {
            for keyword in &file.keywords {
                self.by_name
                    .entry(keyword.key())
                    .or_default()
                    .push(keyword.id.clone());
            }
        }
    }

    fn unlink_keywords(&mut self, key: &IdentityKey) {
        let Some(old) = self.files.get(key) else {
            return;
        };
        for keyword in &old.keywords {
            let name = keyword.key();
            if let Some(ids) = self.by_name.get_mut(&name) {
                ids.retain(|id| &id.file != key);
                if ids.is_empty() {
                    self.by_name.remove(&name);
                }
            }
        }
    }

    /// Apply import resolution results to one record (copy-on-write).
    pub(crate) fn set_resolved(
        &mut self,
        key: &IdentityKey,
        updates: Vec<(usize, Option<IdentityKey>)>,
    ) {
        if updates.is_empty() {
            return;
        }
        if let Some(file) = self.files.get_mut(key) {
            let file = Arc::make_mut(file);
            for (i, resolved) in updates {
                if let Some(import) = file.resources.get_mut(i) {
                    import.resolved = resolved;
                }
            }
        }
    }

    // ========================================================================
    // READ API
    // ========================================================================

    pub fn file(&self, key: &IdentityKey) -> Option<&Arc<SourceFile>> {
        self.files.get(key)
    }

    pub fn contains(&self, key: &IdentityKey) -> bool {
        self.files.contains_key(key)
    }

    /// Look up a file by its (any-case) path.
    pub fn file_by_path(&self, path: &Path) -> Option<&Arc<SourceFile>> {
        self.files
            .get(&normalize_identity(normalize_path(path).to_string_lossy()))
    }

    pub fn files(&self) -> impl Iterator<Item = &Arc<SourceFile>> {
        self.files.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &IdentityKey> {
        self.files.keys()
    }

    pub fn keyword(&self, id: &KeywordId) -> Option<&Keyword> {
        self.files.get(&id.file)?.keyword(id.ordinal)
    }

    /// Every keyword named `name` (case-insensitive), in insertion order.
    pub fn keywords_named(&self, name: &str) -> Vec<&Keyword> {
        self.by_name
            .get(&keyword_key(name))
            .map(|ids| ids.iter().filter_map(|id| self.keyword(id)).collect())
            .unwrap_or_default()
    }

    /// Lowercased names of all indexed keywords, sorted.
    pub fn keyword_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(SmolStr::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Paths of all records backed by a file.
    pub fn file_paths(&self) -> Vec<&Path> {
        self.files
            .values()
            .filter_map(|file| file.file_path.as_deref())
            .collect()
    }

    /// Records grouped by display name, optionally lowercased.
    pub fn files_by_name(&self, lowercase: bool) -> IndexMap<String, Vec<&SourceFile>> {
        let mut grouped: IndexMap<String, Vec<&SourceFile>> = IndexMap::new();
        for file in self.files.values() {
            let name = if lowercase {
                file.display_name.to_lowercase()
            } else {
                file.display_name.clone()
            };
            grouped.entry(name).or_default().push(file);
        }
        grouped
    }

    /// Records keyed by their normalized path.
    pub fn files_by_path(&self) -> IndexMap<&Path, &SourceFile> {
        self.files
            .values()
            .filter_map(|file| Some((file.file_path.as_deref()?, file.as_ref())))
            .collect()
    }

    /// Distinct library names imported by robot files, in first-seen order.
    pub fn referenced_library_names(&self) -> IndexSet<String> {
        self.files
            .values()
            .filter(|file| !file.is_library)
            .flat_map(|file| file.library_names())
            .map(str::to_string)
            .collect()
    }

    /// Number of indexed files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn keyword_count(&self) -> usize {
        self.by_name.values().map(Vec::len).sum()
    }

    /// Robot files and libraries currently indexed, for logging.
    pub fn debug_summary(&self) -> IndexSummary {
        let (libraries, robot_files): (Vec<_>, Vec<_>) =
            self.files.values().partition(|file| file.is_library);
        let names = |files: Vec<&Arc<SourceFile>>| -> Vec<String> {
            files
                .into_iter()
                .map(|file| match &file.file_path {
                    Some(path) if !file.is_library => path
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_else(|| file.display_name.clone()),
                    _ => file.display_name.clone(),
                })
                .collect()
        };
        IndexSummary {
            robot_files: names(robot_files),
            libraries: names(libraries),
            keywords: self.keyword_count(),
        }
    }

    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        let mut from_files: Vec<&KeywordId> = self
            .files
            .values()
            .flat_map(|file| file.keywords.iter().map(|kw| &kw.id))
            .collect();
        let mut from_names: Vec<&KeywordId> = self.by_name.values().flatten().collect();
        from_files.sort();
        from_names.sort();
        assert_eq!(from_files, from_names, "name map out of sync with file records");
        for (name, ids) in &self.by_name {
            for id in ids {
                let keyword = self.keyword(id).expect("dangling keyword id");
                assert_eq!(&keyword.key(), name);
            }
        }
    }
}

/// What [`SymbolIndex::debug_summary`] reports.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IndexSummary {
    pub robot_files: Vec<String>,
    pub libraries: Vec<String>,
    pub keywords: usize,
}

impl fmt::Display for IndexSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "robot files: {}", self.robot_files.join(", "))?;
        writeln!(f, "libraries: {}", self.libraries.join(", "))?;
        write!(f, "keywords: {}", self.keywords)
    }
}
