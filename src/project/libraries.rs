//! The library cache.
//!
//! Tracks every library name referenced by indexed robot files, where its
//! libdoc XML lives and whether it came from the generator or a fallback
//! file. A library that loaded once is never downgraded by a later failed
//! run; only its message is updated.

use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use rayon::prelude::*;
use tracing::{debug, warn};

use super::fs::FileSystem;
use super::generator::{Acquisition, Environment, LibraryEntry};
use crate::hir::{SourceFile, SymbolIndex};
use crate::syntax::{ParsedFile, libdoc};

/// Message recorded when a library's XML does not parse as libdoc.
pub const INVALID_LIBDOC: &str = "Not a valid Libdoc xml file";

/// A successfully parsed library, ready to install into an index.
#[derive(Clone, Debug)]
pub struct LoadedLibrary {
    pub name: String,
    pub documentation_path: PathBuf,
    pub source_path: Option<PathBuf>,
    pub parsed: ParsedFile,
}

#[derive(Clone, Debug, Default)]
pub struct LibraryManager {
    cache: IndexMap<String, LibraryEntry>,
    fallbacks: IndexMap<String, PathBuf>,
    environment: Environment,
}

impl LibraryManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register libdoc files to use when generation fails.
    ///
    /// The library name is the file stem. A later path replaces an earlier one.
    pub fn add_fallback_libraries<I, P>(&mut self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        for path in paths {
            let path = path.into();
            let Some(name) = path.file_stem().map(|stem| stem.to_string_lossy().into_owned()) else {
                continue;
            };
            self.fallbacks.insert(name, path);
        }
    }

    pub fn fallback_path(&self, name: &str) -> Option<&Path> {
        self.fallbacks.get(name).map(PathBuf::as_path)
    }

    pub fn clear_fallbacks(&mut self) {
        self.fallbacks.clear();
    }

    /// Drop every cache entry whose name is not in `names`.
    pub fn reset(&mut self, names: &IndexSet<String>) {
        self.cache.retain(|name, _| names.contains(name));
    }

    /// Forget everything, including the environment snapshot.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Merge generator results into the cache.
    ///
    /// An error never replaces a successful entry; it only updates its
    /// message. Returns the resulting cache entries.
    pub fn append_libraries(&mut self, libraries: Vec<LibraryEntry>) -> Vec<LibraryEntry> {
        let mut result = Vec::with_capacity(libraries.len());
        for library in libraries {
            if !library.is_success() {
                if let Some(existing) = self.cache.get_mut(&library.name).filter(|e| e.is_success()) {
                    existing.message = library.message;
                    result.push(existing.clone());
                    continue;
                }
            }
            self.cache.insert(library.name.clone(), library.clone());
            result.push(library);
        }
        result
    }

    /// Patch an existing entry. Unknown names are ignored.
    pub fn update_library(&mut self, update: LibraryEntry) -> bool {
        match self.cache.get_mut(&update.name) {
            Some(existing) => {
                *existing = update;
                true
            }
            None => {
                warn!(library = %update.name, "update for unknown library");
                false
            }
        }
    }

    /// Record one acquisition run: merge its libraries and take its
    /// environment snapshot.
    pub fn apply(&mut self, acquisition: Acquisition) -> Vec<LibraryEntry> {
        self.environment = acquisition.environment;
        self.append_libraries(acquisition.libraries)
    }

    /// Substitute fallback documentation for every name that did not load.
    ///
    /// The generator's error message is kept on the fallback entry.
    pub fn apply_fallbacks(&mut self, names: &IndexSet<String>) {
        for name in names {
            if self.cache.get(name).is_some_and(LibraryEntry::is_success) {
                continue;
            }
            let Some(path) = self.fallbacks.get(name) else {
                continue;
            };
            let mut entry = LibraryEntry::fallback(name.as_str(), path.clone());
            entry.message = self.cache.get(name).and_then(|old| old.message.clone());
            debug!(library = %name, path = %path.display(), "using fallback documentation");
            self.cache.insert(name.clone(), entry);
        }
    }

    /// Read and parse the XML of every successful entry, in parallel.
    ///
    /// Entries whose file is unreadable or not libdoc are downgraded to
    /// errors.
    pub fn load_documents(&mut self, fs: &dyn FileSystem) -> Vec<LoadedLibrary> {
        let pending: Vec<(String, PathBuf, Option<PathBuf>)> = self
            .cache
            .values()
            .filter(|entry| entry.is_success())
            .filter_map(|entry| {
                let Some(path) = entry.documentation_path.clone() else {
                    warn!(library = %entry.name, "loaded library has no documentation path, skipped");
                    return None;
                };
                Some((entry.name.clone(), path, entry.source_path.clone()))
            })
            .collect();

        let results: Vec<(String, std::result::Result<LoadedLibrary, String>)> = pending
            .into_par_iter()
            .map(|(name, path, source_path)| {
                let loaded = fs
                    .read_to_string(&path)
                    .map_err(|err| err.to_string())
                    .and_then(|text| {
                        libdoc::parse(&text)
                            .filter(ParsedFile::has_keywords)
                            .ok_or_else(|| INVALID_LIBDOC.to_string())
                    })
                    .map(|parsed| LoadedLibrary {
                        name: name.clone(),
                        documentation_path: path,
                        source_path,
                        parsed,
                    });
                (name, loaded)
            })
            .collect();

        let mut loaded = Vec::with_capacity(results.len());
        for (name, result) in results {
            match result {
                Ok(library) => loaded.push(library),
                Err(message) => {
                    warn!(library = %name, %message, "library documentation rejected");
                    self.update_library(LibraryEntry::error(name, message));
                }
            }
        }
        loaded
    }

    pub fn library(&self, name: &str) -> Option<&LibraryEntry> {
        self.cache.get(name)
    }

    pub fn libraries(&self) -> impl Iterator<Item = &LibraryEntry> {
        self.cache.values()
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

/// Library names to acquire: the base library, then every imported name.
pub fn library_names(index: &SymbolIndex, base_library: &str) -> IndexSet<String> {
    let mut names = IndexSet::new();
    names.insert(base_library.to_string());
    names.extend(index.referenced_library_names());
    names
}

/// True if the two records import different sets of libraries.
pub fn library_set_changed(previous: Option<&SourceFile>, file: &SourceFile) -> bool {
    let before: IndexSet<&str> = previous
        .map(|old| old.library_names().collect())
        .unwrap_or_default();
    let after: IndexSet<&str> = file.library_names().collect();
    before != after
}

/// Replace the library records of `index` with `loaded`.
pub fn install_libraries(index: &mut SymbolIndex, loaded: Vec<LoadedLibrary>) {
    let stale: Vec<_> = index
        .files()
        .filter(|file| file.is_library)
        .map(|file| file.key.clone())
        .collect();
    for key in &stale {
        index.remove_file(key);
    }
    for library in loaded {
        index.add_library(
            library.parsed,
            &library.name,
            Some(&library.documentation_path),
            library.source_path.as_deref(),
        );
    }
}
