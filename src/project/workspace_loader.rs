//! Loads project directories into a symbol index.
//!
//! Directory entries are visited one at a time in lexical order. Entries
//! whose name matches an exclude glob are skipped, as is the generator's
//! output directory. Unreadable and oversized files are skipped with a
//! warning; they never abort a scan.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};

use super::config::Settings;
use super::fs::FileSystem;
use crate::base::{IdentityKey, normalize_identity};
use crate::error::{Error, Result};
use crate::hir::SymbolIndex;
use crate::syntax::recognize::{LIBDOC_EXTENSION, ROBOT_EXTENSION, classify};
use crate::syntax::robot;

/// What loading a single file did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Loaded {
    Robot(IdentityKey),
    /// A libdoc document, to be used as fallback library documentation.
    Libdoc(PathBuf),
    NotApplicable,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub indexed: usize,
    pub skipped: usize,
    pub libdoc_files: Vec<PathBuf>,
}

/// Loads files through a [`FileSystem`] according to [`Settings`].
pub struct WorkspaceLoader<'a> {
    fs: &'a dyn FileSystem,
    settings: &'a Settings,
    excludes: &'a [glob::Pattern],
}

impl<'a> WorkspaceLoader<'a> {
    pub fn new(fs: &'a dyn FileSystem, settings: &'a Settings, excludes: &'a [glob::Pattern]) -> Self {
        Self {
            fs,
            settings,
            excludes,
        }
    }

    /// Index every robot file under `root`.
    pub fn load_directory_into_index(
        &self,
        root: &Path,
        index: &mut SymbolIndex,
    ) -> Result<ScanSummary> {
        if !self.fs.stat(root)?.is_dir {
            return Err(Error::io(root, io::Error::from(io::ErrorKind::NotADirectory)));
        }
        let mut summary = ScanSummary::default();
        self.scan_directory(root, index, &mut summary);
        debug!(
            root = %root.display(),
            indexed = summary.indexed,
            skipped = summary.skipped,
            libdoc = summary.libdoc_files.len(),
            "scanned project"
        );
        Ok(summary)
    }

    fn scan_directory(&self, dir: &Path, index: &mut SymbolIndex, summary: &mut ScanSummary) {
        let mut names = match self.fs.list_directory(dir) {
            Ok(names) => names,
            Err(err) => {
                warn!(error = %err, "skipping unreadable directory");
                summary.skipped += 1;
                return;
            }
        };
        names.sort();

        for name in names {
            if self.is_excluded(&name) {
                trace!(dir = %dir.display(), name, "excluded");
                continue;
            }
            let path = dir.join(&name);
            if self.is_in_libdoc_dir(&path) {
                continue;
            }
            let stat = match self.fs.stat(&path) {
                Ok(stat) => stat,
                Err(err) => {
                    warn!(error = %err, "skipping entry");
                    summary.skipped += 1;
                    continue;
                }
            };
            if stat.is_dir {
                self.scan_directory(&path, index, summary);
            } else if stat.is_file {
                match self.load_file_into_index(&path, index) {
                    Ok(Loaded::Robot(_)) => summary.indexed += 1,
                    Ok(Loaded::Libdoc(path)) => summary.libdoc_files.push(path),
                    Ok(Loaded::NotApplicable) => {}
                    Err(err) => {
                        warn!(error = %err, "skipping file");
                        summary.skipped += 1;
                    }
                }
            }
        }
    }

    /// Load one file. Files that are neither robot nor libdoc are ignored.
    pub fn load_file_into_index(&self, path: &Path, index: &mut SymbolIndex) -> Result<Loaded> {
        if !self.is_candidate(path) || self.is_in_libdoc_dir(path) {
            return Ok(Loaded::NotApplicable);
        }
        let content = self.read_limited(path)?;
        let classification = classify(&content, path, &self.settings.robot_extensions);
        if classification.is_test_suite {
            return Ok(Loaded::Robot(index.add_resource(robot::parse(&content), path)));
        }
        if classification.is_api_doc && self.settings.process_libdoc_files {
            return Ok(Loaded::Libdoc(path.to_path_buf()));
        }
        Ok(Loaded::NotApplicable)
    }

    /// Read a file, refusing anything at or above the size limit.
    pub fn read_limited(&self, path: &Path) -> Result<String> {
        let size = self.fs.stat(path)?.size;
        if size >= self.settings.max_file_size {
            return Err(Error::FileTooLarge {
                path: path.to_path_buf(),
                size,
                limit: self.settings.max_file_size,
            });
        }
        self.fs.read_to_string(path)
    }

    /// Two-pass import resolution over the whole index.
    ///
    /// Returns the number of files indexed between the passes.
    pub fn resolve_imports(&self, index: &mut SymbolIndex) -> usize {
        let missing = index.resolve_all_imports(self.fs);
        let added = self.load_missing(missing, index);
        if added > 0 {
            index.resolve_all_imports(self.fs);
        }
        added
    }

    /// Two-pass import resolution for a single file.
    pub fn resolve_file_imports(&self, key: &IdentityKey, index: &mut SymbolIndex) -> usize {
        let missing = index.resolve_imports(key, self.fs);
        let added = self.load_missing(missing, index);
        if added > 0 {
            index.resolve_imports(key, self.fs);
        }
        added
    }

    fn load_missing(&self, missing: BTreeSet<PathBuf>, index: &mut SymbolIndex) -> usize {
        let mut added = 0;
        for path in missing {
            match self.load_file_into_index(&path, index) {
                Ok(Loaded::Robot(key)) => {
                    debug!(%key, "indexed imported resource outside projects");
                    added += 1;
                }
                Ok(_) => {}
                Err(err) => warn!(error = %err, "skipping imported resource"),
            }
        }
        added
    }

    fn is_excluded(&self, name: &str) -> bool {
        self.excludes.iter().any(|pattern| pattern.matches(name))
    }

    fn is_candidate(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().map(|ext| ext.to_string_lossy().to_lowercase()) else {
            return false;
        };
        ext == ROBOT_EXTENSION
            || (ext == LIBDOC_EXTENSION && self.settings.process_libdoc_files)
            || self
                .settings
                .robot_extensions
                .iter()
                .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(&ext))
    }

    /// True for paths inside the generator's output directory.
    pub fn is_in_libdoc_dir(&self, path: &Path) -> bool {
        let dir = &self.settings.libdoc_dir;
        !dir.as_os_str().is_empty()
            && normalize_identity(path.to_string_lossy())
                .is_within(&normalize_identity(dir.to_string_lossy()))
    }
}
