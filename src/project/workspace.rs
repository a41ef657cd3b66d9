//! The host-facing workspace.
//!
//! A [`Workspace`] owns the symbol index for a set of open project roots,
//! the library cache, and the collaborators it needs (filesystem and
//! documentation generator). Hosts feed it file events and ask it for
//! suggestions and status reports.
//!
//! A reload rebuilds the index from scratch into a staging index and swaps
//! it in at the end, so queries keep seeing the previous index until the
//! new one is complete. File events that arrive while a reload is staging
//! apply to the live index and are replayed onto the staging index before
//! the swap. Reloads and library refreshes are coalesced; see [`Coalescer`].
//!
//! Only one library acquisition runs at a time. Lock order is acquisition,
//! then index, then staged events. The library cache lock comes after the
//! index lock.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use indexmap::IndexSet;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use super::coalesce::Coalescer;
use super::config::Settings;
use super::fs::FileSystem;
use super::generator::{self, DocGenerator, GenerateRequest};
use super::libraries::{self, LibraryManager, LoadedLibrary};
use super::status::{self, StatusReport};
use super::workspace_loader::WorkspaceLoader;
use crate::base::IdentityKey;
use crate::error::Result;
use crate::hir::SymbolIndex;
use crate::ide::{self, CompletionOptions, Suggestion};
use crate::syntax::recognize::{self, LIBDOC_EXTENSION};
use crate::syntax::robot;

/// Lifecycle of the project set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum LoadState {
    #[default]
    Initial,
    Loading,
    Loaded,
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Initial => "project-initial",
            Self::Loading => "project-loading",
            Self::Loaded => "project-loaded",
        })
    }
}

/// Result of a reload request. Reloads never fail with `Err`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ReloadOutcome {
    Reloaded,
    /// Another reload was in flight; this request will be served by its re-run.
    Scheduled,
    Error { message: String },
}

/// A file event seen while a reload was staging.
#[derive(Clone, Debug)]
enum FileEvent {
    Update { path: PathBuf, content: String },
    Remove { path: PathBuf },
}

pub struct Workspace {
    settings: Settings,
    options: CompletionOptions,
    excludes: Vec<glob::Pattern>,
    fs: Box<dyn FileSystem>,
    generator: Box<dyn DocGenerator>,
    roots: RwLock<IndexSet<PathBuf>>,
    index: RwLock<SymbolIndex>,
    libraries: Mutex<LibraryManager>,
    /// Libdoc files found by the last project scan.
    project_libdocs: Mutex<Vec<PathBuf>>,
    state: RwLock<LoadState>,
    /// `Some` while a reload is building its staging index.
    staged_events: Mutex<Option<Vec<FileEvent>>>,
    /// Held for the whole of one acquisition run.
    acquisition: Mutex<()>,
    reloads: Coalescer,
    refreshes: Coalescer,
}

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("roots", &*self.roots.read())
            .field("files", &self.index.read().len())
            .field("state", &*self.state.read())
            .finish_non_exhaustive()
    }
}

impl Workspace {
    /// Fails only if an exclude pattern is not a valid glob.
    pub fn new(
        settings: Settings,
        fs: impl FileSystem + 'static,
        generator: impl DocGenerator + 'static,
    ) -> Result<Self> {
        Ok(Self {
            options: settings.completion_options(),
            excludes: settings.exclude_matchers()?,
            settings,
            fs: Box::new(fs),
            generator: Box::new(generator),
            roots: RwLock::new(IndexSet::new()),
            index: RwLock::new(SymbolIndex::new()),
            libraries: Mutex::new(LibraryManager::new()),
            project_libdocs: Mutex::new(Vec::new()),
            state: RwLock::new(LoadState::Initial),
            staged_events: Mutex::new(None),
            acquisition: Mutex::new(()),
            reloads: Coalescer::new(),
            refreshes: Coalescer::new(),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn load_state(&self) -> LoadState {
        *self.state.read()
    }

    pub fn roots(&self) -> Vec<PathBuf> {
        self.roots.read().iter().cloned().collect()
    }

    /// Run `f` against the current index.
    pub fn with_index<T>(&self, f: impl FnOnce(&SymbolIndex) -> T) -> T {
        f(&self.index.read())
    }

    /// Run `f` against the library cache.
    pub fn with_libraries<T>(&self, f: impl FnOnce(&LibraryManager) -> T) -> T {
        f(&self.libraries.lock())
    }

    fn loader(&self) -> WorkspaceLoader<'_> {
        WorkspaceLoader::new(self.fs.as_ref(), &self.settings, &self.excludes)
    }

    // ========================================================================
    // PROJECTS
    // ========================================================================

    pub fn open_project(&self, root: impl Into<PathBuf>) -> ReloadOutcome {
        self.roots.write().insert(root.into());
        self.reload()
    }

    pub fn close_project(&self, root: &Path) -> ReloadOutcome {
        let removed = self.roots.write().shift_remove(root);
        if !removed {
            return ReloadOutcome::Reloaded;
        }
        self.remove_file(root);
        self.reload()
    }

    /// Rebuild the index from every open root, then acquire libraries.
    pub fn reload(&self) -> ReloadOutcome {
        self.reloads.run(|| self.reload_once()).unwrap_or_else(|| {
            debug!("reload already running, scheduled a re-run");
            ReloadOutcome::Scheduled
        })
    }

    fn reload_once(&self) -> ReloadOutcome {
        let started = Instant::now();
        *self.state.write() = LoadState::Loading;
        *self.staged_events.lock() = Some(Vec::new());
        let roots = self.roots();
        info!(roots = roots.len(), "reloading projects");

        let loader = self.loader();
        let mut staging = SymbolIndex::new();
        let mut project_libdocs = Vec::new();
        let mut errors = Vec::new();
        for root in &roots {
            match loader.load_directory_into_index(root, &mut staging) {
                Ok(summary) => project_libdocs.extend(summary.libdoc_files),
                Err(err) => {
                    warn!(root = %root.display(), error = %err, "could not load project");
                    errors.push(err.to_string());
                }
            }
        }
        loader.resolve_imports(&mut staging);

        *self.project_libdocs.lock() = project_libdocs;

        let acquiring = self.acquisition.lock();
        let names = libraries::library_names(&staging, &self.settings.base_library);
        let loaded = self.import_libraries(&names);
        libraries::install_libraries(&mut staging, loaded);
        let libraries_changed = self.install_staging(staging, &names, started);
        drop(acquiring);
        *self.state.write() = LoadState::Loaded;

        if libraries_changed {
            debug!("replayed events changed the imported libraries");
            self.refresh_libraries();
        }

        if errors.is_empty() {
            ReloadOutcome::Reloaded
        } else {
            ReloadOutcome::Error {
                message: errors.join("\n"),
            }
        }
    }

    /// Replay the events recorded while `staging` was built, then make it the
    /// live index. Returns true if the replay changed the library set from
    /// `acquired`.
    fn install_staging(&self, mut staging: SymbolIndex, acquired: &IndexSet<String>, started: Instant) -> bool {
        let mut index = self.index.write();
        let events = self.staged_events.lock().take().unwrap_or_default();
        for event in &events {
            match event {
                FileEvent::Update { path, content } => {
                    self.apply_update(&mut staging, path, content);
                }
                FileEvent::Remove { path } => staging.reset(Some(path.as_path())),
            }
        }
        let changed = libraries::library_names(&staging, &self.settings.base_library) != *acquired;
        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            replayed = events.len(),
            "reloaded projects\n{}",
            staging.debug_summary()
        );
        *index = staging;
        changed
    }

    // ========================================================================
    // LIBRARIES
    // ========================================================================

    /// Generate documentation for `names`, apply fallbacks and parse the
    /// resulting XML. The index is not touched. Callers hold the
    /// acquisition lock.
    fn import_libraries(&self, names: &IndexSet<String>) -> Vec<LoadedLibrary> {
        let run = Uuid::new_v4();
        let span = info_span!("import_libraries", %run);
        let _enter = span.enter();
        let started = Instant::now();
        info!(libraries = names.len(), "importing libraries");

        let fallbacks = self.bundled_fallbacks();
        let project_libdocs = self.project_libdocs.lock().clone();
        {
            let mut manager = self.libraries.lock();
            manager.clear_fallbacks();
            manager.add_fallback_libraries(fallbacks);
            manager.add_fallback_libraries(project_libdocs);
            manager.reset(names);
        }

        let names_list: Vec<String> = names.iter().cloned().collect();
        let request = GenerateRequest {
            executable: &self.settings.executable,
            library_names: &names_list,
            module_search_paths: &self.settings.module_search_paths,
            output_dir: &self.settings.libdoc_dir,
        };
        let acquisition = generator::acquire(self.generator.as_ref(), &request);

        let mut manager = self.libraries.lock();
        manager.apply(acquisition);
        manager.apply_fallbacks(names);
        let loaded = manager.load_documents(self.fs.as_ref());
        info!(
            loaded = loaded.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "imported libraries"
        );
        loaded
    }

    fn bundled_fallbacks(&self) -> Vec<PathBuf> {
        let Some(dir) = &self.settings.fallback_library_dir else {
            return Vec::new();
        };
        let mut names = match self.fs.list_directory(dir) {
            Ok(names) => names,
            Err(err) => {
                debug!(error = %err, "no fallback libraries");
                return Vec::new();
            }
        };
        names.sort();
        names
            .into_iter()
            .filter(|name| {
                Path::new(name)
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(LIBDOC_EXTENSION))
            })
            .map(|name| dir.join(name))
            .collect()
    }

    /// Re-acquire libraries for the live index.
    ///
    /// Requests made while a refresh runs collapse into one re-run, which
    /// reads the library names again.
    fn refresh_libraries(&self) {
        let ran = self.refreshes.run(|| {
            let _acquiring = self.acquisition.lock();
            let names = libraries::library_names(&self.index.read(), &self.settings.base_library);
            let loaded = self.import_libraries(&names);
            libraries::install_libraries(&mut self.index.write(), loaded);
        });
        if ran.is_none() {
            debug!("library refresh already running, scheduled a re-run");
        }
    }

    // ========================================================================
    // FILE EVENTS
    // ========================================================================

    /// Reindex one file after it changed.
    ///
    /// Imports of the file are resolved in two passes. Libraries are
    /// re-acquired only if the file's set of imported libraries changed.
    /// Returns the file's key if it is indexed afterwards.
    pub fn update_file(&self, path: &Path, content: &str) -> Option<IdentityKey> {
        let (applied, staging) = {
            let mut index = self.index.write();
            let applied = self.apply_update(&mut index, path, content);
            let staging = self.record_event(|| FileEvent::Update {
                path: path.to_path_buf(),
                content: content.to_string(),
            });
            (applied, staging)
        };

        let (key, libraries_changed) = applied?;
        if libraries_changed {
            if staging {
                debug!(%key, "imported libraries changed, left to the running reload");
            } else {
                debug!(%key, "imported libraries changed");
                self.refresh_libraries();
            }
        }
        Some(key)
    }

    /// Apply new content for `path` to `index`. Returns the file's key and
    /// whether its imported libraries changed.
    fn apply_update(&self, index: &mut SymbolIndex, path: &Path, content: &str) -> Option<(IdentityKey, bool)> {
        if content.len() as u64 >= self.settings.max_file_size {
            warn!(path = %path.display(), size = content.len(), "file too large, not indexed");
            remove_indexed(index, path);
            return None;
        }
        let loader = self.loader();
        if loader.is_in_libdoc_dir(path) {
            return None;
        }
        if !recognize::is_robot_file(content, path, &self.settings.robot_extensions) {
            remove_indexed(index, path);
            return None;
        }

        let previous = index.file_by_path(path).cloned();
        let key = index.add_resource(robot::parse(content), path);
        if previous.is_none() {
            loader.resolve_imports(index);
        } else {
            loader.resolve_file_imports(&key, index);
        }
        let changed = index
            .file(&key)
            .is_some_and(|file| libraries::library_set_changed(previous.as_deref(), file));
        Some((key, changed))
    }

    /// Queue an event for the reload that is staging, if there is one.
    fn record_event(&self, event: impl FnOnce() -> FileEvent) -> bool {
        match self.staged_events.lock().as_mut() {
            Some(events) => {
                events.push(event());
                true
            }
            None => false,
        }
    }

    /// Reindex a file from disk.
    pub fn reload_file(&self, path: &Path) -> Result<Option<IdentityKey>> {
        let content = self.loader().read_limited(path)?;
        Ok(self.update_file(path, &content))
    }

    /// Drop a file, or every file under a directory.
    pub fn remove_file(&self, path: &Path) {
        let mut index = self.index.write();
        index.reset(Some(path));
        self.record_event(|| FileEvent::Remove {
            path: path.to_path_buf(),
        });
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// Suggestions for `prefix` typed in the file at `path`.
    pub fn suggestions(&self, prefix: &str, path: Option<&Path>) -> Vec<Suggestion> {
        ide::completions(&self.index.read(), prefix, path, &self.options)
    }

    /// Suggestions at a cursor position in `line`.
    pub fn suggestions_at(&self, line: &str, column: usize, path: Option<&Path>) -> Vec<Suggestion> {
        self.suggestions(ide::completion_prefix(line, column), path)
    }

    pub fn status(&self, path: Option<&Path>) -> StatusReport {
        let index = self.index.read();
        let libraries = self.libraries.lock();
        status::report(&index, &libraries, path, |path| {
            Ok(recognize::is_robot(&self.fs.read_to_string(path)?))
        })
    }

    pub fn render_status(&self, path: Option<&Path>) -> String {
        self.status(path).render()
    }
}

fn remove_indexed(index: &mut SymbolIndex, path: &Path) {
    if let Some(stale) = index.file_by_path(path).map(|file| file.key.clone()) {
        index.remove_file(&stale);
    }
}
