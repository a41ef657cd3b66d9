//! Workspace management: settings, file access, library acquisition and
//! the host-facing [`Workspace`].
//!
//! Everything that touches the disk or spawns a process lives here. The
//! layers below (`syntax`, `hir`, `ide`) are pure.

mod coalesce;
mod config;
mod fs;
mod generator;
mod libraries;
mod status;
mod workspace;
mod workspace_loader;

pub use coalesce::{Admission, Coalescer};
pub use config::{FALLBACK_DIR_NAME, LIBDOC_DIR_NAME, Settings};
pub use fs::{FileStat, FileSystem, MemoryFs, RealFs};
pub use generator::{
    Acquisition, DocGenerator, Environment, EnvironmentStatus, GenerateRequest, LibraryEntry,
    LibraryStatus, ProcessGenerator, RawOutput, acquire,
};
pub use libraries::{
    INVALID_LIBDOC, LibraryManager, LoadedLibrary, install_libraries, library_names,
    library_set_changed,
};
pub use status::{FileState, LibraryReport, LibraryState, ResourceReport, ResourceState, StatusReport, report};
pub use workspace::{LoadState, ReloadOutcome, Workspace};
pub use workspace_loader::{Loaded, ScanSummary, WorkspaceLoader};
