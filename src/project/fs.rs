//! Filesystem access.
//!
//! The workspace only touches files through [`FileSystem`], so hosts can
//! serve unsaved buffers and tests can run without a disk.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::hir::FileProbe;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FileStat {
    pub is_file: bool,
    pub is_dir: bool,
    pub size: u64,
}

pub trait FileSystem: Send + Sync {
    fn read_file(&self, path: &Path) -> Result<Vec<u8>>;

    /// Entry names (not paths) of a directory, in any order.
    fn list_directory(&self, path: &Path) -> Result<Vec<String>>;

    fn stat(&self, path: &Path) -> Result<FileStat>;

    /// Read a file as text, replacing invalid UTF-8.
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let bytes = self.read_file(path)?;
        Ok(match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
        })
    }
}

impl<T: FileSystem + ?Sized> FileSystem for Arc<T> {
    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        (**self).read_file(path)
    }

    fn list_directory(&self, path: &Path) -> Result<Vec<String>> {
        (**self).list_directory(path)
    }

    fn stat(&self, path: &Path) -> Result<FileStat> {
        (**self).stat(path)
    }
}

impl<T: FileSystem + ?Sized> FileProbe for T {
    fn is_file(&self, path: &Path) -> bool {
        self.stat(path).is_ok_and(|stat| stat.is_file)
    }
}

/// The real filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct RealFs;

impl FileSystem for RealFs {
    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path).map_err(|err| Error::io(path, err))
    }

    fn list_directory(&self, path: &Path) -> Result<Vec<String>> {
        std::fs::read_dir(path)
            .map_err(|err| Error::io(path, err))?
            .map(|entry| {
                entry
                    .map(|entry| entry.file_name().to_string_lossy().into_owned())
                    .map_err(|err| Error::io(path, err))
            })
            .collect()
    }

    fn stat(&self, path: &Path) -> Result<FileStat> {
        let meta = std::fs::metadata(path).map_err(|err| Error::io(path, err))?;
        Ok(FileStat {
            is_file: meta.is_file(),
            is_dir: meta.is_dir(),
            size: meta.len(),
        })
    }
}

/// An in-memory filesystem. Directories exist implicitly above every file.
#[derive(Debug, Default)]
pub struct MemoryFs {
    files: RwLock<BTreeMap<PathBuf, Vec<u8>>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) {
        self.files.write().insert(path.into(), content.into());
    }

    pub fn remove(&self, path: &Path) -> bool {
        self.files.write().remove(path).is_some()
    }

    pub fn with_file(self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(path, content);
        self
    }
}

fn not_found(path: &Path) -> Error {
    Error::io(path, io::Error::from(io::ErrorKind::NotFound))
}

impl FileSystem for MemoryFs {
    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        self.files
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| not_found(path))
    }

    fn list_directory(&self, path: &Path) -> Result<Vec<String>> {
        let files = self.files.read();
        let mut names: Vec<String> = files
            .keys()
            .filter_map(|file| file.strip_prefix(path).ok())
            .filter_map(|rest| rest.components().next())
            .map(|first| first.as_os_str().to_string_lossy().into_owned())
            .collect();
        if names.is_empty() {
            return Err(not_found(path));
        }
        names.dedup();
        Ok(names)
    }

    fn stat(&self, path: &Path) -> Result<FileStat> {
        let files = self.files.read();
        if let Some(content) = files.get(path) {
            return Ok(FileStat {
                is_file: true,
                is_dir: false,
                size: content.len() as u64,
            });
        }
        if files.keys().any(|file| file != path && file.starts_with(path)) {
            return Ok(FileStat {
                is_file: false,
                is_dir: true,
                size: 0,
            });
        }
        Err(not_found(path))
    }
}
