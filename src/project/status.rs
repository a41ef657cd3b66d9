//! Per-file status reports.
//!
//! A report tells why a file does or does not get suggestions: whether it
//! is indexed, how each imported library was loaded, where each imported
//! resource was found, and what the documentation generator reported about
//! its environment.

use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::generator::{Environment, EnvironmentStatus};
use super::libraries::LibraryManager;
use crate::hir::SymbolIndex;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FileState {
    Parsed,
    NotIndexed,
    NotRobot,
    NoPath,
    Unreadable,
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Parsed => "Parsed/Ok",
            Self::NotIndexed => "Resource is not indexed. Make sure it is part of an open project.",
            Self::NotRobot => "Resource is not a valid robot file.",
            Self::NoPath => "Current file path could not be determined",
            Self::Unreadable => "Error occurred while gathering status",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LibraryState {
    Loaded,
    Fallback,
    Failed,
    Unknown,
}

impl fmt::Display for LibraryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Loaded => "Loaded",
            Self::Fallback => "Loading library failed. Fell back on bundled documentation",
            Self::Failed => "Errors occurred during loading",
            Self::Unknown => "Unknown error occurred while loading library",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceState {
    Loaded,
    NotFound,
    Multiple,
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Loaded => "Loaded",
            Self::NotFound => "Resource could not be found",
            Self::Multiple => "Multiple resources detected",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryReport {
    pub name: String,
    pub state: LibraryState,
    pub error: Option<String>,
    pub path: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceReport {
    pub name: String,
    pub state: ResourceState,
    /// Every candidate path; more than one only for [`ResourceState::Multiple`].
    pub paths: Vec<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub state: FileState,
    pub error: Option<String>,
    pub name: Option<String>,
    pub path: Option<PathBuf>,
    pub libraries: Vec<LibraryReport>,
    pub resources: Vec<ResourceReport>,
    pub environment: Environment,
}

/// Build the report for `path`.
///
/// `is_robot` is consulted only for files that are not indexed; it reads
/// the file and reports whether it looks like robot source.
pub fn report(
    index: &SymbolIndex,
    libraries: &LibraryManager,
    path: Option<&Path>,
    is_robot: impl FnOnce(&Path) -> crate::error::Result<bool>,
) -> StatusReport {
    let mut report = StatusReport {
        state: FileState::NoPath,
        error: None,
        name: None,
        path: path.map(Path::to_path_buf),
        libraries: Vec::new(),
        resources: Vec::new(),
        environment: libraries.environment().clone(),
    };
    let Some(path) = path else {
        return report;
    };
    let Some(file) = index.file_by_path(path) else {
        report.state = match is_robot(path) {
            Ok(true) => FileState::NotIndexed,
            Ok(false) => FileState::NotRobot,
            Err(err) => {
                report.error = Some(err.to_string());
                FileState::Unreadable
            }
        };
        return report;
    };

    report.state = FileState::Parsed;
    report.name = Some(file.display_name.clone());
    for import in &file.libraries {
        let entry = libraries.library(&import.name);
        report.libraries.push(LibraryReport {
            name: import.name.clone(),
            state: match entry {
                Some(entry) if entry.is_fallback => LibraryState::Fallback,
                Some(entry) if entry.is_success() => LibraryState::Loaded,
                Some(_) => LibraryState::Failed,
                None => LibraryState::Unknown,
            },
            error: entry.and_then(|entry| entry.message.clone()),
            path: entry.and_then(|entry| entry.documentation_path.clone()),
        });
    }
    for import in &file.resources {
        let candidates: Vec<PathBuf> = match import.resolved.as_ref().and_then(|key| index.file(key)) {
            Some(target) => target.file_path.iter().cloned().collect(),
            None => index
                .files()
                .filter(|candidate| import.matches(candidate))
                .filter_map(|candidate| candidate.file_path.clone())
                .collect(),
        };
        report.resources.push(ResourceReport {
            name: import.name.clone(),
            state: match candidates.len() {
                0 => ResourceState::NotFound,
                1 => ResourceState::Loaded,
                _ => ResourceState::Multiple,
            },
            paths: candidates,
        });
    }
    report
}

const INDENT: &str = "    ";

fn push_line(out: &mut String, depth: usize, text: &str) {
    for line in text.lines() {
        for _ in 0..depth {
            out.push_str(INDENT);
        }
        out.push_str(line.trim());
        out.push('\n');
    }
}

fn display_path(path: Option<&Path>) -> String {
    path.map_or_else(|| "n/a".to_string(), |path| path.display().to_string())
}

impl StatusReport {
    /// Plain-text rendering with indented sections.
    pub fn render(&self) -> String {
        let mut out = String::new();
        push_line(&mut out, 0, &format!("Status: {}", self.state));
        if let Some(error) = &self.error {
            push_line(&mut out, 0, "Error:");
            push_line(&mut out, 1, error);
        }
        push_line(&mut out, 0, &format!("Name: {}", self.name.as_deref().unwrap_or("n/a")));
        push_line(&mut out, 0, &format!("Path: {}", display_path(self.path.as_deref())));

        push_line(&mut out, 0, "Libraries");
        if self.libraries.is_empty() {
            push_line(&mut out, 1, "No libraries imported");
        }
        for library in &self.libraries {
            push_line(&mut out, 1, &library.name);
            push_line(&mut out, 2, &format!("Status: {}", library.state));
            if let Some(error) = &library.error {
                push_line(&mut out, 2, "Error:");
                push_line(&mut out, 3, error);
            }
            push_line(&mut out, 2, &format!("Path: {}", display_path(library.path.as_deref())));
        }

        push_line(&mut out, 0, "Resources");
        if self.resources.is_empty() {
            push_line(&mut out, 1, "No resources imported");
        }
        for resource in &self.resources {
            push_line(&mut out, 1, &resource.name);
            push_line(&mut out, 2, &format!("Status: {}", resource.state));
            if resource.state == ResourceState::Multiple {
                push_line(&mut out, 2, "Paths:");
                for path in &resource.paths {
                    push_line(&mut out, 3, &path.display().to_string());
                }
            } else {
                push_line(&mut out, 2, &format!("Path: {}", display_path(resource.paths.first().map(PathBuf::as_path))));
            }
        }

        let env = &self.environment;
        push_line(&mut out, 0, "Environment");
        let status = match env.status {
            EnvironmentStatus::Success => "Ok",
            EnvironmentStatus::Error => "Error",
        };
        let _ = writeln!(out, "{INDENT}Status: {status}");
        if !env.message.is_empty() {
            push_line(&mut out, 1, "Error:");
            push_line(&mut out, 2, &env.message);
        }
        let _ = writeln!(out, "{INDENT}Executable: {}", env.executable);
        let _ = writeln!(out, "{INDENT}Version: {}", env.interpreter_version);
        let _ = writeln!(out, "{INDENT}Platform: {}", env.platform);
        for (name, value) in env.variables() {
            let _ = writeln!(out, "{INDENT}{name}: {value}");
        }
        push_line(&mut out, 1, "Module search path:");
        for entry in &env.module_search_path {
            push_line(&mut out, 2, entry);
        }
        out
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::generator::{LibraryEntry, LibraryStatus};
    use crate::syntax::{libdoc, robot};
    use indexmap::IndexSet;

    fn setup() -> (SymbolIndex, LibraryManager) {
        let mut index = SymbolIndex::new();
        index.add_resource(
            robot::parse(
                "*** Settings ***\nLibrary    BuiltIn\nLibrary    Collections\nLibrary    Custom\nLibrary    Never\n\
                 Resource    common.robot\nResource    dup.robot\nResource    nowhere.robot\n\
                 *** Test Cases ***\nT\n    Log    x\n",
            ),
            Path::new("/p/suite.robot"),
        );
        index.add_resource(robot::parse("*** Keywords ***\nA\n"), Path::new("/p/common.robot"));
        index.add_resource(robot::parse("*** Keywords ***\nB\n"), Path::new("/p/x/dup.robot"));
        index.add_resource(robot::parse("*** Keywords ***\nC\n"), Path::new("/p/y/dup.robot"));
        index.add_library(
            libdoc::parse(r#"<keywordspec name="BuiltIn"><kw name="Log"/></keywordspec>"#).unwrap(),
            "BuiltIn",
            Some(Path::new("/cache/BuiltIn.xml")),
            None,
        );

        let mut manager = LibraryManager::new();
        manager.add_fallback_libraries(["/fallback/Collections.xml"]);
        manager.append_libraries(vec![
            LibraryEntry {
                name: "BuiltIn".into(),
                status: LibraryStatus::Success,
                documentation_path: Some("/cache/BuiltIn.xml".into()),
                ..LibraryEntry::default()
            },
            LibraryEntry::error("Collections", "no robot"),
            LibraryEntry::error("Custom", "Could not import 'Custom'"),
        ]);
        let names: IndexSet<String> = ["BuiltIn", "Collections", "Custom"].map(String::from).into_iter().collect();
        manager.apply_fallbacks(&names);
        (index, manager)
    }

    #[test]
    fn test_report_for_indexed_file() {
        let (index, manager) = setup();
        let report = report(&index, &manager, Some(Path::new("/p/suite.robot")), |_| Ok(true));

        assert_eq!(report.state, FileState::Parsed);
        assert_eq!(report.name.as_deref(), Some("suite"));
        let states: Vec<LibraryState> = report.libraries.iter().map(|lib| lib.state).collect();
        assert_eq!(
            states,
            vec![LibraryState::Loaded, LibraryState::Fallback, LibraryState::Failed, LibraryState::Unknown]
        );
        assert_eq!(report.libraries[1].error.as_deref(), Some("no robot"));
        assert_eq!(report.libraries[1].path.as_deref(), Some(Path::new("/fallback/Collections.xml")));

        let states: Vec<ResourceState> = report.resources.iter().map(|res| res.state).collect();
        assert_eq!(states, vec![ResourceState::Loaded, ResourceState::Multiple, ResourceState::NotFound]);
        assert_eq!(report.resources[1].paths.len(), 2);
    }

    #[test]
    fn test_report_for_unindexed_files() {
        let (index, manager) = setup();
        let path = Some(Path::new("/elsewhere/a.robot"));
        assert_eq!(report(&index, &manager, path, |_| Ok(true)).state, FileState::NotIndexed);
        assert_eq!(report(&index, &manager, path, |_| Ok(false)).state, FileState::NotRobot);
        assert_eq!(report(&index, &manager, None, |_| Ok(true)).state, FileState::NoPath);

        let failed = report(&index, &manager, path, |p| {
            Err(crate::error::Error::io(p, std::io::Error::from(std::io::ErrorKind::PermissionDenied)))
        });
        assert_eq!(failed.state, FileState::Unreadable);
        assert!(failed.error.is_some());
    }

    #[test]
    fn test_render() {
        let (index, manager) = setup();
        let text = report(&index, &manager, Some(Path::new("/p/suite.robot")), |_| Ok(true)).render();

        assert!(text.starts_with("Status: Parsed/Ok\nName: suite\nPath: /p/suite.robot\nLibraries\n"));
        assert!(text.contains("    BuiltIn\n        Status: Loaded\n        Path: /cache/BuiltIn.xml\n"));
        assert!(text.contains("        Error:\n            Could not import 'Custom'\n"));
        assert!(text.contains("    dup\n        Status: Multiple resources detected\n        Paths:\n            /p/x/dup.robot\n"));
        assert!(text.contains("    nowhere\n        Status: Resource could not be found\n        Path: n/a\n"));
        assert!(text.contains("Environment\n    Status: Error\n"));
    }

    #[test]
    fn test_render_empty_imports() {
        let index = SymbolIndex::new();
        let manager = LibraryManager::new();
        let text = report(&index, &manager, None, |_| Ok(true)).render();
        assert!(text.contains("Libraries\n    No libraries imported\nResources\n    No resources imported\n"));
    }
}
