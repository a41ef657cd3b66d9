//! Indexed records: files and the keywords they define.

use std::path::{Path, PathBuf};

use smol_str::SmolStr;

use super::ids::KeywordId;
use crate::base::{IdentityKey, LineCol};
use crate::syntax::{ArgumentSpec, LibraryImport, ParsedEntry, ParsedFile};

/// A callable keyword defined in some file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Keyword {
    pub id: KeywordId,
    pub name: String,
    pub documentation: String,
    pub arguments: Vec<ArgumentSpec>,
    pub position: Option<LineCol>,
    /// Only visible from the defining file (it also declares test cases).
    pub local: bool,
}

impl Keyword {
    /// The identity key of the owning file.
    #[inline]
    pub fn file(&self) -> &IdentityKey {
        &self.id.file
    }

    /// Case-insensitive lookup key.
    pub fn key(&self) -> SmolStr {
        keyword_key(&self.name)
    }

    /// Argument names without default values.
    pub fn argument_names(&self) -> Vec<&str> {
        self.arguments.iter().map(|arg| arg.name.as_str()).collect()
    }

    /// Arguments rendered as `a, b=1`.
    pub fn arguments_text(&self) -> String {
        self.arguments
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// First documentation line, terminated with a period.
    pub fn summary(&self) -> String {
        let first = self.documentation.lines().next().unwrap_or("").trim();
        if first.is_empty() || first.ends_with('.') {
            first.to_string()
        } else {
            format!("{first}.")
        }
    }
}

/// Lowercased keyword name used as the key of the name map.
pub fn keyword_key(name: &str) -> SmolStr {
    SmolStr::new(name.to_lowercase())
}

/// A `Resource` import of a file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceImport {
    /// The path as written in the settings table.
    pub declared_path: String,
    /// File stem of the declared path.
    pub name: String,
    /// Extension of the declared path, with leading dot.
    pub extension: String,
    /// Set once the target is known to be indexed.
    pub resolved: Option<IdentityKey>,
}

impl ResourceImport {
    pub fn new(declared_path: impl Into<String>) -> Self {
        let declared_path = declared_path.into();
        let path = Path::new(&declared_path);
        Self {
            name: file_stem(path),
            extension: extension_with_dot(path),
            resolved: None,
            declared_path,
        }
    }

    /// True if `file` has this import's name and extension.
    pub fn matches(&self, file: &SourceFile) -> bool {
        file.display_name.eq_ignore_ascii_case(&self.name)
            && file.extension.eq_ignore_ascii_case(&self.extension)
    }
}

/// One indexed source unit: a robot file or a library's documentation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceFile {
    pub key: IdentityKey,
    pub display_name: String,
    /// Extension with leading dot, empty if none.
    pub extension: String,
    /// Robot file path, or the libdoc file of a library.
    pub file_path: Option<PathBuf>,
    /// Where a library's documentation was generated from.
    pub documentation_source_path: Option<PathBuf>,
    pub has_test_cases: bool,
    pub has_keywords: bool,
    pub is_library: bool,
    pub libraries: Vec<LibraryImport>,
    pub resources: Vec<ResourceImport>,
    pub keywords: Vec<Keyword>,
    pub test_cases: Vec<ParsedEntry>,
}

impl SourceFile {
    /// Build a complete record from a parse result.
    ///
    /// Every keyword gets `local = has_test_cases`.
    pub fn from_parsed(
        key: IdentityKey,
        display_name: impl Into<String>,
        file_path: Option<PathBuf>,
        parsed: ParsedFile,
    ) -> Self {
        let has_test_cases = parsed.has_test_cases();
        let has_keywords = parsed.has_keywords();
        let extension = file_path
            .as_deref()
            .map(extension_with_dot)
            .unwrap_or_default();
        let keywords = parsed
            .keywords
            .into_iter()
            .enumerate()
            .map(|(i, entry)| Keyword {
                id: KeywordId::new(key.clone(), i),
                name: entry.name,
                documentation: entry.documentation,
                arguments: entry.arguments,
                position: entry.position,
                local: has_test_cases,
            })
            .collect();

        Self {
            key,
            display_name: display_name.into(),
            extension,
            file_path,
            documentation_source_path: None,
            has_test_cases,
            has_keywords,
            is_library: false,
            libraries: parsed.libraries,
            resources: parsed.resources.into_iter().map(ResourceImport::new).collect(),
            keywords,
            test_cases: parsed.test_cases,
        }
    }

    /// Mark the record as library documentation.
    pub fn into_library(mut self, source_path: Option<PathBuf>) -> Self {
        self.is_library = true;
        self.documentation_source_path = source_path;
        self
    }

    pub fn keyword(&self, ordinal: usize) -> Option<&Keyword> {
        self.keywords.get(ordinal)
    }

    /// Directory used to resolve relative resource imports.
    pub fn base_dir(&self) -> Option<&Path> {
        self.file_path.as_deref().and_then(Path::parent)
    }

    /// Names of imported libraries, in declaration order.
    pub fn library_names(&self) -> impl Iterator<Item = &str> {
        self.libraries.iter().map(|lib| lib.name.as_str())
    }
}

pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub(crate) fn extension_with_dot(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::normalize_identity;
    use crate::syntax::robot;

    fn record(text: &str) -> SourceFile {
        let path = PathBuf::from("/proj/Suite.robot");
        SourceFile::from_parsed(
            normalize_identity(path.to_string_lossy()),
            "Suite",
            Some(path),
            robot::parse(text),
        )
    }

    #[test]
    fn test_keywords_point_back_to_their_file() {
        let file = record("*** Keywords ***\nA\nB\n");
        assert_eq!(file.keywords.len(), 2);
        for (i, kw) in file.keywords.iter().enumerate() {
            assert_eq!(kw.file(), &file.key);
            assert_eq!(kw.id.ordinal, i);
        }
        assert_eq!(file.extension, ".robot");
    }

    #[test]
    fn test_locality_follows_test_cases() {
        let file = record("*** Test Cases ***\nT\n    Helper\n*** Keywords ***\nHelper\n");
        assert!(file.has_test_cases);
        assert!(file.keywords.iter().all(|kw| kw.local));
        assert_eq!(file.test_cases.len(), 1);

        let resource = record("*** Keywords ***\nHelper\n");
        assert!(resource.keywords.iter().all(|kw| !kw.local));
    }

    #[test]
    fn test_summary_and_arguments_text() {
        let file = record(
            "*** Keywords ***\nK\n    [Documentation]    Does things\n    [Arguments]    ${a}    ${b}=1\n",
        );
        let kw = &file.keywords[0];
        assert_eq!(kw.summary(), "Does things.");
        assert_eq!(kw.arguments_text(), "a, b=1");
        assert_eq!(kw.argument_names(), vec!["a", "b"]);
        assert_eq!(kw.key().as_str(), "k");
    }

    #[test]
    fn test_resource_import_shape() {
        let import = ResourceImport::new("../common/Keywords.resource");
        assert_eq!(import.name, "Keywords");
        assert_eq!(import.extension, ".resource");
        assert!(import.resolved.is_none());
    }
}
