//! Parser output shared by the robot and libdoc parsers.

use std::fmt;

use serde::Serialize;

use crate::base::LineCol;

/// One declared argument of a keyword.
///
/// Robot sources declare `${name}` or `${name}=default`; libdoc documents
/// carry a textual representation such as `level=INFO` or `*args`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ArgumentSpec {
    pub name: String,
    pub default: Option<String>,
}

impl ArgumentSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    pub fn with_default(name: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: Some(default.into()),
        }
    }

    /// Split a libdoc representation at its first `=`.
    pub fn from_repr(repr: &str) -> Self {
        match repr.split_once('=') {
            Some((name, default)) => Self::with_default(name.trim(), default.trim()),
            None => Self::new(repr.trim()),
        }
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

impl fmt::Display for ArgumentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.default {
            Some(default) => write!(f, "{}={}", self.name, default),
            None => f.write_str(&self.name),
        }
    }
}

/// A `Library` declaration from a settings table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LibraryImport {
    pub name: String,
    pub alias: Option<String>,
}

/// A keyword or test case as it appears in one source file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedEntry {
    pub name: String,
    pub documentation: String,
    /// Always empty for test cases.
    pub arguments: Vec<ArgumentSpec>,
    pub position: Option<LineCol>,
}

/// Everything extracted from a single source file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedFile {
    pub keywords: Vec<ParsedEntry>,
    pub test_cases: Vec<ParsedEntry>,
    pub libraries: Vec<LibraryImport>,
    /// Declared `Resource` paths, verbatim.
    pub resources: Vec<String>,
}

impl ParsedFile {
    pub fn has_test_cases(&self) -> bool {
        !self.test_cases.is_empty()
    }

    pub fn has_keywords(&self) -> bool {
        !self.keywords.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_display() {
        assert_eq!(ArgumentSpec::new("msg").to_string(), "msg");
        assert_eq!(
            ArgumentSpec::with_default("level", "INFO").to_string(),
            "level=INFO"
        );
    }

    #[test]
    fn test_argument_from_repr() {
        let arg = ArgumentSpec::from_repr("level = INFO");
        assert_eq!(arg.name, "level");
        assert_eq!(arg.default.as_deref(), Some("INFO"));
        assert_eq!(ArgumentSpec::from_repr("*args"), ArgumentSpec::new("*args"));
    }
}
