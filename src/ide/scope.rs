//! Scope detection for completion prefixes.
//!
//! A prefix selects which files are searched:
//!
//! ```text
//! log mes          default        current file, its imports, base library
//! .log             global         every indexed file
//! this.log         internal       current file only
//! BuiltIn.log      qualified      files displayed as `BuiltIn`
//! foo.bar          unknown        same as default, whole prefix is the query
//! a<TAB>b          invalid        nothing
//! ```

use rustc_hash::FxHashSet;
use tracing::trace;

use crate::base::{IdentityKey, normalize_identity};
use crate::hir::{SourceFile, SymbolIndex};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    Default,
    Global,
    Internal,
    FileQualified,
    Invalid,
    Unknown,
}

impl ScopeKind {
    /// True when the prefix carries a qualifier before the keyword part.
    pub fn is_qualified(self) -> bool {
        matches!(self, Self::Global | Self::Internal | Self::FileQualified)
    }
}

/// Files a query may draw keywords from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CandidateFiles {
    All,
    Only(FxHashSet<IdentityKey>),
}

impl CandidateFiles {
    pub fn contains(&self, key: &IdentityKey) -> bool {
        match self {
            Self::All => true,
            Self::Only(keys) => keys.contains(key),
        }
    }
}

/// Outcome of [`detect_scope`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScopeResolution<'p> {
    pub kind: ScopeKind,
    /// The keyword part of the prefix, original case.
    pub query: &'p str,
    /// Byte offset of `query` within the raw prefix.
    pub query_start: usize,
    /// The qualifier as typed, without the dot.
    pub qualifier: Option<&'p str>,
    pub files: CandidateFiles,
}

/// Inputs of scope detection besides the prefix.
#[derive(Clone, Copy, Debug)]
pub struct ScopeContext<'a> {
    pub index: &'a SymbolIndex,
    /// The file being edited, if indexed.
    pub current: Option<&'a SourceFile>,
    pub internal_modifier: &'a str,
    pub base_library: &'a str,
}

/// Classify a raw prefix and compute its candidate files.
pub fn detect_scope<'p>(prefix: &'p str, cx: &ScopeContext<'_>) -> ScopeResolution<'p> {
    let leading = prefix.len() - prefix.trim_start().len();
    let trimmed = prefix.trim();
    let resolution = |kind, query: &'p str, qualifier, files| ScopeResolution {
        kind,
        query,
        query_start: offset_in(prefix, query).unwrap_or(leading),
        qualifier,
        files,
    };

    let result = if has_separator(trimmed) {
        resolution(
            ScopeKind::Invalid,
            trimmed,
            None,
            CandidateFiles::Only(FxHashSet::default()),
        )
    } else if !trimmed.contains('.') {
        resolution(ScopeKind::Default, trimmed, None, default_files(cx))
    } else if let Some(rest) = trimmed.strip_prefix('.') {
        resolution(ScopeKind::Global, rest, Some(""), CandidateFiles::All)
    } else if let Some(rest) = strip_qualifier(trimmed, cx.internal_modifier) {
        let files: FxHashSet<IdentityKey> = cx
            .current
            .map(|file| std::iter::once(file.key.clone()).collect())
            .unwrap_or_default();
        resolution(
            ScopeKind::Internal,
            rest,
            Some(&trimmed[..trimmed.len() - rest.len() - 1]),
            CandidateFiles::Only(files),
        )
    } else if let Some((qualifier, rest, files)) = file_qualifier(trimmed, cx) {
        resolution(
            ScopeKind::FileQualified,
            rest,
            Some(qualifier),
            CandidateFiles::Only(files),
        )
    } else {
        resolution(ScopeKind::Unknown, trimmed, None, default_files(cx))
    };

    trace!(prefix, kind = ?result.kind, query = result.query, "detected scope");
    result
}

/// A tab or a run of two spaces splits cells, so it cannot be inside one.
fn has_separator(text: &str) -> bool {
    text.contains('\t') || text.contains("  ")
}

fn offset_in(outer: &str, inner: &str) -> Option<usize> {
    let start = (inner.as_ptr() as usize).checked_sub(outer.as_ptr() as usize)?;
    (start <= outer.len()).then_some(start)
}

/// Strip `qualifier.` from the front of `text`, ignoring case.
fn strip_qualifier<'t>(text: &'t str, qualifier: &str) -> Option<&'t str> {
    if qualifier.is_empty() {
        return None;
    }
    strip_prefix_ignore_case(text, qualifier)?.strip_prefix('.')
}

pub(crate) fn strip_prefix_ignore_case<'t>(text: &'t str, prefix: &str) -> Option<&'t str> {
    let mut chars = text.char_indices();
    for expected in prefix.chars() {
        let (_, actual) = chars.next()?;
        if !actual.to_lowercase().eq(expected.to_lowercase()) {
            return None;
        }
    }
    let rest = chars.next().map_or(text.len(), |(i, _)| i);
    Some(&text[rest..])
}

/// Longest display name or library alias that qualifies `text`.
fn file_qualifier<'t>(
    text: &'t str,
    cx: &ScopeContext<'_>,
) -> Option<(&'t str, &'t str, FxHashSet<IdentityKey>)> {
    let mut best: Option<(usize, &'t str, FxHashSet<IdentityKey>)> = None;
    let mut consider = |name: &str, target: &str| {
        let Some(rest) = strip_qualifier(text, name) else {
            return;
        };
        let qualifier_len = text.len() - rest.len() - 1;
        if best.as_ref().is_some_and(|(len, _, _)| *len > qualifier_len) {
            return;
        }
        let files: FxHashSet<IdentityKey> = cx
            .index
            .files()
            .filter(|file| file.display_name.eq_ignore_ascii_case(target))
            .map(|file| file.key.clone())
            .collect();
        if files.is_empty() {
            return;
        }
        let same_len = best.as_ref().is_some_and(|(len, _, _)| *len == qualifier_len);
        if !same_len {
            best = Some((qualifier_len, rest, files));
        } else if let Some((_, _, existing)) = best.as_mut() {
            existing.extend(files);
        }
    };

    for file in cx.index.files() {
        consider(file.display_name.as_str(), file.display_name.as_str());
    }
    if let Some(current) = cx.current {
        for import in &current.libraries {
            if let Some(alias) = &import.alias {
                consider(alias.as_str(), import.name.as_str());
            }
        }
    }

    best.map(|(len, rest, files)| (&text[..len], rest, files))
}

/// Current file, its imports and the base library.
pub fn default_files(cx: &ScopeContext<'_>) -> CandidateFiles {
    let mut keys = FxHashSet::default();
    let base = normalize_identity(cx.base_library);
    if cx.index.contains(&base) {
        keys.insert(base);
    }

    let Some(current) = cx.current else {
        return CandidateFiles::Only(keys);
    };
    keys.insert(current.key.clone());

    for import in &current.libraries {
        keys.extend(
            cx.index
                .files()
                .filter(|file| file.display_name.eq_ignore_ascii_case(&import.name))
                .map(|file| file.key.clone()),
        );
    }
    for import in &current.resources {
        match import.resolved.as_ref().filter(|key| cx.index.contains(key)) {
            Some(key) => {
                keys.insert(key.clone());
            }
            None => keys.extend(
                cx.index
                    .files()
                    .filter(|file| import.matches(file))
                    .map(|file| file.key.clone()),
            ),
        }
    }
    CandidateFiles::Only(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{libdoc, robot};
    use std::path::Path;

    fn index() -> SymbolIndex {
        let mut index = SymbolIndex::new();
        index.add_resource(
            robot::parse(
                "*** Settings ***\nLibrary    Collections    WITH NAME    Col\nResource    common.robot\n*** Test Cases ***\nT\n    Foo\n",
            ),
            Path::new("/p/suite.robot"),
        );
        index.add_resource(robot::parse("*** Keywords ***\nFoo\n"), Path::new("/p/common.robot"));
        index.add_resource(robot::parse("*** Keywords ***\nBar\n"), Path::new("/p/other.robot"));
        for name in ["BuiltIn", "Collections", "OperatingSystem"] {
            let xml = format!(r#"<keywordspec name="{name}"><kw name="{name} Keyword"/></keywordspec>"#);
            index.add_library(libdoc::parse(&xml).unwrap(), name, None, None);
        }
        index
    }

    fn scope<'p>(prefix: &'p str, index: &SymbolIndex) -> ScopeResolution<'p> {
        let current = index.file_by_path(Path::new("/p/suite.robot")).map(|f| f.as_ref());
        let cx = ScopeContext {
            index,
            current,
            internal_modifier: "this",
            base_library: "BuiltIn",
        };
        detect_scope(prefix, &cx)
    }

    fn keys(files: &CandidateFiles) -> Vec<String> {
        let CandidateFiles::Only(keys) = files else {
            panic!("expected a restricted set");
        };
        let mut keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        keys.sort();
        keys
    }

    #[test]
    fn test_default_scope() {
        let index = index();
        let result = scope("  fo", &index);

        assert_eq!(result.kind, ScopeKind::Default);
        assert_eq!(result.query, "fo");
        assert_eq!(result.query_start, 2);
        assert_eq!(
            keys(&result.files),
            vec!["/p/common.robot", "/p/suite.robot", "builtin", "collections"]
        );
    }

    #[test]
    fn test_global_scope() {
        let index = index();
        let result = scope(".bar", &index);
        assert_eq!(result.kind, ScopeKind::Global);
        assert_eq!(result.query, "bar");
        assert_eq!(result.query_start, 1);
        assert_eq!(result.files, CandidateFiles::All);
    }

    #[test]
    fn test_internal_scope() {
        let index = index();
        let result = scope("THIS.fo", &index);
        assert_eq!(result.kind, ScopeKind::Internal);
        assert_eq!(result.query, "fo");
        assert_eq!(result.qualifier, Some("THIS"));
        assert_eq!(keys(&result.files), vec!["/p/suite.robot"]);
    }

    #[test]
    fn test_file_qualified_scope() {
        let index = index();
        let result = scope("operatingsystem.cre", &index);
        assert_eq!(result.kind, ScopeKind::FileQualified);
        assert_eq!(result.query, "cre");
        assert_eq!(result.query_start, 16);
        assert_eq!(result.qualifier, Some("operatingsystem"));
        assert_eq!(keys(&result.files), vec!["operatingsystem"]);
    }

    #[test]
    fn test_alias_qualifies_library() {
        let index = index();
        let result = scope("col.app", &index);
        assert_eq!(result.kind, ScopeKind::FileQualified);
        assert_eq!(keys(&result.files), vec!["collections"]);
    }

    #[test]
    fn test_unknown_scope_falls_back_to_default() {
        let index = index();
        let result = scope("nosuch.thing", &index);
        assert_eq!(result.kind, ScopeKind::Unknown);
        assert_eq!(result.query, "nosuch.thing");
        assert_eq!(result.files, scope("x", &index).files);
    }

    #[test]
    fn test_embedded_separator_is_invalid() {
        let index = index();
        assert_eq!(scope("log\tmsg", &index).kind, ScopeKind::Invalid);
        assert_eq!(scope("BuiltIn.log  x", &index).kind, ScopeKind::Invalid);
        assert_eq!(scope("log message", &index).kind, ScopeKind::Default);
    }

    #[test]
    fn test_strip_prefix_ignore_case() {
        assert_eq!(strip_prefix_ignore_case("BuiltIn.Log", "builtin"), Some(".Log"));
        assert_eq!(strip_prefix_ignore_case("Built", "builtin"), None);
        assert_eq!(strip_prefix_ignore_case("ÄBC", "äb"), Some("C"));
    }
}
