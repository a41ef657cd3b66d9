//! Keyword completion.
//!
//! A query runs in four steps:
//! 1. Detect the scope of the prefix and collect candidate files
//! 2. Score every visible keyword of those files against the keyword part
//! 3. Sort by score, then current file first, then name; truncate to the cap
//! 4. Render payloads, qualifying names that are ambiguous in the scope
//!
//! Queries never fail. Anything unexpected yields fewer suggestions.

use std::path::Path;

use rustc_hash::FxHashMap;
use serde::Serialize;
use smol_str::SmolStr;

use super::fuzzy;
use super::scope::{CandidateFiles, ScopeContext, ScopeKind, ScopeResolution, detect_scope};
use crate::base::IdentityKey;
use crate::hir::{Keyword, KeywordId, SourceFile, SymbolIndex};

/// Query-time options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionOptions {
    /// Cap on keyword suggestions per query.
    pub max_suggestions: usize,
    pub show_library_suggestions: bool,
    /// Append `- a, b` to the display text.
    pub show_arguments: bool,
    /// Insert argument placeholders after the name.
    pub suggest_arguments: bool,
    pub include_default_arguments: bool,
    pub argument_separator: String,
    /// Replace a `Owner.kw` prefix with the bare name when unambiguous.
    pub remove_dot_notation: bool,
    pub internal_scope_modifier: String,
    pub base_library: String,
    /// Judge ambiguity across the whole index instead of the query scope.
    pub global_ambiguity: bool,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            max_suggestions: 100,
            show_library_suggestions: true,
            show_arguments: false,
            suggest_arguments: true,
            include_default_arguments: false,
            argument_separator: "    ".to_string(),
            remove_dot_notation: true,
            internal_scope_modifier: "this".to_string(),
            base_library: "BuiltIn".to_string(),
            global_ambiguity: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SuggestionKind {
    Keyword,
    Import,
}

/// Byte range of the completion prefix that a suggestion replaces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ReplacementSpan {
    pub start: usize,
    pub end: usize,
}

impl ReplacementSpan {
    fn shifted(self, by: usize) -> Self {
        Self {
            start: self.start + by,
            end: self.end + by,
        }
    }
}

/// One completion item.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    /// Text to insert, possibly with `${n:arg}` placeholders.
    pub insertion_text: String,
    pub display_text: String,
    pub kind: SuggestionKind,
    pub left_label: String,
    pub right_label: String,
    pub documentation_summary: String,
    pub replacement: ReplacementSpan,
    #[serde(skip)]
    pub keyword: Option<KeywordId>,
}

/// The prefix under the cursor: the text after the last cell separator.
///
/// `column` is a byte offset into `line`, clamped to the line.
pub fn completion_prefix(line: &str, column: usize) -> &str {
    let mut end = column.min(line.len());
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    let before = &line[..end];
    let bytes = before.as_bytes();
    let start = (0..bytes.len())
        .rev()
        .find(|&i| bytes[i] == b'\t' || (bytes[i] == b' ' && i > 0 && bytes[i - 1] == b' '))
        .map_or(0, |i| i + 1);
    &before[start..]
}

const BDD_PREFIXES: [&str; 5] = ["given", "when", "then", "and", "but"];

/// The prefix itself, plus the prefix without a leading BDD word.
///
/// Each variant comes with its byte offset into `prefix`.
pub fn bdd_variants(prefix: &str) -> Vec<(usize, &str)> {
    let mut variants = vec![(0, prefix)];
    for word in BDD_PREFIXES {
        let Some(head) = prefix.get(..word.len() + 1) else {
            continue;
        };
        if head.ends_with(' ') && head[..word.len()].eq_ignore_ascii_case(word) {
            variants.push((head.len(), &prefix[head.len()..]));
            break;
        }
    }
    variants
}

/// All suggestions for `prefix` typed in `current_path`.
///
/// Library name suggestions come first, then keywords, for the prefix and
/// its BDD-stripped variant. The suggestion cap applies to each variant on
/// its own, so a prefix such as `Given op` can return up to twice
/// `max_suggestions` entries.
pub fn completions(
    index: &SymbolIndex,
    prefix: &str,
    current_path: Option<&Path>,
    options: &CompletionOptions,
) -> Vec<Suggestion> {
    let mut all = Vec::new();
    for (offset, variant) in bdd_variants(prefix) {
        let shift = |mut suggestion: Suggestion| {
            suggestion.replacement = suggestion.replacement.shifted(offset);
            suggestion
        };
        all.extend(
            library_name_suggestions(index, variant, options)
                .into_iter()
                .map(shift),
        );
        all.extend(
            keyword_suggestions(index, variant, current_path, options)
                .into_iter()
                .map(shift),
        );
    }
    all
}

/// Indexed file names starting with `prefix`, alphabetically.
pub fn library_name_suggestions(
    index: &SymbolIndex,
    prefix: &str,
    options: &CompletionOptions,
) -> Vec<Suggestion> {
    if !options.show_library_suggestions {
        return Vec::new();
    }
    let query = prefix.trim().to_lowercase();
    let mut names: FxHashMap<&str, &SourceFile> = FxHashMap::default();
    for file in index.files() {
        let name = file.display_name.to_lowercase();
        let last_segment = name.rsplit('.').next().unwrap_or(&name);
        if name.starts_with(&query) || last_segment.starts_with(&query) {
            names.entry(file.display_name.as_str()).or_insert(file.as_ref());
        }
    }

    let mut names: Vec<(&str, &SourceFile)> = names.into_iter().collect();
    names.sort_by(|a, b| a.0.cmp(b.0));
    names
        .into_iter()
        .map(|(name, file)| Suggestion {
            insertion_text: name.to_string(),
            display_text: name.to_string(),
            kind: SuggestionKind::Import,
            left_label: String::new(),
            right_label: if file.is_library { "Library" } else { "Resource" }.to_string(),
            documentation_summary: String::new(),
            replacement: ReplacementSpan {
                start: 0,
                end: prefix.len(),
            },
            keyword: None,
        })
        .collect()
}

struct Scored<'a> {
    keyword: &'a Keyword,
    file: &'a SourceFile,
    score: f64,
}

/// Ranked keyword suggestions for `prefix`.
pub fn keyword_suggestions(
    index: &SymbolIndex,
    prefix: &str,
    current_path: Option<&Path>,
    options: &CompletionOptions,
) -> Vec<Suggestion> {
    let current = current_path
        .and_then(|path| index.file_by_path(path))
        .map(|file| file.as_ref());
    let current_name = current_path
        .and_then(Path::file_stem)
        .map(|stem| stem.to_string_lossy().into_owned());
    let cx = ScopeContext {
        index,
        current,
        internal_modifier: &options.internal_scope_modifier,
        base_library: &options.base_library,
    };
    let scope = detect_scope(prefix, &cx);
    if scope.kind == ScopeKind::Invalid {
        return Vec::new();
    }

    let visible = |keyword: &Keyword| !keyword.local || current.is_some_and(|c| &c.key == keyword.file());

    let mut scored: Vec<Scored<'_>> = index
        .files()
        .filter(|file| scope.files.contains(&file.key))
        .flat_map(|file| file.keywords.iter().map(move |keyword| (file.as_ref(), keyword)))
        .filter(|&(_, keyword)| visible(keyword))
        .filter_map(|(file, keyword)| {
            let score = fuzzy::score(scope.query, &keyword.name)?;
            Some(Scored {
                keyword,
                file,
                score,
            })
        })
        .collect();

    let is_current = |file: &SourceFile| current_name.as_deref() == Some(file.display_name.as_str());
    scored.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| is_current(b.file).cmp(&is_current(a.file)))
            .then_with(|| a.keyword.name.cmp(&b.keyword.name))
            .then_with(|| a.file.key.cmp(&b.file.key))
    });
    scored.truncate(options.max_suggestions);

    let ambiguity_files = if options.global_ambiguity {
        CandidateFiles::All
    } else {
        scope.files.clone()
    };
    let mut ambiguous: FxHashMap<SmolStr, bool> = FxHashMap::default();
    scored
        .iter()
        .map(|entry| {
            let is_ambiguous = *ambiguous.entry(entry.keyword.key()).or_insert_with(|| {
                owner_count(index, &entry.keyword.name, &ambiguity_files, &visible) > 1
            });
            render(entry, is_ambiguous, prefix, &scope, options)
        })
        .collect()
}

/// Distinct files defining a visible keyword named `name` among `files`.
fn owner_count(
    index: &SymbolIndex,
    name: &str,
    files: &CandidateFiles,
    visible: &impl Fn(&Keyword) -> bool,
) -> usize {
    let mut owners: Vec<&IdentityKey> = index
        .keywords_named(name)
        .into_iter()
        .filter(|&keyword| visible(keyword) && files.contains(keyword.file()))
        .map(Keyword::file)
        .collect();
    owners.sort();
    owners.dedup();
    owners.len()
}

fn render(
    entry: &Scored<'_>,
    ambiguous: bool,
    prefix: &str,
    scope: &ScopeResolution<'_>,
    options: &CompletionOptions,
) -> Suggestion {
    let keyword = entry.keyword;
    let whole = ReplacementSpan {
        start: 0,
        end: prefix.len(),
    };
    let (name, replacement) = if ambiguous {
        (format!("{}.{}", entry.file.display_name, keyword.name), whole)
    } else if scope.kind == ScopeKind::FileQualified && !options.remove_dot_notation {
        let keyword_part = ReplacementSpan {
            start: scope.query_start,
            end: prefix.len(),
        };
        (keyword.name.clone(), keyword_part)
    } else {
        (keyword.name.clone(), whole)
    };

    let arguments = keyword.arguments_text();
    let display_text = if options.show_arguments && !arguments.is_empty() {
        format!("{} - {}", keyword.name, arguments)
    } else {
        keyword.name.clone()
    };

    Suggestion {
        insertion_text: insertion_text(&name, keyword, options),
        display_text,
        kind: SuggestionKind::Keyword,
        left_label: String::new(),
        right_label: entry.file.display_name.clone(),
        documentation_summary: format!("{} Arguments: {}", keyword.summary(), arguments)
            .trim_start()
            .to_string(),
        replacement,
        keyword: Some(keyword.id.clone()),
    }
}

/// `Name    ${1:a}    ${2:b}` when argument suggestion is on.
fn insertion_text(name: &str, keyword: &Keyword, options: &CompletionOptions) -> String {
    let mut text = name.to_string();
    if !options.suggest_arguments {
        return text;
    }
    let arguments = keyword
        .arguments
        .iter()
        .filter(|arg| options.include_default_arguments || !arg.has_default());
    for (i, arg) in arguments.enumerate() {
        text.push_str(&options.argument_separator);
        text.push_str(&format!("${{{}:{}}}", i + 1, arg));
    }
    text
}
