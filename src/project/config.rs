//! Workspace settings.
//!
//! Settings are owned by the host. They arrive as JSON (camelCase keys, any
//! key may be omitted) or are built in code with the `with_*` methods.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ide::CompletionOptions;

/// Directory name, under the system temp dir, where generated libdoc files go.
pub const LIBDOC_DIR_NAME: &str = "robot-lib-cache";

/// Directory of libdoc files shipped with this crate.
pub const FALLBACK_DIR_NAME: &str = "fallback-libraries";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Extensions that may hold robot source besides `.robot`.
    pub robot_extensions: Vec<String>,
    /// Files of this many bytes or more are skipped.
    pub max_file_size: u64,
    pub max_keyword_suggestions: usize,
    /// Globs matched against file and directory names during scans.
    pub exclude_patterns: Vec<String>,
    /// Use libdoc XML found in projects as fallback library documentation.
    pub process_libdoc_files: bool,
    pub show_library_suggestions: bool,
    pub show_arguments: bool,
    pub suggest_arguments: bool,
    pub include_default_arguments: bool,
    pub argument_separator: String,
    pub remove_dot_notation: bool,
    pub internal_scope_modifier: String,
    /// Interpreter that runs the documentation generator.
    pub executable: String,
    pub module_search_paths: Vec<String>,
    /// Output directory of the documentation generator.
    pub libdoc_dir: PathBuf,
    pub fallback_library_dir: Option<PathBuf>,
    pub global_ambiguity: bool,
    /// Library that is visible from every file without an import.
    pub base_library: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            robot_extensions: vec![".robot".into(), ".txt".into(), ".resource".into()],
            max_file_size: 1024 * 1024,
            max_keyword_suggestions: 100,
            exclude_patterns: Vec::new(),
            process_libdoc_files: true,
            show_library_suggestions: true,
            show_arguments: false,
            suggest_arguments: true,
            include_default_arguments: false,
            argument_separator: "    ".into(),
            remove_dot_notation: true,
            internal_scope_modifier: "this".into(),
            executable: "python".into(),
            module_search_paths: Vec::new(),
            libdoc_dir: std::env::temp_dir().join(LIBDOC_DIR_NAME),
            fallback_library_dir: Some(Self::bundled_fallback_dir()),
            global_ambiguity: false,
            base_library: "BuiltIn".into(),
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse settings from a JSON object. Missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The `fallback-libraries` directory next to this crate's manifest.
    pub fn bundled_fallback_dir() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join(FALLBACK_DIR_NAME)
    }

    pub fn with_robot_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.robot_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn with_max_keyword_suggestions(mut self, max: usize) -> Self {
        self.max_keyword_suggestions = max;
        self
    }

    pub fn with_exclude_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_process_libdoc_files(mut self, enabled: bool) -> Self {
        self.process_libdoc_files = enabled;
        self
    }

    pub fn with_executable(mut self, executable: impl Into<String>) -> Self {
        self.executable = executable.into();
        self
    }

    pub fn with_module_search_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.module_search_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_libdoc_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.libdoc_dir = dir.into();
        self
    }

    pub fn with_fallback_library_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.fallback_library_dir = dir;
        self
    }

    pub fn with_global_ambiguity(mut self, enabled: bool) -> Self {
        self.global_ambiguity = enabled;
        self
    }

    pub fn with_remove_dot_notation(mut self, enabled: bool) -> Self {
        self.remove_dot_notation = enabled;
        self
    }

    pub fn completion_options(&self) -> CompletionOptions {
        CompletionOptions::from(self)
    }

    /// Compiled exclude globs.
    pub fn exclude_matchers(&self) -> Result<Vec<glob::Pattern>> {
        self.exclude_patterns
            .iter()
            .map(|pattern| Ok(glob::Pattern::new(pattern)?))
            .collect()
    }
}

impl From<&Settings> for CompletionOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            max_suggestions: settings.max_keyword_suggestions,
            show_library_suggestions: settings.show_library_suggestions,
            show_arguments: settings.show_arguments,
            suggest_arguments: settings.suggest_arguments,
            include_default_arguments: settings.include_default_arguments,
            argument_separator: settings.argument_separator.clone(),
            remove_dot_notation: settings.remove_dot_notation,
            internal_scope_modifier: settings.internal_scope_modifier.clone(),
            base_library: settings.base_library.clone(),
            global_ambiguity: settings.global_ambiguity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_completion_defaults() {
        assert_eq!(Settings::default().completion_options(), CompletionOptions::default());
    }

    #[test]
    fn test_from_json_partial() {
        let settings = Settings::from_json(
            r#"{"maxKeywordSuggestions": 5, "excludePatterns": ["*.bak"], "internalScopeModifier": "self"}"#,
        )
        .unwrap();
        assert_eq!(settings.max_keyword_suggestions, 5);
        assert_eq!(settings.exclude_patterns, vec!["*.bak"]);
        assert_eq!(settings.internal_scope_modifier, "self");
        assert_eq!(settings.executable, "python");
        assert!(settings.libdoc_dir.ends_with(LIBDOC_DIR_NAME));
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(Settings::from_json("not json").is_err());
    }

    #[test]
    fn test_bad_exclude_pattern() {
        let settings = Settings::new().with_exclude_patterns(["[unclosed"]);
        assert!(settings.exclude_matchers().is_err());
        assert_eq!(Settings::new().with_exclude_patterns(["*.tmp"]).exclude_matchers().unwrap().len(), 1);
    }
}
