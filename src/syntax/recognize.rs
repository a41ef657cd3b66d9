//! Source recognition: is this content a robot file, a libdoc document, or
//! neither?
//!
//! Recognition is pure and never fails. Content that matches nothing is
//! simply not applicable.

use std::path::Path;

use super::libdoc;
use super::robot::lexer;
use super::robot::sections::SectionKind;

/// The canonical robot source extension.
pub const ROBOT_EXTENSION: &str = "robot";

/// The libdoc document extension.
pub const LIBDOC_EXTENSION: &str = "xml";

/// Result of [`classify`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Classification {
    pub is_test_suite: bool,
    pub is_api_doc: bool,
}

impl Classification {
    pub fn is_applicable(self) -> bool {
        self.is_test_suite || self.is_api_doc
    }
}

/// Classify file content by extension and structure.
///
/// `robot_extensions` is the configured allow-list (with or without leading
/// dot, any case). Files with the canonical `.robot` extension are always
/// robot files.
pub fn classify(content: &str, path: &Path, robot_extensions: &[String]) -> Classification {
    Classification {
        is_test_suite: is_robot_file(content, path, robot_extensions),
        is_api_doc: is_libdoc_file(content, path),
    }
}

/// True if the content starts with a recognized section header, optionally
/// preceded by blank and comment lines.
pub fn is_robot(content: &str) -> bool {
    lexer::lines(content)
        .first()
        .and_then(|line| SectionKind::from_header(line.first()))
        .is_some_and(SectionKind::is_known)
}

pub fn is_robot_file(content: &str, path: &Path, robot_extensions: &[String]) -> bool {
    let Some(ext) = extension(path) else {
        return false;
    };
    if ext == ROBOT_EXTENSION {
        return true;
    }
    let allowed = robot_extensions
        .iter()
        .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(&ext));
    allowed && is_robot(content)
}

pub fn is_libdoc_file(content: &str, path: &Path) -> bool {
    extension(path).is_some_and(|ext| ext == LIBDOC_EXTENSION) && libdoc::is_libdoc(content)
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}
