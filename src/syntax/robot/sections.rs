//! Section splitting: `*** Settings ***`, `*** Keywords ***`, ...

use super::lexer::Line;

/// The table a section header introduces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Settings,
    Variables,
    TestCases,
    Keywords,
    /// Any other `*`-header (comments, tasks in older parsers, typos).
    Other,
}

impl SectionKind {
    /// Classify a header cell such as `*** Test Cases ***`.
    ///
    /// Returns `None` when the cell is not a header at all.
    pub fn from_header(cell: &str) -> Option<Self> {
        let trimmed = cell.trim_start();
        if !trimmed.starts_with('*') {
            return None;
        }
        let name = trimmed.trim_matches(|c: char| c == '*' || c.is_whitespace());
        let name = name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        let kind = match name.as_str() {
            "setting" | "settings" => Self::Settings,
            "variable" | "variables" => Self::Variables,
            "test case" | "test cases" | "testcase" | "testcases" => Self::TestCases,
            "keyword" | "keywords" => Self::Keywords,
            _ => Self::Other,
        };
        Some(kind)
    }

    /// True for the four tables that identify a robot file.
    pub fn is_known(self) -> bool {
        self != Self::Other
    }
}

/// A section and the lines that follow its header.
#[derive(Clone, Debug)]
pub struct Section<'a> {
    pub kind: SectionKind,
    pub lines: &'a [Line],
}

/// Split lines into sections. Lines before the first header are discarded.
pub fn split(lines: &[Line]) -> Vec<Section<'_>> {
    let mut sections = Vec::new();
    let mut current: Option<(SectionKind, usize)> = None;

    for (i, line) in lines.iter().enumerate() {
        let header = if line.indented {
            None
        } else {
            SectionKind::from_header(line.first())
        };
        if let Some(kind) = header {
            if let Some((prev, start)) = current.take() {
                sections.push(Section {
                    kind: prev,
                    lines: &lines[start..i],
                });
            }
            current = Some((kind, i + 1));
        }
    }
    if let Some((kind, start)) = current {
        sections.push(Section {
            kind,
            lines: &lines[start..],
        });
    }
    sections
}

/// All lines belonging to sections of `kind`, in file order.
pub fn lines_of<'a>(sections: &[Section<'a>], kind: SectionKind) -> Vec<&'a Line> {
    sections
        .iter()
        .filter(|s| s.kind == kind)
        .flat_map(|s| s.lines.iter())
        .collect()
}
