//! Structural parse of keyword, test case and settings tables.

use tracing::trace;

use super::lexer::{self, Line};
use super::sections::{self, SectionKind};
use crate::base::LineCol;
use crate::syntax::{ArgumentSpec, LibraryImport, ParsedEntry, ParsedFile};

const DOCUMENTATION: &str = "[documentation]";
const ARGUMENTS: &str = "[arguments]";

/// Parse plain-text robot source.
///
/// Never fails: malformed rows degrade to empty documentation or argument
/// lists and missing sections yield empty collections.
pub fn parse(text: &str) -> ParsedFile {
    let lines = lexer::lines(text);
    let sections = sections::split(&lines);

    let keywords = parse_entries(&sections::lines_of(&sections, SectionKind::Keywords), true);
    let test_cases = parse_entries(&sections::lines_of(&sections, SectionKind::TestCases), false);
    let settings = sections::lines_of(&sections, SectionKind::Settings);

    let parsed = ParsedFile {
        keywords,
        test_cases,
        libraries: parse_libraries(&settings),
        resources: parse_resources(&settings),
    };
    trace!(
        keywords = parsed.keywords.len(),
        test_cases = parsed.test_cases.len(),
        libraries = parsed.libraries.len(),
        resources = parsed.resources.len(),
        "parsed robot source"
    );
    parsed
}

/// An entry before its body rows are interpreted.
struct RawEntry<'a> {
    name: &'a str,
    position: LineCol,
    rows: Vec<&'a [String]>,
}

fn parse_entries(lines: &[&Line], with_arguments: bool) -> Vec<ParsedEntry> {
    group_entries(lines)
        .into_iter()
        .map(|raw| ParsedEntry {
            name: raw.name.to_string(),
            documentation: setting_cells(&raw.rows, DOCUMENTATION)
                .map(|cells| cells.join(" "))
                .unwrap_or_default(),
            arguments: if with_arguments {
                setting_cells(&raw.rows, ARGUMENTS)
                    .map(|cells| cells.iter().filter_map(|c| parse_argument(c)).collect())
                    .unwrap_or_default()
            } else {
                Vec::new()
            },
            position: Some(raw.position),
        })
        .collect()
}

/// Split a table into entries: a non-indented line opens an entry, indented
/// lines extend it.
fn group_entries<'a>(lines: &[&'a Line]) -> Vec<RawEntry<'a>> {
    let mut entries: Vec<RawEntry<'a>> = Vec::new();
    for &line in lines {
        if line.indented {
            if let Some(entry) = entries.last_mut() {
                entry.rows.push(&line.cells);
            }
            continue;
        }
        let mut entry = RawEntry {
            name: line.first(),
            position: LineCol::new(line.number, line.column),
            rows: Vec::new(),
        };
        // `Name    [Arguments]    ${x}` keeps its settings on the name line.
        if !line.rest().is_empty() {
            entry.rows.push(line.rest());
        }
        entries.push(entry);
    }
    entries
}

/// Cells of a `[Setting]` row joined with its `...` continuation rows.
fn setting_cells<'a>(rows: &[&'a [String]], setting: &str) -> Option<Vec<&'a str>> {
    let start = rows.iter().position(|row| {
        row.first()
            .is_some_and(|cell| cell.eq_ignore_ascii_case(setting))
    })?;

    let mut cells: Vec<&str> = rows[start][1..].iter().map(String::as_str).collect();
    for &row in &rows[start + 1..] {
        match row.split_first() {
            Some((first, rest)) if first == "..." => {
                cells.extend(rest.iter().map(String::as_str));
            }
            _ => break,
        }
    }
    Some(cells)
}

/// Parse `${name}`, `@{name}` or `&{name}`, optionally followed by `=default`.
fn parse_argument(cell: &str) -> Option<ArgumentSpec> {
    let rest = cell
        .strip_prefix('$')
        .or_else(|| cell.strip_prefix('@'))
        .or_else(|| cell.strip_prefix('&'))?;
    let body = rest.strip_prefix('{')?;
    let close = body.find('}')?;
    let name = body[..close].trim();
    if name.is_empty() {
        return None;
    }
    let spec = match body[close + 1..].strip_prefix('=') {
        Some(default) => ArgumentSpec::with_default(name, default),
        None => ArgumentSpec::new(name),
    };
    Some(spec)
}

fn parse_libraries(settings: &[&Line]) -> Vec<LibraryImport> {
    settings
        .iter()
        .filter(|line| line.first().eq_ignore_ascii_case("library"))
        .filter_map(|line| {
            let (name, options) = line.rest().split_first()?;
            let alias = options
                .iter()
                .position(|cell| cell.eq_ignore_ascii_case("with name") || cell == "AS")
                .and_then(|i| options.get(i + 1))
                .cloned();
            Some(LibraryImport {
                name: name.clone(),
                alias,
            })
        })
        .collect()
}

fn parse_resources(settings: &[&Line]) -> Vec<String> {
    settings
        .iter()
        .filter(|line| line.first().eq_ignore_ascii_case("resource"))
        .filter_map(|line| line.rest().first().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_keyword() {
        let parsed = parse(
            "*** Keywords ***\nLog Message\n    [Documentation]    Logs something.\n    [Arguments]    ${msg}\n",
        );

        assert_eq!(parsed.keywords.len(), 1);
        let kw = &parsed.keywords[0];
        assert_eq!(kw.name, "Log Message");
        assert_eq!(kw.documentation, "Logs something.");
        assert_eq!(kw.arguments, vec![ArgumentSpec::new("msg")]);
        assert_eq!(kw.position, Some(LineCol::new(1, 0)));
        assert!(parsed.test_cases.is_empty());
    }

    #[test]
    fn test_documentation_continuation() {
        let parsed = parse(
            "*** Keywords ***\nK\n    [Documentation]    First part\n    ...    second part\n    ...    third\n    No Operation\n",
        );
        assert_eq!(parsed.keywords[0].documentation, "First part second part third");
    }

    #[test]
    fn test_argument_kinds_and_defaults() {
        let parsed = parse(
            "*** Keywords ***\nK\n    [Arguments]    ${a}    @{list}\n    ...    &{named}    ${level}=INFO\n",
        );
        let args: Vec<String> = parsed.keywords[0].arguments.iter().map(|a| a.to_string()).collect();
        assert_eq!(args, vec!["a", "list", "named", "level=INFO"]);
    }

    #[test]
    fn test_malformed_arguments_are_skipped() {
        let parsed = parse("*** Keywords ***\nK\n    [Arguments]    plain    ${}    ${ok}\n");
        assert_eq!(parsed.keywords[0].arguments, vec![ArgumentSpec::new("ok")]);
    }

    #[test]
    fn test_settings_on_name_line() {
        let parsed = parse("*** Keywords ***\nK    [Arguments]    ${x}\n    Log    ${x}\n");
        assert_eq!(parsed.keywords[0].name, "K");
        assert_eq!(parsed.keywords[0].arguments, vec![ArgumentSpec::new("x")]);
    }

    #[test]
    fn test_consecutive_names_have_empty_bodies() {
        let parsed = parse("*** Keywords ***\nFirst\nSecond\n    [Documentation]    Doc\n");
        assert_eq!(parsed.keywords.len(), 2);
        assert_eq!(parsed.keywords[0].documentation, "");
        assert!(parsed.keywords[0].arguments.is_empty());
        assert_eq!(parsed.keywords[1].documentation, "Doc");
    }

    #[test]
    fn test_test_cases_have_no_arguments() {
        let parsed = parse("*** Test Cases ***\nMy Test\n    [Documentation]    Checks\n    [Arguments]    ${x}\n");
        assert_eq!(parsed.test_cases.len(), 1);
        assert_eq!(parsed.test_cases[0].documentation, "Checks");
        assert!(parsed.test_cases[0].arguments.is_empty());
        assert!(parsed.has_test_cases());
    }

    #[test]
    fn test_settings_imports() {
        let parsed = parse(
            "*** Settings ***\nLibrary    SeleniumLibrary    timeout=5    WITH NAME    SL\nLibrary    Collections\nLibrary    Process    AS    Proc\nResource    ../common/keywords.robot\nResource    ${ROOT}/vars.robot\n",
        );
        assert_eq!(
            parsed.libraries,
            vec![
                LibraryImport { name: "SeleniumLibrary".into(), alias: Some("SL".into()) },
                LibraryImport { name: "Collections".into(), alias: None },
                LibraryImport { name: "Process".into(), alias: Some("Proc".into()) },
            ]
        );
        assert_eq!(parsed.resources, vec!["../common/keywords.robot", "${ROOT}/vars.robot"]);
    }

    #[test]
    fn test_missing_sections_yield_empty_collections() {
        let parsed = parse("*** Variables ***\n${X}    1\n");
        assert_eq!(parsed, ParsedFile::default());
    }

    #[test]
    fn test_comments_do_not_create_entries() {
        let parsed = parse("*** Keywords ***\n# Helper keywords\nHelper    # trailing\n    No Operation\n");
        assert_eq!(parsed.keywords.len(), 1);
        assert_eq!(parsed.keywords[0].name, "Helper");
        assert_eq!(parsed.keywords[0].position, Some(LineCol::new(2, 0)));
    }
}
