//! Libdoc XML reader.
//!
//! Two schema generations are in circulation:
//!
//! ```text
//! older: <keywordspec><kw name="..."><arguments><arg>a=1</arg></arguments><doc>..</doc></kw>
//! newer: <keywordspec><keywords><kw name="..."><arguments repr="..">
//!            <arg kind=".." required=".." repr="a=1"><name>a</name>..</arg>
//!        </arguments><doc>..</doc></kw></keywords>
//! ```
//!
//! Both normalize to [`ParsedFile`] with keywords only. Positions are
//! recovered by scanning the raw text for `<kw name="...`, so a name that
//! appears twice resolves to its last occurrence.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::base::{LineIndex, TextSize};
use crate::error::Result;
use crate::syntax::{ArgumentSpec, ParsedEntry, ParsedFile};

const ROOT: &[u8] = b"keywordspec";
const KEYWORDS: &[u8] = b"keywords";
const KW: &[u8] = b"kw";
const ARGUMENTS: &[u8] = b"arguments";
const ARG: &[u8] = b"arg";
const DOC: &[u8] = b"doc";

const KW_NAME_MARKER: &str = "<kw name=\"";

/// Parse a libdoc document.
///
/// Returns `None` when the text is not well-formed XML or its root is not a
/// `keywordspec` element.
pub fn parse(text: &str) -> Option<ParsedFile> {
    match try_parse(text) {
        Ok(parsed) => parsed,
        Err(err) => {
            debug!(error = %err, "unreadable libdoc document");
            None
        }
    }
}

/// Like [`parse`] but reports XML decoding errors.
pub fn try_parse(text: &str) -> Result<Option<ParsedFile>> {
    let Some(mut keywords) = read_keywords(text)? else {
        return Ok(None);
    };
    fill_positions(text, &mut keywords);
    Ok(Some(ParsedFile {
        keywords,
        ..ParsedFile::default()
    }))
}

/// True for a `keywordspec` document declaring at least one keyword.
pub fn is_libdoc(text: &str) -> bool {
    parse(text).is_some_and(|parsed| parsed.has_keywords())
}

/// Keyword under construction.
#[derive(Default)]
struct KwBuilder {
    name: String,
    doc: String,
    /// Arguments given as bare element text (older schema).
    text_args: Vec<String>,
    /// `repr` attributes (newer schema).
    repr_args: Vec<String>,
    /// Text of the `<arg>` currently open, if any.
    open_arg: Option<String>,
}

impl KwBuilder {
    fn new(start: &BytesStart<'_>) -> Result<Self> {
        Ok(Self {
            name: attribute(start, "name")?.unwrap_or_default(),
            ..Self::default()
        })
    }

    fn start_arg(&mut self, start: &BytesStart<'_>) -> Result<()> {
        if let Some(repr) = attribute(start, "repr")? {
            self.repr_args.push(repr);
        }
        self.open_arg = Some(String::new());
        Ok(())
    }

    fn end_arg(&mut self) {
        if let Some(text) = self.open_arg.take() {
            let text = text.trim();
            if !text.is_empty() {
                self.text_args.push(text.to_string());
            }
        }
    }

    fn finish(self) -> ParsedEntry {
        let args = if self.text_args.is_empty() {
            self.repr_args
        } else {
            self.text_args
        };
        ParsedEntry {
            name: self.name.trim().to_string(),
            documentation: self.doc.trim().to_string(),
            arguments: args.iter().map(|repr| ArgumentSpec::from_repr(repr)).collect(),
            position: None,
        }
    }
}

fn attribute(start: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    match start.try_get_attribute(name).map_err(quick_xml::Error::from)? {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

/// True when `path` (element names from the root) ends at a keyword of
/// either schema.
fn is_keyword_path(path: &[Vec<u8>]) -> bool {
    match path {
        [root, kw] => root == ROOT && kw == KW,
        [root, keywords, kw] => root == ROOT && keywords == KEYWORDS && kw == KW,
        _ => false,
    }
}

fn read_keywords(text: &str) -> Result<Option<Vec<ParsedEntry>>> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(false);

    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut saw_root = false;
    let mut current: Option<KwBuilder> = None;
    let mut keywords = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                let name = start.local_name().as_ref().to_vec();
                if path.is_empty() {
                    if name != ROOT {
                        return Ok(None);
                    }
                    saw_root = true;
                }
                path.push(name);
                if is_keyword_path(&path) {
                    current = Some(KwBuilder::new(&start)?);
                } else if let Some(kw) = current.as_mut() {
                    if in_keyword_arguments(&path) {
                        kw.start_arg(&start)?;
                    }
                }
            }
            Event::Empty(start) => {
                let name = start.local_name().as_ref().to_vec();
                if path.is_empty() {
                    return Ok((name == ROOT).then(Vec::new));
                }
                path.push(name);
                if is_keyword_path(&path) {
                    keywords.push(KwBuilder::new(&start)?.finish());
                } else if let Some(kw) = current.as_mut() {
                    if in_keyword_arguments(&path) {
                        kw.start_arg(&start)?;
                        kw.end_arg();
                    }
                }
                path.pop();
            }
            Event::End(_) => {
                if is_keyword_path(&path) {
                    if let Some(kw) = current.take() {
                        keywords.push(kw.finish());
                    }
                } else if let Some(kw) = current.as_mut() {
                    if in_keyword_arguments(&path) {
                        kw.end_arg();
                    }
                }
                path.pop();
            }
            Event::Text(content) => {
                if let Some(kw) = current.as_mut() {
                    let content = content.unescape()?;
                    append_text(kw, &path, &content);
                }
            }
            Event::CData(content) => {
                if let Some(kw) = current.as_mut() {
                    append_text(kw, &path, &String::from_utf8_lossy(&content));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(saw_root.then_some(keywords))
}

/// True when the innermost element is an `<arg>` directly under a keyword's
/// `<arguments>`.
fn in_keyword_arguments(path: &[Vec<u8>]) -> bool {
    match path {
        [prefix @ .., arguments, arg] => {
            arguments == ARGUMENTS && arg == ARG && is_keyword_path(prefix)
        }
        _ => false,
    }
}

fn append_text(kw: &mut KwBuilder, path: &[Vec<u8>], content: &str) {
    match path {
        [prefix @ .., doc] if doc == DOC && is_keyword_path(prefix) => kw.doc.push_str(content),
        _ if in_keyword_arguments(path) => {
            if let Some(arg) = kw.open_arg.as_mut() {
                arg.push_str(content);
            }
        }
        _ => {}
    }
}

/// Attach positions by scanning the raw text for keyword start tags.
fn fill_positions(text: &str, keywords: &mut [ParsedEntry]) {
    let by_name: FxHashMap<String, usize> = keywords
        .iter()
        .enumerate()
        .map(|(i, kw)| (kw.name.clone(), i))
        .collect();
    let index = LineIndex::new(text);

    let mut from = 0;
    while let Some(found) = text[from..].find(KW_NAME_MARKER) {
        let start = from + found;
        let name_start = start + KW_NAME_MARKER.len();
        let Some(len) = text[name_start..].find('"') else {
            break;
        };
        let raw = &text[name_start..name_start + len];
        let name = quick_xml::escape::unescape(raw)
            .map(|name| name.trim().to_string())
            .unwrap_or_else(|_| raw.trim().to_string());
        if let Some(&i) = by_name.get(&name) {
            keywords[i].position = Some(index.line_col(TextSize::from(start as u32)));
        }
        from = name_start + len;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::LineCol;

    const OLD_SCHEMA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<keywordspec name="Collections" type="library" format="ROBOT" generated="20200101 10:00:00">
<version>3.2</version>
<kw name="Append To List">
<arguments>
<arg>list_</arg>
<arg>*values</arg>
</arguments>
<doc>Adds ``values`` to the end of ``list``.

Example: ...</doc>
</kw>
<kw name="Should Be &amp; Stay">
<arguments>
</arguments>
<doc>Entity &lt;check&gt;.</doc>
</kw>
</keywordspec>
"#;

    const NEW_SCHEMA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<keywordspec name="BuiltIn" type="LIBRARY" format="ROBOT" scope="GLOBAL" specversion="3">
<version>4.1</version>
<keywords>
<kw name="Log" lineno="2900">
<arguments repr="message, level=INFO">
<arg kind="POSITIONAL_OR_NAMED" required="true" repr="message">
<name>message</name>
</arg>
<arg kind="POSITIONAL_OR_NAMED" required="false" repr="level=INFO">
<name>level</name>
<default>INFO</default>
</arg>
<arg kind="VAR_POSITIONAL" required="false">
<name>broken</name>
</arg>
</arguments>
<doc>Logs the given message with the given level.</doc>
<shortdoc>Logs the given message.</shortdoc>
</kw>
<kw name="No Operation" lineno="3000"/>
</keywords>
</keywordspec>
"#;

    #[test]
    fn test_old_schema_text_arguments() {
        let parsed = parse(OLD_SCHEMA).unwrap();

        assert_eq!(parsed.keywords.len(), 2);
        let append = &parsed.keywords[0];
        assert_eq!(append.name, "Append To List");
        let args: Vec<String> = append.arguments.iter().map(|a| a.to_string()).collect();
        assert_eq!(args, vec!["list_", "*values"]);
        assert!(append.documentation.starts_with("Adds ``values`` to the end"));
        assert_eq!(append.position, Some(LineCol::new(3, 0)));
    }

    #[test]
    fn test_entities_are_decoded() {
        let parsed = parse(OLD_SCHEMA).unwrap();
        let kw = &parsed.keywords[1];

        assert_eq!(kw.name, "Should Be & Stay");
        assert_eq!(kw.documentation, "Entity <check>.");
        assert!(kw.arguments.is_empty());
        assert_eq!(kw.position, Some(LineCol::new(12, 0)));
    }

    #[test]
    fn test_new_schema_repr_arguments() {
        let parsed = parse(NEW_SCHEMA).unwrap();

        assert_eq!(parsed.keywords.len(), 2);
        let log = &parsed.keywords[0];
        assert_eq!(log.name, "Log");
        assert_eq!(log.documentation, "Logs the given message with the given level.");
        assert_eq!(
            log.arguments,
            vec![
                ArgumentSpec::new("message"),
                ArgumentSpec::with_default("level", "INFO"),
            ]
        );
        assert_eq!(log.position, Some(LineCol::new(4, 0)));

        let noop = &parsed.keywords[1];
        assert_eq!(noop.name, "No Operation");
        assert!(noop.documentation.is_empty());
        assert!(noop.arguments.is_empty());
    }

    #[test]
    fn test_parsed_libdoc_has_only_keywords() {
        let parsed = parse(NEW_SCHEMA).unwrap();
        assert!(parsed.test_cases.is_empty());
        assert!(parsed.libraries.is_empty());
        assert!(parsed.resources.is_empty());
    }

    #[test]
    fn test_recognition() {
        assert!(is_libdoc(OLD_SCHEMA));
        assert!(is_libdoc(NEW_SCHEMA));
        assert!(!is_libdoc(r#"<keywordspec name="Empty"><version/></keywordspec>"#));
        assert!(!is_libdoc(r#"<project><kw name="X"/></project>"#));
        assert!(!is_libdoc("*** Keywords ***"));
    }

    #[test]
    fn test_nested_kw_elsewhere_is_ignored() {
        let text = r#"<keywordspec><inits><kw name="Init"/></inits><kw name="Real"/></keywordspec>"#;
        let parsed = parse(text).unwrap();
        let names: Vec<&str> = parsed.keywords.iter().map(|k| k.name.as_str()).collect();
        assert_eq!(names, vec!["Real"]);
    }

    #[test]
    fn test_malformed_xml_is_reported() {
        assert!(try_parse("<keywordspec><kw name=\"A\"></doc></keywordspec>").is_err());
        assert!(parse("<keywordspec><kw name=\"A\"></doc></keywordspec>").is_none());
    }
}
