//! Line tokenizer for the plain-text table syntax.
//!
//! Robot files separate cells with a tab or with two or more spaces; a single
//! space belongs to the cell. `#` starts a comment that runs to the end of
//! the line. The lexer turns raw text into [`Line`]s of cells, dropping
//! comments and lines that carry no cells.

use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    #[regex(r"\r\n|\n|\r")]
    Newline,

    #[token("\t")]
    #[regex(r"[ \t][ \t]+")]
    Separator,

    #[token(" ")]
    Space,

    #[regex(r"#[^\r\n]*")]
    Comment,

    #[regex(r"[^ \t\r\n#]+")]
    Text,
}

/// One non-blank line, split into cells.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    /// 0-indexed line number in the original text.
    pub number: u32,
    /// 0-indexed byte column of the first cell.
    pub column: u32,
    /// True when the line starts with a separator (a body row).
    pub indented: bool,
    pub cells: Vec<String>,
}

impl Line {
    pub fn first(&self) -> &str {
        self.cells.first().map(String::as_str).unwrap_or("")
    }

    /// Cells after the first one.
    pub fn rest(&self) -> &[String] {
        self.cells.get(1..).unwrap_or(&[])
    }

    /// True for a `...` continuation row.
    pub fn is_continuation(&self) -> bool {
        self.first() == "..."
    }
}

#[derive(Default)]
struct LineBuilder {
    number: u32,
    line_start: usize,
    column: Option<u32>,
    indented: bool,
    cells: Vec<String>,
    current: String,
    pending_space: bool,
}

impl LineBuilder {
    fn text(&mut self, text: &str, offset: usize) {
        if self.column.is_none() {
            self.column = Some((offset - self.line_start) as u32);
        }
        if self.pending_space && !self.current.is_empty() {
            self.current.push(' ');
        }
        self.pending_space = false;
        self.current.push_str(text);
    }

    fn space(&mut self) {
        self.pending_space = true;
    }

    fn separator(&mut self) {
        if self.column.is_none() && self.cells.is_empty() {
            self.indented = true;
        }
        self.end_cell();
    }

    fn end_cell(&mut self) {
        self.pending_space = false;
        if !self.current.is_empty() {
            self.cells.push(std::mem::take(&mut self.current));
        }
    }

    fn finish(&mut self, next_line_start: usize, lines: &mut Vec<Line>) {
        self.end_cell();
        if !self.cells.is_empty() {
            lines.push(Line {
                number: self.number,
                column: self.column.unwrap_or(0),
                indented: self.indented,
                cells: std::mem::take(&mut self.cells),
            });
        }
        *self = LineBuilder {
            number: self.number + 1,
            line_start: next_line_start,
            ..LineBuilder::default()
        };
    }
}

/// Tokenize `text` into its non-blank lines.
pub fn lines(text: &str) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut builder = LineBuilder::default();
    let mut lexer = Token::lexer(text);

    while let Some(token) = lexer.next() {
        let span = lexer.span();
        match token {
            Ok(Token::Newline) => builder.finish(span.end, &mut lines),
            Ok(Token::Separator) => builder.separator(),
            Ok(Token::Space) => builder.space(),
            Ok(Token::Comment) => builder.end_cell(),
            Ok(Token::Text) | Err(()) => builder.text(lexer.slice(), span.start),
        }
    }
    builder.finish(text.len(), &mut lines);
    lines
}
