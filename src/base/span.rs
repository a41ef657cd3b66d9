//! Source positions for keyword navigation.

use std::fmt;

pub use text_size::TextSize;

/// A line and column position in source text.
///
/// Both line and column are 0-indexed internally, but displayed as 1-indexed.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default, serde::Serialize)]
pub struct LineCol {
    /// 0-indexed line number
    pub line: u32,
    /// 0-indexed column (in UTF-8 bytes, not characters)
    pub col: u32,
}

impl LineCol {
    #[inline]
    pub const fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }

    /// Get 1-indexed line number (for display).
    #[inline]
    pub const fn line_one_indexed(self) -> u32 {
        self.line + 1
    }

    /// Get 1-indexed column number (for display).
    #[inline]
    pub const fn col_one_indexed(self) -> u32 {
        self.col + 1
    }
}

impl fmt::Debug for LineCol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line_one_indexed(), self.col_one_indexed())
    }
}

impl fmt::Display for LineCol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line_one_indexed(), self.col_one_indexed())
    }
}

/// Index for converting byte offsets into line/column positions.
///
/// Recognizes `\r\n`, `\n` and lone `\r` as line terminators, the same set
/// the parsers split on.
#[derive(Clone, Debug)]
pub struct LineIndex {
    /// Byte offset of the start of each line
    line_starts: Vec<TextSize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![TextSize::from(0)];
        let bytes = text.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\r' if bytes.get(i + 1) == Some(&b'\n') => {
                    line_starts.push(TextSize::from((i + 2) as u32));
                    i += 2;
                    continue;
                }
                b'\r' | b'\n' => line_starts.push(TextSize::from((i + 1) as u32)),
                _ => {}
            }
            i += 1;
        }
        Self { line_starts }
    }

    /// Convert a byte offset to a line/column position.
    pub fn line_col(&self, offset: TextSize) -> LineCol {
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let col = offset - self.line_starts[line];
        LineCol {
            line: line as u32,
            col: col.into(),
        }
    }

    /// Get the number of lines.
    pub fn len(&self) -> usize {
        self.line_starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.line_starts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col_display() {
        assert_eq!(format!("{}", LineCol::new(0, 0)), "1:1");
        assert_eq!(format!("{}", LineCol::new(5, 10)), "6:11");
    }

    #[test]
    fn test_line_index_multi_line() {
        let index = LineIndex::new("hello\nworld\n!");

        assert_eq!(index.line_col(TextSize::from(0)), LineCol::new(0, 0));
        assert_eq!(index.line_col(TextSize::from(5)), LineCol::new(0, 5));
        assert_eq!(index.line_col(TextSize::from(6)), LineCol::new(1, 0));
        assert_eq!(index.line_col(TextSize::from(12)), LineCol::new(2, 0));
    }

    #[test]
    fn test_line_index_mixed_terminators() {
        let index = LineIndex::new("a\r\nb\rc\nd");

        assert_eq!(index.len(), 4);
        assert_eq!(index.line_col(TextSize::from(3)), LineCol::new(1, 0));
        assert_eq!(index.line_col(TextSize::from(5)), LineCol::new(2, 0));
        assert_eq!(index.line_col(TextSize::from(7)), LineCol::new(3, 0));
    }
}
