//! Source positions and ranges.

use std::fmt;
use std::sync::Arc;

/// A single position in a source file.
///
/// Positions are only ever derived by advancing from a known position over
/// the bytes between them, so line and column always agree with `byte`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pos {
    /// Byte offset from the start of the file (0-based).
    pub byte: usize,
    /// Line number (1-based).
    pub line: usize,
    /// Column number, counted in characters (1-based).
    pub column: usize,
}

impl Default for Pos {
    fn default() -> Self {
        Self::START
    }
}

impl Pos {
    /// The position of the first byte of a file.
    pub const START: Pos = Pos {
        byte: 0,
        line: 1,
        column: 1,
    };

    /// Create a position from its raw parts.
    pub fn new(byte: usize, line: usize, column: usize) -> Self {
        Self { byte, line, column }
    }

    /// Advance this position through `src` up to the absolute byte offset `target`.
    ///
    /// `src` must be the whole file buffer, indexed by absolute byte offset.
    ///
    /// # Panics
    ///
    /// Panics if `target` is before this position or past the end of `src`.
    pub fn advance(self, src: &[u8], target: usize) -> Pos {
        assert!(
            target >= self.byte,
            "cannot advance position backwards (from byte {} to {})",
            self.byte,
            target
        );
        self.advance_over(&src[self.byte..target])
    }

    /// Advance this position over every byte in `bytes`.
    ///
    /// `\n` and `\r\n` end a line. A lone `\r` is an ordinary character.
    pub fn advance_over(self, bytes: &[u8]) -> Pos {
        let mut pos = self;
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\n' => {
                    pos.line += 1;
                    pos.column = 1;
                    i += 1;
                }
                // the following `\n` ends the line
                b'\r' if bytes.get(i + 1) == Some(&b'\n') => i += 1,
                _ => {
                    pos.column += 1;
                    i += utf8_char_len(&bytes[i..]).unwrap_or(1);
                }
            }
        }
        pos.byte += bytes.len();
        pos
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.line, self.column)
    }
}

/// A half-open span `[start, end)` within a named source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Range {
    /// The file this range belongs to, as given to the scanner.
    pub filename: Arc<str>,
    /// First position covered (inclusive).
    pub start: Pos,
    /// First position after the range (exclusive).
    pub end: Pos,
}

impl Range {
    /// Create a range from its parts.
    pub fn new(filename: Arc<str>, start: Pos, end: Pos) -> Self {
        debug_assert!(start.byte <= end.byte);
        Self {
            filename,
            start,
            end,
        }
    }

    /// The span from the start of `a` to the end of `b`.
    pub fn between(a: &Range, b: &Range) -> Range {
        Range {
            filename: a.filename.clone(),
            start: a.start,
            end: b.end,
        }
    }

    /// Length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.end.byte - self.start.byte
    }

    /// Whether this range covers no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start.byte == self.end.byte
    }

    /// A zero-length range at the start of this one.
    pub fn empty_at_start(&self) -> Range {
        Range {
            filename: self.filename.clone(),
            start: self.start,
            end: self.start,
        }
    }

    /// A zero-length range at the end of this one.
    pub fn empty_at_end(&self) -> Range {
        Range {
            filename: self.filename.clone(),
            start: self.end,
            end: self.end,
        }
    }

    /// Whether the given absolute byte offset falls within this range.
    pub fn contains_offset(&self, offset: usize) -> bool {
        offset >= self.start.byte && offset < self.end.byte
    }

    /// Whether the two ranges share at least one byte of the same file.
    pub fn overlaps(&self, other: &Range) -> bool {
        self.filename == other.filename
            && self.start.byte < other.end.byte
            && other.start.byte < self.end.byte
    }

    /// Get the bytes this range covers from the whole file buffer.
    #[inline]
    pub fn slice<'a>(&self, src: &'a [u8]) -> &'a [u8] {
        &src[self.start.byte..self.end.byte]
    }
}

impl From<&Range> for std::ops::Range<usize> {
    fn from(range: &Range) -> Self {
        range.start.byte..range.end.byte
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start.line == self.end.line {
            write!(
                f,
                "{}:{},{}-{}",
                self.filename, self.start.line, self.start.column, self.end.column
            )
        } else {
            write!(f, "{}:{}-{}", self.filename, self.start, self.end)
        }
    }
}

/// Length of the UTF-8 encoded character at the start of `bytes`, if the
/// bytes there are well-formed.
pub(crate) fn utf8_char_len(bytes: &[u8]) -> Option<usize> {
    let len = match *bytes.first()? {
        0x00..=0x7F => 1,
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => return None,
    };
    let chunk = bytes.get(..len)?;
    std::str::from_utf8(chunk).ok().map(|_| len)
}

/// Decode the character at the start of `bytes`, with its encoded length.
pub(crate) fn decode_char(bytes: &[u8]) -> Option<(char, usize)> {
    let len = utf8_char_len(bytes)?;
    let c = std::str::from_utf8(&bytes[..len]).ok()?.chars().next()?;
    Some((c, len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_counts_lines_and_columns() {
        let src = b"ab\ncd";
        let pos = Pos::START.advance(src, 4);
        assert_eq!(pos, Pos::new(4, 2, 2));
    }

    #[test]
    fn advance_treats_crlf_as_one_line_break() {
        let src = b"a\r\nb";
        assert_eq!(Pos::START.advance(src, 3), Pos::new(3, 2, 1));
        assert_eq!(Pos::START.advance(src, 4), Pos::new(4, 2, 2));
    }

    #[test]
    fn lone_carriage_return_is_not_a_line_break() {
        let src = b"a\rb";
        assert_eq!(Pos::START.advance(src, 3), Pos::new(3, 1, 4));
    }

    #[test]
    fn multibyte_characters_count_one_column() {
        let src = "é🌻x".as_bytes();
        assert_eq!(Pos::START.advance(src, src.len()), Pos::new(7, 1, 4));
    }

    #[test]
    fn invalid_bytes_count_one_column_each() {
        let src = [0x80, 0x80];
        assert_eq!(Pos::START.advance(&src, 2), Pos::new(2, 1, 3));
    }

    #[test]
    #[should_panic(expected = "backwards")]
    fn advancing_backwards_panics() {
        let src = b"abc";
        let pos = Pos::START.advance(src, 2);
        pos.advance(src, 1);
    }

    #[test]
    fn range_between_and_display() {
        let file: Arc<str> = Arc::from("main.hcl");
        let a = Range::new(file.clone(), Pos::new(0, 1, 1), Pos::new(3, 1, 4));
        let b = Range::new(file, Pos::new(10, 2, 3), Pos::new(12, 2, 5));
        let joined = Range::between(&a, &b);
        assert_eq!(joined.len(), 12);
        assert_eq!(joined.to_string(), "main.hcl:1,1-2,5");
        assert_eq!(a.to_string(), "main.hcl:1,1-4");
        assert!(joined.overlaps(&a));
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn empty_ranges() {
        let file: Arc<str> = Arc::from("x");
        let r = Range::new(file, Pos::new(2, 1, 3), Pos::new(5, 1, 6));
        assert!(r.empty_at_start().is_empty());
        assert_eq!(r.empty_at_end().start, r.end);
        assert!(r.contains_offset(2));
        assert!(!r.contains_offset(5));
    }
}
