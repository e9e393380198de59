//! Scanner for the HCL native syntax.

use std::sync::Arc;

use tracing::trace;

use crate::pos::{decode_char, utf8_char_len};
use crate::{Pos, Range, Token, TokenType};

const BOM: &[u8] = b"\xEF\xBB\xBF";

/// What kind of input the scanner starts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanMode {
    /// Full configuration syntax: bodies, blocks and expressions.
    #[default]
    Normal,
    /// A bare template: literal text with `${ }` and `%{ }` sequences.
    Template,
}

/// Scan a whole buffer into tokens.
///
/// The returned tokens cover every byte of `src` (except a leading BOM) with no
/// gaps, and the last token is always the only [`TokenType::Eof`].
pub fn scan_tokens<'src>(
    src: &'src [u8],
    filename: &str,
    start: Pos,
    mode: ScanMode,
) -> Vec<Token<'src>> {
    Scanner::new(src, filename, start, mode).collect()
}

/// One level of the scanner's context stack.
#[derive(Debug, Clone, Copy)]
enum Context<'src> {
    /// Top level of a configuration file.
    Main,
    /// Top level of a bare template.
    Template,
    /// Between the quotes of a quoted template.
    Quoted,
    /// Inside a heredoc body.
    Heredoc {
        marker: &'src [u8],
        /// Whether the next byte begins a line, where a closing marker may appear.
        line_start: bool,
    },
    /// Inside `${ ... }` or `%{ ... }`, counting unclosed `{` so that the
    /// matching `}` can be recognized.
    Interp { braces: usize },
}

/// A scanner that produces tokens from HCL source bytes.
#[derive(Clone)]
pub struct Scanner<'src> {
    src: &'src [u8],
    filename: Arc<str>,
    /// Index into `src` of the next byte to scan.
    offset: usize,
    /// Position of the byte at `offset`.
    pos: Pos,
    contexts: Vec<Context<'src>>,
    finished: bool,
}

impl<'src> Scanner<'src> {
    /// Create a scanner over `src`, whose first byte is at `start`.
    pub fn new(src: &'src [u8], filename: &str, start: Pos, mode: ScanMode) -> Self {
        let mut offset = 0;
        let mut pos = start;
        if src.starts_with(BOM) {
            // skipped, but still counted in byte offsets
            offset = BOM.len();
            pos.byte += BOM.len();
        }
        let base = match mode {
            ScanMode::Normal => Context::Main,
            ScanMode::Template => Context::Template,
        };
        Self {
            src,
            filename: Arc::from(filename),
            offset,
            pos,
            contexts: vec![base],
            finished: false,
        }
    }

    /// Get the position of the next byte to be scanned.
    #[inline]
    pub fn position(&self) -> Pos {
        self.pos
    }

    /// Check if all input has been consumed.
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.offset >= self.src.len()
    }

    #[inline]
    fn rest(&self) -> &'src [u8] {
        &self.src[self.offset..]
    }

    fn token(&mut self, kind: TokenType, len: usize) -> Token<'src> {
        let bytes = &self.src[self.offset..self.offset + len];
        let start = self.pos;
        let end = start.advance_over(bytes);
        self.offset += len;
        self.pos = end;
        let range = Range::new(self.filename.clone(), start, end);
        trace!("Token {:?} at {}: {:?}", kind, range, String::from_utf8_lossy(bytes));
        Token::new(kind, range, bytes)
    }

    /// Get the next token. Once input is exhausted this keeps returning EOF.
    pub fn next_token(&mut self) -> Token<'src> {
        if self.is_eof() {
            return self.token(TokenType::Eof, 0);
        }
        match self.contexts.last().copied().unwrap_or(Context::Main) {
            Context::Main => self.scan_normal(None),
            Context::Interp { braces } => self.scan_normal(Some(braces)),
            Context::Quoted => self.scan_quoted(),
            Context::Heredoc { marker, line_start } => self.scan_heredoc(marker, line_start),
            Context::Template => self.scan_template_text(),
        }
    }

    /// Scan one token of expression/body syntax. `braces` is the number of
    /// unclosed braces when inside a template sequence.
    fn scan_normal(&mut self, braces: Option<usize>) -> Token<'src> {
        let rest = self.rest();
        let next = rest.get(1).copied();

        match rest[0] {
            b' ' => {
                let len = run_len(rest, |b| b == b' ');
                self.token(TokenType::Whitespace, len)
            }
            b'\t' => {
                let len = run_len(rest, |b| b == b'\t');
                self.token(TokenType::Tabs, len)
            }
            b'\n' => self.token(TokenType::Newline, 1),
            b'\r' if next == Some(b'\n') => self.token(TokenType::Newline, 2),

            b'#' => self.scan_line_comment(),
            b'/' if next == Some(b'/') => self.scan_line_comment(),
            b'/' if next == Some(b'*') => self.scan_block_comment(),
            b'/' => self.token(TokenType::Slash, 1),

            b'"' => {
                self.contexts.push(Context::Quoted);
                self.token(TokenType::OQuote, 1)
            }

            b'<' if next == Some(b'<') => match heredoc_header(rest) {
                Some((len, marker)) => {
                    self.contexts.push(Context::Heredoc {
                        marker,
                        line_start: true,
                    });
                    self.token(TokenType::OHeredoc, len)
                }
                None => self.token(TokenType::LessThan, 1),
            },
            b'<' if next == Some(b'=') => self.token(TokenType::LessThanEq, 2),
            b'<' => self.token(TokenType::LessThan, 1),
            b'>' if next == Some(b'=') => self.token(TokenType::GreaterThanEq, 2),
            b'>' => self.token(TokenType::GreaterThan, 1),

            b'=' => match next {
                Some(b'=') => self.token(TokenType::EqualOp, 2),
                Some(b'>') => self.token(TokenType::FatArrow, 2),
                _ => self.token(TokenType::Equal, 1),
            },
            b'!' if next == Some(b'=') => self.token(TokenType::NotEqual, 2),
            b'!' => self.token(TokenType::Bang, 1),
            b'&' if next == Some(b'&') => self.token(TokenType::And, 2),
            b'&' => self.token(TokenType::BitwiseAnd, 1),
            b'|' if next == Some(b'|') => self.token(TokenType::Or, 2),
            b'|' => self.token(TokenType::BitwiseOr, 1),
            b'^' => self.token(TokenType::BitwiseXor, 1),
            b'~' if braces == Some(0) && next == Some(b'}') => {
                self.contexts.pop();
                self.token(TokenType::TemplateSeqEnd, 2)
            }
            b'~' => self.token(TokenType::BitwiseNot, 1),
            b'*' if next == Some(b'*') => self.token(TokenType::StarStar, 2),
            b'*' => self.token(TokenType::Star, 1),
            b'+' => self.token(TokenType::Plus, 1),
            b'-' => self.token(TokenType::Minus, 1),
            b'%' => self.token(TokenType::Percent, 1),

            b'.' if rest.starts_with(b"...") => self.token(TokenType::Ellipsis, 3),
            b'.' => self.token(TokenType::Dot, 1),
            b',' => self.token(TokenType::Comma, 1),
            b'?' => self.token(TokenType::Question, 1),
            b':' => self.token(TokenType::Colon, 1),
            b';' => self.token(TokenType::Semicolon, 1),
            b'\'' => self.token(TokenType::Apostrophe, 1),
            b'`' => self.token(TokenType::Backtick, 1),

            b'{' => {
                if let Some(Context::Interp { braces }) = self.contexts.last_mut() {
                    *braces += 1;
                }
                self.token(TokenType::OBrace, 1)
            }
            b'}' => match braces {
                Some(0) => {
                    self.contexts.pop();
                    self.token(TokenType::TemplateSeqEnd, 1)
                }
                Some(_) => {
                    if let Some(Context::Interp { braces }) = self.contexts.last_mut() {
                        *braces -= 1;
                    }
                    self.token(TokenType::CBrace, 1)
                }
                None => self.token(TokenType::CBrace, 1),
            },
            b'[' => self.token(TokenType::OBrack, 1),
            b']' => self.token(TokenType::CBrack, 1),
            b'(' => self.token(TokenType::OParen, 1),
            b')' => self.token(TokenType::CParen, 1),

            b'0'..=b'9' => self.scan_number(),

            _ => self.scan_word(),
        }
    }

    /// `#` or `//` comment, up to and including the end of the line.
    fn scan_line_comment(&mut self) -> Token<'src> {
        let rest = self.rest();
        let len = match rest.iter().position(|&b| b == b'\n') {
            Some(i) => i + 1,
            None => rest.len(),
        };
        self.token(TokenType::Comment, len)
    }

    /// `/* ... */` comment. An unterminated comment runs to the end of input.
    fn scan_block_comment(&mut self) -> Token<'src> {
        let rest = self.rest();
        let len = match rest[2..].windows(2).position(|w| w == b"*/") {
            Some(i) => i + 4,
            None => rest.len(),
        };
        self.token(TokenType::Comment, len)
    }

    fn scan_number(&mut self) -> Token<'src> {
        let rest = self.rest();
        let is_digit = |b: Option<&u8>| b.is_some_and(|b| b.is_ascii_digit());

        let mut len = run_len(rest, |b| b.is_ascii_digit());
        if rest.get(len) == Some(&b'.') && is_digit(rest.get(len + 1)) {
            len += 1;
            len += run_len(&rest[len..], |b| b.is_ascii_digit());
        }
        if matches!(rest.get(len), Some(b'e' | b'E')) {
            let mut exp = len + 1;
            if matches!(rest.get(exp), Some(b'+' | b'-')) {
                exp += 1;
            }
            if is_digit(rest.get(exp)) {
                len = exp + run_len(&rest[exp..], |b| b.is_ascii_digit());
            }
        }
        self.token(TokenType::NumberLit, len)
    }

    /// An identifier, or a single character that cannot start one.
    fn scan_word(&mut self) -> Token<'src> {
        let rest = self.rest();
        match decode_char(rest) {
            None => self.token(TokenType::BadUtf8, 1),
            Some((c, first)) if is_ident_start(c) => {
                let mut len = first;
                while let Some((c, n)) = decode_char(&rest[len..]) {
                    if !is_ident_continue(c) {
                        break;
                    }
                    len += n;
                }
                self.token(TokenType::Ident, len)
            }
            Some((_, len)) => self.token(TokenType::Invalid, len),
        }
    }

    fn scan_quoted(&mut self) -> Token<'src> {
        match self.rest() {
            [b'"', ..] => {
                self.contexts.pop();
                self.token(TokenType::CQuote, 1)
            }
            [b'\n', ..] => self.token(TokenType::QuotedNewline, 1),
            [b'\r', b'\n', ..] => self.token(TokenType::QuotedNewline, 2),
            rest => {
                if let Some(token) = self.scan_template_sequence(TokenType::QuotedLit) {
                    return token;
                }
                match quoted_run_len(rest) {
                    0 => self.token(TokenType::BadUtf8, 1),
                    len => self.token(TokenType::QuotedLit, len),
                }
            }
        }
    }

    fn scan_heredoc(&mut self, marker: &'src [u8], line_start: bool) -> Token<'src> {
        let rest = self.rest();
        if line_start {
            let indent = run_len(rest, |b| b == b' ' || b == b'\t');
            let after = &rest[indent..];
            if let Some(tail) = after.strip_prefix(marker)
                && (tail.is_empty() || tail.starts_with(b"\n") || tail.starts_with(b"\r\n"))
            {
                self.contexts.pop();
                return self.token(TokenType::CHeredoc, indent + marker.len());
            }
        }

        self.set_line_start(false);
        if let Some(token) = self.scan_template_sequence(TokenType::StringLit) {
            return token;
        }
        match line_run_len(rest) {
            (0, _) => self.token(TokenType::BadUtf8, 1),
            (len, ends_line) => {
                self.set_line_start(ends_line);
                self.token(TokenType::StringLit, len)
            }
        }
    }

    fn scan_template_text(&mut self) -> Token<'src> {
        if let Some(token) = self.scan_template_sequence(TokenType::StringLit) {
            return token;
        }
        match line_run_len(self.rest()) {
            (0, _) => self.token(TokenType::BadUtf8, 1),
            (len, _) => self.token(TokenType::StringLit, len),
        }
    }

    /// Handle a `$` or `%` in literal text: either an escaped `$${`/`%%{`, the
    /// start of a template sequence, or a lone literal character.
    fn scan_template_sequence(&mut self, literal: TokenType) -> Option<Token<'src>> {
        let (kind, len) = match self.rest() {
            [b'$', b'$', b'{', ..] | [b'%', b'%', b'{', ..] => (literal, 3),
            [b'$', b'{', b'~', ..] => (TokenType::TemplateInterp, 3),
            [b'$', b'{', ..] => (TokenType::TemplateInterp, 2),
            [b'%', b'{', b'~', ..] => (TokenType::TemplateControl, 3),
            [b'%', b'{', ..] => (TokenType::TemplateControl, 2),
            [b'$' | b'%', ..] => (literal, 1),
            _ => return None,
        };
        if kind != literal {
            self.contexts.push(Context::Interp { braces: 0 });
        }
        Some(self.token(kind, len))
    }

    fn set_line_start(&mut self, value: bool) {
        if let Some(Context::Heredoc { line_start, .. }) = self.contexts.last_mut() {
            *line_start = value;
        }
    }
}

impl<'src> Iterator for Scanner<'src> {
    type Item = Token<'src>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        if token.kind == TokenType::Eof {
            self.finished = true;
        }
        Some(token)
    }
}

fn run_len(bytes: &[u8], pred: impl Fn(u8) -> bool) -> usize {
    bytes.iter().take_while(|&&b| pred(b)).count()
}

/// Recognize `<<MARKER\n` or `<<-MARKER\n`, returning the header length
/// (newline included) and the marker.
fn heredoc_header(rest: &[u8]) -> Option<(usize, &[u8])> {
    let mut i = 2;
    if rest.get(i) == Some(&b'-') {
        i += 1;
    }
    let marker_start = i;
    let (c, len) = decode_char(&rest[i..])?;
    if !is_ident_start(c) {
        return None;
    }
    i += len;
    while let Some((c, len)) = decode_char(&rest[i..]) {
        if !is_ident_continue(c) {
            break;
        }
        i += len;
    }
    let marker = &rest[marker_start..i];
    match &rest[i..] {
        [b'\n', ..] => Some((i + 1, marker)),
        [b'\r', b'\n', ..] => Some((i + 2, marker)),
        _ => None,
    }
}

/// Length of quoted literal text before the next quote, template
/// sequence candidate, newline, or invalid byte. Backslash escapes are kept
/// whole so that `\"` and `\$` stay inside the run.
fn quoted_run_len(rest: &[u8]) -> usize {
    let mut i = 0;
    while i < rest.len() {
        match rest[i] {
            b'"' | b'$' | b'%' | b'\n' => break,
            b'\r' if rest.get(i + 1) == Some(&b'\n') => break,
            b'\\' => {
                i += 1;
                match rest.get(i) {
                    None | Some(b'\n') => {}
                    Some(b'\r') if rest.get(i + 1) == Some(&b'\n') => {}
                    Some(_) => {
                        if let Some(n) = utf8_char_len(&rest[i..]) {
                            i += n;
                        }
                    }
                }
            }
            _ => match utf8_char_len(&rest[i..]) {
                Some(n) => i += n,
                None => break,
            },
        }
    }
    i
}

/// Length of unquoted literal text up to and including the end of the line,
/// stopping early before `$`, `%` or an invalid byte. Also reports whether the
/// run ended with a newline.
fn line_run_len(rest: &[u8]) -> (usize, bool) {
    let mut i = 0;
    while i < rest.len() {
        match rest[i] {
            b'$' | b'%' => return (i, false),
            b'\n' => return (i + 1, true),
            _ => match utf8_char_len(&rest[i..]) {
                Some(n) => i += n,
                None => return (i, false),
            },
        }
    }
    (i, false)
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || c == '-' || c.is_alphanumeric() || is_combining_mark(c)
}

fn is_combining_mark(c: char) -> bool {
    matches!(c,
        '\u{0300}'..='\u{036F}'
            | '\u{1AB0}'..='\u{1AFF}'
            | '\u{1DC0}'..='\u{1DFF}'
            | '\u{20D0}'..='\u{20FF}'
            | '\u{FE20}'..='\u{FE2F}')
}
