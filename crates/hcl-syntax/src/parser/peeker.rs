//! Lookahead over a token stream, hiding trivia.

use hcl_tokenizer::{Range, Token, TokenType};

/// Wraps a scanned token stream for the parser.
///
/// Whitespace and tabs are always skipped. Comments are skipped too, but while
/// newlines are significant a line comment still ends its line, so it is
/// presented as a [`TokenType::Newline`] covering its final byte.
pub(crate) struct Peeker<'src> {
    tokens: Vec<Token<'src>>,
    next_index: usize,
    include_newlines: Vec<bool>,
    prev_range: Option<Range>,
}

impl<'src> Peeker<'src> {
    /// # Panics
    ///
    /// Panics if `tokens` is empty. Scanners always end the stream with EOF.
    pub fn new(tokens: Vec<Token<'src>>) -> Self {
        assert!(!tokens.is_empty(), "token stream must end with EOF");
        Self {
            tokens,
            next_index: 0,
            include_newlines: vec![true],
            prev_range: None,
        }
    }

    fn includes_newlines(&self) -> bool {
        self.include_newlines.last().copied().unwrap_or(true)
    }

    /// The next significant token and the index just past it.
    fn next_token(&self) -> (Token<'src>, usize) {
        let last = self.tokens.len() - 1;
        let mut i = self.next_index;
        while i < last {
            let tok = &self.tokens[i];
            match tok.kind {
                TokenType::Whitespace | TokenType::Tabs => {}
                TokenType::Comment => {
                    if self.includes_newlines() && tok.bytes.ends_with(b"\n") {
                        return (comment_newline(tok), i + 1);
                    }
                }
                TokenType::Newline if !self.includes_newlines() => {}
                _ => return (tok.clone(), i + 1),
            }
            i += 1;
        }
        (self.tokens[last].clone(), last)
    }

    pub fn peek(&self) -> Token<'src> {
        self.next_token().0
    }

    pub fn read(&mut self) -> Token<'src> {
        let (tok, next) = self.next_token();
        self.next_index = next;
        self.prev_range = Some(tok.range.clone());
        tok
    }

    pub fn next_range(&self) -> Range {
        self.peek().range
    }

    /// The range of the most recently read token, or of the next one if
    /// nothing has been read yet.
    pub fn prev_range(&self) -> Range {
        match &self.prev_range {
            Some(range) => range.clone(),
            None => self.next_range(),
        }
    }

    pub fn push_include_newlines(&mut self, include: bool) {
        self.include_newlines.push(include);
    }

    pub fn pop_include_newlines(&mut self) {
        debug_assert!(self.include_newlines.len() > 1, "unbalanced newline mode");
        self.include_newlines.pop();
    }
}

fn comment_newline<'src>(comment: &Token<'src>) -> Token<'src> {
    let split = comment.bytes.len() - 1;
    let start = comment.range.start.advance_over(&comment.bytes[..split]);
    let range = Range::new(comment.range.filename.clone(), start, comment.range.end);
    Token::new(TokenType::Newline, range, &comment.bytes[split..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use hcl_tokenizer::{Pos, ScanMode, scan_tokens};

    fn peeker(src: &str) -> Peeker<'_> {
        Peeker::new(scan_tokens(src.as_bytes(), "peek.hcl", Pos::START, ScanMode::Normal))
    }

    #[test]
    fn test_skips_whitespace_and_block_comments() {
        let mut p = peeker("a  /* x */ = 1");
        assert_eq!(p.read().kind, TokenType::Ident);
        assert_eq!(p.read().kind, TokenType::Equal);
        assert_eq!(p.read().kind, TokenType::NumberLit);
        assert_eq!(p.read().kind, TokenType::Eof);
        assert_eq!(p.read().kind, TokenType::Eof);
    }

    #[test]
    fn test_line_comment_ends_line() {
        let mut p = peeker("a # note\nb");
        p.read();
        let nl = p.read();
        assert_eq!(nl.kind, TokenType::Newline);
        assert_eq!(nl.range.start.byte, 8);
        assert_eq!(nl.range.end.byte, 9);
        assert_eq!(p.read().text(), "b");
    }

    #[test]
    fn test_newlines_can_be_hidden() {
        let mut p = peeker("a\n# c\n\nb");
        p.push_include_newlines(false);
        p.read();
        assert_eq!(p.peek().text(), "b");
        p.pop_include_newlines();
        assert_eq!(p.peek().kind, TokenType::Newline);
    }

    #[test]
    fn test_prev_range() {
        let mut p = peeker("ab cd");
        assert_eq!(p.prev_range().start.byte, 0);
        p.read();
        assert_eq!(p.prev_range().end.byte, 2);
        assert_eq!(p.next_range().start.byte, 3);
    }
}
