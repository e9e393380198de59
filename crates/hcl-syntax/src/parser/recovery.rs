//! Resynchronizing after a syntax error.

use hcl_tokenizer::{Token, TokenType};
use tracing::trace;

use super::Parser;

impl<'src> Parser<'src> {
    /// Skip tokens until `end` closes the bracket that was open when the
    /// error happened, or until EOF. Returns the last token read.
    pub(super) fn recover(&mut self, end: TokenType) -> Token<'src> {
        self.set_recovery();
        let start = end.opposite_bracket();
        let mut nest = 0usize;
        loop {
            let tok = self.read();
            let mut kind = tok.kind;
            if end == TokenType::TemplateSeqEnd && kind == TokenType::TemplateControl {
                // both openers pair with the same closer
                kind = TokenType::TemplateInterp;
            }
            if Some(kind) == start && kind != end {
                nest += 1;
            } else if kind == end {
                if nest == 0 {
                    trace!("Recovered at {:?} {}", kind, tok.range);
                    return tok;
                }
                nest -= 1;
            } else if kind == TokenType::Eof {
                return tok;
            }
        }
    }

    /// Skip over the bracketed sequence that starts with the next token.
    pub(super) fn recover_over(&mut self, start: TokenType) {
        self.read();
        if let Some(end) = start.opposite_bracket() {
            self.recover(end);
        }
    }

    /// Skip to the end of the current body item: the next newline that is
    /// not inside any bracket, or EOF.
    pub(super) fn recover_after_body_item(&mut self) {
        self.set_recovery();
        let mut open: Vec<TokenType> = Vec::new();
        loop {
            let tok = self.read();
            match tok.kind {
                TokenType::Newline if open.is_empty() => break,
                TokenType::Eof => break,
                TokenType::OBrace
                | TokenType::OBrack
                | TokenType::OParen
                | TokenType::OQuote
                | TokenType::OHeredoc
                | TokenType::TemplateInterp
                | TokenType::TemplateControl => open.push(tok.kind),
                TokenType::CBrace
                | TokenType::CBrack
                | TokenType::CParen
                | TokenType::CQuote
                | TokenType::CHeredoc => {
                    let opener = tok.kind.opposite_bracket();
                    pop_until(&mut open, |ty| Some(ty) == opener);
                }
                TokenType::TemplateSeqEnd => pop_until(&mut open, |ty| {
                    matches!(ty, TokenType::TemplateInterp | TokenType::TemplateControl)
                }),
                _ => {}
            }
        }
        trace!("Recovered after body item at {}", self.prev_range());
    }
}

/// Pop brackets until one matching `is_opener` has been removed.
fn pop_until(open: &mut Vec<TokenType>, is_opener: impl Fn(TokenType) -> bool) {
    while let Some(top) = open.pop() {
        if is_opener(top) {
            break;
        }
    }
}
