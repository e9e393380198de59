//! Recursive-descent parser for bodies, expressions and templates.

mod body;
mod expr;
mod literal;
mod peeker;
mod recovery;
mod template;


use hcl_tokenizer::{Range, Token, TokenType};
use tracing::trace;

use crate::{Diagnostic, Diagnostics, Expression};
use peeker::Peeker;

/// A parser over one scanned token stream.
///
/// After the first syntax error the parser enters recovery: it keeps going,
/// resynchronizing at brackets and newlines, but stops reporting the
/// follow-on errors that would only repeat the first one.
pub struct Parser<'src> {
    peeker: Peeker<'src>,
    recovery: bool,
}

impl<'src> Parser<'src> {
    /// Create a parser. `tokens` must be a complete stream as produced by
    /// [`hcl_tokenizer::scan_tokens`], ending with EOF.
    pub fn new(tokens: Vec<Token<'src>>) -> Self {
        Self {
            peeker: Peeker::new(tokens),
            recovery: false,
        }
    }

    /// Whether an earlier error has put the parser into recovery.
    pub fn is_recovering(&self) -> bool {
        self.recovery
    }

    /// Parse a whole expression that must consume the rest of the input.
    pub fn parse_expression_to_end(&mut self) -> (Expression, Diagnostics) {
        self.peeker.push_include_newlines(false);
        let (expr, mut diags) = self.parse_expression();
        let next = self.peeker.peek();
        if next.kind != TokenType::Eof && !self.recovery {
            diags.push(
                Diagnostic::error(
                    "Extra characters after expression",
                    "An expression was successfully parsed, but extra characters were found after it.",
                )
                .with_subject(next.range),
            );
        }
        self.peeker.pop_include_newlines();
        (expr, diags)
    }

    /// Parse a bare template that runs to the end of the input.
    pub fn parse_template_to_end(&mut self) -> (Expression, Diagnostics) {
        self.parse_template(TokenType::Eof, false)
    }

    fn peek(&self) -> Token<'src> {
        self.peeker.peek()
    }

    fn read(&mut self) -> Token<'src> {
        self.peeker.read()
    }

    fn prev_range(&self) -> Range {
        self.peeker.prev_range()
    }

    fn next_range(&self) -> Range {
        self.peeker.next_range()
    }

    fn set_recovery(&mut self) {
        if !self.recovery {
            trace!("Entering recovery at {}", self.next_range());
        }
        self.recovery = true;
    }
}
