//! Entry points for parsing source buffers.

use std::sync::Arc;

use hcl_tokenizer::{Pos, ScanMode, Token, TokenType, scan_tokens};
use tracing::debug;

use crate::{Diagnostics, Expression, File, Parser, check_invalid_tokens};

/// Options for scanning and parsing a source buffer.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Name reported in every range (default: empty)
    pub filename: String,

    /// Position of the first byte of the buffer (default: line 1, column 1)
    pub start: Pos,

    /// Report recognized-but-invalid tokens such as tabs and bitwise
    /// operators (default: true)
    pub check_invalid_tokens: bool,

    /// How [`ParseOptions::scan`] treats top-level text (default: Normal).
    /// The `parse_*` methods always pick the mode their grammar needs.
    pub mode: ScanMode,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            filename: String::new(),
            start: Pos::START,
            check_invalid_tokens: true,
            mode: ScanMode::Normal,
        }
    }
}

impl ParseOptions {
    /// Create new default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the filename used in ranges and diagnostics.
    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    /// Set the starting position, for buffers embedded in a larger file.
    pub fn start(mut self, start: Pos) -> Self {
        self.start = start;
        self
    }

    /// Turn the invalid-token checks on or off.
    pub fn check_invalid_tokens(mut self, check: bool) -> Self {
        self.check_invalid_tokens = check;
        self
    }

    /// Set the scan mode used by [`ParseOptions::scan`].
    pub fn mode(mut self, mode: ScanMode) -> Self {
        self.mode = mode;
        self
    }

    /// Scan `src` into tokens without parsing.
    pub fn scan<'src>(&self, src: &'src [u8]) -> Vec<Token<'src>> {
        scan_tokens(src, &self.filename, self.start, self.mode)
    }

    /// Parse a whole configuration file.
    pub fn parse_config(&self, src: &[u8]) -> (File, Diagnostics) {
        let (mut parser, mut diags) = self.parser(src, ScanMode::Normal);
        let (body, parse_diags) = parser.parse_body(TokenType::Eof);
        diags.extend(parse_diags);
        debug!(
            filename = %self.filename,
            attributes = body.attributes.len(),
            blocks = body.blocks.len(),
            diagnostics = diags.len(),
            "parsed config"
        );
        let file = File {
            body,
            bytes: Arc::from(src),
        };
        (file, diags)
    }

    /// Parse a standalone expression. Newlines inside it are insignificant.
    pub fn parse_expression(&self, src: &[u8]) -> (Expression, Diagnostics) {
        let (mut parser, mut diags) = self.parser(src, ScanMode::Normal);
        let (expr, parse_diags) = parser.parse_expression_to_end();
        diags.extend(parse_diags);
        debug!(filename = %self.filename, diagnostics = diags.len(), "parsed expression");
        (expr, diags)
    }

    /// Parse a standalone template, such as the contents of a template file.
    pub fn parse_template(&self, src: &[u8]) -> (Expression, Diagnostics) {
        let (mut parser, mut diags) = self.parser(src, ScanMode::Template);
        let (expr, parse_diags) = parser.parse_template_to_end();
        diags.extend(parse_diags);
        debug!(filename = %self.filename, diagnostics = diags.len(), "parsed template");
        (expr, diags)
    }

    fn parser<'src>(&self, src: &'src [u8], mode: ScanMode) -> (Parser<'src>, Diagnostics) {
        let tokens = scan_tokens(src, &self.filename, self.start, mode);
        let diags = if self.check_invalid_tokens {
            check_invalid_tokens(&tokens)
        } else {
            Diagnostics::new()
        };
        (Parser::new(tokens), diags)
    }
}

/// Parse a configuration file with default options.
pub fn parse_config(src: &[u8], filename: &str, start: Pos) -> (File, Diagnostics) {
    ParseOptions::new()
        .filename(filename)
        .start(start)
        .parse_config(src)
}

/// Parse a standalone expression with default options.
pub fn parse_expression(src: &[u8], filename: &str, start: Pos) -> (Expression, Diagnostics) {
    ParseOptions::new()
        .filename(filename)
        .start(start)
        .parse_expression(src)
}

/// Parse a standalone template with default options.
pub fn parse_template(src: &[u8], filename: &str, start: Pos) -> (Expression, Diagnostics) {
    ParseOptions::new()
        .filename(filename)
        .start(start)
        .parse_template(src)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = ParseOptions::new();
        assert!(opts.check_invalid_tokens);
        assert_eq!(opts.start, Pos::START);
        assert_eq!(opts.mode, ScanMode::Normal);
    }

    #[test]
    fn test_invalid_token_check_can_be_disabled() {
        let src = b"a = 1 ; \n";
        let (_, diags) = ParseOptions::new().filename("a.hcl").parse_config(src);
        assert!(diags.iter().any(|d| d.summary == "Invalid character"));

        let (_, diags) = ParseOptions::new()
            .check_invalid_tokens(false)
            .parse_config(src);
        assert!(diags.iter().all(|d| d.summary != "Invalid character"));
    }

    #[test]
    fn test_start_offsets_ranges() {
        let start = Pos::new(100, 5, 3);
        let (expr, diags) = ParseOptions::new()
            .filename("embedded.hcl")
            .start(start)
            .parse_expression(b"a + 1");
        assert!(diags.is_empty());
        let range = expr.range();
        assert_eq!(&*range.filename, "embedded.hcl");
        assert_eq!((range.start.byte, range.start.line, range.start.column), (100, 5, 3));
        assert_eq!(range.end.byte, 105);
    }

    #[test]
    fn test_file_owns_bytes() {
        let (file, _) = parse_config(b"a = 1\n", "f.hcl", Pos::START);
        assert_eq!(&*file.bytes, b"a = 1\n");
        let attr = file.body.attributes.get("a").unwrap();
        assert_eq!(attr.name_range.slice(&file.bytes), b"a");
    }

    #[test]
    fn test_scan_uses_mode() {
        let tokens = ParseOptions::new().mode(ScanMode::Template).scan(b"a ${b}");
        assert_eq!(tokens[0].kind, TokenType::StringLit);
    }
}
