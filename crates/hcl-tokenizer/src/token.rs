//! Token types for the HCL scanner.

use std::fmt;

use crate::Range;

/// The type of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    // Brackets
    /// `{`
    OBrace,
    /// `}`
    CBrace,
    /// `[`
    OBrack,
    /// `]`
    CBrack,
    /// `(`
    OParen,
    /// `)`
    CParen,
    /// Opening `"` of a quoted template
    OQuote,
    /// Closing `"` of a quoted template
    CQuote,
    /// `<<MARKER` or `<<-MARKER`, including the newline that follows
    OHeredoc,
    /// The closing marker of a heredoc, including leading indentation
    CHeredoc,

    // Operators
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `%`
    Percent,
    /// `=`
    Equal,
    /// `==`
    EqualOp,
    /// `!=`
    NotEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessThanEq,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanEq,
    /// `&&`
    And,
    /// `||`
    Or,
    /// `!`
    Bang,

    // Punctuation
    /// `.`
    Dot,
    /// `,`
    Comma,
    /// `...`
    Ellipsis,
    /// `=>`
    FatArrow,
    /// `?`
    Question,
    /// `:`
    Colon,

    // Templates
    /// `${` or `${~`
    TemplateInterp,
    /// `%{` or `%{~`
    TemplateControl,
    /// `}` or `~}` closing an interpolation or directive
    TemplateSeqEnd,

    // Literals
    /// Literal text inside a quoted template, may contain escapes
    QuotedLit,
    /// Literal text in a heredoc or bare template, cannot contain escapes
    StringLit,
    /// Decimal number
    NumberLit,
    /// Identifier or keyword
    Ident,

    // Trivia
    /// `#` or `//` line comment (including its newline) or `/* */` block comment
    Comment,
    /// `\n` or `\r\n`
    Newline,
    /// A run of spaces
    Whitespace,
    /// End of input (always zero-length)
    Eof,

    // Recognized but not valid in any context
    /// `&`
    BitwiseAnd,
    /// `|`
    BitwiseOr,
    /// `~`
    BitwiseNot,
    /// `^`
    BitwiseXor,
    /// `**`
    StarStar,
    /// `'`
    Apostrophe,
    /// `` ` ``
    Backtick,
    /// `;`
    Semicolon,
    /// A run of tab characters
    Tabs,
    /// A well-formed character with no meaning here
    Invalid,
    /// A single byte that is not part of valid UTF-8
    BadUtf8,
    /// A raw newline inside a quoted template
    QuotedNewline,
}

impl TokenType {
    /// Whether this token is trivia the parser never sees directly.
    pub fn is_trivia(&self) -> bool {
        matches!(self, TokenType::Whitespace | TokenType::Comment)
    }

    /// Whether this token type is only ever produced to be reported as an error.
    pub fn is_invalid(&self) -> bool {
        matches!(
            self,
            TokenType::BitwiseAnd
                | TokenType::BitwiseOr
                | TokenType::BitwiseNot
                | TokenType::BitwiseXor
                | TokenType::StarStar
                | TokenType::Apostrophe
                | TokenType::Backtick
                | TokenType::Semicolon
                | TokenType::Tabs
                | TokenType::Invalid
                | TokenType::BadUtf8
                | TokenType::QuotedNewline
        )
    }

    /// The bracket type that closes (or opens) this one, if it is a bracket.
    pub fn opposite_bracket(&self) -> Option<TokenType> {
        Some(match self {
            TokenType::OBrace => TokenType::CBrace,
            TokenType::CBrace => TokenType::OBrace,
            TokenType::OBrack => TokenType::CBrack,
            TokenType::CBrack => TokenType::OBrack,
            TokenType::OParen => TokenType::CParen,
            TokenType::CParen => TokenType::OParen,
            TokenType::OQuote => TokenType::CQuote,
            TokenType::CQuote => TokenType::OQuote,
            TokenType::OHeredoc => TokenType::CHeredoc,
            TokenType::CHeredoc => TokenType::OHeredoc,
            TokenType::TemplateInterp | TokenType::TemplateControl => TokenType::TemplateSeqEnd,
            TokenType::TemplateSeqEnd => TokenType::TemplateInterp,
            _ => return None,
        })
    }

    /// A short human-readable description, for use in diagnostics.
    pub fn description(&self) -> &'static str {
        match self {
            TokenType::OBrace => "open curly brace",
            TokenType::CBrace => "close curly brace",
            TokenType::OBrack => "open square bracket",
            TokenType::CBrack => "close square bracket",
            TokenType::OParen => "open parenthesis",
            TokenType::CParen => "close parenthesis",
            TokenType::OQuote => "open quote",
            TokenType::CQuote => "close quote",
            TokenType::OHeredoc => "heredoc introducer",
            TokenType::CHeredoc => "heredoc terminator",
            TokenType::Star => "star",
            TokenType::Slash => "slash",
            TokenType::Plus => "plus sign",
            TokenType::Minus => "minus sign",
            TokenType::Percent => "percent sign",
            TokenType::Equal => "equals sign",
            TokenType::EqualOp => "equality operator",
            TokenType::NotEqual => "inequality operator",
            TokenType::LessThan => "less-than operator",
            TokenType::LessThanEq => "less-than-or-equal operator",
            TokenType::GreaterThan => "greater-than operator",
            TokenType::GreaterThanEq => "greater-than-or-equal operator",
            TokenType::And => "logical AND operator",
            TokenType::Or => "logical OR operator",
            TokenType::Bang => "logical NOT operator",
            TokenType::Dot => "dot",
            TokenType::Comma => "comma",
            TokenType::Ellipsis => "ellipsis",
            TokenType::FatArrow => "fat arrow",
            TokenType::Question => "question mark",
            TokenType::Colon => "colon",
            TokenType::TemplateInterp => "template interpolation introducer",
            TokenType::TemplateControl => "template directive introducer",
            TokenType::TemplateSeqEnd => "template sequence end",
            TokenType::QuotedLit => "quoted string literal",
            TokenType::StringLit => "string literal",
            TokenType::NumberLit => "number literal",
            TokenType::Ident => "identifier",
            TokenType::Comment => "comment",
            TokenType::Newline => "newline",
            TokenType::Whitespace => "whitespace",
            TokenType::Eof => "end of file",
            TokenType::BitwiseAnd => "bitwise AND operator",
            TokenType::BitwiseOr => "bitwise OR operator",
            TokenType::BitwiseNot => "bitwise NOT operator",
            TokenType::BitwiseXor => "bitwise XOR operator",
            TokenType::StarStar => "exponentiation operator",
            TokenType::Apostrophe => "apostrophe",
            TokenType::Backtick => "backtick",
            TokenType::Semicolon => "semicolon",
            TokenType::Tabs => "tab",
            TokenType::Invalid => "invalid character",
            TokenType::BadUtf8 => "invalid UTF-8 byte",
            TokenType::QuotedNewline => "newline in quoted string",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A token with its type, range, and source bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'src> {
    /// The type of token.
    pub kind: TokenType,
    /// Where the token is in the source.
    pub range: Range,
    /// The bytes the token covers.
    pub bytes: &'src [u8],
}

impl<'src> Token<'src> {
    /// Create a new token.
    pub fn new(kind: TokenType, range: Range, bytes: &'src [u8]) -> Self {
        Self { kind, range, bytes }
    }

    /// The token's bytes as text, replacing invalid UTF-8.
    pub fn text(&self) -> std::borrow::Cow<'src, str> {
        String::from_utf8_lossy(self.bytes)
    }

    /// Whether this is an identifier spelled exactly `keyword`.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenType::Ident && self.bytes == keyword.as_bytes()
    }
}
