//! Decoding the text of literal tokens.

use hcl_tokenizer::{Range, Token, TokenType, scan_string_literal};

use crate::{Diagnostic, Diagnostics};

/// Decode a `QuotedLit` or `StringLit` token into its string value.
///
/// Backslash escapes are only recognized in quoted literals. In both kinds,
/// `$${` and `%%{` stand for a literal `${` and `%{`.
pub(crate) fn unescape_literal(tok: &Token<'_>) -> (String, Diagnostics) {
    let quoted = tok.kind == TokenType::QuotedLit;
    let mut out = String::with_capacity(tok.bytes.len());
    let mut diags = Diagnostics::new();
    let mut pos = tok.range.start;

    for piece in scan_string_literal(tok.bytes, quoted) {
        let start = pos;
        pos = pos.advance_over(piece);
        let range = Range::new(tok.range.filename.clone(), start, pos);

        match piece {
            b"$${" => out.push_str("${"),
            b"%%{" => out.push_str("%{"),
            [b'\\', rest @ ..] if quoted => match unescape(rest) {
                Ok(c) => out.push(c),
                Err(diag) => {
                    diags.push(diag.with_subject(range));
                    out.push_str(&String::from_utf8_lossy(piece));
                }
            },
            _ => out.push_str(&String::from_utf8_lossy(piece)),
        }
    }
    (out, diags)
}

/// Decode the part of an escape sequence after the backslash.
fn unescape(rest: &[u8]) -> Result<char, Diagnostic> {
    let invalid = |detail: String| Diagnostic::error("Invalid escape sequence", detail);

    let Some((&selector, digits)) = rest.split_first() else {
        return Err(invalid(
            "Backslash must be followed by an escape sequence selector character.".to_string(),
        ));
    };
    match selector {
        b'n' => Ok('\n'),
        b'r' => Ok('\r'),
        b't' => Ok('\t'),
        b'"' => Ok('"'),
        b'\\' => Ok('\\'),
        b'u' | b'U' => {
            let (want, name) = if selector == b'u' {
                (4, "four")
            } else {
                (8, "eight")
            };
            if digits.len() != want {
                return Err(invalid(format!(
                    "The \\{} escape sequence must be followed by {} hexadecimal digits.",
                    selector as char, name
                )));
            }
            let code = std::str::from_utf8(digits)
                .ok()
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .unwrap_or(u32::MAX);
            char::from_u32(code).ok_or_else(|| {
                Diagnostic::error(
                    "Invalid escaped character",
                    format!("Cannot encode character U+{:04x} in UTF-8.", code),
                )
            })
        }
        _ => {
            let text = String::from_utf8_lossy(rest);
            let symbol = text.chars().next().unwrap_or(char::REPLACEMENT_CHARACTER);
            Err(invalid(format!(
                "The symbol {:?} is not a valid escape sequence selector.",
                symbol
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hcl_tokenizer::{Pos, ScanMode, scan_tokens};

    fn decode(src: &str) -> (String, Diagnostics) {
        let tokens = scan_tokens(src.as_bytes(), "lit.hcl", Pos::START, ScanMode::Normal);
        let mut out = String::new();
        let mut diags = Diagnostics::new();
        for tok in tokens.iter().filter(|t| t.kind == TokenType::QuotedLit) {
            let (s, d) = unescape_literal(tok);
            out.push_str(&s);
            diags.extend(d);
        }
        (out, diags)
    }

    #[test]
    fn test_simple_escapes() {
        let (s, diags) = decode(r#""a\tb\n\"q\" \\""#);
        assert!(diags.is_empty());
        assert_eq!(s, "a\tb\n\"q\" \\");
    }

    #[test]
    fn test_unicode_escapes() {
        let (s, diags) = decode(r#""é\U0001F600""#);
        assert!(diags.is_empty());
        assert_eq!(s, "é😀");
    }

    #[test]
    fn test_escaped_template_sequences() {
        let (s, diags) = decode(r#""$${a} %%{b} $$c""#);
        assert!(diags.is_empty());
        assert_eq!(s, "${a} %{b} $$c");
    }

    #[test]
    fn test_invalid_escapes() {
        let (_, diags) = decode(r#""\q""#);
        assert_eq!(diags[0].summary, "Invalid escape sequence");
        assert_eq!(
            diags[0].detail,
            "The symbol 'q' is not a valid escape sequence selector."
        );
        let subject = diags[0].subject.as_ref().unwrap();
        assert_eq!((subject.start.byte, subject.end.byte), (1, 3));

        let (_, diags) = decode(r#""\u12""#);
        assert_eq!(
            diags[0].detail,
            "The \\u escape sequence must be followed by four hexadecimal digits."
        );

        let (_, diags) = decode(r#""\uD800""#);
        assert_eq!(diags[0].summary, "Invalid escaped character");
        assert_eq!(diags[0].detail, "Cannot encode character U+d800 in UTF-8.");
    }

    #[test]
    fn test_heredoc_text_keeps_backslashes() {
        let tokens = scan_tokens(b"<<EOT\na\\n\nEOT\n", "lit.hcl", Pos::START, ScanMode::Normal);
        let lit = tokens.iter().find(|t| t.kind == TokenType::StringLit).unwrap();
        assert_eq!(unescape_literal(lit).0, "a\\n\n");
    }
}
