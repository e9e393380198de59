//! Targeted diagnostics for tokens the scanner recognizes but the language rejects.

use hcl_tokenizer::{Token, TokenType};

use crate::{Diagnostic, Diagnostics};

/// Report every recognized-but-invalid token in a token stream.
///
/// Problems that tend to repeat throughout a file (tabs, bitwise operators and
/// so on) are capped per kind, so a file indented with tabs produces one
/// diagnostic rather than one per line.
pub fn check_invalid_tokens(tokens: &[Token<'_>]) -> Diagnostics {
    let mut diags = Diagnostics::new();

    let mut told_bitwise = 0;
    let mut told_pow = 0;
    let mut told_backtick = 0;
    let mut told_apostrophe = 0;
    let mut told_semicolon = 0;
    let mut told_tabs = 0;
    let mut told_bad_utf8 = 0;

    for tok in tokens {
        match tok.kind {
            TokenType::BitwiseAnd
            | TokenType::BitwiseOr
            | TokenType::BitwiseXor
            | TokenType::BitwiseNot => {
                if told_bitwise < 4 {
                    let suggestion = match tok.kind {
                        TokenType::BitwiseAnd => " Did you mean boolean AND (\"&&\")?",
                        TokenType::BitwiseOr => " Did you mean boolean OR (\"||\")?",
                        TokenType::BitwiseNot => " Did you mean boolean NOT (\"!\")?",
                        _ => "",
                    };
                    diags.push(
                        Diagnostic::error(
                            "Unsupported operator",
                            format!("Bitwise operators are not supported.{}", suggestion),
                        )
                        .with_subject(tok.range.clone()),
                    );
                    told_bitwise += 1;
                }
            }
            TokenType::StarStar => {
                if told_pow == 0 {
                    diags.push(
                        Diagnostic::error(
                            "Unsupported operator",
                            "\"**\" is not a supported operator. Exponentiation is not supported as an operator.",
                        )
                        .with_subject(tok.range.clone()),
                    );
                    told_pow += 1;
                }
            }
            TokenType::Backtick => {
                // Only every other backtick, so a `quoted` run is reported once.
                if told_backtick % 2 == 0 {
                    diags.push(
                        Diagnostic::error(
                            "Invalid character",
                            "The \"`\" character is not valid. To create a multi-line string, use the \"heredoc\" syntax, like \"<<EOT\".",
                        )
                        .with_subject(tok.range.clone()),
                    );
                }
                if told_backtick <= 2 {
                    told_backtick += 1;
                }
            }
            TokenType::Apostrophe => {
                if told_apostrophe % 2 == 0 {
                    diags.push(
                        Diagnostic::error(
                            "Invalid character",
                            "Single quotes are not valid. Use double quotes (\") to enclose strings.",
                        )
                        .with_subject(tok.range.clone()),
                    );
                }
                if told_apostrophe <= 2 {
                    told_apostrophe += 1;
                }
            }
            TokenType::Semicolon => {
                if told_semicolon == 0 {
                    diags.push(
                        Diagnostic::error(
                            "Invalid character",
                            "The \";\" character is not valid. Use newlines to separate arguments and blocks, and commas to separate items in collection values.",
                        )
                        .with_subject(tok.range.clone()),
                    );
                    told_semicolon += 1;
                }
            }
            TokenType::Tabs => {
                if told_tabs == 0 {
                    diags.push(
                        Diagnostic::error(
                            "Invalid character",
                            "Tab characters may not be used. The recommended indentation style is two spaces per indent.",
                        )
                        .with_subject(tok.range.clone()),
                    );
                    told_tabs += 1;
                }
            }
            TokenType::BadUtf8 => {
                if told_bad_utf8 == 0 {
                    diags.push(
                        Diagnostic::error(
                            "Invalid character encoding",
                            "All input files must be UTF-8 encoded. Ensure that UTF-8 encoding is selected in your editor.",
                        )
                        .with_subject(tok.range.clone()),
                    );
                    told_bad_utf8 += 1;
                }
            }
            TokenType::QuotedNewline => {
                diags.push(
                    Diagnostic::error(
                        "Invalid multi-line string",
                        "Quoted strings may not be split over multiple lines. To produce a multi-line string, either use the \\n escape to represent a newline character or use the \"heredoc\" multi-line template syntax.",
                    )
                    .with_subject(tok.range.clone()),
                );
            }
            TokenType::Invalid => {
                let detail = if is_curly_quote(tok.bytes) {
                    "\"Curly quotes\" are not valid here. These can sometimes be inadvertently introduced when sharing code via documents or discussion forums. It might help to replace the character with a \"straight quote\"."
                } else {
                    "This character is not used within the language."
                };
                diags.push(
                    Diagnostic::error("Invalid character", detail).with_subject(tok.range.clone()),
                );
            }
            TokenType::Comment => {
                if tok.bytes.starts_with(b"/*") && (tok.bytes.len() < 4 || !tok.bytes.ends_with(b"*/"))
                {
                    diags.push(
                        Diagnostic::error(
                            "Unterminated comment",
                            "There is no corresponding \"*/\" marker to end this comment.",
                        )
                        .with_subject(tok.range.clone()),
                    );
                }
            }
            _ => {}
        }
    }

    diags
}

fn is_curly_quote(bytes: &[u8]) -> bool {
    bytes == "\u{201C}".as_bytes() || bytes == "\u{201D}".as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hcl_tokenizer::{Pos, ScanMode, scan_tokens};

    fn check(src: &str) -> Vec<(String, String)> {
        let tokens = scan_tokens(src.as_bytes(), "test.hcl", Pos::START, ScanMode::Normal);
        check_invalid_tokens(&tokens)
            .into_iter()
            .map(|d| (d.summary, d.detail))
            .collect()
    }

    #[test]
    fn test_clean_input_has_no_diagnostics() {
        assert!(check("a = b && c\n/* fine */\n").is_empty());
    }

    #[test]
    fn test_bitwise_capped_at_four() {
        let diags = check("a = b & c | d & e & f & g\n");
        assert_eq!(diags.len(), 4);
        assert_eq!(
            diags[0].1,
            "Bitwise operators are not supported. Did you mean boolean AND (\"&&\")?"
        );
        assert_eq!(
            diags[1].1,
            "Bitwise operators are not supported. Did you mean boolean OR (\"||\")?"
        );
    }

    #[test]
    fn test_tabs_reported_once() {
        let diags = check("a {\n\tb = 1\n\tc = 2\n}\n");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].0, "Invalid character");
        assert!(diags[0].1.starts_with("Tab characters may not be used."));
    }

    #[test]
    fn test_backticks_reported_per_pair() {
        let diags = check("a = `x`\nb = `y`\nc = `z`\n");
        assert_eq!(diags.len(), 2);
    }

    #[test]
    fn test_semicolon_and_pow_once() {
        let diags = check("a = 1; b = 2;\nc = d ** e ** f\n");
        let summaries: Vec<&str> = diags.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(summaries, vec!["Invalid character", "Unsupported operator"]);
    }

    #[test]
    fn test_curly_quotes_get_specific_advice() {
        let diags = check("a = \u{201C}b\u{201D}\n");
        assert_eq!(diags.len(), 2);
        assert!(diags[0].1.starts_with("\"Curly quotes\" are not valid here."));
    }

    #[test]
    fn test_unterminated_block_comment() {
        let diags = check("a = 1 /* never closed");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].0, "Unterminated comment");
    }

    #[test]
    fn test_every_quoted_newline_reported() {
        let diags = check("a = \"x\ny\"\nb = \"p\nq\"\n");
        let count = diags
            .iter()
            .filter(|(s, _)| s == "Invalid multi-line string")
            .count();
        assert_eq!(count, 2);
    }
}
