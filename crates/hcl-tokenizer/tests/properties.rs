use hcl_tokenizer::{Pos, ScanMode, Token, TokenType, scan_tokens};
use proptest::prelude::*;

fn check_stream(src: &[u8], tokens: &[Token<'_>]) {
    // exactly one EOF, at the very end, zero-length
    let eofs = tokens.iter().filter(|t| t.kind == TokenType::Eof).count();
    assert_eq!(eofs, 1);
    let last = tokens.last().unwrap();
    assert_eq!(last.kind, TokenType::Eof);
    assert!(last.range.is_empty());
    assert_eq!(last.range.start.byte, src.len());

    // no gaps and no overlaps
    for pair in tokens.windows(2) {
        assert_eq!(pair[0].range.end, pair[1].range.start);
    }

    // concatenation reconstructs the input, minus a leading BOM
    let rebuilt: Vec<u8> = tokens.iter().flat_map(|t| t.bytes.iter().copied()).collect();
    let expected = src.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(src);
    assert_eq!(rebuilt, expected);
}

proptest! {
    #[test]
    fn scanning_arbitrary_bytes_is_lossless(src in prop::collection::vec(any::<u8>(), 0..200)) {
        let tokens = scan_tokens(&src, "fuzz.hcl", Pos::START, ScanMode::Normal);
        check_stream(&src, &tokens);
    }

    #[test]
    fn scanning_hcl_like_text_is_lossless(
        src in prop::string::string_regex(r#"([a-z0-9 \t\n{}\[\]()"$%~=.,#*/<>!&|-]|<<EOT\n|\nEOT\n|\$\{|%\{|~\})*"#).unwrap()
    ) {
        let tokens = scan_tokens(src.as_bytes(), "fuzz.hcl", Pos::START, ScanMode::Normal);
        check_stream(src.as_bytes(), &tokens);
    }

    #[test]
    fn template_mode_is_lossless(src in "[a-z ${}%~\n\"]*") {
        let tokens = scan_tokens(src.as_bytes(), "fuzz.tmpl", Pos::START, ScanMode::Template);
        check_stream(src.as_bytes(), &tokens);
    }
}

#[test]
fn leading_bom_is_not_part_of_any_token() {
    let src = b"\xEF\xBB\xBFa = 1\n";
    let tokens = scan_tokens(src, "bom.hcl", Pos::START, ScanMode::Normal);
    check_stream(src, &tokens);
    assert_eq!(tokens[0].kind, TokenType::Ident);
    assert_eq!(tokens[0].range.start, Pos::new(3, 1, 1));
}

#[test]
fn nonzero_start_position_is_respected() {
    let start = Pos::new(100, 7, 5);
    let tokens = scan_tokens(b"a\nb", "embedded.hcl", start, ScanMode::Normal);
    assert_eq!(tokens[0].range.start, start);
    assert_eq!(tokens[2].range.start, Pos::new(102, 8, 1));
}

#[test]
fn three_levels_of_nested_interpolation_balance() {
    let src = r#""${ "${ "${ a { } }" }" }""#;
    let kinds: Vec<TokenType> = scan_tokens(src.as_bytes(), "nest.hcl", Pos::START, ScanMode::Normal)
        .into_iter()
        .map(|t| t.kind)
        .filter(|k| *k != TokenType::Whitespace)
        .collect();

    use TokenType::*;
    assert_eq!(
        kinds,
        vec![
            OQuote,
            TemplateInterp,
            OQuote,
            TemplateInterp,
            OQuote,
            TemplateInterp,
            Ident,
            OBrace,
            CBrace,
            TemplateSeqEnd,
            CQuote,
            TemplateSeqEnd,
            CQuote,
            TemplateSeqEnd,
            CQuote,
            Eof,
        ]
    );
}

#[test]
fn interpolation_with_braces_balances() {
    use TokenType::*;
    let kinds: Vec<TokenType> = scan_tokens(br#""${ a { } }""#, "t.hcl", Pos::START, ScanMode::Normal)
        .into_iter()
        .map(|t| t.kind)
        .filter(|k| *k != TokenType::Whitespace)
        .collect();
    assert_eq!(
        kinds,
        vec![OQuote, TemplateInterp, Ident, OBrace, CBrace, TemplateSeqEnd, CQuote, Eof]
    );
}

#[test]
fn escaped_interpolation_never_opens_a_sequence() {
    let tokens = scan_tokens(br#""$${world}""#, "t.hcl", Pos::START, ScanMode::Normal);
    assert!(tokens.iter().all(|t| t.kind != TokenType::TemplateInterp));
    assert!(tokens.iter().any(|t| t.kind == TokenType::QuotedLit && t.bytes == b"$${"));
}
