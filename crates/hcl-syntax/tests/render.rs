use hcl_syntax::{ParseOptions, Pos, Severity, parse_config};

fn plain(rendered: String) -> String {
    String::from_utf8(strip_ansi_escapes::strip(rendered.as_bytes())).unwrap()
}

#[test]
fn rendered_report_shows_source_and_message() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("hcl_syntax=debug")
        .with_test_writer()
        .try_init();

    let src = "name = \"a\"\nname = \"b\"\n";
    let (_, diags) = parse_config(src.as_bytes(), "dup.hcl", Pos::START);
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].severity, Severity::Error);

    let report = plain(diags.render(src));
    assert!(report.contains("Attribute redefined"), "{report}");
    assert!(report.contains("dup.hcl"), "{report}");
    assert!(report.contains("name = \"b\""), "{report}");
}

#[test]
fn invalid_tokens_come_first() {
    let src = "a = 1 & 2\n";
    let (_, diags) = ParseOptions::new().filename("bits.hcl").parse_config(src.as_bytes());
    assert!(diags.len() >= 2, "{diags}");
    assert_eq!(diags[0].summary, "Unsupported operator");

    let report = plain(diags.render(src));
    assert!(report.contains("Unsupported operator"), "{report}");
}
