//! Splitting literal text into escape sequences and plain runs.

/// Split the bytes of a single literal token into pieces.
///
/// Plain text is returned in runs. Every sequence that needs special treatment
/// when decoding is returned as its own piece: `$${`, `%%{`, `$$`, `%%`, a lone `$`
/// or `%`, and the newline sequences `\n`, `\r` and `\r\n`. When `quoted` is set,
/// backslash escapes are split out too: `\uXXXX` takes up to four hex digits,
/// `\UXXXXXXXX` up to eight, and any other `\c` takes exactly one character.
pub fn scan_string_literal(bytes: &[u8], quoted: bool) -> Vec<&[u8]> {
    let mut pieces = Vec::new();
    let mut run_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let len = match &bytes[i..] {
            [b'$', b'$', b'{', ..] | [b'%', b'%', b'{', ..] => 3,
            [b'$', b'$', ..] | [b'%', b'%', ..] => 2,
            [b'$' | b'%', ..] => 1,
            [b'\r', b'\n', ..] => 2,
            [b'\r' | b'\n', ..] => 1,
            [b'\\', rest @ ..] if quoted => 1 + escape_len(rest),
            _ => {
                i += 1;
                continue;
            }
        };
        if run_start < i {
            pieces.push(&bytes[run_start..i]);
        }
        pieces.push(&bytes[i..i + len]);
        i += len;
        run_start = i;
    }

    if run_start < bytes.len() {
        pieces.push(&bytes[run_start..]);
    }
    pieces
}

/// Length of the escape selector and its payload following a backslash.
fn escape_len(rest: &[u8]) -> usize {
    match rest.first() {
        None => 0,
        Some(b'u') => 1 + hex_run(&rest[1..], 4),
        Some(b'U') => 1 + hex_run(&rest[1..], 8),
        Some(&b) => utf8_len(b).min(rest.len()),
    }
}

fn hex_run(bytes: &[u8], max: usize) -> usize {
    bytes
        .iter()
        .take(max)
        .take_while(|b| b.is_ascii_hexdigit())
        .count()
}

fn utf8_len(lead: u8) -> usize {
    match lead {
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(input: &str, quoted: bool) -> Vec<&str> {
        scan_string_literal(input.as_bytes(), quoted)
            .into_iter()
            .map(|p| std::str::from_utf8(p).unwrap())
            .collect()
    }

    fn check(input: &str, quoted: &[&str], unquoted: &[&str]) {
        assert_eq!(split(input, true), quoted, "quoted split of {input:?}");
        assert_eq!(split(input, false), unquoted, "unquoted split of {input:?}");
    }

    #[test]
    fn plain_text() {
        check("", &[], &[]);
        check("hello world", &["hello world"], &["hello world"]);
    }

    #[test]
    fn backslash_escapes_only_split_when_quoted() {
        check("hello\\nworld", &["hello", "\\n", "world"], &["hello\\nworld"]);
        check("hello\\🥁world", &["hello", "\\🥁", "world"], &["hello\\🥁world"]);
        check("hello\\", &["hello", "\\"], &["hello\\"]);
    }

    #[test]
    fn unicode_escapes_take_limited_hex_digits() {
        check("hello\\uabcdworld", &["hello", "\\uabcd", "world"], &["hello\\uabcdworld"]);
        check(
            "hello\\uabcdabcdworld",
            &["hello", "\\uabcd", "abcdworld"],
            &["hello\\uabcdabcdworld"],
        );
        check("hello\\uabcworld", &["hello", "\\uabc", "world"], &["hello\\uabcworld"]);
        check(
            "hello\\U012345670123world",
            &["hello", "\\U01234567", "0123world"],
            &["hello\\U012345670123world"],
        );
        check("hello\\Uworld", &["hello", "\\U", "world"], &["hello\\Uworld"]);
        check("hello\\u", &["hello", "\\u"], &["hello\\u"]);
    }

    #[test]
    fn template_escapes() {
        check("hello$${world}", &["hello", "$${", "world}"], &["hello", "$${", "world}"]);
        check("hello$$world", &["hello", "$$", "world"], &["hello", "$$", "world"]);
        check("hello$world", &["hello", "$", "world"], &["hello", "$", "world"]);
        check("hello%%{", &["hello", "%%{"], &["hello", "%%{"]);
        check("hello%", &["hello", "%"], &["hello", "%"]);
    }

    #[test]
    fn escaped_dollar() {
        check("hello\\${world}", &["hello", "\\$", "{world}"], &["hello\\", "$", "{world}"]);
        check("hello\\%{world}", &["hello", "\\%", "{world}"], &["hello\\", "%", "{world}"]);
    }

    #[test]
    fn newlines() {
        check("hello\nworld", &["hello", "\n", "world"], &["hello", "\n", "world"]);
        check("hello\rworld", &["hello", "\r", "world"], &["hello", "\r", "world"]);
        check("hello\r\nworld", &["hello", "\r\n", "world"], &["hello", "\r\n", "world"]);
    }
}
