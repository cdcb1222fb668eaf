//! Helpers for strings received from the mesh: single-line escaping for logs
//! and control-character scrubbing for the operator's terminal.

/// Escape a string for single-line logging:
/// - `\n` => `\\n`
/// - `\r` => `\\r`
/// - `\t` => `\\t`
/// - backslash => `\\\\`
/// - other control characters => `\xNN`
///
/// Very long strings are cut at 300 characters with an ellipsis.
pub fn escape_log(s: &str) -> String {
    const MAX_PREVIEW: usize = 300;
    let mut out = String::with_capacity(s.len().min(MAX_PREVIEW) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= MAX_PREVIEW {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                use std::fmt::Write;
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// Make untrusted text safe to print on a terminal. Control characters
/// (including ESC, so no ANSI sequences) and bidi overrides become U+FFFD.
/// Unlike [`escape_log`] the text is neither escaped nor shortened.
pub fn sanitize_display(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            c if c.is_control() => '\u{FFFD}',
            '\u{202A}'..='\u{202E}' | '\u{2066}'..='\u{2069}' => '\u{FFFD}',
            c => c,
        })
        .collect()
}

/// Escape and cut `input` to at most `max_bytes` of source text, never splitting a
/// UTF-8 sequence. Truncated output ends in `...`.
pub fn truncate_for_log(input: &str, max_bytes: usize) -> String {
    if input.len() <= max_bytes {
        return escape_log(input);
    }
    let mut cut = max_bytes.saturating_sub(3);
    while cut > 0 && !input.is_char_boundary(cut) {
        cut -= 1;
    }
    let mut out = escape_log(&input[..cut]);
    out.push_str("...");
    out
}

/// Lower-case hex of the first `max` bytes, for trace output of raw frames.
pub fn hex_snippet(data: &[u8], max: usize) -> String {
    data.iter()
        .take(max)
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_newlines_and_controls() {
        assert_eq!(escape_log("Line1\nLine2\r\tEnd"), "Line1\\nLine2\\r\\tEnd");
        assert_eq!(escape_log("bell\u{7}"), "bell\\x07");
    }

    #[test]
    fn display_scrubs_terminal_controls() {
        assert_eq!(sanitize_display("ok \u{1b}[2Jdone"), "ok \u{FFFD}[2Jdone");
        assert_eq!(sanitize_display("a\nb\tc"), "a\u{FFFD}b\u{FFFD}c");
        assert_eq!(sanitize_display("abc\u{202E}fed"), "abc\u{FFFD}fed");
        assert_eq!(sanitize_display(r"C:\path 🙂"), r"C:\path 🙂");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        // "🙂" is 4 bytes; max 5 leaves a cut target of 2, right before it
        assert_eq!(truncate_for_log("ab🙂cd", 5), "ab...");
        assert_eq!(truncate_for_log("hello", 10), "hello");
    }

    #[test]
    fn hex_snippet_limits_output() {
        assert_eq!(hex_snippet(&[0x94, 0xc3, 0x00, 0x05], 2), "94c3");
    }
}
