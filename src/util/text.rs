use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const ELLIPSIS: &str = "...";

/// Prepare feed-supplied text for a single terminal line.
///
/// Drops ANSI escape sequences and C0/DEL control characters, and folds
/// line breaks and tabs into single spaces. Clean input is returned borrowed.
pub fn sanitize_line(s: &str) -> Cow<'_, str> {
    if !s.chars().any(|c| c.is_control()) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\x1b' => match chars.peek() {
                // CSI: parameters until a final byte in 0x40..=0x7E
                Some('[') => {
                    chars.next();
                    for n in chars.by_ref() {
                        if ('\x40'..='\x7e').contains(&n) {
                            break;
                        }
                    }
                }
                // OSC: until BEL or ESC \
                Some(']') => {
                    chars.next();
                    while let Some(n) = chars.next() {
                        if n == '\x07' {
                            break;
                        }
                        if n == '\x1b' && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => {}
            },
            '\n' | '\r' | '\t' => {
                if !out.ends_with(' ') {
                    out.push(' ');
                }
            }
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Truncate to `max_width` terminal columns, appending `...` when cut.
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if UnicodeWidthStr::width(s) <= max_width {
        return Cow::Borrowed(s);
    }
    if max_width <= ELLIPSIS.len() {
        return Cow::Owned(take_columns(s, max_width).to_owned());
    }
    let kept = take_columns(s, max_width - ELLIPSIS.len());
    Cow::Owned(format!("{kept}{ELLIPSIS}"))
}

/// Longest prefix of `s` that fits in `width` columns.
fn take_columns(s: &str, width: usize) -> &str {
    let mut used = 0;
    for (idx, c) in s.char_indices() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > width {
            return &s[..idx];
        }
        used += w;
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_borrowed() {
        let result = sanitize_line("Plain headline");
        assert!(matches!(result, Cow::Borrowed(_)));
    }

    #[test]
    fn test_strips_ansi_sequences() {
        assert_eq!(sanitize_line("\x1b[31mRed\x1b[0m alert"), "Red alert");
        assert_eq!(sanitize_line("\x1b]0;title\x07safe"), "safe");
        assert_eq!(sanitize_line("\x1b]0;title\x1b\\safe"), "safe");
    }

    #[test]
    fn test_folds_line_breaks() {
        assert_eq!(sanitize_line("one\r\ntwo\tthree"), "one two three");
    }

    #[test]
    fn test_drops_other_controls() {
        assert_eq!(sanitize_line("a\x00b\x7fc"), "abc");
    }

    #[test]
    fn test_truncate_fits() {
        assert_eq!(truncate_to_width("Short", 10), "Short");
        assert_eq!(truncate_to_width("12345", 5), "12345");
    }

    #[test]
    fn test_truncate_ascii() {
        assert_eq!(truncate_to_width("Hello World", 8), "Hello...");
    }

    #[test]
    fn test_truncate_wide_chars() {
        // Each CJK character is two columns
        assert_eq!(truncate_to_width("日本語テスト", 7), "日本...");
    }

    #[test]
    fn test_truncate_narrow_width() {
        assert_eq!(truncate_to_width("Testing", 0), "");
        assert_eq!(truncate_to_width("Testing", 3), "Tes");
    }
}
