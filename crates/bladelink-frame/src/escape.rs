//! Value escaping.
//!
//! The device escapes structural characters inside parameter values with a
//! leading `/`. Both directions are a single left-to-right scan, so a slash
//! produced by one substitution is never re-examined by another.

/// Character that introduces an escape sequence.
pub const ESCAPE_MARKER: char = '/';

/// Characters escaped by [`escape`].
pub const ESCAPED_CHARS: [char; 5] = ['?', ':', '|', '<', '>'];

/// Characters escaped inside a framed parameter value.
///
/// Adds `,` to [`ESCAPED_CHARS`] so a value survives the parameter-list split.
const PARAM_VALUE_CHARS: [char; 6] = ['?', ':', '|', '<', '>', ','];

/// Characters that a `/` escapes when unescaping.
const UNESCAPABLE_CHARS: [char; 6] = PARAM_VALUE_CHARS;

/// Escape `? : | < >` with a leading `/`.
///
/// A literal `/` is copied through unchanged.
pub fn escape(value: &str) -> String {
    escape_with(value, &ESCAPED_CHARS)
}

/// Escape a value for the `KEY:VALUE` list of a frame.
pub(crate) fn escape_param_value(value: &str) -> String {
    escape_with(value, &PARAM_VALUE_CHARS)
}

fn escape_with(value: &str, chars: &[char]) -> String {
    let mut out = String::with_capacity(value.len() + value.len() / 4);
    for c in value.chars() {
        if chars.contains(&c) {
            out.push(ESCAPE_MARKER);
        }
        out.push(c);
    }
    out
}

/// `true` when a framed copy of `value` would be mis-split on the way back in:
/// an odd run of `/` before a `,` or at the very end.
pub(crate) fn has_dangling_marker(value: &str) -> bool {
    let mut slashes = 0usize;
    for c in value.chars() {
        if c == ESCAPE_MARKER {
            slashes += 1;
            continue;
        }
        if c == ',' && slashes % 2 == 1 {
            return true;
        }
        slashes = 0;
    }
    slashes % 2 == 1
}

/// Reverse [`escape`].
///
/// `/` followed by an escapable character yields that character. A `/`
/// followed by anything else (or at the end of input) is a literal slash.
pub fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ESCAPE_MARKER {
            if let Some(&next) = chars.peek() {
                if UNESCAPABLE_CHARS.contains(&next) {
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

/// Byte offset of the first `needle` not escaped by an odd run of `/`.
pub(crate) fn find_unescaped(s: &str, needle: char) -> Option<usize> {
    let mut slashes = 0usize;
    for (idx, c) in s.char_indices() {
        if c == needle && slashes % 2 == 0 {
            return Some(idx);
        }
        if c == ESCAPE_MARKER {
            slashes += 1;
        } else {
            slashes = 0;
        }
    }
    None
}

/// Split on every unescaped `sep`.
pub(crate) fn split_unescaped(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = s;
    while let Some(idx) = find_unescaped(rest, sep) {
        parts.push(&rest[..idx]);
        rest = &rest[idx + sep.len_utf8()..];
    }
    parts.push(rest);
    parts
}

/// Returns true if any of `chars` appears without an escaping `/`.
pub(crate) fn contains_unescaped(s: &str, chars: &[char]) -> bool {
    chars.iter().any(|&c| find_unescaped(s, c).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_each_structural_char() {
        assert_eq!(escape("mic|Joe"), "mic/|Joe");
        assert_eq!(escape("<mic>Joe"), "/<mic/>Joe");
        assert_eq!(escape("a:b?c"), "a/:b/?c");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn escape_does_not_double_escape_slash() {
        assert_eq!(escape("a/b"), "a/b");
        assert_eq!(escape("/:"), "//:");
    }

    #[test]
    fn escape_leaves_comma_alone() {
        assert_eq!(escape("1,2"), "1,2");
        assert_eq!(escape_param_value("1,2"), "1/,2");
    }

    #[test]
    fn unescapes_device_output() {
        assert_eq!(unescape("mic/:Bob"), "mic:Bob");
        assert_eq!(unescape("/<mic/>Joe"), "<mic>Joe");
        assert_eq!(unescape("1/,2"), "1,2");
    }

    #[test]
    fn unescape_treats_stray_slash_as_literal() {
        assert_eq!(unescape("a/b"), "a/b");
        assert_eq!(unescape("trailing/"), "trailing/");
        assert_eq!(unescape("//:"), "/:");
    }

    #[test]
    fn roundtrip_with_slashes_and_specials() {
        let values = [
            "",
            "/",
            "//",
            "/:",
            "a/|b",
            "?:|<>",
            "/?/:/|/</>",
            "x//y:z",
            "<<//>>",
        ];
        for v in values {
            assert_eq!(unescape(&escape(v)), v, "value {v:?}");
            assert_eq!(unescape(&escape_param_value(v)), v, "value {v:?}");
        }
    }

    #[test]
    fn dangling_marker_detects_odd_slash_runs() {
        assert!(has_dangling_marker("C:/"));
        assert!(has_dangling_marker("a/,b"));
        assert!(has_dangling_marker("a///"));
        assert!(!has_dangling_marker("a//"));
        assert!(!has_dangling_marker("a//,b"));
        assert!(!has_dangling_marker("/:/|"));
        assert!(!has_dangling_marker(""));
    }

    #[test]
    fn find_unescaped_counts_slash_runs() {
        assert_eq!(find_unescaped("1/,2,B", ','), Some(4));
        assert_eq!(find_unescaped("1//,2", ','), Some(3));
        assert_eq!(find_unescaped("1///,2", ','), None);
        assert_eq!(find_unescaped("none", ','), None);
    }

    #[test]
    fn split_respects_escapes() {
        assert_eq!(split_unescaped("A:1/,2,B:3", ','), vec!["A:1/,2", "B:3"]);
        assert_eq!(split_unescaped("", ','), vec![""]);
        assert_eq!(split_unescaped("a,,b", ','), vec!["a", "", "b"]);
    }

    #[test]
    fn contains_unescaped_ignores_escaped() {
        assert!(contains_unescaped("a<b", &['<', '>']));
        assert!(!contains_unescaped("a/<b", &['<', '>']));
        assert!(contains_unescaped("a//<b", &['<', '>']));
    }
}
