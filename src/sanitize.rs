//! Text normalization for extracted and hand-pasted filing content.
//!
//! [`clean_text`] applies the ordered rule set used on every ingested body;
//! applying it twice yields the same result as once. [`clean_text_extended`]
//! adds Unicode normalization and typographic cleanup for hand-authored
//! text. [`pre_sanitize_json`] repairs almost-valid JSON payloads whose
//! string values contain literal line breaks (a common paste artifact).

use regex::Regex;
use std::sync::OnceLock;
use unicode_normalization::UnicodeNormalization;

fn re_blank_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t]+").unwrap())
}

fn re_newline_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").unwrap())
}

/// Normalize raw filing text. Rules, in order:
///
/// 1. CRLF and lone CR become LF.
/// 2. Control characters below 0x20 (except tab and newline) become a space.
/// 3. Runs of spaces/tabs collapse to one space.
/// 4. Three or more consecutive newlines collapse to two.
/// 5. Leading/trailing whitespace is trimmed.
///
/// Never fails; empty input yields an empty string.
pub fn clean_text(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }
    let s = s.replace("\r\n", "\n").replace('\r', "\n");
    let s: String = s
        .chars()
        .map(|c| {
            if (c as u32) < 0x20 && c != '\n' && c != '\t' {
                ' '
            } else {
                c
            }
        })
        .collect();
    let s = re_blank_runs().replace_all(&s, " ");
    let s = re_newline_runs().replace_all(&s, "\n\n");
    s.trim().to_string()
}

/// Extended cleanup for hand-authored text: NFKC normalization, non-breaking
/// and narrow no-break spaces become ordinary spaces, German typographic
/// quotes become their ASCII equivalents, then the [`clean_text`] rules.
pub fn clean_text_extended(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }
    let s: String = s.nfkc().collect();
    let s: String = s
        .chars()
        .map(|c| match c {
            '\u{00A0}' | '\u{202F}' => ' ',
            '\u{201E}' | '\u{201C}' | '\u{201D}' => '"',
            '\u{201A}' | '\u{2018}' | '\u{2019}' => '\'',
            other => other,
        })
        .collect();
    clean_text(&s)
}

/// Repair a JSON payload whose quoted strings contain raw line breaks or
/// control characters, so it parses without altering anything outside
/// string literals.
///
/// Single left-to-right pass tracking only an in-string flag and an escape
/// flag. Inside strings: CR is dropped, LF becomes the `\n` escape, other
/// bytes below 0x20 (except tab) become a space. Non-breaking spaces are
/// replaced globally before the scan.
pub fn pre_sanitize_json(raw: &str) -> String {
    let raw = raw.replace('\u{00A0}', " ");
    let mut out = String::with_capacity(raw.len());
    let mut in_str = false;
    let mut esc = false;

    for ch in raw.chars() {
        if esc {
            out.push(ch);
            esc = false;
            continue;
        }
        if ch == '\\' {
            out.push(ch);
            esc = true;
            continue;
        }
        if ch == '"' {
            out.push(ch);
            in_str = !in_str;
            continue;
        }
        if in_str {
            if ch == '\r' {
                continue;
            }
            if ch == '\n' {
                out.push_str("\\n");
                continue;
            }
            if (ch as u32) < 0x20 && ch != '\t' {
                out.push(' ');
                continue;
            }
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_basic_rules() {
        assert_eq!(clean_text("a\r\nb\rc"), "a\nb\nc");
        assert_eq!(clean_text("a \t  b"), "a b");
        assert_eq!(clean_text("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(clean_text("  padded  "), "padded");
        assert_eq!(clean_text("a\u{0000}b\u{0007}c"), "a b c");
    }

    #[test]
    fn test_clean_keeps_tab_as_single_space_run() {
        // Tabs survive rule 2 but collapse with spaces in rule 3.
        assert_eq!(clean_text("a\t\t b"), "a b");
    }

    #[test]
    fn test_clean_empty() {
        assert_eq!(clean_text(""), "");
        assert_eq!(clean_text("   \n  "), "");
    }

    #[test]
    fn test_clean_idempotent() {
        let inputs = [
            "Zeile eins\r\n\r\n\r\nZeile   zwei\t\tdrei\u{0001}",
            "  schon \n\n sauber  ",
            "",
            "\u{0000}\u{001F}\t\n\n\n\nx",
        ];
        for s in inputs {
            let once = clean_text(s);
            assert_eq!(clean_text(&once), once, "not idempotent for {:?}", s);
        }
    }

    #[test]
    fn test_extended_quotes_and_nbsp() {
        let s = "\u{201E}Zitat\u{201C} mit\u{00A0}NBSP und\u{202F}schmalem";
        assert_eq!(clean_text_extended(s), "\"Zitat\" mit NBSP und schmalem");
        assert_eq!(clean_text_extended("l\u{2019}art"), "l'art");
    }

    #[test]
    fn test_extended_idempotent() {
        let s = "\u{201E}Test\u{201C}\r\n\r\n\r\ninhalt\u{00A0} doppelt  ";
        let once = clean_text_extended(s);
        assert_eq!(clean_text_extended(&once), once);
    }

    #[test]
    fn test_pre_sanitize_repairs_literal_newlines() {
        let raw = "{\"titel\": \"Zeile eins\nZeile zwei\", \"n\": 1}";
        let repaired = pre_sanitize_json(raw);
        let v: serde_json::Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(v["titel"], "Zeile eins\nZeile zwei");
        assert_eq!(v["n"], 1);
    }

    #[test]
    fn test_pre_sanitize_drops_cr_and_controls_in_strings() {
        let raw = "{\"a\": \"x\r\ny\u{0001}z\"}";
        let repaired = pre_sanitize_json(raw);
        let v: serde_json::Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(v["a"], "x\ny z");
    }

    #[test]
    fn test_pre_sanitize_leaves_structure_untouched() {
        // Newlines between tokens are valid JSON whitespace and must survive.
        let raw = "{\n  \"a\": 1,\n  \"b\": [2, 3]\n}";
        assert_eq!(pre_sanitize_json(raw), raw);
    }

    #[test]
    fn test_pre_sanitize_escaped_quote_does_not_toggle() {
        let raw = "{\"a\": \"er sagte \\\"hallo\\\"\nweiter\"}";
        let repaired = pre_sanitize_json(raw);
        let v: serde_json::Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(v["a"], "er sagte \"hallo\"\nweiter");
    }

    #[test]
    fn test_pre_sanitize_roundtrip_on_clean_payload() {
        // A payload already using proper escapes passes through unchanged.
        let raw = r#"{"a": "eins\nzwei", "b": "drei"}"#;
        assert_eq!(pre_sanitize_json(raw), raw);
        let v: serde_json::Value = serde_json::from_str(raw).unwrap();
        assert_eq!(v["a"], "eins\nzwei");
    }
}
