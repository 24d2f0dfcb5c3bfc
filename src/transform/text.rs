//! Text repair: mojibake decoding and smart-character substitution
//!
//! Runs over every text node under `body` (skipping `script`/`style`) and a
//! fixed allow-list of human-readable attributes. Decoding happens before
//! substitution so double-encoded smart quotes are caught too.

use crate::dom::{Document, Node, NodeData};

/// Attributes whose values carry human-readable text
const TEXT_ATTRS: &[&str] = &[
    "title",
    "alt",
    "aria-label",
    "aria-labelledby",
    "aria-describedby",
    "data-tooltip",
];

/// Unicode punctuation and space characters mapped to plain-text equivalents
const SMART_CHARS: &[(char, &str)] = &[
    ('\u{2018}', "'"),   // left single quote
    ('\u{2019}', "'"),   // right single quote
    ('\u{201A}', "'"),   // single low quote
    ('\u{201C}', "\""),  // left double quote
    ('\u{201D}', "\""),  // right double quote
    ('\u{201E}', "\""),  // double low quote
    ('\u{2013}', "-"),   // en dash
    ('\u{2014}', "--"),  // em dash
    ('\u{2026}', "..."), // ellipsis
    ('\u{00A0}', " "),   // non-breaking space
    ('\u{2002}', " "),   // en space
    ('\u{2003}', " "),   // em space
    ('\u{2009}', " "),   // thin space
    ('\u{200B}', ""),    // zero-width space
];

/// Normalize all text under `body` and the attribute allow-list
pub fn normalize(document: &mut Document) {
    if let Some(body) = document.find_tag_mut("body") {
        walk(body);
    }
}

fn walk(node: &mut Node) {
    if node.is_tag("script") || node.is_tag("style") {
        return;
    }
    match &mut node.data {
        NodeData::Text(value) => *value = normalize_string(value),
        NodeData::Element(el) => {
            for attr in &mut el.attrs {
                if TEXT_ATTRS.contains(&attr.name.as_str()) {
                    attr.value = normalize_string(&attr.value);
                }
            }
        }
        _ => {}
    }
    for child in &mut node.children {
        walk(child);
    }
}

/// Repair mojibake, then substitute smart characters
pub fn normalize_string(text: &str) -> String {
    let repaired = repair_mojibake(text).unwrap_or_else(|| text.to_string());
    substitute_smart_chars(&repaired)
}

/// Reinterpret Windows-1252-looking text as UTF-8 bytes
///
/// Applies only when every character is either ≤ U+00FF or one of the
/// Unicode code points Windows-1252 maps into 0x80–0x9F. The decode is
/// rejected (None) when the bytes are not valid UTF-8 or the result carries
/// a replacement character, which means the heuristic does not apply.
fn repair_mojibake(text: &str) -> Option<String> {
    if text.is_ascii() {
        return None;
    }
    let mut bytes = Vec::with_capacity(text.len());
    for c in text.chars() {
        let code = c as u32;
        if code <= 0xFF {
            bytes.push(code as u8);
        } else {
            bytes.push(cp1252_byte(c)?);
        }
    }
    let decoded = String::from_utf8(bytes).ok()?;
    if decoded.contains('\u{FFFD}') || decoded == text {
        return None;
    }
    Some(decoded)
}

/// Reverse Windows-1252 mapping for the 0x80–0x9F range
fn cp1252_byte(c: char) -> Option<u8> {
    let byte = match c {
        '\u{20AC}' => 0x80, // €
        '\u{201A}' => 0x82,
        '\u{0192}' => 0x83, // ƒ
        '\u{201E}' => 0x84,
        '\u{2026}' => 0x85,
        '\u{2020}' => 0x86, // †
        '\u{2021}' => 0x87, // ‡
        '\u{02C6}' => 0x88, // ˆ
        '\u{2030}' => 0x89, // ‰
        '\u{0160}' => 0x8A, // Š
        '\u{2039}' => 0x8B, // ‹
        '\u{0152}' => 0x8C, // Œ
        '\u{017D}' => 0x8E, // Ž
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => 0x95, // •
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{02DC}' => 0x98, // ˜
        '\u{2122}' => 0x99, // ™
        '\u{0161}' => 0x9A, // š
        '\u{203A}' => 0x9B, // ›
        '\u{0153}' => 0x9C, // œ
        '\u{017E}' => 0x9E, // ž
        '\u{0178}' => 0x9F, // Ÿ
        _ => return None,
    };
    Some(byte)
}

fn substitute_smart_chars(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match SMART_CHARS.iter().find(|(from, _)| *from == c) {
            Some((_, to)) => out.push_str(to),
            None => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::HtmlParser;

    #[test]
    fn test_mojibake_cafe_repaired() {
        // "café" after its UTF-8 bytes were decoded as Windows-1252
        assert_eq!(normalize_string("caf\u{00C3}\u{00A9}"), "café");
    }

    #[test]
    fn test_correct_text_not_double_decoded() {
        assert_eq!(normalize_string("café"), "café");
    }

    #[test]
    fn test_double_encoded_smart_quote() {
        // ’ mis-decoded as cp1252 is "â€™"; repair then substitution
        assert_eq!(normalize_string("it\u{00E2}\u{20AC}\u{2122}s"), "it's");
    }

    #[test]
    fn test_smart_chars_substituted() {
        assert_eq!(
            normalize_string("\u{201C}hi\u{201D} \u{2014} ok\u{2026}"),
            "\"hi\" -- ok..."
        );
        assert_eq!(normalize_string("a\u{00A0}b\u{200B}c"), "a bc");
    }

    #[test]
    fn test_ascii_untouched() {
        assert_eq!(normalize_string("plain text."), "plain text.");
    }

    #[test]
    fn test_script_content_skipped() {
        let mut doc = HtmlParser::new()
            .parse("<body><script>var s = '\u{201C}';</script><p>\u{201C}q\u{201D}</p></body>")
            .unwrap();
        normalize(&mut doc);
        let body = doc.find_tag_mut("body").unwrap();
        let script_text = body.find_tag_mut("script").unwrap().text_content();
        assert!(script_text.contains('\u{201C}'));
        let p_text = body.find_tag_mut("p").unwrap().text_content();
        assert_eq!(p_text, "\"q\"");
    }

    #[test]
    fn test_allowlisted_attribute_normalized() {
        let mut doc = HtmlParser::new()
            .parse("<body><img alt=\"caf\u{00C3}\u{00A9}\" data-x=\"\u{201C}\"></body>")
            .unwrap();
        normalize(&mut doc);
        let body = doc.find_tag_mut("body").unwrap();
        let img = body.find_tag_mut("img").unwrap();
        let el = img.as_element().unwrap();
        assert_eq!(el.attr("alt"), Some("café"));
        // Non-allowlisted attributes are untouched
        assert_eq!(el.attr("data-x"), Some("\u{201C}"));
    }
}
