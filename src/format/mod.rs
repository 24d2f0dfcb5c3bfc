//! Deterministic HTML serialization
//!
//! Pretty-prints the owned tree with two-space indentation. Output depends
//! only on tree content, so formatting a formatted document is a no-op.

use crate::dom::{Document, ElementData, Node, NodeData};

const DOCTYPE: &str = "<!DOCTYPE html>\n";

const INDENT: &str = "  ";

/// Phrasing-level tags kept on one line with their siblings
const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "br", "cite", "code", "em", "i", "img", "label", "mark",
    "q", "small", "span", "strong", "sub", "sup", "time", "u",
];

/// Tags with no closing form, emitted self-closed
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link",
    "meta", "param", "source", "track", "wbr",
];

/// Tags whose text content is emitted verbatim
const RAW_TEXT_TAGS: &[&str] = &["script", "style"];

/// Serialize the document with a doctype and trailing newline
pub fn serialize(document: &Document) -> String {
    let mut out = String::from(DOCTYPE);
    for child in &document.root.children {
        write_node(child, 0, &mut out);
    }
    out
}

fn write_node(node: &Node, depth: usize, out: &mut String) {
    match &node.data {
        NodeData::Document => {
            for child in &node.children {
                write_node(child, depth, out);
            }
        }
        NodeData::Text(text) => {
            let collapsed = collapse_whitespace(text);
            let trimmed = collapsed.trim();
            if !trimmed.is_empty() {
                indent(depth, out);
                out.push_str(&escape_text(trimmed));
                out.push('\n');
            }
        }
        NodeData::Comment(text) => {
            indent(depth, out);
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->\n");
        }
        NodeData::Element(el) => write_element(node, el, depth, out),
    }
}

fn write_element(node: &Node, el: &ElementData, depth: usize, out: &mut String) {
    let tag = el.tag.as_str();
    indent(depth, out);

    if VOID_TAGS.contains(&tag) {
        out.push('<');
        out.push_str(tag);
        write_attrs(el, out);
        out.push_str("/>\n");
        return;
    }

    if RAW_TEXT_TAGS.contains(&tag) {
        out.push('<');
        out.push_str(tag);
        write_attrs(el, out);
        out.push('>');
        out.push_str(&node.text_content());
        out.push_str("</");
        out.push_str(tag);
        out.push_str(">\n");
        return;
    }

    if node.children.iter().all(fits_inline) {
        out.push('<');
        out.push_str(tag);
        write_attrs(el, out);
        out.push('>');
        let mut line = String::new();
        for child in &node.children {
            write_inline(child, &mut line);
        }
        out.push_str(&tidy_line(&line));
        out.push_str("</");
        out.push_str(tag);
        out.push_str(">\n");
        return;
    }

    out.push('<');
    out.push_str(tag);
    write_attrs(el, out);
    out.push_str(">\n");
    for child in &node.children {
        write_node(child, depth + 1, out);
    }
    indent(depth, out);
    out.push_str("</");
    out.push_str(tag);
    out.push_str(">\n");
}

/// A node can share a line with its parent when it is text, a comment, or
/// an inline element whose whole subtree is likewise inline
fn fits_inline(node: &Node) -> bool {
    match &node.data {
        NodeData::Text(_) | NodeData::Comment(_) => true,
        NodeData::Element(el) => {
            INLINE_TAGS.contains(&el.tag.as_str())
                && node.children.iter().all(fits_inline)
        }
        NodeData::Document => false,
    }
}

fn write_inline(node: &Node, out: &mut String) {
    match &node.data {
        NodeData::Text(text) => {
            out.push_str(&escape_text(&collapse_whitespace(text)));
        }
        NodeData::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeData::Element(el) => {
            let tag = el.tag.as_str();
            out.push('<');
            out.push_str(tag);
            write_attrs(el, out);
            if VOID_TAGS.contains(&tag) {
                out.push_str("/>");
            } else {
                out.push('>');
                for child in &node.children {
                    write_inline(child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
        NodeData::Document => {}
    }
}

fn write_attrs(el: &ElementData, out: &mut String) {
    for attr in &el.attrs {
        out.push(' ');
        out.push_str(&attr.name);
        out.push_str("=\"");
        out.push_str(&escape_attr(&attr.value));
        out.push('"');
    }
}

fn indent(depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

/// Collapse runs of whitespace to single spaces, keeping boundary spaces
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

/// Final cleanup of an assembled inline run: trim, collapse doubled spaces
/// left at tag boundaries, drop spaces before closing punctuation
fn tidy_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut prev_space = false;
    for c in line.trim().chars() {
        if c == ' ' {
            if !prev_space {
                out.push(c);
            }
            prev_space = true;
            continue;
        }
        if prev_space && matches!(c, '.' | ',' | ';' | ':' | '!' | '?') {
            out.pop();
        }
        out.push(c);
        prev_space = false;
    }
    out
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::HtmlParser;
    use pretty_assertions::assert_eq;

    fn render(html: &str) -> String {
        serialize(&HtmlParser::new().parse(html).unwrap())
    }

    #[test]
    fn test_basic_indentation() {
        let out = render("<html><head></head><body><div><p>Hi</p></div></body></html>");
        assert_eq!(
            out,
            "<!DOCTYPE html>\n\
             <html>\n\
             \x20\x20<head></head>\n\
             \x20\x20<body>\n\
             \x20\x20\x20\x20<div>\n\
             \x20\x20\x20\x20\x20\x20<p>Hi</p>\n\
             \x20\x20\x20\x20</div>\n\
             \x20\x20</body>\n\
             </html>\n"
        );
    }

    #[test]
    fn test_inline_children_stay_on_one_line() {
        let out = render("<body><p>Go <a href=\"https://x\">here</a> now.</p></body>");
        assert!(out.contains("<p>Go <a href=\"https://x\">here</a> now.</p>\n"));
    }

    #[test]
    fn test_void_tags_self_close() {
        let out = render("<body><img src=\"a.png\" width=\"10\"><br></body>");
        assert!(out.contains("<img src=\"a.png\" width=\"10\"/>"));
        assert!(out.contains("<br/>"));
    }

    #[test]
    fn test_text_whitespace_collapsed() {
        let out = render("<body><p>a\n   b\t c</p></body>");
        assert!(out.contains("<p>a b c</p>"));
    }

    #[test]
    fn test_no_space_before_punctuation() {
        let out = render("<body><p>See <a href=\"#x\">this</a> .</p></body>");
        assert!(out.contains("<p>See <a href=\"#x\">this</a>.</p>"));
    }

    #[test]
    fn test_escaping() {
        let out = render("<body><p title=\"a&quot;b\">1 &lt; 2 &amp; 3</p></body>");
        assert!(out.contains("title=\"a&quot;b\""));
        assert!(out.contains("1 &lt; 2 &amp; 3"));
    }

    #[test]
    fn test_comment_preserved_verbatim() {
        let out = render("<body><!--[if mso]><p>x</p><![endif]--></body>");
        assert!(out.contains("<!--[if mso]><p>x</p><![endif]-->"));
    }

    #[test]
    fn test_attribute_order_preserved() {
        let out = render("<body><img width=\"1\" src=\"a\" alt=\"b\"></body>");
        assert!(out.contains("<img width=\"1\" src=\"a\" alt=\"b\"/>"));
    }

    #[test]
    fn test_idempotent() {
        let html = "<html><body><div><p>Hello <b>world</b> !</p>\n<img src=\"a.png\"></div></body></html>";
        let once = render(html);
        let twice = serialize(&HtmlParser::new().parse(&once).unwrap());
        assert_eq!(twice, once);
    }
}
