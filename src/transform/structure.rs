//! Structural normalization: html/head/body skeleton and required metadata

use crate::dom::{Document, Node, NodeData};
use crate::engine::PipelineConfig;
use log::debug;

/// Microsoft Office / VML namespace declarations Outlook expects on `<html>`
const NAMESPACE_ATTRS: &[(&str, &str)] = &[
    ("xmlns", "http://www.w3.org/1999/xhtml"),
    ("xmlns:v", "urn:schemas-microsoft-com:vml"),
    ("xmlns:o", "urn:schemas-microsoft-com:office:office"),
];

/// Required `<meta>` tags; `probe` is the attribute/value pair whose
/// presence (not just the attribute name) marks the tag as already there
struct RequiredMeta {
    probe: (&'static str, &'static str),
    attrs: &'static [(&'static str, &'static str)],
}

const REQUIRED_METAS: &[RequiredMeta] = &[
    RequiredMeta {
        probe: ("charset", "utf-8"),
        attrs: &[("charset", "utf-8")],
    },
    RequiredMeta {
        probe: ("name", "viewport"),
        attrs: &[
            ("name", "viewport"),
            ("content", "width=device-width, initial-scale=1"),
        ],
    },
    RequiredMeta {
        probe: ("http-equiv", "X-UA-Compatible"),
        attrs: &[("http-equiv", "X-UA-Compatible"), ("content", "IE=edge")],
    },
    RequiredMeta {
        probe: ("name", "x-apple-disable-message-reformatting"),
        attrs: &[("name", "x-apple-disable-message-reformatting")],
    },
    RequiredMeta {
        probe: ("name", "format-detection"),
        attrs: &[
            ("name", "format-detection"),
            ("content", "telephone=no,address=no,email=no,date=no,url=no"),
        ],
    },
    RequiredMeta {
        probe: ("name", "color-scheme"),
        attrs: &[("name", "color-scheme"), ("content", "light dark")],
    },
];

/// Marker string identifying the Outlook settings block
const MSO_MARKER: &str = "OfficeDocumentSettings";

/// The Outlook conditional comment body appended to `<head>`
const MSO_COMMENT: &str = "[if gte mso 9]><xml>\
<o:OfficeDocumentSettings>\
<o:AllowPNG/>\
<o:PixelsPerInch>96</o:PixelsPerInch>\
</o:OfficeDocumentSettings>\
</xml><![endif]";

/// Normalize document structure; additive and idempotent
pub fn normalize(document: &mut Document, config: &PipelineConfig) {
    ensure_skeleton(document);

    let Some(html) = document.html_mut() else {
        return;
    };

    if let Some(el) = html.as_element_mut() {
        el.set_attr_if_absent("lang", &config.lang);
        for (name, value) in NAMESPACE_ATTRS {
            el.set_attr_if_absent(name, value);
        }
    }

    // Rescue stray head-only elements out of body before touching head
    let strays = match html.children.iter_mut().find(|n| n.is_tag("body")) {
        Some(body) => extract_head_content(body),
        None => Vec::new(),
    };

    let Some(head) = html.children.iter_mut().find(|n| n.is_tag("head")) else {
        return;
    };

    if !strays.is_empty() {
        debug!("moving {} stray head element(s) from body to head", strays.len());
        head.children.extend(strays);
    }

    for required in REQUIRED_METAS {
        if !has_meta(head, required.probe) {
            let mut meta = Node::element("meta");
            if let Some(el) = meta.as_element_mut() {
                for (name, value) in required.attrs {
                    el.set_attr(*name, *value);
                }
            }
            head.add_child(meta);
        }
    }

    if !contains_marker(head, MSO_MARKER) {
        head.add_child(Node::comment(MSO_COMMENT));
    }
}

/// Guarantee one `html` element containing one `head` and one `body`,
/// preserving any existing content
fn ensure_skeleton(document: &mut Document) {
    if document.html_mut().is_none() {
        let displaced: Vec<Node> = document.root.children.drain(..).collect();
        let mut html = Node::element("html");
        html.add_child(Node::element("head"));
        let mut body = Node::element("body");
        body.children = displaced;
        html.add_child(body);
        document.root.add_child(html);
        return;
    }

    if let Some(html) = document.html_mut() {
        if !html.children.iter().any(|n| n.is_tag("head")) {
            html.children.insert(0, Node::element("head"));
        }
        if !html.children.iter().any(|n| n.is_tag("body")) {
            html.add_child(Node::element("body"));
        }
    }
}

/// Remove `meta`/`title` elements found anywhere under `node`
fn extract_head_content(node: &mut Node) -> Vec<Node> {
    let mut extracted = Vec::new();
    let mut i = 0;
    while i < node.children.len() {
        if node.children[i].is_tag("meta") || node.children[i].is_tag("title") {
            extracted.push(node.children.remove(i));
        } else {
            extracted.extend(extract_head_content(&mut node.children[i]));
            i += 1;
        }
    }
    extracted
}

/// Whether head already holds a meta matching the given attribute/value pair
fn has_meta(head: &Node, (name, value): (&str, &str)) -> bool {
    head.children.iter().any(|n| {
        n.is_tag("meta")
            && n.as_element()
                .and_then(|el| el.attr(name))
                .is_some_and(|v| v.eq_ignore_ascii_case(value))
    })
}

/// Whether any comment or text under `node` contains the marker string
fn contains_marker(node: &Node, marker: &str) -> bool {
    match &node.data {
        NodeData::Comment(c) | NodeData::Text(c) if c.contains(marker) => true,
        _ => node.children.iter().any(|c| contains_marker(c, marker)),
    }
}
