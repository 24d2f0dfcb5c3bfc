//! Hidden preview-text (preheader) injection
//!
//! Best-effort: when the article container or the editor's marker comment is
//! missing, the pass is a silent no-op.

use super::text::normalize_string;
use crate::css::StyleMap;
use crate::css::selector::Selector;
use crate::dom::{Document, Node, NodeData, query};
use crate::engine::PipelineConfig;
use log::debug;

/// Comment the visual editor leaves where the preheader belongs
const PREHEADER_MARKER: &str = "Visually Hidden Preheader Text: BEGIN";

/// Fixed identifier of the hidden div; the `-` keeps it out of the
/// anonymizer's auto-generated-id pattern
const PREHEADER_ID: &str = "preheader-text";

/// Declarations that keep the div invisible but readable by preview parsers
const HIDDEN_STYLE: &[(&str, &str)] = &[
    ("max-height", "0px"),
    ("overflow-x", "hidden"),
    ("overflow-y", "hidden"),
];

/// Ensure the hidden preheader div exists and is well-formed
pub fn inject(document: &mut Document, config: &PipelineConfig) {
    let article_selector =
        Selector::parse(r#"center[role="article"]"#).expect("static selector parses");
    let Some(article) = query::find_first(&mut document.root, &article_selector) else {
        debug!("no center[role=article] container; preheader skipped");
        return;
    };

    let hidden_selector =
        Selector::parse(r#"div[aria-hidden="true"]"#).expect("static selector parses");
    if let Some(existing) = query::find_first(article, &hidden_selector) {
        update_existing(existing);
        return;
    }

    if !insert_after_marker(article, &config.preheader_text) {
        debug!("no preheader marker comment; preheader skipped");
    }
}

/// Idempotent update of an already-present hidden div
fn update_existing(node: &mut Node) {
    for child in &mut node.children {
        if let NodeData::Text(value) = &mut child.data {
            *value = normalize_string(value);
        }
    }
    if let Some(el) = node.as_element_mut() {
        let mut map = StyleMap::from_element(el);
        for (property, value) in HIDDEN_STYLE {
            map.set_if_absent(property, value);
        }
        map.apply_to(el);
    }
}

/// Insert the hidden div right after the marker comment; true when inserted
fn insert_after_marker(node: &mut Node, preview: &str) -> bool {
    let marker = node.children.iter().position(
        |child| matches!(&child.data, NodeData::Comment(c) if c.contains(PREHEADER_MARKER)),
    );
    if let Some(idx) = marker {
        node.children.insert(idx + 1, build_hidden_div(preview));
        return true;
    }
    for child in &mut node.children {
        if insert_after_marker(child, preview) {
            return true;
        }
    }
    false
}

fn build_hidden_div(preview: &str) -> Node {
    let mut div = Node::element("div");
    if let Some(el) = div.as_element_mut() {
        el.set_attr("id", PREHEADER_ID);
        el.set_attr("aria-hidden", "true");
        let mut map = StyleMap::default();
        for (property, value) in HIDDEN_STYLE {
            map.set(property, value);
        }
        map.apply_to(el);
    }
    if !preview.is_empty() {
        div.add_child(Node::text(preview));
    }
    div
}
