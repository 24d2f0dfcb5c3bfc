//! Specificity-ordered style inlining
//!
//! Eligible rules are applied onto matching elements as inline declarations
//! and the `<style>` blocks are deleted afterwards. Precedence is resolved
//! by applying rules highest-specificity-first under an existing-wins merge:
//! the first writer of a property keeps it, so author inline styles beat
//! every rule, higher specificity beats lower, and equal-specificity rules
//! declared later beat earlier ones.

use super::selector::{Selector, is_inlinable, specificity};
use super::style_map::StyleMap;
use super::{Declaration, extract_rules};
use crate::dom::{Document, query};
use log::{debug, warn};

/// Elements never styled by the inliner even when a selector matches them
const SKIP_TAGS: &[&str] = &["script", "style", "meta", "title", "head"];

struct RankedRule {
    selector: Selector,
    specificity: u32,
    declarations: Vec<Declaration>,
}

/// Inline every eligible stylesheet rule, then remove `<style>` elements
pub fn inline_styles(document: &mut Document) {
    let rules = extract_rules(document);
    let mut ranked = Vec::new();

    for rule in rules {
        // Collapse duplicate properties within the block last-wins before
        // the block competes with other rules
        let declarations = StyleMap::from_declarations(&rule.declarations)
            .declarations()
            .to_vec();
        for source in &rule.selectors {
            if !is_inlinable(source) {
                debug!("selector not inlinable, skipped: {source}");
                continue;
            }
            match Selector::parse(source) {
                Ok(selector) => ranked.push(RankedRule {
                    specificity: specificity(source),
                    selector,
                    declarations: declarations.clone(),
                }),
                Err(err) => {
                    // Degrade per rule rather than aborting the document
                    warn!("skipping selector: {err}");
                }
            }
        }
    }

    // Stable ascending sort keeps source order among equal specificity;
    // applying in reverse makes the highest-specificity rule (and, on
    // ties, the later-declared one) the first writer
    ranked.sort_by_key(|r| r.specificity);
    for ranked_rule in ranked.iter().rev() {
        apply_rule(document, ranked_rule);
    }

    // Round-trip every remaining style attribute through the map so all
    // inline declarations come out in the one canonical `prop: value` form
    document.root.for_each_element_mut(&mut |el| {
        if el.attr("style").is_some() {
            StyleMap::from_element(el).apply_to(el);
        }
    });

    document
        .root
        .retain_elements(&|el| el.tag != "style");
}

fn apply_rule(document: &mut Document, ranked: &RankedRule) {
    query::for_each_match(&mut document.root, &ranked.selector, &mut |el| {
        if SKIP_TAGS.contains(&el.tag.as_str()) {
            return;
        }
        let mut map = StyleMap::from_element(el);
        map.merge_missing(&ranked.declarations);
        map.apply_to(el);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::HtmlParser;

    fn process(html: &str) -> Document {
        let mut doc = HtmlParser::new().parse(html).unwrap();
        inline_styles(&mut doc);
        doc
    }

    fn style_of(doc: &mut Document, tag: &str) -> Option<String> {
        let node = doc.root.find_tag_mut(tag)?;
        node.as_element()
            .unwrap()
            .attr("style")
            .map(String::from)
    }

    #[test]
    fn test_basic_inlining_and_style_removal() {
        let mut doc = process(
            r#"<html><head><style>.btn { color: red }</style></head>
               <body><span class="btn">x</span></body></html>"#,
        );
        assert_eq!(style_of(&mut doc, "span").as_deref(), Some("color: red"));
        assert!(doc.root.find_tag_mut("style").is_none());
    }

    #[test]
    fn test_higher_specificity_wins() {
        let mut doc = process(
            r#"<html><head><style>
                 #b { color: blue }
                 .a { color: red }
               </style></head>
               <body><span class="a" id="b">x</span></body></html>"#,
        );
        assert_eq!(style_of(&mut doc, "span").as_deref(), Some("color: blue"));
    }

    #[test]
    fn test_equal_specificity_later_declared_wins() {
        let mut doc = process(
            r#"<html><head><style>
                 .a { color: red }
                 .b { color: blue }
               </style></head>
               <body><span class="a b">x</span></body></html>"#,
        );
        assert_eq!(style_of(&mut doc, "span").as_deref(), Some("color: blue"));
    }

    #[test]
    fn test_existing_inline_wins() {
        let mut doc = process(
            r#"<html><head><style>.a { color: red; margin: 0 }</style></head>
               <body><span class="a" style="color: green">x</span></body></html>"#,
        );
        assert_eq!(
            style_of(&mut doc, "span").as_deref(),
            Some("color: green; margin: 0")
        );
    }

    #[test]
    fn test_repeated_property_in_rule_takes_last() {
        let mut doc = process(
            r#"<html><head><style>.a { margin: 0; margin: 4px }</style></head>
               <body><span class="a">x</span></body></html>"#,
        );
        assert_eq!(style_of(&mut doc, "span").as_deref(), Some("margin: 4px"));
    }

    #[test]
    fn test_pseudo_rules_not_inlined() {
        let mut doc = process(
            r##"<html><head><style>a:hover { color: red }</style></head>
               <body><a href="#x">x</a></body></html>"##,
        );
        assert_eq!(style_of(&mut doc, "a"), None);
    }

    #[test]
    fn test_bare_tag_rule_applies() {
        let mut doc = process(
            r#"<html><head><style>p { margin: 0 }</style></head>
               <body><p>x</p></body></html>"#,
        );
        assert_eq!(style_of(&mut doc, "p").as_deref(), Some("margin: 0"));
    }

    #[test]
    fn test_bare_body_rule_excluded() {
        let mut doc = process(
            r#"<html><head><style>body { background: red }</style></head>
               <body><p>x</p></body></html>"#,
        );
        assert_eq!(style_of(&mut doc, "body"), None);
    }

    #[test]
    fn test_untouched_inline_style_normalized() {
        let mut doc = process(r#"<body><div style="color:red;margin:0">Hi</div></body>"#);
        assert_eq!(
            style_of(&mut doc, "div").as_deref(),
            Some("color: red; margin: 0")
        );
    }

    #[test]
    fn test_idempotent_second_run() {
        let mut doc = process(
            r#"<html><head><style>.a { color: red }</style></head>
               <body><span class="a">x</span></body></html>"#,
        );
        let before = style_of(&mut doc, "span");
        inline_styles(&mut doc);
        assert_eq!(style_of(&mut doc, "span"), before);
    }
}
