//! Integration tests for the mailpress pipeline
//!
//! These run the full pipeline end to end and check the properties the
//! output is expected to hold regardless of input.

use mailpress::Pipeline;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

/// Every `id` attribute value in the serialized output
fn collect_ids(html: &str) -> Vec<String> {
    collect_attr(html, " id=\"")
}

fn collect_attr(html: &str, marker: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut rest = html;
    while let Some(start) = rest.find(marker) {
        let after = &rest[start + marker.len()..];
        let end = after.find('"').unwrap_or(after.len());
        values.push(after[..end].to_string());
        rest = &after[end..];
    }
    values
}

#[test]
fn test_minimal_document_gains_email_skeleton() {
    let out = Pipeline::new().process("<p>Hello</p>").unwrap();

    assert!(out.starts_with("<!DOCTYPE html>\n"));
    assert!(out.contains(r#"lang="en""#));
    assert!(out.contains(r#"charset="utf-8""#));
    assert!(out.contains(r#"name="viewport""#));
    assert!(out.contains("[if gte mso 9]"));
    assert!(out.contains("OfficeDocumentSettings"));
    assert!(out.contains("<p>Hello</p>"));
}

#[test]
fn test_minimal_inline_only_input() {
    let out = Pipeline::new()
        .process(r#"<html><head></head><body><div style="color:red">Hi</div></body></html>"#)
        .unwrap();
    assert!(out.starts_with("<!DOCTYPE html>"));
    assert!(out.contains(r#"<div style="color: red">Hi</div>"#));
}

#[test]
fn test_styles_are_inlined_and_style_tags_removed() {
    let html = r#"<html><head><style>
        .cta { color: #ffffff; background-color: #0000ee; }
        p { font-size: 14px; }
    </style></head><body>
        <p class="cta">Buy now</p>
    </body></html>"#;
    let out = Pipeline::new().process(html).unwrap();

    assert!(!out.contains("<style"));
    assert!(out.contains("color: #ffffff"));
    assert!(out.contains("background-color: #0000ee"));
    assert!(out.contains("font-size: 14px"));
}

#[test]
fn test_no_insecure_urls_survive() {
    let html = r#"<body>
        <a href="http://example.com/sale">Sale</a>
        <img src="http://cdn.example.com/hero.png" width="600">
        <a href="https://example.com/ok">Fine</a>
    </body>"#;
    let out = Pipeline::new().process(html).unwrap();

    // The xmlns declaration legitimately carries a plain-http namespace URI
    assert!(!out.contains(r#"href="http://"#));
    assert!(!out.contains(r#"src="http://"#));
    assert!(out.contains("https://example.com/sale"));
    assert!(out.contains("https://cdn.example.com/hero.png"));
}

#[test]
fn test_generated_ids_rewritten_with_references_intact() {
    let html = r##"<body>
        <a href="#i4f2a">jump</a>
        <div id="i4f2a">target</div>
        <label for="ib77">name</label>
        <input id="ib77">
        <div id="main-footer">authored</div>
    </body>"##;
    let out = Pipeline::new().process(html).unwrap();

    assert!(!out.contains("i4f2a"));
    assert!(!out.contains("ib77"));
    assert!(out.contains(r#"id="main-footer""#));

    let ids = collect_ids(&out);
    let generated: Vec<_> = ids.iter().filter(|i| i.starts_with("id-")).collect();
    assert_eq!(generated.len(), 2);

    let href = collect_attr(&out, " href=\"#").pop().unwrap();
    assert!(ids.contains(&href));
    let for_target = collect_attr(&out, " for=\"").pop().unwrap();
    assert!(ids.contains(&for_target));
}

#[test]
fn test_pipeline_idempotent() {
    let html = r#"<html><head><style>.x { color: red; }</style></head><body>
        <table width="100%" style="background-color: #000"><tr>
        <td align="center" style="background-color: rgb(1, 2, 3); padding: 8px">
        It’s a <span class="x">test</span> &amp; more.
        </td></tr></table>
        <img src="http://cdn.example.com/logo.png">
    </body></html>"#;
    let pipeline = Pipeline::new();
    let once = pipeline.process(html).unwrap();
    let twice = pipeline.process(&once).unwrap();
    assert_eq!(twice, once);
}

#[test]
fn test_bgcolor_fallback_for_content_cell() {
    let html = r#"<body><table><tr>
        <td style="background-color: rgb(10, 20, 30)">X</td>
    </tr></table></body>"#;
    let out = Pipeline::new().process(html).unwrap();
    assert!(out.contains(r##"bgcolor="#0a141e""##));
}

#[test]
fn test_mojibake_repaired_in_body_text() {
    let out = Pipeline::new()
        .process("<body><p>CafÃ© menu â€” itâ€™s here</p></body>")
        .unwrap();
    assert!(out.contains("Café menu -- it's here"));
}

proptest! {
    /// The pipeline never panics and always yields a doctyped document,
    /// whatever tag soup it is fed
    #[test]
    fn test_pipeline_never_panics(s in "[a-zA-Z0-9<>/=\" .#:;-]{0,300}") {
        if let Ok(out) = Pipeline::new().process(&s) {
            prop_assert!(out.starts_with("<!DOCTYPE html>"));
        }
    }

    /// Formatting is stable: processed output re-processes to itself
    #[test]
    fn test_processed_output_is_fixed_point(words in prop::collection::vec("[a-z]{1,8}", 1..6)) {
        let html = format!("<body><p>{}</p></body>", words.join(" "));
        let pipeline = Pipeline::new();
        let once = pipeline.process(&html).unwrap();
        let twice = pipeline.process(&once).unwrap();
        prop_assert_eq!(twice, once);
    }
}
