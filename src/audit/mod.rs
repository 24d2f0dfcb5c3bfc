//! Heuristic compatibility audit
//!
//! Scores a document against the rendering quirks of desktop Outlook and
//! Gmail. Each finding carries a rule id and a severity whose penalty is
//! subtracted from a perfect 10.

use crate::css::StyleMap;
use crate::dom::{Document, ElementData, Node, NodeData};

/// Severity of a single finding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn penalty(self) -> f64 {
        match self {
            Severity::High => 3.0,
            Severity::Medium => 1.5,
            Severity::Low => 0.5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

/// A single rule violation
#[derive(Debug, Clone)]
pub struct Finding {
    pub rule_id: &'static str,
    pub severity: Severity,
    pub message: String,
}

impl Finding {
    fn new(rule_id: &'static str, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            rule_id,
            severity,
            message: message.into(),
        }
    }
}

/// Result of an audit run
#[derive(Debug)]
pub struct AuditReport {
    pub score: f64,
    pub findings: Vec<Finding>,
}

impl AuditReport {
    /// Human-readable report text
    pub fn render(&self) -> String {
        let mut out = format!("Compatibility score: {}/10\n", self.score);
        if self.findings.is_empty() {
            out.push_str("No issues detected.\n");
        } else {
            for f in &self.findings {
                out.push_str(&format!(
                    "- {} ({}): {}\n",
                    f.rule_id,
                    f.severity.as_str(),
                    f.message
                ));
            }
        }
        out
    }
}

/// Evaluate a document and produce a scored report
pub fn evaluate(document: &Document) -> AuditReport {
    let Some(body) = find_tag(&document.root, "body") else {
        let finding = Finding::new(
            "structure.no_body",
            Severity::High,
            "Document has no <body>; layout cannot be evaluated.",
        );
        return AuditReport {
            score: 1.0,
            findings: vec![finding],
        };
    };

    let mut findings = Vec::new();
    findings.extend(check_layout(body));
    findings.extend(check_css_usage(body));
    findings.extend(check_images(body));
    findings.extend(check_typography(body));

    let penalty: f64 = findings.iter().map(|f| f.severity.penalty()).sum();
    let score = if findings.is_empty() {
        10.0
    } else {
        (10.0 - penalty).max(1.0)
    };
    AuditReport {
        score: (score * 10.0).round() / 10.0,
        findings,
    }
}

/// Outlook needs a table-based layout with an explicitly sized wrapper
fn check_layout(body: &Node) -> Vec<Finding> {
    let mut findings = Vec::new();

    if find_tag(body, "table").is_none() {
        findings.push(Finding::new(
            "layout.no_tables",
            Severity::High,
            "No table elements found; Outlook requires table-based layout.",
        ));
        return findings;
    }

    let Some(outer) = outer_table(body) else {
        findings.push(Finding::new(
            "layout.outer_table",
            Severity::High,
            "Body does not start with a full-width table wrapper.",
        ));
        return findings;
    };

    let styled_width = StyleMap::from_element(outer).contains("width");
    if outer.attr("width").is_none() && !styled_width {
        findings.push(Finding::new(
            "layout.outer_table_width",
            Severity::Medium,
            "Top-level table has no explicit width attribute or inline style.",
        ));
    }
    findings
}

fn check_css_usage(body: &Node) -> Vec<Finding> {
    let mut flex_grid = false;
    let mut positioned = false;
    let mut floated = false;
    let mut overflow = false;
    let mut shorthand = false;

    for_each_element(body, &mut |el| {
        if el.attr("style").is_none() {
            return;
        }
        let map = StyleMap::from_element(el);
        let value_in = |property: &str, allowed: &[&str]| {
            map.get(property)
                .is_some_and(|v| allowed.iter().any(|a| v.eq_ignore_ascii_case(a)))
        };
        flex_grid |= value_in("display", &["flex", "grid", "inline-flex"]);
        positioned |= value_in("position", &["absolute", "fixed"]);
        floated |= value_in("float", &["left", "right"]);
        overflow |= ["overflow", "overflow-x", "overflow-y"]
            .iter()
            .any(|p| value_in(p, &["auto", "scroll", "hidden"]));
        shorthand |= ["margin", "padding"]
            .iter()
            .any(|p| map.get(p).is_some_and(|v| v.trim().contains(' ')));
    });

    let mut findings = Vec::new();
    if flex_grid {
        findings.push(Finding::new(
            "css.flex_grid",
            Severity::High,
            "Flexbox or grid display declarations found.",
        ));
    }
    if positioned {
        findings.push(Finding::new(
            "css.absolute_position",
            Severity::Medium,
            "Absolute or fixed positioning found.",
        ));
    }
    if floated {
        findings.push(Finding::new(
            "css.float",
            Severity::Medium,
            "Float usage found; Outlook's Word engine misplaces floats.",
        ));
    }
    if overflow {
        findings.push(Finding::new(
            "css.overflow",
            Severity::Medium,
            "Overflow values found that Outlook ignores.",
        ));
    }
    if shorthand {
        findings.push(Finding::new(
            "css.shorthand_spacing",
            Severity::Low,
            "Multi-value margin/padding shorthand found.",
        ));
    }
    findings
}

/// Unsized images shift layout in Gmail
fn check_images(body: &Node) -> Vec<Finding> {
    let mut total = 0usize;
    let mut missing = 0usize;
    for_each_element(body, &mut |el| {
        if el.tag != "img" {
            return;
        }
        total += 1;
        if el.attr("role") == Some("presentation") {
            return;
        }
        let sized =
            el.attr("width").is_some() || StyleMap::from_element(el).contains("width");
        if !sized {
            missing += 1;
        }
    });
    if missing == 0 {
        return Vec::new();
    }
    vec![Finding::new(
        "media.image_dimensions",
        Severity::Medium,
        format!("{missing} of {total} images lack a width attribute or inline width."),
    )]
}

fn check_typography(body: &Node) -> Vec<Finding> {
    let mut findings = Vec::new();

    let mut populated = 0usize;
    let mut styled = 0usize;
    walk_nodes(body, &mut |node| {
        let Some(el) = node.as_element() else { return };
        if el.tag != "td" {
            return;
        }
        if node.has_text() || find_tag(node, "img").is_some() {
            populated += 1;
            if el.attr("style").is_some() {
                styled += 1;
            }
        }
    });
    if populated > 0 {
        let ratio = styled as f64 / populated as f64;
        if ratio < 0.6 {
            findings.push(Finding::new(
                "typography.inline_styles",
                Severity::Medium,
                format!(
                    "Only {styled} of {populated} populated table cells carry inline styles."
                ),
            ));
        }
    }

    let body_font = body
        .as_element()
        .map(StyleMap::from_element)
        .is_some_and(|m| m.contains("font-family"));
    let wrapper_font = outer_table(body)
        .map(StyleMap::from_element)
        .is_some_and(|m| m.contains("font-family"));
    if !body_font && !wrapper_font {
        findings.push(Finding::new(
            "typography.body_font",
            Severity::Low,
            "Neither body nor the outer table declares an inline font-family.",
        ));
    }
    findings
}

/// The outer wrapper table: first significant child of the body, looking
/// through a leading `<center>`
fn outer_table(body: &Node) -> Option<&ElementData> {
    let mut candidates = significant_children(body);
    if let Some(first) = candidates.first() {
        if first.is_tag("center") {
            candidates = significant_children(first);
        }
    }
    candidates
        .into_iter()
        .find_map(|n| n.as_element().filter(|el| el.tag == "table"))
}

fn significant_children(node: &Node) -> Vec<&Node> {
    node.children
        .iter()
        .filter(|child| match &child.data {
            NodeData::Element(_) => true,
            NodeData::Text(t) => !t.trim().is_empty(),
            _ => false,
        })
        .collect()
}

fn find_tag<'a>(node: &'a Node, tag: &str) -> Option<&'a Node> {
    if node.is_tag(tag) {
        return Some(node);
    }
    node.children.iter().find_map(|c| find_tag(c, tag))
}

fn for_each_element(node: &Node, f: &mut impl FnMut(&ElementData)) {
    if let NodeData::Element(el) = &node.data {
        f(el);
    }
    for child in &node.children {
        for_each_element(child, f);
    }
}

fn walk_nodes(node: &Node, f: &mut impl FnMut(&Node)) {
    f(node);
    for child in &node.children {
        walk_nodes(child, f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::HtmlParser;

    fn audit(html: &str) -> AuditReport {
        evaluate(&HtmlParser::new().parse(html).unwrap())
    }

    fn has_rule(report: &AuditReport, rule_id: &str) -> bool {
        report.findings.iter().any(|f| f.rule_id == rule_id)
    }

    #[test]
    fn test_clean_table_layout_scores_ten() {
        let report = audit(
            r#"<html><body style="font-family: Arial, sans-serif">
               <table width="600"><tr>
               <td style="padding-top: 8px">Hello</td>
               </tr></table></body></html>"#,
        );
        assert_eq!(report.score, 10.0);
        assert!(report.findings.is_empty());
    }

    #[test]
    fn test_no_tables_flagged() {
        let report = audit("<html><body><div>Hi</div></body></html>");
        assert!(has_rule(&report, "layout.no_tables"));
        assert!(report.score < 10.0);
    }

    #[test]
    fn test_missing_outer_table_width() {
        let report = audit(
            r#"<html><body style="font-family: Arial">
               <table><tr><td style="color: red">x</td></tr></table>
               </body></html>"#,
        );
        assert!(has_rule(&report, "layout.outer_table_width"));
    }

    #[test]
    fn test_outer_table_found_through_center() {
        let report = audit(
            r#"<html><body style="font-family: Arial">
               <center><table width="100%"><tr><td style="color: red">x</td></tr></table></center>
               </body></html>"#,
        );
        assert!(!has_rule(&report, "layout.outer_table"));
        assert!(!has_rule(&report, "layout.outer_table_width"));
    }

    #[test]
    fn test_flex_and_float_flagged() {
        let report = audit(
            r#"<html><body><table width="600"><tr>
               <td style="display: flex">a</td>
               <td style="float: left">b</td>
               </tr></table></body></html>"#,
        );
        assert!(has_rule(&report, "css.flex_grid"));
        assert!(has_rule(&report, "css.float"));
    }

    #[test]
    fn test_shorthand_spacing_flagged() {
        let report = audit(
            r#"<html><body><table width="600"><tr>
               <td style="padding: 4px 8px">a</td>
               </tr></table></body></html>"#,
        );
        assert!(has_rule(&report, "css.shorthand_spacing"));
    }

    #[test]
    fn test_single_value_spacing_not_flagged() {
        let report = audit(
            r#"<html><body><table width="600"><tr>
               <td style="padding: 4px">a</td>
               </tr></table></body></html>"#,
        );
        assert!(!has_rule(&report, "css.shorthand_spacing"));
    }

    #[test]
    fn test_unsized_image_flagged_presentation_excused() {
        let report = audit(
            r#"<html><body><table width="600"><tr><td style="color: red">
               <img src="a.png"><img src="b.png" role="presentation">
               </td></tr></table></body></html>"#,
        );
        let finding = report
            .findings
            .iter()
            .find(|f| f.rule_id == "media.image_dimensions")
            .unwrap();
        assert!(finding.message.starts_with("1 of 2"));
    }

    #[test]
    fn test_unstyled_cells_flagged() {
        let report = audit(
            r#"<html><body><table width="600"><tr>
               <td>a</td><td>b</td><td style="color: red">c</td>
               </tr></table></body></html>"#,
        );
        assert!(has_rule(&report, "typography.inline_styles"));
    }

    #[test]
    fn test_body_font_from_wrapper_table() {
        let report = audit(
            r#"<html><body><table width="600" style="font-family: Arial"><tr>
               <td style="color: red">x</td>
               </tr></table></body></html>"#,
        );
        assert!(!has_rule(&report, "typography.body_font"));
    }

    #[test]
    fn test_score_floor() {
        let report = audit(
            r#"<html><body><div style="display: flex; position: absolute; float: left; overflow: hidden; margin: 1px 2px">
               <img src="a.png"></div></body></html>"#,
        );
        assert!(report.score >= 1.0);
        assert!(has_rule(&report, "layout.no_tables"));
    }

    #[test]
    fn test_render_lists_findings() {
        let report = audit("<html><body><div>x</div></body></html>");
        let text = report.render();
        assert!(text.contains("Compatibility score:"));
        assert!(text.contains("layout.no_tables"));
    }
}
