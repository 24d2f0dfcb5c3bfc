//! Stylesheet extraction and the CSS rule model
//!
//! `<style>` blocks are scanned into [`Rule`]s with raw declaration text
//! preserved in source order. Only the constrained selector grammar used by
//! the inliner is interpreted; everything else is filtered out up front.

pub mod inline;
pub mod selector;
pub mod style_map;

pub use inline::inline_styles;
pub use selector::{Selector, is_inlinable, specificity};
pub use style_map::StyleMap;

use crate::dom::{Document, Node, NodeData};
use cssparser::{BasicParseErrorKind, ParseError, Parser, ParserInput, Token};

/// A single `property: value` pair, raw value text preserved
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    /// Property name, lowercase
    pub property: String,
    /// Raw value text, trimmed
    pub value: String,
}

/// One `selector-list { declarations }` block from a `<style>` element
#[derive(Debug, Clone)]
pub struct Rule {
    /// Individual selectors from the comma-separated list
    pub selectors: Vec<String>,
    /// Declarations in source order; later properties override earlier ones
    pub declarations: Vec<Declaration>,
    /// Position of the rule in the concatenated stylesheet text
    pub order: usize,
}

/// Collect and parse every `<style>` block in the document
pub fn extract_rules(document: &Document) -> Vec<Rule> {
    let mut css = String::new();
    collect_style_text(&document.root, &mut css);

    let mut rules = Vec::new();
    for (selectors, body) in scan_blocks(&strip_comments(&css)) {
        let declarations = parse_declarations(&body);
        if declarations.is_empty() {
            continue;
        }
        let order = rules.len();
        rules.push(Rule {
            selectors: selectors
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            declarations,
            order,
        });
    }
    rules
}

fn collect_style_text(node: &Node, out: &mut String) {
    if node.is_tag("style") {
        for child in &node.children {
            if let NodeData::Text(t) = &child.data {
                out.push_str(t);
                out.push('\n');
            }
        }
        return;
    }
    for child in &node.children {
        collect_style_text(child, out);
    }
}

/// Strip `/* ... */` comments
fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

/// Brace-matching scan into `(selector-list, body)` pairs, skipping
/// `@`-rule blocks (media queries and other at-rules are never inlined)
fn scan_blocks(css: &str) -> Vec<(String, String)> {
    let bytes = css.as_bytes();
    let mut blocks = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        // Seek the start of the next prelude
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        if bytes[i] == b'@' {
            i = skip_at_rule(css, i);
            continue;
        }
        let prelude_start = i;
        while i < bytes.len() && bytes[i] != b'{' {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        let prelude = css[prelude_start..i].trim().to_string();
        let (body_end, after) = match_brace(css, i);
        let body = css[i + 1..body_end].to_string();
        if !prelude.is_empty() {
            blocks.push((prelude, body));
        }
        i = after;
    }
    blocks
}

/// Skip an at-rule starting at `i`; returns the index after its `;` or
/// matched `{}` block
fn skip_at_rule(css: &str, i: usize) -> usize {
    let bytes = css.as_bytes();
    let mut j = i;
    while j < bytes.len() {
        match bytes[j] {
            b';' => return j + 1,
            b'{' => return match_brace(css, j).1,
            _ => j += 1,
        }
    }
    bytes.len()
}

/// Given the index of a `{`, return (index of matching `}`, index after it)
fn match_brace(css: &str, open: usize) -> (usize, usize) {
    let bytes = css.as_bytes();
    let mut depth = 0usize;
    let mut j = open;
    while j < bytes.len() {
        match bytes[j] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return (j, j + 1);
                }
            }
            _ => {}
        }
        j += 1;
    }
    (bytes.len(), bytes.len())
}

/// Parse a declaration body (style block interior or an inline `style`
/// attribute value) into raw declarations, skipping anything malformed
pub fn parse_declarations(text: &str) -> Vec<Declaration> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    let mut declarations = Vec::new();

    while !parser.is_exhausted() {
        parser.skip_whitespace();
        if parser.is_exhausted() {
            break;
        }

        let result: Result<Declaration, ParseError<()>> = parser.try_parse(|p| {
            let property = p.expect_ident()?.to_string().to_ascii_lowercase();
            p.expect_colon()?;
            p.skip_whitespace();
            let value_start = p.position();
            loop {
                match p.next() {
                    Ok(Token::Semicolon) | Err(_) => break,
                    Ok(Token::Function(_))
                    | Ok(Token::ParenthesisBlock)
                    | Ok(Token::SquareBracketBlock)
                    | Ok(Token::CurlyBracketBlock) => {
                        // Consume the nested block so the value slice keeps
                        // full function text like rgb(10, 20, 30)
                        let _ = p.parse_nested_block(|nested| {
                            while nested.next().is_ok() {}
                            Ok::<_, ParseError<()>>(())
                        });
                    }
                    Ok(_) => {}
                }
            }
            let value = p
                .slice_from(value_start)
                .trim_end_matches(';')
                .trim()
                .to_string();
            if value.is_empty() {
                return Err(p.new_error(BasicParseErrorKind::EndOfInput));
            }
            Ok(Declaration { property, value })
        });

        match result {
            Ok(decl) => declarations.push(decl),
            Err(_) => skip_to_semicolon(&mut parser),
        }
    }

    declarations
}

/// Skip to the next semicolon or end of input after a malformed declaration
fn skip_to_semicolon(parser: &mut Parser<'_, '_>) {
    loop {
        match parser.next() {
            Ok(Token::Semicolon) | Err(_) => break,
            Ok(Token::Function(_))
            | Ok(Token::ParenthesisBlock)
            | Ok(Token::SquareBracketBlock)
            | Ok(Token::CurlyBracketBlock) => {
                let _ = parser.parse_nested_block(|nested| {
                    while nested.next().is_ok() {}
                    Ok::<_, ParseError<()>>(())
                });
            }
            Ok(_) => {}
        }
    }
}
