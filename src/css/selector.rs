//! Constrained selector engine: parsing, matching, specificity and the
//! inlinability filter
//!
//! The grammar is deliberately tiny — tag, `.class`, `#id`, `[attr]`,
//! `[attr=v]`, `[attr^=v]`, with descendant and child combinators. This is
//! what a cascade-unaware inliner can safely apply; anything richer is
//! rejected up front by [`is_inlinable`] or at parse time.

use crate::dom::ElementData;
use crate::utils::{MailpressError, Result};

/// Attribute matching operator
#[derive(Debug, Clone, PartialEq)]
pub enum AttrOp {
    /// `[attr]`
    Exists,
    /// `[attr=value]`
    Equals,
    /// `[attr^=value]`
    Prefix,
}

/// One `[attr...]` component
#[derive(Debug, Clone, PartialEq)]
pub struct AttrSelector {
    pub name: String,
    pub op: AttrOp,
    pub value: String,
}

/// A compound selector: everything between two combinators
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Compound {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<AttrSelector>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.id.is_none() && self.classes.is_empty() && self.attrs.is_empty()
    }

    /// Check this compound against a single element
    pub fn matches(&self, el: &ElementData) -> bool {
        if let Some(tag) = &self.tag {
            if el.tag != *tag {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if el.id() != Some(id.as_str()) {
                return false;
            }
        }
        for class in &self.classes {
            if !el.has_class(class) {
                return false;
            }
        }
        for attr in &self.attrs {
            let value = el.attr(&attr.name);
            let ok = match attr.op {
                AttrOp::Exists => value.is_some(),
                AttrOp::Equals => value == Some(attr.value.as_str()),
                AttrOp::Prefix => value.is_some_and(|v| v.starts_with(&attr.value)),
            };
            if !ok {
                return false;
            }
        }
        true
    }
}

/// Combinator between two compounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Combinator {
    /// Whitespace
    Descendant,
    /// `>`
    Child,
}

/// A parsed selector: compounds joined by combinators
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    /// Left-to-right compound parts
    pub parts: Vec<Compound>,
    /// Combinators between parts; `combinators[i]` sits between
    /// `parts[i]` and `parts[i + 1]`
    pub combinators: Vec<Combinator>,
}

impl Selector {
    /// Parse a single (non-comma-separated) selector
    pub fn parse(source: &str) -> Result<Selector> {
        let source = source.trim();
        if source.is_empty() {
            return Err(MailpressError::selector(source, "empty selector"));
        }

        let mut parts = Vec::new();
        let mut combinators = Vec::new();
        let mut current = Compound::default();
        let mut pending: Option<Combinator> = None;
        let mut chars = source.chars().peekable();

        let commit =
            |current: &mut Compound,
             pending: &mut Option<Combinator>,
             parts: &mut Vec<Compound>,
             combinators: &mut Vec<Combinator>|
             -> Result<()> {
                if current.is_empty() {
                    return Ok(());
                }
                if !parts.is_empty() {
                    combinators.push(pending.take().unwrap_or(Combinator::Descendant));
                }
                *pending = None;
                parts.push(std::mem::take(current));
                Ok(())
            };

        while let Some(c) = chars.next() {
            match c {
                '*' => {
                    return Err(MailpressError::selector(source, "universal selector"));
                }
                ':' => {
                    return Err(MailpressError::selector(
                        source,
                        "pseudo-classes and pseudo-elements are not supported",
                    ));
                }
                '~' | '+' => {
                    return Err(MailpressError::selector(
                        source,
                        "sibling combinators are not supported",
                    ));
                }
                '>' => {
                    commit(&mut current, &mut pending, &mut parts, &mut combinators)?;
                    if parts.is_empty() {
                        return Err(MailpressError::selector(source, "leading combinator"));
                    }
                    pending = Some(Combinator::Child);
                }
                c if c.is_whitespace() => {
                    commit(&mut current, &mut pending, &mut parts, &mut combinators)?;
                }
                '#' => {
                    let name = take_name(&mut chars);
                    if name.is_empty() {
                        return Err(MailpressError::selector(source, "empty id"));
                    }
                    current.id = Some(name);
                }
                '.' => {
                    let name = take_name(&mut chars);
                    if name.is_empty() {
                        return Err(MailpressError::selector(source, "empty class"));
                    }
                    current.classes.push(name);
                }
                '[' => {
                    current.attrs.push(parse_attr(source, &mut chars)?);
                }
                c if c.is_ascii_alphanumeric() || c == '-' || c == '_' => {
                    let mut name = c.to_ascii_lowercase().to_string();
                    name.push_str(&take_name(&mut chars).to_ascii_lowercase());
                    if current.tag.is_some() || !current.is_empty() {
                        return Err(MailpressError::selector(source, "misplaced tag name"));
                    }
                    current.tag = Some(name);
                }
                other => {
                    return Err(MailpressError::selector(
                        source,
                        format!("unexpected character `{other}`"),
                    ));
                }
            }
        }
        commit(&mut current, &mut pending, &mut parts, &mut combinators)?;

        if parts.is_empty() {
            return Err(MailpressError::selector(source, "no selector parts"));
        }
        if pending.is_some() {
            return Err(MailpressError::selector(source, "trailing combinator"));
        }
        Ok(Selector { parts, combinators })
    }

    /// Match an element given its ancestor element snapshots, ordered from
    /// the root down to the immediate parent
    pub fn matches(&self, el: &ElementData, ancestors: &[ElementData]) -> bool {
        let last = self.parts.len() - 1;
        if !self.parts[last].matches(el) {
            return false;
        }

        // Walk remaining parts right-to-left up the ancestor stack
        let mut upper = ancestors.len();
        for idx in (0..last).rev() {
            match self.combinators[idx] {
                Combinator::Child => {
                    if upper == 0 {
                        return false;
                    }
                    upper -= 1;
                    if !self.parts[idx].matches(&ancestors[upper]) {
                        return false;
                    }
                }
                Combinator::Descendant => loop {
                    if upper == 0 {
                        return false;
                    }
                    upper -= 1;
                    if self.parts[idx].matches(&ancestors[upper]) {
                        break;
                    }
                },
            }
        }
        true
    }
}

fn take_name(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut name = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            name.push(c);
            chars.next();
        } else {
            break;
        }
    }
    name
}

fn parse_attr(
    source: &str,
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
) -> Result<AttrSelector> {
    let mut inner = String::new();
    let mut closed = false;
    for c in chars.by_ref() {
        if c == ']' {
            closed = true;
            break;
        }
        inner.push(c);
    }
    if !closed {
        return Err(MailpressError::selector(source, "unterminated attribute selector"));
    }
    let inner = inner.trim();

    let (name_part, op, value_part) = if let Some(eq) = inner.find("^=") {
        (&inner[..eq], AttrOp::Prefix, Some(&inner[eq + 2..]))
    } else if let Some(eq) = inner.find('=') {
        (&inner[..eq], AttrOp::Equals, Some(&inner[eq + 1..]))
    } else {
        (inner, AttrOp::Exists, None)
    };

    let name = name_part.trim().to_ascii_lowercase();
    if name.is_empty() {
        return Err(MailpressError::selector(source, "empty attribute name"));
    }
    let value = value_part
        .map(|v| v.trim().trim_matches('"').trim_matches('\'').to_string())
        .unwrap_or_default();
    Ok(AttrSelector { name, op, value })
}

/// Specificity score: `100 × ids + 10 × (classes + attributes + pseudo) +
/// 1 × tag names`, derived from the raw selector text
pub fn specificity(selector: &str) -> u32 {
    let mut ids = 0u32;
    let mut classes = 0u32;
    let mut tags = 0u32;
    let mut in_attr = false;
    let mut prev: Option<char> = None;

    for c in selector.chars() {
        match c {
            '[' => {
                classes += 1;
                in_attr = true;
            }
            ']' => in_attr = false,
            _ if in_attr => {}
            '#' => ids += 1,
            '.' => classes += 1,
            ':' => {
                // `::` counts once
                if prev != Some(':') {
                    classes += 1;
                }
            }
            c if c.is_ascii_alphanumeric() => {
                // A tag name starts a token at the selector start or after
                // whitespace/combinator
                let starts_token = matches!(prev, None | Some(' ') | Some('>') | Some('\t'));
                if starts_token {
                    tags += 1;
                }
            }
            _ => {}
        }
        prev = Some(if c.is_whitespace() { ' ' } else { c });
    }
    100 * ids + 10 * classes + tags
}

/// Whether a single selector is safe for a cascade-unaware inliner
///
/// Excludes the universal selector, `:root` and other pseudo-classes and
/// pseudo-elements, bare `html`/`body`/`table`/`td`, attribute-existence
/// tests on `style`, and sibling combinators. A selector qualifies only if
/// it carries a class, id or attribute component, or is a single bare tag
/// name outside the excluded set.
pub fn is_inlinable(selector: &str) -> bool {
    let s = selector.trim();
    if s.is_empty() {
        return false;
    }
    if s.contains('*') || s.contains('~') || s.contains('+') {
        return false;
    }
    // Any pseudo-class or pseudo-element (":root", ":hover", "::before")
    if s.contains(':') {
        return false;
    }
    if s.contains("[style]") {
        return false;
    }
    match s {
        "html" | "body" | "table" | "td" => return false,
        _ => {}
    }
    if s.contains('.') || s.contains('#') || s.contains('[') {
        return true;
    }
    // Single bare tag name, nothing else
    !s.contains(char::is_whitespace)
        && !s.contains('>')
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}
