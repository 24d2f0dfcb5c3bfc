//! Ordered per-element style map backing the `style` attribute

use super::{Declaration, parse_declarations};
use crate::dom::ElementData;

/// Ordered property map parsed from an inline `style` attribute
///
/// Existing declarations are authoritative: merges only add properties that
/// are absent, so author-written inline styles always win over inlined rules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleMap {
    declarations: Vec<Declaration>,
}

impl StyleMap {
    /// Parse a `style` attribute value
    ///
    /// Duplicate properties collapse to the last occurrence, per the CSS
    /// cascade within a single declaration block.
    pub fn parse(style: &str) -> Self {
        Self::from_declarations(&parse_declarations(style))
    }

    /// Build a map from raw declarations, collapsing duplicates last-wins
    pub fn from_declarations<'a>(declarations: impl IntoIterator<Item = &'a Declaration>) -> Self {
        let mut map = Self::default();
        for decl in declarations {
            map.set(&decl.property, &decl.value);
        }
        map
    }

    /// Read an element's inline style
    pub fn from_element(el: &ElementData) -> Self {
        el.attr("style").map(Self::parse).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Declarations in serialization order
    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    /// Value of a property, if present
    pub fn get(&self, property: &str) -> Option<&str> {
        self.declarations
            .iter()
            .find(|d| d.property == property)
            .map(|d| d.value.as_str())
    }

    pub fn contains(&self, property: &str) -> bool {
        self.get(property).is_some()
    }

    /// Set a property, replacing an existing value in place
    pub fn set(&mut self, property: &str, value: &str) {
        if let Some(decl) = self.declarations.iter_mut().find(|d| d.property == property) {
            decl.value = value.to_string();
        } else {
            self.declarations.push(Declaration {
                property: property.to_string(),
                value: value.to_string(),
            });
        }
    }

    /// Set a property only if absent (existing wins)
    pub fn set_if_absent(&mut self, property: &str, value: &str) {
        if !self.contains(property) {
            self.set(property, value);
        }
    }

    /// Remove a property, returning whether it was present
    pub fn remove(&mut self, property: &str) -> bool {
        let before = self.declarations.len();
        self.declarations.retain(|d| d.property != property);
        self.declarations.len() != before
    }

    /// Merge declarations in, adding only properties not already present
    pub fn merge_missing<'a>(&mut self, declarations: impl IntoIterator<Item = &'a Declaration>) {
        for decl in declarations {
            self.set_if_absent(&decl.property, &decl.value);
        }
    }

    /// Serialize back to a `style` attribute value
    pub fn to_attr(&self) -> String {
        self.declarations
            .iter()
            .map(|d| format!("{}: {}", d.property, d.value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Write the map back onto the element, dropping the attribute when empty
    pub fn apply_to(&self, el: &mut ElementData) {
        if self.is_empty() {
            el.remove_attr("style");
        } else {
            el.set_attr("style", self.to_attr());
        }
    }
}
