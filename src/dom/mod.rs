//! Owned document tree the pipeline operates on
//!
//! The tree exclusively owns its nodes: children are owned by their parent
//! and there are no upward references. Passes that need ancestor context
//! carry an explicit ancestor stack while walking (see [`query`]).

mod parser;
pub mod query;

pub use parser::HtmlParser;

/// Node types in the document tree
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    /// Document root
    Document,
    /// Element node (e.g., <td>)
    Element(ElementData),
    /// Text node
    Text(String),
    /// Comment node
    Comment(String),
}

/// An element attribute; attributes keep their source order
#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    pub name: String,
    pub value: String,
}

/// Data for element nodes
#[derive(Debug, Clone, PartialEq)]
pub struct ElementData {
    /// Tag name, always lowercase (e.g., "td", "img")
    pub tag: String,
    /// Ordered attribute list
    pub attrs: Vec<Attr>,
}

impl ElementData {
    /// Create a new element
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
        }
    }

    /// Get an attribute value
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Set an attribute, replacing an existing value in place
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(attr) = self.attrs.iter_mut().find(|a| a.name == name) {
            attr.value = value;
        } else {
            self.attrs.push(Attr { name, value });
        }
    }

    /// Set an attribute only if it is not already present
    pub fn set_attr_if_absent(&mut self, name: &str, value: &str) {
        if self.attr(name).is_none() {
            self.set_attr(name, value);
        }
    }

    /// Remove an attribute, returning its previous value
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let idx = self.attrs.iter().position(|a| a.name == name)?;
        Some(self.attrs.remove(idx).value)
    }

    /// Get the ID attribute
    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    /// Get class names
    pub fn classes(&self) -> Vec<&str> {
        self.attr("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// Check membership in the class list
    pub fn has_class(&self, class: &str) -> bool {
        self.classes().contains(&class)
    }
}

/// A node in the document tree
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Node type and data
    pub data: NodeData,
    /// Child nodes, in document order
    pub children: Vec<Node>,
}

impl Node {
    /// Create a new node
    pub fn new(data: NodeData) -> Self {
        Self {
            data,
            children: Vec::new(),
        }
    }

    /// Create an element node
    pub fn element(tag: impl Into<String>) -> Self {
        Self::new(NodeData::Element(ElementData::new(tag)))
    }

    /// Create a text node
    pub fn text(content: impl Into<String>) -> Self {
        Self::new(NodeData::Text(content.into()))
    }

    /// Create a comment node
    pub fn comment(content: impl Into<String>) -> Self {
        Self::new(NodeData::Comment(content.into()))
    }

    /// Add a child node
    pub fn add_child(&mut self, child: Node) {
        self.children.push(child);
    }

    /// Check if this is an element node
    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    /// Get element data if this is an element
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(data) => Some(data),
            _ => None,
        }
    }

    /// Get mutable element data if this is an element
    pub fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(data) => Some(data),
            _ => None,
        }
    }

    /// Check the tag name of an element node
    pub fn is_tag(&self, tag: &str) -> bool {
        self.as_element().is_some_and(|e| e.tag == tag)
    }

    /// Concatenated text of this node and its descendants
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match &self.data {
            NodeData::Text(t) => out.push_str(t),
            _ => {
                for child in &self.children {
                    child.collect_text(out);
                }
            }
        }
    }

    /// Whether any descendant text node contains non-whitespace
    pub fn has_text(&self) -> bool {
        match &self.data {
            NodeData::Text(t) => !t.trim().is_empty(),
            _ => self.children.iter().any(Node::has_text),
        }
    }

    /// Find the first descendant element (depth-first) with the given tag
    pub fn find_tag_mut(&mut self, tag: &str) -> Option<&mut Node> {
        if self.is_tag(tag) {
            return Some(self);
        }
        for child in &mut self.children {
            if let Some(found) = child.find_tag_mut(tag) {
                return Some(found);
            }
        }
        None
    }

    /// Depth-first walk over every element, mutably
    pub fn for_each_element_mut(&mut self, f: &mut impl FnMut(&mut ElementData)) {
        if let NodeData::Element(data) = &mut self.data {
            f(data);
        }
        for child in &mut self.children {
            child.for_each_element_mut(f);
        }
    }

    /// Remove descendant elements matching a predicate, depth-first
    pub fn retain_elements(&mut self, keep: &impl Fn(&ElementData) -> bool) {
        self.children.retain(|c| match c.as_element() {
            Some(data) => keep(data),
            None => true,
        });
        for child in &mut self.children {
            child.retain_elements(keep);
        }
    }
}

/// The document tree
#[derive(Debug, Clone)]
pub struct Document {
    /// Root node (always `NodeData::Document`)
    pub root: Node,
}

impl Document {
    /// Create a new empty document
    pub fn new() -> Self {
        Self {
            root: Node::new(NodeData::Document),
        }
    }

    /// The `html` element, if the document has one
    pub fn html_mut(&mut self) -> Option<&mut Node> {
        self.root.children.iter_mut().find(|n| n.is_tag("html"))
    }

    /// The first descendant with the given tag (typically "head" or "body")
    pub fn find_tag_mut(&mut self, tag: &str) -> Option<&mut Node> {
        self.root.find_tag_mut(tag)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_order_preserved() {
        let mut el = ElementData::new("img");
        el.set_attr("src", "a.png");
        el.set_attr("alt", "a");
        el.set_attr("border", "0");
        let names: Vec<&str> = el.attrs.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["src", "alt", "border"]);
    }

    #[test]
    fn test_set_attr_replaces_in_place() {
        let mut el = ElementData::new("a");
        el.set_attr("href", "http://example.com");
        el.set_attr("class", "link");
        el.set_attr("href", "https://example.com");
        assert_eq!(el.attr("href"), Some("https://example.com"));
        assert_eq!(el.attrs[0].name, "href");
    }

    #[test]
    fn test_set_attr_if_absent() {
        let mut el = ElementData::new("img");
        el.set_attr("width", "300");
        el.set_attr_if_absent("width", "600");
        el.set_attr_if_absent("border", "0");
        assert_eq!(el.attr("width"), Some("300"));
        assert_eq!(el.attr("border"), Some("0"));
    }

    #[test]
    fn test_text_content_walks_descendants() {
        let mut div = Node::element("div");
        div.add_child(Node::text("Hello "));
        let mut b = Node::element("b");
        b.add_child(Node::text("world"));
        div.add_child(b);
        assert_eq!(div.text_content(), "Hello world");
        assert!(div.has_text());
    }

    #[test]
    fn test_retain_elements_removes_deeply() {
        let mut body = Node::element("body");
        let mut div = Node::element("div");
        div.add_child(Node::element("style"));
        body.add_child(div);
        body.add_child(Node::element("style"));
        body.retain_elements(&|e| e.tag != "style");
        assert_eq!(body.children.len(), 1);
        assert!(body.children[0].children.is_empty());
    }

    #[test]
    fn test_classes() {
        let mut el = ElementData::new("td");
        el.set_attr("class", "cell  footer");
        assert!(el.has_class("footer"));
        assert!(!el.has_class("foot"));
    }
}
