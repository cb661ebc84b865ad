//! DOM Node
//!
//! Nodes live in the `DomTree` arena and refer to each other by `NodeId`.

use crate::{Attr, NamedNodeMap, NodeId};

/// DOM Node - Core structure
#[derive(Debug)]
pub struct Node {
    /// Parent node (None for the document root and detached subtrees)
    pub parent: Option<NodeId>,
    /// Children in document order
    pub children: Vec<NodeId>,
    /// Node-specific data
    pub data: NodeData,
}

impl Node {
    /// Create a new element node
    pub fn element(tag_name: &str) -> Self {
        Self::with_data(NodeData::Element(ElementData::new(tag_name)))
    }

    /// Create a new text node
    pub fn text(content: String) -> Self {
        Self::with_data(NodeData::Text(TextData { content }))
    }

    /// Create a document node
    pub fn document() -> Self {
        Self::with_data(NodeData::Document)
    }

    fn with_data(data: NodeData) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            data,
        }
    }

    /// Check if this is text
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.data, NodeData::Text(_))
    }

    /// Get element data if this is an element
    #[inline]
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get mutable element data
    #[inline]
    pub fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }
}

/// Node-specific data
#[derive(Debug)]
pub enum NodeData {
    /// Document root
    Document,
    /// Element
    Element(ElementData),
    /// Text content
    Text(TextData),
}

/// Element-specific data
#[derive(Debug, Clone)]
pub struct ElementData {
    /// Lowercased tag name
    pub tag_name: String,
    /// Attributes, including `id` and `class`
    pub attributes: NamedNodeMap,
}

impl ElementData {
    pub fn new(tag_name: &str) -> Self {
        Self {
            tag_name: tag_name.to_ascii_lowercase(),
            attributes: NamedNodeMap::new(),
        }
    }

    /// Value of the `id` attribute
    pub fn id(&self) -> Option<&str> {
        self.attributes.get_attribute("id")
    }

    /// Whitespace-separated tokens of the `class` attribute
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .get_attribute("class")
            .unwrap_or("")
            .split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    /// Add a class token (no-op if present)
    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let mut tokens: Vec<&str> = self.classes().collect();
        tokens.push(class);
        let value = tokens.join(" ");
        self.attributes.set_named_item(Attr::new("class", value));
    }

    /// Get an attribute value
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get_attribute(name)
    }

    /// Set an attribute
    pub fn set_attribute(&mut self, name: &str, value: &str) {
        self.attributes.set_named_item(Attr::new(name, value));
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.has_attribute(name)
    }
}

/// Text node data
#[derive(Debug)]
pub struct TextData {
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_tokens() {
        let mut elem = ElementData::new("DIV");
        elem.set_attribute("class", "  foo   bar ");

        assert_eq!(elem.tag_name, "div");
        assert_eq!(elem.classes().collect::<Vec<_>>(), vec!["foo", "bar"]);
        assert!(elem.has_class("bar"));
        assert!(!elem.has_class("ba"));
    }

    #[test]
    fn test_add_class_is_idempotent() {
        let mut elem = ElementData::new("div");
        elem.add_class("grandchild");
        elem.add_class("grandchild");
        elem.add_class("active");
        assert_eq!(elem.get_attribute("class"), Some("grandchild active"));
    }

    #[test]
    fn test_node_kinds() {
        let node = Node::text("hi".to_string());
        assert!(node.is_text());
        assert!(node.as_element().is_none());
        assert!(Node::document().as_element().is_none());
    }
}
