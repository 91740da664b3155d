//! Node types for the XML tree
#![allow(clippy::must_use_candidate)] // Builder/accessor API intentionally omits pervasive #[must_use].
#![allow(clippy::return_self_not_must_use)] // Fluent builder methods return Self for ergonomics.

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::metadata::Position;
use crate::{Error, Result};

/// A namespace-qualified name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QName {
    /// Namespace URI, `None` for names in no namespace
    pub namespace: Option<String>,

    /// Local part
    pub local: String,
}

impl QName {
    /// Create a name in no namespace
    pub fn local(local: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local: local.into(),
        }
    }

    /// Create a name in the given namespace
    pub fn qualified(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local: local.into(),
        }
    }

    /// Create a name in an optional namespace
    pub fn new(namespace: Option<&str>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            local: local.into(),
        }
    }

    /// Check whether the name lives in `namespace`
    pub fn is_in(&self, namespace: &str) -> bool {
        self.namespace.as_deref() == Some(namespace)
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{ns}}}{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// An attribute on an element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name
    pub name: QName,

    /// Unescaped attribute value
    pub value: String,
}

/// Content of an element, in document order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node {
    /// Child element
    Element(Element),

    /// Character data (text or CDATA)
    Text(String),
}

/// An element in the XML tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    /// Element name
    pub name: QName,

    /// Attributes in document order (namespace declarations excluded)
    pub attributes: Vec<Attribute>,

    /// Namespace declarations made on this element (`None` prefix = default namespace)
    pub namespaces: Vec<(Option<String>, String)>,

    /// Child content in document order
    pub nodes: Vec<Node>,

    /// Position of the start tag
    pub position: Position,
}

impl Element {
    /// Create a new element
    pub fn new(name: QName) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            namespaces: Vec::new(),
            nodes: Vec::new(),
            position: Position::default(),
        }
    }

    /// Add an attribute
    pub fn with_attribute(mut self, name: QName, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute {
            name,
            value: value.into(),
        });
        self
    }

    /// Add a child element
    pub fn with_child(mut self, child: Element) -> Self {
        self.nodes.push(Node::Element(child));
        self
    }

    /// Add text content
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.push_text(text);
        self
    }

    /// Append text, merging with a directly preceding text node
    pub fn push_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if let Some(Node::Text(last)) = self.nodes.last_mut() {
            last.push_str(&text);
        } else {
            self.nodes.push(Node::Text(text));
        }
    }

    /// Append a child element
    pub fn push_child(&mut self, child: Element) -> &mut Self {
        self.nodes.push(Node::Element(child));
        self
    }

    /// Get the value of an unqualified attribute
    pub fn attribute(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.namespace.is_none() && a.name.local == local)
            .map(|a| a.value.as_str())
    }

    /// Get the value of an attribute by full name
    pub fn attribute_ns(&self, name: &QName) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| &a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Iterate over child elements
    pub fn children(&self) -> impl Iterator<Item = &Element> {
        self.nodes.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// Find the first child element with the given name
    pub fn find_child(&self, name: &QName) -> Option<&Element> {
        self.children().find(|c| &c.name == name)
    }

    /// Find all child elements with the given name
    pub fn find_children<'a>(&'a self, name: &'a QName) -> impl Iterator<Item = &'a Element> {
        self.children().filter(move |c| &c.name == name)
    }

    /// Check for child elements
    pub fn has_children(&self) -> bool {
        self.children().next().is_some()
    }

    /// Direct text content, trimmed
    pub fn text(&self) -> String {
        let mut text = String::new();
        for node in &self.nodes {
            if let Node::Text(t) = node {
                text.push_str(t);
            }
        }
        text.trim().to_string()
    }

    /// Concatenated text of this element and all descendants
    pub fn text_content(&self) -> String {
        let mut text = String::new();
        collect_text(self, &mut text);
        text
    }

    /// Serialize the mixed content of this element (text and child markup)
    pub fn inner_markup(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        for node in &self.nodes {
            write_node(&mut writer, node, self.name.namespace.as_deref())?;
        }
        String::from_utf8(writer.into_inner()).map_err(|e| Error::Write(e.to_string()))
    }
}

fn collect_text(element: &Element, out: &mut String) {
    for node in &element.nodes {
        match node {
            Node::Text(t) => out.push_str(t),
            Node::Element(e) => collect_text(e, out),
        }
    }
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &Node, parent_ns: Option<&str>) -> Result<()> {
    match node {
        Node::Text(text) => writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(|e| Error::Write(e.to_string())),
        Node::Element(element) => {
            let mut start = BytesStart::new(element.name.local.as_str());
            let namespace = element.name.namespace.as_deref();
            if namespace != parent_ns {
                start.push_attribute(("xmlns", namespace.unwrap_or("")));
            }
            for attribute in &element.attributes {
                start.push_attribute((attribute.name.local.as_str(), attribute.value.as_str()));
            }
            if element.nodes.is_empty() {
                return writer
                    .write_event(Event::Empty(start))
                    .map_err(|e| Error::Write(e.to_string()));
            }
            writer
                .write_event(Event::Start(start))
                .map_err(|e| Error::Write(e.to_string()))?;
            for child in &element.nodes {
                write_node(writer, child, namespace)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(element.name.local.as_str())))
                .map_err(|e| Error::Write(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qname_display() {
        assert_eq!(QName::local("Weakness").to_string(), "Weakness");
        assert_eq!(
            QName::qualified("http://cwe.mitre.org/cwe-7", "Weakness").to_string(),
            "{http://cwe.mitre.org/cwe-7}Weakness"
        );
    }

    #[test]
    fn test_qname_ordering_is_by_namespace_then_local() {
        let mut names = vec![
            QName::qualified("urn:b", "A"),
            QName::local("Z"),
            QName::qualified("urn:a", "B"),
        ];
        names.sort();
        assert_eq!(names[0], QName::local("Z"));
        assert_eq!(names[1], QName::qualified("urn:a", "B"));
    }

    #[test]
    fn test_attribute_lookup() {
        let element = Element::new(QName::local("Weakness"))
            .with_attribute(QName::local("ID"), "79")
            .with_attribute(QName::qualified("urn:x", "ID"), "other");

        assert_eq!(element.attribute("ID"), Some("79"));
        assert_eq!(
            element.attribute_ns(&QName::qualified("urn:x", "ID")),
            Some("other")
        );
        assert_eq!(element.attribute("Name"), None);
    }

    #[test]
    fn test_text_and_text_content() {
        let element = Element::new(QName::local("p"))
            .with_text("  Hello ")
            .with_child(Element::new(QName::local("b")).with_text("bold"))
            .with_text(" world  ");

        assert_eq!(element.text(), "Hello  world");
        assert_eq!(element.text_content(), "  Hello bold world  ");
    }

    #[test]
    fn test_push_text_merges_adjacent_text() {
        let mut element = Element::new(QName::local("a"));
        element.push_text("one");
        element.push_text("two");
        assert_eq!(element.nodes.len(), 1);
        assert_eq!(element.text(), "onetwo");
    }

    #[test]
    fn test_find_children() {
        let item = QName::local("item");
        let element = Element::new(QName::local("list"))
            .with_child(Element::new(item.clone()).with_text("1"))
            .with_child(Element::new(QName::local("other")))
            .with_child(Element::new(item.clone()).with_text("2"));

        let found: Vec<String> = element.find_children(&item).map(Element::text).collect();
        assert_eq!(found, vec!["1", "2"]);
        assert!(element.find_child(&QName::local("missing")).is_none());
    }

    #[test]
    fn test_inner_markup_escapes_and_declares_namespaces() {
        let xhtml = "http://www.w3.org/1999/xhtml";
        let element = Element::new(QName::qualified("urn:cwe", "Description"))
            .with_text("a < b ")
            .with_child(
                Element::new(QName::qualified(xhtml, "p"))
                    .with_child(Element::new(QName::qualified(xhtml, "br"))),
            );

        let markup = element.inner_markup().unwrap();
        assert_eq!(
            markup,
            "a &lt; b <p xmlns=\"http://www.w3.org/1999/xhtml\"><br/></p>"
        );
    }
}
