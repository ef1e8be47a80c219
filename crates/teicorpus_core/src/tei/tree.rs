//! Owned, namespace-resolved XML element tree.
//!
//! # Responsibility
//! - Parse well-formed XML bytes into `DocumentTree`.
//! - Offer the small query surface extraction needs (child/descendant
//!   lookup, attribute access, text content).
//!
//! # Invariants
//! - Text nodes are kept verbatim (no trimming), in document order.
//! - Namespace declarations are resolved at parse time and not kept as
//!   attributes.

use super::{element_namespace, is_tei_namespace, XmlError, XmlResult, XML_NS};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;

/// One parsed XML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentTree {
    root: Element,
}

/// One child of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// Attribute with its resolved namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub namespace: Option<String>,
    pub local_name: String,
    pub value: String,
}

/// Element with resolved namespace, attributes and ordered children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub namespace: Option<String>,
    pub local_name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
}

impl DocumentTree {
    /// Parses a complete XML document.
    ///
    /// # Errors
    /// - Any well-formedness violation reported by the reader.
    /// - Missing root element or unclosed elements at end of input.
    pub fn parse(bytes: &[u8]) -> XmlResult<Self> {
        let mut reader = NsReader::from_reader(bytes);
        let mut buf = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let (resolved, event) = reader.read_resolved_event_into(&mut buf)?;
            let namespace = element_namespace(&resolved);
            match event {
                Event::Start(start) => {
                    stack.push(element_from_start(&reader, namespace, &start)?);
                }
                Event::Empty(start) => {
                    let element = element_from_start(&reader, namespace, &start)?;
                    attach(&mut stack, &mut root, element);
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or(XmlError::UnbalancedEnd)?;
                    attach(&mut stack, &mut root, element);
                }
                Event::Text(text) => {
                    if let Some(parent) = stack.last_mut() {
                        push_text(parent, &text.unescape()?);
                    }
                }
                Event::CData(data) => {
                    if let Some(parent) = stack.last_mut() {
                        push_text(parent, std::str::from_utf8(&data.into_inner())?);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if let Some(open) = stack.pop() {
            return Err(XmlError::UnclosedElement(open.local_name));
        }
        root.map(|root| Self { root }).ok_or(XmlError::MissingRoot)
    }

    pub fn root(&self) -> &Element {
        &self.root
    }
}

impl Element {
    /// Returns whether this element is the TEI element `local_name`.
    ///
    /// Elements without a namespace also match, so unqualified documents are
    /// accepted. Elements with an undeclared prefix never match.
    pub fn is(&self, local_name: &str) -> bool {
        self.local_name == local_name && is_tei_namespace(self.namespace.as_deref())
    }

    /// Value of a non-namespaced attribute.
    pub fn attr(&self, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.namespace.is_none() && attr.local_name == local_name)
            .map(|attr| attr.value.as_str())
    }

    /// Value of a namespaced attribute.
    pub fn attr_ns(&self, namespace: &str, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.namespace.as_deref() == Some(namespace) && attr.local_name == local_name)
            .map(|attr| attr.value.as_str())
    }

    /// The `xml:id` of this element, if any.
    pub fn xml_id(&self) -> Option<&str> {
        self.attr_ns(XML_NS, "id")
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    /// Pre-order iterator over all descendant elements (excluding `self`).
    pub fn descendants(&self) -> Descendants<'_> {
        let mut stack: Vec<&Element> = self.child_elements().collect();
        stack.reverse();
        Descendants { stack }
    }

    /// First descendant (document order) that is the TEI element `local_name`.
    pub fn find_descendant(&self, local_name: &str) -> Option<&Element> {
        self.descendants().find(|element| element.is(local_name))
    }

    /// First element matching `.//first/second/...`.
    ///
    /// The first step matches any descendant, later steps match direct
    /// children only.
    pub fn find_path(&self, path: &[&str]) -> Option<&Element> {
        let (first, rest) = path.split_first()?;
        self.descendants()
            .filter(|element| element.is(first))
            .find_map(|anchor| follow_children(anchor, rest))
    }

    /// Concatenation of every descendant text node, untrimmed.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }
}

/// Iterator returned by [`Element::descendants`].
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        let before = self.stack.len();
        self.stack.extend(next.child_elements());
        self.stack[before..].reverse();
        Some(next)
    }
}

fn follow_children<'a>(anchor: &'a Element, steps: &[&str]) -> Option<&'a Element> {
    let Some((step, rest)) = steps.split_first() else {
        return Some(anchor);
    };
    anchor
        .child_elements()
        .filter(|child| child.is(step))
        .find_map(|child| follow_children(child, rest))
}

fn collect_text(element: &Element, out: &mut String) {
    for child in &element.children {
        match child {
            Node::Text(text) => out.push_str(text),
            Node::Element(inner) => collect_text(inner, out),
        }
    }
}

fn element_from_start<R>(
    reader: &NsReader<R>,
    namespace: Option<String>,
    start: &BytesStart<'_>,
) -> XmlResult<Element> {
    let local_name = std::str::from_utf8(start.local_name().as_ref())?.to_string();
    let mut attributes = Vec::new();

    for attr in start.attributes() {
        let attr = attr?;
        let raw_key = attr.key.as_ref();
        if raw_key == b"xmlns" || raw_key.starts_with(b"xmlns:") {
            continue;
        }

        let (resolved, local) = reader.resolve_attribute(attr.key);
        let attr_namespace = match resolved {
            ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
            ResolveResult::Unknown(prefix) if prefix.as_slice() == b"xml" => {
                Some(XML_NS.to_string())
            }
            ResolveResult::Unbound | ResolveResult::Unknown(_) => None,
        };
        attributes.push(Attribute {
            namespace: attr_namespace,
            local_name: std::str::from_utf8(local.as_ref())?.to_string(),
            value: attr.unescape_value()?.into_owned(),
        });
    }

    Ok(Element {
        namespace,
        local_name,
        attributes,
        children: Vec::new(),
    })
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

fn push_text(parent: &mut Element, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Node::Text(existing)) = parent.children.last_mut() {
        existing.push_str(text);
        return;
    }
    parent.children.push(Node::Text(text.to_string()));
}
