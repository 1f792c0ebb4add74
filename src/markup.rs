//! A small owned element tree for XHTML content documents.
//!
//! Content documents are parsed once with `quick-xml` into a [`Document`]. Element
//! names keep their source form, and every element records the namespace its prefix
//! resolved to, so lookups such as "the XHTML `<body>`" are namespace-aware without
//! an XPath engine. Text, comments and entity references are stored as raw markup
//! and written back byte-for-byte.

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::escape::{escape, unescape};
use quick_xml::events::{BytesStart, Event};

use crate::error::{Error, Result};

/// Namespace URI of XHTML elements.
pub const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";

/// A node in the element tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    /// Raw (still escaped) character data, including entity references.
    Text(String),
    /// Raw CDATA section content.
    CData(String),
    Comment(String),
    /// Raw processing instruction content.
    ProcessingInstruction(String),
}

/// An attribute as found in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    /// Unescaped value, or the source text when it references entities XML does not define.
    pub value: String,
    /// `value` is source text and is written back unchanged.
    pub raw: bool,
}

/// An element with its resolved namespace, attributes and children.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    /// Qualified name as written in the source (`h:body`, `body`, `svg:svg`).
    pub name: String,
    /// Namespace URI the element's prefix resolved to.
    pub namespace: Option<String>,
    /// Attributes in source order.
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
}

impl Element {
    /// The element name without its prefix.
    pub fn local_name(&self) -> &str {
        match self.name.split_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }

    /// Whether this is the XHTML element with the given local name.
    pub fn is_xhtml(&self, local_name: &str) -> bool {
        self.namespace.as_deref() == Some(XHTML_NS) && self.local_name() == local_name
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    /// Replaces the value of an existing attribute with `update(value)`.
    ///
    /// The value keeps its form: a raw value is handed over and stored as raw text.
    /// Returns whether the attribute exists.
    pub fn update_attribute(&mut self, name: &str, update: impl FnOnce(&str) -> String) -> bool {
        match self.attributes.iter_mut().find(|attr| attr.name == name) {
            Some(attr) => {
                attr.value = update(&attr.value);
                true
            }
            None => false,
        }
    }

    /// Iterates over this element and all descendant elements, depth first.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Finds the single XHTML element named `local_name` in this subtree.
    ///
    /// Fails with [`Error::Structure`] when there is no such element or more than one.
    pub fn find_unique(&self, local_name: &str) -> Result<&Element> {
        let mut matches = self.descendants().filter(|e| e.is_xhtml(local_name));
        match (matches.next(), matches.next()) {
            (Some(found), None) => Ok(found),
            (None, _) => Err(Error::Structure(format!("no <{local_name}> element found"))),
            (Some(_), Some(_)) => Err(Error::Structure(format!(
                "more than one <{local_name}> element found"
            ))),
        }
    }

    /// Serializes the element and its subtree as HTML-flavoured XHTML.
    ///
    /// XHTML elements are written by local name and declarations binding the XHTML
    /// namespace are dropped; everything else is kept as parsed. Childless elements
    /// are written in self-closed form.
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        write_element(self, &mut out);
        out
    }
}

/// Depth-first iterator over an element subtree.
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let element = self.stack.pop()?;
        self.stack.extend(element.children.iter().rev().filter_map(|child| match child {
            Node::Element(e) => Some(e),
            _ => None,
        }));
        Some(element)
    }
}

/// A parsed content document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub root: Element,
}

impl Document {
    /// Parses a UTF-8 XHTML document.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        let mut reader = Reader::from_reader(bytes);

        // Open elements, each with the namespace bindings it introduced.
        let mut stack: Vec<(Element, HashMap<String, String>)> = Vec::new();
        let mut root: Option<Element> = None;
        let mut buf = Vec::new();

        loop {
            let event = reader.read_event_into(&mut buf)?;
            let node = match event {
                Event::Start(e) => {
                    let opened = open_element(&e, &stack)?;
                    stack.push(opened);
                    None
                }
                Event::Empty(e) => Some(Node::Element(open_element(&e, &stack)?.0)),
                Event::End(_) => match stack.pop() {
                    Some((element, _)) => Some(Node::Element(element)),
                    None => return Err(Error::Structure("unbalanced end tag".to_string())),
                },
                Event::Text(e) => Some(Node::Text(std::str::from_utf8(&e)?.to_string())),
                Event::GeneralRef(e) => Some(Node::Text(format!("&{};", std::str::from_utf8(&e)?))),
                Event::CData(e) => Some(Node::CData(std::str::from_utf8(&e)?.to_string())),
                Event::Comment(e) => Some(Node::Comment(std::str::from_utf8(&e)?.to_string())),
                Event::PI(e) => Some(Node::ProcessingInstruction(
                    std::str::from_utf8(&e)?.to_string(),
                )),
                Event::Decl(_) | Event::DocType(_) => None,
                Event::Eof => break,
            };
            buf.clear();

            let Some(node) = node else { continue };
            match stack.last_mut() {
                Some((parent, _)) => parent.children.push(node),
                None => {
                    if let Node::Element(element) = node {
                        if root.is_some() {
                            return Err(Error::Structure(
                                "document has more than one root element".to_string(),
                            ));
                        }
                        root = Some(element);
                    }
                }
            }
        }

        if !stack.is_empty() {
            return Err(Error::Structure("document ends inside an element".to_string()));
        }
        root.map(|root| Document { root })
            .ok_or_else(|| Error::Structure("document has no root element".to_string()))
    }

    /// Serializes the whole document (without XML declaration).
    pub fn to_markup(&self) -> String {
        self.root.to_markup()
    }
}

fn open_element(
    start: &BytesStart<'_>,
    stack: &[(Element, HashMap<String, String>)],
) -> Result<(Element, HashMap<String, String>)> {
    let name = std::str::from_utf8(start.name().as_ref())?.to_string();
    let mut attributes = Vec::new();
    let mut bindings = HashMap::new();

    for attr in start.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
        let source = std::str::from_utf8(&attr.value)?;
        // Unknown entities (e.g. HTML named entities) are kept verbatim.
        let (value, raw) = match unescape(source) {
            Ok(value) => (value.into_owned(), false),
            Err(_) => (source.to_string(), true),
        };
        if key == "xmlns" {
            bindings.insert(String::new(), value.clone());
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            bindings.insert(prefix.to_string(), value.clone());
        }
        attributes.push(Attribute {
            name: key,
            value,
            raw,
        });
    }

    let prefix = name.split_once(':').map(|(p, _)| p).unwrap_or("");
    let namespace = bindings
        .get(prefix)
        .or_else(|| stack.iter().rev().find_map(|(_, scope)| scope.get(prefix)))
        .filter(|uri| !uri.is_empty())
        .cloned();

    Ok((
        Element {
            name,
            namespace,
            attributes,
            children: Vec::new(),
        },
        bindings,
    ))
}

enum Emit<'a> {
    Node(&'a Node),
    Close(&'a str),
}

fn serialized_name(element: &Element) -> &str {
    if element.namespace.as_deref() == Some(XHTML_NS) {
        element.local_name()
    } else {
        element.name.as_str()
    }
}

fn write_start_tag(element: &Element, name: &str, out: &mut String) {
    out.push('<');
    out.push_str(name);
    for attr in &element.attributes {
        let binds_xhtml = (attr.name == "xmlns" || attr.name.starts_with("xmlns:"))
            && attr.value == XHTML_NS;
        if binds_xhtml {
            continue;
        }
        out.push(' ');
        out.push_str(&attr.name);
        out.push_str("=\"");
        if attr.raw {
            out.push_str(&attr.value);
        } else {
            out.push_str(&escape(attr.value.as_str()));
        }
        out.push('"');
    }
}

fn write_element(root: &Element, out: &mut String) {
    let root_name = serialized_name(root);
    write_start_tag(root, root_name, out);
    if root.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');

    let mut stack: Vec<Emit<'_>> = vec![Emit::Close(root_name)];
    stack.extend(root.children.iter().rev().map(Emit::Node));

    while let Some(step) = stack.pop() {
        match step {
            Emit::Node(Node::Element(element)) => {
                let name = serialized_name(element);
                write_start_tag(element, name, out);
                if element.children.is_empty() {
                    out.push_str("/>");
                    continue;
                }
                out.push('>');
                stack.push(Emit::Close(name));
                stack.extend(element.children.iter().rev().map(Emit::Node));
            }
            Emit::Node(Node::Text(text)) => out.push_str(text),
            Emit::Node(Node::CData(text)) => {
                out.push_str("<![CDATA[");
                out.push_str(text);
                out.push_str("]]>");
            }
            Emit::Node(Node::Comment(text)) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            Emit::Node(Node::ProcessingInstruction(text)) => {
                out.push_str("<?");
                out.push_str(text);
                out.push_str("?>");
            }
            Emit::Close(name) => {
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
        }
    }
}
