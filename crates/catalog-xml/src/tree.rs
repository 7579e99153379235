//! Minimal, namespace-aware XML tree used for decoding and fragmenting.
//!
//! Elements are renamed on the way in: known namespace URIs collapse to a
//! short prefix (`b.`, `m.`, `d.`), everything else collapses to its local
//! name, and every `xmlns`/`xmlns:*` declaration attribute is dropped. This
//! keeps the rest of the crate free of namespace bookkeeping — it only ever
//! sees the rewritten names described below.

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{XmlError, XmlResult};
use crate::namespace::short_prefix_for;

/// A node in the rewritten tree: either an element or a text run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    /// An element with its (already-rewritten) name, attributes and children.
    Element(XmlElement),
    /// A run of character data.
    Text(String),
}

/// An element with its rewritten name, attributes, and children.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    /// Rewritten element name (`prefix.Local` or just `Local`).
    pub name: String,
    /// Non-namespace attributes, in document order.
    pub attrs: Vec<(String, String)>,
    /// Child nodes, in document order.
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    /// Value of the named attribute, if present.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// First direct child element with the given rewritten name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find_map(|node| match node {
            XmlNode::Element(element) if element.name == name => Some(element),
            _ => None,
        })
    }

    /// All direct child elements with the given rewritten name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter_map(move |node| match node {
            XmlNode::Element(element) if element.name == name => Some(element),
            _ => None,
        })
    }

    /// Concatenated text content of direct text children.
    #[must_use]
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                XmlNode::Text(text) => Some(text.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect()
    }

    /// Serialize this element (and its subtree) with no added whitespace, so
    /// the same tree always produces the same bytes.
    #[must_use]
    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out);
        out
    }

    fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attrs {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape_attr(value));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str(" />");
            return;
        }
        out.push('>');
        for node in &self.children {
            match node {
                XmlNode::Element(element) => element.write_to(out),
                XmlNode::Text(text) => out.push_str(&escape_text(text)),
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn escape_text(value: &str) -> String {
    value.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

type NsScope = HashMap<String, String>;

/// Parse a full update document into its rewritten tree.
///
/// Parsing is a single iterative pass over quick-xml's event stream: an
/// explicit stack holds in-progress elements (and the namespace scope active
/// at the point they were opened) rather than recursing, so arbitrarily
/// nested documents never risk stack overflow.
///
/// # Errors
///
/// Returns [`XmlError::Parse`] on malformed XML or [`XmlError::NoRoot`] if
/// the document has no root element.
pub fn parse_document(xml: &str) -> XmlResult<XmlElement> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<(XmlElement, NsScope)> = Vec::new();
    let mut root: Option<XmlElement> = None;
    let base_scope = NsScope::new();

    loop {
        match reader
            .read_event()
            .map_err(|source| XmlError::Parse(source.to_string()))?
        {
            Event::Start(start) => {
                let parent_scope = stack.last().map_or(&base_scope, |(_, scope)| scope);
                let scope = extend_scope(parent_scope, &start);
                let element = build_element(&start, &scope)?;
                stack.push((element, scope));
            }
            Event::Empty(start) => {
                let parent_scope = stack.last().map_or(&base_scope, |(_, scope)| scope);
                let scope = extend_scope(parent_scope, &start);
                let element = build_element(&start, &scope)?;
                attach(&mut stack, &mut root, XmlNode::Element(element))?;
            }
            Event::End(_) => {
                let (element, _scope) = stack.pop().ok_or(XmlError::UnbalancedTags)?;
                attach(&mut stack, &mut root, XmlNode::Element(element))?;
            }
            Event::Text(text) => {
                let decoded = text
                    .decode()
                    .map_err(|source| XmlError::Parse(source.to_string()))?;
                if !decoded.trim().is_empty() {
                    if let Some((current, _)) = stack.last_mut() {
                        current.children.push(XmlNode::Text(decoded.into_owned()));
                    }
                }
            }
            Event::CData(cdata) => {
                let text = String::from_utf8_lossy(&cdata.into_inner()).into_owned();
                if let Some((current, _)) = stack.last_mut() {
                    current.children.push(XmlNode::Text(text));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    root.ok_or(XmlError::NoRoot)
}

fn attach(
    stack: &mut [(XmlElement, NsScope)],
    root: &mut Option<XmlElement>,
    node: XmlNode,
) -> XmlResult<()> {
    if let Some((parent, _)) = stack.last_mut() {
        parent.children.push(node);
    } else {
        match node {
            XmlNode::Element(element) => *root = Some(element),
            XmlNode::Text(_) => {}
        }
    }
    Ok(())
}

fn extend_scope(parent: &NsScope, start: &BytesStart) -> NsScope {
    let mut scope = parent.clone();
    for attribute in start.attributes().flatten() {
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        if key == "xmlns" {
            scope.insert(String::new(), decode_value(&attribute.value));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            scope.insert(prefix.to_string(), decode_value(&attribute.value));
        }
    }
    scope
}

fn decode_value(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn build_element(start: &BytesStart, scope: &NsScope) -> XmlResult<XmlElement> {
    let raw_name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let (prefix, local) = match raw_name.split_once(':') {
        Some((p, l)) => (p, l),
        None => ("", raw_name.as_str()),
    };
    let uri = scope.get(prefix).map(String::as_str);
    let name = match uri.and_then(short_prefix_for) {
        Some(short) => format!("{short}.{local}"),
        None => local.to_string(),
    };

    let mut attrs = Vec::new();
    for attribute in start.attributes().flatten() {
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        if key == "xmlns" || key.starts_with("xmlns:") {
            continue;
        }
        let local_key = key.split_once(':').map_or(key.as_str(), |(_, l)| l).to_string();
        attrs.push((local_key, decode_value(&attribute.value)));
    }

    Ok(XmlElement {
        name,
        attrs,
        children: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_xmlns_and_rewrites_known_namespace() {
        let xml = concat!(
            "<Update xmlns:d=\"http://schemas.microsoft.com/msus/2002/12/Applicability/Driver\">",
            "<HandlerSpecificData><d:WindowsDriverMetaData HardwareID=\"x\" /></HandlerSpecificData>",
            "</Update>"
        );
        let tree = parse_document(xml).expect("parses");
        assert_eq!(tree.name, "Update");
        assert!(tree.attrs.is_empty(), "xmlns attrs must be dropped");
        let handler = tree.child("HandlerSpecificData").expect("handler data");
        let driver = handler.child("d.WindowsDriverMetaData").expect("rewritten name");
        assert_eq!(driver.attr("HardwareID"), Some("x"));
    }

    #[test]
    fn unknown_namespace_collapses_to_local_name() {
        let xml = "<Update xmlns=\"http://schemas.microsoft.com/msus/2002/12/Update\"><Properties UpdateType=\"Software\" /></Update>";
        let tree = parse_document(xml).expect("parses");
        assert_eq!(tree.name, "Update");
        let properties = tree.child("Properties").expect("properties");
        assert_eq!(properties.attr("UpdateType"), Some("Software"));
    }

    #[test]
    fn round_trip_serialization_has_no_added_whitespace() {
        let xml = "<Root><Child a=\"1\">text</Child></Root>";
        let tree = parse_document(xml).expect("parses");
        assert_eq!(tree.to_xml_string(), "<Root><Child a=\"1\">text</Child></Root>");
    }

    #[test]
    fn missing_root_is_an_error() {
        assert!(parse_document("").is_err());
    }
}
