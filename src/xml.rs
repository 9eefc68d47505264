//! Minimal namespace-aware element tree
//!
//! Enough XML structure to validate RPC payloads and classify replies
//! without owning a full DOM. Elements remember their byte spans in the
//! source so callers can slice the original text back out unmodified.

use std::fmt;
use std::ops::Range;

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;

use crate::error::{Result, YdkError};

/// One parsed element
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    /// Resolved namespace URI, `None` when unqualified
    pub namespace: Option<String>,
    /// Local name without prefix
    pub name: String,
    /// `(local name, unescaped value)`, namespace declarations excluded
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    /// Concatenated unescaped character data directly inside this element
    pub text: String,
    /// Bytes of the whole element, start tag through end tag
    pub span: Range<usize>,
    /// Bytes between the start tag and the end tag
    pub inner_span: Range<usize>,
}

impl XmlElement {
    /// Whether this element has the given local name and namespace
    pub fn is(&self, namespace: &str, name: &str) -> bool {
        self.name == name && self.namespace.as_deref() == Some(namespace)
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Character data with surrounding whitespace removed
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    /// Text of the named child, if present
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(XmlElement::text)
    }

    /// Original text of this element inside `source`
    pub fn raw<'s>(&self, source: &'s str) -> &'s str {
        &source[self.span.clone()]
    }

    /// Original text between this element's tags inside `source`
    pub fn inner_raw<'s>(&self, source: &'s str) -> &'s str {
        &source[self.inner_span.clone()]
    }

    /// This element and all its descendants, depth first
    pub fn descendants(&self) -> Vec<&XmlElement> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.descendants());
        }
        out
    }
}

impl fmt::Display for XmlElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Parse a document consisting of exactly one root element.
///
/// Fails on malformed markup, unclosed or mismatched tags, undeclared
/// prefixes, multiple roots or text outside the root.
pub fn parse(source: &str) -> Result<XmlElement> {
    let mut reader = NsReader::from_str(source);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let start_pos = reader.buffer_position() as usize;
        let (resolved, event) = reader.read_resolved_event().map_err(xml_error)?;
        let namespace = resolve_namespace(resolved)?;
        let end_pos = reader.buffer_position() as usize;

        match event {
            Event::Start(tag) => {
                let mut element = element_from(namespace, &tag)?;
                element.span = start_pos..end_pos;
                element.inner_span = end_pos..end_pos;
                stack.push(element);
            }
            Event::Empty(tag) => {
                let mut element = element_from(namespace, &tag)?;
                element.span = start_pos..end_pos;
                element.inner_span = end_pos..end_pos;
                close_element(element, &mut stack, &mut root)?;
            }
            Event::End(_) => {
                let mut element = stack
                    .pop()
                    .ok_or_else(|| YdkError::Xml("unexpected closing tag".into()))?;
                element.inner_span.end = start_pos;
                element.span.end = end_pos;
                close_element(element, &mut stack, &mut root)?;
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(xml_error)?;
                match stack.last_mut() {
                    Some(parent) => parent.text.push_str(&text),
                    None if text.trim().is_empty() => {}
                    None => return Err(YdkError::Xml("text outside of root element".into())),
                }
            }
            Event::CData(data) => match stack.last_mut() {
                Some(parent) => parent.text.push_str(&String::from_utf8_lossy(&data)),
                None => return Err(YdkError::Xml("CDATA outside of root element".into())),
            },
            Event::Eof => break,
            // declarations, comments, processing instructions
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(YdkError::Xml(format!("unclosed element <{}>", open.name)));
    }
    root.ok_or_else(|| YdkError::Xml("document has no root element".into()))
}

fn close_element(
    element: XmlElement,
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    } else if root.is_some() {
        return Err(YdkError::Xml(format!(
            "second root element <{}>",
            element.name
        )));
    } else {
        *root = Some(element);
    }
    Ok(())
}

fn resolve_namespace(resolved: ResolveResult<'_>) -> Result<Option<String>> {
    match resolved {
        ResolveResult::Bound(Namespace(ns)) => Ok(Some(String::from_utf8_lossy(ns).into_owned())),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(YdkError::Xml(format!(
            "undeclared namespace prefix '{}'",
            String::from_utf8_lossy(&prefix)
        ))),
    }
}

fn element_from(namespace: Option<String>, tag: &BytesStart<'_>) -> Result<XmlElement> {
    let name = String::from_utf8_lossy(tag.local_name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in tag.attributes() {
        let attr = attr.map_err(xml_error)?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value().map_err(xml_error)?.into_owned();
        attributes.push((key, value));
    }
    Ok(XmlElement {
        namespace,
        name,
        attributes,
        ..XmlElement::default()
    })
}

fn xml_error(e: impl fmt::Display) -> YdkError {
    YdkError::Xml(e.to_string())
}

/// Escape text for inclusion in element content or attribute values
pub fn escape(text: &str) -> String {
    quick_xml::escape::escape(text).into_owned()
}
