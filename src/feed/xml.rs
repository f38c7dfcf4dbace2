//! Loose XML-to-value conversion.
//!
//! Feeds are converted into an [`XmlValue`] tree without forcing arrays:
//! an element that appears once under its parent is stored as a single value,
//! a repeated element becomes a [`XmlValue::List`]. Elements with neither
//! attributes nor child elements collapse to plain [`XmlValue::Text`], while
//! anything carrying attributes or children is kept as an [`XmlElement`].
//! Downstream code must therefore accept every shape for every field, which
//! is what [`crate::feed::normalize`] is for.
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::BTreeMap;
use thiserror::Error;

/// Maximum element nesting accepted before the document is rejected.
const MAX_XML_DEPTH: usize = 256;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("XML parse error: {0}")]
    Xml(String),

    #[error("document has no root element")]
    Empty,

    #[error("XML nesting depth exceeds maximum of {0} levels")]
    TooDeep(usize),
}

/// One node of the loosely typed feed tree.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlValue {
    /// Element with text content only.
    Text(String),
    /// Element with attributes and/or child elements.
    Element(XmlElement),
    /// The same element name repeated under one parent.
    List(Vec<XmlValue>),
}

/// An element that could not be collapsed to plain text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    pub attrs: BTreeMap<String, String>,
    /// Concatenated character data directly inside the element, if any.
    pub text: Option<String>,
    pub children: BTreeMap<String, XmlValue>,
}

impl XmlValue {
    /// Child lookup by qualified name (`"content:encoded"`, `"entry"`).
    ///
    /// Lists are looked through to their first element, so `channel.item`
    /// style lookups keep working on accidentally repeated parents.
    pub fn child(&self, name: &str) -> Option<&XmlValue> {
        match self {
            XmlValue::Element(el) => el.children.get(name),
            XmlValue::List(items) => items.first().and_then(|v| v.child(name)),
            XmlValue::Text(_) => None,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        match self {
            XmlValue::Element(el) => el.attrs.get(name).map(String::as_str),
            _ => None,
        }
    }

    /// Flatten single-or-repeated into a slice-like iterator.
    pub fn iter(&self) -> impl Iterator<Item = &XmlValue> {
        let items: &[XmlValue] = match self {
            XmlValue::List(items) => items,
            other => std::slice::from_ref(other),
        };
        items.iter()
    }

    /// Convenience constructor used heavily by tests.
    pub fn text(s: impl Into<String>) -> Self {
        XmlValue::Text(s.into())
    }
}

impl XmlElement {
    fn insert_child(&mut self, name: String, value: XmlValue) {
        match self.children.remove(&name) {
            None => {
                self.children.insert(name, value);
            }
            Some(XmlValue::List(mut items)) => {
                items.push(value);
                self.children.insert(name, XmlValue::List(items));
            }
            Some(existing) => {
                self.children.insert(name, XmlValue::List(vec![existing, value]));
            }
        }
    }

    fn push_text(&mut self, s: &str) {
        if s.is_empty() {
            return;
        }
        match &mut self.text {
            Some(text) => text.push_str(s),
            None => self.text = Some(s.to_string()),
        }
    }

    fn finish(self) -> XmlValue {
        if self.attrs.is_empty() && self.children.is_empty() {
            XmlValue::Text(self.text.unwrap_or_default())
        } else {
            XmlValue::Element(self)
        }
    }
}

/// Parses an XML document into `(root element name, root value)`.
pub fn parse_document(content: &str) -> Result<(String, XmlValue), ParseError> {
    // quick-xml only resolves the five predefined entities; anything declared
    // in a DOCTYPE is left unexpanded.
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<(String, XmlElement)> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if stack.len() >= MAX_XML_DEPTH {
                    return Err(ParseError::TooDeep(MAX_XML_DEPTH));
                }
                let name = element_name(&e);
                let element = XmlElement {
                    attrs: read_attributes(&e, &reader),
                    ..XmlElement::default()
                };
                stack.push((name, element));
            }
            Ok(Event::Empty(e)) => {
                let name = element_name(&e);
                let element = XmlElement {
                    attrs: read_attributes(&e, &reader),
                    ..XmlElement::default()
                };
                match stack.last_mut() {
                    Some((_, parent)) => parent.insert_child(name, element.finish()),
                    None => return Ok((name, element.finish())),
                }
            }
            Ok(Event::End(_)) => {
                let Some((name, element)) = stack.pop() else {
                    return Err(ParseError::Xml("unexpected closing tag".to_string()));
                };
                match stack.last_mut() {
                    Some((_, parent)) => parent.insert_child(name, element.finish()),
                    None => return Ok((name, element.finish())),
                }
            }
            Ok(Event::Text(e)) => {
                if let Some((_, element)) = stack.last_mut() {
                    let text = e
                        .unescape()
                        .map(|t| t.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&e).into_owned());
                    element.push_text(&text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some((_, element)) = stack.last_mut() {
                    element.push_text(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::Eof) => {
                if stack.is_empty() {
                    return Err(ParseError::Empty);
                }
                return Err(ParseError::Xml("unexpected end of document".to_string()));
            }
            Err(e) => return Err(ParseError::Xml(e.to_string())),
            _ => {}
        }
    }
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn read_attributes(e: &BytesStart<'_>, reader: &Reader<&[u8]>) -> BTreeMap<String, String> {
    let mut attrs = BTreeMap::new();
    for attr_result in e.attributes() {
        let attr = match attr_result {
            Ok(attr) => attr,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping malformed XML attribute");
                continue;
            }
        };
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = match attr.decode_and_unescape_value(reader.decoder()) {
            Ok(v) => v.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        };
        attrs.insert(key, value);
    }
    attrs
}
