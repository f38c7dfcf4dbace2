//! Total functions that collapse the shape ambiguity of [`XmlValue`] fields
//! into plain strings. None of them fail: anything unresolvable becomes `""`.
use super::xml::XmlValue;

/// Text of a field that may be plain text or an element wrapping text.
///
/// Only the *element's own* character data counts; attribute-only elements
/// and lists resolve to `""`.
pub fn normalize_value(value: Option<&XmlValue>) -> String {
    match value {
        Some(XmlValue::Text(s)) => s.clone(),
        Some(XmlValue::Element(el)) => el.text.clone().unwrap_or_default(),
        _ => String::new(),
    }
}

/// URL of an Atom `<link>`, or of the first one when repeated.
///
/// The `href` attribute wins over an `href` child element; a bare text link
/// (RSS style) is accepted as-is.
pub fn normalize_atom_link(value: Option<&XmlValue>) -> String {
    let Some(first) = value.and_then(|v| v.iter().next()) else {
        return String::new();
    };
    match first {
        XmlValue::Text(s) => s.trim().to_string(),
        XmlValue::Element(el) => el
            .attrs
            .get("href")
            .cloned()
            .or_else(|| match el.children.get("href") {
                Some(XmlValue::Text(s)) => Some(s.clone()),
                _ => None,
            })
            .or_else(|| el.text.clone())
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
        XmlValue::List(_) => String::new(),
    }
}

/// Name of the first Atom `<author>`, falling back to the feed title.
pub fn normalize_atom_author(value: Option<&XmlValue>, feed_title_fallback: &str) -> String {
    let name = value
        .and_then(|v| v.iter().next())
        .map(|first| match first {
            XmlValue::Element(_) => normalize_value(first.child("name")),
            // `<author>Jane</author>` without a <name> child
            XmlValue::Text(s) => s.clone(),
            XmlValue::List(_) => String::new(),
        })
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    if name.is_empty() {
        feed_title_fallback.to_string()
    } else {
        name
    }
}

/// URL carried by a media-style field: text, or a `url` attribute.
pub fn normalize_url_attr(value: Option<&XmlValue>) -> String {
    match value.and_then(|v| v.iter().next()) {
        Some(XmlValue::Text(s)) => s.trim().to_string(),
        Some(el @ XmlValue::Element(_)) => el.attr("url").unwrap_or_default().trim().to_string(),
        _ => String::new(),
    }
}

/// Category labels in document order. Not deduplicated.
///
/// Each entry may be plain text, an element with text, or an Atom-style
/// `term` attribute; blank entries are dropped.
pub fn normalize_categories(value: Option<&XmlValue>) -> Vec<String> {
    let Some(value) = value else {
        return Vec::new();
    };
    value
        .iter()
        .filter_map(|entry| {
            let label = match entry {
                XmlValue::Text(s) => s.clone(),
                XmlValue::Element(el) => el
                    .text
                    .clone()
                    .filter(|t| !t.trim().is_empty())
                    .or_else(|| el.attrs.get("term").cloned())
                    .unwrap_or_default(),
                XmlValue::List(_) => String::new(),
            };
            let label = label.trim();
            (!label.is_empty()).then(|| label.to_string())
        })
        .collect()
}
