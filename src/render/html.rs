//! HTML adapters: plain-text extraction, `<img>` width injection, and
//! HTML-to-Markdown conversion.
use lol_html::{element, rewrite_str, RewriteStrSettings};
use scraper::Html;

use crate::util::{collapse_whitespace, truncate_chars};

/// Converts HTML to plain text with collapsed whitespace, capped at
/// `max_chars` characters (plus "..." when cut).
pub fn strip_html(html: &str, max_chars: usize) -> String {
    if html.trim().is_empty() {
        return String::new();
    }
    let fragment = Html::parse_fragment(html);
    let text: String = fragment.root_element().text().collect();
    let text = collapse_whitespace(&text);
    truncate_chars(&text, max_chars).into_owned()
}

/// Sets `width` on every `<img>` that has neither `width` nor `style`.
///
/// A width of `"100%"` (or blank) is the identity: the HTML is returned
/// unchanged. On a rewriter error the original HTML is returned.
pub fn resize_images(html: &str, width: &str) -> String {
    let width = width.trim();
    if width.is_empty() || width == "100%" {
        return html.to_string();
    }

    let result = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("img", |el| {
                if !el.has_attribute("width") && !el.has_attribute("style") {
                    el.set_attribute("width", width)?;
                }
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    );

    match result {
        Ok(rewritten) => rewritten,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to rewrite image widths, keeping original HTML");
            html.to_string()
        }
    }
}

/// HTML to Markdown. `script` and `style` elements are dropped.
///
/// Images carrying a `width` stay as inline `<img>` tags, since Markdown
/// image syntax has no way to express a size.
pub fn to_markdown(html: &str) -> String {
    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style"])
        .add_handler(vec!["img"], image_handler)
        .build();
    match converter.convert(html) {
        Ok(markdown) => markdown,
        Err(e) => {
            tracing::warn!(error = %e, "HTML to Markdown conversion failed, keeping raw HTML");
            html.to_string()
        }
    }
}

fn image_handler(element: htmd::Element) -> Option<String> {
    let attr = |name: &str| {
        element
            .attrs
            .iter()
            .find(|a| &*a.name.local == name)
            .map(|a| a.value.to_string())
    };
    let src = attr("src")?;

    if let Some(width) = attr("width") {
        return Some(format!(
            "<img src=\"{}\" width=\"{}\">",
            escape_attribute(&src),
            escape_attribute(&width)
        ));
    }

    let alt = attr("alt").unwrap_or_default();
    let alt = alt.split_whitespace().collect::<Vec<_>>().join(" ");
    let link = src.replace('(', "\\(").replace(')', "\\)");
    if link.contains(' ') {
        Some(format!("![{}](<{}>)", alt, link))
    } else {
        Some(format!("![{}]({})", alt, link))
    }
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}
