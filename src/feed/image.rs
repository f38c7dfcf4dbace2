//! Best-effort representative image lookup for a feed item.
use super::fetcher::FeedFetcher;
use super::normalize::{normalize_url_attr, normalize_value};
use super::parser::{AtomEntry, RssItem};
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

/// Hosts whose enclosure URLs are images even without a file extension.
const IMAGE_HOSTS: &[&str] = &["cloudinary.com", "imgur.com", "googleusercontent.com"];

/// Borrowed view over either raw item shape.
#[derive(Debug, Clone, Copy)]
pub enum ItemRef<'a> {
    Rss(&'a RssItem),
    Atom(&'a AtomEntry),
}

fn img_src_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)<img[^>]+src\s*=\s*(?:"([^"]+)"|'([^']+)')"#).expect("valid regex")
    })
}

fn image_extension_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\.(jpe?g|png|gif|webp)(\?.*)?$").expect("valid regex"))
}

/// `<meta>` patterns in lookup order: og:image, then twitter:image, each in
/// both attribute orders.
fn meta_image_regexes() -> &'static [Regex; 4] {
    static RES: OnceLock<[Regex; 4]> = OnceLock::new();
    RES.get_or_init(|| {
        let build = |p: &str| Regex::new(p).expect("valid regex");
        [
            build(r#"(?i)<meta[^>]+property=["']og:image["'][^>]+content=["']([^"']+)["']"#),
            build(r#"(?i)<meta[^>]+content=["']([^"']+)["'][^>]+property=["']og:image["']"#),
            build(r#"(?i)<meta[^>]+name=["']twitter:image["'][^>]+content=["']([^"']+)["']"#),
            build(r#"(?i)<meta[^>]+content=["']([^"']+)["'][^>]+name=["']twitter:image["']"#),
        ]
    })
}

/// Resolves the image URL for one item, optionally scraping the article page.
#[derive(Debug, Clone)]
pub struct ImageExtractor {
    fetcher: FeedFetcher,
}

impl ImageExtractor {
    pub fn new(fetcher: FeedFetcher) -> Self {
        Self { fetcher }
    }

    /// Image URL from the item alone, or `""`.
    ///
    /// First hit wins: `media:content`, `media:thumbnail`, an image-looking
    /// enclosure, then the first `<img src>` in the item's HTML.
    pub fn extract_from_item(&self, item: ItemRef<'_>) -> String {
        extract_from_item(item)
    }

    /// `og:image` / `twitter:image` of the page at `url`, or `""`.
    ///
    /// Never fails; fetch errors are logged and swallowed.
    pub async fn fetch_from_url(&self, url: &str) -> String {
        let html = match self.fetcher.fetch_text(url).await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Failed to fetch page for image lookup");
                return String::new();
            }
        };
        if html.trim().is_empty() {
            return String::new();
        }

        let Some(found) = find_meta_image(&html) else {
            tracing::debug!(url = %url, "No og:image or twitter:image on page");
            return String::new();
        };
        absolutize(&found, url)
    }
}

pub fn extract_from_item(item: ItemRef<'_>) -> String {
    let (media_content, media_thumbnail) = match item {
        ItemRef::Rss(rss) => (rss.media_content.as_ref(), rss.media_thumbnail.as_ref()),
        ItemRef::Atom(atom) => (atom.media_content.as_ref(), atom.media_thumbnail.as_ref()),
    };

    let url = normalize_url_attr(media_content);
    if !url.is_empty() {
        return url;
    }

    let url = normalize_url_attr(media_thumbnail);
    if !url.is_empty() {
        return url;
    }

    if let ItemRef::Rss(rss) = item {
        if let Some(url) = image_enclosure(rss) {
            return url;
        }
    }

    let html = match item {
        ItemRef::Rss(rss) => first_non_empty(&[&rss.content_encoded, &rss.description]),
        ItemRef::Atom(atom) => first_non_empty(&[&atom.content, &atom.summary]),
    };
    first_img_src(&html).unwrap_or_default()
}

fn first_non_empty(fields: &[&Option<super::xml::XmlValue>]) -> String {
    fields
        .iter()
        .map(|f| normalize_value(f.as_ref()))
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

/// Enclosure URL, accepted only if it plausibly points at an image.
fn image_enclosure(item: &RssItem) -> Option<String> {
    let enclosure = item.enclosure.as_ref()?.iter().next()?;
    let url = normalize_url_attr(Some(enclosure));
    if url.is_empty() {
        return None;
    }

    let mime_is_image = enclosure
        .attr("type")
        .is_some_and(|t| t.trim().to_ascii_lowercase().starts_with("image/"));

    if has_image_extension(&url) || is_image_host(&url) || mime_is_image {
        Some(url)
    } else {
        tracing::trace!(url = %url, "Ignoring non-image enclosure");
        None
    }
}

fn has_image_extension(url: &str) -> bool {
    // Compare against the path when the URL parses, so fragments don't interfere
    match Url::parse(url) {
        Ok(parsed) => {
            let path_and_query = match parsed.query() {
                Some(q) => format!("{}?{}", parsed.path(), q),
                None => parsed.path().to_string(),
            };
            image_extension_regex().is_match(&path_and_query)
        }
        Err(_) => image_extension_regex().is_match(url),
    }
}

fn is_image_host(url: &str) -> bool {
    let host = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase));
    match host {
        Some(host) => IMAGE_HOSTS.iter().any(|h| host.contains(h)),
        None => false,
    }
}

/// `src` of the first `<img>` in raw HTML.
pub fn first_img_src(html: &str) -> Option<String> {
    let caps = img_src_regex().captures(html)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn find_meta_image(html: &str) -> Option<String> {
    meta_image_regexes().iter().find_map(|re| {
        re.captures(html)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// Root-relative URLs are resolved against the origin of `page_url`.
fn absolutize(found: &str, page_url: &str) -> String {
    if !found.starts_with('/') || found.starts_with("//") {
        return found.to_string();
    }
    match Url::parse(page_url).and_then(|base| base.join(found)) {
        Ok(abs) => abs.to_string(),
        Err(e) => {
            tracing::debug!(url = %page_url, error = %e, "Could not resolve relative image URL");
            found.to_string()
        }
    }
}
