use super::normalize::normalize_value;
use super::xml::{parse_document, ParseError, XmlValue};

/// An RSS `<item>`, fields kept in their raw loosely typed form.
#[derive(Debug, Clone, Default)]
pub struct RssItem {
    pub title: Option<XmlValue>,
    pub description: Option<XmlValue>,
    pub content_encoded: Option<XmlValue>,
    pub link: Option<XmlValue>,
    pub pub_date: Option<XmlValue>,
    pub published: Option<XmlValue>,
    pub author: Option<XmlValue>,
    pub dc_creator: Option<XmlValue>,
    pub category: Option<XmlValue>,
    pub media_content: Option<XmlValue>,
    pub media_thumbnail: Option<XmlValue>,
    pub enclosure: Option<XmlValue>,
}

/// An Atom `<entry>`, fields kept in their raw loosely typed form.
#[derive(Debug, Clone, Default)]
pub struct AtomEntry {
    pub title: Option<XmlValue>,
    pub summary: Option<XmlValue>,
    pub content: Option<XmlValue>,
    pub link: Option<XmlValue>,
    pub published: Option<XmlValue>,
    pub updated: Option<XmlValue>,
    pub author: Option<XmlValue>,
    pub category: Option<XmlValue>,
    pub media_content: Option<XmlValue>,
    pub media_thumbnail: Option<XmlValue>,
}

#[derive(Debug, Clone, Default)]
pub struct RssChannel {
    /// Channel-level `dc:creator`, used as author fallback.
    pub creator: String,
    pub items: Vec<RssItem>,
}

#[derive(Debug, Clone, Default)]
pub struct AtomFeed {
    pub title: String,
    pub entries: Vec<AtomEntry>,
}

/// A parsed feed document, branched on its top-level shape.
#[derive(Debug, Clone)]
pub enum FeedDocument {
    Rss(RssChannel),
    Atom(AtomFeed),
    /// Well-formed XML with neither a `channel` nor an `entry` node.
    Unsupported { root: String },
}

/// Parses feed XML and selects the RSS or Atom branch.
///
/// A `channel` node under the root selects RSS. Items are taken from the
/// channel, or from the root for RSS 1.0 (RDF) documents. Otherwise an
/// `entry` node under the root selects Atom.
pub fn parse_feed(content: &str) -> Result<FeedDocument, ParseError> {
    let (root_name, root) = parse_document(content)?;

    if let Some(channel) = root.child("channel") {
        let items = channel
            .child("item")
            .or_else(|| root.child("item"))
            .map(|items| items.iter().map(rss_item).collect())
            .unwrap_or_default();
        return Ok(FeedDocument::Rss(RssChannel {
            creator: normalize_value(channel.child("dc:creator")).trim().to_string(),
            items,
        }));
    }

    if let Some(entries) = root.child("entry") {
        return Ok(FeedDocument::Atom(AtomFeed {
            title: normalize_value(root.child("title")).trim().to_string(),
            entries: entries.iter().map(atom_entry).collect(),
        }));
    }

    Ok(FeedDocument::Unsupported { root: root_name })
}

fn field(node: &XmlValue, name: &str) -> Option<XmlValue> {
    node.child(name).cloned()
}

fn rss_item(node: &XmlValue) -> RssItem {
    RssItem {
        title: field(node, "title"),
        description: field(node, "description"),
        content_encoded: field(node, "content:encoded"),
        link: field(node, "link"),
        pub_date: field(node, "pubDate"),
        published: field(node, "published"),
        author: field(node, "author"),
        dc_creator: field(node, "dc:creator"),
        category: field(node, "category"),
        media_content: field(node, "media:content"),
        media_thumbnail: field(node, "media:thumbnail"),
        enclosure: field(node, "enclosure"),
    }
}

fn atom_entry(node: &XmlValue) -> AtomEntry {
    // YouTube-style feeds nest media under <media:group>
    let media_group = node.child("media:group");
    let media = |name: &str| {
        field(node, name).or_else(|| media_group.and_then(|g| g.child(name)).cloned())
    };

    AtomEntry {
        title: field(node, "title"),
        summary: field(node, "summary"),
        content: field(node, "content"),
        link: field(node, "link"),
        published: field(node, "published"),
        updated: field(node, "updated"),
        author: field(node, "author"),
        category: field(node, "category"),
        media_content: media("media:content"),
        media_thumbnail: media("media:thumbnail"),
    }
}
