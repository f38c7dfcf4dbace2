//! Conversion of raw RSS items / Atom entries into canonical [`Article`]s.
use chrono::{DateTime, Utc};

use super::image::{ImageExtractor, ItemRef};
use super::normalize::{
    normalize_atom_author, normalize_atom_link, normalize_categories, normalize_value,
};
use super::parser::{AtomEntry, RssItem};
use crate::config::{FeedConfig, Settings};
use crate::render::html::strip_html;

/// Plain-text description cap, in characters.
const DESCRIPTION_MAX_CHARS: usize = 200;

/// One feed entry in canonical form. Built once per update pass, rendered,
/// then dropped; only the written note persists.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub title: String,
    /// HTML-stripped, at most 200 characters plus ellipsis.
    pub description: String,
    /// Original HTML body.
    pub content: String,
    pub link: String,
    /// Source date string as found in the feed (RFC 3339 "now" if absent).
    pub pub_date: String,
    pub author: String,
    pub categories: Vec<String>,
    /// Empty unless image inclusion is enabled and something was found.
    pub image_url: String,
    pub saved_date: String,
}

/// Builds [`Article`]s, resolving images through an [`ImageExtractor`].
#[derive(Debug, Clone)]
pub struct FeedItemProcessor {
    images: ImageExtractor,
}

impl FeedItemProcessor {
    pub fn new(images: ImageExtractor) -> Self {
        Self { images }
    }

    /// RSS item → Article. `channel_creator` is the channel's `dc:creator`.
    pub async fn process_rss_item(
        &self,
        item: &RssItem,
        channel_creator: &str,
        feed: &FeedConfig,
        settings: &Settings,
    ) -> Article {
        let now = Utc::now();
        let description_html = normalize_value(item.description.as_ref());

        let content = non_empty(normalize_value(item.content_encoded.as_ref()))
            .unwrap_or_else(|| description_html.clone());

        let pub_date = non_empty(normalize_value(item.pub_date.as_ref()))
            .or_else(|| non_empty(normalize_value(item.published.as_ref())))
            .unwrap_or_else(|| now.to_rfc3339());

        let author = non_empty(normalize_value(item.author.as_ref()))
            .or_else(|| non_empty(normalize_value(item.dc_creator.as_ref())))
            .or_else(|| non_empty(channel_creator.to_string()))
            .unwrap_or_else(|| feed.name.clone());

        let link = non_empty(normalize_value(item.link.as_ref()))
            // Some RSS feeds emit Atom-style <link href="..."/>
            .unwrap_or_else(|| normalize_atom_link(item.link.as_ref()));

        let image_url = self
            .resolve_image(ItemRef::Rss(item), &link, settings)
            .await;

        Article {
            title: title_or_default(normalize_value(item.title.as_ref())),
            description: strip_html(&description_html, DESCRIPTION_MAX_CHARS),
            content,
            link,
            pub_date,
            author,
            categories: normalize_categories(item.category.as_ref()),
            image_url,
            saved_date: saved_date(now),
        }
    }

    /// Atom entry → Article. `feed_title` is the feed-level `<title>`.
    pub async fn process_atom_item(
        &self,
        entry: &AtomEntry,
        feed_title: &str,
        feed: &FeedConfig,
        settings: &Settings,
    ) -> Article {
        let now = Utc::now();
        let summary_html = normalize_value(entry.summary.as_ref());

        let content = non_empty(normalize_value(entry.content.as_ref()))
            .unwrap_or_else(|| summary_html.clone());

        let pub_date = non_empty(normalize_value(entry.published.as_ref()))
            .or_else(|| non_empty(normalize_value(entry.updated.as_ref())))
            .unwrap_or_else(|| now.to_rfc3339());

        let fallback_author = if feed_title.trim().is_empty() {
            feed.name.as_str()
        } else {
            feed_title
        };
        let author = normalize_atom_author(entry.author.as_ref(), fallback_author);

        let link = normalize_atom_link(entry.link.as_ref());

        let image_url = self
            .resolve_image(ItemRef::Atom(entry), &link, settings)
            .await;

        Article {
            title: title_or_default(normalize_value(entry.title.as_ref())),
            description: strip_html(&summary_html, DESCRIPTION_MAX_CHARS),
            content,
            link,
            pub_date,
            author,
            categories: normalize_categories(entry.category.as_ref()),
            image_url,
            saved_date: saved_date(now),
        }
    }

    async fn resolve_image(&self, item: ItemRef<'_>, link: &str, settings: &Settings) -> String {
        if !settings.include_images {
            return String::new();
        }

        let found = self.images.extract_from_item(item);
        if !found.is_empty() || !settings.fetch_image_from_link || link.is_empty() {
            return found;
        }

        tracing::debug!(link = %link, "No image in feed item, checking article page");
        self.images.fetch_from_url(link).await
    }
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == s.len() {
        Some(s)
    } else {
        Some(trimmed.to_string())
    }
}

fn title_or_default(title: String) -> String {
    non_empty(title).unwrap_or_else(|| "Untitled".to_string())
}

fn saved_date(now: DateTime<Utc>) -> String {
    now.to_rfc3339()
}
