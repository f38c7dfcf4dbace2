//! Saves RSS and Atom feed items as Markdown notes with YAML front matter.
//!
//! The pipeline per feed: fetch ([`feed::FeedFetcher`]), normalize
//! ([`feed::parse_feed`]), build an [`feed::Article`] per item
//! ([`feed::FeedItemProcessor`]), render and write it once
//! ([`vault::write_article`]), then optionally prune old notes
//! ([`vault::sweep`]). [`update::Updater`] drives one pass over all feeds.

pub mod config;
pub mod feed;
pub mod render;
pub mod update;
pub mod util;
pub mod vault;
