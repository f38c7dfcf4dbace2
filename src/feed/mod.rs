//! Feed ingestion: fetching, parsing, and normalizing RSS/Atom items.
//!
//! # Architecture
//!
//! - [`xml`] - loose XML-to-value tree (no forced arrays)
//! - [`normalize`] - total functions collapsing value-shape ambiguity
//! - [`parser`] - RSS vs. Atom branching into raw item records
//! - [`fetcher`] - HTTP retrieval with timeout and size limit
//! - [`image`] - layered image URL lookup, optional page scraping
//! - [`processor`] - raw item → canonical [`Article`]

pub mod fetcher;
pub mod image;
pub mod normalize;
pub mod parser;
pub mod processor;
pub mod xml;

pub use fetcher::{FeedFetcher, FetchError};
pub use image::{ImageExtractor, ItemRef};
pub use parser::{parse_feed, AtomEntry, AtomFeed, FeedDocument, RssChannel, RssItem};
pub use processor::{Article, FeedItemProcessor};
pub use xml::{ParseError, XmlValue};
