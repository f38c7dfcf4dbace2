//! End-to-end tests for an update pass: fetch over HTTP, normalize, write
//! notes, prune.
//!
//! Each test serves feeds from its own wiremock server and writes into its
//! own temp vault directory.

use chrono::{Duration as ChronoDuration, Utc};
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use feedvault::config::{FeedConfig, RetentionBasis, Settings};
use feedvault::feed::FeedFetcher;
use feedvault::update::{FeedError, UpdateEvent, Updater};

fn temp_vault(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("feedvault_it_{}", name));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn updater(vault: &Path, settings: Settings) -> Updater {
    let fetcher = FeedFetcher::new(Duration::from_secs(5), None).unwrap();
    Updater::with_fetcher(settings, vault, fetcher)
}

fn md_files(folder: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(folder)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".md"))
        .collect();
    names.sort();
    names
}

async fn serve(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
        .mount(server)
        .await;
}

const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/"
     xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>Example</title>
    <item>
      <title>First Post</title>
      <link>https://example.com/first</link>
      <pubDate>Mon, 01 Jan 2024 10:00:00 +0000</pubDate>
      <dc:creator>Alice</dc:creator>
      <category>tech</category>
      <category>news</category>
      <description>Short summary</description>
      <content:encoded><![CDATA[<p>Body with <img src="https://cdn.example.com/pic.png"> image</p>]]></content:encoded>
    </item>
    <item>
      <title>Second: The Sequel</title>
      <link>https://example.com/second</link>
      <pubDate>Tue, 02 Jan 2024 10:00:00 +0000</pubDate>
      <description>Plain text only</description>
    </item>
  </channel>
</rss>"#;

const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Blog</title>
  <entry>
    <title>Atom Entry</title>
    <link href="https://blog.example.com/entry" rel="alternate"/>
    <published>2024-03-05T08:30:00Z</published>
    <category term="rust"/>
    <summary>Entry summary</summary>
    <content type="html">&lt;p&gt;Entry body&lt;/p&gt;</content>
  </entry>
</feed>"#;

// ============================================================================
// Basic pipeline
// ============================================================================

#[tokio::test]
async fn test_rss_feed_written_as_notes() {
    let server = MockServer::start().await;
    serve(&server, "/rss", RSS).await;
    let vault = temp_vault("rss_notes");

    let settings = Settings {
        feeds: vec![FeedConfig::new(format!("{}/rss", server.uri()), "Example")],
        ..Settings::default()
    };
    let summary = updater(&vault, settings).run().await.unwrap();
    assert_eq!(summary.succeeded(), 1);

    let folder = vault.join("RSS").join("Example");
    assert_eq!(
        md_files(&folder),
        vec!["First Post.md".to_string(), "Second- The Sequel.md".to_string()]
    );

    let note = std::fs::read_to_string(folder.join("First Post.md")).unwrap();
    assert!(note.starts_with("---\n"));
    assert!(note.contains("title: First Post\n"));
    assert!(note.contains("link: https://example.com/first\n"));
    assert!(note.contains("author: Alice\n"));
    assert!(note.contains("tags: [tech, news]\n"));
    assert!(note.contains("image: https://cdn.example.com/pic.png\n"));
    assert!(note.contains("Body with"));

    // No image: every template line mentioning it is dropped
    let second = std::fs::read_to_string(folder.join("Second- The Sequel.md")).unwrap();
    assert!(second.contains("title: \"Second: The Sequel\"\n"));
    assert!(second.contains("author: Example\n"));
    assert!(second.contains("tags: []\n"));
    assert!(!second.contains("image:"));
    assert!(!second.contains("![]("));

    std::fs::remove_dir_all(&vault).ok();
}

#[tokio::test]
async fn test_second_run_writes_nothing_new() {
    let server = MockServer::start().await;
    serve(&server, "/rss", RSS).await;
    let vault = temp_vault("idempotent");

    let settings = Settings {
        feeds: vec![FeedConfig::new(format!("{}/rss", server.uri()), "Example")],
        ..Settings::default()
    };
    let updater = updater(&vault, settings);

    let first = updater.run().await.unwrap();
    let stats = first.feeds[0].result.as_ref().unwrap();
    assert_eq!((stats.written, stats.skipped), (2, 0));

    let note_path = vault.join("RSS").join("Example").join("First Post.md");
    let before = std::fs::read_to_string(&note_path).unwrap();

    let second = updater.run().await.unwrap();
    let stats = second.feeds[0].result.as_ref().unwrap();
    assert_eq!((stats.written, stats.skipped), (0, 2));

    // Content untouched even though saved time would differ
    assert_eq!(std::fs::read_to_string(&note_path).unwrap(), before);
    assert_eq!(md_files(&vault.join("RSS").join("Example")).len(), 2);

    std::fs::remove_dir_all(&vault).ok();
}

#[tokio::test]
async fn test_atom_feed_end_to_end() {
    let server = MockServer::start().await;
    serve(&server, "/atom", ATOM).await;
    let vault = temp_vault("atom");

    let mut feed = FeedConfig::new(format!("{}/atom", server.uri()), "Blog");
    feed.folder = Some("Blogs".to_string());
    let settings = Settings {
        feeds: vec![feed],
        ..Settings::default()
    };
    let summary = updater(&vault, settings).run().await.unwrap();
    assert_eq!(summary.succeeded(), 1);

    let folder = vault.join("RSS").join("Blogs");
    assert_eq!(md_files(&folder), vec!["Atom Entry.md".to_string()]);

    let note = std::fs::read_to_string(folder.join("Atom Entry.md")).unwrap();
    assert!(note.contains("link: https://blog.example.com/entry\n"));
    assert!(note.contains("author: Atom Blog\n"));
    assert!(note.contains("tags: [rust]\n"));
    assert!(note.contains("Entry body"));

    std::fs::remove_dir_all(&vault).ok();
}

// ============================================================================
// Failure isolation
// ============================================================================

#[tokio::test]
async fn test_failing_feed_does_not_stop_others() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    serve(&server, "/rss", RSS).await;
    let vault = temp_vault("isolation");

    let settings = Settings {
        feeds: vec![
            FeedConfig::new(format!("{}/broken", server.uri()), "Broken"),
            FeedConfig::new(format!("{}/rss", server.uri()), "Example"),
        ],
        ..Settings::default()
    };
    let (tx, mut rx) = mpsc::channel(16);
    let summary = updater(&vault, settings)
        .with_events(tx)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.succeeded(), 1);
    assert_eq!(summary.failed(), 1);
    assert!(matches!(summary.feeds[0].result, Err(FeedError::Fetch(_))));
    assert_eq!(md_files(&vault.join("RSS").join("Example")).len(), 2);

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert_eq!(events.first(), Some(&UpdateEvent::Started { feeds: 2 }));
    let failures: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, UpdateEvent::FeedFailed { .. }))
        .collect();
    assert_eq!(failures.len(), 1);
    assert!(matches!(failures[0], UpdateEvent::FeedFailed { name, .. } if name == "Broken"));
    assert_eq!(
        events.last(),
        Some(&UpdateEvent::Finished {
            succeeded: 1,
            failed: 1
        })
    );

    std::fs::remove_dir_all(&vault).ok();
}

#[tokio::test]
async fn test_unsupported_document_reported() {
    let server = MockServer::start().await;
    serve(&server, "/page", "<html><body><p>not a feed</p></body></html>").await;
    let vault = temp_vault("unsupported");

    let settings = Settings {
        feeds: vec![FeedConfig::new(format!("{}/page", server.uri()), "Page")],
        ..Settings::default()
    };
    let summary = updater(&vault, settings).run().await.unwrap();

    match &summary.feeds[0].result {
        Err(FeedError::Unsupported(root)) => assert_eq!(root, "html"),
        other => panic!("expected unsupported, got {:?}", other),
    }
    assert!(md_files(&vault.join("RSS").join("Page")).is_empty());

    std::fs::remove_dir_all(&vault).ok();
}

// ============================================================================
// Retention
// ============================================================================

#[tokio::test]
async fn test_retention_sweep_runs_after_writing() {
    let recent = (Utc::now() - ChronoDuration::days(1)).to_rfc2822();
    let body = format!(
        r#"<rss version="2.0"><channel><title>Mixed</title>
        <item><title>Ancient</title><link>https://example.com/old</link>
          <pubDate>Mon, 01 Jan 2001 10:00:00 +0000</pubDate></item>
        <item><title>Fresh</title><link>https://example.com/new</link>
          <pubDate>{}</pubDate></item>
        </channel></rss>"#,
        recent
    );
    let server = MockServer::start().await;
    serve(&server, "/rss", &body).await;
    let vault = temp_vault("retention");

    let settings = Settings {
        feeds: vec![FeedConfig::new(format!("{}/rss", server.uri()), "Mixed")],
        auto_delete_enabled: true,
        auto_delete_days: 30,
        auto_delete_based_on: RetentionBasis::PublishDate,
        ..Settings::default()
    };
    let summary = updater(&vault, settings).run().await.unwrap();

    let stats = summary.feeds[0].result.as_ref().unwrap();
    assert_eq!(stats.written, 2);
    assert_eq!(stats.deleted, 1);
    assert_eq!(
        md_files(&vault.join("RSS").join("Mixed")),
        vec!["Fresh.md".to_string()]
    );

    std::fs::remove_dir_all(&vault).ok();
}
