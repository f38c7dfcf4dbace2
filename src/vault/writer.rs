//! Writes one Markdown note per article, never overwriting.
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::config::Settings;
use crate::feed::Article;
use crate::render::html::{resize_images, to_markdown};
use crate::render::{escape_yaml, prepare, render, render_file_name, TemplateData};
use crate::util::{display_date, flatten_lines, truncate_chars};

/// Characters not allowed in note file names.
const FORBIDDEN_FILE_NAME_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

const SHORT_DESCRIPTION_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written(PathBuf),
    /// A note already exists at the computed path; nothing was touched.
    Skipped(PathBuf),
}

/// Replaces every path-hostile character with `-`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if FORBIDDEN_FILE_NAME_CHARS.contains(&c) { '-' } else { c })
        .collect()
}

/// `folder/<rendered file name>.md` for an article. This path is the
/// de-duplication key: a note whose path exists is never rewritten.
pub fn note_path(article: &Article, folder: &Path, settings: &Settings) -> PathBuf {
    let published = display_date(&article.pub_date);
    let name = render_file_name(&settings.file_name_template, &article.title, &published);
    folder.join(format!("{}.md", sanitize_file_name(&name)))
}

/// Renders the full note text for an article.
pub fn render_note(article: &Article, settings: &Settings) -> String {
    let has_image = !article.image_url.is_empty();

    let description_short =
        truncate_chars(&flatten_lines(&article.description), SHORT_DESCRIPTION_CHARS).into_owned();

    let html = resize_images(&article.content, &settings.image_width);

    let data = TemplateData {
        title: escape_yaml(&article.title),
        link: article.link.clone(),
        author: escape_yaml(&article.author),
        published_time: display_date(&article.pub_date),
        saved_time: display_date(&article.saved_date),
        image: article.image_url.clone(),
        description: article.description.clone(),
        description_short: escape_yaml(&description_short),
        tags: render_tags(&article.categories),
        content: to_markdown(&html),
    };

    render(&prepare(&settings.template, has_image), &data)
}

/// Categories as a YAML flow sequence: `[tech, "a, b"]`.
fn render_tags(categories: &[String]) -> String {
    let items: Vec<String> = categories.iter().map(|c| escape_yaml(c)).collect();
    format!("[{}]", items.join(", "))
}

/// Writes the note for `article` into `folder` unless one already exists.
pub async fn write_article(
    article: &Article,
    folder: &Path,
    settings: &Settings,
) -> std::io::Result<WriteOutcome> {
    let path = note_path(article, folder, settings);

    if tokio::fs::try_exists(&path).await? {
        tracing::debug!(path = %path.display(), "Note exists, skipping");
        return Ok(WriteOutcome::Skipped(path));
    }

    let text = render_note(article, settings);

    // create_new also covers a note appearing between the check and the write
    let mut file = match tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await
    {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            tracing::debug!(path = %path.display(), "Note appeared concurrently, skipping");
            return Ok(WriteOutcome::Skipped(path));
        }
        Err(e) => return Err(e),
    };
    file.write_all(text.as_bytes()).await?;
    file.flush().await?;

    tracing::debug!(path = %path.display(), "Wrote note");
    Ok(WriteOutcome::Written(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn article() -> Article {
        Article {
            title: "Rust: Fearless".to_string(),
            description: "A long\ndescription that keeps going well past the fifty character mark".to_string(),
            content: "<p>Hello <img src=\"https://example.com/a.png\"></p>".to_string(),
            link: "https://example.com/rust".to_string(),
            pub_date: "2024-01-01T10:00:00Z".to_string(),
            author: "Ferris".to_string(),
            categories: vec!["rust".to_string(), "a, b".to_string()],
            image_url: String::new(),
            saved_date: "2024-01-02T10:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("My/Title:Is*Weird?"), "My-Title-Is-Weird-");
        assert_eq!(sanitize_file_name(r#"a\b"c<d>e|f"#), "a-b-c-d-e-f");
        assert_eq!(sanitize_file_name("plain name"), "plain name");
    }

    #[test]
    fn test_note_path_uses_published_local_time() {
        let settings = Settings {
            file_name_template: "{{published}} {{title}}".to_string(),
            ..Settings::default()
        };
        let a = article();
        let expected = format!(
            "{} Rust- Fearless.md",
            sanitize_file_name(&display_date(&a.pub_date))
        );
        assert_eq!(
            note_path(&a, Path::new("vault/feed"), &settings),
            Path::new("vault/feed").join(expected)
        );
    }

    #[test]
    fn test_render_note_front_matter() {
        let settings = Settings {
            template: "---\ntitle: {{title}}\nauthor: {{author}}\ndescription: {{descriptionShort}}\ntags: {{#tags}}\nimage: {{image}}\n---\n{{content}}".to_string(),
            ..Settings::default()
        };
        let note = render_note(&article(), &settings);
        let lines: Vec<&str> = note.lines().collect();
        assert_eq!(lines[1], "title: \"Rust: Fearless\"");
        assert_eq!(lines[2], "author: Ferris");
        assert_eq!(
            lines[3],
            "description: A long description that keeps going well past the ..."
        );
        assert_eq!(lines[4], "tags: [rust, \"a, b\"]");
        // no image → image line removed
        assert_eq!(lines[5], "---");
        assert!(note.contains("Hello"));
        assert!(!note.contains("<p>"));
    }

    #[test]
    fn test_render_note_keeps_image_line_when_present() {
        let mut a = article();
        a.image_url = "https://example.com/cover.jpg".to_string();
        let settings = Settings {
            template: "image: {{image}}\n{{title}}\n".to_string(),
            ..Settings::default()
        };
        assert_eq!(
            render_note(&a, &settings),
            "image: https://example.com/cover.jpg\n\"Rust: Fearless\"\n"
        );
    }

    #[test]
    fn test_render_note_resizes_images() {
        let settings = Settings {
            template: "{{content}}".to_string(),
            image_width: "50%".to_string(),
            ..Settings::default()
        };
        let note = render_note(&article(), &settings);
        assert!(note.contains(r#"<img src="https://example.com/a.png" width="50%">"#));
    }

    #[test]
    fn test_render_note_full_width_uses_markdown_image() {
        let settings = Settings {
            template: "{{content}}".to_string(),
            ..Settings::default()
        };
        let note = render_note(&article(), &settings);
        assert!(note.contains("![](https://example.com/a.png)"));
        assert!(!note.contains("width="));
    }

    #[tokio::test]
    async fn test_write_then_skip() {
        let dir = std::env::temp_dir().join("feedvault_writer_test_skip");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let settings = Settings::default();

        let first = write_article(&article(), &dir, &settings).await.unwrap();
        let path = match first {
            WriteOutcome::Written(p) => p,
            other => panic!("expected Written, got {:?}", other),
        };
        let original = std::fs::read_to_string(&path).unwrap();
        assert!(original.contains("publish_date: "));

        let mut changed = article();
        changed.content = "<p>Changed upstream</p>".to_string();
        let second = write_article(&changed, &dir, &settings).await.unwrap();
        assert_eq!(second, WriteOutcome::Skipped(path.clone()));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);

        std::fs::remove_dir_all(&dir).ok();
    }
}
