//! Age-based deletion of previously written notes.
//!
//! Dates are read back from the note's own front matter, so this depends on
//! the template still emitting `publish_date:` / `saved:` lines. A template
//! that renames them silently disables the matching deletion mode.
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use std::time::SystemTime;

use crate::config::{RetentionBasis, Settings};
use crate::util::parse_date;

fn publish_date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^publish_date:[ \t]*(.+?)\s*$").expect("valid regex"))
}

fn saved_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^saved:[ \t]*(.+?)\s*$").expect("valid regex"))
}

/// Counts from one sweep of one folder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub deleted: usize,
    pub kept: usize,
    pub failed: usize,
}

/// Deletes notes in `folder` older than the configured retention window.
pub async fn sweep(folder: &Path, settings: &Settings) -> SweepReport {
    sweep_at(folder, settings, Utc::now()).await
}

/// [`sweep`] against an explicit clock.
///
/// Only `.md` files directly inside `folder` are considered. Per-file
/// failures are logged and counted; they never stop the sweep.
pub async fn sweep_at(folder: &Path, settings: &Settings, now: DateTime<Utc>) -> SweepReport {
    let mut report = SweepReport::default();
    let window = settings.retention_window_millis();
    let Some(cutoff) = Duration::try_milliseconds(window).and_then(|d| now.checked_sub_signed(d))
    else {
        // Window reaches past the representable range: nothing can be old enough
        tracing::debug!(window_ms = window, "Retention window unbounded, nothing to delete");
        return report;
    };

    let mut entries = match tokio::fs::read_dir(folder).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(folder = %folder.display(), error = %e, "Cannot list folder for retention sweep");
            return report;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(folder = %folder.display(), error = %e, "Failed to read folder entry");
                report.failed += 1;
                break;
            }
        };

        let path = entry.path();
        let is_note = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("md"));
        if !is_note {
            continue;
        }
        match entry.file_type().await {
            Ok(ft) if ft.is_file() => {}
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to stat note");
                report.failed += 1;
                continue;
            }
        }

        match check_and_delete(&path, settings.auto_delete_based_on, cutoff).await {
            Ok(true) => report.deleted += 1,
            Ok(false) => report.kept += 1,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Retention check failed, keeping note");
                report.failed += 1;
            }
        }
    }

    tracing::debug!(
        folder = %folder.display(),
        deleted = report.deleted,
        kept = report.kept,
        failed = report.failed,
        "Retention sweep finished"
    );
    report
}

/// Returns whether the note was deleted.
async fn check_and_delete(
    path: &Path,
    basis: RetentionBasis,
    cutoff: DateTime<Utc>,
) -> std::io::Result<bool> {
    let text = tokio::fs::read_to_string(path).await?;

    let timestamp = match basis {
        RetentionBasis::PublishDate => match front_matter_date(&text, publish_date_regex()) {
            Some(ts) => ts,
            // Missing or unparsable publish date: leave the note alone
            None => return Ok(false),
        },
        RetentionBasis::Saved => match front_matter_date(&text, saved_regex()) {
            Some(ts) => ts,
            None => creation_time(path).await?,
        },
    };

    if timestamp >= cutoff {
        return Ok(false);
    }

    tokio::fs::remove_file(path).await?;
    tracing::info!(path = %path.display(), "Deleted expired note");
    Ok(true)
}

fn front_matter_date(text: &str, re: &Regex) -> Option<DateTime<Utc>> {
    let raw = re.captures(text)?.get(1)?.as_str();
    parse_date(raw).map(|dt| dt.with_timezone(&Utc))
}

/// File creation time, or modification time where the filesystem does not
/// record creation.
async fn creation_time(path: &Path) -> std::io::Result<DateTime<Utc>> {
    let meta = tokio::fs::metadata(path).await?;
    let time: SystemTime = match meta.created() {
        Ok(t) => t,
        Err(_) => meta.modified()?,
    };
    Ok(DateTime::<Utc>::from(time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimeUnit;
    use crate::util::format_local;
    use std::path::PathBuf;

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("feedvault_retention_test_{}", name));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn settings(basis: RetentionBasis) -> Settings {
        Settings {
            auto_delete_enabled: true,
            auto_delete_days: 30,
            auto_delete_time_unit: TimeUnit::Days,
            auto_delete_based_on: basis,
            ..Settings::default()
        }
    }

    fn note_with(key: &str, when: DateTime<Utc>) -> String {
        format!("---\ntitle: t\n{}: {}\n---\nbody\n", key, format_local(&when))
    }

    #[tokio::test]
    async fn test_huge_window_deletes_nothing() {
        let dir = test_dir("huge_window");
        let now = Utc::now();
        std::fs::write(dir.join("old.md"), note_with("saved", now - Duration::days(4000))).unwrap();

        let settings = Settings {
            auto_delete_days: 1_000_000_000,
            ..settings(RetentionBasis::Saved)
        };
        let report = sweep_at(&dir, &settings, now).await;

        assert_eq!(report, SweepReport::default());
        assert!(dir.join("old.md").exists());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_saved_mode_cutoff() {
        let dir = test_dir("saved");
        let now = Utc::now();
        std::fs::write(dir.join("old.md"), note_with("saved", now - Duration::days(45))).unwrap();
        std::fs::write(dir.join("new.md"), note_with("saved", now - Duration::days(10))).unwrap();

        let report = sweep_at(&dir, &settings(RetentionBasis::Saved), now).await;

        assert_eq!(report.deleted, 1);
        assert_eq!(report.kept, 1);
        assert!(!dir.join("old.md").exists());
        assert!(dir.join("new.md").exists());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_saved_mode_falls_back_to_creation_time() {
        let dir = test_dir("saved_fallback");
        std::fs::write(dir.join("bare.md"), "no front matter here\n").unwrap();
        let s = settings(RetentionBasis::Saved);

        // freshly created: retained
        let report = sweep_at(&dir, &s, Utc::now()).await;
        assert_eq!(report.kept, 1);
        assert!(dir.join("bare.md").exists());

        // seen from 31 days in the future: expired
        let report = sweep_at(&dir, &s, Utc::now() + Duration::days(31)).await;
        assert_eq!(report.deleted, 1);
        assert!(!dir.join("bare.md").exists());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_publish_mode_never_deletes_without_date() {
        let dir = test_dir("publish_missing");
        let now = Utc::now();
        std::fs::write(dir.join("none.md"), "---\ntitle: t\n---\n").unwrap();
        std::fs::write(dir.join("junk.md"), "---\npublish_date: not a date\n---\n").unwrap();
        std::fs::write(
            dir.join("old.md"),
            note_with("publish_date", now - Duration::days(90)),
        )
        .unwrap();

        let report = sweep_at(&dir, &settings(RetentionBasis::PublishDate), now + Duration::days(365)).await;

        assert_eq!(report.deleted, 1);
        assert!(dir.join("none.md").exists());
        assert!(dir.join("junk.md").exists());
        assert!(!dir.join("old.md").exists());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_minutes_unit() {
        let dir = test_dir("minutes");
        let now = Utc::now();
        let mut s = settings(RetentionBasis::Saved);
        s.auto_delete_days = 5;
        s.auto_delete_time_unit = TimeUnit::Minutes;
        std::fs::write(dir.join("a.md"), note_with("saved", now - Duration::minutes(6))).unwrap();
        std::fs::write(dir.join("b.md"), note_with("saved", now - Duration::minutes(2))).unwrap();

        let report = sweep_at(&dir, &s, now).await;
        assert_eq!(report.deleted, 1);
        assert!(dir.join("b.md").exists());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_non_markdown_and_subfolders_ignored() {
        let dir = test_dir("ignored");
        let now = Utc::now();
        let old = note_with("saved", now - Duration::days(400));
        std::fs::write(dir.join("keep.txt"), &old).unwrap();
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        std::fs::write(dir.join("nested").join("deep.md"), &old).unwrap();

        let report = sweep_at(&dir, &settings(RetentionBasis::Saved), now).await;
        assert_eq!(report, SweepReport::default());
        assert!(dir.join("keep.txt").exists());
        assert!(dir.join("nested").join("deep.md").exists());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_missing_folder_is_not_fatal() {
        let report = sweep(
            Path::new("/tmp/feedvault_retention_does_not_exist"),
            &settings(RetentionBasis::Saved),
        )
        .await;
        assert_eq!(report, SweepReport::default());
    }

    #[test]
    fn test_front_matter_date_first_match() {
        let text = "---\nsaved: 2024-01-01 00:00:00\n---\nsaved: 1999-01-01 00:00:00\n";
        let dt = front_matter_date(text, saved_regex()).unwrap();
        assert_eq!(format_local(&dt), "2024-01-01 00:00:00");
    }

    #[test]
    fn test_front_matter_date_crlf() {
        let text = "---\r\nsaved: 2024-01-01 00:00:00\r\n---\r\n";
        assert!(front_matter_date(text, saved_regex()).is_some());
    }
}
