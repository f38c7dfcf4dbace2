//! Settings file parser for ~/.config/feedvault/config.toml.
//!
//! The settings file is optional: a missing file yields `Settings::default()`.
//! Unknown keys are silently ignored by serde (with `deny_unknown_fields` off),
//! though we log a warning when the file contains potential typos.
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in settings file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Settings file exceeds maximum allowed size.
    #[error("Settings file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Defaults
// ============================================================================

/// Content template used when none is configured.
///
/// `publish_date:` and `saved:` are the keys the retention sweep reads back;
/// renaming them in a custom template turns off age-based deletion for the
/// corresponding mode.
pub const DEFAULT_TEMPLATE: &str = "---
title: {{title}}
link: {{link}}
author: {{author}}
publish_date: {{publishedTime}}
saved: {{savedTime}}
description: {{descriptionShort}}
tags: {{#tags}}
image: {{image}}
---

![]({{image}})

{{content}}
";

pub const DEFAULT_FILE_NAME_TEMPLATE: &str = "{{title}}";

// ============================================================================
// Configuration Structs
// ============================================================================

/// One subscribed feed. Identity is its position in [`Settings::feeds`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FeedConfig {
    pub url: String,
    pub name: String,
    /// Sub-folder under `folder_path`; empty or absent means `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl FeedConfig {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            folder: None,
            enabled: true,
        }
    }

    /// Destination sub-folder name.
    pub fn folder_name(&self) -> &str {
        match self.folder.as_deref().map(str::trim) {
            Some(folder) if !folder.is_empty() => folder,
            _ => &self.name,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    #[default]
    Days,
    Minutes,
}

impl TimeUnit {
    pub fn millis(self) -> i64 {
        match self {
            TimeUnit::Minutes => 60_000,
            TimeUnit::Days => 86_400_000,
        }
    }
}

/// Which front-matter date the retention sweep ages files by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionBasis {
    PublishDate,
    #[default]
    Saved,
}

/// Top-level settings.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to `Default::default()`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub feeds: Vec<FeedConfig>,

    /// Root folder for all feed folders, relative to the vault.
    pub folder_path: String,

    /// Note content template.
    pub template: String,

    /// Note file name template (`{{title}}`, `{{published}}`).
    pub file_name_template: String,

    /// Minutes between scheduled updates. 0 = manual only.
    pub update_interval: u64,

    pub include_images: bool,

    /// Scrape og:image/twitter:image from the article page as a last resort.
    pub fetch_image_from_link: bool,

    /// CSS width for embedded images, e.g. "50%" or "300px".
    pub image_width: String,

    pub auto_delete_enabled: bool,
    pub auto_delete_days: u64,
    pub auto_delete_time_unit: TimeUnit,
    pub auto_delete_based_on: RetentionBasis,

    /// Per-request HTTP timeout in seconds.
    pub request_timeout_secs: u64,

    pub user_agent: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            feeds: Vec::new(),
            folder_path: "RSS".to_string(),
            template: DEFAULT_TEMPLATE.to_string(),
            file_name_template: DEFAULT_FILE_NAME_TEMPLATE.to_string(),
            update_interval: 60,
            include_images: true,
            fetch_image_from_link: false,
            image_width: "100%".to_string(),
            auto_delete_enabled: false,
            auto_delete_days: 30,
            auto_delete_time_unit: TimeUnit::Days,
            auto_delete_based_on: RetentionBasis::Saved,
            request_timeout_secs: 30,
            user_agent: None,
        }
    }
}

impl Settings {
    /// Maximum settings file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 14] = [
        "feeds",
        "folder_path",
        "template",
        "file_name_template",
        "update_interval",
        "include_images",
        "fetch_image_from_link",
        "image_width",
        "auto_delete_enabled",
        "auto_delete_days",
        "auto_delete_time_unit",
        "auto_delete_based_on",
        "request_timeout_secs",
        "user_agent",
    ];

    /// Load settings from a TOML file.
    ///
    /// - Missing file → `Ok(Settings::default())`
    /// - Empty file → `Ok(Settings::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted (serde default behavior), logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Check file size before reading
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Settings file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No settings file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Settings file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Settings file is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse the TOML content first as a raw table to detect unknown keys
        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in settings file, ignoring");
                }
            }
        }

        let settings: Settings = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            feeds = settings.feeds.len(),
            "Loaded settings"
        );
        Ok(settings)
    }

    /// Write settings as TOML via write-to-temp-then-rename, so a crash never
    /// leaves a truncated settings file behind.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        use std::time::{SystemTime, UNIX_EPOCH};

        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let random_suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let temp_path = path.with_extension(format!("tmp.{:016x}", random_suffix));

        let write_result = (|| -> std::io::Result<()> {
            let mut temp_file = std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&temp_path)?;
            temp_file.write_all(content.as_bytes())?;
            temp_file.sync_all()?;
            drop(temp_file);

            // On Windows, rename fails if destination exists, so remove it first
            #[cfg(windows)]
            if path.exists() {
                std::fs::remove_file(path)?;
            }

            std::fs::rename(&temp_path, path)
        })();

        if let Err(e) = write_result {
            let _ = std::fs::remove_file(&temp_path);
            return Err(ConfigError::Io(e));
        }

        tracing::info!(path = %path.display(), feeds = self.feeds.len(), "Saved settings");
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Age threshold for the retention sweep, in milliseconds.
    pub fn retention_window_millis(&self) -> i64 {
        let days = i64::try_from(self.auto_delete_days).unwrap_or(i64::MAX);
        days.saturating_mul(self.auto_delete_time_unit.millis())
    }
}

// ============================================================================
// Tests
// ============================================================================
