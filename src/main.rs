use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

use feedvault::config::{FeedConfig, Settings};
use feedvault::update::{UpdateEvent, UpdateScheduler, Updater};

/// Get the default settings path (~/.config/feedvault/config.toml)
fn default_config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("feedvault")
        .join("config.toml"))
}

#[derive(Parser, Debug)]
#[command(
    name = "feedvault",
    about = "Save RSS/Atom feed items as Markdown notes"
)]
struct Args {
    /// Settings file (default: ~/.config/feedvault/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Vault directory notes are written under
    #[arg(long, value_name = "DIR", default_value = ".", global = true)]
    vault: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one update pass over all enabled feeds
    Update,
    /// Update now, then keep updating every `update_interval` minutes
    Watch,
    /// Add a feed to the settings file
    Add {
        url: String,
        name: String,
        /// Folder name under the root folder (defaults to the feed name)
        #[arg(long)]
        folder: Option<String>,
        /// Add the feed without enabling it
        #[arg(long)]
        disabled: bool,
    },
    /// List configured feeds
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for debug logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let mut settings = Settings::load(&config_path)
        .with_context(|| format!("Failed to load settings from {}", config_path.display()))?;

    match args.command {
        Command::Add {
            url,
            name,
            folder,
            disabled,
        } => {
            url::Url::parse(&url).with_context(|| format!("Invalid feed URL: {}", url))?;
            if settings.feeds.iter().any(|f| f.url == url) {
                anyhow::bail!("Feed already configured: {}", url);
            }
            let mut feed = FeedConfig::new(url, name);
            feed.folder = folder;
            feed.enabled = !disabled;
            println!("Added feed '{}' -> {}", feed.name, feed.folder_name());
            settings.feeds.push(feed);
            settings
                .save(&config_path)
                .context("Failed to save settings")?;
        }
        Command::List => {
            if settings.feeds.is_empty() {
                println!("No feeds configured. Add one with: feedvault add <URL> <NAME>");
            }
            for (index, feed) in settings.feeds.iter().enumerate() {
                let state = if feed.enabled { "on " } else { "off" };
                println!(
                    "{:>3} [{}] {} ({}/{})\n      {}",
                    index,
                    state,
                    feed.name,
                    settings.folder_path,
                    feed.folder_name(),
                    feed.url
                );
            }
        }
        Command::Update => {
            let updater = Updater::new(settings, &args.vault).context("Failed to create HTTP client")?;
            run_with_events(updater).await?;
        }
        Command::Watch => {
            let interval = settings.update_interval;
            let (event_tx, event_rx) = mpsc::channel::<UpdateEvent>(32);
            let updater = Arc::new(
                Updater::new(settings, &args.vault)
                    .context("Failed to create HTTP client")?
                    .with_events(event_tx),
            );
            let printer = tokio::spawn(print_events(event_rx));

            updater.run().await.context("Update failed")?;

            if interval == 0 {
                println!("update_interval is 0, not scheduling further updates");
            } else {
                let mut scheduler = UpdateScheduler::new(Arc::clone(&updater));
                scheduler.start(interval);
                println!("Updating every {} minutes, press Ctrl-C to stop", interval);
                tokio::signal::ctrl_c()
                    .await
                    .context("Failed to listen for Ctrl-C")?;
                scheduler.stop();
            }

            drop(updater);
            let _ = printer.await;
        }
    }

    Ok(())
}

async fn run_with_events(updater: Updater) -> Result<()> {
    let (event_tx, event_rx) = mpsc::channel::<UpdateEvent>(32);
    let updater = updater.with_events(event_tx);
    let printer = tokio::spawn(print_events(event_rx));

    let result = updater.run().await;
    // Closes the channel so the printer drains and exits
    drop(updater);
    let _ = printer.await;

    // Feed failures were already reported; only a pass that never ran is an error
    result.context("Update failed")?;
    Ok(())
}

async fn print_events(mut rx: mpsc::Receiver<UpdateEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            UpdateEvent::Started { feeds } => println!("Updating {} feeds...", feeds),
            UpdateEvent::FeedSucceeded { name, stats } => println!(
                "  {}: {} new, {} existing, {} deleted",
                name, stats.written, stats.skipped, stats.deleted
            ),
            UpdateEvent::FeedFailed { name, error } => {
                eprintln!("  Failed to update feed {}: {}", name, error)
            }
            UpdateEvent::Finished { succeeded, failed } => {
                println!("Done: {} succeeded, {} failed", succeeded, failed)
            }
        }
    }
}
