//! Persistence of rendered notes inside the vault folder tree.
//!
//! - [`writer`] - skip-if-exists note writing
//! - [`retention`] - age-based note deletion

pub mod retention;
pub mod writer;

pub use retention::{sweep, sweep_at, SweepReport};
pub use writer::{note_path, render_note, sanitize_file_name, write_article, WriteOutcome};
