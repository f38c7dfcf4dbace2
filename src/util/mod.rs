//! Utility functions for common operations.
//!
//! - **Text processing**: character-safe truncation and whitespace handling
//! - **Dates**: lenient parsing of feed/front-matter dates and the fixed
//!   local-time display format used by templates

mod dates;
mod text;

pub use dates::{display_date, format_local, parse_date, DISPLAY_FORMAT};
pub use text::{collapse_whitespace, flatten_lines, truncate_chars};
