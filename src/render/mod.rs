//! Rendering of articles into Markdown note text.
//!
//! - [`yaml`] - minimal YAML scalar escaping for front-matter values
//! - [`template`] - `{{placeholder}}` substitution and image-line stripping
//! - [`html`] - HTML stripping, image resizing and Markdown conversion

pub mod html;
pub mod template;
pub mod yaml;

pub use template::{prepare, render, render_file_name, TemplateData};
pub use yaml::escape_yaml;
