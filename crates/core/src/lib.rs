//! Core types for nbsim
//!
//! Notebook model, partial-JSON repair and artifact naming shared by every
//! other crate in the workspace.

mod artifact;
pub mod constants;
mod env_config;
mod error;
mod html_utils;
mod notebook;
mod repair;

pub use artifact::ArtifactKey;
pub use env_config::{env_duration_secs, env_parse_with_default, env_string_or};
pub use error::*;
pub use html_utils::escape_html;
pub use notebook::*;
pub use repair::{repair_notebook, repair_notebook_json, Repaired, REPAIR_SUFFIXES};
