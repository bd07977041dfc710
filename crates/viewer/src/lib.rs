//! Viewer component for nbsim.
//!
//! A [`Viewer`] captures one path, asks the generation service for the
//! document generated for it, and renders an embedded frame pointing at the
//! result. Failures are logged and leave the frame on its fallback source.

#![allow(missing_docs, reason = "Internal crate with self-explanatory API")]
#![allow(clippy::missing_errors_doc, reason = "Errors are self-explanatory from Result types")]
#![allow(missing_debug_implementations, reason = "Internal types")]

mod backend;
mod error;
mod viewer;

#[cfg(test)]
mod viewer_tests;

pub use backend::{GenerationBackend, HttpGenerationClient};
pub use error::ViewerError;
pub use viewer::{compose_destination, MountOutcome, Viewer};
