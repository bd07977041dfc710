//! Service layer for nbsim
//!
//! Turns a requested path into a generated notebook on disk and renders it to
//! HTML, either once complete or cell by cell while it streams.

#![allow(missing_docs, reason = "Internal crate with self-explanatory API")]
#![allow(clippy::missing_errors_doc, reason = "Errors are self-explanatory from Result types")]
#![allow(missing_debug_implementations, reason = "Internal types")]

mod convert;
mod error;
mod generation;
mod html;
mod render;
mod stream_view;
mod writer;


pub use convert::{Converter, ConverterKind};
pub use error::ServiceError;
pub use generation::{GenerationService, GenerationSettings, GenerationState};
pub use html::{complete_divs, preamble};
pub use render::{render_notebook, DOCUMENT_CLOSE};
pub use stream_view::{stream_notebook_html, StreamSettings};
pub use writer::NotebookWriter;
