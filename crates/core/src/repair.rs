//! Closing truncated notebook JSON.
//!
//! The model streams a notebook one token at a time, so at almost every point
//! the accumulated text is an unterminated JSON object. Rather than writing a
//! tolerant parser, a short list of closing suffixes covering the places a
//! notebook is usually cut (inside a source line, after a cell, inside an
//! output) is tried in order.

use crate::notebook::Notebook;

/// Suffixes tried in order. The empty suffix must stay first: it is the only
/// one that marks the input as complete.
pub const REPAIR_SUFFIXES: [&str; 10] = [
    "",
    "}",
    "}]}",
    "\"]}}",
    "\"]}]}",
    "]}]}",
    "\"]}]}",
    "\"\"]}]}",
    "\":null}]}",
    "null}]}",
];

/// Result of closing a partial notebook.
#[derive(Debug, Clone)]
pub struct Repaired {
    /// Validated notebook (empty if no suffix produced valid JSON).
    pub notebook: Notebook,
    /// The input parsed without any suffix.
    pub complete: bool,
    /// Suffix that closed the input, if any did.
    pub suffix: Option<&'static str>,
}

/// Closes `partial` with the first suffix that yields a valid notebook.
#[must_use]
pub fn repair_notebook(partial: &str) -> Repaired {
    let mut candidate = String::with_capacity(partial.len().saturating_add(16));
    for suffix in REPAIR_SUFFIXES {
        candidate.clear();
        candidate.push_str(partial);
        candidate.push_str(suffix);
        if let Ok(mut notebook) = serde_json::from_str::<Notebook>(&candidate) {
            notebook.validate();
            return Repaired { notebook, complete: suffix.is_empty(), suffix: Some(suffix) };
        }
    }
    tracing::trace!(len = partial.len(), "no repair suffix closed the notebook");
    let mut notebook = Notebook::default();
    notebook.validate();
    Repaired { notebook, complete: false, suffix: None }
}

/// String form of [`repair_notebook`]: compact JSON plus the completeness flag.
#[must_use]
pub fn repair_notebook_json(partial: &str) -> (String, bool) {
    let repaired = repair_notebook(partial);
    let json = repaired.notebook.to_json().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to encode repaired notebook");
        String::from("{}")
    });
    (json, repaired.complete)
}
