//! Incremental notebook writer.
//!
//! Every streamed chunk is appended to the raw text, the raw text is repaired
//! into a valid notebook, and both are rewritten on disk so that a converter
//! (or a browser refresh) always sees the most complete notebook so far.

use std::path::{Path, PathBuf};

use nbsim_core::{repair_notebook, ArtifactKey, Notebook};
use nbsim_llm::NOTEBOOK_PREFILL;

use crate::error::ServiceError;

#[derive(Debug)]
pub struct NotebookWriter {
    dir: PathBuf,
    key: ArtifactKey,
    raw: String,
    latest: Option<Notebook>,
    complete: bool,
}

impl NotebookWriter {
    /// Starts a writer whose raw text already holds the prefilled `{`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, key: ArtifactKey) -> Self {
        Self {
            dir: dir.into(),
            key,
            raw: NOTEBOOK_PREFILL.to_owned(),
            latest: None,
            complete: false,
        }
    }

    #[must_use]
    pub fn key(&self) -> &ArtifactKey {
        &self.key
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Raw text received so far, prefill included.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Most recent notebook that could be repaired.
    #[must_use]
    pub fn latest(&self) -> Option<&Notebook> {
        self.latest.as_ref()
    }

    /// The raw text parsed as a notebook without repair.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    #[must_use]
    pub fn notebook_path(&self) -> PathBuf {
        self.key.notebook_path(&self.dir)
    }

    /// Creates empty notebook files so that concurrent requests see the
    /// generation as started.
    pub async fn touch_output_files(&self) -> Result<(), ServiceError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.key.notebook_path(&self.dir), b"").await?;
        tokio::fs::write(self.key.raw_path(&self.dir), b"").await?;
        Ok(())
    }

    /// Appends a chunk and rewrites the raw and repaired notebook files.
    ///
    /// A chunk that leaves the text unrepairable is kept in the raw file; the
    /// repaired file keeps its previous content until a later chunk closes.
    pub async fn add_part(&mut self, part: &str) -> Result<(), ServiceError> {
        self.raw.push_str(part);
        tokio::fs::write(self.key.raw_path(&self.dir), self.raw.as_bytes()).await?;

        let repaired = repair_notebook(&self.raw);
        if repaired.suffix.is_none() {
            tracing::trace!(key = %self.key, len = self.raw.len(), "chunk left notebook unrepairable");
            return Ok(());
        }
        self.complete = repaired.complete;
        let pretty = repaired.notebook.to_pretty_json()?;
        tokio::fs::write(self.key.notebook_path(&self.dir), pretty.as_bytes()).await?;
        self.latest = Some(repaired.notebook);
        Ok(())
    }

    /// Writes the final repaired notebook, and rewrites the repaired file so
    /// it is never left empty.
    pub async fn finish(&mut self) -> Result<(), ServiceError> {
        let notebook = match self.latest.take() {
            Some(nb) => nb,
            None => repair_notebook(&self.raw).notebook,
        };
        let json = notebook.to_json()?;
        tokio::fs::write(self.key.final_path(&self.dir), json.as_bytes()).await?;
        let pretty = notebook.to_pretty_json()?;
        tokio::fs::write(self.key.notebook_path(&self.dir), pretty.as_bytes()).await?;
        if !self.complete {
            tracing::warn!(key = %self.key, "notebook stream ended before the JSON was complete");
        }
        self.latest = Some(notebook);
        Ok(())
    }
}
