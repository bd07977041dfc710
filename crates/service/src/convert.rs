//! Notebook to HTML conversion.
//!
//! `jupyter nbconvert` gives the familiar Jupyter look; the builtin renderer
//! keeps the service usable on machines without Jupyter.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use moka::sync::Cache;
use nbsim_core::{repair_notebook, Notebook};

use crate::error::ServiceError;
use crate::render::render_notebook;

/// Which renderer turns notebooks into HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConverterKind {
    /// `<program> nbconvert --to html <file>`.
    Nbconvert { program: String },
    Builtin,
}

impl Default for ConverterKind {
    fn default() -> Self {
        Self::Nbconvert { program: String::from("jupyter") }
    }
}

impl FromStr for ConverterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nbconvert" | "jupyter" => Ok(Self::default()),
            "builtin" => Ok(Self::Builtin),
            other => Err(format!("unknown converter '{other}' (expected nbconvert or builtin)")),
        }
    }
}

/// Bytes of rendered HTML kept by the conversion cache.
pub const HTML_CACHE_BYTES: u64 = 16 * 1024 * 1024;

#[derive(Debug)]
pub struct Converter {
    kind: ConverterKind,
    /// Rendered HTML keyed by md5 of the notebook JSON, weighted by size.
    cache: Cache<String, String>,
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(ConverterKind::default())
    }
}

impl Converter {
    #[must_use]
    pub fn new(kind: ConverterKind) -> Self {
        Self::with_cache_bytes(kind, HTML_CACHE_BYTES)
    }

    /// Converter whose cache evicts once it holds `max_bytes` of HTML.
    #[must_use]
    pub fn with_cache_bytes(kind: ConverterKind, max_bytes: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_bytes)
            .weigher(|key: &String, html: &String| {
                u32::try_from(key.len().saturating_add(html.len())).unwrap_or(u32::MAX)
            })
            .build();
        Self { kind, cache }
    }

    #[must_use]
    pub fn kind(&self) -> &ConverterKind {
        &self.kind
    }

    /// Converts `<name>.ipynb` into a sibling `<name>.html` and returns its path.
    pub async fn convert_file(&self, notebook_path: &Path) -> Result<PathBuf, ServiceError> {
        let html_path = notebook_path.with_extension("html");
        if let ConverterKind::Nbconvert { ref program } = self.kind {
            match run_nbconvert(program, notebook_path).await {
                Ok(()) => return Ok(html_path),
                Err(NbconvertFailure::Spawn(e)) => {
                    tracing::warn!(program = %program, error = %e, "nbconvert unavailable, using builtin renderer");
                },
                Err(NbconvertFailure::Failed(msg)) => return Err(ServiceError::Conversion(msg)),
            }
        }
        let json = tokio::fs::read_to_string(notebook_path).await?;
        let html = render_notebook(&repair_notebook(&json).notebook);
        tokio::fs::write(&html_path, html).await?;
        Ok(html_path)
    }

    /// Converts notebook JSON text to HTML, memoised by md5 of the input.
    pub async fn notebook_json_to_html(&self, json: &str) -> Result<String, ServiceError> {
        let digest = format!("{:x}", md5::compute(json.as_bytes()));
        if let Some(html) = self.cached(&digest) {
            return Ok(html);
        }

        let html = match self.kind {
            ConverterKind::Builtin => render_notebook(&Notebook::from_json(json)?),
            ConverterKind::Nbconvert { .. } => {
                let tmp = tempfile::Builder::new()
                    .prefix("notebook-")
                    .suffix(".ipynb")
                    .tempfile()?;
                tokio::fs::write(tmp.path(), json.as_bytes()).await?;
                let html_path = self.convert_file(tmp.path()).await?;
                let html = tokio::fs::read_to_string(&html_path).await;
                if let Err(e) = tokio::fs::remove_file(&html_path).await {
                    tracing::debug!(path = %html_path.display(), error = %e, "failed to remove converted html");
                }
                html?
            },
        };

        self.cache.insert(digest, html.clone());
        Ok(html)
    }

    fn cached(&self, digest: &str) -> Option<String> {
        self.cache.get(digest)
    }
}

enum NbconvertFailure {
    Spawn(std::io::Error),
    Failed(String),
}

async fn run_nbconvert(program: &str, notebook_path: &Path) -> Result<(), NbconvertFailure> {
    tracing::debug!(program, path = %notebook_path.display(), "running nbconvert");
    let output = tokio::process::Command::new(program)
        .arg("nbconvert")
        .arg("--to")
        .arg("html")
        .arg(notebook_path)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(NbconvertFailure::Spawn)?;
    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(NbconvertFailure::Failed(format!(
            "nbconvert exited with {}: {}",
            output.status,
            nbsim_llm::truncate(stderr.trim(), 500)
        )))
    }
}
