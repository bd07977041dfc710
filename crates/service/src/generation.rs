//! Path to notebook generation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use nbsim_core::constants::{DEFAULT_CONVERT_INTERVAL_SECS, DEFAULT_GEN_DIR};
use nbsim_core::ArtifactKey;
use nbsim_llm::NotebookGenerator;
use tokio::io::AsyncWriteExt;

use crate::convert::Converter;
use crate::error::ServiceError;
use crate::writer::NotebookWriter;

#[derive(Debug, Clone)]
pub struct GenerationSettings {
    /// Directory every artifact is written to and served from.
    pub gen_dir: PathBuf,
    /// Minimum spacing between HTML conversions while streaming.
    pub convert_interval: Duration,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            gen_dir: PathBuf::from(DEFAULT_GEN_DIR),
            convert_interval: Duration::from_secs(DEFAULT_CONVERT_INTERVAL_SECS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationState {
    Running,
    Finished,
}

/// Generates one notebook per requested path and remembers which paths are
/// done or in flight.
pub struct GenerationService {
    generator: Arc<dyn NotebookGenerator>,
    converter: Arc<Converter>,
    settings: GenerationSettings,
    registry: Mutex<HashMap<ArtifactKey, GenerationState>>,
}

impl GenerationService {
    #[must_use]
    pub fn new(
        generator: Arc<dyn NotebookGenerator>,
        converter: Arc<Converter>,
        settings: GenerationSettings,
    ) -> Self {
        Self { generator, converter, settings, registry: Mutex::new(HashMap::new()) }
    }

    #[must_use]
    pub fn gen_dir(&self) -> &Path {
        &self.settings.gen_dir
    }

    #[must_use]
    pub fn converter(&self) -> &Arc<Converter> {
        &self.converter
    }

    #[must_use]
    pub fn state(&self, key: &ArtifactKey) -> Option<GenerationState> {
        self.registry.lock().ok().and_then(|r| r.get(key).copied())
    }

    /// Generates the notebook for `path` unless it already exists, returning
    /// the artifact URL relative to the generation directory.
    ///
    /// Returns immediately with the URL when another request is already
    /// generating the same path.
    pub async fn generate_notebook(&self, path: &str) -> Result<String, ServiceError> {
        let key = ArtifactKey::for_path(path);
        let url = key.html_file();

        if self.is_already_generated(&key).await && self.has_html(&key).await {
            return Ok(url);
        }
        if !self.try_register(&key) {
            tracing::debug!(%key, path, "generation already running");
            return Ok(url);
        }

        tracing::info!(%key, path, "generating notebook");
        let started = Instant::now();
        match self.run_generation(&key, path).await {
            Ok(()) => {
                self.set_state(&key, GenerationState::Finished);
                tracing::info!(%key, elapsed = ?started.elapsed(), "notebook generated");
                Ok(url)
            },
            Err(e) => {
                self.unregister(&key);
                tracing::error!(%key, path, error = %e, "notebook generation failed");
                Err(e)
            },
        }
    }

    /// Starts a background generation for `path` if none is registered.
    ///
    /// Returns whether a task was spawned.
    pub fn ensure_started(self: &Arc<Self>, path: &str) -> bool {
        let key = ArtifactKey::for_path(path);
        if self.state(&key).is_some() {
            return false;
        }
        let service = Arc::clone(self);
        let path = path.to_owned();
        tokio::spawn(async move {
            if let Err(e) = service.generate_notebook(&path).await {
                tracing::warn!(path = %path, error = %e, "background generation failed");
            }
        });
        true
    }

    /// URL of a finished document for `path`; `None` while it is still
    /// generating or when nothing was rendered yet.
    pub async fn finished_url(&self, path: &str) -> Option<String> {
        let key = ArtifactKey::for_path(path);
        if self.state(&key) == Some(GenerationState::Running) {
            return None;
        }
        self.has_html(&key).await.then(|| key.html_file())
    }

    /// Raw streamed text for `path`, or `None` if generation has not started.
    pub async fn read_raw(&self, path: &str) -> Result<Option<String>, ServiceError> {
        let raw_path = ArtifactKey::for_path(path).raw_path(self.gen_dir());
        match tokio::fs::read_to_string(&raw_path).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn is_already_generated(&self, key: &ArtifactKey) -> bool {
        self.state(key).is_some()
            || tokio::fs::try_exists(key.notebook_path(self.gen_dir())).await.unwrap_or(false)
    }

    async fn has_html(&self, key: &ArtifactKey) -> bool {
        tokio::fs::metadata(key.html_path(self.gen_dir()))
            .await
            .is_ok_and(|meta| meta.len() > 0)
    }

    fn try_register(&self, key: &ArtifactKey) -> bool {
        let Ok(mut registry) = self.registry.lock() else {
            return false;
        };
        if registry.contains_key(key) {
            return false;
        }
        registry.insert(key.clone(), GenerationState::Running);
        true
    }

    fn set_state(&self, key: &ArtifactKey, state: GenerationState) {
        if let Ok(mut registry) = self.registry.lock() {
            registry.insert(key.clone(), state);
        }
    }

    fn unregister(&self, key: &ArtifactKey) {
        if let Ok(mut registry) = self.registry.lock() {
            registry.remove(key);
        }
    }

    async fn run_generation(&self, key: &ArtifactKey, path: &str) -> Result<(), ServiceError> {
        let mut writer = NotebookWriter::new(self.gen_dir(), key.clone());
        writer.touch_output_files().await?;

        let mut log = match tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(key.log_path(self.gen_dir()))
            .await
        {
            Ok(f) => Some(f),
            Err(e) => {
                tracing::warn!(%key, error = %e, "failed to open generation log");
                None
            },
        };

        let mut chunks = self.generator.stream_notebook(path).await?;
        let mut last_convert: Option<Instant> = None;
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            if let Some(ref mut f) = log {
                if let Err(e) = f.write_all(chunk.as_bytes()).await {
                    tracing::warn!(%key, error = %e, "failed to append generation log");
                    log = None;
                }
            }
            writer.add_part(&chunk).await?;

            let due = last_convert.is_none_or(|t| t.elapsed() >= self.settings.convert_interval);
            if due && writer.latest().is_some() {
                last_convert = Some(Instant::now());
                if let Err(e) = self.converter.convert_file(&writer.notebook_path()).await {
                    tracing::warn!(%key, error = %e, "intermediate conversion failed");
                }
            }
        }

        writer.finish().await?;
        self.converter.convert_file(&writer.notebook_path()).await?;
        Ok(())
    }
}
