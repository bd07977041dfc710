//! Progressive HTML for a notebook that is still being written.
//!
//! The raw notebook is polled, repaired and rendered; each poll forwards the
//! cells that became complete since the previous one. The document preamble
//! goes out with the first cell and the closing tags once the notebook JSON
//! is complete or has stopped growing.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::Stream;
use nbsim_core::constants::{
    STREAM_IDLE_TIMEOUT_SECS, STREAM_MAX_POLLS, STREAM_STARTUP_TIMEOUT_SECS,
};
use nbsim_core::{repair_notebook, ArtifactKey};

use crate::error::ServiceError;
use crate::generation::{GenerationService, GenerationState};
use crate::html::{complete_divs, preamble};
use crate::render::DOCUMENT_CLOSE;

#[derive(Debug, Clone)]
pub struct StreamSettings {
    pub poll_interval: Duration,
    /// How long the raw notebook may be missing before giving up.
    pub startup_timeout: Duration,
    /// A notebook that stops growing for this long is treated as finished.
    pub idle_timeout: Duration,
    pub max_polls: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            startup_timeout: Duration::from_secs(STREAM_STARTUP_TIMEOUT_SECS),
            idle_timeout: Duration::from_secs(STREAM_IDLE_TIMEOUT_SECS),
            max_polls: STREAM_MAX_POLLS,
        }
    }
}

/// HTML fragments for `path`, starting its generation if needed.
pub fn stream_notebook_html(
    service: Arc<GenerationService>,
    path: String,
    settings: StreamSettings,
) -> impl Stream<Item = Result<String, ServiceError>> + Send + 'static {
    async_stream::stream! {
        let key = ArtifactKey::for_path(&path);
        let started = Instant::now();
        let mut kicked = false;
        let mut seen_raw = false;
        let mut sent = 0usize;
        let mut header_written = false;
        let mut last_len = 0usize;
        let mut last_growth = Instant::now();
        let mut closed = false;

        for poll in 0..settings.max_polls {
            if poll > 0 {
                tokio::time::sleep(settings.poll_interval).await;
            }

            // Checked before reading so a finished state implies the raw file is final.
            let finished = service.state(&key) == Some(GenerationState::Finished);
            let raw = match service.read_raw(&path).await {
                Ok(Some(raw)) if !raw.is_empty() => raw,
                Ok(_) => {
                    let running = service.state(&key) == Some(GenerationState::Running);
                    if seen_raw || running || started.elapsed() < settings.startup_timeout {
                        if !kicked {
                            kicked = true;
                            service.ensure_started(&path);
                        }
                        continue;
                    }
                    closed = true;
                    yield Err(ServiceError::NotStarted(path.clone()));
                    break;
                },
                Err(e) => {
                    closed = true;
                    yield Err(e);
                    break;
                },
            };

            seen_raw = true;
            let repaired = repair_notebook(&raw);
            let mut done = repaired.complete || finished;
            if !done && poll.saturating_add(1) == settings.max_polls {
                tracing::info!(path = %path, polls = settings.max_polls, "poll limit reached, closing notebook");
                done = true;
            }
            if raw.len() == last_len {
                if last_growth.elapsed() > settings.idle_timeout {
                    tracing::info!(path = %path, "notebook done by idle timeout");
                    done = true;
                }
            } else {
                last_len = raw.len();
                last_growth = Instant::now();
            }

            let html = match repaired.notebook.to_json() {
                Ok(json) => match service.converter().notebook_json_to_html(&json).await {
                    Ok(html) => html,
                    Err(e) => {
                        tracing::warn!(path = %path, error = %e, "conversion failed while streaming");
                        continue;
                    },
                },
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "failed to encode repaired notebook");
                    continue;
                },
            };

            let divs = match complete_divs(done, &html, sent) {
                Ok(divs) => divs,
                Err(e) => {
                    tracing::debug!(path = %path, error = %e, "no complete cells yet");
                    if done {
                        closed = true;
                        if !header_written {
                            header_written = true;
                            yield Ok(preamble(&html).to_owned());
                        }
                        yield Ok(DOCUMENT_CLOSE.to_owned());
                        break;
                    }
                    continue;
                },
            };

            if !header_written && !divs.is_empty() {
                header_written = true;
                yield Ok(preamble(&html).to_owned());
            }
            sent = sent.saturating_add(divs.len());
            for div in divs {
                yield Ok(div);
            }

            if done {
                closed = true;
                if !header_written {
                    header_written = true;
                    yield Ok(preamble(&html).to_owned());
                }
                yield Ok(DOCUMENT_CLOSE.to_owned());
                break;
            }
        }

        // The last poll was skipped (conversion failure or no raw text yet).
        if !closed {
            if header_written {
                yield Ok(DOCUMENT_CLOSE.to_owned());
            } else if !seen_raw {
                yield Err(ServiceError::NotStarted(path.clone()));
            } else {
                tracing::warn!(path = %path, "poll limit reached before any cell rendered");
            }
        }
    }
}
