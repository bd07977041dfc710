//! The viewer state machine.
//!
//! `initial -> awaiting response -> applied | failed | cancelled`. The effect
//! runs at most once per viewer; the destination changes at most once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nbsim_core::constants::FALLBACK_DESTINATION;
use nbsim_core::escape_html;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::backend::{GenerationBackend, HttpGenerationClient};

/// What a call to [`Viewer::mount`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountOutcome {
    /// The destination now points at the generated document.
    Applied(String),
    /// The request failed; the error was logged.
    Failed,
    /// The viewer was unmounted before the response could be applied.
    Cancelled,
    /// The effect already ran or is running.
    Skipped,
}

/// Joins the service origin and a returned URL. Absolute URLs pass through.
///
/// Deliberately not a plain `origin + "/" + url` concatenation: an absolute
/// URL is kept as returned and a leading `/` is not doubled.
#[must_use]
pub fn compose_destination(origin: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_owned();
    }
    format!("{}/{}", origin.trim_end_matches('/'), url.trim_start_matches('/'))
}

/// Clears the in-flight flag when the request completes, fails or is dropped.
struct FetchGuard<'a>(&'a AtomicBool);

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Viewer {
    path: String,
    origin: String,
    destination: watch::Sender<String>,
    fetching: AtomicBool,
    effect_fired: AtomicBool,
    cancel: CancellationToken,
    backend: Arc<dyn GenerationBackend>,
}

impl Viewer {
    /// Creates a viewer for `path` whose frame shows the fallback document
    /// until a generation succeeds.
    #[must_use]
    pub fn new(
        path: impl Into<String>,
        origin: impl Into<String>,
        backend: Arc<dyn GenerationBackend>,
    ) -> Self {
        Self::with_fallback(path, origin, backend, FALLBACK_DESTINATION)
    }

    #[must_use]
    pub fn with_fallback(
        path: impl Into<String>,
        origin: impl Into<String>,
        backend: Arc<dyn GenerationBackend>,
        fallback: impl Into<String>,
    ) -> Self {
        let (destination, _) = watch::channel(fallback.into());
        Self {
            path: path.into(),
            origin: origin.into(),
            destination,
            fetching: AtomicBool::new(false),
            effect_fired: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            backend,
        }
    }

    /// Viewer backed by the generation service at `origin`.
    #[must_use]
    pub fn over_http(path: impl Into<String>, origin: impl Into<String>) -> Self {
        let origin = origin.into();
        let backend = Arc::new(HttpGenerationClient::new(origin.clone()));
        Self::new(path, origin, backend)
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    #[must_use]
    pub fn destination(&self) -> String {
        self.destination.borrow().clone()
    }

    /// Receiver that observes every destination change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.destination.subscribe()
    }

    /// True while the generation request is in flight. Status only; the
    /// once-only effect flag is what keeps a second request from starting.
    #[must_use]
    pub fn is_fetching(&self) -> bool {
        self.fetching.load(Ordering::Acquire)
    }

    /// Runs the generation effect once.
    ///
    /// Later or concurrent calls return [`MountOutcome::Skipped`] without
    /// issuing a request. Errors are logged, never returned.
    pub async fn mount(&self) -> MountOutcome {
        if self.effect_fired.swap(true, Ordering::AcqRel) {
            return MountOutcome::Skipped;
        }
        self.fetching.store(true, Ordering::Release);
        let _guard = FetchGuard(&self.fetching);

        let result = tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                tracing::debug!(path = %self.path, "viewer unmounted before the request finished");
                return MountOutcome::Cancelled;
            }
            result = self.backend.generate(&self.path) => result,
        };
        if self.cancel.is_cancelled() {
            return MountOutcome::Cancelled;
        }

        match result {
            Ok(url) => {
                let destination = compose_destination(&self.origin, &url);
                tracing::info!(path = %self.path, %destination, "notebook ready");
                self.destination.send_replace(destination.clone());
                MountOutcome::Applied(destination)
            },
            Err(e) => {
                tracing::error!(path = %self.path, error = %e, "generation request failed");
                MountOutcome::Failed
            },
        }
    }

    /// Cancels an outstanding request; its response is never applied.
    pub fn unmount(&self) {
        self.cancel.cancel();
    }

    /// The embedded frame for the current destination.
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            r#"<iframe id="if1" title="gen1" style="width: 100%; height: 1024px; position: absolute" src="{}"></iframe>"#,
            escape_html(&self.destination.borrow())
        )
    }
}

impl Drop for Viewer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
