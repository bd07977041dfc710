//! Shared constants for nbsim.

/// Port the generation service listens on by default.
pub const DEFAULT_PORT: u16 = 8080;

/// Origin viewers talk to when none is configured.
pub const DEFAULT_SERVICE_ORIGIN: &str = "http://localhost:8080";

/// Route of the generation endpoint.
pub const GENERATE_ROUTE: &str = "/_gen";

/// Route prefix of the streamed HTML endpoint.
pub const STREAM_ROUTE_PREFIX: &str = "/_stream";

/// Frame source shown until a generation response arrives.
pub const FALLBACK_DESTINATION: &str = "http://localhost:8080/generated.html";

/// Path generated when a `/_gen` request carries no usable `url`.
pub const DEFAULT_NOTEBOOK_PATH: &str = "/notebooks/super-hyped/finetune-llama-7.ipynb";

/// Directory generated artifacts are written to.
pub const DEFAULT_GEN_DIR: &str = "generated";

/// Artifact base name used by the interactive REPL.
pub const REPL_ARTIFACT_BASE: &str = "generated";

/// Minimum spacing between HTML conversions while a notebook streams.
pub const DEFAULT_CONVERT_INTERVAL_SECS: u64 = 1;

/// Streamed view: how long to wait for the raw notebook to appear.
pub const STREAM_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Streamed view: a notebook untouched this long is treated as finished.
pub const STREAM_IDLE_TIMEOUT_SECS: u64 = 30;

/// Streamed view: upper bound on polls per request.
pub const STREAM_MAX_POLLS: usize = 1000;
