use nbsim_viewer::{MountOutcome, Viewer};

/// Runs one viewer against a remote server and prints its frame. Failures are
/// logged by the viewer; the fallback frame is printed instead.
pub(crate) async fn run(path: String, service: String) {
    let viewer = Viewer::over_http(path, service);
    if let MountOutcome::Failed = viewer.mount().await {
        tracing::warn!(destination = %viewer.destination(), "showing fallback document");
    }
    println!("{}", viewer.render());
}
