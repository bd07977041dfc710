use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nbsim_core::constants::FALLBACK_DESTINATION;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::backend::GenerationBackend;
use crate::error::ViewerError;
use crate::viewer::{compose_destination, MountOutcome, Viewer};

struct CountingBackend {
    calls: AtomicUsize,
    url: &'static str,
}

#[async_trait]
impl GenerationBackend for CountingBackend {
    async fn generate(&self, _path: &str) -> Result<String, ViewerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Ok(self.url.to_owned())
    }
}

fn counting(url: &'static str) -> Arc<CountingBackend> {
    Arc::new(CountingBackend { calls: AtomicUsize::new(0), url })
}

#[test]
fn test_compose_destination() {
    assert_eq!(
        compose_destination("http://localhost:8080", "generated.html"),
        "http://localhost:8080/generated.html"
    );
    assert_eq!(
        compose_destination("http://localhost:8080/", "/out/foo_bar.html"),
        "http://localhost:8080/out/foo_bar.html"
    );
    assert_eq!(
        compose_destination("http://localhost:8080", "https://cdn.example.com/nb.html"),
        "https://cdn.example.com/nb.html"
    );
}

#[test]
fn test_initial_destination_is_fallback() {
    let viewer = Viewer::new("/a", "http://localhost:8080", counting("x.html"));
    assert_eq!(viewer.destination(), FALLBACK_DESTINATION);
    assert!(viewer.render().contains(r#"src="http://localhost:8080/generated.html""#));
    assert!(!viewer.is_fetching());
}

#[tokio::test]
async fn test_request_body_and_applied_destination() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/_gen"))
        .and(header("content-type", "application/json"))
        .and(body_json(serde_json::json!({"url": "/foo/bar"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"url": "out/foo_bar.html"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let viewer = Viewer::over_http("/foo/bar", server.uri());
    let outcome = viewer.mount().await;

    let expected = format!("{}/out/foo_bar.html", server.uri());
    assert_eq!(outcome, MountOutcome::Applied(expected.clone()));
    assert_eq!(viewer.destination(), expected);
    assert!(viewer.render().contains(&format!(r#"src="{expected}""#)));
    assert!(!viewer.is_fetching());
}

#[tokio::test]
async fn test_server_error_keeps_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/_gen"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let viewer = Viewer::over_http("/x", server.uri());
    assert_eq!(viewer.mount().await, MountOutcome::Failed);
    assert_eq!(viewer.destination(), FALLBACK_DESTINATION);
}

#[tokio::test]
async fn test_malformed_and_missing_url_keep_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_json(serde_json::json!({"url": "/bad-json"})))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_json(serde_json::json!({"url": "/no-url"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"path": "a"})))
        .mount(&server)
        .await;

    for requested in ["/bad-json", "/no-url"] {
        let viewer = Viewer::over_http(requested, server.uri());
        assert_eq!(viewer.mount().await, MountOutcome::Failed);
        assert_eq!(viewer.destination(), FALLBACK_DESTINATION);
    }
}

#[tokio::test]
async fn test_network_failure_keeps_fallback() {
    let viewer = Viewer::over_http("/x", "http://127.0.0.1:1");
    assert_eq!(viewer.mount().await, MountOutcome::Failed);
    assert_eq!(viewer.destination(), FALLBACK_DESTINATION);
}

#[tokio::test]
async fn test_effect_fires_once_across_rerenders() {
    let backend = counting("generated.html");
    let viewer = Viewer::new("/p", "http://localhost:8080", backend.clone());

    assert_eq!(
        viewer.mount().await,
        MountOutcome::Applied("http://localhost:8080/generated.html".to_owned())
    );
    let _ = viewer.render();
    assert_eq!(viewer.mount().await, MountOutcome::Skipped);
    let _ = viewer.render();

    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrent_mounts_issue_one_request() {
    let backend = counting("a.html");
    let viewer = Viewer::new("/p", "http://localhost:8080", backend.clone());

    let (first, second) = tokio::join!(viewer.mount(), viewer.mount());

    let outcomes = [first, second];
    assert!(outcomes.contains(&MountOutcome::Skipped));
    assert!(outcomes.contains(&MountOutcome::Applied("http://localhost:8080/a.html".to_owned())));
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
}

struct GatedBackend {
    release: tokio::sync::Notify,
}

#[async_trait]
impl GenerationBackend for GatedBackend {
    async fn generate(&self, _path: &str) -> Result<String, ViewerError> {
        self.release.notified().await;
        Ok("gated.html".to_owned())
    }
}

#[tokio::test]
async fn test_is_fetching_reports_in_flight_request() {
    let backend = Arc::new(GatedBackend { release: tokio::sync::Notify::new() });
    let viewer = Arc::new(Viewer::new("/p", "http://localhost:8080", backend.clone()));
    let task = tokio::spawn({
        let viewer = Arc::clone(&viewer);
        async move { viewer.mount().await }
    });

    tokio::time::timeout(Duration::from_secs(5), async {
        while !viewer.is_fetching() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("request never started");
    assert_eq!(viewer.mount().await, MountOutcome::Skipped);

    backend.release.notify_one();
    assert_eq!(
        task.await.unwrap(),
        MountOutcome::Applied("http://localhost:8080/gated.html".to_owned())
    );
    assert!(!viewer.is_fetching());
}

#[tokio::test]
async fn test_unmount_discards_pending_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/_gen"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"url": "late.html"}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let viewer = Arc::new(Viewer::over_http("/slow", server.uri()));
    let task = tokio::spawn({
        let viewer = Arc::clone(&viewer);
        async move { viewer.mount().await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    viewer.unmount();

    assert_eq!(task.await.unwrap(), MountOutcome::Cancelled);
    assert_eq!(viewer.destination(), FALLBACK_DESTINATION);
    assert!(!viewer.is_fetching());
}

#[tokio::test]
async fn test_subscribers_observe_new_destination() {
    let viewer = Viewer::new("/p", "http://localhost:8080", counting("nb.html"));
    let mut rx = viewer.subscribe();

    viewer.mount().await;

    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow(), "http://localhost:8080/nb.html");
}

#[test]
fn test_render_escapes_destination() {
    let viewer = Viewer::with_fallback(
        "/p",
        "http://localhost:8080",
        counting("x"),
        "http://localhost:8080/a.html?x=\"><script>",
    );
    let html = viewer.render();
    assert!(html.starts_with(r#"<iframe id="if1" title="gen1""#));
    assert!(html.contains("height: 1024px"));
    assert!(!html.contains("<script>"));
    assert!(html.contains("&quot;&gt;&lt;script&gt;"));
}
