use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nbsim_core::constants::DEFAULT_NOTEBOOK_PATH;
use nbsim_core::ArtifactKey;
use nbsim_http::{create_router, AppState};
use nbsim_llm::{ChunkStream, LlmError, NotebookGenerator};
use nbsim_service::{
    Converter, ConverterKind, GenerationService, GenerationSettings, StreamSettings, DOCUMENT_CLOSE,
};

const CHUNKS: [&str; 3] = [
    "\"cells\":[{\"cell_type\":\"markdown\",\"source\":[\"# Fine-tuning Llama\"]},",
    "{\"cell_type\":\"code\",\"execution_count\":1,\"source\":[\"print(42)\"],\"outputs\":[]}],",
    "\"metadata\":{},\"nbformat\":4,\"nbformat_minor\":5}",
];

struct FakeGenerator;

#[async_trait]
impl NotebookGenerator for FakeGenerator {
    async fn stream_notebook(&self, _path: &str) -> Result<ChunkStream, LlmError> {
        let items: Vec<Result<String, LlmError>> =
            CHUNKS.iter().map(|c| Ok((*c).to_owned())).collect();
        Ok(Box::pin(futures_util::stream::iter(items)))
    }
}

async fn spawn_server(dir: &Path) -> String {
    let service = Arc::new(GenerationService::new(
        Arc::new(FakeGenerator),
        Arc::new(Converter::new(ConverterKind::Builtin)),
        GenerationSettings { gen_dir: dir.to_path_buf(), convert_interval: Duration::ZERO },
    ));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let origin = format!("http://{}", listener.local_addr().unwrap());
    let state = AppState::new(service).with_origin(origin.clone()).with_stream_settings(
        StreamSettings {
            poll_interval: Duration::from_millis(10),
            startup_timeout: Duration::from_secs(2),
            idle_timeout: Duration::from_secs(2),
            max_polls: 500,
        },
    );
    let app = create_router(Arc::new(state));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    origin
}

#[tokio::test]
async fn test_generate_returns_artifact_url_and_serves_it() {
    let dir = tempfile::tempdir().unwrap();
    let origin = spawn_server(dir.path()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{origin}/_gen"))
        .json(&serde_json::json!({"url": "/foo/bar"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    let key = ArtifactKey::for_path("/foo/bar");
    assert_eq!(body["url"], key.html_file());

    let html = client.get(format!("{origin}/{}", key.html_file())).send().await.unwrap();
    assert_eq!(html.status(), 200);
    assert!(html.text().await.unwrap().contains("Fine-tuning Llama"));
}

#[tokio::test]
async fn test_generate_without_url_uses_default_path() {
    let dir = tempfile::tempdir().unwrap();
    let origin = spawn_server(dir.path()).await;

    let body: serde_json::Value = reqwest::Client::new()
        .post(format!("{origin}/_gen"))
        .body("{}")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["url"], ArtifactKey::for_path(DEFAULT_NOTEBOOK_PATH).html_file());
}

#[tokio::test]
async fn test_generate_rejects_malformed_json() {
    let dir = tempfile::tempdir().unwrap();
    let origin = spawn_server(dir.path()).await;

    let resp = reqwest::Client::new()
        .post(format!("{origin}/_gen"))
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_stream_sends_cells_then_closes_document() {
    let dir = tempfile::tempdir().unwrap();
    let origin = spawn_server(dir.path()).await;

    let resp = reqwest::get(format!("{origin}/_stream/foo/bar")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.headers()["content-type"].to_str().unwrap().starts_with("text/html"));
    let body = resp.text().await.unwrap();

    assert!(body.contains("Fine-tuning Llama"));
    assert!(body.contains("print(42)"));
    assert!(body.ends_with(DOCUMENT_CLOSE));
    assert!(dir.path().join(ArtifactKey::for_path("/foo/bar").raw_file()).exists());
}

#[tokio::test]
async fn test_unknown_path_renders_viewer_page() {
    let dir = tempfile::tempdir().unwrap();
    let origin = spawn_server(dir.path()).await;

    let page = reqwest::get(format!("{origin}/notebooks/demo.ipynb")).await.unwrap();
    assert_eq!(page.status(), 200);
    let body = page.text().await.unwrap();
    assert!(body.contains(r#"<iframe id="if1""#));
    assert!(body.contains(&format!(r#"src="{origin}/_stream/notebooks/demo.ipynb""#)));
}

#[tokio::test]
async fn test_viewer_page_links_finished_document() {
    let dir = tempfile::tempdir().unwrap();
    let origin = spawn_server(dir.path()).await;
    let client = reqwest::Client::new();

    client
        .post(format!("{origin}/_gen"))
        .json(&serde_json::json!({"url": "/done"}))
        .send()
        .await
        .unwrap();

    let body = client.get(format!("{origin}/done")).send().await.unwrap().text().await.unwrap();
    let key = ArtifactKey::for_path("/done");
    assert!(body.contains(&format!(r#"src="{origin}/{}""#, key.html_file())));
}

#[tokio::test]
async fn test_favicon_health_version_and_cors() {
    let dir = tempfile::tempdir().unwrap();
    let origin = spawn_server(dir.path()).await;
    let client = reqwest::Client::new();

    let favicon = client.get(format!("{origin}/favicon.ico")).send().await.unwrap();
    assert_eq!(favicon.status(), 404);

    let health = client
        .get(format!("{origin}/health"))
        .header("origin", "http://elsewhere.example")
        .send()
        .await
        .unwrap();
    assert_eq!(health.headers()["access-control-allow-origin"], "*");
    assert_eq!(health.text().await.unwrap(), "ok");

    let version: serde_json::Value =
        client.get(format!("{origin}/api/version")).send().await.unwrap().json().await.unwrap();
    assert_eq!(version["version"], env!("CARGO_PKG_VERSION"));
}
