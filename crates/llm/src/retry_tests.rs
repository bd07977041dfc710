use futures_util::StreamExt;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::ai_types::Message;
use crate::client::LlmClient;
use crate::error::LlmError;

fn sse_body(parts: &[&str]) -> String {
    let mut body = String::from(
        "event: message_start\ndata: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\"}}\n\n",
    );
    for part in parts {
        let data = serde_json::json!({
            "type": "content_block_delta",
            "index": 0,
            "delta": {"type": "text_delta", "text": part},
        });
        body.push_str(&format!("event: content_block_delta\ndata: {data}\n\n"));
    }
    body.push_str("event: message_stop\ndata: {\"type\":\"message_stop\"}\n\n");
    body
}

async fn collect(client: &LlmClient) -> Result<String, LlmError> {
    let mut stream = client.stream_chat(&[Message::user("hello")]).await?;
    let mut out = String::new();
    while let Some(chunk) = stream.next().await {
        out.push_str(&chunk?);
    }
    Ok(out)
}

fn test_client(server: &MockServer) -> LlmClient {
    LlmClient::new("test-key".to_owned(), server.uri())
        .unwrap()
        .with_model("test-model".to_owned())
}

#[tokio::test]
async fn test_success_on_first_attempt() {
    let server = MockServer::start().await;
    let client = test_client(&server);

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(sse_body(&["\"cells\"", ":[]}"]), "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(collect(&client).await.unwrap(), "\"cells\":[]}");
}

#[tokio::test]
async fn test_retry_on_429_then_success() {
    let server = MockServer::start().await;
    let client = test_client(&server);

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_body(&["after retry"]), "text/event-stream"),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Rate limit exceeded"))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    assert_eq!(collect(&client).await.unwrap(), "after retry");
}

#[tokio::test]
async fn test_no_retry_on_401() {
    let server = MockServer::start().await;
    let client = test_client(&server);

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .expect(1)
        .mount(&server)
        .await;

    let err = collect(&client).await.unwrap_err();
    assert!(matches!(err, LlmError::Status { code: 401, .. }));
    assert!(err.to_string().contains("Unauthorized"));
}

#[tokio::test]
async fn test_transient_classification() {
    assert!(LlmError::Status { code: 529, body: String::new() }.is_transient());
    assert!(LlmError::Status { code: 503, body: String::new() }.is_transient());
    assert!(!LlmError::Status { code: 400, body: String::new() }.is_transient());
    assert!(!LlmError::Stream("x".to_owned()).is_transient());
    assert!(LlmError::Stream("overloaded_error: Overloaded".to_owned()).is_transient());
}
