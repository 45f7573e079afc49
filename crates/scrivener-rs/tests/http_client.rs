//! Integration tests for the HTTP completion and embedding clients.
//!
//! Each test starts a one-shot HTTP server on a random local port that
//! replays canned responses in order, so the real reqwest path (status
//! handling, SSE decoding, retries) is exercised without the network.

use std::time::Duration;

use scrivener_rs::api::streaming::merge;
use scrivener_rs::embeddings::{EmbeddingConfig, EmbeddingGenerator, HttpEmbeddingClient};
use scrivener_rs::prelude::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// A canned HTTP response.
struct Canned {
    status: &'static str,
    content_type: &'static str,
    body: String,
}

fn sse(chunks: &[&str]) -> Canned {
    let mut body = String::new();
    for c in chunks {
        body.push_str(&format!("data: {{\"choices\":[{{\"delta\":{{\"content\":\"{c}\"}}}}]}}\n\n"));
    }
    body.push_str("data: [DONE]\n\n");
    Canned {
        status: "200 OK",
        content_type: "text/event-stream",
        body,
    }
}

fn json_response(status: &'static str, body: &str) -> Canned {
    Canned {
        status,
        content_type: "application/json",
        body: body.to_string(),
    }
}

/// Read one request (headers plus `Content-Length` body). Returns the body.
async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client closed before sending headers");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };
    let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
    let length: usize = headers
        .lines()
        .find_map(|l| l.strip_prefix("content-length:"))
        .map(|v| v.trim().parse().unwrap())
        .unwrap_or(0);
    while buf.len() < header_end + length {
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client closed mid-body");
        buf.extend_from_slice(&chunk[..n]);
    }
    String::from_utf8_lossy(&buf[header_end..header_end + length]).to_string()
}

/// Serve `responses` one connection each. Request bodies are sent back on
/// the returned channel.
async fn spawn_server(responses: Vec<Canned>) -> (String, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        for canned in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            let body = read_request(&mut socket).await;
            let _ = tx.send(body);
            let head = format!(
                "HTTP/1.1 {}\r\ncontent-type: {}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                canned.status,
                canned.content_type,
                canned.body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(canned.body.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        }
    });
    (format!("http://{addr}/v1"), rx)
}

#[tokio::test]
async fn streamed_completion_is_decoded_and_merged() {
    let (base, mut requests) = spawn_server(vec![sse(&["Hel", "lo", " world"])]).await;
    let client = HttpCompletionClient::with_api_base("test-key", base).unwrap();
    let retrying = RetryingClient::new(client, RetryConfig::default());

    let request = ChatRequest::new("gpt-4", vec![Message::user("hi")]).with_temperature(0.5);
    let stream = retrying.submit(&request).await.unwrap();
    let mut shown = Vec::new();
    let merged = merge(stream, |f| shown.push(f.to_string())).await.unwrap();

    assert_eq!(merged.text, "Hello world");
    assert_eq!(merged.chunks.len(), 1);
    assert_eq!(shown, vec!["Hel", "lo", " world"]);

    let sent: serde_json::Value = serde_json::from_str(&requests.recv().await.unwrap()).unwrap();
    assert_eq!(sent["model"], "gpt-4");
    assert_eq!(sent["stream"], true);
    assert_eq!(sent["messages"][0]["content"], "hi");
}

#[tokio::test]
async fn rate_limits_are_retried_over_http() {
    let (base, _requests) = spawn_server(vec![
        json_response("429 Too Many Requests", r#"{"error":"slow down"}"#),
        sse(&["ok"]),
    ])
    .await;
    let client = HttpCompletionClient::with_api_base("k", base).unwrap();
    let mut session = CompletionSession::new(client, "gpt-4")
        .with_retry(RetryConfig::default().with_unit(Duration::ZERO));

    let exchange = session.complete("hi", &[], |_| {}).await.unwrap();
    assert_eq!(exchange.text, "ok");
}

#[tokio::test]
async fn server_errors_surface_with_status_and_body() {
    let (base, _requests) =
        spawn_server(vec![json_response("400 Bad Request", r#"{"error":"bad model"}"#)]).await;
    let client = HttpCompletionClient::with_api_base("k", base).unwrap();
    let retrying = RetryingClient::new(client, RetryConfig::default());

    let err = retrying
        .submit(&ChatRequest::new("nope", vec![Message::user("hi")]))
        .await
        .err()
        .unwrap();
    match err {
        Error::Http { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("bad model"));
        }
        other => panic!("expected Http error, got {other:?}"),
    }
}

#[tokio::test]
async fn non_streamed_response_becomes_one_chunk() {
    let (base, _requests) = spawn_server(vec![json_response(
        "200 OK",
        r#"{"choices":[{"message":{"role":"assistant","content":"whole answer"}}]}"#,
    )])
    .await;
    let client = HttpCompletionClient::with_api_base("k", base).unwrap();
    let retrying = RetryingClient::new(client, RetryConfig::default());

    let request = ChatRequest::new("gpt-4", vec![Message::user("hi")]).with_stream(false);
    let merged = merge(retrying.submit(&request).await.unwrap(), |_| {})
        .await
        .unwrap();
    assert_eq!(merged.text, "whole answer");
}

#[tokio::test]
async fn embeddings_are_fetched_per_word() {
    let (base, mut requests) = spawn_server(vec![
        json_response("200 OK", r#"{"data":[{"embedding":[0.5,-0.25],"index":0}]}"#),
        json_response("500 Internal Server Error", "oops"),
    ])
    .await;
    let client = HttpEmbeddingClient::with_api_base("k", base).unwrap();
    let generator = EmbeddingGenerator::new(
        client,
        EmbeddingConfig::default()
            .with_concurrency(1)
            .with_backoff(Duration::ZERO, Duration::from_millis(1)),
    );

    let words = vec!["apple".to_string(), "pear".to_string()];
    let result = generator.generate_many(&words).await;

    assert_eq!(result.len(), 1);
    assert_eq!(result["apple"], vec![0.5, -0.25]);
    assert_eq!(generator.failures(), 1);

    let first: serde_json::Value = serde_json::from_str(&requests.recv().await.unwrap()).unwrap();
    assert_eq!(first["model"], "text-embedding-ada-002");
    assert_eq!(first["input"], "apple");
}
