//! GeminiClient against an in-process stand-in for the generateContent API

#[allow(unused_imports)]
use anyhow::Result;
use axum::{Json, Router, extract::Path, http::HeaderMap, http::StatusCode, routing::post};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wellness_gateway::clients::{GeminiClient, Generator};
use wellness_gateway::error::GatewayError;

async fn spawn_stub(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[derive(Default)]
struct Seen {
    model_path: Option<String>,
    api_key: Option<String>,
    body: Option<Value>,
}

fn gemini_stub(seen: Arc<Mutex<Seen>>) -> Router {
    Router::new().route(
        "/v1beta/models/:model_action",
        post(
            move |Path(model_action): Path<String>, headers: HeaderMap, Json(body): Json<Value>| {
                let seen = seen.clone();
                async move {
                    let mut s = seen.lock().unwrap();
                    s.model_path = Some(model_action);
                    s.api_key = headers
                        .get("x-goog-api-key")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    s.body = Some(body);
                    Json(json!({
                        "candidates": [
                            {"content": {"role": "model", "parts": [{"text": "You are not alone."}]}},
                            {"content": {"role": "model", "parts": [{"text": "other"}]}}
                        ]
                    }))
                }
            },
        ),
    )
}

#[tokio::test]
async fn test_generate_posts_prompt_and_reads_first_text() {
    let seen = Arc::new(Mutex::new(Seen::default()));
    let addr = spawn_stub(gemini_stub(seen.clone())).await;
    let client =
        GeminiClient::new(&format!("http://{addr}/v1beta"), "gemini-1.5-flash", "test-key", 2_000)
            .unwrap();

    let resp = client.generate("100% anxious about exams").await.unwrap();
    assert_eq!(resp.first_text(), Some("You are not alone."));

    let s = seen.lock().unwrap();
    assert_eq!(s.model_path.as_deref(), Some("gemini-1.5-flash:generateContent"));
    assert_eq!(s.api_key.as_deref(), Some("test-key"));
    let body = s.body.as_ref().unwrap();
    assert_eq!(
        body["contents"][0]["parts"][0]["text"],
        json!("100% anxious about exams")
    );
}

#[tokio::test]
async fn test_error_status_becomes_generation_error() {
    let app = Router::new().route(
        "/v1beta/models/:model_action",
        post(|| async { (StatusCode::FORBIDDEN, "API key not valid") }),
    );
    let addr = spawn_stub(app).await;
    let client =
        GeminiClient::new(&format!("http://{addr}/v1beta"), "gemini-1.5-flash", "bad", 2_000)
            .unwrap();

    match client.generate("hi").await {
        Err(GatewayError::Generation { message }) => {
            assert!(message.contains("403"));
            assert!(message.contains("API key not valid"));
        }
        other => panic!("expected generation error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_slow_upstream_is_timeout_not_generation_error() {
    let app = Router::new().route(
        "/v1beta/models/:model_action",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            "late"
        }),
    );
    let addr = spawn_stub(app).await;
    let client =
        GeminiClient::new(&format!("http://{addr}/v1beta"), "gemini-1.5-flash", "k", 100).unwrap();

    match client.generate("hi").await {
        Err(GatewayError::Timeout { timeout_ms, .. }) => assert_eq!(timeout_ms, 100),
        other => panic!("expected timeout error, got {other:?}"),
    }
}

#[tokio::test]
#[cfg(feature = "live_integration")]
async fn test_live_gemini_call() -> Result<()> {
    dotenvy::dotenv().ok();

    let Ok(key) = std::env::var("GEMINI_API_KEY") else {
        eprintln!("Skipping Gemini integration test - set GEMINI_API_KEY to run");
        return Ok(());
    };

    let client = GeminiClient::new(
        "https://generativelanguage.googleapis.com/v1beta",
        "gemini-1.5-flash",
        &key,
        60_000,
    )?;
    let response = client
        .generate("Give me a one-word answer. The word should be 'test'.")
        .await?;

    assert!(response.first_text().unwrap_or_default().to_lowercase().contains("test"));
    Ok(())
}
