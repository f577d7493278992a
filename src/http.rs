//! HTTP transport for wellness-gateway
//!
//! Axum server exposing `POST /api/chat` plus plain health/info endpoints.
//! Anything else is served from the static directory.

use axum::{
    Json, Router,
    extract::{ConnectInfo, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{Instrument, info_span};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{GatewayError, Result};
use crate::orchestrator::RequestOrchestrator;

/// Shared state for HTTP server
#[derive(Clone)]
pub struct HttpState {
    pub orchestrator: Arc<RequestOrchestrator>,
    pub started_at: DateTime<Utc>,
}

impl HttpState {
    pub fn new(orchestrator: Arc<RequestOrchestrator>) -> Self {
        Self {
            orchestrator,
            started_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Optional caller address supplied by the frontend
    #[serde(default)]
    pub ip: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// Caller address: body override, then first X-Forwarded-For entry, then the peer socket.
pub fn client_address(
    body_ip: Option<&str>,
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
) -> String {
    if let Some(ip) = body_ip.map(str::trim).filter(|ip| !ip.is_empty()) {
        return ip.to_string();
    }
    if let Some(first) = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first.to_string();
    }
    peer.map(|addr| addr.ip().to_string()).unwrap_or_default()
}

/// Chat endpoint
pub async fn chat_handler(
    State(state): State<HttpState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>> {
    let Json(request) = payload.map_err(|rejection| GatewayError::InvalidRequest {
        message: rejection.body_text(),
    })?;

    let address = client_address(
        request.ip.as_deref(),
        &headers,
        peer.map(|ConnectInfo(addr)| addr),
    );
    let span = info_span!("chat", request_id = %Uuid::new_v4());

    async move {
        let reply = state
            .orchestrator
            .handle(&request.message, &address)
            .await?;
        Ok::<_, GatewayError>(Json(ChatResponse { reply }))
    }
    .instrument(span)
    .await
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    "ok"
}

/// Info endpoint
pub async fn info_handler(State(state): State<HttpState>) -> impl IntoResponse {
    let datasets = state.orchestrator.datasets();
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "model": state.orchestrator.model(),
            "data_dir": datasets.data_dir().display().to_string(),
            "topics_with_data": datasets.topics(),
            "started_at": state.started_at.to_rfc3339(),
        })
        .to_string(),
    )
}

pub fn build_router(state: HttpState, static_dir: &Path) -> Router {
    Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/health", get(health_handler))
        .route("/info", get(info_handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_http_server(config: &Config, state: HttpState) -> anyhow::Result<()> {
    let bind = config.bind_addr()?;
    let app = build_router(state, &config.server.static_dir);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind HTTP listener: {}", e))?;

    tracing::info!(
        "REST server running at http://{} (static files from {})",
        bind,
        config.server.static_dir.display()
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
