//! API endpoint handlers
//!
//! One ingress route per client dialect, plus token counting and health
//! checks. Handlers take raw bytes, probe only the model name and stream
//! flag, and hand everything else to the transformer core.

use crate::conversion::{
    transform_request, transform_response, transform_stream_event, Dialect, StreamContext,
};
use crate::core::config::Config;
use crate::core::model_manager::ModelManager;
use crate::core::upstream::{UpstreamClient, UpstreamError};
use crate::models::claude::{ClaudeMessage, ClaudeTokenCountRequest, MessageContent};
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub model_manager: Arc<ModelManager>,
    pub upstream: Arc<UpstreamClient>,
}

/// Create the API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/v1/messages", post(create_claude_message))
        .route("/v1/messages/count_tokens", post(count_tokens))
        .route("/v1/chat/completions", post(create_chat_completion))
        .route("/v1/responses", post(create_response))
        .with_state(state)
}

/// Validate the API key from request headers
fn validate_api_key(headers: &HeaderMap, config: &Config) -> Result<(), StatusCode> {
    if config.client_api_key.is_none() {
        return Ok(());
    }

    let client_api_key = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
        });

    match client_api_key {
        Some(key) if config.validate_client_api_key(key) => Ok(()),
        _ => {
            warn!("Invalid API key provided by client");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

/// Build an error body in the client dialect's error shape.
fn error_body(dialect: Dialect, message: &str) -> Value {
    match dialect {
        Dialect::Claude => json!({
            "type": "error",
            "error": {"type": "api_error", "message": message},
        }),
        Dialect::Chat | Dialect::Responses => json!({
            "error": {"type": "api_error", "message": message},
        }),
    }
}

fn error_response(status: StatusCode, dialect: Dialect, message: &str) -> Response {
    (status, Json(error_body(dialect, message))).into_response()
}

/// POST /v1/messages - Claude dialect clients
async fn create_claude_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle_ingress(state, headers, body, Dialect::Claude).await
}

/// POST /v1/chat/completions - OpenAI Chat dialect clients
async fn create_chat_completion(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle_ingress(state, headers, body, Dialect::Chat).await
}

/// POST /v1/responses - OpenAI Responses dialect clients
async fn create_response(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle_ingress(state, headers, body, Dialect::Responses).await
}

/// Shared ingress path: validate, translate, forward, translate back.
async fn handle_ingress(
    state: AppState,
    headers: HeaderMap,
    body: Bytes,
    src: Dialect,
) -> Response {
    if validate_api_key(&headers, &state.config).is_err() {
        return error_response(StatusCode::UNAUTHORIZED, src, "invalid api key");
    }

    let probe: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                src,
                &format!("invalid JSON payload: {}", e),
            );
        }
    };
    let model = probe
        .get("model")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let stream = probe.get("stream").and_then(Value::as_bool).unwrap_or(false);

    let dst = state.upstream.dialect();
    tracing::info!(
        "Incoming {} request: model={}, stream={}, upstream={}",
        src,
        model,
        stream,
        dst
    );

    let target_model = state.model_manager.map_model(&model);
    let translated = match transform_request(&body, src, dst, &target_model) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Request translation failed: {}", e);
            return error_response(StatusCode::BAD_REQUEST, src, &e.to_string());
        }
    };
    debug!("Translated {} request to {} ({} bytes)", src, dst, translated.len());

    if stream {
        stream_upstream(state, translated, src, dst, model).await
    } else {
        match state.upstream.send(translated).await {
            Ok(upstream_bytes) => match transform_response(&upstream_bytes, dst, src, &model) {
                Ok(bytes) => (
                    StatusCode::OK,
                    [("content-type", "application/json")],
                    bytes,
                )
                    .into_response(),
                Err(e) => {
                    error!("Response translation failed: {}", e);
                    error_response(StatusCode::BAD_GATEWAY, src, &e.to_string())
                }
            },
            Err(e) => upstream_error_response(src, e),
        }
    }
}

/// Open the upstream stream and relay translated frames, flushing one
/// frame at a time.
async fn stream_upstream(
    state: AppState,
    translated: Vec<u8>,
    src: Dialect,
    dst: Dialect,
    model: String,
) -> Response {
    let mut frames = match state.upstream.send_stream(translated).await {
        Ok(frames) => frames,
        Err(e) => return upstream_error_response(src, e),
    };

    let body_stream = async_stream::stream! {
        let mut ctx = StreamContext::with_model(&model);
        while let Some(item) = frames.next().await {
            match item {
                Ok(frame) => match transform_stream_event(&frame, &mut ctx, dst, src, &model) {
                    Ok(bytes) if !bytes.is_empty() => {
                        yield Ok::<Bytes, Infallible>(Bytes::from(bytes));
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("Stream transform error: {}", e);
                        if src == Dialect::Claude {
                            let error_event = json!({
                                "type": "error",
                                "error": {"type": "api_error", "message": e.to_string()},
                            });
                            yield Ok(Bytes::from(format!(
                                "event: error\ndata: {}\n\n",
                                error_event
                            )));
                        }
                        break;
                    }
                },
                Err(e) => {
                    error!("Upstream stream error: {}", e);
                    break;
                }
            }
        }
    };

    Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "text/event-stream")
        .header("cache-control", "no-cache")
        .header("connection", "keep-alive")
        .body(Body::from_stream(body_stream))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn upstream_error_response(src: Dialect, e: UpstreamError) -> Response {
    error!("Upstream API error: {}", e);
    let status =
        StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::BAD_GATEWAY);
    error_response(status, src, &e.to_string())
}

/// POST /v1/messages/count_tokens - estimate tokens in a Claude request
///
/// Character-based estimation, roughly 4 characters per token.
async fn count_tokens(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ClaudeTokenCountRequest>,
) -> Result<Response, StatusCode> {
    validate_api_key(&headers, &state.config)?;

    debug!("Token counting for model: {}", request.model);

    let mut total_chars = 0;
    if let Some(ref system) = request.system {
        total_chars += system.flatten().len();
    }
    for msg in &request.messages {
        total_chars += message_char_count(msg);
    }

    let estimated_tokens = std::cmp::max(1, total_chars / 4);
    Ok(Json(json!({"input_tokens": estimated_tokens})).into_response())
}

fn message_char_count(msg: &ClaudeMessage) -> usize {
    match &msg.content {
        MessageContent::String(s) => s.len(),
        MessageContent::Blocks(blocks) => blocks
            .iter()
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .map(str::len)
            .sum(),
    }
}

/// GET / - Root endpoint
async fn root(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "message": "ccNexus protocol gateway",
        "status": "running",
        "config": {
            "upstream_dialect": state.upstream.dialect().as_str(),
            "upstream_base_url": state.config.upstream_base_url,
            "client_api_key_validation": state.config.client_api_key.is_some(),
            "big_model": state.config.big_model,
            "middle_model": state.config.middle_model,
            "small_model": state.config.small_model,
        },
        "endpoints": {
            "claude": "/v1/messages",
            "chat": "/v1/chat/completions",
            "responses": "/v1/responses",
            "count_tokens": "/v1/messages/count_tokens",
            "health": "/health",
        },
    }))
}

/// GET /health - Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "upstream_dialect": state.upstream.dialect().as_str(),
        "upstream_key_configured": state.config.validate_api_key(),
        "client_api_key_validation": state.config.client_api_key.is_some(),
    }))
}
