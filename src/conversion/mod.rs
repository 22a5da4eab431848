//! Protocol translation core
//!
//! The gateway translates between three chat-completion dialects: Claude
//! Messages, OpenAI Chat Completions, and OpenAI Responses. This module is
//! the single entry point the serving layer uses: buffered request and
//! response translation plus the per-frame streaming transform. Everything
//! here is synchronous and pure apart from the caller-owned
//! [`StreamContext`].
//!
//! The Claude<->Chat and Claude<->Responses directions are implemented
//! directly; Chat<->Responses is composed through the Claude dialect.

pub mod chat;
pub mod context;
pub mod responses;
pub mod sse;
pub mod think_tags;

pub use context::StreamContext;

use thiserror::Error;

/// One of the three supported wire protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Anthropic Claude Messages API
    Claude,
    /// OpenAI Chat Completions API
    Chat,
    /// OpenAI Responses API
    Responses,
}

impl Dialect {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "claude" | "anthropic" => Some(Dialect::Claude),
            "chat" | "openai" => Some(Dialect::Chat),
            "responses" => Some(Dialect::Responses),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Claude => "claude",
            Dialect::Chat => "chat",
            Dialect::Responses => "responses",
        }
    }

    /// Request path for this dialect, relative to an upstream base URL that
    /// already carries any version prefix.
    pub fn endpoint_path(&self) -> &'static str {
        match self {
            Dialect::Claude => "/messages",
            Dialect::Chat => "/chat/completions",
            Dialect::Responses => "/responses",
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors visible at the core boundary.
///
/// Malformed top-level framing is fatal for the call; malformed
/// sub-structures inside a valid parse are dropped silently, and individual
/// unparseable stream frames produce empty output rather than an error.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("upstream error: {0}")]
    Upstream(String),
}

/// Translate a request body from `src` dialect to `dst` dialect.
/// `src == dst` is an identity passthrough.
pub fn transform_request(
    body: &[u8],
    src: Dialect,
    dst: Dialect,
    model: &str,
) -> Result<Vec<u8>, TransformError> {
    match (src, dst) {
        (Dialect::Claude, Dialect::Claude)
        | (Dialect::Chat, Dialect::Chat)
        | (Dialect::Responses, Dialect::Responses) => Ok(body.to_vec()),
        (Dialect::Claude, Dialect::Chat) => chat::claude_req_to_chat(body, model),
        (Dialect::Chat, Dialect::Claude) => chat::chat_req_to_claude(body, model),
        (Dialect::Claude, Dialect::Responses) => responses::claude_req_to_responses(body, model),
        (Dialect::Responses, Dialect::Claude) => responses::responses_req_to_claude(body, model),
        (Dialect::Chat, Dialect::Responses) => {
            let claude = chat::chat_req_to_claude(body, model)?;
            responses::claude_req_to_responses(&claude, model)
        }
        (Dialect::Responses, Dialect::Chat) => {
            let claude = responses::responses_req_to_claude(body, model)?;
            chat::claude_req_to_chat(&claude, model)
        }
    }
}

/// Translate a buffered response body from `src` dialect to `dst` dialect.
pub fn transform_response(
    body: &[u8],
    src: Dialect,
    dst: Dialect,
    model: &str,
) -> Result<Vec<u8>, TransformError> {
    match (src, dst) {
        (Dialect::Claude, Dialect::Claude)
        | (Dialect::Chat, Dialect::Chat)
        | (Dialect::Responses, Dialect::Responses) => Ok(body.to_vec()),
        (Dialect::Claude, Dialect::Chat) => chat::claude_resp_to_chat(body, model),
        (Dialect::Chat, Dialect::Claude) => chat::chat_resp_to_claude(body),
        (Dialect::Claude, Dialect::Responses) => responses::claude_resp_to_responses(body),
        (Dialect::Responses, Dialect::Claude) => responses::responses_resp_to_claude(body),
        (Dialect::Chat, Dialect::Responses) => {
            let claude = chat::chat_resp_to_claude(body)?;
            responses::claude_resp_to_responses(&claude)
        }
        (Dialect::Responses, Dialect::Chat) => {
            let claude = responses::responses_resp_to_claude(body)?;
            chat::claude_resp_to_chat(&claude, model)
        }
    }
}

/// Translate one inbound SSE frame from `src` dialect to `dst` dialect,
/// updating the caller-owned stream context. Zero output bytes is a valid
/// result (the frame only advanced internal state or was dropped).
pub fn transform_stream_event(
    frame: &[u8],
    ctx: &mut StreamContext,
    src: Dialect,
    dst: Dialect,
    model: &str,
) -> Result<Vec<u8>, TransformError> {
    if ctx.model_name.is_empty() && !model.is_empty() {
        ctx.model_name = model.to_string();
    }

    match (src, dst) {
        (Dialect::Claude, Dialect::Claude)
        | (Dialect::Chat, Dialect::Chat)
        | (Dialect::Responses, Dialect::Responses) => Ok(frame.to_vec()),
        (Dialect::Chat, Dialect::Claude) => chat::chat_stream_to_claude(frame, ctx),
        (Dialect::Claude, Dialect::Chat) => chat::claude_stream_to_chat(frame, ctx),
        (Dialect::Responses, Dialect::Claude) => responses::responses_stream_to_claude(frame, ctx),
        (Dialect::Claude, Dialect::Responses) => responses::claude_stream_to_responses(frame, ctx),
        (Dialect::Chat, Dialect::Responses) => {
            let claude_frames = chat::chat_stream_to_claude(frame, ctx)?;
            pivot_claude_frames(&claude_frames, ctx, model, responses::claude_stream_to_responses)
        }
        (Dialect::Responses, Dialect::Chat) => {
            let claude_frames = responses::responses_stream_to_claude(frame, ctx)?;
            pivot_claude_frames(&claude_frames, ctx, model, chat::claude_stream_to_chat)
        }
    }
}

/// Feed intermediate Claude frames through a second machine running on the
/// context's pivot state.
fn pivot_claude_frames(
    claude_bytes: &[u8],
    ctx: &mut StreamContext,
    model: &str,
    machine: fn(&[u8], &mut StreamContext) -> Result<Vec<u8>, TransformError>,
) -> Result<Vec<u8>, TransformError> {
    if claude_bytes.is_empty() {
        return Ok(Vec::new());
    }
    let mut pivot = ctx
        .pivot
        .take()
        .unwrap_or_else(|| Box::new(StreamContext::with_model(model)));

    let mut out = Vec::new();
    for claude_frame in sse::split_frames(claude_bytes) {
        match machine(claude_frame, &mut pivot) {
            Ok(bytes) => out.extend(bytes),
            Err(e) => return Err(e),
        }
    }

    ctx.pivot = Some(pivot);
    Ok(out)
}
