//! OpenAI Responses API data models
//!
//! The Responses dialect places tool calls as top-level output items rather
//! than message content, and streams through a larger event vocabulary
//! (`response.created`, `response.output_item.added`, ...).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Content part inside a Responses message item
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponsesContentPart {
    #[serde(rename = "type", default)]
    pub part_type: String,
    #[serde(default)]
    pub text: String,
}

/// Tool definition in the Responses dialect
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsesTool {
    #[serde(rename = "type", default)]
    pub tool_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Option<HashMap<String, Value>>,
}

/// Responses API request
///
/// `input` is either a bare string or an array of input items
/// (`message`, `function_call`, `function_call_output`); items are kept as
/// raw JSON values so malformed entries can be skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsesRequest {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub input: Value,
    #[serde(default)]
    pub instructions: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ResponsesTool>>,
    #[serde(default)]
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Output item in a Responses response (`message` or `function_call`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponsesOutputItem {
    #[serde(rename = "type", default)]
    pub item_type: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: Vec<ResponsesContentPart>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub call_id: String,
    #[serde(default)]
    pub arguments: String,
}

/// Usage accounting on a Responses response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponsesUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// Responses API response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponsesResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub output: Vec<ResponsesOutputItem>,
    #[serde(default)]
    pub usage: ResponsesUsage,
}

/// Streaming event from the Responses API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponsesStreamEvent {
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub response: Option<ResponsesResponse>,
    #[serde(default)]
    pub output_index: u32,
    #[serde(default)]
    pub content_index: u32,
    #[serde(default)]
    pub item: Option<ResponsesOutputItem>,
    #[serde(default)]
    pub delta: String,
}
