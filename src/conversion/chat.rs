//! Claude <-> OpenAI Chat Completions conversion
//!
//! Buffered request/response translation in both directions, plus the two
//! per-stream state machines. The buffered functions are pure
//! `(bytes, model) -> bytes`; the stream machines consume one SSE frame at
//! a time and drive a caller-owned [`StreamContext`].

use crate::conversion::context::StreamContext;
use crate::conversion::sse::{build_chat_chunk, build_claude_event, done_frame, parse_sse};
use crate::conversion::think_tags::{
    consume_think_tagged_stream, emit_text, emit_text_closing, emit_thinking,
    flush_think_tagged_stream, split_think_tagged_text,
};
use crate::conversion::TransformError;
use crate::core::constants::{content, delta, event, finish, role, stop, tool, SSE_DONE};
use crate::models::claude::{ClaudeMessagesRequest, ClaudeResponse, MessageContent};
use crate::models::openai::{
    OpenAIChatCompletionRequest, OpenAIChatCompletionResponse, OpenAIFunction, OpenAIFunctionDef,
    OpenAIMessage, OpenAIStreamOptions, OpenAIStreamingChunk, OpenAITool, OpenAIToolCall,
};
use serde_json::{json, Map, Value};

/// Convert a Claude Messages request into an OpenAI Chat request.
pub(crate) fn claude_req_to_chat(body: &[u8], model: &str) -> Result<Vec<u8>, TransformError> {
    let req: ClaudeMessagesRequest = serde_json::from_slice(body)?;

    let mut messages: Vec<OpenAIMessage> = Vec::new();

    if let Some(ref system) = req.system {
        let system_text = system.flatten();
        if !system_text.is_empty() {
            messages.push(OpenAIMessage {
                role: role::SYSTEM.to_string(),
                content: Some(Value::String(system_text)),
                ..Default::default()
            });
        }
    }

    for msg in &req.messages {
        match &msg.content {
            MessageContent::String(s) => messages.push(OpenAIMessage {
                role: msg.role.clone(),
                content: Some(Value::String(s.clone())),
                ..Default::default()
            }),
            MessageContent::Blocks(blocks) => {
                let mut text_parts: Vec<&str> = Vec::new();
                let mut tool_calls: Vec<OpenAIToolCall> = Vec::new();
                let mut tool_results: Vec<OpenAIMessage> = Vec::new();
                let mut has_thinking = false;

                for block in blocks {
                    match block.get("type").and_then(Value::as_str) {
                        Some(content::TEXT) => {
                            if let Some(text) = block.get("text").and_then(Value::as_str) {
                                text_parts.push(text);
                            }
                        }
                        Some(content::THINKING) => {
                            // Claude-internal reasoning is never forwarded.
                            has_thinking = true;
                        }
                        Some(content::TOOL_USE) => {
                            let Some(id) = block
                                .get("id")
                                .and_then(Value::as_str)
                                .filter(|s| !s.is_empty())
                            else {
                                continue;
                            };
                            let Some(name) = block
                                .get("name")
                                .and_then(Value::as_str)
                                .filter(|s| !s.is_empty())
                            else {
                                continue;
                            };
                            let input = block
                                .get("input")
                                .cloned()
                                .unwrap_or_else(|| Value::Object(Map::new()));
                            tool_calls.push(OpenAIToolCall {
                                id: id.to_string(),
                                call_type: tool::FUNCTION.to_string(),
                                function: OpenAIFunction {
                                    name: name.to_string(),
                                    arguments: input.to_string(),
                                },
                            });
                        }
                        Some(content::TOOL_RESULT) => {
                            let Some(call_id) = block
                                .get("tool_use_id")
                                .and_then(Value::as_str)
                                .filter(|s| !s.is_empty())
                            else {
                                continue;
                            };
                            tool_results.push(OpenAIMessage {
                                role: role::TOOL.to_string(),
                                content: Some(Value::String(extract_tool_result_content(
                                    block.get("content"),
                                ))),
                                tool_call_id: Some(call_id.to_string()),
                                ..Default::default()
                            });
                        }
                        _ => {}
                    }
                }

                if !text_parts.is_empty() || !tool_calls.is_empty() {
                    let mut openai_msg = OpenAIMessage {
                        role: msg.role.clone(),
                        ..Default::default()
                    };
                    if !text_parts.is_empty() {
                        openai_msg.content = Some(Value::String(text_parts.concat()));
                    }
                    if !tool_calls.is_empty() {
                        openai_msg.tool_calls = Some(tool_calls);
                    }
                    messages.push(openai_msg);
                } else if has_thinking && msg.role == role::ASSISTANT {
                    // Keep role alternation intact when an assistant turn
                    // consisted solely of thinking.
                    messages.push(OpenAIMessage {
                        role: role::ASSISTANT.to_string(),
                        content: Some(Value::String("(thinking...)".to_string())),
                        ..Default::default()
                    });
                }

                messages.extend(tool_results);
            }
        }
    }

    let mut chat_req = OpenAIChatCompletionRequest {
        model: model.to_string(),
        messages,
        max_tokens: None,
        max_completion_tokens: req.max_tokens.filter(|t| *t > 0),
        temperature: req.temperature.filter(|t| *t > 0.0),
        stream: req.stream,
        stream_options: req
            .stream
            .then_some(OpenAIStreamOptions { include_usage: true }),
        tools: None,
        tool_choice: None,
    };

    if let Some(ref claude_tools) = req.tools {
        let tools: Vec<OpenAITool> = claude_tools
            .iter()
            .filter(|t| !t.name.trim().is_empty())
            .map(|t| OpenAITool {
                tool_type: tool::FUNCTION.to_string(),
                function: OpenAIFunctionDef {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.input_schema.clone(),
                },
            })
            .collect();

        if !tools.is_empty() {
            chat_req.tools = Some(tools);
            chat_req.tool_choice = match &req.tool_choice {
                Some(Value::Object(tc)) => match tc.get("type").and_then(Value::as_str) {
                    Some("tool") => tc
                        .get("name")
                        .and_then(Value::as_str)
                        .map(|name| json!({"type": tool::FUNCTION, "function": {"name": name}})),
                    Some("any") => Some(json!("required")),
                    Some("auto") => Some(json!("auto")),
                    _ => None,
                },
                Some(Value::String(s)) => Some(Value::String(s.clone())),
                Some(_) => None,
                None => Some(json!("auto")),
            };
        }
    }

    Ok(serde_json::to_vec(&chat_req)?)
}

/// Convert an OpenAI Chat request into a Claude Messages request.
pub(crate) fn chat_req_to_claude(body: &[u8], model: &str) -> Result<Vec<u8>, TransformError> {
    let req: OpenAIChatCompletionRequest = serde_json::from_slice(body)?;

    let mut claude_req = json!({
        "model": model,
        "max_tokens": 8192,
        "stream": req.stream,
    });

    if let Some(max_tokens) = req.max_tokens.filter(|t| *t > 0) {
        claude_req["max_tokens"] = json!(max_tokens);
    } else if let Some(max_tokens) = req.max_completion_tokens.filter(|t| *t > 0) {
        claude_req["max_tokens"] = json!(max_tokens);
    }
    if let Some(temperature) = req.temperature {
        claude_req["temperature"] = json!(temperature);
    }

    let mut system_parts: Vec<String> = Vec::new();
    let mut messages: Vec<Value> = Vec::new();

    for msg in &req.messages {
        if msg.role == role::SYSTEM {
            if let Some(text) = msg.content.as_ref().and_then(Value::as_str) {
                system_parts.push(text.to_string());
            }
            continue;
        }

        if msg.role == role::TOOL {
            messages.push(json!({
                "role": role::USER,
                "content": [{
                    "type": content::TOOL_RESULT,
                    "tool_use_id": msg.tool_call_id.clone().unwrap_or_default(),
                    "content": msg.content.clone().unwrap_or(Value::String(String::new())),
                }],
            }));
            continue;
        }

        let mut claude_msg = json!({"role": msg.role});
        match &msg.content {
            Some(Value::String(s)) => claude_msg["content"] = json!(s),
            Some(Value::Array(items)) => {
                claude_msg["content"] = Value::Array(chat_content_to_claude(items));
            }
            _ => {}
        }

        if let Some(ref tool_calls) = msg.tool_calls {
            if !tool_calls.is_empty() {
                let mut blocks: Vec<Value> = Vec::new();
                if let Some(text) = claude_msg["content"].as_str().filter(|s| !s.is_empty()) {
                    blocks.push(json!({"type": content::TEXT, "text": text}));
                }
                for tc in tool_calls {
                    let input: Value = serde_json::from_str(&tc.function.arguments)
                        .unwrap_or_else(|_| json!({}));
                    blocks.push(json!({
                        "type": content::TOOL_USE,
                        "id": tc.id,
                        "name": tc.function.name,
                        "input": input,
                    }));
                }
                claude_msg["content"] = Value::Array(blocks);
            }
        }

        messages.push(claude_msg);
    }

    let system_prompt = system_parts.join("\n");
    let system_prompt = system_prompt.trim();
    if !system_prompt.is_empty() {
        claude_req["system"] = json!(system_prompt);
    }
    claude_req["messages"] = Value::Array(messages);

    if let Some(ref chat_tools) = req.tools {
        let tools: Vec<Value> = chat_tools
            .iter()
            .filter(|t| t.tool_type == tool::FUNCTION)
            .map(|t| {
                json!({
                    "name": t.function.name,
                    "description": t.function.description,
                    "input_schema": t.function.parameters,
                })
            })
            .collect();
        if !tools.is_empty() {
            claude_req["tools"] = Value::Array(tools);
        }
    }

    Ok(serde_json::to_vec(&claude_req)?)
}

/// Convert a Claude response into an OpenAI Chat response.
pub(crate) fn claude_resp_to_chat(body: &[u8], model: &str) -> Result<Vec<u8>, TransformError> {
    let resp: ClaudeResponse = serde_json::from_slice(body)?;

    let mut text_content = String::new();
    let mut tool_calls: Vec<Value> = Vec::new();

    for block in &resp.content {
        match block.get("type").and_then(Value::as_str) {
            Some(content::TEXT) => {
                if let Some(text) = block.get("text").and_then(Value::as_str) {
                    text_content.push_str(text);
                }
            }
            Some(content::TOOL_USE) => {
                let input = block
                    .get("input")
                    .cloned()
                    .unwrap_or_else(|| Value::Object(Map::new()));
                tool_calls.push(json!({
                    "id": block.get("id").cloned().unwrap_or_default(),
                    "type": tool::FUNCTION,
                    "function": {
                        "name": block.get("name").cloned().unwrap_or_default(),
                        "arguments": input.to_string(),
                    },
                }));
            }
            _ => {}
        }
    }

    let mut message = json!({"role": role::ASSISTANT, "content": text_content});
    if !tool_calls.is_empty() {
        message["tool_calls"] = Value::Array(tool_calls);
    }

    let finish_reason = if resp.stop_reason.as_deref() == Some(stop::TOOL_USE) {
        finish::TOOL_CALLS
    } else {
        finish::STOP
    };

    let chat_resp = json!({
        "id": resp.id,
        "object": "chat.completion",
        "model": model,
        "choices": [{"index": 0, "message": message, "finish_reason": finish_reason}],
        "usage": {
            "prompt_tokens": resp.usage.input_tokens,
            "completion_tokens": resp.usage.output_tokens,
            "total_tokens": resp.usage.input_tokens + resp.usage.output_tokens,
        },
    });

    Ok(serde_json::to_vec(&chat_resp)?)
}

/// Convert an OpenAI Chat response into a Claude response.
///
/// Message text passes through the think-tag splitter so reasoning buried
/// inline is recovered into proper `thinking` blocks.
pub(crate) fn chat_resp_to_claude(body: &[u8]) -> Result<Vec<u8>, TransformError> {
    let resp: OpenAIChatCompletionResponse = serde_json::from_slice(body)?;

    let mut blocks: Vec<Value> = Vec::new();
    let mut stop_reason = stop::END_TURN;

    if let Some(choice) = resp.choices.first() {
        if let Some(text) = choice.message.content.as_ref().and_then(Value::as_str) {
            if !text.is_empty() {
                blocks.extend(split_think_tagged_text(text));
            }
        }
        if let Some(ref tool_calls) = choice.message.tool_calls {
            for tc in tool_calls {
                let input: Value =
                    serde_json::from_str(&tc.function.arguments).unwrap_or_else(|_| json!({}));
                blocks.push(json!({
                    "type": content::TOOL_USE,
                    "id": tc.id,
                    "name": tc.function.name,
                    "input": input,
                }));
                stop_reason = stop::TOOL_USE;
            }
        }
    }

    let claude_resp = json!({
        "id": resp.id,
        "type": "message",
        "role": role::ASSISTANT,
        "content": blocks,
        "model": resp.model,
        "stop_reason": stop_reason,
        "usage": {
            "input_tokens": resp.usage.prompt_tokens,
            "output_tokens": resp.usage.completion_tokens,
        },
    });

    Ok(serde_json::to_vec(&claude_resp)?)
}

/// Convert one Claude SSE event into OpenAI Chat stream chunks.
pub(crate) fn claude_stream_to_chat(
    frame: &[u8],
    ctx: &mut StreamContext,
) -> Result<Vec<u8>, TransformError> {
    let (event_type, data) = parse_sse(frame);
    if data.is_empty() {
        return Ok(Vec::new());
    }
    let Ok(payload) = serde_json::from_str::<Value>(data) else {
        return Ok(Vec::new());
    };
    let event_type = if event_type.is_empty() {
        payload.get("type").and_then(Value::as_str).unwrap_or("")
    } else {
        event_type
    };

    match event_type {
        event::MESSAGE_START => {
            if let Some(id) = payload
                .get("message")
                .and_then(|m| m.get("id"))
                .and_then(Value::as_str)
            {
                ctx.message_id = id.to_string();
            }
            Ok(Vec::new())
        }

        event::CONTENT_BLOCK_START => {
            if let Some(block) = payload.get("content_block") {
                if block.get("type").and_then(Value::as_str) == Some(content::TOOL_USE) {
                    ctx.tool_block_started = true;
                    ctx.current_tool_id = block
                        .get("id")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                    ctx.current_tool_name = block
                        .get("name")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                    ctx.tool_arguments.clear();
                }
            }
            Ok(Vec::new())
        }

        event::CONTENT_BLOCK_DELTA => {
            let Some(block_delta) = payload.get("delta") else {
                return Ok(Vec::new());
            };
            match block_delta.get("type").and_then(Value::as_str) {
                Some(delta::TEXT) => {
                    let text = block_delta.get("text").and_then(Value::as_str).unwrap_or("");
                    Ok(build_chat_chunk(&ctx.message_id, &ctx.model_name, text, None, None))
                }
                Some(delta::INPUT_JSON) => {
                    if let Some(partial) = block_delta.get("partial_json").and_then(Value::as_str) {
                        ctx.tool_arguments.push_str(partial);
                    }
                    Ok(Vec::new())
                }
                _ => Ok(Vec::new()),
            }
        }

        event::CONTENT_BLOCK_STOP => {
            if ctx.tool_block_started {
                // Tool arguments are emitted once, whole, at block close.
                let chunk = build_chat_chunk(
                    &ctx.message_id,
                    &ctx.model_name,
                    "",
                    Some(json!([{
                        "index": ctx.content_index,
                        "id": ctx.current_tool_id,
                        "type": tool::FUNCTION,
                        "function": {
                            "name": ctx.current_tool_name,
                            "arguments": ctx.tool_arguments,
                        },
                    }])),
                    None,
                );
                ctx.tool_block_started = false;
                ctx.tool_arguments.clear();
                ctx.content_index += 1;
                return Ok(chunk);
            }
            Ok(Vec::new())
        }

        event::MESSAGE_DELTA => {
            if let Some(msg_delta) = payload.get("delta") {
                let finish_reason =
                    if msg_delta.get("stop_reason").and_then(Value::as_str) == Some(stop::TOOL_USE) {
                        finish::TOOL_CALLS
                    } else {
                        finish::STOP
                    };
                return Ok(build_chat_chunk(
                    &ctx.message_id,
                    &ctx.model_name,
                    "",
                    None,
                    Some(finish_reason),
                ));
            }
            Ok(Vec::new())
        }

        event::MESSAGE_STOP => Ok(done_frame()),

        _ => Ok(Vec::new()),
    }
}

/// Convert one OpenAI Chat stream chunk into Claude SSE events.
pub(crate) fn chat_stream_to_claude(
    frame: &[u8],
    ctx: &mut StreamContext,
) -> Result<Vec<u8>, TransformError> {
    let (_, data) = parse_sse(frame);
    if data.is_empty() {
        return Ok(Vec::new());
    }
    if data == SSE_DONE {
        return Ok(finish_claude_stream(ctx, true));
    }

    let Ok(chunk) = serde_json::from_str::<OpenAIStreamingChunk>(data) else {
        return Ok(Vec::new());
    };

    let mut out = Vec::new();

    if !ctx.message_start_sent {
        ctx.message_start_sent = true;
        ctx.message_id = chunk.id.clone();
        out.extend(build_claude_event(
            event::MESSAGE_START,
            json!({
                "message": {
                    "id": chunk.id,
                    "type": "message",
                    "role": role::ASSISTANT,
                    "content": [],
                    "model": ctx.model_name,
                    "stop_reason": null,
                    "stop_sequence": null,
                    "usage": {"input_tokens": 0, "output_tokens": 0},
                },
            }),
        ));
    }

    let Some(choice) = chunk.choices.first() else {
        if let Some(ref usage) = chunk.usage {
            out.extend(build_usage_delta(usage.prompt_tokens, usage.completion_tokens));
        }
        return Ok(out);
    };

    let chunk_delta = &choice.delta;
    let delta_is_empty = chunk_delta.role.is_empty()
        && chunk_delta.content.is_empty()
        && chunk_delta.reasoning_content.is_empty()
        && chunk_delta.tool_calls.is_empty();
    if let Some(ref usage) = chunk.usage {
        if delta_is_empty && choice.finish_reason.is_none() {
            // OpenAI final usage chunks are re-surfaced as a message_delta.
            out.extend(build_usage_delta(usage.prompt_tokens, usage.completion_tokens));
            return Ok(out);
        }
    }

    if !chunk_delta.reasoning_content.is_empty() {
        emit_thinking(ctx, &mut out, &chunk_delta.reasoning_content);
    }

    if !chunk_delta.content.is_empty() {
        let combined = format!("{}{}", std::mem::take(&mut ctx.thinking_buffer), chunk_delta.content);
        consume_think_tagged_stream(&combined, ctx, &mut out, emit_text_closing, emit_thinking);
    }

    for tc in &chunk_delta.tool_calls {
        // An entry with a non-empty id starts a new tool block.
        if !tc.id.is_empty() {
            if ctx.thinking_block_started {
                out.extend(build_claude_event(
                    event::CONTENT_BLOCK_STOP,
                    json!({"index": ctx.thinking_index}),
                ));
                ctx.thinking_block_started = false;
            }
            if ctx.content_block_started {
                out.extend(build_claude_event(
                    event::CONTENT_BLOCK_STOP,
                    json!({"index": ctx.content_index}),
                ));
                ctx.content_block_started = false;
                ctx.content_index += 1;
            }
            if ctx.tool_block_started {
                out.extend(build_claude_event(
                    event::CONTENT_BLOCK_STOP,
                    json!({"index": ctx.tool_index}),
                ));
                ctx.content_index += 1;
            }
            ctx.tool_block_started = true;
            ctx.tool_index = ctx.content_index;
            ctx.current_tool_id = tc.id.clone();
            ctx.current_tool_name = tc.function.name.clone();
            ctx.tool_arguments.clear();
            out.extend(build_claude_event(
                event::CONTENT_BLOCK_START,
                json!({
                    "index": ctx.tool_index,
                    "content_block": {
                        "type": content::TOOL_USE,
                        "id": tc.id,
                        "name": tc.function.name,
                        "input": {},
                    },
                }),
            ));
        }

        if !tc.function.arguments.is_empty() {
            ctx.tool_arguments.push_str(&tc.function.arguments);
            out.extend(build_claude_event(
                event::CONTENT_BLOCK_DELTA,
                json!({
                    "index": ctx.tool_index,
                    "delta": {"type": delta::INPUT_JSON, "partial_json": tc.function.arguments},
                }),
            ));
        }
    }

    if let Some(ref reason) = choice.finish_reason {
        close_open_blocks(ctx, &mut out);
        let stop_reason = if reason.as_str() == finish::TOOL_CALLS {
            stop::TOOL_USE
        } else {
            stop::END_TURN
        };
        out.extend(build_claude_event(
            event::MESSAGE_DELTA,
            json!({
                "delta": {"stop_reason": stop_reason, "stop_sequence": null},
                "usage": {"output_tokens": 0},
            }),
        ));
        ctx.finish_reason_sent = true;
    }

    Ok(out)
}

/// Run the end-of-stream flush for a Claude-output stream: drain the tag
/// scanner, close any open blocks, synthesize a final `message_delta` when
/// the upstream never sent a finish reason, and terminate.
pub(crate) fn finish_claude_stream(ctx: &mut StreamContext, emit_stop: bool) -> Vec<u8> {
    let mut out = Vec::new();
    flush_think_tagged_stream(ctx, &mut out, emit_text, emit_thinking);
    close_open_blocks(ctx, &mut out);
    if !ctx.finish_reason_sent {
        out.extend(build_claude_event(
            event::MESSAGE_DELTA,
            json!({
                "delta": {"stop_reason": stop::END_TURN, "stop_sequence": null},
                "usage": {"output_tokens": 0},
            }),
        ));
        ctx.finish_reason_sent = true;
    }
    if emit_stop {
        out.extend(build_claude_event(event::MESSAGE_STOP, json!({})));
    }
    out
}

/// Close whichever of the thinking/text/tool blocks is still open.
pub(crate) fn close_open_blocks(ctx: &mut StreamContext, out: &mut Vec<u8>) {
    if ctx.thinking_block_started {
        out.extend(build_claude_event(
            event::CONTENT_BLOCK_STOP,
            json!({"index": ctx.thinking_index}),
        ));
        ctx.thinking_block_started = false;
    }
    if ctx.content_block_started {
        out.extend(build_claude_event(
            event::CONTENT_BLOCK_STOP,
            json!({"index": ctx.content_index}),
        ));
        ctx.content_block_started = false;
    }
    if ctx.tool_block_started {
        out.extend(build_claude_event(
            event::CONTENT_BLOCK_STOP,
            json!({"index": ctx.tool_index}),
        ));
        ctx.tool_block_started = false;
    }
}

fn build_usage_delta(input_tokens: u64, output_tokens: u64) -> Vec<u8> {
    build_claude_event(
        event::MESSAGE_DELTA,
        json!({
            "delta": {},
            "usage": {"input_tokens": input_tokens, "output_tokens": output_tokens},
        }),
    )
}

/// Convert OpenAI Chat array content into Claude content blocks.
///
/// Text parts pass through; `image_url` parts with a `data:` URL become
/// base64 image blocks. Remote image URLs are dropped because Claude only
/// accepts inline base64 here.
fn chat_content_to_claude(items: &[Value]) -> Vec<Value> {
    let mut blocks = Vec::new();
    for item in items {
        match item.get("type").and_then(Value::as_str) {
            Some(content::TEXT) => {
                blocks.push(json!({
                    "type": content::TEXT,
                    "text": item.get("text").cloned().unwrap_or_default(),
                }));
            }
            Some("image_url") => {
                let Some(url) = item
                    .get("image_url")
                    .and_then(|u| u.get("url"))
                    .and_then(Value::as_str)
                else {
                    continue;
                };
                let Some(rest) = url.strip_prefix("data:") else {
                    continue;
                };
                let Some((header, payload)) = rest.split_once(',') else {
                    continue;
                };
                let media_type = header.split(';').next().unwrap_or_default();
                blocks.push(json!({
                    "type": content::IMAGE,
                    "source": {"type": "base64", "media_type": media_type, "data": payload},
                }));
            }
            _ => {}
        }
    }
    blocks
}

/// Flatten Claude `tool_result` content into a single string.
pub(crate) fn extract_tool_result_content(content_value: Option<&Value>) -> String {
    match content_value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => {
            let parts: Vec<&str> = items
                .iter()
                .filter(|item| item.get("type").and_then(Value::as_str) == Some(content::TEXT))
                .filter_map(|item| item.get("text").and_then(Value::as_str))
                .collect();
            parts.join("\n")
        }
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_chat_stream(chunks: &[&str]) -> String {
        let mut ctx = StreamContext::with_model("claude-3-5-sonnet-20241022");
        let mut all = Vec::new();
        for chunk in chunks {
            let events = chat_stream_to_claude(chunk.as_bytes(), &mut ctx).unwrap();
            all.extend(events);
        }
        String::from_utf8(all).unwrap()
    }

    /// Parse a run of SSE output into (event_type, payload) pairs.
    fn frames(output: &str) -> Vec<(String, Value)> {
        output
            .split("\n\n")
            .filter(|f| !f.trim().is_empty())
            .map(|f| {
                let (event_type, data) = parse_sse(f.as_bytes());
                let payload = serde_json::from_str::<Value>(data).unwrap_or(Value::Null);
                (event_type.to_string(), payload)
            })
            .collect()
    }

    fn block_starts_of_type(output: &str, block_type: &str) -> usize {
        frames(output)
            .iter()
            .filter(|(event_type, payload)| {
                event_type == "content_block_start"
                    && payload["content_block"]["type"] == block_type
            })
            .count()
    }

    fn collect_deltas(output: &str, delta_type: &str, field: &str) -> String {
        frames(output)
            .iter()
            .filter(|(_, payload)| payload["delta"]["type"] == delta_type)
            .filter_map(|(_, payload)| payload["delta"][field].as_str().map(String::from))
            .collect()
    }

    #[test]
    fn test_claude_req_with_tool_use_and_result() {
        let claude_req = r#"{
            "model": "claude-3-opus-20240229",
            "messages": [
                {"role": "user", "content": "hi"},
                {"role": "assistant", "content": [
                    {"type": "tool_use", "id": "toolu_1", "name": "read_file", "input": {"path": "/tmp/a"}}
                ]},
                {"role": "user", "content": [
                    {"type": "tool_result", "tool_use_id": "toolu_1", "content": "ok"}
                ]}
            ],
            "max_tokens": 1024
        }"#;

        let out = claude_req_to_chat(claude_req.as_bytes(), "gpt-4").unwrap();
        let req: OpenAIChatCompletionRequest = serde_json::from_slice(&out).unwrap();

        assert_eq!(req.messages.len(), 3);
        let assistant = &req.messages[1];
        assert_eq!(assistant.role, "assistant");
        let calls = assistant.tool_calls.as_ref().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "toolu_1");
        assert_eq!(calls[0].function.name, "read_file");
        let args: Value = serde_json::from_str(&calls[0].function.arguments).unwrap();
        assert_eq!(args["path"], "/tmp/a");

        let tool_msg = &req.messages[2];
        assert_eq!(tool_msg.role, "tool");
        assert_eq!(tool_msg.tool_call_id.as_deref(), Some("toolu_1"));
        assert_eq!(tool_msg.content.as_ref().unwrap().as_str(), Some("ok"));
    }

    #[test]
    fn test_claude_req_skips_invalid_tool_blocks() {
        let claude_req = r#"{
            "model": "claude-3-opus-20240229",
            "messages": [
                {"role": "assistant", "content": [
                    {"type": "tool_use", "id": 123, "name": false, "input": {"path": "/tmp/a"}},
                    {"type": "tool_result", "tool_use_id": 456, "content": "bad"},
                    {"type": "text", "text": "ok"}
                ]}
            ],
            "max_tokens": 128
        }"#;

        let out = claude_req_to_chat(claude_req.as_bytes(), "gpt-4").unwrap();
        let req: OpenAIChatCompletionRequest = serde_json::from_slice(&out).unwrap();

        assert_eq!(req.messages.len(), 1);
        assert_eq!(req.messages[0].content.as_ref().unwrap().as_str(), Some("ok"));
        assert!(req.messages[0].tool_calls.is_none());
    }

    #[test]
    fn test_claude_req_thinking_only_placeholder() {
        let claude_req = r#"{
            "model": "claude-3-opus-20240229",
            "messages": [
                {"role": "user", "content": "Hello"},
                {"role": "assistant", "content": [
                    {"type": "thinking", "thinking": "I should say hello back"}
                ]},
                {"role": "user", "content": "How are you?"}
            ],
            "max_tokens": 1024
        }"#;

        let out = claude_req_to_chat(claude_req.as_bytes(), "gpt-4").unwrap();
        let req: OpenAIChatCompletionRequest = serde_json::from_slice(&out).unwrap();

        assert_eq!(req.messages.len(), 3);
        assert_eq!(req.messages[1].role, "assistant");
        assert_eq!(
            req.messages[1].content.as_ref().unwrap().as_str(),
            Some("(thinking...)")
        );
    }

    #[test]
    fn test_claude_req_system_and_tool_choice() {
        let claude_req = r#"{
            "model": "claude-3-opus-20240229",
            "system": [{"type": "text", "text": "Be brief."}, {"type": "text", "text": "Be kind."}],
            "messages": [{"role": "user", "content": "hi"}],
            "max_tokens": 256,
            "stream": true,
            "tools": [{"name": "lookup", "description": "d", "input_schema": {"type": "object"}}],
            "tool_choice": {"type": "any"}
        }"#;

        let out = claude_req_to_chat(claude_req.as_bytes(), "gpt-4o").unwrap();
        let req: OpenAIChatCompletionRequest = serde_json::from_slice(&out).unwrap();

        assert_eq!(req.messages[0].role, "system");
        assert_eq!(
            req.messages[0].content.as_ref().unwrap().as_str(),
            Some("Be brief.\nBe kind.")
        );
        assert_eq!(req.max_completion_tokens, Some(256));
        assert_eq!(req.tool_choice, Some(json!("required")));
        assert!(req.stream_options.as_ref().unwrap().include_usage);
        let tools = req.tools.as_ref().unwrap();
        assert_eq!(tools[0].function.name, "lookup");
        assert_eq!(tools[0].function.parameters["type"], "object");
    }

    #[test]
    fn test_claude_req_named_tool_choice() {
        let claude_req = r#"{
            "model": "claude-3-opus-20240229",
            "messages": [{"role": "user", "content": "hi"}],
            "max_tokens": 64,
            "tools": [{"name": "lookup", "input_schema": {"type": "object"}}],
            "tool_choice": {"type": "tool", "name": "lookup"}
        }"#;

        let out = claude_req_to_chat(claude_req.as_bytes(), "gpt-4o").unwrap();
        let req: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(
            req["tool_choice"],
            json!({"type": "function", "function": {"name": "lookup"}})
        );
    }

    #[test]
    fn test_chat_req_to_claude_defaults_and_images() {
        let chat_req = r#"{
            "model": "gpt-4o",
            "messages": [
                {"role": "system", "content": "Be brief."},
                {"role": "user", "content": [
                    {"type": "text", "text": "what is this?"},
                    {"type": "image_url", "image_url": {"url": "data:image/png;base64,AAAA"}},
                    {"type": "image_url", "image_url": {"url": "https://example.com/a.png"}}
                ]}
            ]
        }"#;

        let out = chat_req_to_claude(chat_req.as_bytes(), "claude-3-5-sonnet-20241022").unwrap();
        let req: Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(req["max_tokens"], 8192);
        assert_eq!(req["system"], "Be brief.");
        let msgs = req["messages"].as_array().unwrap();
        assert_eq!(msgs.len(), 1);
        let blocks = msgs[0]["content"].as_array().unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0]["type"], "text");
        assert_eq!(blocks[1]["type"], "image");
        assert_eq!(blocks[1]["source"]["media_type"], "image/png");
        assert_eq!(blocks[1]["source"]["data"], "AAAA");
    }

    #[test]
    fn test_chat_req_tool_messages_and_calls() {
        let chat_req = r#"{
            "model": "gpt-4o",
            "max_completion_tokens": 2048,
            "messages": [
                {"role": "assistant", "content": "calling", "tool_calls": [
                    {"id": "call_1", "type": "function", "function": {"name": "f", "arguments": "{\"x\":1}"}}
                ]},
                {"role": "tool", "tool_call_id": "call_1", "content": "42"}
            ]
        }"#;

        let out = chat_req_to_claude(chat_req.as_bytes(), "claude-3-5-sonnet-20241022").unwrap();
        let req: Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(req["max_tokens"], 2048);
        let msgs = req["messages"].as_array().unwrap();
        let assistant_blocks = msgs[0]["content"].as_array().unwrap();
        assert_eq!(assistant_blocks[0]["type"], "text");
        assert_eq!(assistant_blocks[0]["text"], "calling");
        assert_eq!(assistant_blocks[1]["type"], "tool_use");
        assert_eq!(assistant_blocks[1]["id"], "call_1");
        assert_eq!(assistant_blocks[1]["input"]["x"], 1);

        assert_eq!(msgs[1]["role"], "user");
        let result_block = &msgs[1]["content"][0];
        assert_eq!(result_block["type"], "tool_result");
        assert_eq!(result_block["tool_use_id"], "call_1");
        assert_eq!(result_block["content"], "42");
    }

    #[test]
    fn test_chat_req_bad_tool_arguments_become_empty_object() {
        let chat_req = r#"{
            "model": "gpt-4o",
            "messages": [
                {"role": "assistant", "tool_calls": [
                    {"id": "call_1", "type": "function", "function": {"name": "f", "arguments": "{not json"}}
                ]}
            ]
        }"#;

        let out = chat_req_to_claude(chat_req.as_bytes(), "claude-3-5-sonnet-20241022").unwrap();
        let req: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(req["messages"][0]["content"][0]["input"], json!({}));
    }

    #[test]
    fn test_chat_resp_with_thinking() {
        let chat_resp = r#"{
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "model": "gpt-4o",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "<think>Thinking about the weather...</think>\n\nIt is a nice day."},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 9, "completion_tokens": 12, "total_tokens": 21}
        }"#;

        let out = chat_resp_to_claude(chat_resp.as_bytes()).unwrap();
        let resp: Value = serde_json::from_slice(&out).unwrap();

        let blocks = resp["content"].as_array().unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0]["type"], "thinking");
        assert_eq!(blocks[0]["thinking"], "Thinking about the weather...");
        assert_eq!(blocks[1]["type"], "text");
        assert_eq!(blocks[1]["text"].as_str().unwrap().trim(), "It is a nice day.");
        assert_eq!(resp["stop_reason"], "end_turn");
        assert_eq!(resp["usage"]["input_tokens"], 9);
        assert_eq!(resp["usage"]["output_tokens"], 12);
    }

    #[test]
    fn test_chat_resp_multiple_thinking_segments() {
        let chat_resp = r#"{
            "id": "chatcmpl-456",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "A<think>X</think>B<think>Y</think>C"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 9, "completion_tokens": 12, "total_tokens": 21}
        }"#;

        let out = chat_resp_to_claude(chat_resp.as_bytes()).unwrap();
        let resp: Value = serde_json::from_slice(&out).unwrap();
        let blocks = resp["content"].as_array().unwrap();
        assert_eq!(blocks.len(), 5);
        assert_eq!(blocks[0]["text"], "A");
        assert_eq!(blocks[1]["thinking"], "X");
        assert_eq!(blocks[2]["text"], "B");
        assert_eq!(blocks[3]["thinking"], "Y");
        assert_eq!(blocks[4]["text"], "C");
    }

    #[test]
    fn test_chat_resp_empty_content_is_array() {
        let chat_resp = r#"{"id": "c", "choices": [], "usage": {}}"#;
        let out = chat_resp_to_claude(chat_resp.as_bytes()).unwrap();
        let resp: Value = serde_json::from_slice(&out).unwrap();
        assert!(resp["content"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_chat_resp_tool_calls_force_tool_use() {
        let chat_resp = r#"{
            "id": "chatcmpl-1",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "", "tool_calls": [
                    {"id": "call_9", "type": "function", "function": {"name": "f", "arguments": "{\"a\":2}"}}
                ]},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 1, "completion_tokens": 2, "total_tokens": 3}
        }"#;

        let out = chat_resp_to_claude(chat_resp.as_bytes()).unwrap();
        let resp: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(resp["stop_reason"], "tool_use");
        assert_eq!(resp["content"][0]["type"], "tool_use");
        assert_eq!(resp["content"][0]["input"]["a"], 2);
    }

    #[test]
    fn test_claude_resp_to_chat_mapping() {
        let claude_resp = r#"{
            "id": "msg_1",
            "content": [
                {"type": "text", "text": "Done. "},
                {"type": "thinking", "thinking": "hidden"},
                {"type": "tool_use", "id": "toolu_2", "name": "write", "input": {"path": "b"}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 10, "output_tokens": 20}
        }"#;

        let out = claude_resp_to_chat(claude_resp.as_bytes(), "gpt-4o").unwrap();
        let resp: Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(resp["object"], "chat.completion");
        assert_eq!(resp["choices"][0]["finish_reason"], "tool_calls");
        let message = &resp["choices"][0]["message"];
        assert_eq!(message["content"], "Done. ");
        assert!(message["content"].as_str().unwrap().find("hidden").is_none());
        assert_eq!(message["tool_calls"][0]["id"], "toolu_2");
        assert_eq!(resp["usage"]["total_tokens"], 30);
    }

    #[test]
    fn test_stream_thinking_split_tag() {
        let output = run_chat_stream(&[
            r#"data: {"id":"1","choices":[{"index":0,"delta":{"role":"assistant","content":""}}]}"#,
            r#"data: {"id":"1","choices":[{"index":0,"delta":{"content":"<thi"}}]}"#,
            r#"data: {"id":"1","choices":[{"index":0,"delta":{"content":"nk>Thinking"}}]}"#,
            r#"data: {"id":"1","choices":[{"index":0,"delta":{"content":"..."}}]}"#,
            r#"data: {"id":"1","choices":[{"index":0,"delta":{"content":"</think>"}}]}"#,
            r#"data: {"id":"1","choices":[{"index":0,"delta":{"content":"Hello!"}}]}"#,
            "data: [DONE]",
        ]);

        assert!(!output.contains("<think>"));
        assert!(!output.contains("</think>"));
        // Exactly one thinking block and one text block are opened.
        assert_eq!(block_starts_of_type(&output, "thinking"), 1);
        assert_eq!(block_starts_of_type(&output, "text"), 1);
        assert_eq!(collect_deltas(&output, "thinking_delta", "thinking"), "Thinking...");
        assert_eq!(collect_deltas(&output, "text_delta", "text"), "Hello!");
    }

    #[test]
    fn test_stream_unterminated_thinking_at_done() {
        let output = run_chat_stream(&[
            r#"data: {"id":"1","choices":[{"index":0,"delta":{"content":"<think>this is some thinking content"}}]}"#,
            "data: [DONE]",
        ]);

        assert!(!output.contains("<think>"));
        assert!(!output.contains("</think>"));
        assert_eq!(block_starts_of_type(&output, "thinking"), 1);
        assert_eq!(
            collect_deltas(&output, "thinking_delta", "thinking"),
            "this is some thinking content"
        );
        let events: Vec<String> = frames(&output).into_iter().map(|(e, _)| e).collect();
        assert!(events.contains(&"content_block_stop".to_string()));
        assert_eq!(events.last().map(String::as_str), Some("message_stop"));
    }

    #[test]
    fn test_stream_usage_chunk_becomes_message_delta() {
        let chunk = r#"data: {"id":"usage-1","object":"chat.completion.chunk","created":123,"model":"gpt-4","choices":[{"index":0,"delta":{}}],"usage":{"prompt_tokens":5,"completion_tokens":7,"total_tokens":12}}"#;
        let mut ctx = StreamContext::with_model("claude-3-5-sonnet-20241022");
        let output = chat_stream_to_claude(chunk.as_bytes(), &mut ctx).unwrap();
        let output = String::from_utf8(output).unwrap();

        let delta_frames: Vec<(String, Value)> = frames(&output)
            .into_iter()
            .filter(|(event_type, _)| event_type == "message_delta")
            .collect();
        assert_eq!(delta_frames.len(), 1, "message_delta event not found");
        let payload = &delta_frames[0].1;
        assert!(payload["delta"].is_object());
        assert_eq!(payload["usage"]["input_tokens"], 5);
        assert_eq!(payload["usage"]["output_tokens"], 7);
    }

    #[test]
    fn test_stream_single_chunk_reasoning() {
        let output = run_chat_stream(&[
            r#"data: {"id":"1","choices":[{"index":0,"delta":{"content":"<think>Reasoning</think>Hello!"}}]}"#,
        ]);

        assert_eq!(block_starts_of_type(&output, "thinking"), 1);
        assert_eq!(block_starts_of_type(&output, "text"), 1);
        assert_eq!(collect_deltas(&output, "thinking_delta", "thinking"), "Reasoning");
        assert_eq!(collect_deltas(&output, "text_delta", "text"), "Hello!");
        // The thinking block closes before the text block opens.
        let events: Vec<String> = frames(&output).into_iter().map(|(e, _)| e).collect();
        let stop_pos = events.iter().position(|e| e == "content_block_stop").unwrap();
        let second_start = events
            .iter()
            .enumerate()
            .filter(|(_, e)| *e == "content_block_start")
            .nth(1)
            .map(|(i, _)| i)
            .unwrap();
        assert!(stop_pos < second_start);
    }

    #[test]
    fn test_stream_reasoning_content_delta() {
        let output = run_chat_stream(&[
            r#"data: {"id":"1","choices":[{"index":0,"delta":{"reasoning_content":"step one"}}]}"#,
            r#"data: {"id":"1","choices":[{"index":0,"delta":{"content":"answer"}}]}"#,
            "data: [DONE]",
        ]);

        assert_eq!(block_starts_of_type(&output, "thinking"), 1);
        assert_eq!(collect_deltas(&output, "thinking_delta", "thinking"), "step one");
        assert_eq!(collect_deltas(&output, "text_delta", "text"), "answer");
    }

    #[test]
    fn test_stream_tool_call_arguments_concatenate() {
        let output = run_chat_stream(&[
            r#"data: {"id":"1","choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"id":"call_1","function":{"name":"read_file","arguments":""}}]}}]}"#,
            r#"data: {"id":"1","choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"path\":"}}]}}]}"#,
            r#"data: {"id":"1","choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"function":{"arguments":"\"/tmp/a\"}"}}]}}]}"#,
            r#"data: {"id":"1","choices":[{"index":0,"delta":{},"finish_reason":"tool_calls"}]}"#,
            "data: [DONE]",
        ]);

        let starts: Vec<Value> = frames(&output)
            .into_iter()
            .filter(|(event_type, _)| event_type == "content_block_start")
            .map(|(_, payload)| payload)
            .collect();
        assert_eq!(starts.len(), 1);
        assert_eq!(starts[0]["content_block"]["type"], "tool_use");
        assert_eq!(starts[0]["content_block"]["id"], "call_1");
        assert_eq!(starts[0]["content_block"]["name"], "read_file");
        assert_eq!(starts[0]["content_block"]["input"], json!({}));

        // Concatenating emitted partial_json fragments reproduces the
        // upstream arguments byte-for-byte.
        assert_eq!(
            collect_deltas(&output, "input_json_delta", "partial_json"),
            "{\"path\":\"/tmp/a\"}"
        );

        let stop_reasons: Vec<Value> = frames(&output)
            .into_iter()
            .filter(|(event_type, _)| event_type == "message_delta")
            .map(|(_, payload)| payload["delta"]["stop_reason"].clone())
            .collect();
        assert!(stop_reasons.contains(&json!("tool_use")));
    }

    #[test]
    fn test_stream_event_sequence_grammar() {
        let output = run_chat_stream(&[
            r#"data: {"id":"1","choices":[{"index":0,"delta":{"content":"<think>X</think>A"}}]}"#,
            r#"data: {"id":"1","choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"id":"call_1","function":{"name":"f","arguments":"{}"}}]}}]}"#,
            r#"data: {"id":"1","choices":[{"index":0,"delta":{},"finish_reason":"tool_calls"}]}"#,
            "data: [DONE]",
        ]);

        let events: Vec<String> = frames(&output).into_iter().map(|(e, _)| e).collect();
        assert_eq!(events.first().map(String::as_str), Some("message_start"));
        assert_eq!(events.last().map(String::as_str), Some("message_stop"));

        // Every content_block_start is balanced by a stop before the next
        // start.
        let mut open = false;
        for event_name in &events {
            match event_name.as_str() {
                "content_block_start" => {
                    assert!(!open, "block started while another is open");
                    open = true;
                }
                "content_block_stop" => {
                    assert!(open, "stop without open block");
                    open = false;
                }
                "message_delta" | "message_start" | "message_stop" => {}
                other => panic!("unexpected event {other}"),
            }
        }
        assert!(!open);
    }

    #[test]
    fn test_stream_block_indices_monotonic() {
        let output = run_chat_stream(&[
            r#"data: {"id":"1","choices":[{"index":0,"delta":{"content":"<think>X</think>A"}}]}"#,
            r#"data: {"id":"1","choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"id":"call_1","function":{"name":"f","arguments":"{}"}}]}}]}"#,
            "data: [DONE]",
        ]);

        let start_indices: Vec<u64> = frames(&output)
            .into_iter()
            .filter(|(event_type, _)| event_type == "content_block_start")
            .map(|(_, payload)| payload["index"].as_u64().unwrap())
            .collect();
        assert_eq!(start_indices, [0, 1, 2]);
    }

    #[test]
    fn test_stream_malformed_chunk_dropped() {
        let mut ctx = StreamContext::with_model("claude-3-5-sonnet-20241022");
        let output = chat_stream_to_claude(b"data: {not json\n", &mut ctx).unwrap();
        assert!(output.is_empty());
        // The stream keeps working afterwards.
        let output = chat_stream_to_claude(
            br#"data: {"id":"1","choices":[{"index":0,"delta":{"content":"hi"}}]}"#,
            &mut ctx,
        )
        .unwrap();
        assert!(!output.is_empty());
    }

    #[test]
    fn test_claude_stream_to_chat_text_and_finish() {
        let mut ctx = StreamContext::with_model("gpt-4o");

        let out = claude_stream_to_chat(
            b"event: message_start\ndata: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\"}}\n",
            &mut ctx,
        )
        .unwrap();
        assert!(out.is_empty());

        let out = claude_stream_to_chat(
            b"event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hello\"}}\n",
            &mut ctx,
        )
        .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\"content\":\"Hello\""));
        assert!(text.contains("\"id\":\"msg_1\""));
        assert!(text.contains("\"finish_reason\":null"));

        let out = claude_stream_to_chat(
            b"event: message_delta\ndata: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"end_turn\"}}\n",
            &mut ctx,
        )
        .unwrap();
        assert!(String::from_utf8(out).unwrap().contains("\"finish_reason\":\"stop\""));

        let out = claude_stream_to_chat(
            b"event: message_stop\ndata: {\"type\":\"message_stop\"}\n",
            &mut ctx,
        )
        .unwrap();
        assert_eq!(out, b"data: [DONE]\n\n");
    }

    #[test]
    fn test_claude_stream_to_chat_tool_block_emitted_whole() {
        let mut ctx = StreamContext::with_model("gpt-4o");

        claude_stream_to_chat(
            b"event: content_block_start\ndata: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"tool_use\",\"id\":\"toolu_1\",\"name\":\"read_file\",\"input\":{}}}\n",
            &mut ctx,
        )
        .unwrap();

        let out = claude_stream_to_chat(
            b"event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"input_json_delta\",\"partial_json\":\"{\\\"path\\\":\"}}\n",
            &mut ctx,
        )
        .unwrap();
        assert!(out.is_empty());

        let out = claude_stream_to_chat(
            b"event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"input_json_delta\",\"partial_json\":\"\\\"/tmp/a\\\"}\"}}\n",
            &mut ctx,
        )
        .unwrap();
        assert!(out.is_empty());

        let out = claude_stream_to_chat(
            b"event: content_block_stop\ndata: {\"type\":\"content_block_stop\",\"index\":0}\n",
            &mut ctx,
        )
        .unwrap();
        let text = String::from_utf8(out).unwrap();
        let payload: Value = serde_json::from_str(text.trim().strip_prefix("data: ").unwrap()).unwrap();
        let call = &payload["choices"][0]["delta"]["tool_calls"][0];
        assert_eq!(call["id"], "toolu_1");
        assert_eq!(call["function"]["name"], "read_file");
        assert_eq!(call["function"]["arguments"], "{\"path\":\"/tmp/a\"}");
    }

    #[test]
    fn test_round_trip_claude_chat_request() {
        let original = r#"{
            "model": "claude-3-opus-20240229",
            "system": "Be brief.",
            "max_tokens": 512,
            "temperature": 0.7,
            "messages": [
                {"role": "user", "content": "hi"},
                {"role": "assistant", "content": [
                    {"type": "text", "text": "calling"},
                    {"type": "tool_use", "id": "toolu_1", "name": "f", "input": {"x": 1}}
                ]},
                {"role": "user", "content": [
                    {"type": "tool_result", "tool_use_id": "toolu_1", "content": "ok"}
                ]}
            ]
        }"#;

        let chat = claude_req_to_chat(original.as_bytes(), "gpt-4o").unwrap();
        let back = chat_req_to_claude(&chat, "claude-3-opus-20240229").unwrap();
        let round: Value = serde_json::from_slice(&back).unwrap();

        assert_eq!(round["system"], "Be brief.");
        assert_eq!(round["max_tokens"], 512);
        assert!((round["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        let msgs = round["messages"].as_array().unwrap();
        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[0]["content"], "hi");
        let assistant_blocks = msgs[1]["content"].as_array().unwrap();
        assert_eq!(assistant_blocks[0]["text"], "calling");
        assert_eq!(assistant_blocks[1]["type"], "tool_use");
        assert_eq!(assistant_blocks[1]["id"], "toolu_1");
        assert_eq!(assistant_blocks[1]["input"]["x"], 1);
        let result_block = &msgs[2]["content"][0];
        assert_eq!(result_block["tool_use_id"], "toolu_1");
        assert_eq!(result_block["content"], "ok");
    }
}
