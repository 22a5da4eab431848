//! Claude <-> OpenAI Responses conversion
//!
//! The Responses dialect models tool calls as top-level output items and
//! streams through a wider event vocabulary than Chat Completions. Requests
//! going *into* Responses render Claude tool traffic as bracketed text
//! parts, because the dialect has no content-level tool slots; in the
//! reverse direction structured `function_call` items are used.

use crate::conversion::chat::{extract_tool_result_content, finish_claude_stream};
use crate::conversion::context::StreamContext;
use crate::conversion::sse::{build_claude_event, done_frame, parse_sse};
use crate::conversion::think_tags::{
    consume_think_tagged_stream, emit_text, emit_text_closing, emit_thinking,
    flush_think_tagged_stream, split_think_tagged_text,
};
use crate::conversion::TransformError;
use crate::core::constants::{content, delta, event, responses_event, role, stop, tool, SSE_DONE};
use crate::models::claude::{ClaudeMessagesRequest, ClaudeResponse, MessageContent};
use crate::models::responses::{ResponsesRequest, ResponsesResponse, ResponsesStreamEvent};
use serde_json::{json, Map, Value};

/// Convert a Claude Messages request into a Responses API request.
pub(crate) fn claude_req_to_responses(body: &[u8], model: &str) -> Result<Vec<u8>, TransformError> {
    let req: ClaudeMessagesRequest = serde_json::from_slice(body)?;

    let mut responses_req = json!({
        "model": model,
        "stream": req.stream,
    });

    if let Some(ref system) = req.system {
        responses_req["instructions"] = json!(system.flatten());
    }
    if let Some(temperature) = req.temperature.filter(|t| *t > 0.0) {
        responses_req["temperature"] = json!(temperature);
    }
    // max_output_tokens is rejected by some third-party Responses endpoints
    // and is not forwarded.

    let mut input: Vec<Value> = Vec::new();
    for msg in &req.messages {
        let parts = match &msg.content {
            MessageContent::String(s) => {
                vec![json!({"type": text_part_type(&msg.role), "text": s})]
            }
            MessageContent::Blocks(blocks) => claude_blocks_to_parts(blocks, &msg.role),
        };
        input.push(json!({"type": "message", "role": msg.role, "content": parts}));
    }
    responses_req["input"] = Value::Array(input);

    if let Some(ref claude_tools) = req.tools {
        if !claude_tools.is_empty() {
            let tools: Vec<Value> = claude_tools
                .iter()
                .map(|t| {
                    json!({
                        "type": tool::FUNCTION,
                        "name": t.name,
                        "description": t.description.clone().unwrap_or_default(),
                        "parameters": t.input_schema,
                    })
                })
                .collect();
            responses_req["tools"] = Value::Array(tools);
        }
    }

    Ok(serde_json::to_vec(&responses_req)?)
}

/// Convert a Responses API request into a Claude Messages request.
pub(crate) fn responses_req_to_claude(body: &[u8], model: &str) -> Result<Vec<u8>, TransformError> {
    let req: ResponsesRequest = serde_json::from_slice(body)?;

    let mut claude_req = json!({
        "model": model,
        "max_tokens": 8192,
        "stream": req.stream,
    });

    if !req.instructions.is_empty() {
        claude_req["system"] = json!(req.instructions);
    }
    if let Some(max_output_tokens) = req.max_output_tokens.filter(|t| *t > 0) {
        claude_req["max_tokens"] = json!(max_output_tokens);
    }
    if let Some(temperature) = req.temperature {
        claude_req["temperature"] = json!(temperature);
    }

    claude_req["messages"] = responses_input_to_claude(&req.input);

    if let Some(ref responses_tools) = req.tools {
        let mut tools: Vec<Value> = Vec::new();
        for t in responses_tools {
            let input_schema = match t.tool_type.as_str() {
                tool::FUNCTION => json!(t.parameters.clone().unwrap_or_default()),
                tool::CUSTOM => json!({
                    "type": "object",
                    "properties": {
                        "input": {"type": "string", "description": "The input for this tool"},
                    },
                    "required": ["input"],
                }),
                _ => continue,
            };
            tools.push(json!({
                "name": t.name,
                "description": t.description.clone().unwrap_or_default(),
                "input_schema": input_schema,
            }));
        }
        if !tools.is_empty() {
            claude_req["tools"] = Value::Array(tools);
        }
    }

    Ok(serde_json::to_vec(&claude_req)?)
}

/// Convert a Claude response into a Responses API response.
pub(crate) fn claude_resp_to_responses(body: &[u8]) -> Result<Vec<u8>, TransformError> {
    let resp: ClaudeResponse = serde_json::from_slice(body)?;

    let mut output_content: Vec<Value> = Vec::new();
    let mut function_calls: Vec<Value> = Vec::new();

    for block in &resp.content {
        match block.get("type").and_then(Value::as_str) {
            Some(content::TEXT) => {
                output_content.push(json!({
                    "type": "output_text",
                    "text": block.get("text").cloned().unwrap_or_default(),
                }));
            }
            Some(content::TOOL_USE) => {
                let input = block
                    .get("input")
                    .cloned()
                    .unwrap_or_else(|| Value::Object(Map::new()));
                let id = block.get("id").cloned().unwrap_or_default();
                function_calls.push(json!({
                    "type": "function_call",
                    "id": id,
                    "call_id": id,
                    "name": block.get("name").cloned().unwrap_or_default(),
                    "arguments": input.to_string(),
                }));
            }
            _ => {}
        }
    }

    let mut output: Vec<Value> = Vec::new();
    if !output_content.is_empty() {
        output.push(json!({
            "type": "message",
            "role": role::ASSISTANT,
            "content": output_content,
        }));
    }
    output.extend(function_calls);

    let responses_resp = json!({
        "id": resp.id,
        "object": "response",
        "status": "completed",
        "output": output,
        "usage": {
            "input_tokens": resp.usage.input_tokens,
            "output_tokens": resp.usage.output_tokens,
            "total_tokens": resp.usage.input_tokens + resp.usage.output_tokens,
        },
    });

    Ok(serde_json::to_vec(&responses_resp)?)
}

/// Convert a Responses API response into a Claude response.
///
/// `output_text` strings pass through the think-tag splitter so inline
/// reasoning is recovered into `thinking` blocks.
pub(crate) fn responses_resp_to_claude(body: &[u8]) -> Result<Vec<u8>, TransformError> {
    let resp: ResponsesResponse = serde_json::from_slice(body)?;

    let mut blocks: Vec<Value> = Vec::new();
    let mut stop_reason = stop::END_TURN;

    for item in &resp.output {
        match item.item_type.as_str() {
            "message" => {
                for part in &item.content {
                    if part.part_type == "output_text" {
                        blocks.extend(split_think_tagged_text(&part.text));
                    }
                }
            }
            "function_call" => {
                let input: Value =
                    serde_json::from_str(&item.arguments).unwrap_or_else(|_| json!({}));
                blocks.push(json!({
                    "type": content::TOOL_USE,
                    "id": item.call_id,
                    "name": item.name,
                    "input": input,
                }));
                stop_reason = stop::TOOL_USE;
            }
            _ => {}
        }
    }

    let claude_resp = json!({
        "id": resp.id,
        "type": "message",
        "role": role::ASSISTANT,
        "content": blocks,
        "stop_reason": stop_reason,
        "usage": {
            "input_tokens": resp.usage.input_tokens,
            "output_tokens": resp.usage.output_tokens,
        },
    });

    Ok(serde_json::to_vec(&claude_resp)?)
}

/// Convert one Claude SSE event into Responses API stream events.
///
/// A Claude `error` event is fatal for the stream.
pub(crate) fn claude_stream_to_responses(
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

    if payload.get("type").and_then(Value::as_str) == Some(event::ERROR) {
        let message = payload
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("unknown upstream error");
        return Err(TransformError::Upstream(message.to_string()));
    }

    let event_type = if event_type.is_empty() {
        payload.get("type").and_then(Value::as_str).unwrap_or("")
    } else {
        event_type
    };

    let mut out = Vec::new();
    let write_event = |value: Value, out: &mut Vec<u8>| {
        out.extend(format!("data: {}\n\n", value).into_bytes());
    };

    match event_type {
        event::MESSAGE_START => {
            if let Some(msg) = payload.get("message") {
                if let Some(id) = msg.get("id").and_then(Value::as_str) {
                    ctx.message_id = id.to_string();
                }
                if let Some(input_tokens) = msg
                    .get("usage")
                    .and_then(|u| u.get("input_tokens"))
                    .and_then(Value::as_u64)
                {
                    ctx.input_tokens = input_tokens;
                }
            }
            write_event(
                json!({
                    "type": responses_event::CREATED,
                    "response": {"id": ctx.message_id, "object": "response", "status": "in_progress"},
                }),
                &mut out,
            );
        }

        event::CONTENT_BLOCK_START => {
            let Some(block) = payload.get("content_block") else {
                return Ok(out);
            };
            let block_index = payload.get("index").and_then(Value::as_u64).unwrap_or(0) as u32;

            match block.get("type").and_then(Value::as_str) {
                Some(content::TEXT) => {
                    ctx.content_block_started = true;
                    ctx.content_index = block_index;
                    write_event(
                        json!({
                            "type": responses_event::OUTPUT_ITEM_ADDED,
                            "output_index": block_index,
                            "item": {
                                "type": "message",
                                "id": format!("msg_{}_{}", ctx.message_id, block_index),
                                "role": role::ASSISTANT,
                                "status": "in_progress",
                                "content": [],
                            },
                        }),
                        &mut out,
                    );
                    write_event(
                        json!({
                            "type": responses_event::CONTENT_PART_ADDED,
                            "output_index": block_index,
                            "content_index": 0,
                            "part": {"type": "output_text", "text": ""},
                        }),
                        &mut out,
                    );
                }
                Some(content::TOOL_USE) => {
                    ctx.tool_block_started = true;
                    ctx.tool_index = block_index;
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
                    write_event(
                        json!({
                            "type": responses_event::OUTPUT_ITEM_ADDED,
                            "output_index": block_index,
                            "item": {
                                "type": "function_call",
                                "id": ctx.current_tool_id,
                                "call_id": ctx.current_tool_id,
                                "name": ctx.current_tool_name,
                                "arguments": "",
                                "status": "in_progress",
                            },
                        }),
                        &mut out,
                    );
                }
                _ => {}
            }
        }

        event::CONTENT_BLOCK_DELTA => {
            let Some(block_delta) = payload.get("delta") else {
                return Ok(out);
            };
            match block_delta.get("type").and_then(Value::as_str) {
                Some(delta::TEXT) => {
                    write_event(
                        json!({
                            "type": responses_event::OUTPUT_TEXT_DELTA,
                            "output_index": ctx.content_index,
                            "content_index": 0,
                            "delta": block_delta.get("text").cloned().unwrap_or_default(),
                        }),
                        &mut out,
                    );
                }
                Some(delta::INPUT_JSON) => {
                    if let Some(partial) = block_delta.get("partial_json").and_then(Value::as_str) {
                        ctx.tool_arguments.push_str(partial);
                        write_event(
                            json!({
                                "type": responses_event::FUNCTION_CALL_ARGUMENTS_DELTA,
                                "output_index": ctx.tool_index,
                                "delta": partial,
                            }),
                            &mut out,
                        );
                    }
                }
                _ => {}
            }
        }

        event::CONTENT_BLOCK_STOP => {
            let block_index = payload.get("index").and_then(Value::as_u64).unwrap_or(0) as u32;

            if ctx.tool_block_started && block_index == ctx.tool_index {
                write_event(
                    json!({
                        "type": responses_event::FUNCTION_CALL_ARGUMENTS_DONE,
                        "output_index": block_index,
                        "arguments": ctx.tool_arguments,
                    }),
                    &mut out,
                );
                write_event(
                    json!({
                        "type": responses_event::OUTPUT_ITEM_DONE,
                        "output_index": block_index,
                        "item": {
                            "type": "function_call",
                            "id": ctx.current_tool_id,
                            "call_id": ctx.current_tool_id,
                            "name": ctx.current_tool_name,
                            "arguments": ctx.tool_arguments,
                            "status": "completed",
                        },
                    }),
                    &mut out,
                );
                ctx.tool_block_started = false;
                ctx.tool_arguments.clear();
            } else if ctx.content_block_started && block_index == ctx.content_index {
                write_event(
                    json!({
                        "type": responses_event::OUTPUT_TEXT_DONE,
                        "output_index": block_index,
                        "content_index": 0,
                    }),
                    &mut out,
                );
                write_event(
                    json!({
                        "type": responses_event::CONTENT_PART_DONE,
                        "output_index": block_index,
                        "content_index": 0,
                        "part": {"type": "output_text"},
                    }),
                    &mut out,
                );
                write_event(
                    json!({
                        "type": responses_event::OUTPUT_ITEM_DONE,
                        "output_index": block_index,
                        "item": {
                            "type": "message",
                            "id": format!("msg_{}_{}", ctx.message_id, block_index),
                            "role": role::ASSISTANT,
                            "status": "completed",
                        },
                    }),
                    &mut out,
                );
                ctx.content_block_started = false;
            }
        }

        event::MESSAGE_DELTA => {
            if let Some(output_tokens) = payload
                .get("usage")
                .and_then(|u| u.get("output_tokens"))
                .and_then(Value::as_u64)
            {
                ctx.output_tokens = output_tokens;
            }
        }

        event::MESSAGE_STOP => {
            write_event(
                json!({
                    "type": responses_event::COMPLETED,
                    "response": {
                        "id": ctx.message_id,
                        "object": "response",
                        "status": "completed",
                        "usage": {
                            "input_tokens": ctx.input_tokens,
                            "output_tokens": ctx.output_tokens,
                            "total_tokens": ctx.input_tokens + ctx.output_tokens,
                        },
                    },
                }),
                &mut out,
            );
            out.extend(done_frame());
        }

        _ => {}
    }

    Ok(out)
}

/// Convert one Responses API stream event into Claude SSE events.
///
/// A `{"type":"error"}` payload is fatal for the stream.
pub(crate) fn responses_stream_to_claude(
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

    let Ok(payload) = serde_json::from_str::<Value>(data) else {
        return Ok(Vec::new());
    };
    if payload.get("type").and_then(Value::as_str) == Some(event::ERROR) {
        let message = payload
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("unknown upstream error");
        return Err(TransformError::Upstream(message.to_string()));
    }
    let Ok(evt) = serde_json::from_value::<ResponsesStreamEvent>(payload) else {
        return Ok(Vec::new());
    };

    let mut out = Vec::new();

    match evt.event_type.as_str() {
        responses_event::CREATED => {
            if let Some(ref response) = evt.response {
                ctx.message_id = response.id.clone();
            }
            out.extend(build_claude_event(
                event::MESSAGE_START,
                json!({
                    "message": {
                        "id": ctx.message_id,
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

        responses_event::OUTPUT_TEXT_DELTA => {
            let combined = format!("{}{}", std::mem::take(&mut ctx.thinking_buffer), evt.delta);
            consume_think_tagged_stream(&combined, ctx, &mut out, emit_text_closing, emit_thinking);
        }

        responses_event::OUTPUT_ITEM_ADDED => {
            let Some(ref item) = evt.item else {
                return Ok(out);
            };
            if item.item_type == "function_call" {
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
                ctx.tool_block_started = true;
                ctx.tool_index = ctx.content_index;
                ctx.current_tool_id = item.call_id.clone();
                ctx.current_tool_name = item.name.clone();
                ctx.tool_arguments.clear();
                out.extend(build_claude_event(
                    event::CONTENT_BLOCK_START,
                    json!({
                        "index": ctx.tool_index,
                        "content_block": {
                            "type": content::TOOL_USE,
                            "id": ctx.current_tool_id,
                            "name": ctx.current_tool_name,
                            "input": {},
                        },
                    }),
                ));
            }
        }

        responses_event::FUNCTION_CALL_ARGUMENTS_DELTA => {
            if ctx.tool_block_started {
                ctx.tool_arguments.push_str(&evt.delta);
                out.extend(build_claude_event(
                    event::CONTENT_BLOCK_DELTA,
                    json!({
                        "index": ctx.tool_index,
                        "delta": {"type": delta::INPUT_JSON, "partial_json": evt.delta.clone()},
                    }),
                ));
            }
        }

        responses_event::OUTPUT_ITEM_DONE => {
            if let Some(ref item) = evt.item {
                if item.item_type == "function_call" && ctx.tool_block_started {
                    out.extend(build_claude_event(
                        event::CONTENT_BLOCK_STOP,
                        json!({"index": ctx.tool_index}),
                    ));
                    ctx.tool_block_started = false;
                    ctx.content_index += 1;
                }
            }
        }

        responses_event::COMPLETED => {
            flush_think_tagged_stream(ctx, &mut out, emit_text, emit_thinking);
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
            let stop_reason = if ctx.tool_index > 0 || !ctx.current_tool_id.is_empty() {
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

        _ => {}
    }

    Ok(out)
}

fn text_part_type(message_role: &str) -> &'static str {
    if message_role == role::ASSISTANT {
        "output_text"
    } else {
        "input_text"
    }
}

/// Render Claude content blocks as Responses content parts.
///
/// Tool traffic becomes bracketed text because Responses has no
/// content-level tool slots on the request path.
fn claude_blocks_to_parts(blocks: &[Value], message_role: &str) -> Vec<Value> {
    let part_type = text_part_type(message_role);
    let mut parts = Vec::new();

    for block in blocks {
        match block.get("type").and_then(Value::as_str) {
            Some(content::TEXT) => {
                parts.push(json!({
                    "type": part_type,
                    "text": block.get("text").cloned().unwrap_or_default(),
                }));
            }
            Some(content::THINKING) => continue,
            Some(content::TOOL_USE) => {
                let input = block
                    .get("input")
                    .cloned()
                    .unwrap_or_else(|| Value::Object(Map::new()));
                let name = block.get("name").and_then(Value::as_str).unwrap_or_default();
                parts.push(json!({
                    "type": "output_text",
                    "text": format!("[Tool Call: {}({})]", name, input),
                }));
            }
            Some(content::TOOL_RESULT) => {
                parts.push(json!({
                    "type": "input_text",
                    "text": format!("[Tool Result: {}]", extract_tool_result_content(block.get("content"))),
                }));
            }
            _ => {}
        }
    }
    parts
}

/// Convert a Responses `input` value into Claude messages, grouping
/// consecutive `function_call` items under one assistant message and
/// consecutive `function_call_output` items under one user message.
fn responses_input_to_claude(input: &Value) -> Value {
    let mut messages: Vec<Value> = Vec::new();

    match input {
        Value::String(s) => {
            messages.push(json!({"role": role::USER, "content": s}));
        }
        Value::Array(items) => {
            let mut pending_tool_uses: Vec<Value> = Vec::new();
            let mut pending_tool_results: Vec<Value> = Vec::new();

            let flush_uses = |pending: &mut Vec<Value>, messages: &mut Vec<Value>| {
                if !pending.is_empty() {
                    messages.push(json!({
                        "role": role::ASSISTANT,
                        "content": Value::Array(std::mem::take(pending)),
                    }));
                }
            };
            let flush_results = |pending: &mut Vec<Value>, messages: &mut Vec<Value>| {
                if !pending.is_empty() {
                    messages.push(json!({
                        "role": role::USER,
                        "content": Value::Array(std::mem::take(pending)),
                    }));
                }
            };

            for item in items {
                match item.get("type").and_then(Value::as_str) {
                    Some("message") => {
                        flush_uses(&mut pending_tool_uses, &mut messages);
                        flush_results(&mut pending_tool_results, &mut messages);

                        let item_role =
                            item.get("role").and_then(Value::as_str).unwrap_or_default();
                        let msg_content = responses_content_to_claude(item.get("content"));
                        messages.push(json!({"role": item_role, "content": msg_content}));
                    }
                    Some("function_call") => {
                        let call_id =
                            item.get("call_id").and_then(Value::as_str).unwrap_or_default();
                        let name = item.get("name").and_then(Value::as_str).unwrap_or_default();
                        let input_value: Value = item
                            .get("arguments")
                            .and_then(Value::as_str)
                            .and_then(|s| serde_json::from_str(s).ok())
                            .unwrap_or_else(|| json!({}));
                        pending_tool_uses.push(json!({
                            "type": content::TOOL_USE,
                            "id": call_id,
                            "name": name,
                            "input": input_value,
                        }));
                    }
                    Some("function_call_output") => {
                        flush_uses(&mut pending_tool_uses, &mut messages);
                        let call_id =
                            item.get("call_id").and_then(Value::as_str).unwrap_or_default();
                        let output =
                            item.get("output").and_then(Value::as_str).unwrap_or_default();
                        pending_tool_results.push(json!({
                            "type": content::TOOL_RESULT,
                            "tool_use_id": call_id,
                            "content": output,
                        }));
                    }
                    _ => {}
                }
            }

            flush_uses(&mut pending_tool_uses, &mut messages);
            flush_results(&mut pending_tool_results, &mut messages);
        }
        _ => {}
    }

    Value::Array(messages)
}

/// Convert Responses message content parts into Claude message content.
/// A single text part collapses to a bare string.
fn responses_content_to_claude(content_value: Option<&Value>) -> Value {
    let Some(Value::Array(parts)) = content_value else {
        return content_value.cloned().unwrap_or(Value::String(String::new()));
    };

    let mut blocks: Vec<Value> = Vec::new();
    for part in parts {
        if matches!(
            part.get("type").and_then(Value::as_str),
            Some("input_text") | Some("output_text")
        ) {
            blocks.push(json!({
                "type": content::TEXT,
                "text": part.get("text").cloned().unwrap_or_default(),
            }));
        }
    }

    if blocks.len() == 1 {
        if let Some(text) = blocks[0].get("text").and_then(Value::as_str) {
            return Value::String(text.to_string());
        }
    }
    Value::Array(blocks)
}
