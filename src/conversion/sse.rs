//! SSE framing helpers
//!
//! Frames terminate with a blank line. The `event:` line is optional, the
//! `data:` line is mandatory. Output frames produced by the transformers
//! always carry the trailing `\n\n` so the I/O layer can forward them
//! verbatim.

use serde_json::Value;

/// Parse one SSE frame into its event type and data payload.
///
/// Returns an empty event type when no `event:` line is present and an
/// empty data string when the frame carries no `data:` line (such frames
/// are dropped by the callers). Non-UTF-8 frames parse as empty.
pub(crate) fn parse_sse(frame: &[u8]) -> (&str, &str) {
    let Ok(text) = std::str::from_utf8(frame) else {
        return ("", "");
    };

    let mut event_type = "";
    let mut data = "";
    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("event:") {
            event_type = rest.trim();
        } else if let Some(rest) = line.strip_prefix("data:") {
            data = rest.strip_prefix(' ').unwrap_or(rest).trim_end();
        }
    }
    (event_type, data)
}

/// Split a byte run containing zero or more SSE frames on blank lines.
pub(crate) fn split_frames(bytes: &[u8]) -> Vec<&[u8]> {
    let mut frames = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == b'\n' && bytes[i + 1] == b'\n' {
            if i > start {
                frames.push(&bytes[start..i + 1]);
            }
            start = i + 2;
            i += 2;
        } else {
            i += 1;
        }
    }
    if start < bytes.len() {
        frames.push(&bytes[start..]);
    }
    frames
}

/// Build a Claude SSE frame: `event:` line plus a `data:` payload whose
/// `type` field repeats the event name.
pub(crate) fn build_claude_event(event_type: &str, mut payload: Value) -> Vec<u8> {
    if let Some(obj) = payload.as_object_mut() {
        obj.insert("type".to_string(), Value::String(event_type.to_string()));
    }
    format!("event: {}\ndata: {}\n\n", event_type, payload).into_bytes()
}

/// Build an OpenAI Chat streaming chunk frame.
///
/// The chunk always carries `finish_reason` explicitly (`null` until the
/// stream finishes) because consumers distinguish null from field-absent.
pub(crate) fn build_chat_chunk(
    id: &str,
    model: &str,
    text: &str,
    tool_calls: Option<Value>,
    finish_reason: Option<&str>,
) -> Vec<u8> {
    let mut delta = serde_json::Map::new();
    if !text.is_empty() {
        delta.insert("content".to_string(), Value::String(text.to_string()));
    }
    if let Some(calls) = tool_calls {
        delta.insert("tool_calls".to_string(), calls);
    }

    let chunk = serde_json::json!({
        "id": id,
        "object": "chat.completion.chunk",
        "model": model,
        "choices": [{
            "index": 0,
            "delta": Value::Object(delta),
            "finish_reason": finish_reason,
        }],
    });
    format!("data: {}\n\n", chunk).into_bytes()
}

/// The `data: [DONE]` terminator frame used by the OpenAI dialects.
pub(crate) fn done_frame() -> Vec<u8> {
    b"data: [DONE]\n\n".to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_with_event_line() {
        let (event_type, data) = parse_sse(b"event: message_delta\ndata: {\"a\":1}\n\n");
        assert_eq!(event_type, "message_delta");
        assert_eq!(data, "{\"a\":1}");
    }

    #[test]
    fn test_parse_frame_data_only() {
        let (event_type, data) = parse_sse(b"data: [DONE]\n\n");
        assert_eq!(event_type, "");
        assert_eq!(data, "[DONE]");
    }

    #[test]
    fn test_parse_frame_without_data() {
        let (event_type, data) = parse_sse(b": keep-alive\n\n");
        assert_eq!(event_type, "");
        assert_eq!(data, "");
    }

    #[test]
    fn test_split_frames() {
        let bytes = b"event: a\ndata: {}\n\ndata: [DONE]\n\n";
        let frames = split_frames(bytes);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], b"event: a\ndata: {}\n");
        assert_eq!(frames[1], b"data: [DONE]\n");
    }

    #[test]
    fn test_build_claude_event_injects_type() {
        let frame = build_claude_event("message_stop", serde_json::json!({}));
        let text = String::from_utf8(frame).unwrap();
        assert!(text.starts_with("event: message_stop\ndata: "));
        assert!(text.contains("\"type\":\"message_stop\""));
        assert!(text.ends_with("\n\n"));
    }

    #[test]
    fn test_build_chat_chunk_null_finish() {
        let frame = build_chat_chunk("chatcmpl-1", "gpt-4o", "hi", None, None);
        let text = String::from_utf8(frame).unwrap();
        assert!(text.contains("\"finish_reason\":null"));
        assert!(text.contains("\"content\":\"hi\""));
    }
}
