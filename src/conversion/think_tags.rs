//! `<think>` tag extraction
//!
//! Some upstreams emit model reasoning inline, wrapped in literal `<think>`
//! and `</think>` markers. The buffered splitter turns a complete string
//! into alternating text/thinking blocks. The streaming scanner does the
//! same over arbitrary chunk boundaries: a chunk may end in the middle of a
//! marker, so the scanner holds the longest trailing run that could still
//! be a marker prefix and re-examines it when the next chunk arrives. No
//! content byte is lost and no marker byte is ever emitted.

use crate::conversion::context::StreamContext;
use crate::conversion::sse::build_claude_event;
use crate::core::constants::{content, delta, event};
use serde_json::{json, Value};

pub(crate) const THINK_TAG_OPEN: &str = "<think>";
pub(crate) const THINK_TAG_CLOSE: &str = "</think>";

/// Emitter invoked by the scanner with a run of text or thinking bytes.
pub(crate) type Emitter = fn(&mut StreamContext, &mut Vec<u8>, &str);

/// Split a complete string into `text` / `thinking` blocks.
///
/// An unterminated `<think>` is emitted as text (the marker itself is still
/// removed). Empty segments are suppressed.
pub(crate) fn split_think_tagged_text(text: &str) -> Vec<Value> {
    let mut blocks = Vec::new();
    let mut rest = text;
    loop {
        let Some(open_idx) = rest.find(THINK_TAG_OPEN) else {
            if !rest.is_empty() {
                blocks.push(json!({"type": content::TEXT, "text": rest}));
            }
            return blocks;
        };
        if open_idx > 0 {
            blocks.push(json!({"type": content::TEXT, "text": &rest[..open_idx]}));
        }
        rest = &rest[open_idx + THINK_TAG_OPEN.len()..];

        let Some(close_idx) = rest.find(THINK_TAG_CLOSE) else {
            if !rest.is_empty() {
                blocks.push(json!({"type": content::TEXT, "text": rest}));
            }
            return blocks;
        };
        if close_idx > 0 {
            blocks.push(json!({"type": content::THINKING, "thinking": &rest[..close_idx]}));
        }
        rest = &rest[close_idx + THINK_TAG_CLOSE.len()..];
    }
}

/// Feed one chunk of streamed text through the tag scanner.
///
/// The caller prepends any held `thinking_buffer` to the chunk before
/// calling; the scanner re-fills the buffer with a trailing partial marker
/// when one is present.
pub(crate) fn consume_think_tagged_stream(
    chunk: &str,
    ctx: &mut StreamContext,
    out: &mut Vec<u8>,
    emit_text: Emitter,
    emit_thinking: Emitter,
) {
    let mut rest = chunk;
    while !rest.is_empty() {
        if ctx.in_thinking_tag {
            let Some(close_idx) = rest.find(THINK_TAG_CLOSE) else {
                let (text, buffer) = split_trailing_partial_tag(rest, THINK_TAG_CLOSE);
                if !text.is_empty() {
                    emit_thinking(ctx, out, text);
                }
                ctx.thinking_buffer = buffer.to_string();
                return;
            };
            if close_idx > 0 {
                emit_thinking(ctx, out, &rest[..close_idx]);
            }
            ctx.in_thinking_tag = false;
            rest = &rest[close_idx + THINK_TAG_CLOSE.len()..];
        } else {
            let Some(open_idx) = rest.find(THINK_TAG_OPEN) else {
                let (text, buffer) = split_trailing_partial_tag(rest, THINK_TAG_OPEN);
                emit_text(ctx, out, text);
                ctx.thinking_buffer = buffer.to_string();
                return;
            };
            emit_text(ctx, out, &rest[..open_idx]);
            ctx.in_thinking_tag = true;
            rest = &rest[open_idx + THINK_TAG_OPEN.len()..];
        }
    }
}

/// Drain scanner state at end-of-stream.
///
/// A buffer held inside an open tag flushes as thinking; outside a tag it
/// flushes as text (it was only withheld because it might have become a
/// marker).
pub(crate) fn flush_think_tagged_stream(
    ctx: &mut StreamContext,
    out: &mut Vec<u8>,
    emit_text: Emitter,
    emit_thinking: Emitter,
) {
    if !ctx.thinking_buffer.is_empty() {
        let buffer = std::mem::take(&mut ctx.thinking_buffer);
        if ctx.in_thinking_tag {
            emit_thinking(ctx, out, &buffer);
        } else {
            emit_text(ctx, out, &buffer);
        }
    }
    ctx.in_thinking_tag = false;
    ctx.thinking_buffer.clear();
}

/// Split off the longest trailing substring of `s` that is a proper prefix
/// of `tag`. Returns `(kept, held)`.
fn split_trailing_partial_tag<'a>(s: &'a str, tag: &str) -> (&'a str, &'a str) {
    let bytes = s.as_bytes();
    let tag_bytes = tag.as_bytes();
    let max = (tag_bytes.len() - 1).min(bytes.len());
    for i in (1..=max).rev() {
        // A matching suffix starts with an ASCII byte of the tag, so the
        // split point is always a char boundary.
        if tag_bytes.starts_with(&bytes[bytes.len() - i..]) {
            return (&s[..s.len() - i], &s[s.len() - i..]);
        }
    }
    (s, "")
}

/// Emit a run of text into the current Claude text block, opening one at
/// the current content index if necessary.
pub(crate) fn emit_text(ctx: &mut StreamContext, out: &mut Vec<u8>, text: &str) {
    if text.is_empty() {
        return;
    }
    if !ctx.content_block_started {
        ctx.content_block_started = true;
        out.extend(build_claude_event(
            event::CONTENT_BLOCK_START,
            json!({
                "index": ctx.content_index,
                "content_block": {"type": content::TEXT, "text": ""},
            }),
        ));
    }
    out.extend(build_claude_event(
        event::CONTENT_BLOCK_DELTA,
        json!({
            "index": ctx.content_index,
            "delta": {"type": delta::TEXT, "text": text},
        }),
    ));
}

/// Emit a run of thinking into the current Claude thinking block, closing
/// an open text block and allocating a fresh index if necessary.
pub(crate) fn emit_thinking(ctx: &mut StreamContext, out: &mut Vec<u8>, text: &str) {
    if text.is_empty() {
        return;
    }
    if !ctx.thinking_block_started {
        if ctx.content_block_started {
            out.extend(build_claude_event(
                event::CONTENT_BLOCK_STOP,
                json!({"index": ctx.content_index}),
            ));
            ctx.content_block_started = false;
            ctx.content_index += 1;
        }
        ctx.thinking_block_started = true;
        ctx.thinking_index = ctx.content_index;
        ctx.content_index += 1;
        out.extend(build_claude_event(
            event::CONTENT_BLOCK_START,
            json!({
                "index": ctx.thinking_index,
                "content_block": {"type": content::THINKING, "thinking": ""},
            }),
        ));
    }
    out.extend(build_claude_event(
        event::CONTENT_BLOCK_DELTA,
        json!({
            "index": ctx.thinking_index,
            "delta": {"type": delta::THINKING, "thinking": text},
        }),
    ));
}

/// Text emitter that first stops a thinking block whose closing tag has
/// already been scanned. Used by the stream machines so the thinking block
/// stays open across consecutive thinking deltas and closes exactly on the
/// thinking-to-text transition.
pub(crate) fn emit_text_closing(ctx: &mut StreamContext, out: &mut Vec<u8>, text: &str) {
    if text.is_empty() {
        return;
    }
    if ctx.thinking_block_started && !ctx.content_block_started && !ctx.in_thinking_tag {
        out.extend(build_claude_event(
            event::CONTENT_BLOCK_STOP,
            json!({"index": ctx.thinking_index}),
        ));
        ctx.thinking_block_started = false;
    }
    emit_text(ctx, out, text);
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test emitters that record runs with a one-byte kind marker so the
    // scanner can be exercised without building full Claude events. Like
    // the real emitters, empty runs are suppressed.
    fn record_text(_ctx: &mut StreamContext, out: &mut Vec<u8>, text: &str) {
        if text.is_empty() {
            return;
        }
        out.push(b'\x01');
        out.extend_from_slice(text.as_bytes());
    }

    fn record_thinking(_ctx: &mut StreamContext, out: &mut Vec<u8>, text: &str) {
        if text.is_empty() {
            return;
        }
        out.push(b'\x02');
        out.extend_from_slice(text.as_bytes());
    }

    fn run_chunks(chunks: &[&str]) -> String {
        let mut ctx = StreamContext::new();
        let mut out = Vec::new();
        for chunk in chunks {
            let combined = format!("{}{}", std::mem::take(&mut ctx.thinking_buffer), chunk);
            consume_think_tagged_stream(&combined, &mut ctx, &mut out, record_text, record_thinking);
        }
        flush_think_tagged_stream(&mut ctx, &mut out, record_text, record_thinking);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_split_multi_segment() {
        let blocks = split_think_tagged_text("A<think>X</think>B<think>Y</think>C");
        let kinds: Vec<&str> = blocks
            .iter()
            .map(|b| b.get("type").unwrap().as_str().unwrap())
            .collect();
        assert_eq!(kinds, ["text", "thinking", "text", "thinking", "text"]);
        assert_eq!(blocks[0]["text"], "A");
        assert_eq!(blocks[1]["thinking"], "X");
        assert_eq!(blocks[2]["text"], "B");
        assert_eq!(blocks[3]["thinking"], "Y");
        assert_eq!(blocks[4]["text"], "C");
    }

    #[test]
    fn test_split_unterminated_open_is_text() {
        let blocks = split_think_tagged_text("<think>never closed");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0]["type"], "text");
        assert_eq!(blocks[0]["text"], "never closed");
    }

    #[test]
    fn test_split_suppresses_empty_segments() {
        let blocks = split_think_tagged_text("<think></think>after");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0]["text"], "after");
    }

    #[test]
    fn test_split_plain_text_passthrough() {
        let blocks = split_think_tagged_text("no markers here");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0]["text"], "no markers here");
    }

    #[test]
    fn test_trailing_partial_open_tag() {
        let (kept, held) = split_trailing_partial_tag("Hello <thi", THINK_TAG_OPEN);
        assert_eq!(kept, "Hello ");
        assert_eq!(held, "<thi");
    }

    #[test]
    fn test_trailing_partial_no_match() {
        let (kept, held) = split_trailing_partial_tag("Hello there", THINK_TAG_OPEN);
        assert_eq!(kept, "Hello there");
        assert_eq!(held, "");
    }

    #[test]
    fn test_trailing_partial_single_angle() {
        let (kept, held) = split_trailing_partial_tag("abc<", THINK_TAG_CLOSE);
        assert_eq!(kept, "abc");
        assert_eq!(held, "<");
    }

    #[test]
    fn test_scanner_split_marker_across_chunks() {
        let out = run_chunks(&["<thi", "nk>Thinking", "...", "</think>", "Hello!"]);
        assert!(!out.contains("<think>"));
        assert!(!out.contains("</think>"));
        assert_eq!(out, "\u{2}Thinking\u{2}...\u{1}Hello!");
    }

    #[test]
    fn test_scanner_unterminated_flushes_as_thinking() {
        let out = run_chunks(&["<think>this is some thinking content"]);
        assert_eq!(out, "\u{2}this is some thinking content");
    }

    #[test]
    fn test_scanner_held_prefix_flushes_as_text() {
        // A trailing "<thi" that never becomes a marker must not be lost.
        let out = run_chunks(&["Hello <thi"]);
        assert_eq!(out, "\u{1}Hello \u{1}<thi");
    }

    #[test]
    fn test_scanner_preserves_bytes_for_all_chunkings() {
        // P2/P3: any split of the input yields the same non-marker bytes,
        // and no emission contains marker bytes.
        let input = "A<think>X</think>B<think>Y</think>C";
        for i in 0..=input.len() {
            for j in i..=input.len() {
                if !input.is_char_boundary(i) || !input.is_char_boundary(j) {
                    continue;
                }
                let out = run_chunks(&[&input[..i], &input[i..j], &input[j..]]);
                assert!(!out.contains("<think>"), "marker leaked for split ({i},{j})");
                assert!(!out.contains("</think>"), "marker leaked for split ({i},{j})");
                let stripped: String =
                    out.chars().filter(|c| *c != '\u{1}' && *c != '\u{2}').collect();
                assert_eq!(stripped, "AXBYC", "bytes lost for split ({i},{j})");
            }
        }
    }

    #[test]
    fn test_scanner_literal_angle_bracket_text() {
        let out = run_chunks(&["a < b and a <t", "ag> too"]);
        let stripped: String = out.chars().filter(|c| *c != '\u{1}' && *c != '\u{2}').collect();
        assert_eq!(stripped, "a < b and a <tag> too");
    }
}
