//! Per-stream transformation state
//!
//! One `StreamContext` exists per active outbound stream. It is owned by the
//! caller, passed by mutable reference into the stream machines, and holds
//! every piece of mutable state the machines need: block open/close flags,
//! block indices, the tool-call accumulator, the think-tag scanner state,
//! and usage counters. There is no shared state across streams.

/// State record for one streaming response
#[derive(Debug, Default)]
pub struct StreamContext {
    pub(crate) message_id: String,
    pub(crate) model_name: String,

    // Emission gating
    pub(crate) message_start_sent: bool,
    pub(crate) content_block_started: bool,
    pub(crate) thinking_block_started: bool,
    pub(crate) tool_block_started: bool,
    pub(crate) finish_reason_sent: bool,

    // Block indexing. `content_index` counts every block; at most one block
    // is open at a time and each started block is stopped before the next
    // one starts.
    pub(crate) content_index: u32,
    pub(crate) thinking_index: u32,
    pub(crate) tool_index: u32,

    // Current tool-call accumulator
    pub(crate) current_tool_id: String,
    pub(crate) current_tool_name: String,
    pub(crate) tool_arguments: String,

    // <think> tag scanner state: the buffer holds a trailing byte run that
    // could still turn out to be the start of a marker.
    pub(crate) in_thinking_tag: bool,
    pub(crate) thinking_buffer: String,

    // Usage accounting
    pub(crate) input_tokens: u64,
    pub(crate) output_tokens: u64,

    // Secondary context used when a stream direction is composed through
    // the Claude dialect (Chat <-> Responses).
    pub(crate) pivot: Option<Box<StreamContext>>,
}

impl StreamContext {
    /// Create a fresh context for a new stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh context carrying the model name to report in
    /// synthesized events.
    pub fn with_model(model: &str) -> Self {
        Self {
            model_name: model.to_string(),
            ..Self::default()
        }
    }
}
