//! Constants for API role, content, and event types
//!
//! String constants used throughout the transformers for message roles,
//! content types, stop reasons, event names, and delta types.

/// Message role constants
pub mod role {
    pub const USER: &str = "user";
    pub const ASSISTANT: &str = "assistant";
    pub const SYSTEM: &str = "system";
    pub const TOOL: &str = "tool";
}

/// Content block type constants
pub mod content {
    pub const TEXT: &str = "text";
    pub const THINKING: &str = "thinking";
    pub const IMAGE: &str = "image";
    pub const TOOL_USE: &str = "tool_use";
    pub const TOOL_RESULT: &str = "tool_result";
}

/// Tool type constants
pub mod tool {
    pub const FUNCTION: &str = "function";
    pub const CUSTOM: &str = "custom";
}

/// Claude stop reason constants
pub mod stop {
    pub const END_TURN: &str = "end_turn";
    pub const TOOL_USE: &str = "tool_use";
}

/// OpenAI Chat finish reason constants
pub mod finish {
    pub const STOP: &str = "stop";
    pub const TOOL_CALLS: &str = "tool_calls";
}

/// Claude server-sent event type constants
pub mod event {
    pub const MESSAGE_START: &str = "message_start";
    pub const MESSAGE_DELTA: &str = "message_delta";
    pub const MESSAGE_STOP: &str = "message_stop";
    pub const CONTENT_BLOCK_START: &str = "content_block_start";
    pub const CONTENT_BLOCK_DELTA: &str = "content_block_delta";
    pub const CONTENT_BLOCK_STOP: &str = "content_block_stop";
    pub const ERROR: &str = "error";
}

/// Claude delta type constants
pub mod delta {
    pub const TEXT: &str = "text_delta";
    pub const THINKING: &str = "thinking_delta";
    pub const INPUT_JSON: &str = "input_json_delta";
}

/// OpenAI Responses stream event type constants
pub mod responses_event {
    pub const CREATED: &str = "response.created";
    pub const OUTPUT_ITEM_ADDED: &str = "response.output_item.added";
    pub const OUTPUT_ITEM_DONE: &str = "response.output_item.done";
    pub const CONTENT_PART_ADDED: &str = "response.content_part.added";
    pub const CONTENT_PART_DONE: &str = "response.content_part.done";
    pub const OUTPUT_TEXT_DELTA: &str = "response.output_text.delta";
    pub const OUTPUT_TEXT_DONE: &str = "response.output_text.done";
    pub const FUNCTION_CALL_ARGUMENTS_DELTA: &str = "response.function_call_arguments.delta";
    pub const FUNCTION_CALL_ARGUMENTS_DONE: &str = "response.function_call_arguments.done";
    pub const COMPLETED: &str = "response.completed";
}

/// SSE stream terminator used by the OpenAI dialects
pub const SSE_DONE: &str = "[DONE]";
