//! Incremental response fragments.
//!
//! One [`ResponseDelta`] arrives per backend callback. A stream is zero or
//! more reasoning/text/tool-call deltas followed by exactly one terminal
//! `Finish` or `Error`.

use serde::{Deserialize, Serialize};

/// One incremental fragment of backend output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseDelta {
    /// Incremental reasoning ("thinking") text.
    ReasoningChunk { text: String },
    /// Incremental answer text.
    TextChunk { text: String },
    /// A complete tool invocation. Name and arguments arrive together; no
    /// partial-argument streaming is modeled at this layer.
    ToolCall {
        call_id: String,
        name: String,
        arguments: String,
    },
    /// Terminal completion signal.
    Finish {
        reason: FinishReason,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        usage: Option<Usage>,
    },
    /// Terminal error signal.
    Error { message: String },
}

/// Why the backend stopped producing output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    FunctionCall,
    ContentFilter,
    Other(String),
}

impl FinishReason {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Stop => "stop",
            Self::Length => "length",
            Self::ToolCalls => "tool_calls",
            Self::FunctionCall => "function_call",
            Self::ContentFilter => "content_filter",
            Self::Other(s) => s,
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw {
            "stop" => Self::Stop,
            "length" => Self::Length,
            "tool_calls" => Self::ToolCalls,
            "function_call" => Self::FunctionCall,
            "content_filter" => Self::ContentFilter,
            other => Self::Other(other.to_string()),
        }
    }

    /// True when the backend reported that it called a tool.
    pub fn is_tool_use(&self) -> bool {
        matches!(self, Self::ToolCalls | Self::FunctionCall)
    }
}

/// Token usage reported by the backend, when available.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}
