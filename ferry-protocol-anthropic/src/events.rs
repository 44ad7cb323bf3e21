//! Messages-API event and payload shapes.
//!
//! Same closed-enum approach as the Responses dialect: the full outbound
//! vocabulary lives here, with a `sequence_number` carried on every event so
//! consumers can detect drops regardless of dialect.

use serde::{Deserialize, Serialize};

use ferry_core::Usage;

/// One Messages-API server-sent event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagesEvent {
    MessageStart {
        sequence_number: u64,
        message: MessageEnvelope,
    },
    ContentBlockStart {
        sequence_number: u64,
        index: usize,
        content_block: BlockStart,
    },
    ContentBlockDelta {
        sequence_number: u64,
        index: usize,
        delta: BlockDelta,
    },
    ContentBlockStop {
        sequence_number: u64,
        index: usize,
    },
    MessageDelta {
        sequence_number: u64,
        delta: MessageDeltaBody,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        usage: Option<UsageInfo>,
    },
    MessageStop {
        sequence_number: u64,
    },
    Error {
        sequence_number: u64,
        error: ErrorBody,
    },
}

impl MessagesEvent {
    pub fn sequence_number(&self) -> u64 {
        match self {
            Self::MessageStart { sequence_number, .. }
            | Self::ContentBlockStart { sequence_number, .. }
            | Self::ContentBlockDelta { sequence_number, .. }
            | Self::ContentBlockStop { sequence_number, .. }
            | Self::MessageDelta { sequence_number, .. }
            | Self::MessageStop { sequence_number }
            | Self::Error { sequence_number, .. } => *sequence_number,
        }
    }
}

/// Envelope carried by `message_start`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageEnvelope {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub role: String,
    pub model: String,
    pub content: Vec<serde_json::Value>,
    pub stop_reason: Option<String>,
    pub usage: UsageInfo,
}

/// Opening payload of a content block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockStart {
    Text {
        text: String,
    },
    Thinking {
        thinking: String,
    },
    /// Tool-use blocks always open with an empty object for `input`; the
    /// argument JSON streams afterwards as `input_json_delta`.
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
}

/// Incremental payload of a content block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockDelta {
    TextDelta { text: String },
    ThinkingDelta { thinking: String },
    InputJsonDelta { partial_json: String },
}

/// Body of `message_delta`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageDeltaBody {
    pub stop_reason: Option<String>,
    pub stop_sequence: Option<String>,
}

/// Token usage in Messages shape.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct UsageInfo {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl From<Usage> for UsageInfo {
    fn from(usage: Usage) -> Self {
        Self {
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
        }
    }
}

/// Error payload, Anthropic-style.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}
