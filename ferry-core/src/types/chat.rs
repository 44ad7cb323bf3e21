//! Chat request and message types.

use serde::{Deserialize, Serialize};

use super::tools::ToolSpec;

/// Message role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A unified chat message.
///
/// Modeled as a closed enum rather than a struct with optional fields so that
/// exactly one content shape exists per message by construction: plain text,
/// multi-part content, a group of assistant tool calls, or one tool result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChatMessage {
    /// Plain text with an explicit role.
    Text { role: Role, text: String },
    /// Ordered multi-part content (text and image references).
    Parts { role: Role, parts: Vec<ContentPart> },
    /// Assistant message carrying one contiguous group of tool calls.
    ToolCalls { calls: Vec<ToolCallRequest> },
    /// Result of a previously issued tool call, paired by id.
    ToolResult {
        call_id: String,
        tool_name: String,
        result: String,
    },
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self::Text {
            role: Role::System,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::Text {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::Text {
            role: Role::Assistant,
            text: text.into(),
        }
    }

    pub fn tool_calls(calls: Vec<ToolCallRequest>) -> Self {
        Self::ToolCalls { calls }
    }

    pub fn tool_result(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        result: impl Into<String>,
    ) -> Self {
        Self::ToolResult {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            result: result.into(),
        }
    }

    /// Effective conversation role of this message.
    pub fn role(&self) -> Role {
        match self {
            Self::Text { role, .. } | Self::Parts { role, .. } => *role,
            Self::ToolCalls { .. } => Role::Assistant,
            Self::ToolResult { .. } => Role::Tool,
        }
    }

    /// True for a user-authored turn (used when appending per-request
    /// instructions to the final user turn only).
    pub fn is_user_turn(&self) -> bool {
        matches!(self.role(), Role::User) && !matches!(self, Self::ToolResult { .. })
    }

    /// Append extra text to this message's content.
    ///
    /// For `Parts` messages the text lands in the last text part, or a new
    /// trailing text part if none exists. No-op for tool call/result shapes.
    pub fn append_text(&mut self, extra: &str) {
        match self {
            Self::Text { text, .. } => text.push_str(extra),
            Self::Parts { parts, .. } => {
                if let Some(ContentPart::Text { text }) = parts
                    .iter_mut()
                    .rev()
                    .find(|p| matches!(p, ContentPart::Text { .. }))
                {
                    text.push_str(extra);
                } else {
                    parts.push(ContentPart::Text {
                        text: extra.to_string(),
                    });
                }
            }
            Self::ToolCalls { .. } | Self::ToolResult { .. } => {}
        }
    }
}

/// One part of a multi-part message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { url: String },
}

/// A structured tool invocation requested by the assistant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCallRequest {
    /// Caller-visible call id, used to pair the later tool result.
    pub id: String,
    /// Function name.
    pub name: String,
    /// Argument payload as JSON text, forwarded verbatim.
    pub arguments: String,
}

/// A unified chat request.
///
/// Message order is conversation order; system messages, if present, come
/// before user/assistant turns (the request adapters enforce this).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolSpec>>,
    pub stream: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_follow_message_shape() {
        assert_eq!(ChatMessage::tool_calls(vec![]).role(), Role::Assistant);
        assert_eq!(ChatMessage::tool_result("c1", "t", "r").role(), Role::Tool);
        assert_eq!(ChatMessage::user("hi").role(), Role::User);
    }

    #[test]
    fn append_text_extends_last_text_part() {
        let mut msg = ChatMessage::Parts {
            role: Role::User,
            parts: vec![
                ContentPart::Text { text: "look".into() },
                ContentPart::ImageUrl {
                    url: "https://example/img.png".into(),
                },
            ],
        };
        msg.append_text(" closely");
        match msg {
            ChatMessage::Parts { parts, .. } => {
                assert_eq!(
                    parts[0],
                    ContentPart::Text {
                        text: "look closely".into()
                    }
                );
            }
            other => panic!("unexpected message shape: {other:?}"),
        }
    }
}
