//! Bridge configuration.
//!
//! The surrounding application owns persistence and the settings surface; the
//! bridge only reads an immutable snapshot per request through
//! [`ConfigProvider`].

use serde::{Deserialize, Serialize};

/// How reasoning content is represented in the outbound stream.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ThinkStyle {
    /// Reasoning flows as its own segment kind; no text mutation.
    #[default]
    SeparateChannel,
    /// Reasoning is folded into the answer text inside a markdown fence.
    CodeSnippet,
    /// Reasoning is folded into the answer text between `<think>` tags.
    EotDelimited,
}

impl ThinkStyle {
    /// True when reasoning is re-expressed inside the answer-text channel.
    pub fn is_inline(self) -> bool {
        !matches!(self, Self::SeparateChannel)
    }
}

/// How tool calls travel between the bridge and the backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStyle {
    /// The backend accepts and emits structured tool calls.
    #[default]
    Structured,
    /// The backend only understands tool use as inline tagged text; tool
    /// declarations are rendered into the prompt and calls are recovered from
    /// the answer stream.
    InlineTag,
}

/// Forced response language appended to the final user turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResponseLanguage {
    #[default]
    FollowInput,
    English,
    SimplifiedChinese,
    TraditionalChinese,
    Japanese,
    Korean,
}

impl ResponseLanguage {
    /// The instruction to append, if any.
    pub fn instruction(self) -> Option<&'static str> {
        match self {
            Self::FollowInput => None,
            Self::English => Some("\n\nPlease respond in English."),
            Self::SimplifiedChinese => Some("\n\n请使用简体中文回复。"),
            Self::TraditionalChinese => Some("\n\n請使用繁體中文回覆。"),
            Self::Japanese => Some("\n\n日本語で回答してください。"),
            Self::Korean => Some("\n\n한국어로 답변해 주세요."),
        }
    }
}

/// Immutable per-request configuration snapshot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct BridgeConfig {
    pub think_style: ThinkStyle,
    pub tool_call_style: ToolCallStyle,
    pub response_language: ResponseLanguage,
}

/// Read-only view over the active configuration and model selection.
pub trait ConfigProvider: Send + Sync {
    fn snapshot(&self) -> BridgeConfig;
    /// Unified model name placed into outgoing requests when the inbound
    /// request does not carry one.
    fn default_model(&self) -> String;
}

/// Fixed configuration, mainly for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticConfig {
    pub config: BridgeConfig,
    pub model: String,
}

impl ConfigProvider for StaticConfig {
    fn snapshot(&self) -> BridgeConfig {
        self.config
    }

    fn default_model(&self) -> String {
        self.model.clone()
    }
}
