//! Messages-API request adaptation.
//!
//! Inbound Messages requests carry role/content-block conversations. Tool
//! results arrive as `tool_result` blocks referencing a `tool_use` id from an
//! earlier assistant turn, so adaptation runs an indexing pass first to
//! recover the tool name for each result.

use std::collections::HashMap;

use serde::Deserialize;

use ferry_core::config::{BridgeConfig, ToolCallStyle};
use ferry_core::error::BridgeError;
use ferry_core::prompts;
use ferry_core::types::{ChatMessage, ChatRequest, Role, ToolCallRequest, ToolSpec};

/// An inbound Messages-API request.
#[derive(Debug, Clone, Deserialize)]
pub struct MessagesRequest {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub system: Option<SystemPayload>,
    pub messages: Vec<InboundMessage>,
    #[serde(default)]
    pub tools: Option<Vec<RequestTool>>,
    #[serde(default)]
    pub stream: Option<bool>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub top_p: Option<f32>,
}

/// `system` accepts a bare string or a block list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SystemPayload {
    Text(String),
    Blocks(Vec<SystemBlock>),
}

impl SystemPayload {
    fn flatten(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Blocks(blocks) => blocks
                .iter()
                .map(|b| b.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemBlock {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    pub role: String,
    pub content: MessageContent,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// One content block of an inbound message. Unknown block types deserialize
/// into `Other` and are skipped.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Thinking {
        #[serde(default)]
        thinking: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        #[serde(default)]
        content: Option<ToolResultContent>,
        #[serde(default)]
        is_error: Option<bool>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ToolResultContent {
    Text(String),
    Blocks(Vec<ToolResultBlock>),
}

impl ToolResultContent {
    fn flatten(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Blocks(blocks) => blocks
                .iter()
                .filter_map(|b| b.text.as_deref())
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolResultBlock {
    #[serde(default)]
    pub text: Option<String>,
}

/// Anthropic tool declaration: `input_schema` instead of `parameters`.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestTool {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub input_schema: Option<serde_json::Value>,
}

impl MessagesRequest {
    /// Normalize into the unified request under the given bridge
    /// configuration.
    pub fn to_chat_request(
        &self,
        config: &BridgeConfig,
        default_model: &str,
    ) -> Result<ChatRequest, BridgeError> {
        let mut messages: Vec<ChatMessage> = Vec::new();
        if let Some(system) = &self.system {
            let text = system.flatten();
            if !text.is_empty() {
                messages.push(ChatMessage::system(text));
            }
        }

        // Indexing pass: tool_use id to tool name, for pairing results that
        // arrive in later user turns.
        let names = self.index_tool_names();

        for inbound in &self.messages {
            match inbound.role.as_str() {
                "assistant" => adapt_assistant(inbound, &mut messages),
                "user" => adapt_user(inbound, &names, &mut messages)?,
                other => {
                    return Err(BridgeError::InvalidRequest(format!(
                        "unsupported message role: {other}"
                    )));
                }
            }
        }

        let mut tools = self.adapt_tools();

        if config.tool_call_style == ToolCallStyle::InlineTag {
            prompts::lower_tool_traffic(&mut messages);
            if let Some(declared) = tools.take() {
                if !declared.is_empty() {
                    let block = prompts::tool_instructions(&declared);
                    messages.insert(0, ChatMessage::system(block));
                }
            }
        }

        if let Some(instruction) = config.response_language.instruction() {
            if let Some(last_user) = messages.iter_mut().rev().find(|m| m.is_user_turn()) {
                last_user.append_text(instruction);
            }
        }

        Ok(ChatRequest {
            model: self
                .model
                .clone()
                .unwrap_or_else(|| default_model.to_string()),
            messages,
            tools,
            stream: self.stream.unwrap_or(true),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
        })
    }

    fn index_tool_names(&self) -> HashMap<&str, &str> {
        self.messages
            .iter()
            .filter_map(|m| match &m.content {
                MessageContent::Blocks(blocks) => Some(blocks),
                MessageContent::Text(_) => None,
            })
            .flatten()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { id, name, .. } => Some((id.as_str(), name.as_str())),
                _ => None,
            })
            .collect()
    }

    fn adapt_tools(&self) -> Option<Vec<ToolSpec>> {
        let declared = self.tools.as_ref()?;
        let tools: Vec<ToolSpec> = declared
            .iter()
            .map(|t| ToolSpec {
                name: t.name.clone(),
                description: t.description.clone(),
                parameters: t
                    .input_schema
                    .clone()
                    .unwrap_or_else(|| serde_json::json!({"type": "object"})),
            })
            .collect();
        (!tools.is_empty()).then_some(tools)
    }
}

fn adapt_assistant(inbound: &InboundMessage, messages: &mut Vec<ChatMessage>) {
    match &inbound.content {
        MessageContent::Text(text) => messages.push(ChatMessage::assistant(text.clone())),
        MessageContent::Blocks(blocks) => {
            let mut text = String::new();
            let mut calls: Vec<ToolCallRequest> = Vec::new();
            for block in blocks {
                match block {
                    ContentBlock::Text { text: t } => text.push_str(t),
                    ContentBlock::ToolUse { id, name, input } => calls.push(ToolCallRequest {
                        id: id.clone(),
                        name: name.clone(),
                        arguments: input.to_string(),
                    }),
                    // Replayed thinking is not sent back to the backend.
                    ContentBlock::Thinking { .. } => {}
                    ContentBlock::ToolResult { .. } | ContentBlock::Other => {}
                }
            }
            if !text.is_empty() {
                messages.push(ChatMessage::assistant(text));
            }
            if !calls.is_empty() {
                messages.push(ChatMessage::tool_calls(calls));
            }
        }
    }
}

fn adapt_user(
    inbound: &InboundMessage,
    names: &HashMap<&str, &str>,
    messages: &mut Vec<ChatMessage>,
) -> Result<(), BridgeError> {
    match &inbound.content {
        MessageContent::Text(text) => messages.push(ChatMessage::user(text.clone())),
        MessageContent::Blocks(blocks) => {
            let mut text = String::new();
            for block in blocks {
                match block {
                    ContentBlock::Text { text: t } => text.push_str(t),
                    ContentBlock::ToolResult {
                        tool_use_id,
                        content,
                        is_error,
                    } => {
                        let tool_name =
                            names.get(tool_use_id.as_str()).copied().ok_or_else(|| {
                                BridgeError::InvalidRequest(format!(
                                    "tool_result references unknown tool_use id {tool_use_id}"
                                ))
                            })?;
                        let mut result = content
                            .as_ref()
                            .map(ToolResultContent::flatten)
                            .unwrap_or_default();
                        if is_error == &Some(true) {
                            result = format!("Error: {result}");
                        }
                        messages.push(ChatMessage::tool_result(
                            tool_use_id.clone(),
                            tool_name,
                            result,
                        ));
                    }
                    ContentBlock::Thinking { .. }
                    | ContentBlock::ToolUse { .. }
                    | ContentBlock::Other => {}
                }
            }
            if !text.is_empty() {
                messages.push(ChatMessage::Text {
                    role: Role::User,
                    text,
                });
            }
        }
    }
    Ok(())
}
