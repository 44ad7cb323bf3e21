//! Responses-API request adaptation.
//!
//! Inbound requests arrive in the editor's Responses dialect: an optional
//! `instructions` string plus an `input` that is either a bare string or a
//! list of loosely-typed items (messages, function calls, function call
//! outputs). Adaptation normalizes all of that into the unified
//! [`ChatRequest`], lowering tool traffic to tagged text when the backend has
//! no structured tool calling.

use std::collections::HashMap;

use serde::Deserialize;

use ferry_core::config::{BridgeConfig, ToolCallStyle};
use ferry_core::error::BridgeError;
use ferry_core::prompts;
use ferry_core::types::{
    ChatMessage, ChatRequest, ContentPart, Role, ToolCallRequest, ToolSpec,
};

/// An inbound Responses-API request.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponsesRequest {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    pub input: InputPayload,
    #[serde(default)]
    pub tools: Option<Vec<RequestTool>>,
    #[serde(default)]
    pub stream: Option<bool>,
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub top_p: Option<f32>,
}

/// `input` accepts a bare string as shorthand for one user message.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum InputPayload {
    Text(String),
    Items(Vec<RawInputItem>),
}

/// One loosely-typed input item. Unknown item kinds are skipped rather than
/// rejected; editors add new kinds faster than we care to model them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawInputItem {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<RawContent>,
    #[serde(default)]
    pub call_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
    #[serde(default)]
    pub output: Option<RawContent>,
}

/// Message content: a bare string or a part list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawContent {
    Text(String),
    Parts(Vec<RawPart>),
}

impl RawContent {
    fn flatten_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPart {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Flat Responses-style tool declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestTool {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Option<serde_json::Value>,
}

impl ResponsesRequest {
    /// Normalize into the unified request under the given bridge
    /// configuration.
    pub fn to_chat_request(
        &self,
        config: &BridgeConfig,
        default_model: &str,
    ) -> Result<ChatRequest, BridgeError> {
        let mut messages: Vec<ChatMessage> = Vec::new();
        if let Some(instructions) = self.instructions.as_deref() {
            if !instructions.is_empty() {
                messages.push(ChatMessage::system(instructions));
            }
        }

        match &self.input {
            InputPayload::Text(text) => messages.push(ChatMessage::user(text.clone())),
            InputPayload::Items(items) => {
                self.adapt_items(items, &mut messages)?;
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
            max_tokens: self.max_output_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
        })
    }

    fn adapt_items(
        &self,
        items: &[RawInputItem],
        messages: &mut Vec<ChatMessage>,
    ) -> Result<(), BridgeError> {
        // First pass: call ids to tool names, for pairing outputs that arrive
        // in later items.
        let names: HashMap<&str, &str> = items
            .iter()
            .filter(|item| item.kind.as_deref() == Some("function_call"))
            .filter_map(|item| {
                Some((item.call_id.as_deref()?, item.name.as_deref()?))
            })
            .collect();

        // System items join the leading system block regardless of where they
        // appear in the item stream. Conversation turns keep their order.
        let mut turns: Vec<ChatMessage> = Vec::new();
        let mut pending_calls: Vec<ToolCallRequest> = Vec::new();
        for item in items {
            let kind = item.kind.as_deref().unwrap_or("message");
            if kind != "function_call" && !pending_calls.is_empty() {
                turns.push(ChatMessage::tool_calls(std::mem::take(&mut pending_calls)));
            }

            match kind {
                "message" => {
                    let role = item.role.as_deref().unwrap_or("user");
                    let content = item.content.as_ref();
                    match role {
                        "system" | "developer" => {
                            let text = content.map(RawContent::flatten_text).unwrap_or_default();
                            messages.push(ChatMessage::system(text));
                        }
                        "assistant" => {
                            let text = content.map(RawContent::flatten_text).unwrap_or_default();
                            turns.push(ChatMessage::assistant(text));
                        }
                        _ => turns.push(user_message(content)),
                    }
                }
                "function_call" => {
                    let name = item.name.clone().ok_or_else(|| {
                        BridgeError::InvalidRequest("function_call item without name".to_string())
                    })?;
                    pending_calls.push(ToolCallRequest {
                        id: item.call_id.clone().unwrap_or_default(),
                        name,
                        arguments: item.arguments.clone().unwrap_or_else(|| "{}".to_string()),
                    });
                }
                "function_call_output" => {
                    let call_id = item.call_id.clone().ok_or_else(|| {
                        BridgeError::InvalidRequest(
                            "function_call_output item without call_id".to_string(),
                        )
                    })?;
                    let tool_name = names.get(call_id.as_str()).copied().ok_or_else(|| {
                        BridgeError::InvalidRequest(format!(
                            "function_call_output references unknown call_id {call_id}"
                        ))
                    })?;
                    let result = item
                        .output
                        .as_ref()
                        .map(RawContent::flatten_text)
                        .unwrap_or_default();
                    turns.push(ChatMessage::tool_result(call_id, tool_name, result));
                }
                "reasoning" => {
                    // Replayed reasoning items carry no conversation content.
                }
                other => {
                    tracing::debug!(kind = other, "skipping unrecognized input item");
                }
            }
        }
        if !pending_calls.is_empty() {
            turns.push(ChatMessage::tool_calls(pending_calls));
        }
        messages.append(&mut turns);
        Ok(())
    }

    fn adapt_tools(&self) -> Option<Vec<ToolSpec>> {
        let declared = self.tools.as_ref()?;
        let tools: Vec<ToolSpec> = declared
            .iter()
            .filter(|t| t.kind.as_deref().unwrap_or("function") == "function")
            .filter_map(|t| {
                let name = t.name.clone()?;
                Some(ToolSpec {
                    name,
                    description: t.description.clone(),
                    parameters: t
                        .parameters
                        .clone()
                        .unwrap_or_else(|| serde_json::json!({"type": "object"})),
                })
            })
            .collect();
        (!tools.is_empty()).then_some(tools)
    }
}

fn user_message(content: Option<&RawContent>) -> ChatMessage {
    match content {
        Some(RawContent::Parts(parts)) if parts.iter().any(|p| p.kind.contains("image")) => {
            let converted: Vec<ContentPart> = parts
                .iter()
                .filter_map(|p| {
                    if p.kind.contains("image") {
                        p.image_url.clone().map(|url| ContentPart::ImageUrl { url })
                    } else {
                        p.text.clone().map(|text| ContentPart::Text { text })
                    }
                })
                .collect();
            ChatMessage::Parts {
                role: Role::User,
                parts: converted,
            }
        }
        other => ChatMessage::user(other.map(RawContent::flatten_text).unwrap_or_default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::config::ResponseLanguage;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> ResponsesRequest {
        serde_json::from_value(value).expect("valid request")
    }

    #[test]
    fn bare_string_input_is_one_user_turn() {
        let req = parse(json!({"input": "hello"}));
        let chat = req
            .to_chat_request(&BridgeConfig::default(), "unified-1")
            .unwrap();
        assert_eq!(chat.model, "unified-1");
        assert!(chat.stream);
        assert_eq!(chat.messages, vec![ChatMessage::user("hello")]);
    }

    #[test]
    fn instructions_become_a_leading_system_turn() {
        let req = parse(json!({
            "model": "gpt-x",
            "instructions": "be terse",
            "input": [{"role": "user", "content": "hi"}]
        }));
        let chat = req
            .to_chat_request(&BridgeConfig::default(), "unified-1")
            .unwrap();
        assert_eq!(chat.model, "gpt-x");
        assert_eq!(chat.messages[0], ChatMessage::system("be terse"));
        assert_eq!(chat.messages[1], ChatMessage::user("hi"));
    }

    #[test]
    fn developer_role_maps_to_system() {
        let req = parse(json!({
            "input": [
                {"role": "developer", "content": "rules here"},
                {"role": "user", "content": "q"}
            ]
        }));
        let chat = req
            .to_chat_request(&BridgeConfig::default(), "m")
            .unwrap();
        assert_eq!(chat.messages[0], ChatMessage::system("rules here"));
    }

    #[test]
    fn content_part_lists_are_flattened() {
        let req = parse(json!({
            "input": [{
                "role": "user",
                "content": [
                    {"type": "input_text", "text": "see "},
                    {"type": "input_text", "text": "this"}
                ]
            }]
        }));
        let chat = req
            .to_chat_request(&BridgeConfig::default(), "m")
            .unwrap();
        assert_eq!(chat.messages[0], ChatMessage::user("see this"));
    }

    #[test]
    fn image_parts_are_preserved() {
        let req = parse(json!({
            "input": [{
                "role": "user",
                "content": [
                    {"type": "input_text", "text": "look"},
                    {"type": "input_image", "image_url": "https://x/img.png"}
                ]
            }]
        }));
        let chat = req
            .to_chat_request(&BridgeConfig::default(), "m")
            .unwrap();
        match &chat.messages[0] {
            ChatMessage::Parts { parts, .. } => {
                assert_eq!(parts.len(), 2);
                assert!(matches!(&parts[1], ContentPart::ImageUrl { url } if url == "https://x/img.png"));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn contiguous_function_calls_group_into_one_turn() {
        let req = parse(json!({
            "input": [
                {"role": "user", "content": "go"},
                {"type": "function_call", "call_id": "c1", "name": "a", "arguments": "{}"},
                {"type": "function_call", "call_id": "c2", "name": "b", "arguments": "{}"},
                {"type": "function_call_output", "call_id": "c1", "output": "ra"},
                {"type": "function_call_output", "call_id": "c2", "output": "rb"}
            ]
        }));
        let chat = req
            .to_chat_request(&BridgeConfig::default(), "m")
            .unwrap();
        assert_eq!(chat.messages.len(), 4);
        match &chat.messages[1] {
            ChatMessage::ToolCalls { calls } => {
                assert_eq!(calls.len(), 2);
                assert_eq!(calls[0].id, "c1");
                assert_eq!(calls[1].name, "b");
            }
            other => panic!("unexpected message: {other:?}"),
        }
        // Outputs pair by call id and recover the tool name.
        assert_eq!(
            chat.messages[2],
            ChatMessage::tool_result("c1", "a", "ra")
        );
        assert_eq!(
            chat.messages[3],
            ChatMessage::tool_result("c2", "b", "rb")
        );
    }

    #[test]
    fn inline_tag_mode_lowers_tools_to_text() {
        let config = BridgeConfig {
            tool_call_style: ToolCallStyle::InlineTag,
            ..Default::default()
        };
        let req = parse(json!({
            "input": [
                {"role": "user", "content": "go"},
                {"type": "function_call", "call_id": "c1", "name": "grep", "arguments": "{\"p\":1}"},
                {"type": "function_call_output", "call_id": "c1", "output": "found"}
            ],
            "tools": [{"type": "function", "name": "grep", "parameters": {"type": "object"}}]
        }));
        let chat = req.to_chat_request(&config, "m").unwrap();

        // Tool declarations moved into a system instruction block.
        assert!(chat.tools.is_none());
        match &chat.messages[0] {
            ChatMessage::Text { role: Role::System, text } => {
                assert!(text.contains("- grep"));
            }
            other => panic!("unexpected message: {other:?}"),
        }
        // Structured turns became tagged text.
        match &chat.messages[2] {
            ChatMessage::Text { role: Role::Assistant, text } => {
                assert!(text.contains("<tool_use>"));
                assert!(text.contains("<name>grep</name>"));
            }
            other => panic!("unexpected message: {other:?}"),
        }
        match &chat.messages[3] {
            ChatMessage::Text { role: Role::User, text } => {
                assert!(text.contains("<tool_result>"));
                assert!(text.contains("<output>found</output>"));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn response_language_lands_on_the_last_user_turn() {
        let config = BridgeConfig {
            response_language: ResponseLanguage::English,
            ..Default::default()
        };
        let req = parse(json!({
            "input": [
                {"role": "user", "content": "first"},
                {"role": "assistant", "content": "mid"},
                {"role": "user", "content": "last"}
            ]
        }));
        let chat = req.to_chat_request(&config, "m").unwrap();
        assert_eq!(
            chat.messages[2],
            ChatMessage::user("last\n\nPlease respond in English.")
        );
        assert_eq!(chat.messages[0], ChatMessage::user("first"));
    }

    #[test]
    fn late_system_items_are_hoisted_before_the_conversation() {
        let req = parse(json!({
            "instructions": "be terse",
            "input": [
                {"role": "user", "content": "first"},
                {"role": "developer", "content": "mid-stream rules"},
                {"role": "user", "content": "second"}
            ]
        }));
        let chat = req
            .to_chat_request(&BridgeConfig::default(), "m")
            .unwrap();
        assert_eq!(
            chat.messages,
            vec![
                ChatMessage::system("be terse"),
                ChatMessage::system("mid-stream rules"),
                ChatMessage::user("first"),
                ChatMessage::user("second"),
            ]
        );
    }

    #[test]
    fn orphan_function_call_output_is_rejected() {
        let req = parse(json!({
            "input": [
                {"role": "user", "content": "go"},
                {"type": "function_call_output", "call_id": "ghost", "output": "r"}
            ]
        }));
        let err = req
            .to_chat_request(&BridgeConfig::default(), "m")
            .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidRequest(_)));
    }

    #[test]
    fn function_call_without_name_is_rejected() {
        let req = parse(json!({
            "input": [{"type": "function_call", "call_id": "c1", "arguments": "{}"}]
        }));
        let err = req
            .to_chat_request(&BridgeConfig::default(), "m")
            .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidRequest(_)));
    }

    #[test]
    fn unknown_item_kinds_are_skipped() {
        let req = parse(json!({
            "input": [
                {"type": "item_reference", "id": "x"},
                {"role": "user", "content": "hi"}
            ]
        }));
        let chat = req
            .to_chat_request(&BridgeConfig::default(), "m")
            .unwrap();
        assert_eq!(chat.messages, vec![ChatMessage::user("hi")]);
    }
}
