//! Prompt templates for backends without structured tool calling.
//!
//! When the backend speaks the inline-tag convention, tool declarations are
//! lowered into a system instruction block, and prior structured tool calls
//! and tool results in the conversation history are rendered back into the
//! same tagged text the model was asked to produce.

use std::fmt::Write as _;

use crate::types::{ChatMessage, Role, ToolCallRequest, ToolSpec};

/// System instruction block declaring the available tools and the tag
/// convention for invoking them.
pub fn tool_instructions(tools: &[ToolSpec]) -> String {
    let mut out = String::from(
        "You have access to the following tools. To call a tool, emit a block \
         of exactly this form in your response:\n\n\
         <tool_use>\n<name>TOOL_NAME</name>\n<arguments>JSON_ARGUMENTS</arguments>\n</tool_use>\n\n\
         Emit the block on its own, with valid JSON arguments. Available tools:\n",
    );
    for tool in tools {
        let _ = write!(out, "\n- {}", tool.name);
        if let Some(desc) = &tool.description {
            let _ = write!(out, ": {desc}");
        }
        let _ = write!(out, "\n  parameters: {}", tool.parameters);
    }
    out
}

/// Render a prior assistant tool-call turn as tagged text.
pub fn tool_call_text(calls: &[ToolCallRequest]) -> String {
    let mut out = String::new();
    for call in calls {
        let _ = write!(
            out,
            "<tool_use>\n<name>{}</name>\n<arguments>{}</arguments>\n</tool_use>\n",
            call.name, call.arguments
        );
    }
    out
}

/// Render a tool result as a user-visible text turn.
pub fn tool_result_text(tool_name: &str, result: &str) -> String {
    format!("<tool_result>\n<name>{tool_name}</name>\n<output>{result}</output>\n</tool_result>")
}

/// Rewrite structured tool traffic in a conversation as tagged text turns.
///
/// Tool-call groups become assistant text, tool results become user text;
/// everything else is untouched. Used by the request adapters when the
/// backend only understands the inline-tag convention.
pub fn lower_tool_traffic(messages: &mut [ChatMessage]) {
    for message in messages.iter_mut() {
        match message {
            ChatMessage::ToolCalls { calls } => {
                let text = tool_call_text(calls);
                *message = ChatMessage::assistant(text);
            }
            ChatMessage::ToolResult {
                tool_name, result, ..
            } => {
                let text = tool_result_text(tool_name, result);
                *message = ChatMessage::Text {
                    role: Role::User,
                    text,
                };
            }
            _ => {}
        }
    }
}
