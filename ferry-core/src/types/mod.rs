//! Unified request/response data model.
//!
//! These are the leaf types the whole bridge is built on: a dialect-agnostic
//! chat request and the incremental response fragments produced by a backend.

mod chat;
mod streaming;
mod tools;

pub use chat::{ChatMessage, ChatRequest, ContentPart, Role, ToolCallRequest};
pub use streaming::{FinishReason, ResponseDelta, Usage};
pub use tools::ToolSpec;
