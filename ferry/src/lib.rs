//! Streaming response protocol bridge.
//!
//! ferry sits between editor AI front ends and one unified backend. Inbound
//! requests arrive in either the OpenAI Responses dialect or the Anthropic
//! Messages dialect; both are normalized into the unified chat model, sent to
//! the backend, and the backend's delta stream is rendered back in the
//! dialect the caller spoke.
//!
//! ```no_run
//! use ferry::{Bridge, StaticConfig};
//! # use ferry_core::backend::{BackendClient, DeltaStream};
//! # use ferry_core::error::BridgeError;
//! # use ferry_core::types::ChatRequest;
//! # struct MyBackend;
//! # #[async_trait::async_trait]
//! # impl BackendClient for MyBackend {
//! #     async fn start(&self, _: ChatRequest) -> Result<DeltaStream, BridgeError> { unimplemented!() }
//! #     async fn stop(&self) {}
//! # }
//!
//! # async fn demo(raw_body: &[u8]) -> Result<(), BridgeError> {
//! let bridge = Bridge::new(MyBackend, StaticConfig::default());
//! let events = bridge.handle_responses_request(raw_body).await?;
//! // frame `events` as SSE and forward them to the caller
//! # Ok(())
//! # }
//! ```
#![deny(unsafe_code)]

mod bridge;

pub use bridge::{Bridge, OutboundStream};

pub use ferry_core::backend::{BackendClient, DeltaStream};
pub use ferry_core::config::{
    BridgeConfig, ConfigProvider, ResponseLanguage, StaticConfig, ThinkStyle, ToolCallStyle,
};
pub use ferry_core::error::BridgeError;
pub use ferry_core::types::{
    ChatMessage, ChatRequest, ContentPart, FinishReason, ResponseDelta, Role, ToolCallRequest,
    ToolSpec, Usage,
};
pub use ferry_protocol_anthropic::MessagesRequest;
pub use ferry_protocol_openai::ResponsesRequest;
