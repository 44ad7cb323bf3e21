//! ferry-core
//!
//! Core of the ferry streaming bridge: the unified chat message model, the
//! incremental response-delta model, and the shared output segment state
//! machine that both wire dialects are derived from.
//!
//! The crates `ferry-protocol-openai` and `ferry-protocol-anthropic` plug
//! into this core by implementing [`SegmentEmitter`] and by adapting their
//! inbound request shapes into [`ChatRequest`].
#![deny(unsafe_code)]

pub mod backend;
pub mod config;
pub mod error;
pub mod extractor;
pub mod pipeline;
pub mod prompts;
pub mod segment;
pub mod sink;
pub mod think;
pub mod types;

pub use backend::{BackendClient, DeltaStream};
pub use config::{BridgeConfig, ConfigProvider, ResponseLanguage, StaticConfig, ThinkStyle, ToolCallStyle};
pub use error::BridgeError;
pub use extractor::InlineToolParser;
pub use pipeline::DeltaPipeline;
pub use segment::{
    OpenSegment, SegmentEmitter, SegmentKind, SegmentSummary, Segmenter, StreamControl,
};
pub use sink::{BufferSink, EventBuffer, EventSink};
pub use think::ThinkTagger;
pub use types::{
    ChatMessage, ChatRequest, ContentPart, FinishReason, ResponseDelta, Role, ToolCallRequest,
    ToolSpec, Usage,
};
