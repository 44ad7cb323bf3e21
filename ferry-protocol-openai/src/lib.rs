//! OpenAI Responses wire dialect.
//!
//! Two halves: [`requests`] adapts inbound Responses-API requests into the
//! unified [`ferry_core::ChatRequest`], and [`emitter`] renders the shared
//! segment stream as `response.*` server-sent events.
#![deny(unsafe_code)]

pub mod emitter;
pub mod events;
pub mod requests;

pub use emitter::ResponsesEmitter;
pub use events::{ContentPartPayload, OutputItem, ResponseEnvelope, ResponsesEvent};
pub use requests::ResponsesRequest;
