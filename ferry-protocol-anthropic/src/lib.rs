//! Anthropic Messages wire dialect.
//!
//! [`requests`] adapts inbound Messages-API requests into the unified
//! [`ferry_core::ChatRequest`]; [`emitter`] renders the shared segment
//! stream as `message_start` / `content_block_*` / `message_stop` events.
#![deny(unsafe_code)]

pub mod emitter;
pub mod events;
pub mod requests;

pub use emitter::MessagesEmitter;
pub use events::{BlockDelta, BlockStart, MessagesEvent};
pub use requests::MessagesRequest;
