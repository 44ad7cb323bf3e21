//! Backend client abstraction.
//!
//! The bridge talks to exactly one upstream model service at a time through
//! this trait. Implementations own the transport; the bridge only sees the
//! unified delta stream.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::BridgeError;
use crate::types::{ChatRequest, ResponseDelta};

/// Stream of unified response deltas from a backend.
pub type DeltaStream = Pin<Box<dyn Stream<Item = ResponseDelta> + Send>>;

/// A connection to the upstream model service.
///
/// `start` fails fast on connection problems; everything after a successful
/// return is reported in-stream as [`ResponseDelta::Error`]. `stop` asks the
/// backend to abort whatever generation is in flight, it is idempotent and
/// safe to call with nothing running.
#[async_trait]
pub trait BackendClient: Send + Sync {
    async fn start(&self, request: ChatRequest) -> Result<DeltaStream, BridgeError>;

    async fn stop(&self);
}
