//! The bridge service: request intake, backend fan-in, stream pump.

use std::pin::Pin;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use ferry_core::backend::BackendClient;
use ferry_core::config::ConfigProvider;
use ferry_core::error::BridgeError;
use ferry_core::pipeline::DeltaPipeline;
use ferry_core::segment::{SegmentEmitter, StreamControl};
use ferry_core::sink::{BufferSink, EventBuffer};
use ferry_core::types::{ChatRequest, FinishReason, ResponseDelta};
use ferry_protocol_anthropic::emitter::MessagesEmitter;
use ferry_protocol_anthropic::requests::MessagesRequest;
use ferry_protocol_openai::emitter::ResponsesEmitter;
use ferry_protocol_openai::requests::ResponsesRequest;

/// Serialized wire events, one JSON payload per item, ready for SSE framing.
pub type OutboundStream = Pin<Box<dyn Stream<Item = Vec<u8>> + Send>>;

/// The bridge itself.
///
/// One backend, one configuration source, at most one in-flight response:
/// a new request cancels whatever is still streaming (editors retry and
/// resubmit aggressively, the freshest request is the one the user sees).
pub struct Bridge<B, C> {
    backend: Arc<B>,
    config: C,
    active: Mutex<Option<CancellationToken>>,
}

impl<B, C> Bridge<B, C>
where
    B: BackendClient + 'static,
    C: ConfigProvider,
{
    pub fn new(backend: B, config: C) -> Self {
        Self {
            backend: Arc::new(backend),
            config,
            active: Mutex::new(None),
        }
    }

    /// Handle one OpenAI-Responses request body.
    ///
    /// Fails fast with a pre-stream error on an undecodable body or an
    /// unreachable backend; after a successful return all failures travel
    /// in-stream as dialect error events.
    pub async fn handle_responses_request(
        &self,
        raw: &[u8],
    ) -> Result<OutboundStream, BridgeError> {
        let request: ResponsesRequest = serde_json::from_slice(raw)
            .map_err(|e| BridgeError::InvalidRequest(e.to_string()))?;
        let config = self.config.snapshot();
        let chat = request.to_chat_request(&config, &self.config.default_model())?;
        tracing::debug!(model = %chat.model, turns = chat.messages.len(), "responses request accepted");

        let pipeline = DeltaPipeline::new(
            ResponsesEmitter::new(BufferSink::new()),
            config.think_style,
            config.tool_call_style,
            chat.model.clone(),
        );
        self.run(chat, pipeline).await
    }

    /// Handle one Anthropic-Messages request body.
    pub async fn handle_messages_request(
        &self,
        raw: &[u8],
    ) -> Result<OutboundStream, BridgeError> {
        let request: MessagesRequest = serde_json::from_slice(raw)
            .map_err(|e| BridgeError::InvalidRequest(e.to_string()))?;
        let config = self.config.snapshot();
        let chat = request.to_chat_request(&config, &self.config.default_model())?;
        tracing::debug!(model = %chat.model, turns = chat.messages.len(), "messages request accepted");

        let pipeline = DeltaPipeline::new(
            MessagesEmitter::new(BufferSink::new()),
            config.think_style,
            config.tool_call_style,
            chat.model.clone(),
        );
        self.run(chat, pipeline).await
    }

    /// Cancel whatever is currently streaming.
    pub async fn stop(&self) {
        if let Some(token) = self.active.lock().await.take() {
            token.cancel();
        }
        self.backend.stop().await;
    }

    async fn run<E>(
        &self,
        chat: ChatRequest,
        mut pipeline: DeltaPipeline<E>,
    ) -> Result<OutboundStream, BridgeError>
    where
        E: SegmentEmitter + EventBuffer + Send + 'static,
    {
        let token = self.begin().await;
        let mut deltas = self.backend.start(chat).await?;
        let backend = Arc::clone(&self.backend);

        let stream = async_stream::stream! {
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::debug!("response superseded, releasing backend");
                        backend.stop().await;
                        break;
                    }
                    delta = deltas.next() => {
                        // A backend that hangs up without a terminal delta
                        // still completes the response for the caller.
                        let delta = delta.unwrap_or(ResponseDelta::Finish {
                            reason: FinishReason::Stop,
                            usage: None,
                        });
                        let control = pipeline.consume(delta);
                        for event in pipeline.drain_events() {
                            yield event;
                        }
                        if let StreamControl::Release = control {
                            break;
                        }
                    }
                }
            }
        };
        Ok(Box::pin(stream))
    }

    /// Register a new in-flight response, cancelling the previous one.
    async fn begin(&self) -> CancellationToken {
        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            tracing::debug!("new request supersedes the active response");
            previous.cancel();
            self.backend.stop().await;
        }
        let token = CancellationToken::new();
        *active = Some(token.clone());
        token
    }
}
