//! Segment stream to Messages events.

use uuid::Uuid;

use ferry_core::segment::{OpenSegment, SegmentEmitter, SegmentKind, SegmentSummary};
use ferry_core::sink::{EventBuffer, EventSink};
use ferry_core::types::{FinishReason, Usage};

use crate::events::{
    BlockDelta, BlockStart, ErrorBody, MessageDeltaBody, MessageEnvelope, MessagesEvent, UsageInfo,
};

/// Renders the shared segment stream as Messages events.
pub struct MessagesEmitter<S: EventSink> {
    sink: S,
    seq: u64,
    message_id: String,
    next_block_index: usize,
    /// Index of the currently open content block.
    open_index: usize,
    /// A tool-use block was streamed; the stop reason must say so even when
    /// the backend reports a plain stop.
    saw_tool_use: bool,
}

impl<S: EventSink> MessagesEmitter<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            seq: 0,
            message_id: format!("msg_{}", Uuid::new_v4().simple()),
            next_block_index: 0,
            open_index: 0,
            saw_tool_use: false,
        }
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.seq;
        self.seq += 1;
        seq
    }

    fn emit(&mut self, event: MessagesEvent) {
        match serde_json::to_vec(&event) {
            Ok(bytes) => self.sink.accept(bytes),
            Err(error) => {
                tracing::warn!(%error, "dropping unserializable messages event");
            }
        }
    }

    fn stop_reason(&self, reason: &FinishReason) -> &'static str {
        if self.saw_tool_use || reason.is_tool_use() {
            return "tool_use";
        }
        match reason {
            FinishReason::Stop => "end_turn",
            FinishReason::Length => "max_tokens",
            FinishReason::ContentFilter => "refusal",
            // Includes unknown backend-specific codes.
            _ => "end_turn",
        }
    }
}

impl<S: EventSink> SegmentEmitter for MessagesEmitter<S> {
    fn response_start(&mut self, model: &str) {
        let sequence_number = self.next_seq();
        self.emit(MessagesEvent::MessageStart {
            sequence_number,
            message: MessageEnvelope {
                id: self.message_id.clone(),
                kind: "message".to_string(),
                role: "assistant".to_string(),
                model: model.to_string(),
                content: Vec::new(),
                stop_reason: None,
                usage: UsageInfo::default(),
            },
        });
    }

    fn segment_open(&mut self, segment: &OpenSegment) {
        self.open_index = self.next_block_index;
        self.next_block_index += 1;

        let content_block = match segment.kind {
            SegmentKind::Text => BlockStart::Text {
                text: String::new(),
            },
            SegmentKind::Reasoning => BlockStart::Thinking {
                thinking: String::new(),
            },
            SegmentKind::ToolCall => {
                self.saw_tool_use = true;
                BlockStart::ToolUse {
                    id: segment.call_id.clone().unwrap_or_default(),
                    name: segment.tool_name.clone().unwrap_or_default(),
                    input: serde_json::json!({}),
                }
            }
        };

        let sequence_number = self.next_seq();
        self.emit(MessagesEvent::ContentBlockStart {
            sequence_number,
            index: self.open_index,
            content_block,
        });
    }

    fn segment_delta(&mut self, segment: &OpenSegment, delta: &str) {
        let delta = match segment.kind {
            SegmentKind::Text => BlockDelta::TextDelta {
                text: delta.to_string(),
            },
            SegmentKind::Reasoning => BlockDelta::ThinkingDelta {
                thinking: delta.to_string(),
            },
            SegmentKind::ToolCall => BlockDelta::InputJsonDelta {
                partial_json: delta.to_string(),
            },
        };
        let sequence_number = self.next_seq();
        self.emit(MessagesEvent::ContentBlockDelta {
            sequence_number,
            index: self.open_index,
            delta,
        });
    }

    fn segment_close(&mut self, _segment: &OpenSegment) {
        let sequence_number = self.next_seq();
        self.emit(MessagesEvent::ContentBlockStop {
            sequence_number,
            index: self.open_index,
        });
    }

    fn response_done(
        &mut self,
        reason: &FinishReason,
        _segments: &[SegmentSummary],
        usage: Option<&Usage>,
    ) {
        let stop_reason = self.stop_reason(reason).to_string();
        let sequence_number = self.next_seq();
        self.emit(MessagesEvent::MessageDelta {
            sequence_number,
            delta: MessageDeltaBody {
                stop_reason: Some(stop_reason),
                stop_sequence: None,
            },
            usage: usage.copied().map(Into::into),
        });
        let sequence_number = self.next_seq();
        self.emit(MessagesEvent::MessageStop { sequence_number });
    }

    fn response_error(&mut self, message: &str) {
        let sequence_number = self.next_seq();
        self.emit(MessagesEvent::Error {
            sequence_number,
            error: ErrorBody {
                kind: "api_error".to_string(),
                message: message.to_string(),
            },
        });
        // Clients wait for a terminal event; close the stream shape even on
        // failure.
        let sequence_number = self.next_seq();
        self.emit(MessagesEvent::MessageStop { sequence_number });
    }
}

impl<S: EventSink + EventBuffer> EventBuffer for MessagesEmitter<S> {
    fn drain_events(&mut self) -> Vec<Vec<u8>> {
        self.sink.drain_events()
    }
}
