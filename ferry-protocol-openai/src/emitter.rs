//! Segment stream to Responses events.

use uuid::Uuid;

use ferry_core::segment::{OpenSegment, SegmentEmitter, SegmentKind, SegmentSummary};
use ferry_core::sink::{EventBuffer, EventSink};
use ferry_core::types::{FinishReason, Usage};

use crate::events::{ContentPartPayload, OutputItem, ResponseEnvelope, ResponsesEvent};

/// Renders the shared segment stream as `response.*` events.
///
/// Holds only per-response counters plus the closed-segment list handed in at
/// completion; content is never re-buffered here.
pub struct ResponsesEmitter<S: EventSink> {
    sink: S,
    seq: u64,
    response_id: String,
    model: String,
    created_at: i64,
    output_index: usize,
}

impl<S: EventSink> ResponsesEmitter<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            seq: 0,
            response_id: format!("resp_{}", Uuid::new_v4().simple()),
            model: String::new(),
            created_at: 0,
            output_index: 0,
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

    fn emit(&mut self, event: ResponsesEvent) {
        match serde_json::to_vec(&event) {
            Ok(bytes) => self.sink.accept(bytes),
            Err(error) => {
                tracing::warn!(%error, "dropping unserializable responses event");
            }
        }
    }

    fn envelope(&self, status: &str, output: Vec<OutputItem>, usage: Option<&Usage>) -> ResponseEnvelope {
        ResponseEnvelope {
            id: self.response_id.clone(),
            object: "response".to_string(),
            created_at: self.created_at,
            status: status.to_string(),
            model: self.model.clone(),
            output,
            usage: usage.copied().map(Into::into),
        }
    }
}

/// A closed segment as a completed output item.
fn completed_item(summary: &SegmentSummary) -> OutputItem {
    match summary.kind {
        SegmentKind::Text => OutputItem::Message {
            id: summary.item_id.clone(),
            status: "completed".to_string(),
            role: "assistant".to_string(),
            content: vec![ContentPartPayload::OutputText {
                text: summary.content.clone(),
            }],
        },
        SegmentKind::Reasoning => OutputItem::Reasoning {
            id: summary.item_id.clone(),
            status: "completed".to_string(),
            summary: vec![ContentPartPayload::SummaryText {
                text: summary.content.clone(),
            }],
        },
        SegmentKind::ToolCall => OutputItem::FunctionCall {
            id: summary.item_id.clone(),
            status: "completed".to_string(),
            call_id: summary.call_id.clone().unwrap_or_default(),
            name: summary.tool_name.clone().unwrap_or_default(),
            arguments: summary.content.clone(),
        },
    }
}

fn in_progress_item(segment: &OpenSegment) -> OutputItem {
    match segment.kind {
        SegmentKind::Text => OutputItem::Message {
            id: segment.item_id.clone(),
            status: "in_progress".to_string(),
            role: "assistant".to_string(),
            content: Vec::new(),
        },
        SegmentKind::Reasoning => OutputItem::Reasoning {
            id: segment.item_id.clone(),
            status: "in_progress".to_string(),
            summary: Vec::new(),
        },
        SegmentKind::ToolCall => OutputItem::FunctionCall {
            id: segment.item_id.clone(),
            status: "in_progress".to_string(),
            call_id: segment.call_id.clone().unwrap_or_default(),
            name: segment.tool_name.clone().unwrap_or_default(),
            arguments: String::new(),
        },
    }
}

impl<S: EventSink> SegmentEmitter for ResponsesEmitter<S> {
    fn response_start(&mut self, model: &str) {
        self.model = model.to_string();
        self.created_at = chrono::Utc::now().timestamp();
        let sequence_number = self.next_seq();
        let response = self.envelope("in_progress", Vec::new(), None);
        self.emit(ResponsesEvent::Created {
            sequence_number,
            response,
        });
    }

    fn segment_open(&mut self, segment: &OpenSegment) {
        let sequence_number = self.next_seq();
        self.emit(ResponsesEvent::OutputItemAdded {
            sequence_number,
            output_index: self.output_index,
            item: in_progress_item(segment),
        });
        if segment.kind == SegmentKind::Text {
            let sequence_number = self.next_seq();
            self.emit(ResponsesEvent::ContentPartAdded {
                sequence_number,
                item_id: segment.item_id.clone(),
                output_index: self.output_index,
                content_index: 0,
                part: ContentPartPayload::OutputText {
                    text: String::new(),
                },
            });
        }
    }

    fn segment_delta(&mut self, segment: &OpenSegment, delta: &str) {
        let sequence_number = self.next_seq();
        let event = match segment.kind {
            SegmentKind::Text => ResponsesEvent::OutputTextDelta {
                sequence_number,
                item_id: segment.item_id.clone(),
                output_index: self.output_index,
                content_index: 0,
                delta: delta.to_string(),
            },
            SegmentKind::Reasoning => ResponsesEvent::ReasoningSummaryTextDelta {
                sequence_number,
                item_id: segment.item_id.clone(),
                output_index: self.output_index,
                delta: delta.to_string(),
            },
            SegmentKind::ToolCall => ResponsesEvent::FunctionCallArgumentsDelta {
                sequence_number,
                item_id: segment.item_id.clone(),
                output_index: self.output_index,
                delta: delta.to_string(),
            },
        };
        self.emit(event);
    }

    fn segment_close(&mut self, segment: &OpenSegment) {
        match segment.kind {
            SegmentKind::Text => {
                let sequence_number = self.next_seq();
                self.emit(ResponsesEvent::OutputTextDone {
                    sequence_number,
                    item_id: segment.item_id.clone(),
                    output_index: self.output_index,
                    content_index: 0,
                    text: segment.content.clone(),
                });
                let sequence_number = self.next_seq();
                self.emit(ResponsesEvent::ContentPartDone {
                    sequence_number,
                    item_id: segment.item_id.clone(),
                    output_index: self.output_index,
                    content_index: 0,
                    part: ContentPartPayload::OutputText {
                        text: segment.content.clone(),
                    },
                });
            }
            SegmentKind::Reasoning => {
                let sequence_number = self.next_seq();
                self.emit(ResponsesEvent::ReasoningSummaryTextDone {
                    sequence_number,
                    item_id: segment.item_id.clone(),
                    output_index: self.output_index,
                    text: segment.content.clone(),
                });
            }
            SegmentKind::ToolCall => {
                let sequence_number = self.next_seq();
                self.emit(ResponsesEvent::FunctionCallArgumentsDone {
                    sequence_number,
                    item_id: segment.item_id.clone(),
                    output_index: self.output_index,
                    arguments: segment.content.clone(),
                });
            }
        }

        let sequence_number = self.next_seq();
        let summary = SegmentSummary {
            kind: segment.kind,
            item_id: segment.item_id.clone(),
            content: segment.content.clone(),
            call_id: segment.call_id.clone(),
            tool_name: segment.tool_name.clone(),
        };
        self.emit(ResponsesEvent::OutputItemDone {
            sequence_number,
            output_index: self.output_index,
            item: completed_item(&summary),
        });
        self.output_index += 1;
    }

    fn response_done(
        &mut self,
        _reason: &FinishReason,
        segments: &[SegmentSummary],
        usage: Option<&Usage>,
    ) {
        let output: Vec<OutputItem> = segments.iter().map(completed_item).collect();
        let sequence_number = self.next_seq();
        let response = self.envelope("completed", output, usage);
        self.emit(ResponsesEvent::Completed {
            sequence_number,
            response,
        });
    }

    fn response_error(&mut self, message: &str) {
        let sequence_number = self.next_seq();
        self.emit(ResponsesEvent::Error {
            sequence_number,
            message: message.to_string(),
        });
    }
}

impl<S: EventSink + EventBuffer> EventBuffer for ResponsesEmitter<S> {
    fn drain_events(&mut self) -> Vec<Vec<u8>> {
        self.sink.drain_events()
    }
}
