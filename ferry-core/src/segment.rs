//! Output segment state machine.
//!
//! The shared core both wire dialects are derived from. Given the stream of
//! unified [`ResponseDelta`]s, the [`Segmenter`] tracks which kind of output
//! segment is currently open, opens and closes segments in arrival order, and
//! drives a pluggable [`SegmentEmitter`] with segment-open / segment-delta /
//! segment-close events.
//!
//! Invariants maintained here:
//! - at most one segment is open at any time;
//! - every event of segment A is emitted strictly before any event of B;
//! - a same-kind delta never closes and reopens a segment, chunks accumulate
//!   until a different kind arrives or the stream ends;
//! - a segment abandoned by a stream error gets no close event.

use uuid::Uuid;

use crate::config::ThinkStyle;
use crate::think::ThinkTagger;
use crate::types::{FinishReason, ResponseDelta, Usage};

/// Kind of a streamed output segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Reasoning,
    Text,
    ToolCall,
}

/// A currently open segment: a maximal run of same-kind content.
#[derive(Debug, Clone)]
pub struct OpenSegment {
    pub kind: SegmentKind,
    /// Generated identifier, unique per segment and never reused.
    pub item_id: String,
    /// Content accumulated so far.
    pub content: String,
    /// Call id, for tool-call segments.
    pub call_id: Option<String>,
    /// Function name, for tool-call segments.
    pub tool_name: Option<String>,
}

/// Record of a closed segment, retained for the terminal event.
#[derive(Debug, Clone)]
pub struct SegmentSummary {
    pub kind: SegmentKind,
    pub item_id: String,
    pub content: String,
    pub call_id: Option<String>,
    pub tool_name: Option<String>,
}

/// Control signal returned from [`Segmenter::consume`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamControl {
    /// Keep feeding deltas.
    Continue,
    /// The stream is over; release the backend connection.
    Release,
}

/// Receiver for segment lifecycle events; one implementation per wire
/// dialect.
///
/// Methods are infallible on purpose: a serialization failure inside an
/// emitter is a transport-level symptom, logged and dropped rather than
/// aborting the stream.
pub trait SegmentEmitter {
    /// Called exactly once before any segment event.
    fn response_start(&mut self, model: &str);
    fn segment_open(&mut self, segment: &OpenSegment);
    fn segment_delta(&mut self, segment: &OpenSegment, delta: &str);
    fn segment_close(&mut self, segment: &OpenSegment);
    /// Terminal completion: finish reason, every closed segment in order, and
    /// usage when the backend reported it.
    fn response_done(
        &mut self,
        reason: &FinishReason,
        segments: &[SegmentSummary],
        usage: Option<&Usage>,
    );
    /// Terminal error. Any open segment was abandoned without a close.
    fn response_error(&mut self, message: &str);
}

/// The segment state machine.
///
/// Owns all per-response mutable state; construct one per response and
/// discard it at stream end.
pub struct Segmenter<E: SegmentEmitter> {
    emitter: E,
    model: String,
    open: Option<OpenSegment>,
    closed: Vec<SegmentSummary>,
    think: ThinkTagger,
    started: bool,
    terminated: bool,
}

impl<E: SegmentEmitter> Segmenter<E> {
    pub fn new(emitter: E, think_style: ThinkStyle, model: impl Into<String>) -> Self {
        Self {
            emitter,
            model: model.into(),
            open: None,
            closed: Vec::new(),
            think: ThinkTagger::new(think_style),
            started: false,
            terminated: false,
        }
    }

    pub fn emitter_mut(&mut self) -> &mut E {
        &mut self.emitter
    }

    pub fn into_emitter(self) -> E {
        self.emitter
    }

    /// Feed one delta, in backend callback order. Not re-entrant; the caller
    /// must serialize delivery onto a single logical thread per request.
    pub fn consume(&mut self, delta: ResponseDelta) -> StreamControl {
        if self.terminated {
            return StreamControl::Release;
        }
        self.ensure_started();

        match delta {
            ResponseDelta::ReasoningChunk { text } => {
                if self.think.is_inline() {
                    let wrapped = self.think.wrap_chunk(&text);
                    self.append(SegmentKind::Text, &wrapped);
                } else {
                    self.append(SegmentKind::Reasoning, &text);
                }
                StreamControl::Continue
            }
            ResponseDelta::TextChunk { text } => {
                self.flush_inline_think_end();
                self.append(SegmentKind::Text, &text);
                StreamControl::Continue
            }
            ResponseDelta::ToolCall {
                call_id,
                name,
                arguments,
            } => {
                self.flush_inline_think_end();
                self.close_open();

                let segment = OpenSegment {
                    kind: SegmentKind::ToolCall,
                    item_id: new_item_id("fc"),
                    content: String::new(),
                    call_id: Some(call_id),
                    tool_name: Some(name),
                };
                self.emitter.segment_open(&segment);
                self.emitter.segment_delta(&segment, &arguments);
                let mut segment = segment;
                segment.content = arguments;
                self.emitter.segment_close(&segment);
                self.closed.push(summarize(&segment));
                StreamControl::Continue
            }
            ResponseDelta::Finish { reason, usage } => {
                self.flush_inline_think_end();
                self.close_open();
                self.emitter
                    .response_done(&reason, &self.closed, usage.as_ref());
                self.terminated = true;
                StreamControl::Release
            }
            ResponseDelta::Error { message } => {
                // Abandon any open segment: the stream is aborted, no close.
                self.open = None;
                self.emitter.response_error(&message);
                self.terminated = true;
                StreamControl::Release
            }
        }
    }

    /// True once a terminal delta has been consumed.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    fn ensure_started(&mut self) {
        if !self.started {
            self.started = true;
            let model = self.model.clone();
            self.emitter.response_start(&model);
        }
    }

    /// In inline think mode, the transition away from reasoning owes the end
    /// marker as a trailing delta of the open text segment.
    fn flush_inline_think_end(&mut self) {
        if !self.think.is_inline() {
            return;
        }
        if let Some(marker) = self.think.end_marker() {
            if self
                .open
                .as_ref()
                .is_some_and(|seg| seg.kind == SegmentKind::Text)
            {
                self.append(SegmentKind::Text, marker);
            }
        }
    }

    /// Append a chunk, closing/opening segments when the kind changes.
    fn append(&mut self, kind: SegmentKind, text: &str) {
        let same_kind = self.open.as_ref().is_some_and(|seg| seg.kind == kind);
        if !same_kind {
            self.close_open();
            let segment = OpenSegment {
                kind,
                item_id: new_item_id(match kind {
                    SegmentKind::Reasoning => "rs",
                    SegmentKind::Text => "msg",
                    SegmentKind::ToolCall => "fc",
                }),
                content: String::new(),
                call_id: None,
                tool_name: None,
            };
            self.emitter.segment_open(&segment);
            self.open = Some(segment);
        }

        if let Some(seg) = self.open.as_mut() {
            seg.content.push_str(text);
        }
        if let Some(seg) = self.open.as_ref() {
            self.emitter.segment_delta(seg, text);
        }
    }

    fn close_open(&mut self) {
        if let Some(segment) = self.open.take() {
            self.emitter.segment_close(&segment);
            self.closed.push(summarize(&segment));
        }
    }
}

fn summarize(segment: &OpenSegment) -> SegmentSummary {
    SegmentSummary {
        kind: segment.kind,
        item_id: segment.item_id.clone(),
        content: segment.content.clone(),
        call_id: segment.call_id.clone(),
        tool_name: segment.tool_name.clone(),
    }
}

fn new_item_id(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}
