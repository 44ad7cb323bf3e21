//! Delta pipeline: backend deltas in, wire events out.
//!
//! Composes the inline tool extractor (when the backend speaks the tagged
//! text convention) with the segment state machine and a dialect emitter.
//! Callers feed [`ResponseDelta`]s and drain serialized events after each
//! step, keeping the whole path bounded to one in-flight chunk.

use crate::config::{ThinkStyle, ToolCallStyle};
use crate::extractor::InlineToolParser;
use crate::segment::{SegmentEmitter, Segmenter, StreamControl};
use crate::sink::EventBuffer;
use crate::types::ResponseDelta;

pub struct DeltaPipeline<E: SegmentEmitter> {
    segmenter: Segmenter<E>,
    extractor: Option<InlineToolParser>,
}

impl<E: SegmentEmitter> DeltaPipeline<E> {
    pub fn new(
        emitter: E,
        think_style: ThinkStyle,
        tool_style: ToolCallStyle,
        model: impl Into<String>,
    ) -> Self {
        let extractor = match tool_style {
            ToolCallStyle::Structured => None,
            ToolCallStyle::InlineTag => Some(InlineToolParser::new()),
        };
        Self {
            segmenter: Segmenter::new(emitter, think_style, model),
            extractor,
        }
    }

    pub fn emitter_mut(&mut self) -> &mut E {
        self.segmenter.emitter_mut()
    }

    /// Feed one backend delta through extraction and segmentation.
    pub fn consume(&mut self, delta: ResponseDelta) -> StreamControl {
        if self.extractor.is_none() {
            return self.segmenter.consume(delta);
        }

        match delta {
            ResponseDelta::TextChunk { text } => {
                let safe = self
                    .extractor
                    .as_mut()
                    .map(|ex| ex.process_chunk(&text))
                    .unwrap_or_default();
                if !safe.is_empty() {
                    if let StreamControl::Release =
                        self.segmenter.consume(ResponseDelta::TextChunk { text: safe })
                    {
                        return StreamControl::Release;
                    }
                }
                self.forward_extracted_calls()
            }
            ResponseDelta::Finish { reason, usage } => {
                let residue = self
                    .extractor
                    .as_mut()
                    .map(|ex| ex.finalize())
                    .unwrap_or_default();
                if !residue.is_empty() {
                    if let StreamControl::Release = self
                        .segmenter
                        .consume(ResponseDelta::TextChunk { text: residue })
                    {
                        return StreamControl::Release;
                    }
                }
                if let StreamControl::Release = self.forward_extracted_calls() {
                    return StreamControl::Release;
                }
                self.segmenter.consume(ResponseDelta::Finish { reason, usage })
            }
            other => self.segmenter.consume(other),
        }
    }

    fn forward_extracted_calls(&mut self) -> StreamControl {
        let calls = match self.extractor.as_mut() {
            Some(extractor) => extractor.drain_calls(),
            None => Vec::new(),
        };
        for call in calls {
            let control = self.segmenter.consume(ResponseDelta::ToolCall {
                call_id: call.id,
                name: call.name,
                arguments: call.arguments,
            });
            if let StreamControl::Release = control {
                return StreamControl::Release;
            }
        }
        StreamControl::Continue
    }
}

impl<E: SegmentEmitter + EventBuffer> DeltaPipeline<E> {
    /// Serialized events produced since the last drain.
    pub fn drain_events(&mut self) -> Vec<Vec<u8>> {
        self.segmenter.emitter_mut().drain_events()
    }
}
