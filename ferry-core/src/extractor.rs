//! Incremental inline tool-call extraction.
//!
//! Backends without structured tool-call output express invocations as
//! tagged text inside the answer stream, e.g.
//! `<tool_use><name>search</name><arguments>{"q":"rust"}</arguments></tool_use>`.
//! The transport delivers arbitrarily-sized chunks, so a tag can arrive split
//! at any byte boundary. The extractor buffers the stream, releases text that
//! can no longer be part of a tag, withholds anything that might still become
//! one, and reconstructs structured calls from completed tag pairs while
//! correcting the malformed spellings models commonly produce.

use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use crate::types::ToolCallRequest;

/// Recognized start/end tag pairs.
const TAG_PAIRS: &[(&str, &str)] = &[
    ("<tool_use>", "</tool_use>"),
    ("<tool_call>", "</tool_call>"),
];

static NAME_RE: Lazy<Regex> = Lazy::new(|| {
    // Tolerates `<name>foo</name>`, `<tool_name>foo`, `<function>foo`,
    // the `<name=foo>` spelling, and a missing closing `>`.
    Regex::new(r#"(?s)<\s*(?:name|tool_name|function)\s*[>=]\s*"?([A-Za-z0-9_.\-]+)"?"#)
        .expect("name pattern compiles")
});

static ARGS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<\s*(?:arguments|args|parameters|input)\s*>(.*?)(?:</\s*(?:arguments|args|parameters|input)\s*>?|$)")
        .expect("arguments pattern compiles")
});

/// Incremental scanner for inline tool tags.
///
/// Owned by exactly one response; reset between independent requests by
/// constructing a fresh instance.
#[derive(Debug, Default)]
pub struct InlineToolParser {
    buffer: String,
    /// How much of `buffer` has been released to the caller as safe text.
    released: usize,
    /// Index of the currently open tag pair in [`TAG_PAIRS`].
    open_pair: Option<usize>,
    /// Byte offset where the open start tag begins.
    tag_start: usize,
    calls: Vec<ToolCallRequest>,
}

impl InlineToolParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw chunk of answer text; returns the text that is safe to
    /// show. Partial tag prefixes are withheld until resolved; content inside
    /// an open tag pair is withheld until the end tag arrives.
    pub fn process_chunk(&mut self, chunk: &str) -> String {
        self.buffer.push_str(chunk);
        let mut safe = String::new();

        loop {
            if let Some(pair_idx) = self.open_pair {
                let (start_tag, end_tag) = TAG_PAIRS[pair_idx];
                let body_from = self.tag_start + start_tag.len();
                let Some(rel) = self.buffer[self.tag_start..].find(end_tag) else {
                    // End tag not here yet; hold everything from the start tag.
                    break;
                };
                let end_abs = self.tag_start + rel + end_tag.len();
                let body = &self.buffer[body_from..self.tag_start + rel];
                match parse_tag_body(body) {
                    Some(call) => self.calls.push(call),
                    None => {
                        // Correction failed: surface the raw span instead of
                        // dropping it.
                        tracing::warn!(
                            span = &self.buffer[self.tag_start..end_abs],
                            "unparseable tool tag, passing through as text"
                        );
                        safe.push_str(&self.buffer[self.tag_start..end_abs]);
                    }
                }
                self.released = end_abs;
                self.open_pair = None;
            } else {
                let hay = &self.buffer[self.released..];
                let found = TAG_PAIRS
                    .iter()
                    .enumerate()
                    .filter_map(|(i, (start, _))| hay.find(start).map(|at| (at, i)))
                    .min_by_key(|(at, _)| *at);
                match found {
                    Some((at, pair_idx)) => {
                        safe.push_str(&hay[..at]);
                        self.tag_start = self.released + at;
                        self.released = self.tag_start;
                        self.open_pair = Some(pair_idx);
                    }
                    None => {
                        // Release everything except a trailing run that could
                        // still be the prefix of a start tag.
                        let hold = partial_start_tag_len(hay);
                        let cut = hay.len() - hold;
                        safe.push_str(&hay[..cut]);
                        self.released += cut;
                        break;
                    }
                }
            }
        }

        safe
    }

    /// Calls reconstructed so far, draining the internal list.
    pub fn drain_calls(&mut self) -> Vec<ToolCallRequest> {
        std::mem::take(&mut self.calls)
    }

    /// Flush at stream end. An unterminated tag pair is malformed input, not
    /// something to drop: its partial content comes back as ordinary text.
    pub fn finalize(&mut self) -> String {
        let rest = if self.open_pair.take().is_some() {
            self.buffer[self.tag_start..].to_string()
        } else {
            self.buffer[self.released..].to_string()
        };
        self.released = self.buffer.len();
        rest
    }
}

/// Longest suffix of `text` that is a proper prefix of some start tag.
fn partial_start_tag_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut best = 0;
    for (start, _) in TAG_PAIRS {
        let tag = start.as_bytes();
        let max = tag.len().saturating_sub(1).min(bytes.len());
        for k in (best + 1..=max).rev() {
            if bytes[bytes.len() - k..] == tag[..k] {
                best = k;
                break;
            }
        }
    }
    best
}

/// Reconstruct a structured call from a completed tag body.
fn parse_tag_body(body: &str) -> Option<ToolCallRequest> {
    let name = NAME_RE.captures(body)?.get(1)?.as_str().to_string();

    let arguments = ARGS_RE
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| bare_json_object(body))
        .unwrap_or_else(|| "{}".to_string());

    Some(ToolCallRequest {
        id: format!("call_{}", Uuid::new_v4().simple()),
        name,
        arguments,
    })
}

/// Fallback: scan the body for a bare JSON object when no recognized
/// argument tag exists.
fn bare_json_object(body: &str) -> Option<String> {
    let from = body.find('{')?;
    let to = body.rfind('}')?;
    if to <= from {
        return None;
    }
    let candidate = &body[from..=to];
    serde_json::from_str::<serde_json::Value>(candidate)
        .ok()
        .map(|_| candidate.to_string())
}
