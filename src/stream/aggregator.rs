// Copyright 2026 The Delta Relay Project
// SPDX-License-Identifier: Apache-2.0

// Per-chunk aggregation
//
// Drives reassembly and decoding for one upstream chunk at a time and
// folds every content fragment from that chunk into a single record.
// No I/O here: the orchestrator owns the source and the sink.

use super::decoder::decode_frame;
use super::reassembler::PendingBuffer;
use super::types::{DecodedFragment, OutputRecord, RelayState};

/// Relay state for one request: the carried partial frame plus the
/// lifecycle state.
#[derive(Debug)]
pub struct DeltaAggregator {
    buffer: PendingBuffer,
    state: RelayState,
}

impl Default for DeltaAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl DeltaAggregator {
    pub fn new() -> Self {
        Self {
            buffer: PendingBuffer::new(),
            state: RelayState::Open,
        }
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    /// Bytes currently carried as an unterminated frame.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// Process one upstream chunk.
    ///
    /// Returns one record holding the concatenated content of every frame
    /// completed by this chunk, or `None` when no frame yielded content.
    /// Does nothing once the relay has left `Open`.
    pub fn step(&mut self, chunk: &[u8]) -> Option<OutputRecord> {
        if self.state != RelayState::Open {
            return None;
        }

        let (buffer, frames) = std::mem::take(&mut self.buffer).feed(chunk);
        self.buffer = buffer;

        aggregate(frames.iter().map(String::as_str))
    }

    /// Upstream reached end of stream: decode the unterminated leftover as
    /// a final frame and close.
    ///
    /// Best effort. A malformed leftover is dropped.
    pub fn finish(&mut self) -> Option<OutputRecord> {
        if self.state != RelayState::Open {
            return None;
        }
        self.state = RelayState::Flushing;

        let record = std::mem::take(&mut self.buffer)
            .into_remainder()
            .and_then(|leftover| aggregate(std::iter::once(leftover.as_str())));

        self.state = RelayState::Closed;
        record
    }

    /// Fatal error: discard carried bytes and refuse further input.
    pub fn fail(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.buffer = PendingBuffer::new();
        self.state = RelayState::Failed;
    }
}

/// Decode `frames` in order and concatenate their content.
///
/// Malformed frames are logged at debug level and skipped; they never
/// affect the frames around them.
pub fn aggregate<'a>(frames: impl IntoIterator<Item = &'a str>) -> Option<OutputRecord> {
    let mut delta = String::new();

    for frame in frames {
        match decode_frame(frame) {
            DecodedFragment::Content(text) => delta.push_str(&text),
            DecodedFragment::Empty => {}
            DecodedFragment::Malformed => {
                tracing::debug!(frame_len = frame.len(), "dropping malformed frame");
            }
        }
    }

    if delta.is_empty() {
        None
    } else {
        Some(OutputRecord { delta })
    }
}
