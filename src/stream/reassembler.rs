// Copyright 2026 The Delta Relay Project
// SPDX-License-Identifier: Apache-2.0

// Frame reassembly
//
// Upstream chunk boundaries are arbitrary: a chunk may end mid-frame, hold
// several frames, or split a multi-byte character. `PendingBuffer` carries
// the unterminated tail between chunks and hands back complete frames.

/// Bytes received but not yet terminated by a newline.
///
/// Holds at most one incomplete trailing frame, never a complete one.
/// Kept as raw bytes so a UTF-8 sequence split across chunks is rejoined
/// before it is decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingBuffer {
    carried: Vec<u8>,
}

impl PendingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and split off every newline-terminated frame.
    ///
    /// Returns the new buffer (the segment after the last newline, possibly
    /// empty) and the complete frames in arrival order. Blank lines are kept
    /// as empty frames. No length limit is applied.
    pub fn feed(mut self, chunk: &[u8]) -> (PendingBuffer, Vec<String>) {
        self.carried.extend_from_slice(chunk);

        let Some(last_newline) = self.carried.iter().rposition(|b| *b == b'\n') else {
            return (self, Vec::new());
        };

        let tail = self.carried.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.carried, tail);

        let frames = complete[..last_newline]
            .split(|b| *b == b'\n')
            .map(|frame| String::from_utf8_lossy(frame).into_owned())
            .collect();

        (self, frames)
    }

    /// Consume the buffer at end of stream, returning the unterminated
    /// leftover as text if any bytes remain.
    pub fn into_remainder(self) -> Option<String> {
        if self.carried.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&self.carried).into_owned())
        }
    }

    pub fn is_empty(&self) -> bool {
        self.carried.is_empty()
    }

    pub fn len(&self) -> usize {
        self.carried.len()
    }
}
