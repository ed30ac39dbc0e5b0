// Copyright 2026 The Delta Relay Project
// SPDX-License-Identifier: Apache-2.0

// Stream types
//
// Core types for the delta relay: decoded fragments, output records,
// pipeline state, pipeline outcomes, and errors.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Wire constants
// ---------------------------------------------------------------------------

/// Prefix of an SSE data line. The space after the colon is optional.
pub const DATA_PREFIX: &str = "data:";

/// Upstream marker for logical end of content. Not a physical end of stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Capacity of the channel between the relay task and the HTTP body.
///
/// One slot: the relay may not pull the next upstream chunk until the
/// caller's connection has taken the previous record.
pub const RELAY_CHANNEL_CAPACITY: usize = 1;

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Result of decoding one complete frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedFragment {
    /// The frame carried a non-empty `choices[0].delta.content`.
    Content(String),
    /// Blank line, `[DONE]` sentinel, or a payload without content.
    Empty,
    /// The payload did not parse. Dropped, never surfaced.
    Malformed,
}

/// One record written to the caller: all content decoded from one
/// upstream chunk, or from the end-of-stream flush.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub delta: String,
}

impl OutputRecord {
    pub fn new(delta: impl Into<String>) -> Self {
        Self {
            delta: delta.into(),
        }
    }

    /// Render as one newline-terminated JSON line: `{"delta":"..."}\n`.
    pub fn to_line(&self) -> Bytes {
        let mut line = serde_json::json!({ "delta": self.delta }).to_string();
        line.push('\n');
        Bytes::from(line)
    }
}

// ---------------------------------------------------------------------------
// Pipeline state
// ---------------------------------------------------------------------------

/// Lifecycle of one relay instance.
///
/// `Open -> Open` on every chunk, `Open -> Flushing -> Closed` at upstream
/// end of stream, `Open | Flushing -> Failed` on a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Open,
    Flushing,
    Closed,
    Failed,
}

impl RelayState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RelayState::Closed | RelayState::Failed)
    }
}

/// How a pipeline run ended. Returned by the orchestrator for logging;
/// none of these are reported to the caller once streaming has begun.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Upstream reached end of stream and every record was delivered.
    Completed { records: usize },
    /// Upstream failed mid-stream.
    UpstreamFailed {
        records_written: usize,
        error: RelayError,
    },
    /// The caller stopped reading (disconnect).
    DownstreamClosed { records_written: usize },
    /// Cancellation was requested (timeout or shutdown).
    Cancelled { records_written: usize },
}

impl PipelineOutcome {
    pub fn records_written(&self) -> usize {
        match self {
            PipelineOutcome::Completed { records } => *records,
            PipelineOutcome::UpstreamFailed {
                records_written, ..
            }
            | PipelineOutcome::DownstreamClosed { records_written }
            | PipelineOutcome::Cancelled { records_written } => *records_written,
        }
    }

    /// Short label for structured logs.
    pub fn label(&self) -> &'static str {
        match self {
            PipelineOutcome::Completed { .. } => "completed",
            PipelineOutcome::UpstreamFailed { .. } => "upstream_failed",
            PipelineOutcome::DownstreamClosed { .. } => "downstream_closed",
            PipelineOutcome::Cancelled { .. } => "cancelled",
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Fatal I/O-class errors that end a relay. Malformed frames are not
/// errors; see [`DecodedFragment::Malformed`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    #[error("upstream read failed: {0}")]
    UpstreamRead(String),

    #[error("downstream closed")]
    DownstreamClosed,
}
