// Copyright 2026 The Delta Relay Project
// SPDX-License-Identifier: Apache-2.0

// Streaming relay
//
// Responsibilities:
// - Reassemble newline-delimited frames across arbitrary chunk boundaries
// - Decode `data:` frames and extract `choices[0].delta.content`
// - Fold each chunk's content into one `{"delta": ...}` record
// - Flush an unterminated leftover frame at end of stream
// - Drive source -> transform -> sink with backpressure and cancellation
//
// Known limitation: a JSON payload that itself contains a raw newline is
// split into two frames, both fail to parse, and its content is dropped.

mod aggregator;
mod decoder;
mod pipeline;
mod reassembler;
mod types;

pub use aggregator::{aggregate, DeltaAggregator};
pub use decoder::decode_frame;
pub use pipeline::{
    relay_body, run_pipeline, BodyItem, ChannelSink, DownstreamSink, StreamSource, UpstreamSource,
};
pub use reassembler::PendingBuffer;
pub use types::{
    DecodedFragment, OutputRecord, PipelineOutcome, RelayError, RelayState, DATA_PREFIX,
    DONE_SENTINEL, RELAY_CHANNEL_CAPACITY,
};
