// Copyright 2026 The Delta Relay Project
// SPDX-License-Identifier: Apache-2.0

// Relay orchestration
//
// Pull a chunk from the upstream source, run the aggregator step, push the
// resulting record to the downstream sink, repeat. The loop suspends only
// while awaiting the source and while awaiting the sink, and it never pulls
// the next chunk before the previous write has been accepted. Source and
// sink are released on every exit path.

use super::aggregator::DeltaAggregator;
use super::types::{OutputRecord, PipelineOutcome, RelayError, RELAY_CHANNEL_CAPACITY};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{Stream, StreamExt};
use std::fmt::Display;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// Pull-based upstream body.
#[async_trait]
pub trait UpstreamSource: Send {
    /// Next chunk, an error, or `None` at end of stream.
    async fn next_chunk(&mut self) -> Option<Result<Bytes, RelayError>>;
}

/// Push-based caller-facing body.
///
/// `send` completing means the sink is ready for more.
#[async_trait]
pub trait DownstreamSink: Send {
    async fn send(&mut self, bytes: Bytes) -> Result<(), RelayError>;

    /// End the body abnormally so the caller sees a failed transfer rather
    /// than a clean empty response.
    async fn abort(&mut self, error: &RelayError);

    /// End the body. Further sends fail.
    async fn close(&mut self);

    /// Resolves once the caller has gone away. Pending while it is still
    /// reading, so the orchestrator can race it against upstream pulls.
    async fn closed(&self);
}

// ---------------------------------------------------------------------------
// Adapters
// ---------------------------------------------------------------------------

/// Adapts any fallible byte stream (e.g. a reqwest body) into a source.
pub struct StreamSource<S> {
    inner: S,
}

impl<S> StreamSource<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S, E> UpstreamSource for StreamSource<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin + Send,
    E: Display + Send,
{
    async fn next_chunk(&mut self) -> Option<Result<Bytes, RelayError>> {
        self.inner
            .next()
            .await
            .map(|item| item.map_err(|e| RelayError::UpstreamRead(e.to_string())))
    }
}

/// Body item type handed to the HTTP layer.
pub type BodyItem = Result<Bytes, std::io::Error>;

/// Sink backed by a bounded channel whose receiver becomes the HTTP body.
///
/// A dropped receiver (caller disconnected) makes `send` fail.
pub struct ChannelSink {
    tx: Option<mpsc::Sender<BodyItem>>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<BodyItem>) -> Self {
        Self { tx: Some(tx) }
    }
}

#[async_trait]
impl DownstreamSink for ChannelSink {
    async fn send(&mut self, bytes: Bytes) -> Result<(), RelayError> {
        let tx = self.tx.as_ref().ok_or(RelayError::DownstreamClosed)?;
        tx.send(Ok(bytes))
            .await
            .map_err(|_| RelayError::DownstreamClosed)
    }

    async fn abort(&mut self, error: &RelayError) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Err(std::io::Error::other(error.to_string()))).await;
        }
    }

    async fn close(&mut self) {
        self.tx = None;
    }

    async fn closed(&self) {
        if let Some(tx) = &self.tx {
            tx.closed().await;
        }
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

enum WriteStop {
    Cancelled,
    Downstream,
}

/// Run one relay to completion.
///
/// `source` is `None` when the upstream answered without a body; the sink
/// is then ended immediately. Cancellation is checked before every pull
/// and every write, so no record is produced once it has been observed.
/// A caller that goes away is noticed while waiting on upstream too, not
/// only on the next write.
pub async fn run_pipeline<Src, Snk>(
    source: Option<Src>,
    mut sink: Snk,
    cancel: CancellationToken,
) -> PipelineOutcome
where
    Src: UpstreamSource,
    Snk: DownstreamSink,
{
    let Some(mut source) = source else {
        sink.close().await;
        return PipelineOutcome::Completed { records: 0 };
    };

    let mut aggregator = DeltaAggregator::new();
    let mut records_written = 0usize;

    let outcome = loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                aggregator.fail();
                break PipelineOutcome::Cancelled { records_written };
            }
            _ = sink.closed() => {
                aggregator.fail();
                break PipelineOutcome::DownstreamClosed { records_written };
            }
            next = source.next_chunk() => next,
        };

        let (record, end_of_stream) = match next {
            Some(Ok(chunk)) => (aggregator.step(&chunk), false),
            Some(Err(error)) => {
                aggregator.fail();
                if records_written == 0 {
                    sink.abort(&error).await;
                }
                break PipelineOutcome::UpstreamFailed {
                    records_written,
                    error,
                };
            }
            None => (aggregator.finish(), true),
        };

        if let Some(record) = record {
            match write_record(&mut sink, &record, &cancel).await {
                Ok(()) => records_written += 1,
                Err(WriteStop::Cancelled) => {
                    aggregator.fail();
                    break PipelineOutcome::Cancelled { records_written };
                }
                Err(WriteStop::Downstream) => {
                    aggregator.fail();
                    break PipelineOutcome::DownstreamClosed { records_written };
                }
            }
        }

        if end_of_stream {
            break PipelineOutcome::Completed {
                records: records_written,
            };
        }
    };

    drop(source);
    sink.close().await;
    outcome
}

async fn write_record<Snk: DownstreamSink>(
    sink: &mut Snk,
    record: &OutputRecord,
    cancel: &CancellationToken,
) -> Result<(), WriteStop> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(WriteStop::Cancelled),
        sent = sink.send(record.to_line()) => sent.map_err(|_| WriteStop::Downstream),
    }
}

/// Spawn a relay task and return the body stream it feeds.
///
/// The channel holds at most [`RELAY_CHANNEL_CAPACITY`] records, so a slow
/// reader holds back upstream pulls. Dropping the returned stream ends the
/// relay as `DownstreamClosed` on its next write.
pub fn relay_body<Src>(
    source: Option<Src>,
    cancel: CancellationToken,
) -> (ReceiverStream<BodyItem>, JoinHandle<PipelineOutcome>)
where
    Src: UpstreamSource + 'static,
{
    let (tx, rx) = mpsc::channel::<BodyItem>(RELAY_CHANNEL_CAPACITY);
    let handle = tokio::spawn(run_pipeline(source, ChannelSink::new(tx), cancel));
    (ReceiverStream::new(rx), handle)
}
