// Copyright 2026 The Delta Relay Project
// SPDX-License-Identifier: Apache-2.0

// HTTP surface
//
// Responsibilities:
// - Validate chat messages and enforce the input length policy
// - Record a transcript before calling upstream
// - Streaming route: relay upstream frames as `{"delta": ...}` lines
// - Non-streaming route: return `{"msg": content}`
// - Heartbeat endpoint

use crate::message::{validate_messages, ChatMessage, InputLimit, ValidationError};
use crate::stream::{self, PipelineOutcome, StreamSource};
use crate::transcript::{TranscriptEntry, TranscriptError, TranscriptLog};
use crate::upstream::{CompletionsClient, UpstreamError};
use axum::body::{Body, Bytes};
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Header carrying the caller's identity for transcripts.
pub const CALLER_ID_HEADER: &str = "x-cs571-id";

/// Content type of the relayed stream: one JSON object per line.
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

const SERVER_ERROR_MESSAGE: &str =
    "An unknown server error occurred during execution. Try again in a few minutes.";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised before a response has started. Once a stream is flowing,
/// failures end the body instead.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("transcript logging failed: {0}")]
    Transcript(#[from] TranscriptError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, public_message) = match &self {
            ProxyError::Validation(e @ ValidationError::InvalidMessages) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            ProxyError::Validation(e @ ValidationError::TooLong { .. }) => {
                (StatusCode::PAYLOAD_TOO_LARGE, e.to_string())
            }
            ProxyError::Transcript(_) | ProxyError::Upstream(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                SERVER_ERROR_MESSAGE.to_string(),
            ),
        };
        (status, Json(serde_json::json!({ "msg": public_message }))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Shared application state
// ---------------------------------------------------------------------------

/// Shared state injected into axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<dyn CompletionsClient>,
    pub transcripts: Arc<dyn TranscriptLog>,
    pub limits: InputLimit,
    /// Relays still running after this long are cancelled.
    pub stream_timeout: Option<Duration>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompletionParams {
    #[serde(rename = "shortContext")]
    short_context: Option<String>,
}

impl CompletionParams {
    /// Only the literal `true` selects the short budget, on both routes.
    /// A truthiness check would let `shortContext=false` shrink it too.
    fn is_short(&self) -> bool {
        self.short_context.as_deref() == Some("true")
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Heartbeat endpoint: GET /heartbeat -> 200 OK
pub async fn heartbeat() -> StatusCode {
    StatusCode::OK
}

/// Streaming completion: relays upstream content as newline-delimited
/// `{"delta": ...}` records.
pub async fn completions_stream(
    State(state): State<AppState>,
    Query(params): Query<CompletionParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ProxyError> {
    let request_id = Uuid::new_v4().to_string();
    let messages = admit(&state, &params, &headers, &body, &request_id).await?;

    let upstream_body = state.upstream.open_stream(&messages).await.map_err(|e| {
        tracing::error!(request_id = %request_id, error = %e, "upstream stream failed to open");
        e
    })?;

    if upstream_body.is_none() {
        tracing::info!(request_id = %request_id, "upstream returned no body");
    }

    let cancel = CancellationToken::new();
    let (records, relay) = stream::relay_body(upstream_body.map(StreamSource::new), cancel.clone());
    tokio::spawn(watch_relay(relay, cancel, state.stream_timeout, request_id));

    Ok((
        [(header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)],
        Body::from_stream(records),
    )
        .into_response())
}

/// Non-streaming completion: `{"msg": "<answer>"}`.
pub async fn completions(
    State(state): State<AppState>,
    Query(params): Query<CompletionParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ProxyError> {
    let request_id = Uuid::new_v4().to_string();
    let messages = admit(&state, &params, &headers, &body, &request_id).await?;

    let content = state.upstream.complete(&messages).await.map_err(|e| {
        tracing::error!(request_id = %request_id, error = %e, "upstream completion failed");
        e
    })?;

    tracing::info!(request_id = %request_id, chars = content.chars().count(), "completion returned");
    Ok(Json(serde_json::json!({ "msg": content })).into_response())
}

/// Validate, length-check, and record the request.
async fn admit(
    state: &AppState,
    params: &CompletionParams,
    headers: &HeaderMap,
    body: &Bytes,
    request_id: &str,
) -> Result<Vec<ChatMessage>, ProxyError> {
    let short_context = params.is_short();

    let messages = validate_messages(body)
        .and_then(|messages| {
            state.limits.check(&messages, short_context)?;
            Ok(messages)
        })
        .map_err(|e| {
            tracing::info!(request_id = %request_id, reason = %e, "request rejected");
            e
        })?;

    let caller_id = headers
        .get(CALLER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    tracing::debug!(
        request_id = %request_id,
        caller_id = %caller_id,
        messages = messages.len(),
        short_context,
        "request admitted"
    );

    state
        .transcripts
        .record(TranscriptEntry::new(caller_id, messages.clone()))
        .await
        .map_err(|e| {
            tracing::error!(request_id = %request_id, error = %e, "transcript logging failed");
            e
        })?;

    Ok(messages)
}

/// Await a relay task, cancelling it if it outlives `timeout`, and log how
/// it ended.
async fn watch_relay(
    mut relay: JoinHandle<PipelineOutcome>,
    cancel: CancellationToken,
    timeout: Option<Duration>,
    request_id: String,
) {
    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, &mut relay).await {
            Ok(joined) => joined,
            Err(_) => {
                tracing::warn!(
                    request_id = %request_id,
                    timeout_ms = limit.as_millis() as u64,
                    "relay exceeded stream timeout, cancelling"
                );
                cancel.cancel();
                relay.await
            }
        },
        None => relay.await,
    };

    let outcome = match joined {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "relay task failed");
            return;
        }
    };

    match &outcome {
        PipelineOutcome::UpstreamFailed { error, .. } => tracing::warn!(
            request_id = %request_id,
            outcome = outcome.label(),
            records = outcome.records_written(),
            error = %error,
            "relay ended"
        ),
        _ => tracing::info!(
            request_id = %request_id,
            outcome = outcome.label(),
            records = outcome.records_written(),
            "relay ended"
        ),
    }
}

// ---------------------------------------------------------------------------
// Router construction
// ---------------------------------------------------------------------------

/// Build the axum router. Completion routes live under `base_path`
/// (empty, or `/prefix` without a trailing slash).
pub fn build_router(state: AppState, base_path: &str) -> Router {
    Router::new()
        .route("/heartbeat", get(heartbeat))
        .route(&format!("{base_path}/completions"), post(completions))
        .route(
            &format!("{base_path}/completions-stream"),
            post(completions_stream),
        )
        .with_state(state)
}

/// The address the relay binds to. Always localhost.
pub const BIND_IP: [u8; 4] = [127, 0, 0, 1];

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
