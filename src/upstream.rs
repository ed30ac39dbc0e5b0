// Copyright 2026 The Delta Relay Project
// SPDX-License-Identifier: Apache-2.0

// Upstream completions client
//
// Responsibilities:
// - Build the upstream request body from validated messages
// - Authenticate with the configured bearer secret
// - Hand back the response body as a byte stream (streaming path)
// - Extract `choices[0].message.content` (non-streaming path)
//
// The trait is the injection point: handlers never touch reqwest directly.

use crate::message::ChatMessage;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::TryStreamExt;
use reqwest::StatusCode;
use std::time::Duration;

/// Response body of a streaming completion.
pub type ByteStream = BoxStream<'static, Result<Bytes, UpstreamError>>;

/// `None` when the upstream answered without a body.
pub type UpstreamBody = Option<ByteStream>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream request failed: {0}")]
    Transport(String),

    #[error("upstream request timed out: {0}")]
    Timeout(String),

    #[error("upstream returned status {0}")]
    Status(u16),

    #[error("upstream response body is invalid: {0}")]
    InvalidBody(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            UpstreamError::Timeout(e.to_string())
        } else {
            UpstreamError::Transport(e.to_string())
        }
    }
}

/// Forwards validated conversations to the completions service.
#[async_trait]
pub trait CompletionsClient: Send + Sync {
    /// Start a streaming completion and return its raw body.
    async fn open_stream(&self, messages: &[ChatMessage]) -> Result<UpstreamBody, UpstreamError>;

    /// Run a non-streaming completion and return the answer text.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, UpstreamError>;
}

/// Where and how to reach the completions service.
#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    pub url: String,
    pub secret: String,
    pub max_response_tokens: u32,
    /// Whole-request timeout for the non-streaming path.
    pub timeout_ms: Option<u64>,
}

/// Upstream request body: `{"messages": [...], "max_completion_tokens": N, "stream": bool}`.
pub fn request_body(
    messages: &[ChatMessage],
    max_completion_tokens: u32,
    stream: bool,
) -> serde_json::Value {
    serde_json::json!({
        "messages": messages,
        "max_completion_tokens": max_completion_tokens,
        "stream": stream,
    })
}

/// `choices[0].message.content` of a non-streaming response.
pub fn extract_message_content(json: &serde_json::Value) -> Option<&str> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
}

// ---------------------------------------------------------------------------
// Reqwest client
// ---------------------------------------------------------------------------

pub struct ReqwestCompletionsClient {
    client: reqwest::Client,
    settings: UpstreamSettings,
}

impl ReqwestCompletionsClient {
    pub fn new(client: reqwest::Client, settings: UpstreamSettings) -> Self {
        Self { client, settings }
    }

    async fn post(
        &self,
        messages: &[ChatMessage],
        stream: bool,
    ) -> Result<reqwest::Response, UpstreamError> {
        let mut req = self
            .client
            .post(&self.settings.url)
            .bearer_auth(&self.settings.secret)
            .json(&request_body(
                messages,
                self.settings.max_response_tokens,
                stream,
            ));

        // A streaming body may legitimately outlive any fixed timeout; the
        // relay's own cancellation bounds it instead.
        if !stream {
            if let Some(timeout_ms) = self.settings.timeout_ms {
                req = req.timeout(Duration::from_millis(timeout_ms));
            }
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "upstream returned error status");
            return Err(UpstreamError::Status(status.as_u16()));
        }
        Ok(resp)
    }
}

#[async_trait]
impl CompletionsClient for ReqwestCompletionsClient {
    async fn open_stream(&self, messages: &[ChatMessage]) -> Result<UpstreamBody, UpstreamError> {
        let resp = self.post(messages, true).await?;

        if resp.status() == StatusCode::NO_CONTENT || resp.content_length() == Some(0) {
            return Ok(None);
        }

        let stream = resp.bytes_stream().map_err(UpstreamError::from);
        Ok(Some(Box::pin(stream)))
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, UpstreamError> {
        let resp = self.post(messages, false).await?;
        let json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| UpstreamError::InvalidBody(e.to_string()))?;

        extract_message_content(&json)
            .map(str::to_string)
            .ok_or_else(|| UpstreamError::InvalidBody("missing choices[0].message.content".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;

    #[test]
    fn request_body_forwards_role_and_content_only() {
        let messages = vec![
            ChatMessage::new(Role::System, "sys"),
            ChatMessage::new(Role::User, "hi"),
        ];
        let body = request_body(&messages, 256, true);
        assert_eq!(
            body,
            serde_json::json!({
                "messages": [
                    { "role": "system", "content": "sys" },
                    { "role": "user", "content": "hi" }
                ],
                "max_completion_tokens": 256,
                "stream": true
            })
        );
    }

    #[test]
    fn non_streaming_body_sets_stream_false() {
        let body = request_body(&[], 10, false);
        assert_eq!(body["stream"], serde_json::Value::Bool(false));
    }

    #[test]
    fn message_content_extracted_from_first_choice() {
        let json = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "answer" } }]
        });
        assert_eq!(extract_message_content(&json), Some("answer"));
        assert_eq!(extract_message_content(&serde_json::json!({ "choices": [] })), None);
    }

    #[test]
    fn upstream_error_messages() {
        assert_eq!(
            UpstreamError::Status(503).to_string(),
            "upstream returned status 503"
        );
        assert!(UpstreamError::Timeout("5000ms".into())
            .to_string()
            .contains("timed out"));
    }
}
