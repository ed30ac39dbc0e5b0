// Copyright 2026 The Delta Relay Project
// SPDX-License-Identifier: Apache-2.0

// Request transcript logging
//
// Every forwarded conversation is recorded before the upstream call, keyed
// by the caller id header. Storage is injected; the default writes a
// structured log event.

use crate::message::ChatMessage;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// One recorded request.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEntry {
    pub caller_id: String,
    pub messages: Vec<ChatMessage>,
    pub created: DateTime<Utc>,
}

impl TranscriptEntry {
    pub fn new(caller_id: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            caller_id: caller_id.into(),
            messages,
            created: Utc::now(),
        }
    }

    /// Flatten to `"\n{role}: {content}"` per message.
    pub fn render(&self) -> String {
        self.messages
            .iter()
            .map(|m| format!("\n{}: {}", m.role.as_str(), m.content))
            .collect()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TranscriptError {
    #[error("transcript store unavailable: {0}")]
    Unavailable(String),
}

/// Where transcripts go.
#[async_trait]
pub trait TranscriptLog: Send + Sync {
    async fn record(&self, entry: TranscriptEntry) -> Result<(), TranscriptError>;
}

/// Emits each transcript as an `info` event.
pub struct TracingTranscriptLog;

#[async_trait]
impl TranscriptLog for TracingTranscriptLog {
    async fn record(&self, entry: TranscriptEntry) -> Result<(), TranscriptError> {
        tracing::info!(
            caller_id = %entry.caller_id,
            created = %entry.created.to_rfc3339(),
            messages = entry.messages.len(),
            transcript = %entry.render(),
            "transcript recorded"
        );
        Ok(())
    }
}

/// Discards transcripts.
pub struct NoopTranscriptLog;

#[async_trait]
impl TranscriptLog for NoopTranscriptLog {
    async fn record(&self, _entry: TranscriptEntry) -> Result<(), TranscriptError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;

    #[test]
    fn render_prefixes_each_message_with_newline_and_role() {
        let entry = TranscriptEntry::new(
            "badger-1",
            vec![
                ChatMessage::new(Role::User, "hi"),
                ChatMessage::new(Role::Assistant, "hello"),
            ],
        );
        assert_eq!(entry.render(), "\nuser: hi\nassistant: hello");
    }

    #[test]
    fn render_of_no_messages_is_empty() {
        assert_eq!(TranscriptEntry::new("", Vec::new()).render(), "");
    }

    #[tokio::test]
    async fn default_logs_accept_entries() {
        let entry = TranscriptEntry::new("id", vec![ChatMessage::new(Role::User, "x")]);
        assert!(TracingTranscriptLog.record(entry.clone()).await.is_ok());
        assert!(NoopTranscriptLog.record(entry).await.is_ok());
    }
}
