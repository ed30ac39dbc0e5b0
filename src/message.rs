// Copyright 2026 The Delta Relay Project
// SPDX-License-Identifier: Apache-2.0

// Chat messages accepted from callers
//
// The relay does not interpret conversations. These types exist only to
// validate the request body at the boundary and to forward it upstream.

use serde::{Deserialize, Serialize};

/// The role of a message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    fn parse(s: &str) -> Option<Role> {
        match s {
            "system" => Some(Role::System),
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

/// A single chat message as forwarded upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("The request body does not contain a valid list of chat objects.")]
    InvalidMessages,

    #[error("The request body is too long for the given context window.")]
    TooLong { length: usize, limit: usize },
}

/// Parse and validate a request body as a list of chat messages.
///
/// The body must be a JSON array whose every element is an object with a
/// known `role` and a string `content`. Extra keys are ignored.
pub fn validate_messages(body: &[u8]) -> Result<Vec<ChatMessage>, ValidationError> {
    let json: serde_json::Value =
        serde_json::from_slice(body).map_err(|_| ValidationError::InvalidMessages)?;
    let items = json.as_array().ok_or(ValidationError::InvalidMessages)?;

    items
        .iter()
        .map(|item| {
            let role = item
                .get("role")
                .and_then(|r| r.as_str())
                .and_then(Role::parse)
                .ok_or(ValidationError::InvalidMessages)?;
            let content = item
                .get("content")
                .and_then(|c| c.as_str())
                .ok_or(ValidationError::InvalidMessages)?;
            Ok(ChatMessage::new(role, content))
        })
        .collect()
}

/// Total content length in characters.
pub fn total_content_length(messages: &[ChatMessage]) -> usize {
    messages.iter().map(|m| m.content.chars().count()).sum()
}

/// Input length policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputLimit {
    pub max_input_length: usize,
}

impl InputLimit {
    /// Short-context requests get a quarter of the full budget.
    pub fn limit_for(&self, short_context: bool) -> usize {
        if short_context {
            self.max_input_length / 4
        } else {
            self.max_input_length
        }
    }

    pub fn check(
        &self,
        messages: &[ChatMessage],
        short_context: bool,
    ) -> Result<(), ValidationError> {
        let length = total_content_length(messages);
        let limit = self.limit_for(short_context);
        if length > limit {
            return Err(ValidationError::TooLong { length, limit });
        }
        Ok(())
    }
}
