// Copyright 2026 The Delta Relay Project
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

pub const DEFAULT_MAX_RESPONSE_TOKENS: u32 = 512;
pub const DEFAULT_MAX_INPUT_LENGTH: usize = 16_000;
pub const DEFAULT_PORT: u16 = 9800;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Parsed and validated relay config.
#[derive(Debug, Clone)]
pub struct Config {
    pub upstream: UpstreamConfig,
    pub limits: LimitsConfig,
    pub server: ServerConfig,
}

/// The completions service the relay forwards to.
#[derive(Clone)]
pub struct UpstreamConfig {
    /// Full completions endpoint URL (http or https).
    pub url: String,
    /// Bearer secret. Never logged.
    pub secret: String,
    /// Sent upstream as `max_completion_tokens`.
    pub max_response_tokens: u32,
    /// Whole-request timeout for non-streaming completions.
    pub timeout_ms: Option<u64>,
    /// Upper bound on one streamed relay; the relay is cancelled after it.
    pub stream_timeout_ms: Option<u64>,
}

impl fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("url", &self.url)
            .field("secret", &"<redacted>")
            .field("max_response_tokens", &self.max_response_tokens)
            .field("timeout_ms", &self.timeout_ms)
            .field("stream_timeout_ms", &self.stream_timeout_ms)
            .finish()
    }
}

/// Input size policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitsConfig {
    /// Maximum total message content length in characters.
    pub max_input_length: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_input_length: DEFAULT_MAX_INPUT_LENGTH,
        }
    }
}

/// HTTP surface settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// Prefix for the completion routes, e.g. `/api`. Empty for none.
    pub base_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            base_path: String::new(),
        }
    }
}
