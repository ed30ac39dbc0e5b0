// Copyright 2026 The Delta Relay Project
// SPDX-License-Identifier: Apache-2.0

// Raw YAML deserialization types (internal)
// Kept apart from the public Config structs: variable interpolation,
// defaults, and validation happen between the two.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    pub delta_relay: String,
    pub upstream: RawUpstreamConfig,
    pub limits: Option<RawLimitsConfig>,
    pub server: Option<RawServerConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawUpstreamConfig {
    pub url: String,
    pub secret: String,
    pub max_response_tokens: Option<u32>,
    pub timeout_ms: Option<u64>,
    pub stream_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawLimitsConfig {
    pub max_input_length: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawServerConfig {
    pub port: Option<u16>,
    pub base_path: Option<String>,
}
