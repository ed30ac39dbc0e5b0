// Copyright 2026 The Delta Relay Project
// SPDX-License-Identifier: Apache-2.0

// Config loader and validator
//
// Loads delta-relay.yaml, resolves `${VAR}` references (secrets stay in
// the environment), applies defaults, and validates values.

mod error;
mod interpolation;
mod loader;
mod raw;
mod source;
mod types;

pub use error::ConfigError;
pub use interpolation::resolve_variables;
pub use loader::load_config;
pub use source::{ConfigSource, FileSource, StringSource};
pub use types::{
    Config, LimitsConfig, ServerConfig, UpstreamConfig, DEFAULT_MAX_INPUT_LENGTH,
    DEFAULT_MAX_RESPONSE_TOKENS, DEFAULT_PORT,
};
