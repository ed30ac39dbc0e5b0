// Copyright 2026 The Delta Relay Project
// SPDX-License-Identifier: Apache-2.0

use super::error::ConfigError;
use super::interpolation::resolve_variables;
use super::raw;
use super::source::ConfigSource;
use super::types::*;

/// Load and validate relay config from the given source.
///
/// Steps:
/// 1. Read raw YAML from source
/// 2. Parse into raw deserialization types
/// 3. Check the config version
/// 4. Resolve `${VAR}` references in string fields
/// 5. Apply defaults and validate values
pub fn load_config(source: &dyn ConfigSource) -> Result<Config, ConfigError> {
    let raw_yaml = source.load()?;
    let raw: raw::RawConfig = serde_yaml::from_str(&raw_yaml)?;

    if raw.delta_relay != "v1" {
        return Err(ConfigError::Validation(format!(
            "unsupported config version \"{}\", expected \"v1\"",
            raw.delta_relay
        )));
    }

    Ok(Config {
        upstream: build_upstream_config(raw.upstream)?,
        limits: build_limits_config(raw.limits)?,
        server: build_server_config(raw.server)?,
    })
}

fn build_upstream_config(raw: raw::RawUpstreamConfig) -> Result<UpstreamConfig, ConfigError> {
    let url = resolve_variables(&raw.url)?;
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::Validation(format!(
            "upstream.url must be an http(s) URL, got \"{url}\""
        )));
    }

    let secret = resolve_variables(&raw.secret)?;
    if secret.trim().is_empty() {
        return Err(ConfigError::Validation(
            "upstream.secret must not be empty".to_string(),
        ));
    }

    let max_response_tokens = raw
        .max_response_tokens
        .unwrap_or(DEFAULT_MAX_RESPONSE_TOKENS);
    if max_response_tokens == 0 {
        return Err(ConfigError::Validation(
            "upstream.max_response_tokens must be positive".to_string(),
        ));
    }

    for (field, value) in [
        ("timeout_ms", raw.timeout_ms),
        ("stream_timeout_ms", raw.stream_timeout_ms),
    ] {
        if value == Some(0) {
            return Err(ConfigError::Validation(format!(
                "upstream.{field} must be positive when set"
            )));
        }
    }

    Ok(UpstreamConfig {
        url,
        secret,
        max_response_tokens,
        timeout_ms: raw.timeout_ms,
        stream_timeout_ms: raw.stream_timeout_ms,
    })
}

fn build_limits_config(raw: Option<raw::RawLimitsConfig>) -> Result<LimitsConfig, ConfigError> {
    let Some(raw) = raw else {
        return Ok(LimitsConfig::default());
    };

    let max_input_length = raw.max_input_length.unwrap_or(DEFAULT_MAX_INPUT_LENGTH);
    if max_input_length == 0 {
        return Err(ConfigError::Validation(
            "limits.max_input_length must be positive".to_string(),
        ));
    }

    Ok(LimitsConfig { max_input_length })
}

fn build_server_config(raw: Option<raw::RawServerConfig>) -> Result<ServerConfig, ConfigError> {
    let Some(raw) = raw else {
        return Ok(ServerConfig::default());
    };

    let base_path = match raw.base_path {
        Some(path) => resolve_variables(&path)?,
        None => String::new(),
    };
    if !base_path.is_empty() && (!base_path.starts_with('/') || base_path.ends_with('/')) {
        return Err(ConfigError::Validation(format!(
            "server.base_path must start with '/' and not end with '/', got \"{base_path}\""
        )));
    }

    Ok(ServerConfig {
        port: raw.port.unwrap_or(DEFAULT_PORT),
        base_path,
    })
}
