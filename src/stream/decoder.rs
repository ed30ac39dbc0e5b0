// Copyright 2026 The Delta Relay Project
// SPDX-License-Identifier: Apache-2.0

// Frame decoding
//
// One complete frame in, one `DecodedFragment` out. Accepts both the
// `data: <json>` SSE form and a bare `<json>` line.

use super::types::{DecodedFragment, DATA_PREFIX, DONE_SENTINEL};

/// Decode one newline-delimited frame.
///
/// - blank frame -> `Empty`
/// - `data: [DONE]` or `[DONE]` -> `Empty`
/// - payload that is not JSON -> `Malformed`
/// - JSON without a non-empty string at `choices[0].delta.content` -> `Empty`
/// - otherwise -> `Content`
pub fn decode_frame(frame: &str) -> DecodedFragment {
    let trimmed = frame.trim();
    if trimmed.is_empty() {
        return DecodedFragment::Empty;
    }

    let payload = match trimmed.strip_prefix(DATA_PREFIX) {
        Some(rest) => rest.trim(),
        None => trimmed,
    };

    if payload.is_empty() || payload == DONE_SENTINEL {
        return DecodedFragment::Empty;
    }

    let json: serde_json::Value = match serde_json::from_str(payload) {
        Ok(v) => v,
        Err(_) => return DecodedFragment::Malformed,
    };

    match extract_delta_content(&json) {
        Some(text) if !text.is_empty() => DecodedFragment::Content(text.to_string()),
        _ => DecodedFragment::Empty,
    }
}

/// `choices[0].delta.content`, if it is a string.
fn extract_delta_content(json: &serde_json::Value) -> Option<&str> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("delta"))
        .and_then(|d| d.get("content"))
        .and_then(|c| c.as_str())
}
