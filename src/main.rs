// Copyright 2026 The Delta Relay Project
// SPDX-License-Identifier: Apache-2.0

use clap::Parser;
use delta_relay::config;
use delta_relay::message::InputLimit;
use delta_relay::proxy;
use delta_relay::transcript::TracingTranscriptLog;
use delta_relay::upstream::{ReqwestCompletionsClient, UpstreamSettings};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "delta-relay", about = "Streaming completions relay")]
struct Cli {
    /// Path to the delta-relay.yaml config file
    #[arg(long, default_value = "delta-relay.yaml", env = "DELTA_RELAY_CONFIG")]
    config: String,

    /// Port to listen on (overrides server.port)
    #[arg(long, env = "DELTA_RELAY_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .json()
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let source = config::FileSource {
        path: std::path::PathBuf::from(cli.config),
    };
    let config = match config::load_config(&source) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("failed to load config: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        upstream = %config.upstream.url,
        max_response_tokens = config.upstream.max_response_tokens,
        max_input_length = config.limits.max_input_length,
        base_path = %config.server.base_path,
        "config loaded"
    );

    let settings = UpstreamSettings {
        url: config.upstream.url.clone(),
        secret: config.upstream.secret.clone(),
        max_response_tokens: config.upstream.max_response_tokens,
        timeout_ms: config.upstream.timeout_ms,
    };

    let state = proxy::AppState {
        upstream: Arc::new(ReqwestCompletionsClient::new(reqwest::Client::new(), settings)),
        transcripts: Arc::new(TracingTranscriptLog),
        limits: InputLimit {
            max_input_length: config.limits.max_input_length,
        },
        stream_timeout: config.upstream.stream_timeout_ms.map(Duration::from_millis),
    };

    let app = proxy::build_router(state, &config.server.base_path);

    let port = cli.port.unwrap_or(config.server.port);
    let addr = SocketAddr::from((proxy::BIND_IP, port));

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(%addr, "failed to bind: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(%addr, "delta-relay listening");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {e}");
        std::process::exit(1);
    }
}
