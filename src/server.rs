//! HTTP surface: health check, voice assistant inbound, LINE webhook.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::RelayError;
use crate::line::webhook::{self, SIGNATURE_HEADER};
use crate::relay::Relay;

#[derive(Debug, Deserialize)]
struct VoiceMessage {
    text: String,
}

pub fn router(relay: Arc<Relay>) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/googlehome/in", post(handle_voice_message))
        .route("/googlehome/out", post(handle_line_webhook))
        .route("/line/webhook", post(handle_line_webhook))
        .with_state(relay)
}

/// Serve until the process receives Ctrl-C.
pub async fn serve(relay: Arc<Relay>, bind_addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {bind_addr}"))?;

    info!("Listening on {}", bind_addr);

    axum::serve(listener, router(relay))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("Server error")?;

    Ok(())
}

async fn ping() -> &'static str {
    "pong"
}

async fn handle_voice_message(
    State(relay): State<Arc<Relay>>,
    body: Bytes,
) -> Result<StatusCode, RelayError> {
    let msg: VoiceMessage = serde_json::from_slice(&body).map_err(RelayError::Decode)?;
    relay.forward_voice_message(&msg.text).await?;
    Ok(StatusCode::OK)
}

async fn handle_line_webhook(
    State(relay): State<Arc<Relay>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, RelayError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let parsed = webhook::parse_request(&relay.config().line.channel_secret, &body, signature)?;
    debug!(
        "Webhook for {:?} with {} event(s)",
        parsed.destination,
        parsed.events.len()
    );

    relay.handle_events(parsed.events).await?;
    Ok(StatusCode::OK)
}
