pub mod webhook;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::LineConfig;

/// LINE rejects text messages longer than this.
pub const MAX_TEXT_LEN: usize = 5000;
/// Upper bound on messages in a single push or reply request.
pub const MAX_MESSAGES_PER_REQUEST: usize = 5;

/// Outbound side of the chat platform
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send `text` to `to` (a user, group or room id) without a prior event
    async fn push_text(&self, to: &str, text: &str) -> Result<()>;

    /// Answer an inbound event using its single-use reply token
    async fn reply_text(&self, reply_token: &str, text: &str) -> Result<()>;
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
enum OutgoingMessage {
    Text { text: String },
}

#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    messages: Vec<OutgoingMessage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: Vec<OutgoingMessage>,
}

/// Split long messages for LINE's per-message limit
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        // Walk back to a valid UTF-8 char boundary so slicing doesn't panic
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        let actual_end = if end < text.len() {
            text[start..end]
                .rfind('\n')
                .or_else(|| text[start..end].rfind(' '))
                .map(|pos| start + pos + 1)
                .unwrap_or(end)
        } else {
            end
        };

        chunks.push(text[start..actual_end].to_string());
        start = actual_end;
    }

    chunks
}

fn text_messages(text: &str) -> Vec<OutgoingMessage> {
    let mut chunks = split_message(text, MAX_TEXT_LEN);
    if chunks.len() > MAX_MESSAGES_PER_REQUEST {
        warn!(
            "Text split into {} messages, dropping all but the first {}",
            chunks.len(),
            MAX_MESSAGES_PER_REQUEST
        );
        chunks.truncate(MAX_MESSAGES_PER_REQUEST);
    }
    chunks
        .into_iter()
        .map(|text| OutgoingMessage::Text { text })
        .collect()
}

/// Messaging API client
pub struct LineClient {
    client: reqwest::Client,
    config: LineConfig,
}

impl LineClient {
    pub fn new(config: LineConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &T,
        retry_key: Option<String>,
    ) -> Result<()> {
        let url = format!(
            "{}/v2/bot/message/{}",
            self.config.api_base_url.trim_end_matches('/'),
            endpoint
        );

        debug!("Sending request to LINE: {}", url);

        let mut request = self
            .client
            .post(&url)
            .bearer_auth(&self.config.channel_token)
            .json(body);
        if let Some(key) = retry_key {
            request = request.header("X-Line-Retry-Key", key);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to send {} request to LINE", endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("LINE API error ({}): {}", status, error_body);
        }

        Ok(())
    }
}

#[async_trait]
impl Messenger for LineClient {
    async fn push_text(&self, to: &str, text: &str) -> Result<()> {
        let request = PushRequest {
            to,
            messages: text_messages(text),
        };
        let retry_key = uuid::Uuid::new_v4().to_string();
        self.post("push", &request, Some(retry_key)).await
    }

    async fn reply_text(&self, reply_token: &str, text: &str) -> Result<()> {
        let request = ReplyRequest {
            reply_token,
            messages: text_messages(text),
        };
        self.post("reply", &request, None).await
    }
}
