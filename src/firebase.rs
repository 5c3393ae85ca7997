use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::FirebaseConfig;

/// Record written for every relayed group message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedMessage {
    pub message: String,
    /// Unix seconds
    pub timestamp: i64,
}

impl PersistedMessage {
    pub fn now(message: &str) -> Self {
        Self {
            message: message.to_string(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Where relayed chat messages end up
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn save_message(&self, message: &str) -> Result<()>;
}

/// Realtime Database REST client authenticated with the database secret
pub struct FirebaseClient {
    client: reqwest::Client,
    config: FirebaseConfig,
}

impl FirebaseClient {
    pub fn new(config: FirebaseConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn record_url(&self) -> String {
        format!(
            "{}/{}.json",
            self.config.base_url.trim_end_matches('/'),
            self.config.path.trim_matches('/')
        )
    }

    /// Replace the record at the configured path.
    pub async fn set(&self, record: &PersistedMessage) -> Result<()> {
        let url = self.record_url();
        debug!("Writing message to Firebase: {}", url);

        let mut request = self.client.put(&url).json(record);
        if !self.config.secret.is_empty() {
            request = request.query(&[("auth", self.config.secret.as_str())]);
        }

        let response = request
            .send()
            .await
            .context("Failed to send request to Firebase")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Firebase API error ({}): {}", status, error_body);
        }

        info!("Saved message to Firebase at {}", self.config.path);
        Ok(())
    }
}

#[async_trait]
impl MessageSink for FirebaseClient {
    async fn save_message(&self, message: &str) -> Result<()> {
        self.set(&PersistedMessage::now(message)).await
    }
}
