use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::{Channel, NotifyError, Result};

/// Telegram Bot API `sendMessage`
pub struct TelegramChannel {
    client: Client,
    token: String,
    chat_id: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramChannel {
    pub fn new(token: String, chat_id: String, api_base: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Misconfigured(e.to_string()))?;

        Ok(Self {
            client,
            token,
            chat_id,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.token)
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn deliver(&self, message: &str) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint())
            .json(&json!({ "chat_id": self.chat_id, "text": message }))
            .send()
            .await
            // reqwest errors embed the URL, which carries the bot token
            .map_err(|e| NotifyError::RequestFailed(e.without_url().to_string()))?;

        let status = response.status();
        let body: ApiResponse = response.json().await.map_err(|_| {
            NotifyError::Rejected(format!("HTTP {} with unreadable body", status.as_u16()))
        })?;

        if !body.ok {
            return Err(NotifyError::Rejected(
                body.description
                    .unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
            ));
        }

        Ok(())
    }
}
