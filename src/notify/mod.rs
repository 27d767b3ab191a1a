//! Multi-channel notification fan-out
//!
//! Each configured channel is attempted exactly once per [`Notifier::send`],
//! in configuration order. A failing channel is recorded in the returned
//! [`DeliveryReport`] and never stops delivery on the others.

mod email;
mod telegram;
mod webhook;

pub use email::EmailChannel;
pub use telegram::TelegramChannel;
pub use webhook::WebhookChannel;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::NotifyConfig;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Delivery request failed: {0}")]
    RequestFailed(String),

    #[error("Channel rejected message: {0}")]
    Rejected(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("SMTP error: {0}")]
    Smtp(String),

    #[error("Channel misconfigured: {0}")]
    Misconfigured(String),
}

pub type Result<T> = std::result::Result<T, NotifyError>;

/// One notification delivery mechanism
#[async_trait]
pub trait Channel: Send + Sync {
    /// Short name used in logs and reports
    fn name(&self) -> &str;

    /// Deliver a message once, without retrying
    async fn deliver(&self, message: &str) -> Result<()>;
}

/// Outcome of one channel within a send
#[derive(Debug)]
pub struct ChannelOutcome {
    pub channel: String,
    pub result: Result<()>,
}

impl ChannelOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-channel results of a single [`Notifier::send`]
#[derive(Debug, Default)]
pub struct DeliveryReport {
    pub outcomes: Vec<ChannelOutcome>,
}

impl DeliveryReport {
    pub fn delivered(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.delivered()
    }

    /// True when at least one channel was configured and none succeeded
    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty() && self.delivered() == 0
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// Fans messages out to every configured channel
#[derive(Clone, Default)]
pub struct Notifier {
    channels: Vec<Arc<dyn Channel>>,
}

impl Notifier {
    pub fn new(channels: Vec<Arc<dyn Channel>>) -> Self {
        Self { channels }
    }

    /// Build channels from configuration
    ///
    /// Sections that are absent simply produce no channel. Channels that
    /// cannot be constructed are logged and skipped.
    pub fn from_config(config: &NotifyConfig, timeout: Duration) -> Self {
        let mut channels: Vec<Arc<dyn Channel>> = Vec::new();

        if let Some(url) = &config.webhook_url {
            match WebhookChannel::new(url.clone(), timeout) {
                Ok(channel) => channels.push(Arc::new(channel)),
                Err(e) => warn!(error = %e, "Webhook channel disabled"),
            }
        }

        if let Some(telegram) = &config.telegram {
            match &telegram.bot_token {
                Some(token) => match TelegramChannel::new(
                    token.clone(),
                    telegram.chat_id.clone(),
                    telegram.api_base.clone(),
                    timeout,
                ) {
                    Ok(channel) => channels.push(Arc::new(channel)),
                    Err(e) => warn!(error = %e, "Telegram channel disabled"),
                },
                None => warn!("Telegram configured without bot token, channel disabled"),
            }
        }

        if let Some(email) = &config.email {
            match &email.password {
                Some(password) => channels.push(Arc::new(EmailChannel::new(
                    email.smtp_server.clone(),
                    email.port,
                    email.sender.clone(),
                    password.clone(),
                    email.recipient.clone(),
                    timeout,
                ))),
                None => warn!("Email configured without SMTP password, channel disabled"),
            }
        }

        if channels.is_empty() {
            warn!("No notification channels configured; discoveries will only be logged");
        } else {
            let names: Vec<&str> = channels.iter().map(|c| c.name()).collect();
            info!(channels = ?names, "Notification channels ready");
        }

        Self { channels }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Attempt delivery on every channel once; never fails as a whole
    pub async fn send(&self, message: &str) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        for channel in &self.channels {
            let result = channel.deliver(message).await;
            match &result {
                Ok(()) => info!(channel = channel.name(), "Notification delivered"),
                Err(e) => warn!(channel = channel.name(), error = %e, "Notification failed"),
            }
            report.outcomes.push(ChannelOutcome {
                channel: channel.name().to_string(),
                result,
            });
        }

        report
    }
}
