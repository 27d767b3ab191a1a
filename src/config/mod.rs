//! Runtime configuration
//!
//! Settings are layered: struct defaults, then `config/keysweep.toml` (or the
//! file named by `KEYSWEEP_CONFIG`), then `KEYSWEEP__<SECTION>__<KEY>`
//! environment variables.
//!
//! ```no_run
//! use keysweep::config::Config;
//!
//! let config = Config::load()?;
//! println!("Scanning {} sites", config.scan.sites.len());
//! # Ok::<(), keysweep::config::ConfigError>(())
//! ```
//!
//! Examples:
//! - `KEYSWEEP__PACING__FLOOR=30s`
//! - `KEYSWEEP__SCAN__SITES=https://a.example/free,https://b.example/keys`
//! - `KEYSWEEP__STORE__PATH=/var/lib/keysweep`
//!
//! Secrets are read only from the environment: `X_BEARER_TOKEN`,
//! `TELEGRAM_BOT_TOKEN`, `SMTP_PASSWORD` and optionally `DISCORD_WEBHOOK_URL`.

mod models;
mod sources;
mod validation;

pub use crate::humanize::HumanDuration;
pub use models::{
    Config, EmailConfig, NotifyConfig, PacingConfig, ScanConfig, SocialConfig, StoreConfig,
    TelegramConfig, default_telegram_api_base,
};
pub use validation::ValidationError;

use thiserror::Error;

use crate::scanner::HttpConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load, attach secrets, and validate
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed or
    /// validation fails (bad URLs, pacing bounds, missing secrets).
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load from an explicit file; secrets are left unset
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// HTTP settings for the web scanner
    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            connect_timeout: self.scan.connect_timeout.as_duration(),
            request_timeout: self.scan.request_timeout.as_duration(),
            max_attempts: self.scan.max_attempts,
            user_agent: self.scan.user_agent.clone(),
            ..HttpConfig::default()
        }
    }
}
