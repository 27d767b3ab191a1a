use crate::humanize::HumanDuration;
use crate::patterns::Platform;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub social: SocialConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
}

/// Key store location
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("data/keys")
}

/// Web scanning: what to fetch and how
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScanConfig {
    #[serde(default)]
    pub sites: Vec<String>,
    /// Proxy URIs used in rotation; empty means direct connections
    #[serde(default)]
    pub proxies: Vec<String>,
    #[serde(default = "default_platforms")]
    pub platforms: Vec<Platform>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: HumanDuration,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: HumanDuration,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            sites: Vec::new(),
            proxies: Vec::new(),
            platforms: default_platforms(),
            user_agent: default_user_agent(),
            connect_timeout: default_connect_timeout(),
            request_timeout: default_request_timeout(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_platforms() -> Vec<Platform> {
    Platform::ALL.to_vec()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (compatible; keysweep/0.1)".to_string()
}

fn default_connect_timeout() -> HumanDuration {
    HumanDuration::from_secs(10)
}

fn default_request_timeout() -> HumanDuration {
    HumanDuration::from_secs(30)
}

fn default_max_attempts() -> u32 {
    2
}

/// Social search configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SocialConfig {
    #[serde(default = "default_terms")]
    pub terms: Vec<String>,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    #[serde(default = "default_social_api_base")]
    pub api_base: String,
    /// Search API bearer token (loaded from environment, not from config file)
    #[serde(skip)]
    pub bearer_token: Option<String>,
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            terms: default_terms(),
            max_results: default_max_results(),
            api_base: default_social_api_base(),
            bearer_token: None,
        }
    }
}

fn default_terms() -> Vec<String> {
    vec![
        "steam key".to_string(),
        "free game key".to_string(),
        "xbox code".to_string(),
        "psn code".to_string(),
    ]
}

fn default_max_results() -> u32 {
    50
}

fn default_social_api_base() -> String {
    crate::scanner::social::DEFAULT_API_BASE.to_string()
}

/// Notification channels; absent sections are simply not used
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NotifyConfig {
    pub webhook_url: Option<String>,
    pub telegram: Option<TelegramConfig>,
    pub email: Option<EmailConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramConfig {
    pub chat_id: String,
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
    /// Bot token (loaded from environment, not from config file)
    #[serde(skip)]
    pub bot_token: Option<String>,
}

pub fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmailConfig {
    pub smtp_server: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub sender: String,
    pub recipient: String,
    /// SMTP password (loaded from environment, not from config file)
    #[serde(skip)]
    pub password: Option<String>,
}

fn default_smtp_port() -> u16 {
    587
}

/// Adaptive scan interval bounds and adjustment factors
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct PacingConfig {
    #[serde(default = "default_initial")]
    pub initial: HumanDuration,
    #[serde(default = "default_floor")]
    pub floor: HumanDuration,
    #[serde(default = "default_ceiling")]
    pub ceiling: HumanDuration,
    /// Multiplier applied after a cycle that found keys (0 < f < 1)
    #[serde(default = "default_speedup_factor")]
    pub speedup_factor: f64,
    /// Multiplier applied after a quiet cycle (>= 1; 1 holds the interval)
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            initial: default_initial(),
            floor: default_floor(),
            ceiling: default_ceiling(),
            speedup_factor: default_speedup_factor(),
            backoff_factor: default_backoff_factor(),
        }
    }
}

fn default_initial() -> HumanDuration {
    HumanDuration::from_secs(300)
}

fn default_floor() -> HumanDuration {
    HumanDuration::from_secs(60)
}

fn default_ceiling() -> HumanDuration {
    HumanDuration::from_secs(900)
}

fn default_speedup_factor() -> f64 {
    0.8
}

fn default_backoff_factor() -> f64 {
    1.2
}
