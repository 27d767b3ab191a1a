use std::env;
use std::path::PathBuf;

use config::{ConfigError, Environment, File};

use super::models::Config;

const CONFIG_ENV_VAR: &str = "KEYSWEEP_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/keysweep.toml";
const ENV_PREFIX: &str = "KEYSWEEP";
const ENV_SEPARATOR: &str = "__";

/// Fields that accept comma separated lists from the environment
const LIST_KEYS: [&str; 4] = ["scan.sites", "scan.proxies", "scan.platforms", "social.terms"];

/// Build the runtime configuration
///
/// Later layers win: struct defaults, the TOML file, `.env`, then the
/// process environment. Secrets are attached last.
pub fn load() -> Result<Config, ConfigError> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            tracing::warn!(error = %e, "Ignoring unreadable .env file");
        }
    }

    let path = env::var_os(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut config = load_from_sources(path)?;
    apply_secrets(&mut config);
    Ok(config)
}

/// Credentials only ever come from the environment
fn apply_secrets(config: &mut Config) {
    config.social.bearer_token = env::var("X_BEARER_TOKEN").ok();

    if let Some(telegram) = config.notify.telegram.as_mut() {
        telegram.bot_token = env::var("TELEGRAM_BOT_TOKEN").ok();
    }

    if let Some(email) = config.notify.email.as_mut() {
        email.password = env::var("SMTP_PASSWORD").ok();
    }

    // A webhook URL is its own credential; the file value takes precedence
    if config.notify.webhook_url.is_none() {
        config.notify.webhook_url = env::var("DISCORD_WEBHOOK_URL").ok();
    }
}

/// File and environment layers, without secrets
pub fn load_from_sources(path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if path.exists() {
        tracing::info!(path = %path.display(), "Reading configuration file");
        builder = builder.add_source(File::from(path).required(false));
    } else {
        tracing::warn!(
            path = %path.display(),
            "No configuration file, falling back to defaults and environment"
        );
    }

    // KEYSWEEP__PACING__FLOOR=30s sets pacing.floor
    let mut environment = Environment::with_prefix(ENV_PREFIX)
        .separator(ENV_SEPARATOR)
        .list_separator(",")
        .try_parsing(true);
    for key in LIST_KEYS {
        environment = environment.with_list_parse_key(key);
    }

    builder.add_source(environment).build()?.try_deserialize()
}
