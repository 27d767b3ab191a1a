use super::models::Config;
use reqwest::Url;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid {field} URL '{value}': {reason}")]
    InvalidUrl {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Pacing floor must be positive")]
    ZeroFloor,

    #[error("Pacing bounds out of order: floor {floor} <= initial {initial} <= ceiling {ceiling} required")]
    PacingOutOfOrder {
        floor: String,
        initial: String,
        ceiling: String,
    },

    #[error("speedup_factor must be in (0, 1), got {0}")]
    InvalidSpeedupFactor(f64),

    #[error("backoff_factor must be >= 1, got {0}")]
    InvalidBackoffFactor(f64),

    #[error("max_attempts must be at least 1")]
    ZeroMaxAttempts,

    #[error("No platforms enabled")]
    NoPlatforms,

    #[error("social.max_results must be within 10..=100, got {0}")]
    InvalidMaxResults(u32),

    #[error("{channel} channel configured but {secret} is not set")]
    MissingSecret {
        channel: &'static str,
        secret: &'static str,
    },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_scan(config)?;
    validate_social(config)?;
    validate_notify(config)?;
    validate_pacing(config)?;
    Ok(())
}

fn check_url(field: &str, value: &str) -> Result<(), ValidationError> {
    Url::parse(value)
        .map(|_| ())
        .map_err(|e| ValidationError::InvalidUrl {
            field: field.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })
}

/// Sites and proxies must be absolute URLs
fn validate_scan(config: &Config) -> Result<(), ValidationError> {
    for site in &config.scan.sites {
        check_url("site", site)?;
    }

    for proxy in &config.scan.proxies {
        check_url("proxy", proxy)?;
    }

    if config.scan.max_attempts == 0 {
        return Err(ValidationError::ZeroMaxAttempts);
    }

    if config.scan.platforms.is_empty() {
        return Err(ValidationError::NoPlatforms);
    }

    Ok(())
}

/// A missing bearer token is allowed: social search just stays off
fn validate_social(config: &Config) -> Result<(), ValidationError> {
    let max_results = config.social.max_results;
    if !(10..=100).contains(&max_results) {
        return Err(ValidationError::InvalidMaxResults(max_results));
    }

    check_url("social api_base", &config.social.api_base)
}

/// Channels that are present must be complete
fn validate_notify(config: &Config) -> Result<(), ValidationError> {
    if let Some(url) = &config.notify.webhook_url {
        check_url("webhook", url)?;
    }

    if let Some(telegram) = &config.notify.telegram {
        if telegram.bot_token.is_none() {
            return Err(ValidationError::MissingSecret {
                channel: "telegram",
                secret: "TELEGRAM_BOT_TOKEN",
            });
        }
        check_url("telegram api_base", &telegram.api_base)?;
    }

    if let Some(email) = &config.notify.email {
        if email.password.is_none() {
            return Err(ValidationError::MissingSecret {
                channel: "email",
                secret: "SMTP_PASSWORD",
            });
        }
    }

    Ok(())
}

fn validate_pacing(config: &Config) -> Result<(), ValidationError> {
    let pacing = &config.pacing;

    if pacing.floor.as_duration().is_zero() {
        return Err(ValidationError::ZeroFloor);
    }

    if !(pacing.floor <= pacing.initial && pacing.initial <= pacing.ceiling) {
        return Err(ValidationError::PacingOutOfOrder {
            floor: pacing.floor.to_string(),
            initial: pacing.initial.to_string(),
            ceiling: pacing.ceiling.to_string(),
        });
    }

    if !(pacing.speedup_factor > 0.0 && pacing.speedup_factor < 1.0) {
        return Err(ValidationError::InvalidSpeedupFactor(pacing.speedup_factor));
    }

    if !(pacing.backoff_factor >= 1.0) || !pacing.backoff_factor.is_finite() {
        return Err(ValidationError::InvalidBackoffFactor(pacing.backoff_factor));
    }

    Ok(())
}
