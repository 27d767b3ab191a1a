use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::patterns::Platform;

/// Redemption status of a discovered key
///
/// The scanner only ever writes `Unclaimed`; the transition to `Claimed` is
/// made by whoever consumes the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStatus {
    #[default]
    Unclaimed,
    Claimed,
}

impl fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyStatus::Unclaimed => f.write_str("unclaimed"),
            KeyStatus::Claimed => f.write_str("claimed"),
        }
    }
}

/// A key as persisted on first sighting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    pub key: String,
    pub platform: Platform,
    /// URL or social tag the key was found at
    pub source: String,
    pub discovered_at: DateTime<Utc>,
    #[serde(default)]
    pub status: KeyStatus,
}

impl KeyRecord {
    pub fn new(
        key: impl Into<String>,
        platform: Platform,
        source: impl Into<String>,
        discovered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key: key.into(),
            platform,
            source: source.into(),
            discovered_at,
            status: KeyStatus::Unclaimed,
        }
    }
}
