use chrono::{DateTime, Utc};

use crate::patterns::Platform;

use super::error::Result;

/// Durable set of every key ever seen
///
/// `try_insert` is the only way to record a key and is the dedup decision
/// itself: it must be atomic against concurrent callers, so that of any
/// number of racing inserts for one key text exactly one returns `true`.
/// Storage failures are reported as errors, never as `false`.
pub trait KeyStore: Send + Sync {
    /// Persist a new unclaimed record unless `key` is already known
    fn try_insert(
        &self,
        key: &str,
        platform: Platform,
        source: &str,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    /// Read-only existence check
    fn exists(&self, key: &str) -> Result<bool>;
}
