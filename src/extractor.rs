//! Key extraction: pattern matching gated by the key store
//!
//! [`Extractor::extract`] is the only path by which a discovered key enters
//! the rest of the pipeline. A key appears in a [`MatchResult`] only when this
//! call was the one that recorded it, so every key is reported once, ever.
//! Keys recorded before a store failure are still handed back alongside the
//! error, since they will never be reported again.

use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::ledger::{KeyStore, LedgerError};
use crate::patterns::{PatternRegistry, Platform};

/// Newly discovered keys grouped by platform, in order of discovery
///
/// Platforms without new keys are absent rather than mapped to an empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MatchResult {
    keys: BTreeMap<Platform, Vec<String>>,
}

impl MatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, platform: Platform, key: impl Into<String>) {
        self.keys.entry(platform).or_default().push(key.into());
    }

    pub fn get(&self, platform: Platform) -> Option<&[String]> {
        self.keys.get(&platform).map(Vec::as_slice)
    }

    pub fn contains(&self, platform: Platform) -> bool {
        self.keys.contains_key(&platform)
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Total number of keys across all platforms
    pub fn total(&self) -> usize {
        self.keys.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Platform, &[String])> {
        self.keys.iter().map(|(p, keys)| (*p, keys.as_slice()))
    }

    /// Append `other`'s keys after this result's, skipping keys already present
    pub fn merge(&mut self, other: MatchResult) {
        for (platform, keys) in other.keys {
            let entry = self.keys.entry(platform).or_default();
            for key in keys {
                if !entry.contains(&key) {
                    entry.push(key);
                }
            }
        }
    }

    /// Human-readable report listing every key, grouped by platform
    pub fn to_message(&self) -> String {
        let mut message = format!("New keys found ({}):", self.total());
        for (platform, keys) in self.iter() {
            let _ = write!(message, "\n{}:", platform);
            for key in keys {
                let _ = write!(message, "\n  {}", key);
            }
        }
        message
    }
}

impl FromIterator<(Platform, String)> for MatchResult {
    fn from_iter<I: IntoIterator<Item = (Platform, String)>>(iter: I) -> Self {
        let mut result = MatchResult::new();
        for (platform, key) in iter {
            result.push(platform, key);
        }
        result
    }
}

/// Keys recorded by one extraction, and the store failure that cut it short
#[derive(Debug, Default)]
pub struct Extraction {
    pub found: MatchResult,
    pub error: Option<LedgerError>,
}

impl Extraction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Merge `other`'s keys; the first store failure seen is kept
    pub fn absorb(&mut self, other: Extraction) {
        self.found.merge(other.found);
        if self.error.is_none() {
            self.error = other.error;
        }
    }
}

/// Runs the pattern registry over text and records what is new
#[derive(Clone)]
pub struct Extractor {
    patterns: Arc<PatternRegistry>,
    store: Arc<dyn KeyStore>,
}

impl Extractor {
    pub fn new(patterns: Arc<PatternRegistry>, store: Arc<dyn KeyStore>) -> Self {
        Self { patterns, store }
    }

    /// Extract keys from `text` and return only those recorded by this call
    ///
    /// A store failure stops the extraction. It is never mistaken for
    /// "already known", and keys recorded before it are still returned.
    pub fn extract(&self, text: &str, source: &str, now: DateTime<Utc>) -> Extraction {
        let mut extraction = Extraction::new();

        'platforms: for platform in self.patterns.platforms() {
            let mut seen = HashSet::new();
            for key in self.patterns.find(platform, text) {
                if !seen.insert(key.clone()) {
                    continue;
                }
                match self.store.try_insert(&key, platform, source, now) {
                    Ok(true) => extraction.found.push(platform, key),
                    Ok(false) => debug!(key, %platform, source, "Skipping known key"),
                    Err(e) => {
                        extraction.error = Some(e);
                        break 'platforms;
                    }
                }
            }
        }

        if !extraction.found.is_empty() {
            info!(source, keys = extraction.found.total(), "New keys extracted");
        }

        extraction
    }
}
