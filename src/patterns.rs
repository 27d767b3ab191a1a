//! Platform key formats and the registry that matches them
//!
//! Every supported platform issues keys as groups of uppercase alphanumerics
//! joined by hyphens. Matching is format-only: nothing here knows whether a
//! key is redeemable.
//!
//! Text is first split into candidate tokens (maximal hyphen-joined runs of
//! ASCII alphanumerics). Each token is then walked segment by segment, trying
//! the longest shape first, so keys glued to a slug (`steam-key-ABCDE-...`)
//! are still found. A window only matches when the segments on either side
//! could not extend it, which keeps a Steam-shaped slice of an Xbox key from
//! being reported as a Steam key.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

static CANDIDATE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9]+(?:-[A-Za-z0-9]+)*").expect("candidate token pattern is valid")
});

/// Platforms whose key formats are recognised
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Steam,
    Xbox,
    #[serde(alias = "psn")]
    PlayStation,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Steam, Platform::Xbox, Platform::PlayStation];

    pub fn shape(self) -> KeyShape {
        match self {
            Platform::Steam => KeyShape::new(3, 5),
            Platform::Xbox => KeyShape::new(5, 5),
            Platform::PlayStation => KeyShape::new(3, 4),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Steam => "Steam",
            Platform::Xbox => "Xbox",
            Platform::PlayStation => "PlayStation",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Segment layout of a key: `segments` groups of `segment_len` characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyShape {
    pub segments: usize,
    pub segment_len: usize,
}

impl KeyShape {
    pub const fn new(segments: usize, segment_len: usize) -> Self {
        Self {
            segments,
            segment_len,
        }
    }

    /// Pattern accepting a single segment of this shape
    pub fn segment_pattern(&self) -> String {
        format!("^[A-Z0-9]{{{}}}$", self.segment_len)
    }

    fn key_len(&self) -> usize {
        self.segments * self.segment_len
    }
}

#[derive(Debug, Clone)]
struct ShapeMatcher {
    platform: Platform,
    shape: KeyShape,
    segment: Regex,
}

impl ShapeMatcher {
    /// Whether `parts[start..start + segments]` is a complete key of this shape
    fn matches_at(&self, parts: &[&str], start: usize) -> bool {
        let end = start + self.shape.segments;
        if end > parts.len() {
            return false;
        }

        let window = parts[start..end].iter().all(|p| self.segment.is_match(p));
        let open_before = start == 0 || !self.segment.is_match(parts[start - 1]);
        let open_after = parts.get(end).is_none_or(|p| !self.segment.is_match(p));

        window && open_before && open_after
    }
}

/// Key matchers for every known shape, reporting only enabled platforms
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    enabled: BTreeSet<Platform>,
    /// All shapes, longest key first
    shapes: Vec<ShapeMatcher>,
}

impl PatternRegistry {
    /// Registry with every known platform enabled
    pub fn new() -> Self {
        Self::with_platforms(Platform::ALL)
    }

    pub fn with_platforms(platforms: impl IntoIterator<Item = Platform>) -> Self {
        let mut shapes: Vec<ShapeMatcher> = Platform::ALL
            .into_iter()
            .map(|platform| {
                let shape = platform.shape();
                let segment =
                    Regex::new(&shape.segment_pattern()).expect("key shapes always compile");
                ShapeMatcher {
                    platform,
                    shape,
                    segment,
                }
            })
            .collect();
        shapes.sort_by_key(|m| std::cmp::Reverse(m.shape.key_len()));

        Self {
            enabled: platforms.into_iter().collect(),
            shapes,
        }
    }

    /// Enabled platforms in stable order
    pub fn platforms(&self) -> impl Iterator<Item = Platform> + '_ {
        self.enabled.iter().copied()
    }

    /// Every non-overlapping key of `platform` in `text`, in order of occurrence
    ///
    /// Returns an empty list for platforms that are not enabled.
    pub fn find(&self, platform: Platform, text: &str) -> Vec<String> {
        if !self.enabled.contains(&platform) {
            return Vec::new();
        }

        let mut keys = Vec::new();
        for token in CANDIDATE_TOKEN.find_iter(text) {
            self.scan_token(token.as_str(), |found, key| {
                if found == platform {
                    keys.push(key);
                }
            });
        }
        keys
    }

    /// Walk one token's segments, consuming each key that matches
    ///
    /// Shapes of disabled platforms still consume their segments so their
    /// slices are never reported under another platform.
    fn scan_token(&self, token: &str, mut emit: impl FnMut(Platform, String)) {
        let parts: Vec<&str> = token.split('-').collect();
        let mut start = 0;

        while start < parts.len() {
            let matched = self.shapes.iter().find(|m| m.matches_at(&parts, start));
            match matched {
                Some(m) => {
                    let end = start + m.shape.segments;
                    emit(m.platform, parts[start..end].join("-"));
                    start = end;
                }
                None => start += 1,
            }
        }
    }
}

impl Default for PatternRegistry {
    fn default() -> Self {
        Self::new()
    }
}
