//! Social search scanner
//!
//! Queries a recent-posts search API for the configured terms and runs each
//! post body through the extractor. A missing or failing client is a
//! degraded mode, never an error.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::extractor::{Extraction, Extractor};

pub const SOURCE_TAG: &str = "x-search";
pub const DEFAULT_API_BASE: &str = "https://api.twitter.com";

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search request failed: {0}")]
    RequestFailed(String),

    #[error("Search API rejected credentials (HTTP {0})")]
    Unauthorized(u16),

    #[error("Search API rate limited")]
    RateLimited,

    #[error("Search API returned HTTP {0}")]
    BadStatus(u16),

    #[error("Malformed search response: {0}")]
    Decode(String),
}

/// A post returned by a search
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Post {
    pub id: String,
    pub text: String,
}

/// Recent-posts search backend
#[async_trait]
pub trait SearchClient: Send + Sync {
    async fn recent_posts(&self, query: &str) -> std::result::Result<Vec<Post>, SearchError>;
}

/// Build the search query: `(term1 OR term2 ...) -is:retweet`
pub fn build_query(terms: &[String]) -> String {
    let joined = terms
        .iter()
        .map(|term| {
            if term.contains(' ') {
                format!("\"{}\"", term)
            } else {
                term.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" OR ");
    format!("({}) -is:retweet", joined)
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Post>,
}

/// X (Twitter) API v2 recent search client
pub struct XSearchClient {
    client: Client,
    api_base: String,
    bearer_token: String,
    max_results: u32,
}

impl XSearchClient {
    pub fn new(
        bearer_token: impl Into<String>,
        api_base: impl Into<String>,
        max_results: u32,
        timeout: Duration,
    ) -> std::result::Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            bearer_token: bearer_token.into(),
            max_results,
        })
    }
}

#[async_trait]
impl SearchClient for XSearchClient {
    async fn recent_posts(&self, query: &str) -> std::result::Result<Vec<Post>, SearchError> {
        let url = format!("{}/2/tweets/search/recent", self.api_base);
        let max_results = self.max_results.to_string();

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.bearer_token)
            .query(&[("query", query), ("max_results", max_results.as_str())])
            .send()
            .await
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?;

        let status = response.status();
        match status.as_u16() {
            401 | 403 => return Err(SearchError::Unauthorized(status.as_u16())),
            429 => return Err(SearchError::RateLimited),
            _ if !status.is_success() => return Err(SearchError::BadStatus(status.as_u16())),
            _ => {}
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Decode(e.to_string()))?;

        debug!(posts = body.data.len(), "Search completed");
        Ok(body.data)
    }
}

/// Scans recent social posts for new keys
pub struct SocialScanner {
    extractor: Arc<Extractor>,
    client: Option<Arc<dyn SearchClient>>,
    query: String,
}

impl SocialScanner {
    pub fn new(
        extractor: Arc<Extractor>,
        client: Option<Arc<dyn SearchClient>>,
        terms: &[String],
    ) -> Self {
        Self {
            extractor,
            client,
            query: build_query(terms),
        }
    }

    /// Scanner with no search client; every scan is empty
    pub fn disabled(extractor: Arc<Extractor>) -> Self {
        Self {
            extractor,
            client: None,
            query: String::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    /// Search once and extract keys from every returned post
    ///
    /// A store failure stops at the post it occurred in; keys recorded from
    /// earlier posts are kept in the returned extraction.
    pub async fn scan(&self) -> Extraction {
        let Some(client) = &self.client else {
            debug!("Social search not configured, skipping");
            return Extraction::new();
        };

        let posts = match client.recent_posts(&self.query).await {
            Ok(posts) => posts,
            Err(e) => {
                warn!(error = %e, "Social search failed");
                return Extraction::new();
            }
        };

        let mut extraction = Extraction::new();
        let now = Utc::now();
        for post in &posts {
            let source = format!("{}/{}", SOURCE_TAG, post.id);
            extraction.absorb(self.extractor.extract(&post.text, &source, now));
            if !extraction.is_complete() {
                break;
            }
        }

        info!(
            posts = posts.len(),
            keys = extraction.found.total(),
            "Social search scanned"
        );
        extraction
    }
}
