//! Key sources
//!
//! Both scanners swallow transport failures (returning an empty
//! [`MatchResult`](crate::extractor::MatchResult)) and surface only key
//! store failures, so a flaky source never stops the scan loop.

pub mod http;
pub mod social;
pub mod web;

pub use http::{FetchError, HttpClient, HttpConfig};
pub use social::{Post, SearchClient, SearchError, SocialScanner, XSearchClient, build_query};
pub use web::{WebScanner, candidate_text};
