//! Web page scanner

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use chrono::Utc;
use scraper::{Html, Selector};
use tracing::{info, warn};

use super::http::{HttpClient, HttpConfig};
use crate::extractor::{Extraction, Extractor};
use crate::proxy::{ProxyEndpoint, ProxyManager};

static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("link selector is valid"));

/// Fetches pages and feeds their text and link targets to the extractor
///
/// HTTP clients are built once: one per proxy endpoint, or a single direct
/// client when the pool is empty. Connection pools are reused across cycles.
pub struct WebScanner {
    extractor: Arc<Extractor>,
    proxies: Arc<ProxyManager>,
    direct: Option<HttpClient>,
    proxied: HashMap<ProxyEndpoint, HttpClient>,
}

impl WebScanner {
    pub fn new(extractor: Arc<Extractor>, proxies: Arc<ProxyManager>, http: HttpConfig) -> Self {
        let mut proxied = HashMap::new();
        for endpoint in proxies.endpoints() {
            match HttpClient::new(http.clone(), Some(endpoint)) {
                Ok(client) => {
                    proxied.insert(endpoint.clone(), client);
                }
                Err(e) => warn!(proxy = %endpoint.uri, error = %e, "Proxy unusable, pages routed to it are skipped"),
            }
        }

        let direct = if proxies.is_empty() {
            HttpClient::new(http, None)
                .inspect_err(|e| warn!(error = %e, "Could not build direct HTTP client"))
                .ok()
        } else {
            None
        };

        Self {
            extractor,
            proxies,
            direct,
            proxied,
        }
    }

    fn client_for(&self, proxy: Option<&ProxyEndpoint>) -> Option<&HttpClient> {
        match proxy {
            Some(endpoint) => self.proxied.get(endpoint),
            None => self.direct.as_ref(),
        }
    }

    /// Scan one page for new keys
    ///
    /// Fetch failures of any kind yield an empty extraction; only key store
    /// failures are reported, alongside any keys recorded before them.
    pub async fn scan(&self, url: &str) -> Extraction {
        let proxy = self.proxies.get();

        let Some(client) = self.client_for(proxy.as_ref()) else {
            warn!(url, proxy = proxy.as_ref().map(|p| p.uri.as_str()), "No HTTP client available");
            return Extraction::new();
        };

        let body = match client.fetch_text(url).await {
            Ok(body) => body,
            Err(e) => {
                warn!(
                    url,
                    proxy = proxy.as_ref().map(|p| p.uri.as_str()),
                    error = %e,
                    "Page fetch failed"
                );
                return Extraction::new();
            }
        };

        let candidate = candidate_text(&body);
        let extraction = self.extractor.extract(&candidate, url, Utc::now());

        info!(url, keys = extraction.found.total(), "Page scanned");
        extraction
    }
}

/// Document text followed by every hyperlink target, one per line
pub fn candidate_text(body: &str) -> String {
    let document = Html::parse_document(body);

    let mut text: String = document.root_element().text().collect();
    for link in document.select(&LINK_SELECTOR) {
        if let Some(href) = link.value().attr("href") {
            text.push('\n');
            text.push_str(href);
        }
    }

    text
}
