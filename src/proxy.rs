//! Round-robin proxy rotation for outbound fetches

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Proxy endpoint information
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProxyEndpoint {
    pub uri: String,
}

impl ProxyEndpoint {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }
}

/// Hands out proxies from a fixed pool in rotation
///
/// The cursor is atomic, so scanners running concurrently still walk the
/// pool in order instead of piling onto one endpoint.
#[derive(Debug, Default)]
pub struct ProxyManager {
    pool: Vec<ProxyEndpoint>,
    next: AtomicUsize,
}

impl ProxyManager {
    pub fn new(pool: Vec<ProxyEndpoint>) -> Self {
        Self {
            pool,
            next: AtomicUsize::new(0),
        }
    }

    pub fn from_uris<I, S>(uris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(uris.into_iter().map(ProxyEndpoint::new).collect())
    }

    /// Next proxy in rotation, or `None` when the pool is empty (direct connection)
    pub fn get(&self) -> Option<ProxyEndpoint> {
        if self.pool.is_empty() {
            return None;
        }

        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.pool.len();
        let proxy = self.pool[idx].clone();
        debug!(idx, proxy = %proxy.uri, "Proxy selected");
        Some(proxy)
    }

    /// Every endpoint in rotation order
    pub fn endpoints(&self) -> &[ProxyEndpoint] {
        &self.pool
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_empty_pool_returns_none() {
        let manager = ProxyManager::new(vec![]);
        for _ in 0..5 {
            assert!(manager.get().is_none());
        }
    }

    #[test]
    fn test_rotates_proxies() {
        let manager = ProxyManager::from_uris(["http://p1:8080", "http://p2:8080", "http://p3:8080"]);

        let seen: HashSet<String> = (0..20).filter_map(|_| manager.get()).map(|p| p.uri).collect();

        assert!(seen.len() >= 2);
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_round_robin_order() {
        let manager = ProxyManager::from_uris(["http://a:1", "http://b:2"]);
        let order: Vec<String> = (0..4).filter_map(|_| manager.get()).map(|p| p.uri).collect();
        assert_eq!(order, vec!["http://a:1", "http://b:2", "http://a:1", "http://b:2"]);
    }

    #[test]
    fn test_concurrent_callers_share_rotation() {
        let manager = Arc::new(ProxyManager::from_uris(["http://a:1", "http://b:2"]));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = manager.clone();
                std::thread::spawn(move || manager.get().unwrap().uri)
            })
            .collect();

        let picks: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let a_count = picks.iter().filter(|uri| *uri == "http://a:1").count();

        assert_eq!(a_count, 4);
    }
}
