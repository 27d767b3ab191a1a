//! Wiring from configuration to a running scanner

use std::future::Future;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::extractor::Extractor;
use crate::ledger::{FjallKeyStore, KeyRecord, KeyStore};
use crate::notify::Notifier;
use crate::patterns::PatternRegistry;
use crate::proxy::ProxyManager;
use crate::scanner::{SearchClient, SocialScanner, WebScanner, XSearchClient};
use crate::scheduler::{CycleReport, Scheduler};

pub type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Open the key store and assemble every component around it
pub fn build(config: &Config) -> Result<(FjallKeyStore, Scheduler), AnyError> {
    let store = FjallKeyStore::open(&config.store.path)?;
    let stats = store.stats()?;
    info!(
        path = %config.store.path.display(),
        total = stats.total,
        unclaimed = stats.unclaimed,
        "Key store opened"
    );

    let patterns = Arc::new(PatternRegistry::with_platforms(
        config.scan.platforms.iter().copied(),
    ));
    let key_store: Arc<dyn KeyStore> = Arc::new(store.clone());
    let extractor = Arc::new(Extractor::new(patterns, key_store));

    let proxies = Arc::new(ProxyManager::from_uris(config.scan.proxies.iter().cloned()));
    if proxies.is_empty() {
        info!("No proxies configured, fetching directly");
    }

    let web = Arc::new(WebScanner::new(
        extractor.clone(),
        proxies,
        config.http_config(),
    ));

    let timeout = config.scan.request_timeout.as_duration();
    let social = match &config.social.bearer_token {
        Some(token) => {
            let client = XSearchClient::new(
                token.clone(),
                config.social.api_base.clone(),
                config.social.max_results,
                timeout,
            )?;
            let client: Arc<dyn SearchClient> = Arc::new(client);
            SocialScanner::new(extractor, Some(client), &config.social.terms)
        }
        None => {
            warn!("X_BEARER_TOKEN not set, social search disabled");
            SocialScanner::disabled(extractor)
        }
    };

    let notifier = Notifier::from_config(&config.notify, timeout);

    let scheduler = Scheduler::new(
        config.scan.sites.clone(),
        web,
        Arc::new(social),
        notifier,
        config.pacing,
    );

    Ok((store, scheduler))
}

/// Scan until `shutdown` resolves, then flush the store
pub async fn run<F>(config: &Config, shutdown: F) -> Result<(), AnyError>
where
    F: Future<Output = ()>,
{
    let (store, scheduler) = build(config)?;
    scheduler.run(shutdown).await;
    store.persist()?;
    info!("Key store flushed");
    Ok(())
}

/// Run exactly one cycle
pub async fn once(config: &Config) -> Result<CycleReport, AnyError> {
    let (store, mut scheduler) = build(config)?;
    let report = scheduler.run_cycle().await;
    store.persist()?;
    Ok(report)
}

pub fn check(config: &Config, key: &str) -> Result<Option<KeyRecord>, AnyError> {
    let store = FjallKeyStore::open(&config.store.path)?;
    Ok(store.get(key)?)
}

pub fn claim(config: &Config, key: &str) -> Result<KeyRecord, AnyError> {
    let store = FjallKeyStore::open(&config.store.path)?;
    let record = store.mark_claimed(key)?;
    info!(key = %record.key, platform = %record.platform, "Key claimed");
    Ok(record)
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
