//! Adaptive scan loop
//!
//! Each cycle moves through `Idle -> Scanning -> Reporting -> Sleeping`.
//! All sources are scanned concurrently and the cycle waits for every one
//! of them before reporting, so a slow source never loses its keys. A
//! productive cycle shortens the interval; a quiet one lengthens it.

mod interval;

pub use interval::ScanInterval;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::config::PacingConfig;
use crate::extractor::{Extraction, MatchResult};
use crate::humanize::HumanDuration;
use crate::notify::{DeliveryReport, Notifier};
use crate::observability::Metrics;
use crate::scanner::{SocialScanner, WebScanner};

/// Where the scheduler is within a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    Scanning,
    Reporting,
    Sleeping,
}

/// What one cycle found and did
#[derive(Debug)]
pub struct CycleReport {
    pub found: MatchResult,
    /// Sources whose extraction hit a key store failure
    pub store_errors: usize,
    /// Scan tasks that panicked or were cancelled before returning
    pub failed_tasks: usize,
    /// `None` when nothing new was found and no message was sent
    pub delivery: Option<DeliveryReport>,
    pub next_interval: Duration,
}

#[derive(Debug, Default)]
struct ScanOutcome {
    found: MatchResult,
    store_errors: usize,
    failed_tasks: usize,
}

pub struct Scheduler {
    sites: Vec<String>,
    web: Arc<WebScanner>,
    social: Arc<SocialScanner>,
    notifier: Notifier,
    interval: ScanInterval,
    phase: watch::Sender<CyclePhase>,
    metrics: Arc<Metrics>,
}

impl Scheduler {
    pub fn new(
        sites: Vec<String>,
        web: Arc<WebScanner>,
        social: Arc<SocialScanner>,
        notifier: Notifier,
        pacing: PacingConfig,
    ) -> Self {
        Self {
            sites,
            web,
            social,
            notifier,
            interval: ScanInterval::new(pacing),
            phase: watch::Sender::new(CyclePhase::Idle),
            metrics: Arc::new(Metrics::new()),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn phase(&self) -> CyclePhase {
        *self.phase.borrow()
    }

    /// Follow phase changes, including while [`Scheduler::run`] owns the scheduler
    pub fn subscribe_phase(&self) -> watch::Receiver<CyclePhase> {
        self.phase.subscribe()
    }

    fn enter(&self, phase: CyclePhase) {
        self.phase.send_replace(phase);
    }

    pub fn interval(&self) -> &ScanInterval {
        &self.interval
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Scan every source once, report new keys, and adjust the interval
    pub async fn run_cycle(&mut self) -> CycleReport {
        self.enter(CyclePhase::Scanning);
        let outcome = self.scan_all().await;
        let ScanOutcome {
            found,
            store_errors,
            failed_tasks,
        } = outcome;

        self.enter(CyclePhase::Reporting);
        let delivery = if found.is_empty() {
            None
        } else {
            self.metrics.keys_discovered(found.total());
            Some(self.report(&found).await)
        };

        let next_interval = if !found.is_empty() {
            self.interval.speed_up()
        } else if store_errors == 0 && failed_tasks == 0 {
            self.interval.back_off()
        } else {
            self.interval.current()
        };

        self.metrics.cycle_completed();
        self.enter(CyclePhase::Idle);

        info!(
            keys = found.total(),
            store_errors,
            failed_tasks,
            next_interval = %HumanDuration(next_interval),
            "Cycle complete"
        );
        debug!(metrics = ?self.metrics.snapshot(), "Metrics snapshot");

        CycleReport {
            found,
            store_errors,
            failed_tasks,
            delivery,
            next_interval,
        }
    }

    /// Run cycles until `shutdown` resolves
    ///
    /// Shutdown drops the in-flight cycle, aborting its pending fetches.
    pub async fn run<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        info!(
            sites = self.sites.len(),
            social = self.social.is_enabled(),
            channels = self.notifier.channel_count(),
            interval = %HumanDuration(self.interval.current()),
            "Scheduler started"
        );

        loop {
            let cycle_id = Uuid::now_v7();
            let cycle = self
                .run_cycle()
                .instrument(info_span!("cycle", %cycle_id));

            let completed = tokio::select! {
                _ = &mut shutdown => None,
                report = cycle => Some(report),
            };

            let Some(report) = completed else {
                info!("Shutdown requested during scan, cycle abandoned");
                break;
            };

            self.enter(CyclePhase::Sleeping);
            debug!(sleep = %HumanDuration(report.next_interval), "Sleeping until next cycle");

            let stop = tokio::select! {
                _ = &mut shutdown => true,
                _ = tokio::time::sleep(report.next_interval) => false,
            };

            self.enter(CyclePhase::Idle);
            if stop {
                break;
            }
        }

        self.enter(CyclePhase::Idle);
        info!(metrics = ?self.metrics.snapshot(), "Scheduler stopped");
    }

    /// Scan all sites and the social search concurrently
    ///
    /// Results merge in a fixed order (sites as configured, then social)
    /// regardless of completion order. Keys a source recorded before a store
    /// failure are merged like any others.
    async fn scan_all(&self) -> ScanOutcome {
        let mut tasks = JoinSet::new();

        for (idx, url) in self.sites.iter().enumerate() {
            let web = self.web.clone();
            let url = url.clone();
            tasks.spawn(async move { (idx, web.scan(&url).await) });
        }

        let social = self.social.clone();
        let social_idx = self.sites.len();
        tasks.spawn(async move { (social_idx, social.scan().await) });

        let mut slots: Vec<Option<Extraction>> = (0..=self.sites.len()).map(|_| None).collect();
        let mut outcome = ScanOutcome::default();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, extraction)) => {
                    if let Some(e) = &extraction.error {
                        let source = self.sites.get(idx).map_or("social", String::as_str);
                        error!(
                            source,
                            kept = extraction.found.total(),
                            error = %e,
                            "Key store failure, extraction stopped"
                        );
                        self.metrics.store_failed();
                        outcome.store_errors += 1;
                    }
                    slots[idx] = Some(extraction);
                }
                Err(e) => {
                    error!(error = %e, "Scan task failed");
                    self.metrics.task_failed();
                    outcome.failed_tasks += 1;
                }
            }
        }

        for extraction in slots.into_iter().flatten() {
            outcome.found.merge(extraction.found);
        }

        outcome
    }

    /// Send one message covering every key found this cycle
    async fn report(&self, found: &MatchResult) -> DeliveryReport {
        let message = found.to_message();
        let delivery = self.notifier.send(&message).await;

        if delivery.is_empty() {
            info!(keys = found.total(), "New keys found (no channels configured)\n{}", message);
        } else if delivery.all_failed() {
            self.metrics.notification_failed();
            error!(keys = found.total(), "Every notification channel failed\n{}", message);
        } else {
            self.metrics.notification_sent();
            if delivery.failed() > 0 {
                warn!(
                    delivered = delivery.delivered(),
                    failed = delivery.failed(),
                    "Notification partially delivered"
                );
            }
        }

        delivery
    }
}
