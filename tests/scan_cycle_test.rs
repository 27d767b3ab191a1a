use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{Router, response::Html, routing::get};
use chrono::{DateTime, Utc};
use tempfile::TempDir;
use tokio::net::TcpListener;

use keysweep::config::PacingConfig;
use keysweep::extractor::Extractor;
use keysweep::ledger::{FjallKeyStore, KeyStore, LedgerError};
use keysweep::notify::{Channel, Notifier, NotifyError};
use keysweep::patterns::{PatternRegistry, Platform};
use keysweep::proxy::ProxyManager;
use keysweep::scanner::{HttpConfig, Post, SearchClient, SearchError, SocialScanner, WebScanner};
use keysweep::scheduler::{CyclePhase, Scheduler};

const PACING: &str = r#"
initial = "5m"
floor = "1m"
ceiling = "15m"
speedup_factor = 0.8
backoff_factor = 1.2
"#;

async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn pacing() -> PacingConfig {
    toml::from_str(PACING).expect("Failed to parse pacing")
}

fn fast_http() -> HttpConfig {
    HttpConfig {
        connect_timeout: Duration::from_secs(2),
        request_timeout: Duration::from_secs(5),
        max_attempts: 1,
        retry_backoff: Duration::from_millis(10),
        ..HttpConfig::default()
    }
}

#[derive(Default)]
struct RecordingChannel {
    messages: Mutex<Vec<String>>,
}

#[async_trait]
impl Channel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    async fn deliver(&self, message: &str) -> Result<(), NotifyError> {
        self.messages.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

struct BrokenChannel;

#[async_trait]
impl Channel for BrokenChannel {
    fn name(&self) -> &str {
        "broken"
    }

    async fn deliver(&self, _message: &str) -> Result<(), NotifyError> {
        Err(NotifyError::Rejected("HTTP 503".to_string()))
    }
}

struct StaticSearch(Vec<Post>);

#[async_trait]
impl SearchClient for StaticSearch {
    async fn recent_posts(&self, _query: &str) -> Result<Vec<Post>, SearchError> {
        Ok(self.0.clone())
    }
}

struct BrokenStore;

impl KeyStore for BrokenStore {
    fn try_insert(
        &self,
        _key: &str,
        _platform: Platform,
        _source: &str,
        _now: DateTime<Utc>,
    ) -> keysweep::ledger::Result<bool> {
        Err(LedgerError::LockPoisoned)
    }

    fn exists(&self, _key: &str) -> keysweep::ledger::Result<bool> {
        Err(LedgerError::LockPoisoned)
    }
}

/// Accepts the first key, then fails every write
#[derive(Default)]
struct FlakyStore {
    attempts: AtomicUsize,
}

impl KeyStore for FlakyStore {
    fn try_insert(
        &self,
        _key: &str,
        _platform: Platform,
        _source: &str,
        _now: DateTime<Utc>,
    ) -> keysweep::ledger::Result<bool> {
        match self.attempts.fetch_add(1, Ordering::SeqCst) {
            0 => Ok(true),
            _ => Err(LedgerError::LockPoisoned),
        }
    }

    fn exists(&self, _key: &str) -> keysweep::ledger::Result<bool> {
        Ok(false)
    }
}

struct Harness {
    scheduler: Scheduler,
    channel: Arc<RecordingChannel>,
    _dir: TempDir,
}

fn build(
    sites: Vec<String>,
    store: Arc<dyn KeyStore>,
    posts: Vec<Post>,
    dir: TempDir,
) -> Harness {
    let extractor = Arc::new(Extractor::new(Arc::new(PatternRegistry::new()), store));
    let web = Arc::new(WebScanner::new(
        extractor.clone(),
        Arc::new(ProxyManager::new(Vec::new())),
        fast_http(),
    ));
    let client: Arc<dyn SearchClient> = Arc::new(StaticSearch(posts));
    let social = Arc::new(SocialScanner::new(
        extractor,
        Some(client),
        &["steam key".to_string()],
    ));

    let channel = Arc::new(RecordingChannel::default());
    let notifier = Notifier::new(vec![channel.clone() as Arc<dyn Channel>]);

    Harness {
        scheduler: Scheduler::new(sites, web, social, notifier, pacing()),
        channel,
        _dir: dir,
    }
}

fn fjall_store(dir: &TempDir) -> Arc<dyn KeyStore> {
    Arc::new(FjallKeyStore::open(dir.path().join("keys")).expect("Failed to open store"))
}

#[tokio::test]
async fn test_cycle_sends_one_message_for_web_and_social_keys() {
    let app = Router::new().route(
        "/giveaway",
        get(|| async { Html("<p>Enjoy: TEST1-TEST2-TEST3</p>") }),
    );
    let addr = serve(app).await;
    let dir = TempDir::new().unwrap();
    let store = fjall_store(&dir);
    let posts = vec![Post {
        id: "77".to_string(),
        text: "xbox AAAAA-BBBBB-CCCCC-DDDDD-EEEEE".to_string(),
    }];
    let mut harness = build(vec![format!("http://{addr}/giveaway")], store, posts, dir);

    let report = harness.scheduler.run_cycle().await;

    assert_eq!(report.found.total(), 2);
    assert_eq!(report.found.get(Platform::Steam).unwrap(), ["TEST1-TEST2-TEST3"]);
    assert_eq!(
        report.found.get(Platform::Xbox).unwrap(),
        ["AAAAA-BBBBB-CCCCC-DDDDD-EEEEE"]
    );
    assert_eq!(report.store_errors, 0);
    assert_eq!(report.failed_tasks, 0);
    assert_eq!(report.delivery.as_ref().unwrap().delivered(), 1);

    let messages = harness.channel.messages.lock().unwrap().clone();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("TEST1-TEST2-TEST3"));
    assert!(messages[0].contains("AAAAA-BBBBB-CCCCC-DDDDD-EEEEE"));

    assert_eq!(report.next_interval, Duration::from_secs(240));
    assert_eq!(harness.scheduler.interval().current(), Duration::from_secs(240));
    assert_eq!(harness.scheduler.phase(), CyclePhase::Idle);

    let snapshot = harness.scheduler.metrics().snapshot();
    assert_eq!(snapshot.cycles_completed, 1);
    assert_eq!(snapshot.keys_discovered, 2);
}

#[tokio::test]
async fn test_second_cycle_is_quiet_and_backs_off() {
    let app = Router::new().route(
        "/giveaway",
        get(|| async { Html("<p>Enjoy: TEST1-TEST2-TEST3</p>") }),
    );
    let addr = serve(app).await;
    let dir = TempDir::new().unwrap();
    let store = fjall_store(&dir);
    let mut harness = build(vec![format!("http://{addr}/giveaway")], store, Vec::new(), dir);

    let first = harness.scheduler.run_cycle().await;
    assert_eq!(first.found.total(), 1);

    let second = harness.scheduler.run_cycle().await;
    assert!(second.found.is_empty());
    assert!(second.delivery.is_none());
    assert_eq!(second.next_interval, Duration::from_secs(288));
    assert_eq!(harness.channel.messages.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_empty_cycle_backs_off_without_notifying() {
    let dir = TempDir::new().unwrap();
    let store = fjall_store(&dir);
    let mut harness = build(Vec::new(), store, Vec::new(), dir);

    let report = harness.scheduler.run_cycle().await;

    assert!(report.found.is_empty());
    assert_eq!(report.next_interval, Duration::from_secs(360));
    assert!(harness.channel.messages.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_store_failure_holds_interval() {
    let dir = TempDir::new().unwrap();
    let posts = vec![Post {
        id: "1".to_string(),
        text: "ABCDE-FGHIJ-KLMNO".to_string(),
    }];
    let mut harness = build(Vec::new(), Arc::new(BrokenStore), posts, dir);

    let report = harness.scheduler.run_cycle().await;

    assert!(report.found.is_empty());
    assert_eq!(report.store_errors, 1);
    assert_eq!(report.next_interval, Duration::from_secs(300));
    assert_eq!(harness.scheduler.metrics().snapshot().store_failures, 1);
    assert!(harness.channel.messages.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_keys_stored_before_failure_are_reported() {
    let dir = TempDir::new().unwrap();
    let posts = vec![
        Post {
            id: "1".to_string(),
            text: "steam ABCDE-FGHIJ-KLMNO".to_string(),
        },
        Post {
            id: "2".to_string(),
            text: "steam QWERT-YUIOP-ASDFG".to_string(),
        },
    ];
    let mut harness = build(Vec::new(), Arc::new(FlakyStore::default()), posts, dir);

    let report = harness.scheduler.run_cycle().await;

    assert_eq!(report.store_errors, 1);
    assert_eq!(report.found.get(Platform::Steam).unwrap(), ["ABCDE-FGHIJ-KLMNO"]);
    assert_eq!(report.found.total(), 1);
    assert_eq!(report.delivery.as_ref().unwrap().delivered(), 1);
    assert_eq!(report.next_interval, Duration::from_secs(240));

    let messages = harness.channel.messages.lock().unwrap().clone();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("ABCDE-FGHIJ-KLMNO"));
    assert!(!messages[0].contains("QWERT-YUIOP-ASDFG"));

    let snapshot = harness.scheduler.metrics().snapshot();
    assert_eq!(snapshot.store_failures, 1);
    assert_eq!(snapshot.keys_discovered, 1);
    assert_eq!(snapshot.tasks_failed, 0);
}

#[tokio::test]
async fn test_all_channels_failing_still_speeds_up() {
    let dir = TempDir::new().unwrap();
    let store = fjall_store(&dir);
    let extractor = Arc::new(Extractor::new(Arc::new(PatternRegistry::new()), store));
    let web = Arc::new(WebScanner::new(
        extractor.clone(),
        Arc::new(ProxyManager::new(Vec::new())),
        fast_http(),
    ));
    let client: Arc<dyn SearchClient> = Arc::new(StaticSearch(vec![Post {
        id: "9".to_string(),
        text: "psn 1234-5678-9ABC".to_string(),
    }]));
    let social = Arc::new(SocialScanner::new(extractor, Some(client), &["psn".to_string()]));
    let notifier = Notifier::new(vec![Arc::new(BrokenChannel) as Arc<dyn Channel>]);
    let mut scheduler = Scheduler::new(Vec::new(), web, social, notifier, pacing());

    let report = scheduler.run_cycle().await;

    assert!(report.delivery.as_ref().unwrap().all_failed());
    assert_eq!(report.next_interval, Duration::from_secs(240));
    assert_eq!(scheduler.metrics().snapshot().notifications_failed, 1);
}

#[tokio::test]
async fn test_shutdown_interrupts_in_flight_cycle() {
    let app = Router::new().route(
        "/slow",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Html("<p>TEST1-TEST2-TEST3</p>")
        }),
    );
    let addr = serve(app).await;
    let dir = TempDir::new().unwrap();
    let store = fjall_store(&dir);
    let harness = build(vec![format!("http://{addr}/slow")], store, Vec::new(), dir);

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let handle = tokio::spawn(harness.scheduler.run(async {
        let _ = rx.await;
    }));

    tokio::time::sleep(Duration::from_millis(200)).await;
    tx.send(()).unwrap();

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("scheduler did not stop")
        .unwrap();
    assert!(harness.channel.messages.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_shutdown_interrupts_sleep() {
    let dir = TempDir::new().unwrap();
    let store = fjall_store(&dir);
    let harness = build(Vec::new(), store, Vec::new(), dir);
    let mut phase = harness.scheduler.subscribe_phase();

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let handle = tokio::spawn(harness.scheduler.run(async {
        let _ = rx.await;
    }));

    tokio::time::timeout(
        Duration::from_secs(5),
        phase.wait_for(|p| *p == CyclePhase::Sleeping),
    )
    .await
    .expect("scheduler never went to sleep")
    .unwrap();
    tx.send(()).unwrap();

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("scheduler did not stop")
        .unwrap();
    assert_eq!(*phase.borrow(), CyclePhase::Idle);
}

#[tokio::test]
async fn test_phase_is_visible_while_scanning() {
    let app = Router::new().route(
        "/slow",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Html("<p>TEST1-TEST2-TEST3</p>")
        }),
    );
    let addr = serve(app).await;
    let dir = TempDir::new().unwrap();
    let store = fjall_store(&dir);
    let harness = build(vec![format!("http://{addr}/slow")], store, Vec::new(), dir);
    let mut phase = harness.scheduler.subscribe_phase();
    assert_eq!(*phase.borrow_and_update(), CyclePhase::Idle);

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let handle = tokio::spawn(harness.scheduler.run(async {
        let _ = rx.await;
    }));

    tokio::time::timeout(
        Duration::from_secs(5),
        phase.wait_for(|p| *p == CyclePhase::Scanning),
    )
    .await
    .expect("scheduler never started scanning")
    .unwrap();
    tx.send(()).unwrap();

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("scheduler did not stop")
        .unwrap();
}
