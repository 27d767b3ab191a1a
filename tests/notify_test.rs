use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use keysweep::config::{EmailConfig, NotifyConfig, TelegramConfig};
use keysweep::notify::{Channel, EmailChannel, Notifier, NotifyError, TelegramChannel, WebhookChannel};

type Received = Arc<Mutex<Vec<Value>>>;

async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

async fn record(State(received): State<Received>, Json(body): Json<Value>) -> StatusCode {
    received.lock().unwrap().push(body);
    StatusCode::NO_CONTENT
}

async fn telegram_ok(State(received): State<Received>, Json(body): Json<Value>) -> Json<Value> {
    received.lock().unwrap().push(body);
    Json(json!({ "ok": true, "result": { "message_id": 1 } }))
}

async fn telegram_refuse(Json(_body): Json<Value>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "ok": false, "description": "Bad Request: chat not found" })),
    )
}

const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_webhook_posts_content_once() {
    let received: Received = Arc::default();
    let app = Router::new()
        .route("/hook", post(record))
        .with_state(received.clone());
    let addr = serve(app).await;

    let channel = WebhookChannel::new(format!("http://{addr}/hook"), TIMEOUT).unwrap();
    channel.deliver("New keys found (1):").await.unwrap();

    let bodies = received.lock().unwrap();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["content"], "New keys found (1):");
}

#[tokio::test]
async fn test_webhook_rejection_is_error() {
    let app = Router::new().route("/hook", post(|| async { StatusCode::FORBIDDEN }));
    let addr = serve(app).await;

    let channel = WebhookChannel::new(format!("http://{addr}/hook"), TIMEOUT).unwrap();
    let err = channel.deliver("hello").await.unwrap_err();
    assert!(matches!(err, NotifyError::Rejected(_)));
}

#[tokio::test]
async fn test_telegram_sends_chat_and_text() {
    let received: Received = Arc::default();
    let app = Router::new()
        .route("/botsecret-token/sendMessage", post(telegram_ok))
        .with_state(received.clone());
    let addr = serve(app).await;

    let channel = TelegramChannel::new(
        "secret-token".to_string(),
        "4242".to_string(),
        format!("http://{addr}/"),
        TIMEOUT,
    )
    .unwrap();
    channel.deliver("keys!").await.unwrap();

    let bodies = received.lock().unwrap();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["chat_id"], "4242");
    assert_eq!(bodies[0]["text"], "keys!");
}

#[tokio::test]
async fn test_telegram_refusal_hides_token() {
    let app = Router::new().route("/botsecret-token/sendMessage", post(telegram_refuse));
    let addr = serve(app).await;

    let channel = TelegramChannel::new(
        "secret-token".to_string(),
        "4242".to_string(),
        format!("http://{addr}"),
        TIMEOUT,
    )
    .unwrap();
    let err = channel.deliver("keys!").await.unwrap_err();

    assert!(matches!(err, NotifyError::Rejected(_)));
    assert!(err.to_string().contains("chat not found"));
    assert!(!err.to_string().contains("secret-token"));
}

#[tokio::test]
async fn test_email_unreachable_server_fails() {
    let port = closed_port().await;
    let channel = EmailChannel::new(
        "127.0.0.1".to_string(),
        port,
        "bot@example.com".to_string(),
        "password".to_string(),
        "me@example.com".to_string(),
        Duration::from_secs(2),
    );

    assert!(channel.deliver("keys!").await.is_err());
}

#[tokio::test]
async fn test_notifier_attempts_every_channel_once() {
    let hooks: Received = Arc::default();
    let telegrams: Received = Arc::default();
    let app = Router::new()
        .route("/hook", post(record))
        .with_state(hooks.clone());
    let tg_app = Router::new()
        .route("/botsecret-token/sendMessage", post(telegram_ok))
        .with_state(telegrams.clone());
    let addr = serve(app).await;
    let tg_addr = serve(tg_app).await;
    let smtp_port = closed_port().await;

    let config = NotifyConfig {
        webhook_url: Some(format!("http://{addr}/hook")),
        telegram: Some(TelegramConfig {
            chat_id: "4242".to_string(),
            api_base: format!("http://{tg_addr}"),
            bot_token: Some("secret-token".to_string()),
        }),
        email: Some(EmailConfig {
            smtp_server: "127.0.0.1".to_string(),
            port: smtp_port,
            sender: "bot@example.com".to_string(),
            recipient: "me@example.com".to_string(),
            password: Some("password".to_string()),
        }),
    };

    let notifier = Notifier::from_config(&config, Duration::from_secs(2));
    assert_eq!(notifier.channel_count(), 3);

    let report = notifier.send("New keys found (1):").await;
    assert_eq!(report.outcomes.len(), 3);
    assert_eq!(report.delivered(), 2);
    assert_eq!(report.failed(), 1);
    assert!(!report.all_failed());

    let failed: Vec<&str> = report
        .outcomes
        .iter()
        .filter(|o| !o.is_ok())
        .map(|o| o.channel.as_str())
        .collect();
    assert_eq!(failed, ["email"]);

    assert_eq!(hooks.lock().unwrap().len(), 1);
    assert_eq!(telegrams.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_notifier_skips_channels_without_secrets() {
    let config = NotifyConfig {
        webhook_url: None,
        telegram: Some(TelegramConfig {
            chat_id: "4242".to_string(),
            api_base: "https://api.telegram.org".to_string(),
            bot_token: None,
        }),
        email: None,
    };

    let notifier = Notifier::from_config(&config, TIMEOUT);
    assert_eq!(notifier.channel_count(), 0);

    let report = notifier.send("hello").await;
    assert!(report.is_empty());
    assert!(!report.all_failed());
}
