use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use energy_client::{ApiClient, ApiConfig, AuthInvalidHandler};
use energy_dashboard::{
    advisory::NO_ALERTS_PLACEHOLDER,
    config::ProjectionConfig,
    dashboard::{CommandError, SUBMITTED_MESSAGE},
    export,
    session::{IDENTITY_KEY, TOKEN_KEY},
    storage::{KeyValueStore, MemoryStore},
    Dashboard, Session,
};
use serde_json::{json, Value};

#[derive(Default)]
struct Backend {
    login_hits: AtomicUsize,
    submissions: AtomicUsize,
}

fn bearer(headers: &HeaderMap) -> &str {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("")
}

fn authorized(headers: &HeaderMap) -> bool {
    bearer(headers) == "good"
}

fn unauthorized() -> axum::response::Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "message": "token expired" }))).into_response()
}

async fn login(State(backend): State<Arc<Backend>>, Json(body): Json<Value>) -> axum::response::Response {
    backend.login_hits.fetch_add(1, Ordering::SeqCst);
    if body["password"] == "secret1" {
        Json(json!({ "token": "good", "email": body["email"] })).into_response()
    } else {
        (StatusCode::BAD_REQUEST, Json(json!({ "message": "Invalid credentials" }))).into_response()
    }
}

/// `slow` tokens still read history, but only after a delay; `limited`
/// tokens are forbidden from it.
async fn history(headers: HeaderMap) -> axum::response::Response {
    match bearer(&headers) {
        "good" => {}
        "slow" => tokio::time::sleep(Duration::from_millis(200)).await,
        "limited" => return StatusCode::FORBIDDEN.into_response(),
        _ => return unauthorized(),
    }
    Json(json!([
        { "id": 1, "date": "2024-01-01", "unitsConsumed": 100, "billAmount": 400 },
        { "id": "2", "date": "2024-02-01", "unitsConsumed": "140", "billAmount": "560" }
    ]))
    .into_response()
}

async fn submit(
    State(backend): State<Arc<Backend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> axum::response::Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    assert!(body["unitsConsumed"].is_number());
    backend.submissions.fetch_add(1, Ordering::SeqCst);
    StatusCode::OK.into_response()
}

async fn rewards(headers: HeaderMap) -> axum::response::Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({ "points": 42 })).into_response()
}

async fn alert(Path(email): Path<String>, headers: HeaderMap) -> axum::response::Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if email == "blocked@example.com" {
        return StatusCode::FORBIDDEN.into_response();
    }
    Json(json!({ "message": "High usage this week" })).into_response()
}

async fn tip_of_the_day() -> Json<Value> {
    Json(json!({ "id": 1, "title": "Lights", "description": "Switch off unused lights" }))
}

async fn spawn_backend() -> (String, Arc<Backend>) {
    let backend = Arc::new(Backend::default());
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/energy/history", get(history))
        .route("/api/energy/submit", post(submit))
        .route("/api/rewards", get(rewards))
        .route("/api/alerts/:email", get(alert))
        .route("/api/tips/today", get(tip_of_the_day))
        .with_state(backend.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), backend)
}

struct Harness {
    dashboard: Dashboard,
    store: Arc<MemoryStore>,
    backend: Arc<Backend>,
    auth_invalid_calls: Arc<AtomicUsize>,
}

async fn harness() -> Harness {
    let (base_url, backend) = spawn_backend().await;
    let store = Arc::new(MemoryStore::new());
    let session = Arc::new(Session::new(store.clone()));

    let auth_invalid_calls = Arc::new(AtomicUsize::new(0));
    let logout = session.auth_invalid_handler();
    let calls = auth_invalid_calls.clone();
    let handler: AuthInvalidHandler = Arc::new(move || {
        calls.fetch_add(1, Ordering::SeqCst);
        logout();
    });

    let config = ApiConfig {
        base_url,
        timeout: Some(Duration::from_secs(5)),
    };
    let client = ApiClient::new(&config, session.clone(), handler).unwrap();

    Harness {
        dashboard: Dashboard::from_parts(session, client, &ProjectionConfig::default()),
        store,
        backend,
        auth_invalid_calls,
    }
}

#[tokio::test]
async fn login_then_overview_shows_metrics_rewards_and_alert() {
    let h = harness().await;

    h.dashboard.login(" ada@example.com ", "secret1").await.unwrap();
    let state = h.dashboard.session().state();
    assert_eq!(state.identity(), Some("ada@example.com"));
    assert_eq!(state.token(), Some("good"));
    assert_eq!(h.store.get(TOKEN_KEY).as_deref(), Some("good"));

    let view = h.dashboard.load_overview().await.unwrap();
    assert!(view.errors.is_empty(), "{:?}", view.errors);
    assert_eq!(view.snapshot.metrics.total_units, 240.0);
    assert_eq!(view.snapshot.metrics.total_bill, 960.0);
    assert_eq!(view.snapshot.metrics.predicted_bill, 480);
    assert_eq!(view.rewards.map(|r| r.points), Some(42.0));
    assert_eq!(view.tip.map(|t| t.description).as_deref(), Some("Switch off unused lights"));
    assert_eq!(view.alert.as_deref(), Some("High usage this week"));
}

#[tokio::test]
async fn history_page_uses_all_readings_and_sorts_newest_first() {
    let h = harness().await;
    h.dashboard.login("ada@example.com", "secret1").await.unwrap();

    let view = h.dashboard.load_history().await.unwrap();
    assert!(view.error.is_none());
    assert_eq!(view.predicted_bill, Some(600));
    let ids: Vec<_> = view.rows.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["2", "1"]);
}

#[tokio::test]
async fn rejected_token_logs_out_once() {
    let h = harness().await;
    h.dashboard.session().login("expired", "ada@example.com");
    let mut rx = h.dashboard.session().subscribe();

    let err = h.dashboard.load_history().await.unwrap_err();
    assert!(matches!(err, CommandError::SessionExpired));
    assert!(h.dashboard.usage().snapshot().records.is_empty());

    assert_eq!(h.auth_invalid_calls.load(Ordering::SeqCst), 1);
    assert!(rx.has_changed().unwrap());
    assert!(!rx.borrow_and_update().is_authenticated());
    assert!(h.store.get(TOKEN_KEY).is_none());
    assert!(h.store.get(IDENTITY_KEY).is_none());

    // Nothing further can be loaded once the session is gone.
    assert!(matches!(
        h.dashboard.load_overview().await,
        Err(CommandError::NotLoggedIn)
    ));
}

#[tokio::test]
async fn history_arriving_after_a_rejected_token_is_discarded() {
    let h = harness().await;
    // Rewards and alert reject this token at once; history answers later.
    h.dashboard.session().login("slow", "ada@example.com");

    let err = h.dashboard.load_overview().await.unwrap_err();
    assert!(matches!(err, CommandError::SessionExpired));

    assert!(!h.dashboard.session().state().is_authenticated());
    assert!(h.auth_invalid_calls.load(Ordering::SeqCst) >= 1);
    assert!(h.dashboard.usage().snapshot().records.is_empty());
    assert_eq!(h.dashboard.usage().snapshot().metrics.total_units, 0.0);
    assert!(h.dashboard.alert().visible().await.is_none());
}

#[tokio::test]
async fn forbidden_history_exports_header_only() {
    let h = harness().await;
    h.dashboard.session().login("limited", "ada@example.com");

    let records = h.dashboard.history_records().await.unwrap();
    assert!(records.is_empty());
    assert!(h.dashboard.session().state().is_authenticated());

    let mut out = Vec::new();
    export::write_history_csv(&records, &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "id,date,unitsConsumed,billAmount\n");
}

#[tokio::test]
async fn forbidden_alert_shows_placeholder_and_keeps_session() {
    let h = harness().await;
    h.dashboard.login("blocked@example.com", "secret1").await.unwrap();

    let view = h.dashboard.load_overview().await.unwrap();
    assert_eq!(view.alert.as_deref(), Some(NO_ALERTS_PLACEHOLDER));
    assert!(h.dashboard.session().state().is_authenticated());
    assert_eq!(h.auth_invalid_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn invalid_input_never_reaches_the_server() {
    let h = harness().await;

    let err = h.dashboard.login("not-an-email", "secret1").await.unwrap_err();
    assert!(matches!(err, CommandError::Validation(_)));
    let err = h.dashboard.login("ada@example.com", "12345").await.unwrap_err();
    assert_eq!(err.user_message(), "Password must be at least 6 characters");
    let err = h.dashboard.register("ada@example.com", " ").await.unwrap_err();
    assert!(matches!(err, CommandError::Validation(_)));

    assert_eq!(h.backend.login_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn server_rejection_message_is_surfaced_and_session_stays_empty() {
    let h = harness().await;

    let err = h.dashboard.login("ada@example.com", "wrong-password").await.unwrap_err();
    assert_eq!(err.user_message(), "Invalid credentials");
    assert!(!h.dashboard.session().state().is_authenticated());
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn submit_posts_units_then_refreshes() {
    let h = harness().await;
    h.dashboard.login("ada@example.com", "secret1").await.unwrap();

    assert!(matches!(
        h.dashboard.submit_units("-4").await,
        Err(CommandError::Validation(_))
    ));
    assert_eq!(h.backend.submissions.load(Ordering::SeqCst), 0);

    let view = h.dashboard.submit_units("25").await.unwrap();
    assert_eq!(h.backend.submissions.load(Ordering::SeqCst), 1);
    assert_eq!(view.notice.as_deref(), Some(SUBMITTED_MESSAGE));
    assert_eq!(view.snapshot.records.len(), 2);
}

#[tokio::test]
async fn logout_clears_store_and_cached_usage() {
    let h = harness().await;
    h.dashboard.login("ada@example.com", "secret1").await.unwrap();
    h.dashboard.load_overview().await.unwrap();
    assert_eq!(h.dashboard.usage().snapshot().records.len(), 2);

    h.dashboard.logout().await;

    assert!(!h.dashboard.session().state().is_authenticated());
    assert!(h.store.is_empty());
    assert!(h.dashboard.usage().snapshot().records.is_empty());
    assert!(h.dashboard.alert().visible().await.is_none());
}
