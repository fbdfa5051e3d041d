//! Service tests: health routes, the backend pass-through and the auto-retry
//! worker, against a throwaway axum backend on a loopback port.

use std::{sync::Arc, time::Duration};

use axum::{
  Json, Router,
  body::Body,
  extract::RawQuery,
  http::{HeaderMap, Request, StatusCode, header},
  response::IntoResponse,
  routing::{get, post},
};
use brix_core::{
  event::{EventLog, EventScope, EventType},
  queue::{QueueEnd, QueueStatus, QueueStore},
  sync::{RetryOutcome, retry},
};
use brix_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tokio::{net::TcpListener, sync::watch};
use tower::ServiceExt as _;

use crate::{
  AppState,
  backend::{BackendClient, BackendError},
  retry::spawn_retry_worker,
  router,
};

// ─── Fixtures ────────────────────────────────────────────────────────────────

/// Serve a stand-in for the external backend; returns its base URL.
async fn spawn_fake_backend() -> String {
  let app = Router::new()
    .route(
      "/api/v1/auth/signup",
      post(|headers: HeaderMap, Json(body): Json<Value>| async move {
        let auth = headers
          .get(header::AUTHORIZATION)
          .and_then(|v| v.to_str().ok())
          .unwrap_or_default()
          .to_owned();
        (
          StatusCode::CREATED,
          Json(json!({ "success": true, "data": { "received": body, "auth": auth } })),
        )
      }),
    )
    .route(
      "/api/v1/matches",
      get(|RawQuery(query): RawQuery| async move { Json(json!({ "query": query })) }),
    )
    .route(
      "/api/v1/events",
      post(|Json(event): Json<EventLog>| async move {
        if event.team_id == "reject" {
          (StatusCode::UNPROCESSABLE_ENTITY, "unknown team").into_response()
        } else {
          StatusCode::CREATED.into_response()
        }
      }),
    );

  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move { axum::serve(listener, app).await.ok() });
  format!("http://{addr}")
}

/// A loopback URL nothing is listening on.
async fn dead_backend() -> String {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  drop(listener);
  format!("http://{addr}")
}

async fn make_state(backend_url: &str) -> AppState<SqliteStore> {
  AppState {
    store:   Arc::new(SqliteStore::open_in_memory().await.unwrap()),
    backend: Arc::new(BackendClient::new(backend_url, Duration::from_secs(5)).unwrap()),
  }
}

async fn oneshot(
  state: AppState<SqliteStore>,
  method: &str,
  uri: &str,
  headers: Vec<(header::HeaderName, &str)>,
  body: &str,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  for (k, v) in headers {
    builder = builder.header(k, v);
  }
  let req = builder.body(Body::from(body.to_owned())).unwrap();
  let resp = router(state).oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn event(id: &str, team: &str) -> EventLog {
  EventLog {
    id:          id.into(),
    match_id:    "M1".into(),
    team_id:     team.into(),
    player_id:   Some("P1".into()),
    event_type:  EventType::Goal,
    timestamp:   1_700_000_000_000,
    value:       None,
    event_scope: EventScope::Internal,
    semester:    "2024-1".into(),
    offline:     true,
  }
}

// ─── Health ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn root_and_health() {
  let state = make_state(&dead_backend().await).await;
  let (status, body) = oneshot(state.clone(), "GET", "/", vec![], "").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "message": "Brixsport Analytics Service" }));

  let (status, body) = oneshot(state, "GET", "/health", vec![], "").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "status": "OK" }));
}

// ─── Proxy ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn post_is_forwarded_with_body_and_authorization() {
  let state = make_state(&spawn_fake_backend().await).await;
  let (status, body) = oneshot(
    state,
    "POST",
    "/api/v1/auth/signup",
    vec![
      (header::CONTENT_TYPE, "application/json"),
      (header::AUTHORIZATION, "Bearer t0ken"),
    ],
    r#"{"email":"ref@campus.edu"}"#,
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["data"]["received"]["email"], "ref@campus.edu");
  assert_eq!(body["data"]["auth"], "Bearer t0ken");
}

#[tokio::test]
async fn get_is_forwarded_with_query_string() {
  let state = make_state(&spawn_fake_backend().await).await;
  let (status, body) = oneshot(state, "GET", "/api/v1/matches?sport=football", vec![], "").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["query"], "sport=football");
}

#[tokio::test]
async fn backend_status_is_passed_through() {
  let state = make_state(&spawn_fake_backend().await).await;
  let (status, _) = oneshot(state, "GET", "/api/v1/nowhere", vec![], "").await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unreachable_backend_is_a_503_envelope() {
  let state = make_state(&dead_backend().await).await;
  let (status, body) = oneshot(
    state,
    "POST",
    "/api/v1/auth/signup",
    vec![(header::CONTENT_TYPE, "application/json")],
    "{}",
  )
  .await;
  assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
  assert_eq!(body["success"], false);
  assert_eq!(body["error"]["code"], "SERVICE_UNAVAILABLE");
  assert!(body["error"]["message"].is_string());
}

#[tokio::test]
async fn non_json_body_is_rejected_before_forwarding() {
  let state = make_state(&dead_backend().await).await;
  let (status, body) = oneshot(state, "POST", "/api/v1/auth/login", vec![], "email=x").await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(
    body,
    json!({
      "success": false,
      "error": { "message": "Invalid request format", "code": "INVALID_FORMAT" }
    })
  );
}

// ─── Logger API mount ────────────────────────────────────────────────────────

#[tokio::test]
async fn logger_api_is_mounted() {
  let state = make_state(&dead_backend().await).await;
  let (status, body) = oneshot(state, "GET", "/logger/queues", vec![], "").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!([]));
}

// ─── Submission ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn backend_rejection_keeps_entry_failed() {
  let state = make_state(&spawn_fake_backend().await).await;
  state.store.add("k", event("ok", "T1"), QueueEnd::Back).await.unwrap();
  state.store.add("k", event("bad", "reject"), QueueEnd::Back).await.unwrap();

  let outcome = retry(state.store.as_ref(), state.backend.as_ref(), "k", "ok").await.unwrap();
  assert_eq!(outcome, RetryOutcome::Delivered);

  let outcome = retry(state.store.as_ref(), state.backend.as_ref(), "k", "bad").await.unwrap();
  match outcome {
    RetryOutcome::Failed { error } => assert!(error.contains("422"), "error: {error}"),
    other => panic!("expected failure, got {other:?}"),
  }

  let left = state.store.list("k").await.unwrap();
  assert_eq!(left.len(), 1);
  assert_eq!(left[0].status, QueueStatus::Failed);
}

#[tokio::test]
async fn submit_to_dead_backend_is_a_transport_error() {
  use brix_core::sync::Submitter as _;

  let client = BackendClient::new(dead_backend().await, Duration::from_secs(2)).unwrap();
  let err = client.submit(&event("e1", "T1")).await.unwrap_err();
  assert!(matches!(err, BackendError::Transport(_)), "got {err:?}");
}

// ─── Auto-retry worker ───────────────────────────────────────────────────────

#[tokio::test]
async fn worker_delivers_failed_entries_and_stops_on_shutdown() {
  let state = make_state(&spawn_fake_backend().await).await;
  let store = Arc::clone(&state.store);

  store.add("k", event("e1", "T1"), QueueEnd::Back).await.unwrap();
  store.add("k", event("e2", "T1"), QueueEnd::Back).await.unwrap();
  store.begin_attempt("k", "e1").await.unwrap();
  store.record_failure("k", "e1", "offline".into()).await.unwrap();

  let (tx, rx) = watch::channel(false);
  let worker = spawn_retry_worker(
    Arc::clone(&store),
    Arc::clone(&state.backend),
    Duration::from_millis(50),
    Duration::from_secs(60),
    rx,
  );

  let mut remaining = store.list("k").await.unwrap();
  for _ in 0..60 {
    if remaining.len() == 1 {
      break;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    remaining = store.list("k").await.unwrap();
  }

  // Only the failed entry is swept; the pending one waits for its own send.
  assert_eq!(remaining.len(), 1);
  assert_eq!(remaining[0].event.id, "e2");
  assert_eq!(remaining[0].status, QueueStatus::Pending);

  tx.send(true).unwrap();
  tokio::time::timeout(Duration::from_secs(2), worker)
    .await
    .expect("worker stops")
    .unwrap();
}

#[tokio::test]
async fn worker_retries_entries_stuck_syncing() {
  let state = make_state(&spawn_fake_backend().await).await;
  let store = Arc::clone(&state.store);

  // An attempt that started and never reported back.
  store.add("k", event("e1", "T1"), QueueEnd::Back).await.unwrap();
  store.begin_attempt("k", "e1").await.unwrap();

  let (tx, rx) = watch::channel(false);
  let worker = spawn_retry_worker(
    Arc::clone(&store),
    Arc::clone(&state.backend),
    Duration::from_millis(50),
    Duration::ZERO,
    rx,
  );

  let mut remaining = store.list("k").await.unwrap();
  for _ in 0..60 {
    if remaining.is_empty() {
      break;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    remaining = store.list("k").await.unwrap();
  }
  assert!(remaining.is_empty());

  tx.send(true).unwrap();
  tokio::time::timeout(Duration::from_secs(2), worker)
    .await
    .expect("worker stops")
    .unwrap();
}
