//! Router tests driven through `tower::ServiceExt::oneshot` against an
//! in-memory SQLite queue and a switchable fake backend.

use std::{
  convert::Infallible,
  sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
  },
};

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use brix_core::{event::EventLog, sync::Submitter};
use brix_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{ApiState, api_router};

// ─── Fixtures ────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
#[error("backend unreachable")]
struct Unreachable;

/// Accepts submissions while `online` is set; counts every call.
#[derive(Default)]
struct FakeBackend {
  online: AtomicBool,
  calls:  AtomicUsize,
}

impl Submitter for FakeBackend {
  type Error = Unreachable;

  async fn submit(&self, _event: &EventLog) -> Result<(), Unreachable> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if self.online.load(Ordering::SeqCst) { Ok(()) } else { Err(Unreachable) }
  }
}

struct Harness {
  router:  Router,
  backend: Arc<FakeBackend>,
}

async fn harness() -> Harness {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let backend = Arc::new(FakeBackend::default());
  let state = ApiState::new(Arc::new(store), Arc::clone(&backend));
  Harness { router: api_router(state), backend }
}

impl Harness {
  async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, _, bytes) = self.send_raw(method, uri, body, &[]).await;
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
  }

  async fn send_raw(
    &self,
    method: &str,
    uri: &str,
    body: Option<Value>,
    headers: &[(header::HeaderName, &str)],
  ) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (k, v) in headers {
      builder = builder.header(k, *v);
    }
    let req = match body {
      Some(b) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(b.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };
    let resp = self.router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap()
      .to_vec();
    (status, headers, bytes)
  }

  async fn open_session(&self) -> String {
    let (status, body) = self
      .send("POST", "/sessions", Some(json!({ "matchId": "M1", "semester": "2024-1" })))
      .await;
    assert_eq!(status, StatusCode::CREATED);
    body["sessionId"].as_str().unwrap().to_owned()
  }
}

fn football_goal() -> Value {
  json!({
    "sport": "football",
    "teamId": "T1",
    "eventType": "goal",
    "playerId": "P9",
    "teamPlayers": [{ "id": "P9", "jerseyNumber": "9" }]
  })
}

fn queued_event(id: &str) -> Value {
  json!({
    "id": id,
    "matchId": "M1",
    "teamId": "T1",
    "playerId": "P9",
    "eventType": "goal",
    "timestamp": 1_700_000_000_000_i64,
    "semester": "2024-1",
    "offline": true
  })
}

// ─── Sessions ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn session_uses_default_queue_key() {
  let h = harness().await;
  let (status, body) = h
    .send("POST", "/sessions", Some(json!({ "matchId": "M1" })))
    .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["queueKey"], "offlineEventQueue");
  assert_eq!(body["events"], json!([]));
}

#[tokio::test]
async fn empty_match_id_is_rejected() {
  let h = harness().await;
  let (status, body) = h.send("POST", "/sessions", Some(json!({ "matchId": " " }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("matchId"));
}

#[tokio::test]
async fn unknown_session_is_404() {
  let h = harness().await;
  let uri = format!("/sessions/{}", uuid::Uuid::new_v4());
  let (status, _) = h.send("GET", &uri, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn offline_submission_is_queued_pending() {
  let h = harness().await;
  let sid = h.open_session().await;

  let (status, body) = h
    .send("POST", &format!("/sessions/{sid}/events"), Some(football_goal()))
    .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["event"]["eventType"], "goal");
  assert_eq!(body["event"]["offline"], true);
  assert_eq!(body["delivery"]["state"], "queued");
  assert_eq!(body["delivery"]["entry"]["status"], "pending");
  assert_eq!(h.backend.calls.load(Ordering::SeqCst), 0);

  let (_, queue) = h.send("GET", "/queues/offlineEventQueue", None).await;
  assert_eq!(queue.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn send_now_with_backend_up_leaves_queue_empty() {
  let h = harness().await;
  h.backend.online.store(true, Ordering::SeqCst);
  let sid = h.open_session().await;

  let mut draft = football_goal();
  draft["sendNow"] = json!(true);
  let (status, body) = h.send("POST", &format!("/sessions/{sid}/events"), Some(draft)).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["delivery"]["state"], "delivered");

  let (_, queue) = h.send("GET", "/queues/offlineEventQueue", None).await;
  assert_eq!(queue, json!([]));
}

#[tokio::test]
async fn send_now_with_backend_down_marks_failed() {
  let h = harness().await;
  let sid = h.open_session().await;

  let mut draft = football_goal();
  draft["sendNow"] = json!(true);
  let (_, body) = h.send("POST", &format!("/sessions/{sid}/events"), Some(draft)).await;
  assert_eq!(body["delivery"]["entry"]["status"], "failed");
  assert_eq!(body["delivery"]["entry"]["lastError"], "backend unreachable");
}

#[tokio::test]
async fn missing_player_is_a_422_with_message() {
  let h = harness().await;
  let sid = h.open_session().await;

  let mut draft = football_goal();
  draft["playerId"] = json!("");
  let (status, body) = h.send("POST", &format!("/sessions/{sid}/events"), Some(draft)).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["error"], "Please select a player.");

  let (_, queue) = h.send("GET", "/queues/offlineEventQueue", None).await;
  assert_eq!(queue, json!([]), "rejected drafts never reach the queue");
}

#[tokio::test]
async fn repeated_submission_in_one_second_is_rejected() {
  let h = harness().await;
  let sid = h.open_session().await;
  let uri = format!("/sessions/{sid}/events");

  let (_, first) = h.send("POST", &uri, Some(football_goal())).await;
  let (status, second) = h.send("POST", &uri, Some(football_goal())).await;

  if status == StatusCode::CREATED {
    // The two requests straddled a second boundary.
    let s1 = first["event"]["timestamp"].as_i64().unwrap() / 1000;
    let s2 = second["event"]["timestamp"].as_i64().unwrap() / 1000;
    assert_ne!(s1, s2);
  } else {
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(second["error"], "Duplicate event detected in the same second.");
  }
}

#[tokio::test]
async fn undo_edit_and_delete_events() {
  let h = harness().await;
  let sid = h.open_session().await;
  let uri = format!("/sessions/{sid}/events");

  let (_, goal) = h.send("POST", &uri, Some(football_goal())).await;
  let mut corner = football_goal();
  corner["eventType"] = json!("corner");
  let (_, corner) = h.send("POST", &uri, Some(corner)).await;
  let goal_id = goal["event"]["id"].as_str().unwrap().to_owned();
  let corner_id = corner["event"]["id"].as_str().unwrap().to_owned();

  // Inline edit.
  let (status, edited) = h
    .send(
      "PATCH",
      &format!("{uri}/{goal_id}"),
      Some(json!({ "eventScope": "external" })),
    )
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(edited["eventScope"], "external");

  // Batch edit skips unknown ids.
  let (_, batch) = h
    .send(
      "PATCH",
      &uri,
      Some(json!({ "ids": [goal_id, corner_id, "nope"], "patch": { "playerId": "P4" } })),
    )
    .await;
  assert_eq!(batch["updated"], 2);

  // Edits cannot strip the player a goal was recorded with.
  let (status, body) = h
    .send(
      "PATCH",
      &format!("{uri}/{goal_id}"),
      Some(json!({ "playerId": "" })),
    )
    .await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["error"], "Please select a player.");
  let (status, _) = h
    .send(
      "PATCH",
      &uri,
      Some(json!({ "ids": [goal_id, corner_id], "patch": { "playerId": "" } })),
    )
    .await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

  // Undo removes the most recent.
  let (status, undone) = h.send("DELETE", &format!("{uri}/last"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(undone["id"], corner_id.as_str());

  let (status, _) = h.send("DELETE", &format!("{uri}/{goal_id}"), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, _) = h.send("DELETE", &format!("{uri}/{goal_id}"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (_, session) = h.send("GET", &format!("/sessions/{sid}"), None).await;
  assert_eq!(session["events"], json!([]));
}

// ─── Queues ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn failed_retry_then_successful_retry() {
  let h = harness().await;
  let (status, _) = h
    .send("POST", "/queues/dev-1", Some(json!({ "event": queued_event("e1") })))
    .await;
  assert_eq!(status, StatusCode::CREATED);

  let (status, outcome) = h.send("POST", "/queues/dev-1/e1/retry", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(outcome, json!({ "outcome": "failed", "error": "backend unreachable" }));

  let (_, errors) = h.send("GET", "/queues/dev-1/errors", None).await;
  assert_eq!(errors, json!({ "e1": "backend unreachable" }));

  h.backend.online.store(true, Ordering::SeqCst);
  let (_, outcome) = h.send("POST", "/queues/dev-1/e1/retry", None).await;
  assert_eq!(outcome, json!({ "outcome": "delivered" }));

  let (_, queue) = h.send("GET", "/queues/dev-1", None).await;
  assert_eq!(queue, json!([]));
  let (status, _) = h.send("POST", "/queues/dev-1/e1/retry", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn front_insert_and_remove() {
  let h = harness().await;
  h.send("POST", "/queues/k", Some(json!({ "event": queued_event("b") }))).await;
  h.send(
    "POST",
    "/queues/k",
    Some(json!({ "event": queued_event("a"), "position": "front" })),
  )
  .await;

  let (_, queue) = h.send("GET", "/queues/k", None).await;
  let ids: Vec<&str> = queue
    .as_array()
    .unwrap()
    .iter()
    .map(|q| q["event"]["id"].as_str().unwrap())
    .collect();
  assert_eq!(ids, ["a", "b"]);

  let (_, keys) = h.send("GET", "/queues", None).await;
  assert_eq!(keys, json!(["k"]));

  let (status, _) = h.send("DELETE", "/queues/k/a", None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, body) = h.send("DELETE", "/queues/k/a", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body["error"].is_string());
}

#[tokio::test]
async fn csv_export_is_an_attachment_with_etag() {
  let h = harness().await;
  h.send("POST", "/queues/k", Some(json!({ "event": queued_event("e1") }))).await;

  let (status, headers, bytes) = h.send_raw("GET", "/queues/k/export?format=csv", None, &[]).await;
  assert_eq!(status, StatusCode::OK);
  assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/csv"));
  assert_eq!(
    headers[header::CONTENT_DISPOSITION].to_str().unwrap(),
    "attachment; filename=\"k.csv\""
  );
  let csv = String::from_utf8(bytes).unwrap();
  assert_eq!(csv.lines().count(), 2);

  let etag = headers[header::ETAG].to_str().unwrap().to_owned();
  let (status, _, _) = h
    .send_raw(
      "GET",
      "/queues/k/export?format=csv",
      None,
      &[(header::IF_NONE_MATCH, etag.as_str())],
    )
    .await;
  assert_eq!(status, StatusCode::NOT_MODIFIED);
}

#[tokio::test]
async fn json_export_is_the_default() {
  let h = harness().await;
  let (status, headers, bytes) = h.send_raw("GET", "/queues/empty/export", None, &[]).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(headers[header::CONTENT_TYPE], "application/json");
  assert_eq!(bytes, b"[]");
}

#[tokio::test]
async fn analytics_returns_dashboard_series() {
  let h = harness().await;
  h.send("POST", "/queues/k", Some(json!({ "event": queued_event("e1") }))).await;

  let (status, series) = h.send("GET", "/queues/k/analytics?bucket_minutes=10", None).await;
  assert_eq!(status, StatusCode::OK);
  let series = series.as_array().unwrap();
  assert_eq!(series.len(), 4);
  assert_eq!(series[0]["points"][0], json!({ "label": "goal", "value": 1.0 }));
  assert_eq!(series[3]["points"][0]["label"], "0'");
}

// ─── Timers ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn timer_lifecycle_over_http() {
  let h = harness().await;

  let (status, snap) = h
    .send("POST", "/timers/M1", Some(json!({ "matchType": "Finals" })))
    .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(snap["phase"], "first-half");
  assert_eq!(snap["running"], false);
  assert_eq!(snap["displayTime"], "00:00");
  assert_eq!(snap["regulationSecs"], 45 * 60);

  let (status, snap) = h.send("POST", "/timers/M1/start", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(snap["running"], true);

  let (status, _) = h.send("POST", "/timers/M1/start", None).await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (_, snap) = h.send("POST", "/timers/M1/pause", None).await;
  assert_eq!(snap["running"], false);

  let (_, snap) = h.send("POST", "/timers/M1/end-period", None).await;
  assert_eq!(snap["phase"], "second-half");
  assert_eq!(snap["displayTime"], "00:00");

  // Ending the second half of a final asks about extra time.
  let (_, snap) = h.send("POST", "/timers/M1/end-period", None).await;
  assert_eq!(snap["phase"], "second-half");
  assert_eq!(snap["pendingPrompt"], "extra_time");

  let (status, _) = h.send("POST", "/timers/M1/start", None).await;
  assert_eq!(status, StatusCode::CONFLICT, "no start while a prompt is pending");

  let (_, snap) = h.send("POST", "/timers/M1/prompt/confirm", None).await;
  assert_eq!(snap["phase"], "extra-time-1");
  assert_eq!(snap["regulationSecs"], 15 * 60);
}

#[tokio::test]
async fn declining_extra_time_finishes() {
  let h = harness().await;
  h.send(
    "POST",
    "/timers/M2",
    Some(json!({ "matchType": "Knockout", "halfDuration": 40 })),
  )
  .await;
  h.send("POST", "/timers/M2/end-period", None).await;
  h.send("POST", "/timers/M2/end-period", None).await;

  let (_, snap) = h.send("POST", "/timers/M2/prompt/cancel", None).await;
  assert_eq!(snap["phase"], "finished");

  let (status, _) = h.send("POST", "/timers/M2/end-period", None).await;
  assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn league_match_finishes_without_prompt() {
  let h = harness().await;
  h.send("POST", "/timers/M3", Some(json!({ "matchType": "League" }))).await;
  h.send("POST", "/timers/M3/end-period", None).await;
  let (_, snap) = h.send("POST", "/timers/M3/end-period", None).await;
  assert_eq!(snap["phase"], "finished");
  assert_eq!(snap["pendingPrompt"], Value::Null);
}

#[tokio::test]
async fn answering_without_prompt_is_a_conflict() {
  let h = harness().await;
  h.send("POST", "/timers/M4", Some(json!({ "matchType": "League" }))).await;
  let (status, body) = h
    .send("POST", "/timers/M4/prompt/confirm", Some(json!({ "input": "3" })))
    .await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert!(body["error"].as_str().unwrap().contains("no prompt"));
}

#[tokio::test]
async fn unknown_timer_and_bad_durations() {
  let h = harness().await;
  let (status, _) = h.send("GET", "/timers/nope", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, _) = h
    .send("POST", "/timers/M5", Some(json!({ "matchType": "League", "halfDuration": 0 })))
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

/// A backend that never refuses.
struct AlwaysUp;

impl Submitter for AlwaysUp {
  type Error = Infallible;

  async fn submit(&self, _event: &EventLog) -> Result<(), Infallible> { Ok(()) }
}

#[tokio::test]
async fn infallible_submitter_delivers_immediately() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let router = api_router(ApiState::new(Arc::new(store), Arc::new(AlwaysUp)));
  let h = Harness { router, backend: Arc::new(FakeBackend::default()) };

  let sid = h.open_session().await;
  let mut draft = football_goal();
  draft["sendNow"] = json!(true);
  let (_, body) = h.send("POST", &format!("/sessions/{sid}/events"), Some(draft)).await;
  assert_eq!(body["delivery"]["state"], "delivered");
}
