//! Handlers for `/sessions` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/sessions` | Body: [`NewSessionBody`]; returns 201 |
//! | `GET`    | `/sessions/{id}` | Session and its events |
//! | `POST`   | `/sessions/{id}/events` | Body: [`SubmitBody`]; returns 201 [`SubmitResponse`], 422 on validation failure |
//! | `PATCH`  | `/sessions/{id}/events` | Body: [`BatchEditBody`] |
//! | `DELETE` | `/sessions/{id}/events/last` | Undo the most recent event |
//! | `PATCH`  | `/sessions/{id}/events/{event_id}` | Body: [`EventPatch`] |
//! | `DELETE` | `/sessions/{id}/events/{event_id}` | Remove one event |
//!
//! Validation and the duplicate guard run against the session's own event
//! list. Queueing happens after the session lock is released.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use brix_core::{
  event::{EventLog, now_ms},
  queue::{QueueStore, QueuedEvent},
  session::{EventPatch, LoggerSession},
  sync::{Submitter, enqueue},
  validate::EventDraft,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

fn session_not_found(id: Uuid) -> ApiError {
  ApiError::NotFound(format!("session {id} not found"))
}

// ─── Create / get ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSessionBody {
  pub match_id:  String,
  #[serde(default)]
  pub semester:  String,
  /// Queue the session's submissions go to. Defaults to `offlineEventQueue`.
  pub queue_key: Option<String>,
}

/// `POST /sessions`: returns 201 + the new [`LoggerSession`].
pub async fn create<S, B>(
  State(state): State<ApiState<S, B>>,
  Json(body): Json<NewSessionBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: QueueStore,
  B: Submitter,
{
  if body.match_id.trim().is_empty() {
    return Err(ApiError::BadRequest("matchId must not be empty".into()));
  }

  let session = LoggerSession::new(body.match_id, body.semester, body.queue_key);
  tracing::info!(
    session_id = %session.session_id,
    match_id = %session.match_id,
    queue = %session.queue_key,
    "opened logging session"
  );

  state
    .sessions
    .lock()
    .await
    .insert(session.session_id, session.clone());
  Ok((StatusCode::CREATED, Json(session)))
}

/// `GET /sessions/{id}`: the session with its events, oldest first.
pub async fn get_one<S, B>(
  State(state): State<ApiState<S, B>>,
  Path(id): Path<Uuid>,
) -> Result<Json<LoggerSession>, ApiError>
where
  S: QueueStore,
  B: Submitter,
{
  let sessions = state.sessions.lock().await;
  let session = sessions.get(&id).ok_or_else(|| session_not_found(id))?;
  Ok(Json(session.clone()))
}

// ─── Submit ──────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /sessions/{id}/events`: the logger form plus
/// whether to attempt delivery straight away.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBody {
  #[serde(flatten)]
  pub draft:    EventDraft,
  /// Try the backend immediately. When `false` the event is only queued and
  /// marked as captured offline.
  #[serde(default)]
  pub send_now: bool,
}

/// Where a submitted event ended up.
#[derive(Debug, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Delivery {
  Delivered,
  Queued { entry: QueuedEvent },
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
  pub event:    EventLog,
  pub delivery: Delivery,
}

/// `POST /sessions/{id}/events`
pub async fn submit<S, B>(
  State(state): State<ApiState<S, B>>,
  Path(id): Path<Uuid>,
  Json(body): Json<SubmitBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: QueueStore,
  B: Submitter,
{
  let (event, queue_key) = {
    let mut sessions = state.sessions.lock().await;
    let session = sessions.get_mut(&id).ok_or_else(|| session_not_found(id))?;
    let event = session.submit(&body.draft, now_ms(), !body.send_now)?;
    (event, session.queue_key.clone())
  };

  tracing::info!(
    session_id = %id,
    event_id = %event.id,
    event_type = %event.event_type,
    "event logged"
  );

  let queued = enqueue(
    state.store.as_ref(),
    state.submitter.as_ref(),
    &queue_key,
    event.clone(),
    body.send_now,
  )
  .await
  .map_err(ApiError::store)?;

  let delivery = match queued {
    None => Delivery::Delivered,
    Some(entry) => Delivery::Queued { entry },
  };
  Ok((StatusCode::CREATED, Json(SubmitResponse { event, delivery })))
}

// ─── Undo / remove ───────────────────────────────────────────────────────────

/// `DELETE /sessions/{id}/events/last`: returns the removed event.
pub async fn undo<S, B>(
  State(state): State<ApiState<S, B>>,
  Path(id): Path<Uuid>,
) -> Result<Json<EventLog>, ApiError>
where
  S: QueueStore,
  B: Submitter,
{
  let mut sessions = state.sessions.lock().await;
  let session = sessions.get_mut(&id).ok_or_else(|| session_not_found(id))?;
  let event = session
    .undo()
    .ok_or_else(|| ApiError::NotFound("no events to undo".into()))?;
  Ok(Json(event))
}

/// `DELETE /sessions/{id}/events/{event_id}`
pub async fn remove_one<S, B>(
  State(state): State<ApiState<S, B>>,
  Path((id, event_id)): Path<(Uuid, String)>,
) -> Result<StatusCode, ApiError>
where
  S: QueueStore,
  B: Submitter,
{
  let mut sessions = state.sessions.lock().await;
  let session = sessions.get_mut(&id).ok_or_else(|| session_not_found(id))?;
  session.remove(&event_id)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Edit ────────────────────────────────────────────────────────────────────

/// `PATCH /sessions/{id}/events/{event_id}`: returns the edited event.
pub async fn edit_one<S, B>(
  State(state): State<ApiState<S, B>>,
  Path((id, event_id)): Path<(Uuid, String)>,
  Json(patch): Json<EventPatch>,
) -> Result<Json<EventLog>, ApiError>
where
  S: QueueStore,
  B: Submitter,
{
  let mut sessions = state.sessions.lock().await;
  let session = sessions.get_mut(&id).ok_or_else(|| session_not_found(id))?;
  let event = session.edit(&event_id, &patch)?.clone();
  Ok(Json(event))
}

#[derive(Debug, Deserialize)]
pub struct BatchEditBody {
  pub ids:   Vec<String>,
  pub patch: EventPatch,
}

#[derive(Debug, Serialize)]
pub struct BatchEditResponse {
  pub updated: usize,
}

/// `PATCH /sessions/{id}/events`: ids that are not in the session are skipped.
/// A patch that would invalidate any listed event changes nothing.
pub async fn batch_edit<S, B>(
  State(state): State<ApiState<S, B>>,
  Path(id): Path<Uuid>,
  Json(body): Json<BatchEditBody>,
) -> Result<Json<BatchEditResponse>, ApiError>
where
  S: QueueStore,
  B: Submitter,
{
  let mut sessions = state.sessions.lock().await;
  let session = sessions.get_mut(&id).ok_or_else(|| session_not_found(id))?;
  let updated = session.batch_edit(&body.ids, &body.patch)?;
  Ok(Json(BatchEditResponse { updated }))
}
