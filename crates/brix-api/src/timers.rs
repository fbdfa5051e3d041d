//! Handlers for `/timers` endpoints.
//!
//! Every read recomputes the clock from the wall time, so a polling client
//! sees prompts as soon as a boundary is crossed. Answers to a prompt go
//! through `prompt/confirm` and `prompt/cancel`; nothing transitions on its
//! own.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use brix_core::{
  event::now_ms,
  queue::QueueStore,
  sync::Submitter,
  timer::{
    DEFAULT_EXTRA_TIME_MINUTES, DEFAULT_HALF_MINUTES, MatchTimer, MatchType,
    TimerConfig, TimerSnapshot,
  },
};
use serde::Deserialize;

use crate::{ApiState, error::ApiError};

// ─── Create / read ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTimerBody {
  pub match_type:          MatchType,
  /// Minutes per half. Default 45.
  pub half_duration:       Option<u32>,
  /// Minutes per extra-time period. Default 15.
  pub extra_time_duration: Option<u32>,
}

/// `POST /timers/{match_id}`: (re)creates the timer; returns 201 + snapshot.
pub async fn create<S, B>(
  State(state): State<ApiState<S, B>>,
  Path(match_id): Path<String>,
  Json(body): Json<NewTimerBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: QueueStore,
  B: Submitter,
{
  let config = TimerConfig {
    half_duration_minutes:       body.half_duration.unwrap_or(DEFAULT_HALF_MINUTES),
    extra_time_duration_minutes: body
      .extra_time_duration
      .unwrap_or(DEFAULT_EXTRA_TIME_MINUTES),
  };
  if config.half_duration_minutes == 0 || config.extra_time_duration_minutes == 0 {
    return Err(ApiError::BadRequest("period durations must be positive".into()));
  }

  let timer = MatchTimer::new(body.match_type, config);
  let snapshot = timer.snapshot(now_ms());
  tracing::info!(%match_id, match_type = %snapshot.match_type, "created match timer");

  state.timers.lock().await.insert(match_id, timer);
  Ok((StatusCode::CREATED, Json(snapshot)))
}

/// `GET /timers/{match_id}`
pub async fn get_one<S, B>(
  State(state): State<ApiState<S, B>>,
  Path(match_id): Path<String>,
) -> Result<Json<TimerSnapshot>, ApiError>
where
  S: QueueStore,
  B: Submitter,
{
  with_timer(&state, &match_id, |_, _| Ok(())).await
}

// ─── Controls ────────────────────────────────────────────────────────────────

/// `POST /timers/{match_id}/start`
pub async fn start<S, B>(
  State(state): State<ApiState<S, B>>,
  Path(match_id): Path<String>,
) -> Result<Json<TimerSnapshot>, ApiError>
where
  S: QueueStore,
  B: Submitter,
{
  with_timer(&state, &match_id, |t, now| Ok(t.start(now)?)).await
}

/// `POST /timers/{match_id}/pause`
pub async fn pause<S, B>(
  State(state): State<ApiState<S, B>>,
  Path(match_id): Path<String>,
) -> Result<Json<TimerSnapshot>, ApiError>
where
  S: QueueStore,
  B: Submitter,
{
  with_timer(&state, &match_id, |t, now| {
    t.pause(now);
    Ok(())
  })
  .await
}

/// `POST /timers/{match_id}/end-period`
pub async fn end_period<S, B>(
  State(state): State<ApiState<S, B>>,
  Path(match_id): Path<String>,
) -> Result<Json<TimerSnapshot>, ApiError>
where
  S: QueueStore,
  B: Submitter,
{
  with_timer(&state, &match_id, |t, now| Ok(t.end_period(now)?)).await
}

// ─── Prompt answers ──────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ConfirmBody {
  /// Stoppage minutes, for the add-stoppage prompt.
  pub input: Option<String>,
}

/// `POST /timers/{match_id}/prompt/confirm`: 422 on malformed stoppage
/// input, with the prompt left pending.
pub async fn confirm<S, B>(
  State(state): State<ApiState<S, B>>,
  Path(match_id): Path<String>,
  body: Option<Json<ConfirmBody>>,
) -> Result<Json<TimerSnapshot>, ApiError>
where
  S: QueueStore,
  B: Submitter,
{
  let input = body.and_then(|Json(b)| b.input);
  with_timer(&state, &match_id, |t, now| Ok(t.confirm(input.as_deref(), now)?)).await
}

/// `POST /timers/{match_id}/prompt/cancel`
pub async fn cancel<S, B>(
  State(state): State<ApiState<S, B>>,
  Path(match_id): Path<String>,
) -> Result<Json<TimerSnapshot>, ApiError>
where
  S: QueueStore,
  B: Submitter,
{
  with_timer(&state, &match_id, |t, now| Ok(t.cancel(now)?)).await
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Poll the timer, apply `op`, poll again and snapshot, all under one lock.
async fn with_timer<S, B>(
  state: &ApiState<S, B>,
  match_id: &str,
  op: impl FnOnce(&mut MatchTimer, i64) -> Result<(), ApiError>,
) -> Result<Json<TimerSnapshot>, ApiError> {
  let now = now_ms();
  let mut timers = state.timers.lock().await;
  let timer = timers
    .get_mut(match_id)
    .ok_or_else(|| ApiError::NotFound(format!("no timer for match {match_id}")))?;

  timer.poll(now);
  let before = timer.phase();
  op(timer, now)?;
  timer.poll(now);

  if timer.phase() != before {
    tracing::info!(%match_id, from = %before, to = %timer.phase(), "match phase changed");
  }
  Ok(Json(timer.snapshot(now)))
}
