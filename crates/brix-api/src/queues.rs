//! Handlers for `/queues` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/queues` | Keys with at least one entry |
//! | `GET`    | `/queues/{key}` | Entries in replay order |
//! | `POST`   | `/queues/{key}` | Body: [`AddBody`]; returns 201 + entry |
//! | `DELETE` | `/queues/{key}/{id}` | 204, or 404 if not queued |
//! | `POST`   | `/queues/{key}/{id}/retry` | [`RetryOutcome`] |
//! | `GET`    | `/queues/{key}/errors` | `{eventId: lastError}` for failed entries |
//! | `GET`    | `/queues/{key}/export` | `?format=json\|csv`; attachment with ETag |
//! | `GET`    | `/queues/{key}/analytics` | `?bucket_minutes`; chart series |

use std::collections::BTreeMap;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{HeaderMap, HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use brix_core::{
  analytics::{self, ChartSeries},
  event::EventLog,
  export::{ExportFormat, export as render_export},
  queue::{QueueEnd, QueueStore, QueuedEvent, error_map},
  sync::{RetryOutcome, Submitter, retry},
};
use serde::Deserialize;

use crate::{
  ApiState,
  error::ApiError,
  etag::{compute_etag, matches_if_none_match},
};

// ─── Read ────────────────────────────────────────────────────────────────────

/// `GET /queues`
pub async fn keys<S, B>(
  State(state): State<ApiState<S, B>>,
) -> Result<Json<Vec<String>>, ApiError>
where
  S: QueueStore,
  B: Submitter,
{
  let keys = state.store.keys().await.map_err(ApiError::store)?;
  Ok(Json(keys))
}

/// `GET /queues/{key}`
pub async fn list<S, B>(
  State(state): State<ApiState<S, B>>,
  Path(key): Path<String>,
) -> Result<Json<Vec<QueuedEvent>>, ApiError>
where
  S: QueueStore,
  B: Submitter,
{
  let entries = state.store.list(&key).await.map_err(ApiError::store)?;
  Ok(Json(entries))
}

/// `GET /queues/{key}/errors`
pub async fn errors<S, B>(
  State(state): State<ApiState<S, B>>,
  Path(key): Path<String>,
) -> Result<Json<BTreeMap<String, String>>, ApiError>
where
  S: QueueStore,
  B: Submitter,
{
  let entries = state.store.list(&key).await.map_err(ApiError::store)?;
  Ok(Json(error_map(&entries)))
}

// ─── Add / remove ────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /queues/{key}`.
#[derive(Debug, Deserialize)]
pub struct AddBody {
  pub event:    EventLog,
  /// `front` or `back` (default).
  #[serde(default)]
  pub position: QueueEnd,
}

/// `POST /queues/{key}`: returns 201 + the stored entry.
pub async fn add<S, B>(
  State(state): State<ApiState<S, B>>,
  Path(key): Path<String>,
  Json(body): Json<AddBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: QueueStore,
  B: Submitter,
{
  if body.event.id.trim().is_empty() {
    return Err(ApiError::BadRequest("event id must not be empty".into()));
  }
  let entry = state
    .store
    .add(&key, body.event, body.position)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(entry)))
}

/// `DELETE /queues/{key}/{id}`
pub async fn remove_one<S, B>(
  State(state): State<ApiState<S, B>>,
  Path((key, id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError>
where
  S: QueueStore,
  B: Submitter,
{
  if state.store.remove(&key, &id).await.map_err(ApiError::store)? {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("event {id} is not queued under {key}")))
  }
}

// ─── Retry ───────────────────────────────────────────────────────────────────

/// `POST /queues/{key}/{id}/retry`: a failed delivery is still a 200; the
/// outcome says what happened.
pub async fn retry_one<S, B>(
  State(state): State<ApiState<S, B>>,
  Path((key, id)): Path<(String, String)>,
) -> Result<Json<RetryOutcome>, ApiError>
where
  S: QueueStore,
  B: Submitter,
{
  let outcome = retry(state.store.as_ref(), state.submitter.as_ref(), &key, &id)
    .await
    .map_err(ApiError::store)?;

  match outcome {
    RetryOutcome::NotQueued => {
      Err(ApiError::NotFound(format!("event {id} is not queued under {key}")))
    }
    outcome => Ok(Json(outcome)),
  }
}

// ─── Export ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ExportParams {
  #[serde(default)]
  pub format: ExportFormat,
}

/// `GET /queues/{key}/export?format=json|csv`
///
/// Honors `If-None-Match` with a 304.
pub async fn export<S, B>(
  State(state): State<ApiState<S, B>>,
  Path(key): Path<String>,
  Query(params): Query<ExportParams>,
  headers: HeaderMap,
) -> Result<Response, ApiError>
where
  S: QueueStore,
  B: Submitter,
{
  let entries = state.store.list(&key).await.map_err(ApiError::store)?;
  let body = render_export(&entries, params.format)?;
  let etag = compute_etag(body.as_bytes());

  let not_modified = headers
    .get(header::IF_NONE_MATCH)
    .and_then(|v| v.to_str().ok())
    .is_some_and(|v| matches_if_none_match(v, &etag));

  let etag_value = HeaderValue::from_str(&etag)
    .map_err(|e| ApiError::Internal(e.to_string()))?;

  if not_modified {
    return Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, etag_value)]).into_response());
  }

  let disposition = format!(
    "attachment; filename=\"{}.{}\"",
    sanitize_filename(&key),
    params.format.extension()
  );
  let disposition = HeaderValue::from_str(&disposition)
    .map_err(|e| ApiError::Internal(e.to_string()))?;

  tracing::debug!(queue = %key, format = %params.format, entries = entries.len(), "exported queue");

  Ok(
    (
      [
        (header::CONTENT_TYPE, HeaderValue::from_static(params.format.content_type())),
        (header::CONTENT_DISPOSITION, disposition),
        (header::ETAG, etag_value),
      ],
      body,
    )
      .into_response(),
  )
}

/// Keep only characters that are safe inside a quoted header filename.
fn sanitize_filename(key: &str) -> String {
  let cleaned: String = key
    .chars()
    .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    .collect();
  if cleaned.is_empty() { "queue".to_owned() } else { cleaned }
}

// ─── Analytics ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AnalyticsParams {
  /// Width of each timeline bucket. Default 5.
  pub bucket_minutes: Option<u32>,
}

/// `GET /queues/{key}/analytics`: chart series over the queued events.
pub async fn analytics<S, B>(
  State(state): State<ApiState<S, B>>,
  Path(key): Path<String>,
  Query(params): Query<AnalyticsParams>,
) -> Result<Json<Vec<ChartSeries>>, ApiError>
where
  S: QueueStore,
  B: Submitter,
{
  let events: Vec<EventLog> = state
    .store
    .list(&key)
    .await
    .map_err(ApiError::store)?
    .into_iter()
    .map(|q| q.event)
    .collect();

  let mut series = analytics::dashboard(&events);
  // The timeline is the last series of the dashboard set.
  if let Some(bucket) = params.bucket_minutes
    && let Some(last) = series.last_mut()
  {
    *last = analytics::timeline(&events, bucket);
  }
  Ok(Json(series))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn filenames_drop_unsafe_characters() {
    assert_eq!(sanitize_filename("offlineEventQueue"), "offlineEventQueue");
    assert_eq!(sanitize_filename("dev \"a\"/b"), "devab");
    assert_eq!(sanitize_filename("///"), "queue");
  }
}
