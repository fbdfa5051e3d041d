//! `GET|POST /api/v1/{*path}`: pass-through to the backend.
//!
//! The JSON body and `Authorization` header are forwarded; the backend's
//! status and body come back verbatim. A body that is not JSON is rejected
//! here without contacting the backend.

use axum::{
  body::Bytes,
  extract::{Path, RawQuery, State},
  http::{HeaderMap, Method, header},
  response::{IntoResponse, Response},
};
use brix_core::queue::QueueStore;

use crate::{AppState, Error};

pub async fn forward<S>(
  State(state): State<AppState<S>>,
  method: Method,
  Path(path): Path<String>,
  RawQuery(query): RawQuery,
  headers: HeaderMap,
  body: Bytes,
) -> Result<Response, Error>
where
  S: QueueStore + Clone + 'static,
{
  let json = if method == Method::POST {
    let value: serde_json::Value =
      serde_json::from_slice(&body).map_err(|_| Error::InvalidFormat)?;
    Some(value)
  } else {
    None
  };

  tracing::debug!(%method, %path, "proxying to backend");

  let forwarded = state
    .backend
    .forward(
      method,
      &path,
      query.as_deref(),
      headers.get(header::AUTHORIZATION),
      json.as_ref(),
    )
    .await
    .map_err(Error::Unavailable)?;

  let mut res = (forwarded.status, forwarded.body).into_response();
  if let Some(ct) = forwarded.content_type {
    res.headers_mut().insert(header::CONTENT_TYPE, ct);
  }
  Ok(res)
}
