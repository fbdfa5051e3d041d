//! Error types and axum `IntoResponse` implementation.
//!
//! Failures on the proxy routes are rendered in the backend's own envelope,
//! `{"success": false, "error": {"message", "code"}}`, so clients handle a
//! proxy failure the same way as a backend one.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::backend::BackendError;

#[derive(Debug, Error)]
pub enum Error {
  #[error("Invalid request format")]
  InvalidFormat,

  #[error("Service temporarily unavailable. Please try again later.")]
  Unavailable(#[source] BackendError),
}

impl Error {
  pub fn code(&self) -> &'static str {
    match self {
      Error::InvalidFormat => "INVALID_FORMAT",
      Error::Unavailable(_) => "SERVICE_UNAVAILABLE",
    }
  }

  fn status(&self) -> StatusCode {
    match self {
      Error::InvalidFormat => StatusCode::BAD_REQUEST,
      Error::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    if let Error::Unavailable(cause) = &self {
      tracing::warn!(error = %cause, "backend request failed");
    }
    let body = json!({
      "success": false,
      "error": { "message": self.to_string(), "code": self.code() },
    });
    (self.status(), Json(body)).into_response()
  }
}
