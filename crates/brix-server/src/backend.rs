//! HTTP client for the external backend API.
//!
//! Used two ways: the proxy routes forward requests through
//! [`BackendClient::forward`], and the offline queue delivers events through
//! its [`Submitter`] impl.

use std::time::Duration;

use axum::http::{HeaderValue, Method, StatusCode, header};
use brix_core::{event::EventLog, sync::Submitter};
use bytes::Bytes;
use reqwest::Client;
use thiserror::Error;

/// Path under `/api/v1` that accepts logged events.
pub const EVENTS_PATH: &str = "events";

#[derive(Debug, Error)]
pub enum BackendError {
  #[error("backend unreachable: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("backend returned HTTP {status}: {body}")]
  Rejected { status: u16, body: String },
}

/// A backend response passed through unchanged.
#[derive(Debug)]
pub struct Forwarded {
  pub status:       StatusCode,
  pub content_type: Option<HeaderValue>,
  pub body:         Bytes,
}

/// Async HTTP client for the backend's `/api/v1` surface.
///
/// Cheap to clone: the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct BackendClient {
  client:   Client,
  base_url: String,
}

impl BackendClient {
  pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
    let client = Client::builder().timeout(timeout).build()?;
    Ok(Self {
      client,
      base_url: base_url.into().trim_end_matches('/').to_owned(),
    })
  }

  pub fn base_url(&self) -> &str { &self.base_url }

  fn url(&self, path: &str) -> String {
    format!("{}/api/v1/{}", self.base_url, path.trim_start_matches('/'))
  }

  /// Send `method` to `/api/v1/{path}` with an optional query string,
  /// `Authorization` header and JSON body.
  pub async fn forward(
    &self,
    method: Method,
    path: &str,
    query: Option<&str>,
    authorization: Option<&HeaderValue>,
    body: Option<&serde_json::Value>,
  ) -> Result<Forwarded, BackendError> {
    let mut url = self.url(path);
    if let Some(q) = query.filter(|q| !q.is_empty()) {
      url.push('?');
      url.push_str(q);
    }

    let mut req = self.client.request(method, url);
    if let Some(auth) = authorization {
      req = req.header(header::AUTHORIZATION, auth.clone());
    }
    if let Some(json) = body {
      req = req.json(json);
    }

    let resp = req.send().await?;
    let status = resp.status();
    let content_type = resp.headers().get(header::CONTENT_TYPE).cloned();
    let body = resp.bytes().await?;
    Ok(Forwarded { status, content_type, body })
  }
}

impl Submitter for BackendClient {
  type Error = BackendError;

  async fn submit(&self, event: &EventLog) -> Result<(), BackendError> {
    let resp = self.client.post(self.url(EVENTS_PATH)).json(event).send().await?;
    let status = resp.status();
    if status.is_success() {
      tracing::debug!(event_id = %event.id, "event delivered");
      return Ok(());
    }
    let body = resp.text().await.unwrap_or_default();
    Err(BackendError::Rejected { status: status.as_u16(), body })
  }
}
