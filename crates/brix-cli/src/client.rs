//! Async HTTP client wrapping the brix logger API.

use anyhow::{Context, Result, anyhow};
use brix_core::{
  analytics::ChartSeries,
  export::ExportFormat,
  queue::QueuedEvent,
  sync::RetryOutcome,
};
use reqwest::{Client, Response, StatusCode, Url};
use std::time::Duration;

/// Connection settings for the brix server.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
}

/// Async HTTP client for the `/logger` JSON API.
///
/// Cheap to clone: the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  /// `/logger/<segments...>` under the base URL. Each segment is
  /// percent-encoded, so keys and ids may contain `/`, `?` or spaces.
  fn url(&self, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(&self.config.base_url)
      .with_context(|| format!("invalid server URL {:?}", self.config.base_url))?;
    url
      .path_segments_mut()
      .map_err(|()| anyhow!("server URL {:?} cannot take a path", self.config.base_url))?
      .pop_if_empty()
      .push("logger")
      .extend(segments);
    Ok(url)
  }

  /// Turn a non-2xx response into an error carrying the API's message.
  async fn check(resp: Response, what: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }
    let message = resp
      .json::<serde_json::Value>()
      .await
      .ok()
      .and_then(|v| v["error"].as_str().map(str::to_owned))
      .unwrap_or_else(|| status.to_string());
    Err(anyhow!("{what} → {message}"))
  }

  // ── Queues ────────────────────────────────────────────────────────────────

  /// `GET /logger/queues`
  pub async fn list_keys(&self) -> Result<Vec<String>> {
    let resp = self
      .client
      .get(self.url(&["queues"])?)
      .send()
      .await
      .context("GET /queues failed")?;
    Self::check(resp, "GET /queues")
      .await?
      .json()
      .await
      .context("deserialising queue keys")
  }

  /// `GET /logger/queues/{key}`
  pub async fn list_queue(&self, key: &str) -> Result<Vec<QueuedEvent>> {
    let resp = self
      .client
      .get(self.url(&["queues", key])?)
      .send()
      .await
      .context("GET /queues/{key} failed")?;
    Self::check(resp, "GET /queues/{key}")
      .await?
      .json()
      .await
      .context("deserialising queue")
  }

  /// `POST /logger/queues/{key}/{id}/retry`
  pub async fn retry(&self, key: &str, id: &str) -> Result<RetryOutcome> {
    let resp = self
      .client
      .post(self.url(&["queues", key, id, "retry"])?)
      .send()
      .await
      .context("POST retry failed")?;
    if resp.status() == StatusCode::NOT_FOUND {
      return Ok(RetryOutcome::NotQueued);
    }
    Self::check(resp, "POST retry")
      .await?
      .json()
      .await
      .context("deserialising retry outcome")
  }

  /// `DELETE /logger/queues/{key}/{id}`: `false` if it was already gone.
  pub async fn remove(&self, key: &str, id: &str) -> Result<bool> {
    let resp = self
      .client
      .delete(self.url(&["queues", key, id])?)
      .send()
      .await
      .context("DELETE failed")?;
    if resp.status() == StatusCode::NOT_FOUND {
      return Ok(false);
    }
    Self::check(resp, "DELETE").await?;
    Ok(true)
  }

  /// `GET /logger/queues/{key}/export?format=...`: the document body.
  pub async fn export(&self, key: &str, format: ExportFormat) -> Result<String> {
    let resp = self
      .client
      .get(self.url(&["queues", key, "export"])?)
      .query(&[("format", format.as_ref())])
      .send()
      .await
      .context("GET export failed")?;
    Self::check(resp, "GET export")
      .await?
      .text()
      .await
      .context("reading export body")
  }

  /// `GET /logger/queues/{key}/analytics`
  pub async fn analytics(&self, key: &str) -> Result<Vec<ChartSeries>> {
    let resp = self
      .client
      .get(self.url(&["queues", key, "analytics"])?)
      .send()
      .await
      .context("GET analytics failed")?;
    Self::check(resp, "GET analytics")
      .await?
      .json()
      .await
      .context("deserialising chart series")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn client(base_url: &str) -> ApiClient {
    ApiClient::new(ApiConfig { base_url: base_url.to_owned() }).unwrap()
  }

  #[test]
  fn path_segments_are_percent_encoded() {
    let c = client("http://127.0.0.1:8000");
    let url = c.url(&["queues", "dev a/b?x#y", "e1", "retry"]).unwrap();
    assert_eq!(
      url.as_str(),
      "http://127.0.0.1:8000/logger/queues/dev%20a%2Fb%3Fx%23y/e1/retry"
    );
    assert_eq!(url.query(), None);
  }

  #[test]
  fn base_path_and_trailing_slash_are_kept_once() {
    let c = client("http://host/brix/");
    assert_eq!(c.url(&["queues"]).unwrap().as_str(), "http://host/brix/logger/queues");
  }

  #[test]
  fn unusable_base_url_is_an_error() {
    assert!(client("not a url").url(&["queues"]).is_err());
    assert!(client("mailto:ops@example.com").url(&["queues"]).is_err());
  }
}
