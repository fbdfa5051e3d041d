//! Server configuration and backend URL resolution.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Environment variables naming the backend base URL, in priority order.
pub const BACKEND_URL_ENV_VARS: [&str; 3] =
  ["NEXT_PUBLIC_API_URL", "API_URL", "NEXT_PUBLIC_API_BASE_URL"];

/// Used when neither the environment nor the config file names a backend.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:4000";

/// Runtime server configuration, deserialised from `config.toml` and
/// `BRIX_`-prefixed environment variables. Every field has a default, so the
/// file is optional.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                 String,
  #[serde(default = "default_port")]
  pub port:                 u16,
  /// SQLite file holding the offline queues. A leading `~/` is expanded.
  #[serde(default = "default_store_path")]
  pub store_path:           PathBuf,
  /// Overridden by the backend URL environment variables.
  #[serde(default)]
  pub backend_url:          Option<String>,
  #[serde(default = "default_retry_interval_secs")]
  pub retry_interval_secs:  u64,
  #[serde(default = "default_request_timeout_secs")]
  pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                 default_host(),
      port:                 default_port(),
      store_path:           default_store_path(),
      backend_url:          None,
      retry_interval_secs:  default_retry_interval_secs(),
      request_timeout_secs: default_request_timeout_secs(),
    }
  }
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8000 }

fn default_store_path() -> PathBuf { PathBuf::from("brix-queue.sqlite") }

fn default_retry_interval_secs() -> u64 { brix_core::sync::AUTO_RETRY_INTERVAL.as_secs() }

fn default_request_timeout_secs() -> u64 { 30 }

/// Pick the backend base URL: the first non-empty environment variable from
/// [`BACKEND_URL_ENV_VARS`], then `configured`, then [`DEFAULT_BACKEND_URL`].
///
/// `env` is the variable lookup, normally `|k| std::env::var(k).ok()`.
pub fn resolve_backend_url(
  configured: Option<&str>,
  env: impl Fn(&str) -> Option<String>,
) -> String {
  BACKEND_URL_ENV_VARS
    .iter()
    .filter_map(|name| env(name))
    .chain(configured.map(str::to_owned))
    .map(|url| url.trim().trim_end_matches('/').to_owned())
    .find(|url| !url.is_empty())
    .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_owned())
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
