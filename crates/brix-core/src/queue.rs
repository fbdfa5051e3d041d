//! The `QueueStore` trait and queue entry types.
//!
//! A queue store buffers event submissions that have not been confirmed
//! delivered to the backend. It is the single writer of queue state: callers
//! never keep their own copy and reconcile it back.
//!
//! Queues are keyed by a device or session key. Within a key, entries keep the
//! replay order they were added in.

use std::{collections::BTreeMap, future::Future};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

use crate::event::EventLog;

// ─── Entry types ─────────────────────────────────────────────────────────────

/// Delivery state shown by the sync status indicator.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display,
  AsRefStr, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum QueueStatus {
  /// Waiting for its first delivery attempt.
  Pending,
  /// A delivery attempt is in flight.
  Syncing,
  /// The last delivery attempt failed; the auto-retry sweep will pick it up.
  Failed,
}

/// Which end of the queue a new entry joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueEnd {
  Front,
  #[default]
  Back,
}

/// An event together with its delivery bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedEvent {
  pub event:           EventLog,
  pub status:          QueueStatus,
  pub attempts:        u32,
  pub last_error:      Option<String>,
  pub queued_at:       DateTime<Utc>,
  pub last_attempt_at: Option<DateTime<Utc>>,
}

impl QueuedEvent {
  pub fn new(event: EventLog) -> Self {
    Self {
      event,
      status: QueueStatus::Pending,
      attempts: 0,
      last_error: None,
      queued_at: Utc::now(),
      last_attempt_at: None,
    }
  }
}

/// Failure messages of the failed entries, keyed by event id.
pub fn error_map(entries: &[QueuedEvent]) -> BTreeMap<String, String> {
  entries
    .iter()
    .filter(|q| q.status == QueueStatus::Failed)
    .filter_map(|q| Some((q.event.id.clone(), q.last_error.clone()?)))
    .collect()
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a persistent offline queue.
///
/// Every mutation is durable by the time its future resolves. All methods
/// return `Send` futures so the store can be shared across a tokio runtime.
pub trait QueueStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Add `event` to the queue under `key`. Re-adding an id already queued
  /// under the same key replaces the old entry.
  fn add<'a>(
    &'a self,
    key: &'a str,
    event: EventLog,
    end: QueueEnd,
  ) -> impl Future<Output = Result<QueuedEvent, Self::Error>> + Send + 'a;

  /// Retrieve one entry. Returns `None` if it is not queued.
  fn get<'a>(
    &'a self,
    key: &'a str,
    event_id: &'a str,
  ) -> impl Future<Output = Result<Option<QueuedEvent>, Self::Error>> + Send + 'a;

  /// All entries under `key` in replay order.
  fn list<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Vec<QueuedEvent>, Self::Error>> + Send + 'a;

  /// Every key that currently has at least one entry.
  fn keys(&self) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  /// Delete one entry. Returns `false` if it was not queued.
  fn remove<'a>(
    &'a self,
    key: &'a str,
    event_id: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Mark an entry as being delivered: status `syncing`, one more attempt.
  /// Returns the updated entry, or `None` if it is not queued.
  fn begin_attempt<'a>(
    &'a self,
    key: &'a str,
    event_id: &'a str,
  ) -> impl Future<Output = Result<Option<QueuedEvent>, Self::Error>> + Send + 'a;

  /// Mark an entry as failed with `error`. Returns `false` if it is not queued.
  fn record_failure<'a>(
    &'a self,
    key: &'a str,
    event_id: &'a str,
    error: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::event::{EventScope, EventType};

  fn entry(id: &str, status: QueueStatus, error: Option<&str>) -> QueuedEvent {
    let mut q = QueuedEvent::new(EventLog {
      id:          id.into(),
      match_id:    "M1".into(),
      team_id:     "T1".into(),
      player_id:   None,
      event_type:  EventType::Foul,
      timestamp:   0,
      value:       None,
      event_scope: EventScope::Internal,
      semester:    String::new(),
      offline:     true,
    });
    q.status = status;
    q.last_error = error.map(str::to_owned);
    q
  }

  #[test]
  fn error_map_lists_only_failed_entries() {
    let entries = vec![
      entry("a", QueueStatus::Failed, Some("connection refused")),
      entry("b", QueueStatus::Pending, None),
      entry("c", QueueStatus::Syncing, Some("stale")),
      entry("d", QueueStatus::Failed, Some("HTTP 500")),
    ];
    let map = error_map(&entries);
    assert_eq!(map.len(), 2);
    assert_eq!(map["a"], "connection refused");
    assert_eq!(map["d"], "HTTP 500");
  }

  #[test]
  fn status_wire_names() {
    assert_eq!(serde_json::to_string(&QueueStatus::Syncing).unwrap(), "\"syncing\"");
    assert_eq!(QueueStatus::Failed.as_ref(), "failed");
  }
}
