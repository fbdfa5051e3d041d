//! [`SqliteStore`]: the SQLite implementation of [`QueueStore`].

use std::path::Path;

use brix_core::{
  event::EventLog,
  queue::{QueueEnd, QueueStatus, QueueStore, QueuedEvent},
};
use chrono::Utc;
use rusqlite::OptionalExtension as _;

use crate::{
  Result,
  encode::{QUEUED_COLUMNS, RawQueuedEvent, encode_dt, encode_event, encode_status},
  schema::SCHEMA,
};

/// `last_error` given to entries whose delivery was cut off by a restart.
pub const INTERRUPTED_ERROR: &str = "delivery interrupted";

// ─── Store ───────────────────────────────────────────────────────────────────

/// An offline event queue backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    store.recover_interrupted().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// No attempt survives a restart, so an entry still marked `syncing` in the
  /// file belonged to a process that died mid-request. Mark it failed so the
  /// auto-retry sweep picks it up.
  async fn recover_interrupted(&self) -> Result<()> {
    let syncing = encode_status(QueueStatus::Syncing);
    let failed  = encode_status(QueueStatus::Failed);

    let n = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "UPDATE queued_events
           SET status = ?2, last_error = COALESCE(last_error, ?3)
           WHERE status = ?1",
          rusqlite::params![syncing, failed, INTERRUPTED_ERROR],
        )?;
        Ok(n)
      })
      .await?;

    if n > 0 {
      tracing::warn!(entries = n, "recovered entries interrupted mid-delivery");
    }
    Ok(())
  }

  async fn fetch(&self, key: &str, event_id: &str) -> Result<Option<QueuedEvent>> {
    let key = key.to_owned();
    let id = event_id.to_owned();

    let raw: Option<RawQueuedEvent> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {QUEUED_COLUMNS} FROM queued_events
                 WHERE queue_key = ?1 AND event_id = ?2"
              ),
              rusqlite::params![key, id],
              RawQueuedEvent::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawQueuedEvent::into_queued).transpose()
  }
}

// ─── QueueStore impl ─────────────────────────────────────────────────────────

impl QueueStore for SqliteStore {
  type Error = crate::Error;

  async fn add(&self, key: &str, event: EventLog, end: QueueEnd) -> Result<QueuedEvent> {
    let entry = QueuedEvent::new(event);

    let key_str    = key.to_owned();
    let id_str     = entry.event.id.clone();
    let match_id   = entry.event.match_id.clone();
    let event_type = entry.event.event_type.as_ref().to_owned();
    let event_json = encode_event(&entry.event)?;
    let status_str = encode_status(entry.status).to_owned();
    let queued_at  = encode_dt(entry.queued_at);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        // Re-adding an id moves it rather than duplicating it.
        tx.execute(
          "DELETE FROM queued_events WHERE queue_key = ?1 AND event_id = ?2",
          rusqlite::params![key_str, id_str],
        )?;

        let position: i64 = match end {
          QueueEnd::Front => tx.query_row(
            "SELECT COALESCE(MIN(position), 0) - 1 FROM queued_events WHERE queue_key = ?1",
            rusqlite::params![key_str],
            |r| r.get(0),
          )?,
          QueueEnd::Back => tx.query_row(
            "SELECT COALESCE(MAX(position), 0) + 1 FROM queued_events WHERE queue_key = ?1",
            rusqlite::params![key_str],
            |r| r.get(0),
          )?,
        };

        tx.execute(
          "INSERT INTO queued_events (
             queue_key, event_id, position, match_id, event_type,
             event_json, status, attempts, queued_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8)",
          rusqlite::params![
            key_str, id_str, position, match_id, event_type, event_json,
            status_str, queued_at,
          ],
        )?;

        tx.commit()?;
        Ok(())
      })
      .await?;

    tracing::debug!(queue = key, event_id = %entry.event.id, ?end, "queued event");
    Ok(entry)
  }

  async fn get(&self, key: &str, event_id: &str) -> Result<Option<QueuedEvent>> {
    self.fetch(key, event_id).await
  }

  async fn list(&self, key: &str) -> Result<Vec<QueuedEvent>> {
    let key = key.to_owned();

    let raws: Vec<RawQueuedEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {QUEUED_COLUMNS} FROM queued_events
           WHERE queue_key = ?1
           ORDER BY position ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![key], RawQueuedEvent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawQueuedEvent::into_queued).collect()
  }

  async fn keys(&self) -> Result<Vec<String>> {
    let keys = self
      .conn
      .call(|conn| {
        let mut stmt = conn
          .prepare("SELECT DISTINCT queue_key FROM queued_events ORDER BY queue_key")?;
        let rows = stmt
          .query_map([], |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(keys)
  }

  async fn remove(&self, key: &str, event_id: &str) -> Result<bool> {
    let key_str = key.to_owned();
    let id_str  = event_id.to_owned();

    let removed = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "DELETE FROM queued_events WHERE queue_key = ?1 AND event_id = ?2",
          rusqlite::params![key_str, id_str],
        )?;
        Ok(n > 0)
      })
      .await?;

    if removed {
      tracing::debug!(queue = key, event_id, "removed queued event");
    }
    Ok(removed)
  }

  async fn begin_attempt(&self, key: &str, event_id: &str) -> Result<Option<QueuedEvent>> {
    let key_str    = key.to_owned();
    let id_str     = event_id.to_owned();
    let status_str = encode_status(QueueStatus::Syncing).to_owned();
    let at_str     = encode_dt(Utc::now());

    let updated = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "UPDATE queued_events
           SET status = ?3, attempts = attempts + 1, last_attempt_at = ?4
           WHERE queue_key = ?1 AND event_id = ?2",
          rusqlite::params![key_str, id_str, status_str, at_str],
        )?;
        Ok(n > 0)
      })
      .await?;

    if !updated {
      return Ok(None);
    }
    self.fetch(key, event_id).await
  }

  async fn record_failure(&self, key: &str, event_id: &str, error: String) -> Result<bool> {
    let key_str    = key.to_owned();
    let id_str     = event_id.to_owned();
    let status_str = encode_status(QueueStatus::Failed).to_owned();

    tracing::warn!(queue = key, event_id, %error, "event delivery failed");

    let updated = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "UPDATE queued_events SET status = ?3, last_error = ?4
           WHERE queue_key = ?1 AND event_id = ?2",
          rusqlite::params![key_str, id_str, status_str, error],
        )?;
        Ok(n > 0)
      })
      .await?;
    Ok(updated)
  }
}
