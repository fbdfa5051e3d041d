//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings; the event itself is stored as compact
//! JSON in the same camelCase shape it has on the wire.

use std::str::FromStr;

use brix_core::{
  event::EventLog,
  queue::{QueueStatus, QueuedEvent},
};
use chrono::{DateTime, Utc};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── QueueStatus ─────────────────────────────────────────────────────────────

/// Column text is the strum name, so it always agrees with `decode_status`.
pub fn encode_status(s: QueueStatus) -> &'static str { s.into() }

pub fn decode_status(s: &str) -> Result<QueueStatus> {
  QueueStatus::from_str(s).map_err(|_| Error::UnknownStatus(s.to_owned()))
}

// ─── EventLog ────────────────────────────────────────────────────────────────

pub fn encode_event(e: &EventLog) -> Result<String> { Ok(serde_json::to_string(e)?) }

pub fn decode_event(s: &str) -> Result<EventLog> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawQueuedEvent::from_row`].
pub const QUEUED_COLUMNS: &str =
  "event_json, status, attempts, last_error, queued_at, last_attempt_at";

/// Raw values read directly from a `queued_events` row.
pub struct RawQueuedEvent {
  pub event_json:      String,
  pub status:          String,
  pub attempts:        i64,
  pub last_error:      Option<String>,
  pub queued_at:       String,
  pub last_attempt_at: Option<String>,
}

impl RawQueuedEvent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_json:      row.get(0)?,
      status:          row.get(1)?,
      attempts:        row.get(2)?,
      last_error:      row.get(3)?,
      queued_at:       row.get(4)?,
      last_attempt_at: row.get(5)?,
    })
  }

  pub fn into_queued(self) -> Result<QueuedEvent> {
    Ok(QueuedEvent {
      event:           decode_event(&self.event_json)?,
      status:          decode_status(&self.status)?,
      attempts:        u32::try_from(self.attempts).unwrap_or(u32::MAX),
      last_error:      self.last_error,
      queued_at:       decode_dt(&self.queued_at)?,
      last_attempt_at: self.last_attempt_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}
