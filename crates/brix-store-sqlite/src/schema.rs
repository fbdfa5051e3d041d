//! SQL schema for the Brix SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per undelivered event. Delivered events are deleted.
CREATE TABLE IF NOT EXISTS queued_events (
    queue_key       TEXT    NOT NULL,   -- device/session key
    event_id        TEXT    NOT NULL,
    position        INTEGER NOT NULL,   -- replay order within queue_key
    match_id        TEXT    NOT NULL,
    event_type      TEXT    NOT NULL,
    event_json      TEXT    NOT NULL,   -- full EventLog, camelCase JSON
    status          TEXT    NOT NULL DEFAULT 'pending',  -- 'pending' | 'syncing' | 'failed'
    attempts        INTEGER NOT NULL DEFAULT 0,
    last_error      TEXT,
    queued_at       TEXT    NOT NULL,   -- RFC 3339 UTC
    last_attempt_at TEXT,
    PRIMARY KEY (queue_key, event_id)
);

CREATE INDEX IF NOT EXISTS queued_events_order_idx  ON queued_events(queue_key, position);
CREATE INDEX IF NOT EXISTS queued_events_status_idx ON queued_events(status);

PRAGMA user_version = 1;
";
