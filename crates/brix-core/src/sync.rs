//! Delivery of queued events to the backend.
//!
//! An entry leaves the queue only when its submission succeeds. Failures are
//! not classified: a rejected payload and a dropped connection are both
//! recorded as `failed` and retried the same way on the next sweep.
//!
//! An entry left `syncing` by an attempt that never finished (the caller was
//! cancelled or the process died mid-request) is picked up by the sweep once
//! its last attempt is older than the sweep's staleness window.

use std::{future::Future, time::Duration};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  event::EventLog,
  queue::{QueueEnd, QueueStatus, QueueStore, QueuedEvent},
};

/// Cadence of the background sweep over failed entries.
pub const AUTO_RETRY_INTERVAL: Duration = Duration::from_secs(10);

/// The external submission call, e.g. an HTTP client for the backend API.
pub trait Submitter: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn submit<'a>(
    &'a self,
    event: &'a EventLog,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RetryOutcome {
  /// Accepted by the backend and removed from the queue.
  Delivered,
  /// Still queued, now marked failed.
  Failed { error: String },
  /// Nothing with that id is queued.
  NotQueued,
}

/// Attempt delivery of one queued entry.
pub async fn retry<S, B>(
  store: &S,
  submitter: &B,
  key: &str,
  event_id: &str,
) -> Result<RetryOutcome, S::Error>
where
  S: QueueStore,
  B: Submitter,
{
  let Some(entry) = store.begin_attempt(key, event_id).await? else {
    return Ok(RetryOutcome::NotQueued);
  };

  match submitter.submit(&entry.event).await {
    Ok(()) => {
      store.remove(key, event_id).await?;
      Ok(RetryOutcome::Delivered)
    }
    Err(e) => {
      let error = e.to_string();
      store.record_failure(key, event_id, error.clone()).await?;
      Ok(RetryOutcome::Failed { error })
    }
  }
}

/// Queue `event` and, when `send_now` is set, try to deliver it straight away.
///
/// Returns the entry as it stands afterwards; `None` means it was delivered.
pub async fn enqueue<S, B>(
  store: &S,
  submitter: &B,
  key: &str,
  event: EventLog,
  send_now: bool,
) -> Result<Option<QueuedEvent>, S::Error>
where
  S: QueueStore,
  B: Submitter,
{
  let id = event.id.clone();
  let queued = store.add(key, event, QueueEnd::Back).await?;
  if !send_now {
    return Ok(Some(queued));
  }
  match retry(store, submitter, key, &id).await? {
    RetryOutcome::Delivered => Ok(None),
    _ => store.get(key, &id).await,
  }
}

/// Counts from one pass of [`sweep_failed`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
  pub attempted: usize,
  pub delivered: usize,
  pub failed:    usize,
}

/// Retry every `failed` entry under every key, in replay order, along with
/// any `syncing` entry whose last attempt started at least `stale_after` ago.
pub async fn sweep_failed<S, B>(
  store: &S,
  submitter: &B,
  stale_after: Duration,
) -> Result<SweepReport, S::Error>
where
  S: QueueStore,
  B: Submitter,
{
  let stale_after = TimeDelta::from_std(stale_after).unwrap_or(TimeDelta::MAX);
  let mut report = SweepReport::default();

  for key in store.keys().await? {
    let now = Utc::now();
    let failed: Vec<String> = store
      .list(&key)
      .await?
      .into_iter()
      .filter(|q| is_due(q, now, stale_after))
      .map(|q| q.event.id)
      .collect();

    for id in failed {
      report.attempted += 1;
      match retry(store, submitter, &key, &id).await? {
        RetryOutcome::Delivered => report.delivered += 1,
        RetryOutcome::Failed { .. } => report.failed += 1,
        RetryOutcome::NotQueued => report.attempted -= 1,
      }
    }
  }

  Ok(report)
}

fn is_due(entry: &QueuedEvent, now: DateTime<Utc>, stale_after: TimeDelta) -> bool {
  match entry.status {
    QueueStatus::Pending => false,
    QueueStatus::Failed => true,
    QueueStatus::Syncing => entry
      .last_attempt_at
      .is_none_or(|at| now.signed_duration_since(at) >= stale_after),
  }
}
