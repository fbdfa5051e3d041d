//! Background sweep that retries failed queue entries on a fixed cadence.
//!
//! Best effort: no backoff, no attempt cap. A sweep that errors is logged and
//! the next tick tries again. Entries stuck `syncing` for longer than
//! `stale_after` are swept along with failed ones.

use std::{sync::Arc, time::Duration};

use brix_core::{
  queue::QueueStore,
  sync::{Submitter, sweep_failed},
};
use tokio::{
  select,
  sync::watch,
  task::JoinHandle,
  time::{Instant, MissedTickBehavior, interval_at},
};

/// Spawn the sweep loop. It stops once `shutdown` changes or its sender is
/// dropped.
pub fn spawn_retry_worker<S, B>(
  store: Arc<S>,
  submitter: Arc<B>,
  period: Duration,
  stale_after: Duration,
  mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()>
where
  S: QueueStore + 'static,
  B: Submitter + 'static,
{
  tokio::spawn(async move {
    tracing::info!(period_secs = period.as_secs_f64(), "auto-retry worker starting");

    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
      select! {
        _ = ticker.tick() => {
          match sweep_failed(store.as_ref(), submitter.as_ref(), stale_after).await {
            Ok(report) if report.attempted > 0 => tracing::info!(
              attempted = report.attempted,
              delivered = report.delivered,
              failed = report.failed,
              "auto-retry sweep"
            ),
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "auto-retry sweep failed"),
          }
        },
        _ = shutdown.changed() => {
          tracing::info!("auto-retry worker shutting down");
          break;
        },
      }
    }
  })
}
