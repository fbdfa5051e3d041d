//! JSON REST API for the Brix event logger.
//!
//! Exposes an axum [`Router`] backed by any [`brix_core::queue::QueueStore`]
//! and [`brix_core::sync::Submitter`]. Logging sessions and match timers are
//! held in memory for the lifetime of the process; queued events live in the
//! store. Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/logger", brix_api::api_router(state.clone()))
//! ```

pub mod error;
pub mod etag;
pub mod queues;
pub mod sessions;
pub mod timers;

#[cfg(test)]
mod tests;

use std::{collections::HashMap, sync::Arc};

use axum::{
  Router,
  routing::{delete, get, post},
};
use brix_core::{queue::QueueStore, session::LoggerSession, sync::Submitter, timer::MatchTimer};
use tokio::sync::Mutex;
use uuid::Uuid;

pub use error::ApiError;

// ─── State ───────────────────────────────────────────────────────────────────

/// Shared state threaded through all API handlers.
pub struct ApiState<S, B> {
  pub store:     Arc<S>,
  pub submitter: Arc<B>,
  pub sessions:  Arc<Mutex<HashMap<Uuid, LoggerSession>>>,
  /// Timers keyed by match id.
  pub timers:    Arc<Mutex<HashMap<String, MatchTimer>>>,
}

impl<S, B> ApiState<S, B> {
  pub fn new(store: Arc<S>, submitter: Arc<B>) -> Self {
    Self {
      store,
      submitter,
      sessions: Arc::default(),
      timers: Arc::default(),
    }
  }
}

// Manual impl: only the `Arc`s are cloned, so `S` and `B` need not be `Clone`.
impl<S, B> Clone for ApiState<S, B> {
  fn clone(&self) -> Self {
    Self {
      store:     Arc::clone(&self.store),
      submitter: Arc::clone(&self.submitter),
      sessions:  Arc::clone(&self.sessions),
      timers:    Arc::clone(&self.timers),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router over `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, B>(state: ApiState<S, B>) -> Router<()>
where
  S: QueueStore + 'static,
  B: Submitter + 'static,
{
  Router::new()
    // Sessions
    .route("/sessions", post(sessions::create::<S, B>))
    .route("/sessions/{id}", get(sessions::get_one::<S, B>))
    .route(
      "/sessions/{id}/events",
      post(sessions::submit::<S, B>).patch(sessions::batch_edit::<S, B>),
    )
    .route("/sessions/{id}/events/last", delete(sessions::undo::<S, B>))
    .route(
      "/sessions/{id}/events/{event_id}",
      delete(sessions::remove_one::<S, B>).patch(sessions::edit_one::<S, B>),
    )
    // Queues
    .route("/queues", get(queues::keys::<S, B>))
    .route("/queues/{key}", get(queues::list::<S, B>).post(queues::add::<S, B>))
    .route("/queues/{key}/errors", get(queues::errors::<S, B>))
    .route("/queues/{key}/export", get(queues::export::<S, B>))
    .route("/queues/{key}/analytics", get(queues::analytics::<S, B>))
    .route("/queues/{key}/{id}", delete(queues::remove_one::<S, B>))
    .route("/queues/{key}/{id}/retry", post(queues::retry_one::<S, B>))
    // Timers
    .route(
      "/timers/{match_id}",
      get(timers::get_one::<S, B>).post(timers::create::<S, B>),
    )
    .route("/timers/{match_id}/start", post(timers::start::<S, B>))
    .route("/timers/{match_id}/pause", post(timers::pause::<S, B>))
    .route("/timers/{match_id}/end-period", post(timers::end_period::<S, B>))
    .route("/timers/{match_id}/prompt/confirm", post(timers::confirm::<S, B>))
    .route("/timers/{match_id}/prompt/cancel", post(timers::cancel::<S, B>))
    .with_state(state)
}
