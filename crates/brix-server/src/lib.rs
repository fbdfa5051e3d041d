//! HTTP service for the Brix event logger.
//!
//! Serves the health routes, the `/api/v1` pass-through to the external
//! backend, and the local logger API (`brix-api`) under `/logger`, backed by
//! any [`QueueStore`].

pub mod backend;
pub mod config;
pub mod error;
pub mod proxy;
pub mod retry;

#[cfg(test)]
mod tests;

pub use config::ServerConfig;
pub use error::Error;

use std::sync::Arc;

use axum::{Json, Router, routing::get};
use backend::BackendClient;
use brix_api::{ApiState, api_router};
use brix_core::queue::QueueStore;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S> {
  pub store:   Arc<S>,
  pub backend: Arc<BackendClient>,
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the service router.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: QueueStore + Clone + 'static,
{
  let logger = api_router(ApiState::new(
    Arc::clone(&state.store),
    Arc::clone(&state.backend),
  ));

  Router::new()
    .route("/",               get(root))
    .route("/health",         get(health))
    .route("/api/v1/{*path}", get(proxy::forward::<S>).post(proxy::forward::<S>))
    .with_state(state)
    .nest("/logger", logger)
    .layer(TraceLayer::new_for_http())
}

async fn root() -> Json<Value> { Json(json!({ "message": "Brixsport Analytics Service" })) }

async fn health() -> Json<Value> { Json(json!({ "status": "OK" })) }
