//! Error types for `brix-core`.

use thiserror::Error;

use crate::{timer::Phase, validate::ValidationError};

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Validation(#[from] ValidationError),

  #[error("event not found: {0}")]
  EventNotFound(String),

  #[error("invalid stoppage time {0:?}: enter a whole number of minutes from 1 to 90")]
  InvalidStoppage(String),

  #[error("a prompt is awaiting the operator's answer")]
  PromptPending,

  #[error("no prompt is awaiting an answer")]
  NoPendingPrompt,

  #[error("the timer is already running")]
  AlreadyRunning,

  #[error("the match timer is in terminal phase {0}")]
  Terminal(Phase),

  #[error("phase cannot move backwards from {from} to {to}")]
  BackwardTransition { from: Phase, to: Phase },

  #[error("csv error: {0}")]
  Csv(#[from] csv::Error),

  #[error("export error: {0}")]
  Export(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
