//! Core types and operations for the Brix live-event logger.
//!
//! This crate has no HTTP or database dependencies.
//! Storage backends implement [`queue::QueueStore`]; the backend client
//! implements [`sync::Submitter`].

#![allow(async_fn_in_trait)]

pub mod analytics;
pub mod error;
pub mod event;
pub mod export;
pub mod queue;
pub mod session;
pub mod sync;
pub mod timer;
pub mod validate;

pub use error::{Error, Result};
