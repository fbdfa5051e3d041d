//! Logging session: the in-memory list of events one operator has logged for
//! one match.
//!
//! The session is the only place the duplicate guard looks. Persisted copies
//! live in the queue store and are never touched from here.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  event::{EventLog, EventScope, EventValue, Sport},
  validate::{EventDraft, ValidationError, validate},
};

/// Queue key used when a session does not name one.
pub const DEFAULT_QUEUE_KEY: &str = "offlineEventQueue";

/// Partial update applied by inline and batch edits. Absent fields are kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPatch {
  pub player_id:   Option<String>,
  pub value:       Option<EventValue>,
  pub event_scope: Option<EventScope>,
}

impl EventPatch {
  /// Apply to `event` only if the result still satisfies the submit-time
  /// player and value rules; otherwise `event` is left untouched.
  fn apply(&self, event: &mut EventLog) -> std::result::Result<(), ValidationError> {
    let mut patched = event.clone();
    if let Some(player_id) = &self.player_id {
      patched.player_id = Some(player_id.clone()).filter(|p| !p.trim().is_empty());
    }
    if let Some(value) = &self.value {
      patched.value = Some(value.clone()).filter(|v| !v.is_empty());
    }
    if let Some(scope) = self.event_scope {
      patched.event_scope = scope;
    }
    check_recorded(&patched)?;
    *event = patched;
    Ok(())
  }
}

/// Track event types carry a value and never a required player; every other
/// event type names a player.
fn check_recorded(event: &EventLog) -> std::result::Result<(), ValidationError> {
  if Sport::TrackEvents.records(event.event_type) {
    if event.value.is_none() {
      return Err(ValidationError::MissingValue);
    }
  } else if event.player_id.is_none() {
    return Err(ValidationError::MissingPlayer);
  }
  Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggerSession {
  pub session_id: Uuid,
  pub match_id:   String,
  pub semester:   String,
  /// The offline queue submissions from this session are pushed to.
  pub queue_key:  String,
  events:         Vec<EventLog>,
}

impl LoggerSession {
  pub fn new(
    match_id: impl Into<String>,
    semester: impl Into<String>,
    queue_key: Option<String>,
  ) -> Self {
    Self {
      session_id: Uuid::new_v4(),
      match_id:   match_id.into(),
      semester:   semester.into(),
      queue_key:  queue_key
        .filter(|k| !k.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_QUEUE_KEY.to_owned()),
      events:     Vec::new(),
    }
  }

  /// Events logged so far, oldest first.
  pub fn events(&self) -> &[EventLog] { &self.events }

  /// Validate `draft` and, if it passes, record it as a new event captured at
  /// `now_ms`.
  pub fn submit(
    &mut self,
    draft: &EventDraft,
    now_ms: i64,
    offline: bool,
  ) -> Result<EventLog> {
    let event_type = validate(draft, &self.events, now_ms)?;

    let event = EventLog {
      id: EventLog::new_id(now_ms),
      match_id: self.match_id.clone(),
      team_id: draft.team().unwrap_or_default().to_owned(),
      player_id: draft.player().map(str::to_owned),
      event_type,
      timestamp: now_ms,
      value: draft.value.clone().filter(|v| !v.is_empty()),
      event_scope: draft.event_scope,
      semester: self.semester.clone(),
      offline,
    };

    self.events.push(event.clone());
    Ok(event)
  }

  /// Remove the most recent event.
  pub fn undo(&mut self) -> Option<EventLog> { self.events.pop() }

  pub fn remove(&mut self, event_id: &str) -> Result<EventLog> {
    let idx = self
      .events
      .iter()
      .position(|e| e.id == event_id)
      .ok_or_else(|| Error::EventNotFound(event_id.to_owned()))?;
    Ok(self.events.remove(idx))
  }

  pub fn edit(&mut self, event_id: &str, patch: &EventPatch) -> Result<&EventLog> {
    let event = self
      .events
      .iter_mut()
      .find(|e| e.id == event_id)
      .ok_or_else(|| Error::EventNotFound(event_id.to_owned()))?;
    patch.apply(event)?;
    Ok(event)
  }

  /// Apply `patch` to every listed event that exists; returns how many changed.
  ///
  /// The batch is all or nothing: if the patch would leave any listed event
  /// failing validation, no event is changed.
  pub fn batch_edit(
    &mut self,
    event_ids: &[String],
    patch: &EventPatch,
  ) -> Result<usize> {
    let mut staged: Vec<(usize, EventLog)> = Vec::new();
    for (idx, event) in self.events.iter().enumerate() {
      if event_ids.contains(&event.id) {
        let mut patched = event.clone();
        patch.apply(&mut patched)?;
        staged.push((idx, patched));
      }
    }
    let changed = staged.len();
    for (idx, patched) in staged {
      self.events[idx] = patched;
    }
    Ok(changed)
  }
}
