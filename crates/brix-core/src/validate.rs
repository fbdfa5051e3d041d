//! Submission gate for the event logger form.
//!
//! Rules run in a fixed order and the first failure wins. Each failure carries
//! exactly one human-readable message, which is what the operator sees.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::{EventLog, EventScope, EventType, EventValue, Sport};

/// Players allowed on a football team sheet.
pub const FOOTBALL_ROSTER_CAP: usize = 11;

// ─── Form input ──────────────────────────────────────────────────────────────

/// A player as listed on the selected team's roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRef {
  pub id:            String,
  #[serde(default)]
  pub jersey_number: Option<String>,
}

/// The current state of the logger form. Every selection is optional because
/// the operator may submit before filling it in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
  pub sport:        Sport,
  #[serde(default)]
  pub team_id:      Option<String>,
  #[serde(default)]
  pub event_type:   Option<EventType>,
  #[serde(default)]
  pub player_id:    Option<String>,
  #[serde(default)]
  pub value:        Option<EventValue>,
  #[serde(default)]
  pub event_scope:  EventScope,
  /// The selected team's player list.
  #[serde(default)]
  pub team_players: Vec<PlayerRef>,
}

impl EventDraft {
  pub fn new(sport: Sport) -> Self {
    Self {
      sport,
      team_id: None,
      event_type: None,
      player_id: None,
      value: None,
      event_scope: EventScope::default(),
      team_players: Vec::new(),
    }
  }

  pub fn team(&self) -> Option<&str> { selected(&self.team_id) }

  pub fn player(&self) -> Option<&str> { selected(&self.player_id) }

  /// The roster entry of the selected player, if it is listed.
  pub fn selected_player(&self) -> Option<&PlayerRef> {
    let id = self.player()?;
    self.team_players.iter().find(|p| p.id == id)
  }
}

/// An empty or blank select box means nothing was chosen.
fn selected(field: &Option<String>) -> Option<&str> {
  field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("Please select a team and event type.")]
  MissingTeamOrEventType,

  #[error("Please select a player.")]
  MissingPlayer,

  #[error("Please enter a time or measurement.")]
  MissingValue,

  #[error("Duplicate event detected in the same second.")]
  Duplicate,

  #[error("Jersey number must be numeric.")]
  NonNumericJersey,

  #[error("Football teams cannot have more than 11 players on the field.")]
  RosterTooLarge,

  #[error("{event_type} is not recorded for {sport}.")]
  EventTypeNotForSport { event_type: EventType, sport: Sport },
}

// ─── Rules ───────────────────────────────────────────────────────────────────

/// Check `draft` against the events already logged in this session.
///
/// `now_ms` is the capture time the submission would get; the duplicate guard
/// compares whole wall-clock seconds against `session_events` only.
pub fn validate(
  draft: &EventDraft,
  session_events: &[EventLog],
  now_ms: i64,
) -> Result<EventType, ValidationError> {
  let (Some(_), Some(event_type)) = (draft.team(), draft.event_type) else {
    return Err(ValidationError::MissingTeamOrEventType);
  };

  if draft.sport.requires_player() && draft.player().is_none() {
    return Err(ValidationError::MissingPlayer);
  }

  if draft.sport.requires_value()
    && draft.value.as_ref().is_none_or(EventValue::is_empty)
  {
    return Err(ValidationError::MissingValue);
  }

  let second = now_ms.div_euclid(1000);
  if session_events
    .iter()
    .any(|e| e.event_type == event_type && e.second() == second)
  {
    return Err(ValidationError::Duplicate);
  }

  if let Some(jersey) = draft
    .selected_player()
    .and_then(|p| p.jersey_number.as_deref())
    .map(str::trim)
    .filter(|j| !j.is_empty())
    && !jersey.chars().all(|c| c.is_ascii_digit())
  {
    return Err(ValidationError::NonNumericJersey);
  }

  if draft.sport == Sport::Football
    && draft.team_players.len() > FOOTBALL_ROSTER_CAP
  {
    return Err(ValidationError::RosterTooLarge);
  }

  if !draft.sport.records(event_type) {
    return Err(ValidationError::EventTypeNotForSport {
      event_type,
      sport: draft.sport,
    });
  }

  Ok(event_type)
}
