//! Event types: the record of one officiating action.
//!
//! An [`EventLog`] is created by a logging session on submit and travels to
//! the backend through the offline queue. Wire field names are camelCase so
//! the JSON matches what the backend accepts.

use std::fmt;

use chrono::Utc;
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

// ─── Sport ───────────────────────────────────────────────────────────────────

/// The sport a logging session records events for.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display,
  AsRefStr, EnumIter, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Sport {
  Football,
  Basketball,
  Volleyball,
  TableTennis,
  Badminton,
  /// Track and field: laps, finishes and field measurements.
  TrackEvents,
}

impl Sport {
  /// Whether every event of this sport must name a player.
  pub fn requires_player(self) -> bool { !matches!(self, Self::TrackEvents) }

  /// Whether every event of this sport must carry a time or measurement.
  pub fn requires_value(self) -> bool { matches!(self, Self::TrackEvents) }

  /// The event types an official may record for this sport.
  pub fn event_types(self) -> &'static [EventType] {
    use EventType::*;
    match self {
      Self::Football => &[
        Goal, OwnGoal, Assist, YellowCard, RedCard, Foul, Corner, Offside,
        Penalty, FreeKick, Save, Substitution,
      ],
      Self::Basketball => &[
        FieldGoal, ThreePointer, FreeThrow, Rebound, Assist, Steal, Block,
        Turnover, Foul, Timeout, Substitution,
      ],
      Self::Volleyball => &[
        Point, Ace, Kill, Block, Dig, ServiceError, AttackError, Timeout,
        Substitution,
      ],
      Self::TableTennis => &[Point, Ace, ServiceFault, Net, EdgeBall, Timeout],
      Self::Badminton => &[Point, Ace, ServiceFault, Net, Let, ShuttleOut, Timeout],
      Self::TrackEvents => &[
        LapTime, SplitTime, FinishTime, FalseStart, Disqualification,
        FieldMeasurement,
      ],
    }
  }

  pub fn records(self, event_type: EventType) -> bool {
    self.event_types().contains(&event_type)
  }
}

// ─── EventType ───────────────────────────────────────────────────────────────

/// Closed set of officiating actions. The snake_case name is the wire value.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
  Deserialize, Display, AsRefStr, EnumIter, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventType {
  // ── Football ────────────────────────────────────────────────────────────
  Goal,
  OwnGoal,
  YellowCard,
  RedCard,
  Corner,
  Offside,
  Penalty,
  FreeKick,
  Save,

  // ── Basketball ──────────────────────────────────────────────────────────
  FieldGoal,
  ThreePointer,
  FreeThrow,
  Rebound,
  Steal,
  Turnover,

  // ── Net and racket sports ───────────────────────────────────────────────
  Point,
  Ace,
  Kill,
  Dig,
  ServiceError,
  AttackError,
  ServiceFault,
  Net,
  EdgeBall,
  Let,
  ShuttleOut,

  // ── Shared ──────────────────────────────────────────────────────────────
  Assist,
  Block,
  Foul,
  Timeout,
  Substitution,

  // ── Track and field ─────────────────────────────────────────────────────
  LapTime,
  SplitTime,
  FinishTime,
  FalseStart,
  Disqualification,
  FieldMeasurement,
}

// ─── Scope ───────────────────────────────────────────────────────────────────

/// Whether an event counts toward official statistics.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
  Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EventScope {
  /// Counts toward official statistics.
  #[default]
  Internal,
  /// Exhibition or friendly.
  External,
}

// ─── Value ───────────────────────────────────────────────────────────────────

/// Free-form payload: a numeric measurement or a string such as `"1:02.45"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventValue {
  Number(f64),
  Text(String),
}

impl EventValue {
  /// A text value made only of whitespace counts as empty.
  pub fn is_empty(&self) -> bool {
    match self {
      Self::Number(_) => false,
      Self::Text(s) => s.trim().is_empty(),
    }
  }
}

impl fmt::Display for EventValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Number(n) => write!(f, "{n}"),
      Self::Text(s) => f.write_str(s),
    }
  }
}

// ─── EventLog ────────────────────────────────────────────────────────────────

/// A record of one officiating action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLog {
  /// Capture milliseconds followed by a random base-36 suffix.
  pub id:          String,
  pub match_id:    String,
  pub team_id:     String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub player_id:   Option<String>,
  pub event_type:  EventType,
  /// Capture time in milliseconds since the Unix epoch.
  pub timestamp:   i64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub value:       Option<EventValue>,
  #[serde(default)]
  pub event_scope: EventScope,
  #[serde(default)]
  pub semester:    String,
  /// Captured while the device was disconnected.
  #[serde(default)]
  pub offline:     bool,
}

impl EventLog {
  /// Build an id from the capture time and nine random base-36 digits.
  pub fn new_id(timestamp_ms: i64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let suffix: String = (0..9)
      .map(|_| DIGITS[(OsRng.next_u32() % 36) as usize] as char)
      .collect();
    format!("{timestamp_ms}{suffix}")
  }

  /// Whole wall-clock second the event was captured in.
  pub fn second(&self) -> i64 { self.timestamp.div_euclid(1000) }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> i64 { Utc::now().timestamp_millis() }
