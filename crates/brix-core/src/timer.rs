//! Football match clock with operator-declared stoppage time.
//!
//! The clock never blocks. Reaching a regulation boundary pauses it and parks
//! a [`Prompt`]; nothing moves until the operator answers with
//! [`MatchTimer::confirm`] or [`MatchTimer::cancel`].
//!
//! Elapsed time is always derived as `now - started_at + accumulated`, so the
//! polling cadence has no effect on what the clock shows. Every method takes
//! the current wall-clock time in milliseconds.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::{Error, Result};

pub const DEFAULT_HALF_MINUTES: u32 = 45;
pub const DEFAULT_EXTRA_TIME_MINUTES: u32 = 15;

// ─── Phase ───────────────────────────────────────────────────────────────────

/// Match phases in the only order they may occur.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
  Deserialize, Display,
)]
pub enum Phase {
  #[serde(rename = "first-half")]
  #[strum(serialize = "first-half")]
  FirstHalf,
  #[serde(rename = "second-half")]
  #[strum(serialize = "second-half")]
  SecondHalf,
  #[serde(rename = "extra-time-1")]
  #[strum(serialize = "extra-time-1")]
  ExtraTime1,
  #[serde(rename = "extra-time-2")]
  #[strum(serialize = "extra-time-2")]
  ExtraTime2,
  #[serde(rename = "penalties")]
  #[strum(serialize = "penalties")]
  Penalties,
  #[serde(rename = "finished")]
  #[strum(serialize = "finished")]
  Finished,
}

impl Phase {
  pub fn is_terminal(self) -> bool { matches!(self, Self::Penalties | Self::Finished) }
}

// ─── Match type ──────────────────────────────────────────────────────────────

/// Competition stage, as named by the fixtures list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MatchType {
  Knockout,
  QuarterFinals,
  SemiFinals,
  Finals,
  /// Any non-knockout stage, e.g. "League" or "Group Stage".
  Other(String),
}

impl MatchType {
  /// Knockout-class matches cannot end in a draw; extra time is offered.
  pub fn is_knockout(&self) -> bool { !matches!(self, Self::Other(_)) }
}

impl From<String> for MatchType {
  fn from(s: String) -> Self {
    match s.trim() {
      "Knockout" => Self::Knockout,
      "Quarter Finals" => Self::QuarterFinals,
      "Semi Finals" => Self::SemiFinals,
      "Finals" => Self::Finals,
      _ => Self::Other(s),
    }
  }
}

impl From<&str> for MatchType {
  fn from(s: &str) -> Self { Self::from(s.to_owned()) }
}

impl From<MatchType> for String {
  fn from(t: MatchType) -> Self { t.to_string() }
}

impl fmt::Display for MatchType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Knockout => f.write_str("Knockout"),
      Self::QuarterFinals => f.write_str("Quarter Finals"),
      Self::SemiFinals => f.write_str("Semi Finals"),
      Self::Finals => f.write_str("Finals"),
      Self::Other(s) => f.write_str(s),
    }
  }
}

// ─── Prompt ──────────────────────────────────────────────────────────────────

/// A question parked for the operator. The clock is paused while one is
/// pending.
///
/// | Prompt | `confirm` | `cancel` |
/// |--------|-----------|----------|
/// | `AddStoppage` | add the entered minutes and resume | end the period |
/// | `StoppageExceeded` | end the period | keep playing |
/// | `ExtraTime` | start extra time | finish the match |
/// | `Penalties` | go to penalties | finish the match |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Prompt {
  AddStoppage,
  StoppageExceeded,
  ExtraTime,
  Penalties,
}

impl Prompt {
  pub fn message(self) -> &'static str {
    match self {
      Self::AddStoppage => {
        "Regulation time reached. Enter stoppage minutes, or decline to end the period."
      }
      Self::StoppageExceeded => "Stoppage time exceeded. End the period?",
      Self::ExtraTime => "Full time. Play extra time?",
      Self::Penalties => "Extra time over. Go to penalties?",
    }
  }
}

// ─── Timer ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerConfig {
  pub half_duration_minutes:       u32,
  pub extra_time_duration_minutes: u32,
}

impl Default for TimerConfig {
  fn default() -> Self {
    Self {
      half_duration_minutes:       DEFAULT_HALF_MINUTES,
      extra_time_duration_minutes: DEFAULT_EXTRA_TIME_MINUTES,
    }
  }
}

#[derive(Debug, Clone)]
pub struct MatchTimer {
  match_type:          MatchType,
  config:              TimerConfig,
  phase:               Phase,
  /// Wall-clock ms of the last start; `None` while paused.
  started_at:          Option<i64>,
  /// Elapsed ms banked before the last start.
  accumulated_ms:      i64,
  stoppage_secs:       u32,
  pending:             Option<Prompt>,
  regulation_prompted: bool,
  stoppage_prompted:   bool,
}

impl MatchTimer {
  pub fn new(match_type: MatchType, config: TimerConfig) -> Self {
    Self {
      match_type,
      config,
      phase: Phase::FirstHalf,
      started_at: None,
      accumulated_ms: 0,
      stoppage_secs: 0,
      pending: None,
      regulation_prompted: false,
      stoppage_prompted: false,
    }
  }

  pub fn phase(&self) -> Phase { self.phase }

  pub fn pending(&self) -> Option<Prompt> { self.pending }

  pub fn stoppage_secs(&self) -> u32 { self.stoppage_secs }

  pub fn is_running(&self) -> bool { self.started_at.is_some() }

  pub fn match_type(&self) -> &MatchType { &self.match_type }

  /// Regulation length of the current phase; zero for terminal phases.
  pub fn regulation_ms(&self) -> i64 {
    let minutes = match self.phase {
      Phase::FirstHalf | Phase::SecondHalf => self.config.half_duration_minutes,
      Phase::ExtraTime1 | Phase::ExtraTime2 => {
        self.config.extra_time_duration_minutes
      }
      Phase::Penalties | Phase::Finished => 0,
    };
    i64::from(minutes) * 60_000
  }

  /// Time shown on the clock for the current phase.
  pub fn elapsed_ms(&self, now_ms: i64) -> i64 {
    let running = self
      .started_at
      .map(|start| (now_ms - start).max(0))
      .unwrap_or(0);
    self.accumulated_ms + running
  }

  // ── Operator controls ─────────────────────────────────────────────────

  pub fn start(&mut self, now_ms: i64) -> Result<()> {
    if self.phase.is_terminal() {
      return Err(Error::Terminal(self.phase));
    }
    if self.pending.is_some() {
      return Err(Error::PromptPending);
    }
    if self.is_running() {
      return Err(Error::AlreadyRunning);
    }
    self.started_at = Some(now_ms);
    Ok(())
  }

  /// Freeze the clock. Pausing a paused clock does nothing.
  pub fn pause(&mut self, now_ms: i64) {
    if self.is_running() {
      self.accumulated_ms = self.elapsed_ms(now_ms);
      self.started_at = None;
    }
  }

  /// End the current period on the operator's explicit request.
  pub fn end_period(&mut self, now_ms: i64) -> Result<()> {
    if self.phase.is_terminal() {
      return Err(Error::Terminal(self.phase));
    }
    if self.pending.is_some() {
      return Err(Error::PromptPending);
    }
    self.close_period(now_ms)
  }

  /// Recompute the clock and raise a prompt if a boundary was crossed.
  /// Returns the prompt awaiting an answer, if any.
  pub fn poll(&mut self, now_ms: i64) -> Option<Prompt> {
    if !self.is_running() {
      return self.pending;
    }

    let elapsed = self.elapsed_ms(now_ms);
    let regulation = self.regulation_ms();

    let stoppage_end = regulation + i64::from(self.stoppage_secs) * 1000;

    if !self.regulation_prompted && elapsed >= regulation {
      self.stop_at(regulation);
      self.regulation_prompted = true;
      self.pending = Some(Prompt::AddStoppage);
    } else if self.regulation_prompted
      && !self.stoppage_prompted
      && self.stoppage_secs > 0
      && elapsed >= stoppage_end
    {
      self.stop_at(stoppage_end);
      self.stoppage_prompted = true;
      self.pending = Some(Prompt::StoppageExceeded);
    }

    self.pending
  }

  /// Freeze the clock exactly on a boundary, however late it was noticed.
  fn stop_at(&mut self, boundary_ms: i64) {
    self.accumulated_ms = boundary_ms;
    self.started_at = None;
  }

  // ── Prompt answers ────────────────────────────────────────────────────

  /// Accept the pending prompt. `input` is the operator's text for
  /// [`Prompt::AddStoppage`] and is ignored otherwise.
  ///
  /// Invalid stoppage input leaves the prompt pending and the stoppage time
  /// unchanged.
  pub fn confirm(&mut self, input: Option<&str>, now_ms: i64) -> Result<()> {
    let prompt = self.pending.ok_or(Error::NoPendingPrompt)?;
    match prompt {
      Prompt::AddStoppage => {
        let minutes = parse_stoppage_minutes(input)?;
        self.stoppage_secs = self
          .stoppage_secs
          .checked_add(minutes * 60)
          .ok_or_else(|| Error::InvalidStoppage(minutes.to_string()))?;
        self.pending = None;
        self.started_at = Some(now_ms);
        Ok(())
      }
      Prompt::StoppageExceeded => {
        self.pending = None;
        self.close_period(now_ms)
      }
      Prompt::ExtraTime => {
        self.pending = None;
        self.advance(Phase::ExtraTime1)
      }
      Prompt::Penalties => {
        self.pending = None;
        self.advance(Phase::Penalties)
      }
    }
  }

  /// Decline the pending prompt.
  pub fn cancel(&mut self, now_ms: i64) -> Result<()> {
    let prompt = self.pending.take().ok_or(Error::NoPendingPrompt)?;
    match prompt {
      Prompt::AddStoppage => self.close_period(now_ms),
      Prompt::StoppageExceeded => {
        self.started_at = Some(now_ms);
        Ok(())
      }
      Prompt::ExtraTime | Prompt::Penalties => self.advance(Phase::Finished),
    }
  }

  // ── Transitions ───────────────────────────────────────────────────────

  fn close_period(&mut self, now_ms: i64) -> Result<()> {
    self.pause(now_ms);
    match self.phase {
      Phase::FirstHalf => self.advance(Phase::SecondHalf),
      Phase::SecondHalf if self.match_type.is_knockout() => {
        self.pending = Some(Prompt::ExtraTime);
        Ok(())
      }
      Phase::SecondHalf => self.advance(Phase::Finished),
      Phase::ExtraTime1 => self.advance(Phase::ExtraTime2),
      Phase::ExtraTime2 => {
        self.pending = Some(Prompt::Penalties);
        Ok(())
      }
      Phase::Penalties | Phase::Finished => Err(Error::Terminal(self.phase)),
    }
  }

  /// Move to `next` with a fresh, paused clock.
  fn advance(&mut self, next: Phase) -> Result<()> {
    if next <= self.phase {
      return Err(Error::BackwardTransition { from: self.phase, to: next });
    }
    self.phase = next;
    self.started_at = None;
    self.accumulated_ms = 0;
    self.stoppage_secs = 0;
    self.regulation_prompted = false;
    self.stoppage_prompted = false;
    Ok(())
  }

  // ── Read model ────────────────────────────────────────────────────────

  pub fn snapshot(&self, now_ms: i64) -> TimerSnapshot {
    let display_time_ms = self.elapsed_ms(now_ms);
    TimerSnapshot {
      match_type: self.match_type.clone(),
      phase: self.phase,
      running: self.is_running(),
      display_time_ms,
      display_time: format_clock(display_time_ms),
      regulation_secs: self.regulation_ms() / 1000,
      stoppage_time_secs: self.stoppage_secs,
      pending_prompt: self.pending,
      prompt_message: self.pending.map(|p| p.message().to_owned()),
    }
  }
}

/// Serialisable view of a [`MatchTimer`] at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
  pub match_type:         MatchType,
  pub phase:              Phase,
  pub running:            bool,
  pub display_time_ms:    i64,
  /// `MM:SS`.
  pub display_time:       String,
  pub regulation_secs:    i64,
  pub stoppage_time_secs: u32,
  pub pending_prompt:     Option<Prompt>,
  pub prompt_message:     Option<String>,
}

/// Longest stoppage an official may add in one answer.
pub const MAX_STOPPAGE_MINUTES: u32 = 90;

/// Stoppage input must be a whole number of minutes in
/// `1..=MAX_STOPPAGE_MINUTES`.
fn parse_stoppage_minutes(input: Option<&str>) -> Result<u32> {
  let raw = input.unwrap_or_default();
  raw
    .trim()
    .parse::<u32>()
    .ok()
    .filter(|m| (1..=MAX_STOPPAGE_MINUTES).contains(m))
    .ok_or_else(|| Error::InvalidStoppage(raw.to_owned()))
}

/// Format milliseconds as `MM:SS`; minutes run past 59 (e.g. `93:12`).
pub fn format_clock(ms: i64) -> String {
  let secs = ms.max(0) / 1000;
  format!("{:02}:{:02}", secs / 60, secs % 60)
}
