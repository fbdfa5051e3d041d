//! Chart series shaping for the dashboard.
//!
//! Charts only draw what they are given; all aggregation happens here so the
//! renderers stay dumb.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::event::{EventLog, EventScope};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
  pub label: String,
  pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
  pub title:  String,
  pub points: Vec<ChartPoint>,
}

impl ChartSeries {
  fn from_counts(title: &str, counts: BTreeMap<String, u32>) -> Self {
    let mut points: Vec<ChartPoint> = counts
      .into_iter()
      .map(|(label, n)| ChartPoint { label, value: f64::from(n) })
      .collect();
    // Largest bar first; ties keep label order.
    points.sort_by(|a, b| b.value.total_cmp(&a.value));
    Self { title: title.to_owned(), points }
  }

  pub fn total(&self) -> f64 { self.points.iter().map(|p| p.value).sum() }
}

fn count_by<'a>(
  events: &'a [EventLog],
  key: impl Fn(&'a EventLog) -> String,
) -> BTreeMap<String, u32> {
  let mut counts = BTreeMap::new();
  for e in events {
    *counts.entry(key(e)).or_insert(0) += 1;
  }
  counts
}

pub fn events_by_type(events: &[EventLog]) -> ChartSeries {
  ChartSeries::from_counts(
    "Events by type",
    count_by(events, |e| e.event_type.to_string()),
  )
}

pub fn events_by_team(events: &[EventLog]) -> ChartSeries {
  ChartSeries::from_counts("Events by team", count_by(events, |e| e.team_id.clone()))
}

pub fn events_by_scope(events: &[EventLog]) -> ChartSeries {
  let mut counts = count_by(events, |e| e.event_scope.to_string());
  for scope in [EventScope::Internal, EventScope::External] {
    counts.entry(scope.to_string()).or_insert(0);
  }
  ChartSeries::from_counts("Events by scope", counts)
}

/// Past this many windows the timeline lists only non-empty windows.
pub const MAX_TIMELINE_BUCKETS: i64 = 1_000;

/// Events per `bucket_minutes`-wide window, counted from the earliest event.
/// Empty windows are included so the x-axis is continuous, unless the span
/// would exceed [`MAX_TIMELINE_BUCKETS`] windows.
pub fn timeline(events: &[EventLog], bucket_minutes: u32) -> ChartSeries {
  let title = "Events over time";
  let Some(first) = events.iter().map(|e| e.timestamp).min() else {
    return ChartSeries { title: title.to_owned(), points: Vec::new() };
  };
  let minutes = i64::from(bucket_minutes.max(1));
  let width_ms = minutes * 60_000;

  let mut buckets: BTreeMap<i64, u32> = BTreeMap::new();
  for e in events {
    let offset = e.timestamp.saturating_sub(first);
    *buckets.entry(offset / width_ms).or_insert(0) += 1;
  }

  let point = |bucket: i64, count: u32| ChartPoint {
    label: format!("{}'", bucket.saturating_mul(minutes)),
    value: f64::from(count),
  };
  let last = buckets.keys().next_back().copied().unwrap_or(0);
  let points = if last < MAX_TIMELINE_BUCKETS {
    (0..=last)
      .map(|b| point(b, buckets.get(&b).copied().unwrap_or(0)))
      .collect()
  } else {
    buckets.into_iter().map(|(b, n)| point(b, n)).collect()
  };

  ChartSeries { title: title.to_owned(), points }
}

/// The standard dashboard set.
pub fn dashboard(events: &[EventLog]) -> Vec<ChartSeries> {
  vec![
    events_by_type(events),
    events_by_team(events),
    events_by_scope(events),
    timeline(events, 5),
  ]
}
