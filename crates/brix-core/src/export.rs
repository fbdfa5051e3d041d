//! Queue export as a downloadable JSON or CSV document.
//!
//! Export is a convenience for officials; it is not a backup mechanism and
//! nothing reads these files back.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{Error, Result, queue::QueuedEvent};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display,
  AsRefStr, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ExportFormat {
  #[default]
  Json,
  Csv,
}

impl ExportFormat {
  pub fn content_type(self) -> &'static str {
    match self {
      Self::Json => "application/json",
      Self::Csv => "text/csv; charset=utf-8",
    }
  }

  pub fn extension(self) -> &'static str {
    match self {
      Self::Json => "json",
      Self::Csv => "csv",
    }
  }
}

const CSV_HEADER: [&str; 14] = [
  "id",
  "matchId",
  "teamId",
  "playerId",
  "eventType",
  "timestamp",
  "value",
  "eventScope",
  "semester",
  "offline",
  "status",
  "attempts",
  "lastError",
  "queuedAt",
];

/// Render `entries` in `format`.
pub fn export(entries: &[QueuedEvent], format: ExportFormat) -> Result<String> {
  match format {
    ExportFormat::Json => Ok(serde_json::to_string_pretty(entries)?),
    ExportFormat::Csv => to_csv(entries),
  }
}

fn to_csv(entries: &[QueuedEvent]) -> Result<String> {
  let mut writer = csv::Writer::from_writer(Vec::new());
  writer.write_record(CSV_HEADER)?;

  for q in entries {
    let e = &q.event;
    let value = e.value.as_ref().map(ToString::to_string).unwrap_or_default();
    let row: [&str; 14] = [
      &e.id,
      &e.match_id,
      &e.team_id,
      e.player_id.as_deref().unwrap_or_default(),
      e.event_type.as_ref(),
      &e.timestamp.to_string(),
      &value,
      e.event_scope.as_ref(),
      &e.semester,
      &e.offline.to_string(),
      q.status.as_ref(),
      &q.attempts.to_string(),
      q.last_error.as_deref().unwrap_or_default(),
      &q.queued_at.to_rfc3339(),
    ];
    writer.write_record(row)?;
  }

  let bytes = writer
    .into_inner()
    .map_err(|e| Error::Export(e.error().to_string()))?;
  String::from_utf8(bytes).map_err(|e| Error::Export(e.to_string()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    event::{EventLog, EventScope, EventType, EventValue},
    queue::QueueStatus,
  };

  fn entries() -> Vec<QueuedEvent> {
    let lap = EventLog {
      id:          "1700000000000abc".into(),
      match_id:    "M7".into(),
      team_id:     "T2".into(),
      player_id:   None,
      event_type:  EventType::LapTime,
      timestamp:   1_700_000_000_000,
      value:       Some(EventValue::Text("1:02.45".into())),
      event_scope: EventScope::Internal,
      semester:    "2024-1".into(),
      offline:     true,
    };
    let mut foul = QueuedEvent::new(EventLog {
      id: "1700000001000def".into(),
      event_type: EventType::Foul,
      player_id: Some("P4".into()),
      value: None,
      ..lap.clone()
    });
    foul.status = QueueStatus::Failed;
    foul.attempts = 2;
    foul.last_error = Some("timeout, retrying".into());
    vec![QueuedEvent::new(lap), foul]
  }

  #[test]
  fn csv_has_header_and_one_row_per_entry() {
    let csv = export(&entries(), ExportFormat::Csv).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("id,matchId,teamId,playerId,eventType"));
    assert!(lines[1].contains("lap_time"));
    assert!(lines[1].contains("1:02.45"));
    // Fields containing commas are quoted.
    assert!(lines[2].contains("\"timeout, retrying\""));
    assert!(lines[2].contains(",failed,2,"));
  }

  #[test]
  fn json_export_is_an_array_of_entries() {
    let json = export(&entries(), ExportFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let arr = value.as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[1]["event"]["eventType"], "foul");
    assert_eq!(arr[1]["status"], "failed");
  }

  #[test]
  fn empty_queue_exports_header_only() {
    let csv = export(&[], ExportFormat::Csv).unwrap();
    assert_eq!(csv.lines().count(), 1);
    assert_eq!(export(&[], ExportFormat::Json).unwrap(), "[]");
  }
}
