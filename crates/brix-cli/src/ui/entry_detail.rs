//! Entry detail pane: right panel.

use brix_core::queue::QueuedEvent;
use ratatui::{
  Frame,
  layout::Rect,
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Paragraph, Wrap},
};

use super::status_color;
use crate::app::App;

/// Render the entry under the cursor into `area`.
pub fn draw(f: &mut Frame, area: Rect, app: &App) {
  let entry = app.cursor_entry();

  let title = entry
    .map(|q| format!(" {} ", q.event.id))
    .unwrap_or_else(|| " Detail ".into());
  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));

  let inner = block.inner(area);
  f.render_widget(block, area);

  let Some(q) = entry else {
    f.render_widget(
      Paragraph::new("Nothing selected.").style(Style::default().fg(Color::DarkGray)),
      inner,
    );
    return;
  };

  f.render_widget(
    Paragraph::new(detail_lines(q)).wrap(Wrap { trim: false }),
    inner,
  );
}

fn field<'a>(label: &'a str, value: String) -> Line<'a> {
  Line::from(vec![
    Span::styled(
      format!("{label:<12}"),
      Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD),
    ),
    Span::raw(value),
  ])
}

fn detail_lines(q: &QueuedEvent) -> Vec<Line<'static>> {
  let e = &q.event;
  let captured = chrono::DateTime::from_timestamp_millis(e.timestamp)
    .map(|t| t.to_rfc3339())
    .unwrap_or_else(|| e.timestamp.to_string());

  let mut lines = vec![
    Line::from(vec![
      Span::styled("Status      ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
      Span::styled(
        q.status.to_string(),
        Style::default()
          .fg(status_color(q.status))
          .add_modifier(Modifier::BOLD),
      ),
    ]),
    field("Attempts", q.attempts.to_string()),
    field("Queued", q.queued_at.to_rfc3339()),
    field(
      "Last try",
      q.last_attempt_at.map(|t| t.to_rfc3339()).unwrap_or_else(|| "never".into()),
    ),
    Line::from(""),
    field("Type", e.event_type.to_string()),
    field("Match", e.match_id.clone()),
    field("Team", e.team_id.clone()),
    field("Player", e.player_id.clone().unwrap_or_else(|| "—".into())),
    field("Value", e.value.as_ref().map(ToString::to_string).unwrap_or_else(|| "—".into())),
    field("Scope", e.event_scope.to_string()),
    field("Semester", e.semester.clone()),
    field("Captured", captured),
    field("Offline", if e.offline { "yes" } else { "no" }.into()),
  ];

  if let Some(err) = &q.last_error {
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
      "Last error",
      Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(Span::styled(err.clone(), Style::default().fg(Color::Red))));
  }

  lines
}
