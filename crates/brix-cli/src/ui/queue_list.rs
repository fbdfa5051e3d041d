//! Queue list pane: left panel.

use ratatui::{
  Frame,
  layout::Rect,
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};

use super::status_color;
use crate::app::App;

/// Render the queue entries into `area`.
pub fn draw(f: &mut Frame, area: Rect, app: &App) {
  let filtered = app.filtered_entries();
  let total = app.entries.len();

  let title = if app.filter_active || !app.filter.is_empty() {
    format!(" Queue ({}/{}) ", filtered.len(), total)
  } else {
    format!(" Queue ({total}) ")
  };

  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));

  let items: Vec<ListItem> = filtered
    .iter()
    .map(|q| {
      let badge = Span::styled(
        format!("{:<8}", q.status.as_ref()),
        Style::default().fg(status_color(q.status)),
      );
      let time = chrono::DateTime::from_timestamp_millis(q.event.timestamp)
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_default();
      ListItem::new(Line::from(vec![
        badge,
        Span::styled(format!("{time} "), Style::default().fg(Color::DarkGray)),
        Span::raw(format!("{:<14} ", q.event.event_type.as_ref())),
        Span::styled(q.event.team_id.clone(), Style::default().fg(Color::Gray)),
      ]))
    })
    .collect();

  let mut inner_area = block.inner(area);
  f.render_widget(block, area);

  if (app.filter_active || !app.filter.is_empty()) && inner_area.height > 2 {
    let filter_area = Rect {
      x:      inner_area.x,
      y:      inner_area.y + inner_area.height - 1,
      width:  inner_area.width,
      height: 1,
    };
    inner_area.height = inner_area.height.saturating_sub(1);

    let filter_text = if app.filter_active {
      format!("/{}_", app.filter)
    } else {
      format!("/{}", app.filter)
    };
    f.render_widget(
      Paragraph::new(filter_text).style(Style::default().fg(Color::Yellow)),
      filter_area,
    );
  }

  if filtered.is_empty() {
    let hint = if total == 0 { "Queue is empty." } else { "No matches." };
    f.render_widget(
      Paragraph::new(hint).style(Style::default().fg(Color::DarkGray)),
      inner_area,
    );
    return;
  }

  let mut state = ListState::default();
  state.select(Some(app.list_cursor));

  f.render_stateful_widget(
    List::new(items).highlight_style(
      Style::default()
        .bg(Color::Blue)
        .fg(Color::White)
        .add_modifier(Modifier::BOLD),
    ),
    inner_area,
    &mut state,
  );
}
