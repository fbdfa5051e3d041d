//! Chart panel: one dashboard series at a time as a bar chart.

use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph},
};

use crate::app::App;

pub fn draw(f: &mut Frame, area: Rect, app: &App) {
  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([Constraint::Length(1), Constraint::Min(0)])
    .split(area);

  // Tab strip.
  let mut tabs = Vec::new();
  for (i, series) in app.charts.iter().enumerate() {
    let style = if i == app.chart_index {
      Style::default()
        .fg(Color::Black)
        .bg(Color::Cyan)
        .add_modifier(Modifier::BOLD)
    } else {
      Style::default().fg(Color::Gray)
    };
    tabs.push(Span::styled(format!(" {} ", series.title), style));
    tabs.push(Span::raw(" "));
  }
  f.render_widget(Paragraph::new(Line::from(tabs)), rows[0]);

  let Some(series) = app.charts.get(app.chart_index) else {
    f.render_widget(
      Paragraph::new("No chart data.")
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL)),
      rows[1],
    );
    return;
  };

  let block = Block::default()
    .title(format!(" {} (total {}) ", series.title, series.total()))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));

  if series.points.is_empty() {
    f.render_widget(
      Paragraph::new("No events yet.")
        .style(Style::default().fg(Color::DarkGray))
        .block(block),
      rows[1],
    );
    return;
  }

  let bars: Vec<Bar> = series
    .points
    .iter()
    .map(|p| {
      Bar::default()
        .label(Line::from(p.label.clone()))
        .value(p.value.max(0.0).round() as u64)
    })
    .collect();

  // Fit every bar across the panel, at least three cells wide.
  let inner_width = rows[1].width.saturating_sub(2);
  let n = bars.len() as u16;
  let bar_width = (inner_width.saturating_sub(n) / n.max(1)).clamp(3, 12);

  f.render_widget(
    BarChart::default()
      .block(block)
      .data(BarGroup::default().bars(&bars))
      .bar_width(bar_width)
      .bar_gap(1)
      .bar_style(Style::default().fg(Color::Cyan))
      .value_style(
        Style::default()
          .fg(Color::Black)
          .bg(Color::Cyan)
          .add_modifier(Modifier::BOLD),
      ),
    rows[1],
  );
}
