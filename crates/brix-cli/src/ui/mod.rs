//! TUI rendering: header, body and status bar.

pub mod charts;
pub mod entry_detail;
pub mod queue_list;

use brix_core::queue::QueueStatus;
use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Paragraph},
};

use crate::app::{App, Screen};

// ─── Root draw ────────────────────────────────────────────────────────────────

/// Main draw function called each frame.
pub fn draw(f: &mut Frame, app: &App) {
  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // header
      Constraint::Min(0),    // body
      Constraint::Length(1), // status bar
    ])
    .split(f.area());

  draw_header(f, rows[0], app);
  match app.screen {
    Screen::Queue => draw_queue_body(f, rows[1], app),
    Screen::Charts => charts::draw(f, rows[1], app),
  }
  draw_status(f, rows[2], app);
}

/// Colour used for a status everywhere it appears.
pub fn status_color(status: QueueStatus) -> Color {
  match status {
    QueueStatus::Pending => Color::Yellow,
    QueueStatus::Syncing => Color::Cyan,
    QueueStatus::Failed => Color::Red,
  }
}

// ─── Header ───────────────────────────────────────────────────────────────────

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
  let left = Span::styled(
    format!(" brix  {}", app.queue_key),
    Style::default()
      .fg(Color::White)
      .add_modifier(Modifier::BOLD),
  );

  // Sync indicator: the most urgent status and how many entries share it.
  let summary = app.summary();
  let indicator = match summary.headline() {
    None => Span::styled(" ● synced ", Style::default().fg(Color::Green)),
    Some(status) => {
      let n = match status {
        QueueStatus::Pending => summary.pending,
        QueueStatus::Syncing => summary.syncing,
        QueueStatus::Failed => summary.failed,
      };
      Span::styled(
        format!(" ● {n} {status} "),
        Style::default()
          .fg(status_color(status))
          .add_modifier(Modifier::BOLD),
      )
    }
  };

  let refreshed = app
    .last_refresh
    .map(|t| t.format("%H:%M:%S").to_string())
    .unwrap_or_else(|| "--:--:--".into());
  let right = Span::styled(
    format!("{refreshed} "),
    Style::default().fg(Color::Gray),
  );

  let used = left.content.chars().count()
    + indicator.content.chars().count()
    + right.content.chars().count();
  let pad = (area.width as usize).saturating_sub(used);

  let line = Line::from(vec![left, Span::raw(" ".repeat(pad)), indicator, right]);

  let block = Block::default().style(Style::default().bg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);
  f.render_widget(Paragraph::new(line), inner);
}

// ─── Body ─────────────────────────────────────────────────────────────────────

fn draw_queue_body(f: &mut Frame, area: Rect, app: &App) {
  let cols = Layout::default()
    .direction(Direction::Horizontal)
    .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
    .split(area);

  queue_list::draw(f, cols[0], app);
  entry_detail::draw(f, cols[1], app);
}

// ─── Status bar ───────────────────────────────────────────────────────────────

fn draw_status(f: &mut Frame, area: Rect, app: &App) {
  let (mode_label, hints) = match app.screen {
    Screen::Queue if app.filter_active => (
      "SEARCH",
      "Type to filter  Esc cancel  Enter keep",
    ),
    Screen::Queue => (
      "QUEUE",
      "jk move  / search  r retry  R retry failed  x remove  e/E export  c charts  n next queue  q quit",
    ),
    Screen::Charts => (
      "CHARTS",
      "Tab/hl switch chart  g reload  Esc back  q quit",
    ),
  };

  let status = if app.status_msg.is_empty() {
    hints.to_string()
  } else {
    app.status_msg.clone()
  };

  let mode_span = Span::styled(
    format!(" {mode_label} "),
    Style::default()
      .fg(Color::Black)
      .bg(Color::Cyan)
      .add_modifier(Modifier::BOLD),
  );
  let hint_span = Span::styled(
    format!("  {status}"),
    Style::default().fg(Color::DarkGray),
  );

  f.render_widget(
    Paragraph::new(Line::from(vec![mode_span, hint_span]))
      .style(Style::default().bg(Color::Black)),
    area,
  );
}
