//! Application state machine and event dispatcher.

use std::{path::PathBuf, sync::Arc};

use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use fuzzy_matcher::{FuzzyMatcher, skim::SkimMatcherV2};
use brix_core::{
  analytics::ChartSeries,
  export::ExportFormat,
  queue::{QueueStatus, QueuedEvent},
  sync::RetryOutcome,
};

use crate::client::ApiClient;

// ─── Screen ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
  /// Queue list on the left, selected entry on the right.
  Queue,
  /// Full-width chart panel.
  Charts,
}

// ─── Sync summary ─────────────────────────────────────────────────────────────

/// Entry counts behind the sync status indicator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
  pub pending: usize,
  pub syncing: usize,
  pub failed:  usize,
}

impl SyncSummary {
  pub fn of(entries: &[QueuedEvent]) -> Self {
    let mut s = Self::default();
    for q in entries {
      match q.status {
        QueueStatus::Pending => s.pending += 1,
        QueueStatus::Syncing => s.syncing += 1,
        QueueStatus::Failed => s.failed += 1,
      }
    }
    s
  }

  /// The most urgent status present, or `None` when the queue is drained.
  pub fn headline(&self) -> Option<QueueStatus> {
    if self.failed > 0 {
      Some(QueueStatus::Failed)
    } else if self.syncing > 0 {
      Some(QueueStatus::Syncing)
    } else if self.pending > 0 {
      Some(QueueStatus::Pending)
    } else {
      None
    }
  }
}

// ─── App ──────────────────────────────────────────────────────────────────────

/// Top-level application state.
pub struct App {
  pub screen: Screen,

  /// Queue currently shown.
  pub queue_key: String,

  /// Every queue key the server knows about.
  pub keys: Vec<String>,

  /// Entries of `queue_key` in replay order, as of `last_refresh`.
  pub entries: Vec<QueuedEvent>,

  /// Current fuzzy-filter string (only active when `filter_active`).
  pub filter: String,

  /// Whether the user is typing a filter query.
  pub filter_active: bool,

  /// Cursor position within the *filtered* entry list.
  pub list_cursor: usize,

  /// Dashboard series for `queue_key`; loaded on entering the chart screen.
  pub charts: Vec<ChartSeries>,

  pub chart_index: usize,

  /// One-line status message shown in the status bar.
  pub status_msg: String,

  /// Directory export files are written to.
  pub export_dir: PathBuf,

  pub last_refresh: Option<DateTime<Local>>,

  /// Shared HTTP client.
  pub client: Arc<ApiClient>,
}

impl App {
  pub fn new(client: ApiClient, queue_key: String, export_dir: PathBuf) -> Self {
    Self {
      screen: Screen::Queue,
      queue_key,
      keys: Vec::new(),
      entries: Vec::new(),
      filter: String::new(),
      filter_active: false,
      list_cursor: 0,
      charts: Vec::new(),
      chart_index: 0,
      status_msg: String::new(),
      export_dir,
      last_refresh: None,
      client: Arc::new(client),
    }
  }

  // ── Data loading ──────────────────────────────────────────────────────────

  /// Reload keys and the current queue. Keeps the cursor in range.
  pub async fn refresh(&mut self) -> anyhow::Result<()> {
    let entries = self.client.list_queue(&self.queue_key).await;
    match entries {
      Ok(entries) => {
        self.entries = entries;
        self.last_refresh = Some(Local::now());
        let len = self.filtered_entries().len();
        self.list_cursor = self.list_cursor.min(len.saturating_sub(1));
      }
      Err(e) => {
        self.status_msg = format!("Error: {e}");
        return Err(e);
      }
    }
    if let Ok(mut keys) = self.client.list_keys().await {
      if !keys.contains(&self.queue_key) {
        keys.push(self.queue_key.clone());
        keys.sort();
      }
      self.keys = keys;
    }
    Ok(())
  }

  /// Refresh after an action; a failure is already in the status bar.
  async fn reload(&mut self) {
    if let Err(e) = self.refresh().await {
      tracing::warn!(error = %e, "refresh failed");
    }
  }

  async fn load_charts(&mut self) {
    match self.client.analytics(&self.queue_key).await {
      Ok(series) => {
        self.charts = series;
        self.chart_index = self.chart_index.min(self.charts.len().saturating_sub(1));
      }
      Err(e) => self.status_msg = format!("Error: {e}"),
    }
  }

  pub fn summary(&self) -> SyncSummary { SyncSummary::of(&self.entries) }

  // ── Filtered list ─────────────────────────────────────────────────────────

  /// Entries whose id, type, team, player or status match the filter.
  pub fn filtered_entries(&self) -> Vec<&QueuedEvent> {
    if self.filter.is_empty() {
      return self.entries.iter().collect();
    }
    let matcher = SkimMatcherV2::default();
    self
      .entries
      .iter()
      .filter(|q| {
        let e = &q.event;
        let haystack = format!(
          "{} {} {} {} {}",
          e.event_type,
          e.team_id,
          e.player_id.as_deref().unwrap_or_default(),
          q.status,
          e.id
        );
        matcher.fuzzy_match(&haystack, &self.filter).is_some()
      })
      .collect()
  }

  /// The entry under the list cursor in the filtered view, if any.
  pub fn cursor_entry(&self) -> Option<&QueuedEvent> {
    self.filtered_entries().get(self.list_cursor).copied()
  }

  // ── Key handling ──────────────────────────────────────────────────────────

  /// Process a key event. Returns `true` to continue, `false` to quit.
  pub async fn handle_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    // Global: Ctrl-C quits from anywhere.
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
      return Ok(false);
    }

    if self.filter_active {
      self.handle_filter_key(key);
      return Ok(true);
    }

    match self.screen {
      Screen::Queue => self.handle_queue_key(key).await,
      Screen::Charts => self.handle_chart_key(key).await,
    }
  }

  fn handle_filter_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Esc => {
        self.filter_active = false;
        self.filter.clear();
      }
      KeyCode::Enter => self.filter_active = false,
      KeyCode::Backspace => {
        self.filter.pop();
      }
      KeyCode::Char(c) => self.filter.push(c),
      _ => return,
    }
    self.list_cursor = 0;
  }

  async fn handle_queue_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    match key.code {
      KeyCode::Char('q') => return Ok(false),

      // Navigation
      KeyCode::Down | KeyCode::Char('j') => {
        let len = self.filtered_entries().len();
        if len > 0 && self.list_cursor + 1 < len {
          self.list_cursor += 1;
        }
      }
      KeyCode::Up | KeyCode::Char('k') => {
        self.list_cursor = self.list_cursor.saturating_sub(1);
      }

      // Filter
      KeyCode::Char('/') => {
        self.filter_active = true;
        self.filter.clear();
        self.list_cursor = 0;
      }

      // Actions
      KeyCode::Char('r') => self.retry_cursor().await,
      KeyCode::Char('R') => self.retry_all_failed().await,
      KeyCode::Char('x') | KeyCode::Delete => self.remove_cursor().await,
      KeyCode::Char('e') => self.export(ExportFormat::Csv).await,
      KeyCode::Char('E') => self.export(ExportFormat::Json).await,
      KeyCode::Char('g') => {
        if self.refresh().await.is_ok() {
          self.status_msg = "Refreshed.".into();
        }
      }
      KeyCode::Char('n') => self.next_queue().await,

      // Charts
      KeyCode::Char('c') => {
        self.load_charts().await;
        self.screen = Screen::Charts;
      }

      _ => {}
    }
    Ok(true)
  }

  async fn handle_chart_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    match key.code {
      KeyCode::Char('q') => return Ok(false),
      KeyCode::Esc | KeyCode::Char('c') => self.screen = Screen::Queue,
      KeyCode::Tab | KeyCode::Right | KeyCode::Char('l') => {
        if !self.charts.is_empty() {
          self.chart_index = (self.chart_index + 1) % self.charts.len();
        }
      }
      KeyCode::BackTab | KeyCode::Left | KeyCode::Char('h') => {
        if !self.charts.is_empty() {
          self.chart_index = (self.chart_index + self.charts.len() - 1) % self.charts.len();
        }
      }
      KeyCode::Char('g') => self.load_charts().await,
      _ => {}
    }
    Ok(true)
  }

  // ── Actions ───────────────────────────────────────────────────────────────

  async fn retry_cursor(&mut self) {
    let Some(id) = self.cursor_entry().map(|q| q.event.id.clone()) else {
      return;
    };
    self.status_msg = match self.client.retry(&self.queue_key, &id).await {
      Ok(RetryOutcome::Delivered) => format!("Delivered {id}."),
      Ok(RetryOutcome::Failed { error }) => format!("Retry failed: {error}"),
      Ok(RetryOutcome::NotQueued) => format!("{id} is no longer queued."),
      Err(e) => format!("Error: {e}"),
    };
    self.reload().await;
  }

  async fn retry_all_failed(&mut self) {
    let failed: Vec<String> = self
      .entries
      .iter()
      .filter(|q| q.status == QueueStatus::Failed)
      .map(|q| q.event.id.clone())
      .collect();

    let mut delivered = 0;
    for id in &failed {
      if let Ok(RetryOutcome::Delivered) = self.client.retry(&self.queue_key, id).await {
        delivered += 1;
      }
    }
    self.status_msg = format!("Retried {}: {delivered} delivered.", failed.len());
    self.reload().await;
  }

  async fn remove_cursor(&mut self) {
    let Some(id) = self.cursor_entry().map(|q| q.event.id.clone()) else {
      return;
    };
    self.status_msg = match self.client.remove(&self.queue_key, &id).await {
      Ok(true) => format!("Removed {id}."),
      Ok(false) => format!("{id} was already gone."),
      Err(e) => format!("Error: {e}"),
    };
    self.reload().await;
  }

  async fn export(&mut self, format: ExportFormat) {
    let path = self.export_path(format);
    let result = async {
      let body = self.client.export(&self.queue_key, format).await?;
      tokio::fs::write(&path, body).await?;
      anyhow::Ok(())
    }
    .await;
    self.status_msg = match result {
      Ok(()) => format!("Exported to {}", path.display()),
      Err(e) => format!("Export failed: {e}"),
    };
  }

  /// `<export_dir>/<key>-<timestamp>.<ext>`
  pub fn export_path(&self, format: ExportFormat) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    self
      .export_dir
      .join(format!("{}-{stamp}.{}", self.queue_key, format.extension()))
  }

  async fn next_queue(&mut self) {
    if self.keys.len() < 2 {
      return;
    }
    let idx = self.keys.iter().position(|k| *k == self.queue_key).unwrap_or(0);
    self.queue_key = self.keys[(idx + 1) % self.keys.len()].clone();
    self.list_cursor = 0;
    self.filter.clear();
    self.status_msg = format!("Queue: {}", self.queue_key);
    self.reload().await;
  }
}
