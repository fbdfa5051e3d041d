//! `brix`: terminal monitor for the offline event queue.
//!
//! # Usage
//!
//! ```
//! brix --url http://localhost:8000 --queue offlineEventQueue
//! brix --config ~/.config/brix/config.toml --log brix.log
//! ```

mod app;
mod client;
mod ui;

use std::{
  fs::File,
  io,
  path::PathBuf,
  sync::Mutex,
  time::{Duration, Instant},
};

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use client::{ApiClient, ApiConfig};
use crossterm::{
  event::{self, Event, KeyEventKind},
  execute,
  terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

const DEFAULT_URL: &str = "http://localhost:8000";
const DEFAULT_QUEUE: &str = "offlineEventQueue";

/// How often the queue is re-read while idle.
const REFRESH_EVERY: Duration = Duration::from_secs(2);

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "brix", about = "Terminal monitor for the Brix offline event queue")]
struct Args {
  /// Path to a TOML config file (url, queue, export_dir).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the brix server (default: http://localhost:8000).
  #[arg(long, env = "BRIX_URL")]
  url: Option<String>,

  /// Queue key to open (default: offlineEventQueue).
  #[arg(long, env = "BRIX_QUEUE")]
  queue: Option<String>,

  /// Directory export files are written to (default: current directory).
  #[arg(long, value_name = "DIR")]
  export_dir: Option<PathBuf>,

  /// Write logs to this file; the terminal belongs to the UI.
  #[arg(long, value_name = "FILE")]
  log: Option<PathBuf>,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:        String,
  #[serde(default)]
  queue:      String,
  #[serde(default)]
  export_dir: Option<PathBuf>,
}

fn non_empty(s: &str) -> Option<String> { (!s.is_empty()).then(|| s.to_owned()) }

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  if let Some(path) = &args.log {
    let file = File::create(path)
      .with_context(|| format!("creating log file {}", path.display()))?;
    tracing_subscriber::fmt()
      .with_env_filter(EnvFilter::from_default_env())
      .with_ansi(false)
      .with_writer(Mutex::new(file))
      .init();
  }

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let api_config = ApiConfig {
    base_url: args
      .url
      .or_else(|| non_empty(&file_cfg.url))
      .unwrap_or_else(|| DEFAULT_URL.to_string()),
  };
  let queue_key = args
    .queue
    .or_else(|| non_empty(&file_cfg.queue))
    .unwrap_or_else(|| DEFAULT_QUEUE.to_string());
  let export_dir = args
    .export_dir
    .or(file_cfg.export_dir)
    .unwrap_or_else(|| PathBuf::from("."));

  tracing::info!(url = %api_config.base_url, queue = %queue_key, "starting");

  let client = ApiClient::new(api_config)?;
  let mut app = App::new(client, queue_key, export_dir);

  // Fail before touching the terminal if the server is unreachable.
  app.refresh().await?;

  enable_raw_mode().context("enabling raw mode")?;
  let mut stdout = io::stdout();
  execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;
  let backend = CrosstermBackend::new(stdout);
  let mut terminal = Terminal::new(backend).context("creating terminal")?;

  let run_result = run_event_loop(&mut terminal, &mut app).await;

  // Restore terminal regardless of result.
  disable_raw_mode().ok();
  execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
  terminal.show_cursor().ok();

  run_result
}

// ─── Event loop ───────────────────────────────────────────────────────────────

async fn run_event_loop(
  terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
  app: &mut App,
) -> Result<()> {
  let mut last_refresh = Instant::now();

  loop {
    terminal.draw(|f| ui::draw(f, app)).context("drawing frame")?;

    // Poll for an event, yielding control to tokio while waiting.
    let maybe_event = tokio::task::block_in_place(|| {
      if event::poll(Duration::from_millis(50))? {
        Ok::<_, io::Error>(Some(event::read()?))
      } else {
        Ok(None)
      }
    })?;

    match maybe_event {
      Some(Event::Key(key)) if key.kind == KeyEventKind::Press => {
        if !app.handle_key(key).await? {
          break;
        }
      }
      Some(_) => {}
      None if last_refresh.elapsed() >= REFRESH_EVERY && !app.filter_active => {
        // A failed poll leaves the message in the status bar; keep going.
        if let Err(e) = app.refresh().await {
          tracing::warn!(error = %e, "background refresh failed");
        }
        last_refresh = Instant::now();
      }
      None => {}
    }
  }

  Ok(())
}
