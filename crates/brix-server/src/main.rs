//! brix-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) plus `BRIX_*`
//! environment variables, opens the SQLite queue store, starts the auto-retry
//! worker and serves HTTP until ctrl-c.

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use brix_server::{
  AppState, ServerConfig,
  backend::BackendClient,
  config::{expand_tilde, resolve_backend_url},
  retry::spawn_retry_worker,
};
use brix_store_sqlite::SqliteStore;
use clap::Parser;
use tokio::{net::TcpListener, sync::watch};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Brix event logger service")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("BRIX"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let backend_url =
    resolve_backend_url(server_cfg.backend_url.as_deref(), |k| std::env::var(k).ok());
  let backend = BackendClient::new(
    backend_url,
    Duration::from_secs(server_cfg.request_timeout_secs),
  )
  .context("failed to build backend client")?;
  tracing::info!(backend = backend.base_url(), "backend configured");

  // Open SQLite store.
  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let state = AppState {
    store:   Arc::new(store),
    backend: Arc::new(backend),
  };

  let (shutdown_tx, shutdown_rx) = watch::channel(false);
  let worker = spawn_retry_worker(
    Arc::clone(&state.store),
    Arc::clone(&state.backend),
    Duration::from_secs(server_cfg.retry_interval_secs.max(1)),
    // An attempt still `syncing` after twice the request timeout never
    // finished and is retried.
    Duration::from_secs(server_cfg.request_timeout_secs.max(1).saturating_mul(2)),
    shutdown_rx,
  );

  let app = brix_server::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(async move {
      tokio::signal::ctrl_c().await.ok();
      tracing::info!("shutdown requested");
      shutdown_tx.send(true).ok();
    })
    .await
    .context("server error")?;

  worker.await.context("auto-retry worker panicked")?;
  Ok(())
}
