// Goal draft server entry point.
//
// Startup sequence:
// 1. Initialize tracing
// 2. Load config (copying defaults on first run)
// 3. Seed the league directory
// 4. Open the database and report drafts left running
// 5. Spawn the WebSocket server task
// 6. Run the app loop until it exits or Ctrl+C

use std::sync::Arc;

use anyhow::Context;
use goaldraft_core::clock::SystemClock;
use goaldraft_core::db::{self, SqliteStore};
use goaldraft_core::store::DraftStore;
use goaldraft_core::DraftScheduler;
use goaldraft_server::{app, config, seed, ws_server};
use tokio::sync::mpsc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;
    info!("Goal draft server starting up");

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: {}s per pick, deadline sweep {}",
        config.draft.pick_time_secs,
        if config.autopick.enabled { "enabled" } else { "disabled" }
    );

    let cwd = std::env::current_dir().context("failed to read working directory")?;
    let directory =
        seed::load_directory(&cwd, &config.seed).context("failed to load seed data")?;

    let db_path = resolve_db_path(&config)?;
    let store = Arc::new(SqliteStore::open(&db_path).context("failed to open database")?);
    info!("Database opened at {}", db_path);

    let active = store
        .active_leagues()
        .context("failed to read active drafts")?;
    if active.is_empty() {
        info!("No drafts in progress");
    } else {
        info!("Resuming {} drafts in progress", active.len());
    }

    let scheduler = DraftScheduler::new(
        store,
        Arc::new(directory),
        Arc::new(SystemClock),
        config.draft.settings(),
    );

    let (ws_tx, ws_rx) = mpsc::channel(256);
    let listener = ws_server::bind(config.ws_port)
        .await
        .with_context(|| format!("failed to bind WebSocket server on port {}", config.ws_port))?;
    let ws_handle = tokio::spawn(async move {
        if let Err(e) = ws_server::run(listener, ws_tx).await {
            error!("WebSocket server error: {}", e);
        }
    });

    let state = app::AppState::new(scheduler);
    tokio::select! {
        result = app::run(ws_rx, state, config.autopick.clone()) => {
            if let Err(e) = result {
                error!("Application loop error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C received, shutting down");
        }
    }

    ws_handle.abort();
    info!("Goal draft server shut down cleanly");
    Ok(())
}

/// The configured database path, or the per-user default with its directory
/// created.
fn resolve_db_path(config: &config::Config) -> anyhow::Result<String> {
    if !config.db_path.trim().is_empty() {
        return Ok(config.db_path.clone());
    }
    let path = db::default_db_path()
        .context("no per-user data directory available; set [database] path")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Ok(path.to_string_lossy().into_owned())
}

/// Log to stderr with an `EnvFilter` (overridable via `RUST_LOG`).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("goaldraft=info,goaldraft_core=info,goaldraft_server=info,warn")
    });
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
