//! # slidecast
//!
//! Slidecast server binary: loads settings, opens the session store and
//! starts the HTTP/WebSocket server.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use slidecast_server::{ServerConfig, SlidecastServer};
use slidecast_settings::{LogFormat, SlidecastSettings, StoreBackend};
use slidecast_slides::{PdftoppmRasterizer, SlideLibrary};
use slidecast_store::{ConnectionConfig, MemorySessionStore, SessionStore, SqliteSessionStore};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// How long open sockets get to close after ctrl-c.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Slidecast presentation sync server.
#[derive(Parser, Debug)]
#[command(name = "slidecast", about = "Slidecast presentation sync server")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Path to the `SQLite` session database (overrides settings).
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Settings file (default `~/.slidecast/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep sessions in memory instead of `SQLite`.
    #[arg(long)]
    memory_store: bool,
}

impl Cli {
    /// Fold command-line overrides into the loaded settings.
    fn apply(&self, settings: &mut SlidecastSettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(path) = &self.db_path {
            settings.store.path = Some(path.to_string_lossy().into_owned());
        }
        if self.memory_store {
            settings.store.backend = StoreBackend::Memory;
        }
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

fn open_store(settings: &SlidecastSettings) -> Result<Arc<dyn SessionStore>> {
    match settings.store.backend {
        StoreBackend::Memory => {
            tracing::warn!("using in-memory session store; sessions are lost on restart");
            Ok(Arc::new(MemorySessionStore::new()))
        }
        StoreBackend::Sqlite => {
            let db_path = settings.store.db_path();
            ensure_parent_dir(&db_path)?;
            let config = ConnectionConfig {
                pool_size: settings.store.pool_size,
                busy_timeout_ms: settings.store.busy_timeout_ms,
            };
            let store = SqliteSessionStore::open(&db_path.to_string_lossy(), &config)
                .with_context(|| format!("Failed to open session store at {}", db_path.display()))?;
            Ok(Arc::new(store))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let settings_path = args.config.clone().unwrap_or_else(slidecast_settings::settings_path);
    let mut settings = slidecast_settings::load_settings_from_path(&settings_path)
        .with_context(|| format!("Failed to load settings from {}", settings_path.display()))?;
    args.apply(&mut settings);

    slidecast_core::logging::init_subscriber(&settings.logging.level, settings.logging.format == LogFormat::Json);

    let store = open_store(&settings)?;

    let slides = &settings.slides;
    let library = SlideLibrary::new(&slides.slides_dir, &slides.uploads_dir);
    library
        .ensure_dirs()
        .await
        .context("Failed to create slide directories")?;
    let rasterizer = PdftoppmRasterizer::new(library.clone(), &slides.rasterizer_command, slides.dpi);

    let config = ServerConfig::from_settings(&settings.server);
    let mut server = SlidecastServer::new(config, store, library, Arc::new(rasterizer));
    match slidecast_server::metrics::install_recorder() {
        Ok(handle) => server = server.with_metrics(handle),
        Err(e) => tracing::warn!(error = %e, "metrics disabled"),
    }

    let (addr, handle) = server.listen().await.context("Failed to bind server")?;
    tracing::info!("slidecast listening on http://{addr}");

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    if server.shutdown().graceful_shutdown(handle, SHUTDOWN_GRACE).await {
        tracing::info!("Shutdown complete");
    } else {
        tracing::warn!("Shutdown forced after {SHUTDOWN_GRACE:?}");
    }
    Ok(())
}
