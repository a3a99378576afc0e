use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use heimwolke::config;
use heimwolke::credentials::MemoryCredentialsStorage;
use heimwolke::files::source::DiskFilesSource;
use heimwolke::gallery::cache::DiskThumbnailCache;
use heimwolke::gallery::source::DiskGallerySource;
use heimwolke::routes;
use heimwolke::share::store::{spawn_expiry_sweep, DiskShareStore, ShareStore};
use heimwolke::state::AppState;
use heimwolke::types::ModuleKind;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logging (stdout + tägliche Datei-Rotation unter ./logs)
    std::fs::create_dir_all("logs").ok();
    let (stdout_nb, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let file_appender = tracing_appender::rolling::daily("logs", "heimwolke.log");
    let (file_nb, file_guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(stdout_nb))
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file_nb))
        .init();
    // Guards am Leben halten, damit Non-Blocking Writer korrekt flushen
    let _log_guards = (stdout_guard, file_guard);

    // Load configuration (embedded defaults -> heimwolke.toml -> env/.env)
    let app_cfg = config::load()?;

    let credentials = Arc::new(MemoryCredentialsStorage::new(
        app_cfg.auth.users.clone(),
        app_cfg.auth.jwt_secret.as_bytes(),
        chrono::Duration::hours(app_cfg.auth.token_ttl_hours as i64),
    ));
    let shares: Arc<dyn ShareStore> = Arc::new(DiskShareStore::new(&app_cfg.share.path)?);

    let mut state = AppState::new(app_cfg.clone(), credentials, shares.clone());
    for module in &app_cfg.modules {
        match module {
            ModuleKind::Gallery => {
                let gallery_cfg = app_cfg
                    .gallery
                    .as_ref()
                    .ok_or_else(|| anyhow::anyhow!("gallery module enabled but [gallery] is missing"))?;
                let source = DiskGallerySource::new(&gallery_cfg.path, &gallery_cfg.extensions)?;
                let cache = DiskThumbnailCache::new(&gallery_cfg.cache)?;
                state = state.with_gallery(Arc::new(source), Arc::new(cache));
            }
            ModuleKind::Files => {
                let files_cfg = app_cfg
                    .files
                    .as_ref()
                    .ok_or_else(|| anyhow::anyhow!("files module enabled but [files] is missing"))?;
                state = state.with_files(Arc::new(DiskFilesSource::new(&files_cfg.path)?));
            }
        }
    }

    // Periodic share expiry sweep, stopped again on graceful shutdown
    let sweep_cancel = CancellationToken::new();
    let sweep = spawn_expiry_sweep(
        shares,
        Duration::from_secs(app_cfg.share.sweep_interval_secs),
        sweep_cancel.clone(),
        state.metrics.clone(),
    );

    let app = routes::router(state);

    // CORS: in Debug permissiv (für lokale Entwicklung mit separater UI), in Release nicht nötig (same-origin)
    let app = if cfg!(debug_assertions) { app.layer(CorsLayer::permissive()) } else { app };

    // Server listen addr (from config)
    let port: u16 = app_cfg.server.port;
    let host: String = app_cfg.server.host.clone();
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid listen addr {}:{} - {}", host, port, e))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Heimwolke listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    sweep_cancel.cancel();
    let _ = sweep.await;

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut term = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("Shutdown signal received. Stopping server...");
}
