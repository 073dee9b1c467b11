use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use ephemera_blob::{BlobStore, FsBlobStore, ReaperBuilder, ReaperMetrics};
use ephemera_server::api::AppState;
use ephemera_server::config::{ConfigSnapshot, EphemeraConfig};
use ephemera_server::render::HtmlRenderer;

/// Ephemeral video sharing server.
#[derive(Parser, Debug)]
#[command(name = "ephemera-server", about = "Upload a video, share a link, let it expire")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "ephemera.toml", env = "EPHEMERA_CONFIG")]
    config: String,

    /// Override the bind host.
    #[arg(long, env = "EPHEMERA_HOST")]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long, env = "EPHEMERA_PORT")]
    port: Option<u16>,

    /// Override the upload directory.
    #[arg(long, env = "EPHEMERA_UPLOAD_DIR")]
    upload_dir: Option<String>,

    /// Override the per-upload size ceiling in bytes.
    #[arg(long, env = "EPHEMERA_MAX_UPLOAD_BYTES")]
    max_upload_bytes: Option<u64>,

    /// Override the reaper sweep interval in seconds.
    #[arg(long, env = "EPHEMERA_SWEEP_INTERVAL_SECONDS")]
    sweep_interval_seconds: Option<u64>,

    /// Override the asset lifetime in seconds.
    #[arg(long, env = "EPHEMERA_TTL_SECONDS")]
    ttl_seconds: Option<u64>,
}

impl Cli {
    fn apply(&self, config: &mut EphemeraConfig) {
        if let Some(host) = &self.host {
            config.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(dir) = &self.upload_dir {
            config.storage.upload_dir.clone_from(dir);
        }
        if let Some(max) = self.max_upload_bytes {
            config.storage.max_upload_bytes = max;
        }
        if let Some(interval) = self.sweep_interval_seconds {
            config.reaper.sweep_interval_seconds = interval;
        }
        if let Some(ttl) = self.ttl_seconds {
            config.reaper.ttl_seconds = ttl;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration from TOML file, or use defaults if the file does not exist.
    let config_exists = Path::new(&cli.config).exists();
    let mut config: EphemeraConfig = if config_exists {
        let contents = std::fs::read_to_string(&cli.config)?;
        toml::from_str(&contents)?
    } else {
        toml::from_str("")?
    };
    cli.apply(&mut config);

    let telemetry_guard = ephemera_server::telemetry::init(&config.telemetry);
    if !config_exists {
        info!(path = %cli.config, "config file not found, using defaults");
    }
    config.validate()?;

    // An unusable upload directory is fatal.
    let store: Arc<dyn BlobStore> = Arc::new(
        FsBlobStore::open(&config.storage.upload_dir, config.storage.max_upload_bytes).await?,
    );
    let ttl = config.reaper.ttl();

    let reaper_metrics = Arc::new(ReaperMetrics::default());
    let reaper = if config.reaper.enabled {
        let (mut reaper, shutdown_tx) = ReaperBuilder::new()
            .config(config.reaper.to_reaper_config())
            .store(Arc::clone(&store))
            .metrics(Arc::clone(&reaper_metrics))
            .build()
            .map_err(|e| format!("failed to build expiry reaper: {e}"))?;
        let handle = tokio::spawn(async move { reaper.run().await });
        Some((handle, shutdown_tx))
    } else {
        warn!("expiry reaper disabled, uploads will not be deleted");
        None
    };

    let renderer = HtmlRenderer::new(config.external_url(), ttl)?;
    let mut state = AppState::new(Arc::clone(&store), ttl, Arc::new(renderer))
        .with_config(ConfigSnapshot::from(&config));
    if reaper.is_some() {
        state = state.with_reaper_metrics(reaper_metrics);
    }
    let app = ephemera_server::api::router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        address = %addr,
        upload_dir = %config.storage.upload_dir,
        ttl_seconds = config.reaper.ttl_seconds,
        max_upload_bytes = config.storage.max_upload_bytes,
        "ephemera-server listening"
    );

    // Serve with graceful shutdown on SIGINT / SIGTERM.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let an in-flight sweep finish (with configurable timeout).
    if let Some((handle, shutdown_tx)) = reaper {
        let _ = shutdown_tx.send(()).await;
        let timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);
        if tokio::time::timeout(timeout, handle).await.is_err() {
            warn!(
                timeout_secs = config.server.shutdown_timeout_seconds,
                "reaper did not stop within the shutdown timeout"
            );
        }
    }

    telemetry_guard.shutdown();

    info!("ephemera-server shut down");
    Ok(())
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM, then return to trigger graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
