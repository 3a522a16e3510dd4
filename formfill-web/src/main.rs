//! formfill-web - certification form filling service
//!
//! Serves the roster upload page and the generation API. Templates are read
//! from the configured template directory; each run's output is kept under
//! its own directory below the output directory.

use anyhow::{Context, Result};
use clap::Parser;
use formfill_common::config::{default_config_path, load_toml_config, Settings};
use formfill_common::FormCatalog;
use std::path::{Path, PathBuf};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use formfill_web::{build_router, AppState};

/// Command-line arguments for formfill-web
#[derive(Parser, Debug)]
#[command(name = "formfill-web")]
#[command(about = "Fills certification form templates from attendee rosters")]
#[command(version)]
struct Args {
    /// Root folder holding templates and generated output
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Configuration file (defaults to the platform config location)
    #[arg(short, long, env = "FORMFILL_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "FORMFILL_PORT")]
    port: Option<u16>,

    /// Address to bind to
    #[arg(short, long, env = "FORMFILL_BIND_ADDRESS")]
    bind: Option<String>,
}

/// Log level from the config file, read before tracing is up
fn configured_log_level(config_path: Option<&Path>) -> String {
    config_path
        .map(Path::to_path_buf)
        .or_else(default_config_path)
        .and_then(|path| load_toml_config(&path).ok())
        .map(|config| config.logging.level)
        .unwrap_or_else(|| "info".to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins over the configured level
    let level = configured_log_level(args.config.as_deref());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level)),
        )
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting formfill-web v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let mut settings = Settings::resolve("formfill-web", args.root_folder, args.config.as_deref());
    if let Some(port) = args.port {
        settings.port = port;
    }
    if let Some(bind) = args.bind {
        settings.bind_address = bind;
    }
    settings
        .ensure_directories()
        .context("Failed to prepare data directories")?;
    info!("Template directory: {}", settings.template_dir.display());
    info!("Output directory: {}", settings.output_dir.display());

    let catalog = FormCatalog::builtin(&settings.host).context("Form catalog is invalid")?;
    for spec in catalog.iter() {
        let path = settings.template_dir.join(spec.template_file());
        if path.is_file() {
            info!(form = spec.label(), "✓ Template found: {}", path.display());
        } else {
            warn!(form = spec.label(), "Template missing: {}", path.display());
        }
    }

    let addr = format!("{}:{}", settings.bind_address, settings.port);
    let app = build_router(AppState::new(catalog, settings));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("formfill-web listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
