// ============================
// crates/backend-bin/src/main.rs
// ============================
//! Tokio / Axum entry-point for the auth server.
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use authgate_backend_lib::{
    auth::generate_signing_secret,
    config::{Settings, StorageBackend},
    create_router,
    storage::{FlatFileUserStore, MemoryUserStore, UserStore},
    AppState,
};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "authgate", version, about = "Authentication and session server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Configuration file, defaults to `config.toml`
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print a fresh random secret for `jwt.secret`
    GenSecret,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve { config: None }) {
        Command::Serve { config } => serve(config).await,
        Command::GenSecret => {
            println!("{}", generate_signing_secret());
            Ok(())
        },
    }
}

async fn serve(config: Option<PathBuf>) -> anyhow::Result<()> {
    let settings = match config {
        Some(path) => Settings::load_from(&path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => Settings::load().context("loading configuration")?,
    };

    init_tracing(&settings);
    tracing::info!(
        bind_addr = %settings.bind_addr,
        storage = ?settings.storage.backend,
        "starting authgate"
    );

    match settings.storage.backend {
        StorageBackend::File => {
            let store = FlatFileUserStore::open(&settings.storage.path)
                .await
                .with_context(|| {
                    format!("opening user store at {}", settings.storage.path.display())
                })?;
            run(Arc::new(store), settings).await
        },
        StorageBackend::Memory => {
            tracing::warn!("using in-memory user store, data is lost on shutdown");
            run(Arc::new(MemoryUserStore::new()), settings).await
        },
    }
}

async fn run<S: UserStore>(store: Arc<S>, settings: Settings) -> anyhow::Result<()> {
    let addr = settings.bind_addr;
    let app = create_router(AppState::new(store, settings));

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

/// `RUST_LOG` wins over the configured level
fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_level.as_str()));
    let registry = tracing_subscriber::registry().with(filter);

    if settings.log_format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
