//! Decant server binary.

use anyhow::{Context, Result};
use clap::Parser;
use decant_core::config::AppConfig;
use decant_core::ChunkerParams;
use decant_metadata::FileMetadataStore;
use decant_server::{create_router, AppState};
use decant_storage::BlobStore;
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Decant - a deduplicating Nix binary cache server
#[derive(Parser, Debug)]
#[command(name = "decantd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "DECANT_CONFIG",
        default_value = "config/decant.toml"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Decant v{}", env!("CARGO_PKG_VERSION"));

    // Configuration file is optional; every field has a default and can be
    // overridden through DECANT_-prefixed environment variables.
    let mut figment = Figment::new();
    let config_path = std::path::Path::new(&args.config);
    if config_path.exists() {
        tracing::info!(config_path = %args.config, "Loading configuration from file");
        figment = figment.merge(Toml::file(&args.config));
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("DECANT_").split("__"))
        .extract()
        .context("failed to load configuration")?;
    config.validate().map_err(anyhow::Error::msg)?;

    let params = ChunkerParams::from_avg(config.cache.avg_chunk_size)
        .context("invalid chunker configuration")?;

    let blobs = BlobStore::open_local(&config.cache.path, &params)
        .await
        .context("failed to open blob store")?;
    tracing::info!(cache_path = %config.cache.path.display(), "Blob store opened");

    let metadata = Arc::new(
        FileMetadataStore::new(config.cache.path.join("narinfo"))
            .await
            .context("failed to open metadata store")?,
    );
    tracing::info!("Metadata store opened");

    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .context("invalid bind address")?;

    let state = AppState::new(config, blobs, metadata);
    let app = create_router(state);

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
