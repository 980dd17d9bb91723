use models::{CliApp, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod cache;
mod cli;
mod config;
mod crm_api;
mod export;
mod filter;
mod leads_api;
mod models;
mod store;
mod validate;

use config::{load_config, Config};
use tokio::signal;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let config = match load_config("config.yml").await {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to load config.yml: {}. Using defaults.", e);
            Config::default()
        }
    };

    // Setup logging
    std::env::set_var("RUST_LOG", "lead_desk=info,hyper=warn,reqwest=warn");
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("lead_desk=info".parse().unwrap()),
        )
        .with_max_level(tracing::Level::INFO)
        .init();

    // Create output and cache directories
    tokio::fs::create_dir_all(&config.output.directory).await?;
    tokio::fs::create_dir_all(&config.cache.directory).await?;

    // Initialize and run CLI app
    info!("Starting Lead Desk...");
    let app = CliApp::new(config).await?;

    // Add graceful shutdown; any in-flight request dies with the select.
    tokio::select! {
        result = app.run() => {
            result?;
        }
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
