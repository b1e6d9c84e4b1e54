//! Main application entry point for the rectangle filtering service.
//!
//! Parses the command line, loads and validates configuration, sets up
//! logging and runs the server until a termination signal arrives.

mod cli;
mod config;
mod signals;

use anyhow::{Context, Result};
use cli::CliArgs;
use config::{AppConfig, LoggingSettings};
use filter_server::FilterServer;
use signals::setup_signal_handlers;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// ============================================================================
// Logging Setup
// ============================================================================

/// Initialize logging system
///
/// `RUST_LOG` takes precedence over the configured level.
fn setup_logging(config: &LoggingSettings) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let registry = tracing_subscriber::registry().with(filter);

    if config.json_format {
        registry
            .with(fmt::layer().json().with_target(false).with_thread_ids(true))
            .try_init()
            .context("Failed to initialize logging")?;
    } else {
        registry
            .with(fmt::layer().with_target(false).with_thread_ids(true))
            .try_init()
            .context("Failed to initialize logging")?;
    }

    info!("🔧 Logging initialized with level: {}", config.level);
    Ok(())
}

// ============================================================================
// Application
// ============================================================================

/// Main application struct
pub struct Application {
    config: AppConfig,
    server: Arc<FilterServer>,
}

impl Application {
    /// Loads configuration, applies CLI overrides and builds the server.
    pub async fn new(args: CliArgs) -> Result<Self> {
        let mut config = AppConfig::load_from_file(&args.config_path).await?;
        config.apply_overrides(&args);
        config
            .validate()
            .context("Configuration validation failed")?;

        // A subscriber may already be installed (e.g. when embedded in tests).
        if let Err(e) = setup_logging(&config.logging) {
            eprintln!("⚠️ {:#}", e);
        }

        let server = Arc::new(FilterServer::new(config.to_server_config()?));

        info!(
            "📂 Config: {} | Data file: {}",
            args.config_path.display(),
            config.storage.data_file
        );

        Ok(Self { config, server })
    }

    /// Runs the server until a termination signal is received.
    pub async fn run(self) -> Result<()> {
        info!(
            "🌟 Starting rectangle filtering service v{}",
            env!("CARGO_PKG_VERSION")
        );
        info!("  🌐 Bind address: {}", self.config.server.bind_address);
        info!("  📄 Data file: {}", self.config.storage.data_file);

        let mut server_handle = {
            let server = self.server.clone();
            tokio::spawn(async move { server.start().await })
        };

        info!("🛑 Press Ctrl+C to gracefully shutdown");

        tokio::select! {
            // The server only returns on its own if it failed to start or serve.
            result = &mut server_handle => {
                return match result.context("Server task panicked")? {
                    Ok(()) => Ok(()),
                    Err(e) => Err(e).context("Server error"),
                };
            }
            signal = setup_signal_handlers() => {
                signal.context("Failed to install signal handlers")?;
            }
        }

        info!("🛑 Shutdown signal received, initiating graceful shutdown...");
        self.server.shutdown().await?;

        match server_handle.await.context("Server task panicked")? {
            Ok(()) => info!("✅ Rectangle filtering service shutdown complete"),
            Err(e) => error!("❌ Server error during shutdown: {}", e),
        }

        Ok(())
    }
}

// ============================================================================
// Entry Point
// ============================================================================

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let args = CliArgs::parse();

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("❌ Failed to start application: {:?}", e);
            std::process::exit(1);
        }
    }
}
