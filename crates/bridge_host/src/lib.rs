//! # Session Bridge Host - Main Entry Point
//!
//! Runs a [`session_bridge::SessionBridge`] behind a WebSocket listener and
//! drives it from a fixed-rate tick loop. The bundled application echoes
//! every message back to the connection that sent it.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration
//! bridge_host
//!
//! # Specify custom configuration
//! bridge_host --config production.toml
//!
//! # Override specific settings
//! bridge_host --bind 0.0.0.0:8080 --tick-ms 16 --log-level debug
//!
//! # JSON logging for production
//! bridge_host --json-logs
//! ```
//!
//! ## Configuration
//!
//! The host loads configuration from a TOML file (default: `config.toml`).
//! If the file doesn't exist, a default configuration will be created.
//!
//! ## Signal Handling
//!
//! SIGINT and SIGTERM (Ctrl+C on Windows) start a graceful shutdown. A
//! second signal exits immediately.

use tracing::error;

pub mod app;
pub mod cli;
pub mod config;
pub mod echo;
pub mod logging;
pub mod signals;

pub use app::Application;
pub use cli::CliArgs;
pub use config::{AppConfig, LoggingSettings, ServerSettings};

/// Runs the host: parse arguments, set up logging, run the application.
///
/// # Exit Codes
///
/// * **0**: Successful execution and shutdown
/// * **1**: Error during startup, configuration, or runtime
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Logging has to be up before the application logs anything, so the
    // file is read once here just for its logging section.
    let mut config = AppConfig::load_from_file(&args.config_path)
        .await
        .unwrap_or_default();
    config.apply_cli(&args);

    if let Err(e) = logging::setup_logging(&config.logging, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e:?}");
            std::process::exit(1);
        }
    }

    Ok(())
}
