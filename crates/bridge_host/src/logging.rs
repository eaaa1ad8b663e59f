//! Tracing subscriber setup for the host process.
//!
//! The configured level applies to the bridge and host crates only. Every
//! other crate, tungstenite included, stays at `warn` unless `RUST_LOG`
//! says otherwise.

use crate::config::LoggingSettings;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Crates whose output follows the configured level.
const BRIDGE_TARGETS: [&str; 3] = ["session_bridge", "lib_bridge_host", "bridge_host"];

/// Builds the default filter directives for `level`.
pub fn default_directives(level: &str) -> String {
    let mut directives = String::from("warn");
    for target in BRIDGE_TARGETS {
        directives.push_str(&format!(",{target}={level}"));
    }
    directives
}

/// Initializes the global tracing subscriber.
///
/// `RUST_LOG` replaces the default directives when set. Thread names are
/// included so output from the network thread and the host thread can be
/// told apart.
pub fn setup_logging(
    config: &LoggingSettings,
    json_format: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = config.level.as_str();
    let directives = default_directives(log_level);
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&directives)?,
    };

    let registry = tracing_subscriber::registry().with(filter);

    if json_format || config.json_format {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_file(false)
                    .with_line_number(false)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .try_init()?;
    } else {
        registry
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_file(false)
                    .with_line_number(false)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .try_init()?;
    }

    info!("🔧 Logging initialized: {}", directives);
    Ok(())
}

/// Displays the startup banner through the logger.
pub fn display_banner() {
    let version = option_env!("CARGO_PKG_VERSION").unwrap_or("UNK");
    info!("╔══════════════════════════════════════════╗");
    info!("║          🌉 SESSION BRIDGE HOST 🌉        ║");
    info!("║                 v{:<24}║", version);
    info!("║                                          ║");
    info!("║  🔗 Connection sessions on a net thread  ║");
    info!("║  ⏱️  Tick-driven message dispatch         ║");
    info!("║  🌐 WebSocket transport                  ║");
    info!("║                                          ║");
    info!("╚══════════════════════════════════════════╝");
}
