//! Main application logic and lifecycle management.
//!
//! This module contains the `Application` struct that starts the network
//! thread, drives the bridge from the host tick loop, reports statistics and
//! performs the ordered shutdown.

use crate::{
    cli::CliArgs,
    config::AppConfig,
    echo::EchoFactory,
    logging::display_banner,
    signals::{setup_signal_handlers, setup_signal_handlers_silent},
};
use session_bridge::{BridgeError, BridgeStats, SessionBridge, WebSocketTransport};
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info, trace, warn};

/// Owns the configuration and the bridge for one host process.
pub struct Application {
    /// Loaded application configuration
    config: AppConfig,
    /// The bridge driven by the tick loop
    bridge: Arc<SessionBridge>,
}

impl Application {
    /// Creates a new application instance.
    ///
    /// Loads the configuration file (creating a default one if missing),
    /// applies command-line overrides, validates the result and builds the
    /// bridge with the echo session factory.
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path).await?;
        config.apply_cli(&args);

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }
        info!("✅ Configuration loaded and validated successfully");

        display_banner();

        let bridge = Self::build_bridge(&config)?;
        Ok(Self {
            config,
            bridge: Arc::new(bridge),
        })
    }

    fn build_bridge(config: &AppConfig) -> Result<SessionBridge, Box<dyn std::error::Error>> {
        let bridge = SessionBridge::builder()
            .config(config.to_server_config()?)
            .session_factory(EchoFactory::new())
            .fatal_handler(|e| error!("💥 Network thread failed: {}", e))
            .build()?;
        Ok(bridge)
    }

    /// Runs until a shutdown signal arrives or the network thread stops.
    ///
    /// Shutdown order: stop the network thread, stop polling, close the
    /// remaining connections and release the registry.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!("🌟 Starting session bridge host");
        self.log_configuration_summary();

        let transport = WebSocketTransport::bind(self.bridge.config().bind_address)?;
        let local_addr = transport.local_addr();
        let network = self.bridge.start_network(transport)?;

        let monitoring_handle = {
            let bridge = self.bridge.clone();
            let period = Duration::from_secs(self.config.server.stats_interval_secs);
            tokio::spawn(async move { monitor_stats(bridge, period).await })
        };

        info!("✅ Session bridge host is now running!");
        info!("🎮 Ready to accept connections on ws://{}", local_addr);
        info!("🛑 Press Ctrl+C to gracefully shutdown");

        let tick = Duration::from_millis(self.config.server.tick_interval_ms);
        tokio::select! {
            result = setup_signal_handlers() => {
                result?;
            }
            _ = run_tick_loop(&self.bridge, tick) => {
                warn!("⚠️ Network thread stopped unexpectedly, shutting down");
            }
        }

        // A second signal skips the graceful path.
        tokio::spawn(async move {
            if let Err(e) = setup_signal_handlers_silent().await {
                error!("Failed to set up merciless shutdown signal handler: {e}");
                return;
            }
            warn!("Shutdown handler received again! I'll make this quick.");
            std::process::exit(1);
        });

        monitoring_handle.abort();

        info!("📡 Phase 1: Stopping network thread...");
        let closed = tokio::task::spawn_blocking(move || {
            let mut network = network;
            network.stop();
            info!("🧹 Phase 2: Closing remaining connections...");
            network.dispose()
        })
        .await?;
        info!("✅ Closed {} remaining connection(s)", closed);

        log_final_statistics(&self.bridge.stats());
        info!("✅ Session bridge host shutdown complete");
        Ok(())
    }

    fn log_configuration_summary(&self) {
        info!("📋 Configuration Summary:");
        info!("  🌐 Bind address: {}", self.config.server.bind_address);
        info!("  👥 Max connections: {}", self.config.server.max_connections);
        info!("  ⏱️ Tick interval: {}ms", self.config.server.tick_interval_ms);
        info!(
            "  📦 Queue warning threshold: {}",
            self.config.server.queue_warn_threshold
        );
    }
}

/// Polls the bridge once per tick until it reports that the network thread
/// is no longer running.
pub async fn run_tick_loop(bridge: &SessionBridge, tick: Duration) {
    let mut ticker = interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        match bridge.poll() {
            Ok(report) if report.drained > 0 => trace!(
                "🕒 Tick dispatched {} message(s): {} to sessions, {} sessionless",
                report.drained,
                report.delivered,
                report.sessionless
            ),
            Ok(_) => {}
            Err(BridgeError::NotRunning) => break,
            Err(e) => error!("❌ Poll failed: {}", e),
        }
    }
}

async fn monitor_stats(bridge: Arc<SessionBridge>, period: Duration) {
    let mut ticker = interval(period);
    // The first tick completes immediately.
    ticker.tick().await;
    let mut last_delivered = 0u64;

    loop {
        ticker.tick().await;
        let stats = bridge.stats();
        let delivered = stats.messages_delivered - last_delivered;
        last_delivered = stats.messages_delivered;
        info!(
            "📊 Bridge Health - {} sessions | {} delivered this period | {} sessionless total",
            stats.active_sessions, delivered, stats.messages_sessionless
        );
    }
}

fn log_final_statistics(stats: &BridgeStats) {
    info!("📊 Final Statistics:");
    info!("  - Sessions created: {}", stats.sessions_created);
    info!("  - Sessions rejected: {}", stats.sessions_rejected);
    info!("  - Session creation failures: {}", stats.sessions_failed);
    info!("  - Messages enqueued: {}", stats.messages_enqueued);
    info!("  - Messages delivered: {}", stats.messages_delivered);
    info!("  - Messages routed sessionless: {}", stats.messages_sessionless);
    info!("  - Polls: {}", stats.polls);
}

#[cfg(test)]
mod tests {
    use super::*;
    use session_bridge::{ShutdownState, Transport, TransportSink};

    struct ShortLived;

    impl Transport for ShortLived {
        fn name(&self) -> &str {
            "short-lived"
        }

        fn run(self: Box<Self>, _sink: TransportSink, _shutdown: ShutdownState) -> Result<(), BridgeError> {
            std::thread::sleep(std::time::Duration::from_millis(30));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_tick_loop_ends_when_network_stops() {
        let bridge = Application::build_bridge(&AppConfig::default()).expect("bridge");
        let mut network = bridge.start_network(ShortLived).expect("start");

        tokio::time::timeout(
            Duration::from_secs(2),
            run_tick_loop(&bridge, Duration::from_millis(5)),
        )
        .await
        .expect("tick loop should end once the transport exits");

        assert!(bridge.stats().polls > 0);
        network.stop();
    }

    #[tokio::test]
    async fn test_new_rejects_invalid_config() {
        let dir = tempfile::tempdir().expect("temp dir");
        let args = CliArgs {
            config_path: dir.path().join("config.toml"),
            bind_address: Some("not-an-address".to_string()),
            log_level: None,
            json_logs: false,
            tick_ms: None,
        };

        assert!(Application::new(args).await.is_err());
    }
}
