//! Configuration management for the bridge host.
//!
//! This module handles loading, validation, and conversion of host
//! configuration from TOML files and command-line arguments.

use crate::cli::CliArgs;
use serde::{Deserialize, Serialize};
use session_bridge::ServerConfig;
use std::net::SocketAddr;
use std::path::Path;
use tracing::info;

fn default_max_connections() -> usize {
    1000
}

fn default_tick_interval() -> u64 {
    50 // 20 ticks per second
}

fn default_queue_warn_threshold() -> usize {
    10_000
}

fn default_network_thread_name() -> String {
    "bridge-net".to_string()
}

fn default_stats_interval() -> u64 {
    60
}

/// Application configuration loaded from a TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Bridge and network settings
    #[serde(default)]
    pub server: ServerSettings,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Bridge and network settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Network address to bind the WebSocket listener to (e.g., "127.0.0.1:8080")
    pub bind_address: String,
    /// Maximum number of concurrent sessions
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Host tick interval in milliseconds
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Drained batch size above which a warning is logged
    #[serde(default = "default_queue_warn_threshold")]
    pub queue_warn_threshold: usize,
    /// Name of the network OS thread
    #[serde(default = "default_network_thread_name")]
    pub network_thread_name: String,
    /// Seconds between periodic statistics reports
    #[serde(default = "default_stats_interval")]
    pub stats_interval_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            max_connections: default_max_connections(),
            tick_interval_ms: default_tick_interval(),
            queue_warn_threshold: default_queue_warn_threshold(),
            network_thread_name: default_network_thread_name(),
            stats_interval_secs: default_stats_interval(),
        }
    }
}

/// Logging configuration settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn or error
    pub level: String,
    /// Whether to emit JSON-formatted logs
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, writes the default configuration to `path`
    /// and returns it.
    pub async fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Applies command-line overrides on top of the file settings.
    pub fn apply_cli(&mut self, args: &CliArgs) {
        if let Some(bind_address) = &args.bind_address {
            self.server.bind_address = bind_address.clone();
        }
        if let Some(log_level) = &args.log_level {
            self.logging.level = log_level.clone();
        }
        if args.json_logs {
            self.logging.json_format = true;
        }
        if let Some(tick_ms) = args.tick_ms {
            self.server.tick_interval_ms = tick_ms;
        }
    }

    /// Converts the file settings into the bridge's [`ServerConfig`].
    pub fn to_server_config(&self) -> Result<ServerConfig, Box<dyn std::error::Error>> {
        Ok(ServerConfig {
            bind_address: self.server.bind_address.parse()?,
            max_connections: self.server.max_connections,
            tick_interval_ms: self.server.tick_interval_ms,
            queue_warn_threshold: self.server.queue_warn_threshold,
            network_thread_name: self.server.network_thread_name.clone(),
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.server.bind_address.parse::<SocketAddr>().is_err() {
            return Err(format!(
                "Invalid bind address: {}",
                &self.server.bind_address
            ));
        }

        if self.server.max_connections == 0 {
            return Err("server.max_connections must be greater than 0".to_string());
        }

        if self.server.tick_interval_ms == 0 {
            return Err("server.tick_interval_ms must be greater than 0".to_string());
        }

        if self.server.stats_interval_secs == 0 {
            return Err("server.stats_interval_secs must be greater than 0".to_string());
        }

        if self.server.network_thread_name.trim().is_empty() {
            return Err("server.network_thread_name cannot be empty".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }
}
