//! Configuration management for the Railbook server.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Unparseable values fall back to the default rather than aborting startup.

use railbook_core::ReservationPolicy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Booking limits
    pub booking: BookingConfig,
    /// Persistence and seed data
    pub storage: StorageConfig,
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Log filter (`RUST_LOG` syntax)
    pub log_level: String,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout: u64,
    /// Serve Prometheus metrics at `/metrics`
    pub metrics_enabled: bool,
    /// Origins allowed by CORS
    pub cors_allowed_origins: Vec<String>,
}

/// Booking limits handed to the reservation core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingConfig {
    /// Largest party per booking
    pub max_passengers_per_booking: u32,
    /// PNR draws before a booking fails with a conflict
    pub pnr_max_attempts: u32,
}

/// Snapshot and seeding configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Snapshot file restored at startup and written on shutdown
    pub snapshot_path: Option<PathBuf>,
    /// Seed demo railways and trains when nothing was restored
    pub seed_demo_data: bool,
}

const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

impl Config {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = ReservationPolicy::default();

        Self {
            server: ServerConfig {
                host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parsed(&lookup, "PORT").unwrap_or(8000),
                log_level: lookup("RUST_LOG").unwrap_or_else(|| "info,railbook=debug".to_string()),
                shutdown_timeout: parsed(&lookup, "SHUTDOWN_TIMEOUT").unwrap_or(30),
                metrics_enabled: parsed(&lookup, "METRICS_ENABLED").unwrap_or(true),
                cors_allowed_origins: split_list(
                    &lookup("CORS_ALLOWED_ORIGINS")
                        .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string()),
                ),
            },
            booking: BookingConfig {
                max_passengers_per_booking: parsed(&lookup, "MAX_PASSENGERS_PER_BOOKING")
                    .unwrap_or(defaults.max_passengers_per_booking),
                pnr_max_attempts: parsed(&lookup, "PNR_MAX_ATTEMPTS")
                    .unwrap_or(defaults.pnr_max_attempts),
            },
            storage: StorageConfig {
                snapshot_path: lookup("SNAPSHOT_PATH")
                    .filter(|path| !path.trim().is_empty())
                    .map(PathBuf::from),
                seed_demo_data: parsed(&lookup, "SEED_DEMO_DATA").unwrap_or(true),
            },
        }
    }

    /// Address the HTTP listener binds to
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Booking limits for the reservation core
    #[must_use]
    pub const fn policy(&self) -> ReservationPolicy {
        ReservationPolicy {
            max_passengers_per_booking: self.booking.max_passengers_per_booking,
            pnr_max_attempts: self.booking.pnr_max_attempts,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|raw| raw.trim().parse().ok())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
        assert_eq!(config.server.shutdown_timeout, 30);
        assert!(config.server.metrics_enabled);
        assert_eq!(
            config.server.cors_allowed_origins,
            vec!["http://localhost:3000", "http://localhost:5173"]
        );
        assert_eq!(config.policy(), ReservationPolicy::default());
        assert_eq!(config.storage.snapshot_path, None);
        assert!(config.storage.seed_demo_data);
    }

    #[test]
    fn test_overrides() {
        let config = config_with(&[
            ("PORT", "9000"),
            ("METRICS_ENABLED", "false"),
            ("MAX_PASSENGERS_PER_BOOKING", " 4 "),
            ("SNAPSHOT_PATH", "/var/lib/railbook/state.bin"),
            ("CORS_ALLOWED_ORIGINS", "https://railbook.example, ,https://admin.railbook.example"),
        ]);
        assert_eq!(config.server.port, 9000);
        assert!(!config.server.metrics_enabled);
        assert_eq!(config.booking.max_passengers_per_booking, 4);
        assert_eq!(
            config.storage.snapshot_path,
            Some(PathBuf::from("/var/lib/railbook/state.bin"))
        );
        assert_eq!(config.server.cors_allowed_origins.len(), 2);
    }

    #[test]
    fn test_bad_values_fall_back() {
        let config = config_with(&[("PORT", "eighty"), ("SEED_DEMO_DATA", "maybe")]);
        assert_eq!(config.server.port, 8000);
        assert!(config.storage.seed_demo_data);
    }
}
