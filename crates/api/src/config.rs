//! Application configuration loaded from environment variables.

use domain::{CommissionRate, DEFAULT_COMMISSION_BPS};

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `DATABASE_URL` — PostgreSQL connection string; the server falls back
///   to the in-memory ledger when unset
/// - `COMMISSION_BPS` — marketplace commission in basis points (default: 300)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub commission_bps: u32,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            database_url: std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            commission_bps: std::env::var("COMMISSION_BPS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_COMMISSION_BPS),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the configured commission rate.
    pub fn commission(&self) -> CommissionRate {
        CommissionRate::from_bps(self.commission_bps)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            commission_bps: DEFAULT_COMMISSION_BPS,
        }
    }
}
