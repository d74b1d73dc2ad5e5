use std::str::FromStr;
use std::time::Duration;

use pedidos_core::locking::{
    LockConfig, DEFAULT_HEARTBEAT_INTERVAL_SECS, DEFAULT_INACTIVITY_THRESHOLD_SECS,
    DEFAULT_SWEEP_INTERVAL_SECS,
};

/// Output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines (default).
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8080`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for background tasks (default: `10`).
    pub shutdown_timeout_secs: u64,
    /// Interval between WebSocket Ping frames (default: `30`).
    pub ws_ping_interval_secs: u64,
    /// Heartbeat, inactivity, and sweep timings.
    pub lock: LockConfig,
    /// Tracing output format.
    pub log_format: LogFormat,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                          | Default                 |
    /// |----------------------------------|-------------------------|
    /// | `HOST`                           | `0.0.0.0`               |
    /// | `PORT`                           | `8080`                  |
    /// | `CORS_ORIGINS`                   | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`           | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`          | `10`                    |
    /// | `WS_PING_INTERVAL_SECS`          | `30`                    |
    /// | `LOCK_HEARTBEAT_INTERVAL_SECS`   | `60`                    |
    /// | `LOCK_INACTIVITY_THRESHOLD_SECS` | `180`                   |
    /// | `LOCK_SWEEP_INTERVAL_SECS`       | `30`                    |
    /// | `LOG_FORMAT`                     | `pretty`                |
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Fails on unparsable values and on lock timings that
    /// [`LockConfig::validate`] rejects.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = parse_or(&lookup, "PORT", 8080)?;

        let cors_origins: Vec<String> = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30)?;
        let shutdown_timeout_secs: u64 = parse_or(&lookup, "SHUTDOWN_TIMEOUT_SECS", 10)?;
        let ws_ping_interval_secs: u64 = parse_or(&lookup, "WS_PING_INTERVAL_SECS", 30)?;

        let lock = LockConfig {
            heartbeat_interval: Duration::from_secs(parse_or(
                &lookup,
                "LOCK_HEARTBEAT_INTERVAL_SECS",
                DEFAULT_HEARTBEAT_INTERVAL_SECS,
            )?),
            inactivity_threshold: Duration::from_secs(parse_or(
                &lookup,
                "LOCK_INACTIVITY_THRESHOLD_SECS",
                DEFAULT_INACTIVITY_THRESHOLD_SECS,
            )?),
            sweep_interval: Duration::from_secs(parse_or(
                &lookup,
                "LOCK_SWEEP_INTERVAL_SECS",
                DEFAULT_SWEEP_INTERVAL_SECS,
            )?),
        };
        lock.validate()?;

        if ws_ping_interval_secs == 0 {
            return Err("WS_PING_INTERVAL_SECS must be greater than zero".into());
        }

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            None | Some("pretty") | Some("") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => return Err(format!("LOG_FORMAT must be 'pretty' or 'json', got '{other}'")),
        };

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            ws_ping_interval_secs,
            lock,
            log_format,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, String>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| format!("{key} must be a valid number, got '{raw}'")),
    }
}
