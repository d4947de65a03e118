//! Configuration module for the EasyReview backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit log lines as JSON instead of the human readable format
    pub log_json: bool,
    /// Timeout for outbound requests to Dataverse installations
    pub http_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let db_path = env::var("EASYREVIEW_DB_PATH")
            .unwrap_or_else(|_| "./data/easyreview.sqlite".to_string())
            .into();

        let bind_addr = env::var("EASYREVIEW_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid EASYREVIEW_BIND_ADDR format");

        let log_level = env::var("EASYREVIEW_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_json = env::var("EASYREVIEW_LOG_JSON")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let http_timeout = env::var("EASYREVIEW_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        Self {
            db_path,
            bind_addr,
            log_level,
            log_json,
            http_timeout,
        }
    }
}
