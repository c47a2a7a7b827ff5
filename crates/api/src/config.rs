//! Application configuration loaded from environment variables.

use std::time::Duration;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line, including the enclosing spans so every line
    /// carries the request's `trace_id`.
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `8080`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `pretty` or `json` (default: `pretty`)
/// - `INVENTORY_SERVICE_URL`: inventory base URL (default: `"http://localhost:8081"`)
/// - `PAYMENT_SERVICE_URL`: payment base URL (default: `"http://localhost:8082"`)
/// - `DOWNSTREAM_TIMEOUT_MS`: bound on each outbound call (default: `5000`)
/// - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP/HTTP collector base URL for traces
///   and logs (default: unset, nothing is exported)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub inventory_url: String,
    pub payment_url: String,
    pub downstream_timeout: Duration,
    pub otlp_endpoint: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .map(|f| LogFormat::parse(&f))
                .unwrap_or(defaults.log_format),
            inventory_url: lookup("INVENTORY_SERVICE_URL").unwrap_or(defaults.inventory_url),
            payment_url: lookup("PAYMENT_SERVICE_URL").unwrap_or(defaults.payment_url),
            downstream_timeout: lookup("DOWNSTREAM_TIMEOUT_MS")
                .and_then(|ms| ms.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.downstream_timeout),
            otlp_endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT")
                .map(|url| url.trim().trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty())
                .or(defaults.otlp_endpoint),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            inventory_url: "http://localhost:8081".to_string(),
            payment_url: "http://localhost:8082".to_string(),
            downstream_timeout: Duration::from_millis(5000),
            otlp_endpoint: None,
        }
    }
}
