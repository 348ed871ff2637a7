//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use availability::MAX_WINDOW_DAYS;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Which checkout gateway adapter to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayKind {
    InMemory,
    Http,
}

impl FromStr for GatewayKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "in-memory" | "memory" => Ok(GatewayKind::InMemory),
            "http" => Ok(GatewayKind::Http),
            other => Err(format!("unknown gateway kind: {other}")),
        }
    }
}

/// Which availability cache adapter to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    InMemory,
    Rest,
}

impl FromStr for CacheKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "in-memory" | "memory" => Ok(CacheKind::InMemory),
            "rest" => Ok(CacheKind::Rest),
            other => Err(format!("unknown cache kind: {other}")),
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`, `PORT`: bind address (default `0.0.0.0:3000`)
/// - `RUST_LOG`: tracing filter directive (default `info`)
/// - `LOG_FORMAT`: `pretty` or `json` (default `pretty`)
/// - `DATABASE_URL`: PostgreSQL URL; in-memory stores when unset
/// - `GATEWAY_KIND`, `GATEWAY_URL`, `GATEWAY_SUCCESS_URL`, `GATEWAY_CANCEL_URL`,
///   `GATEWAY_TIMEOUT_MS`, `WEBHOOK_SECRET`: checkout gateway
/// - `PRICE_PER_SLOT`, `CURRENCY`: pricing (default 2000 `usd`)
/// - `CACHE_KIND`, `CACHE_URL`, `CACHE_WRITE_TIMEOUT_MS`: availability cache
/// - `SLOT_SOURCE_URL`: reservation service root for the sweep; the local
///   ledger is read when unset
/// - `SWEEP_INTERVAL_SECS`, `SWEEP_WINDOW_DAYS`: reconciliation sweep
/// - `SLOT_DURATION_MINUTES`, `SLOT_GENERATION_DAYS`: schedule generation
/// - `PURGE_INTERVAL_SECS`: retention purge
///
/// Unparseable values fall back to their defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,

    pub gateway_kind: GatewayKind,
    pub gateway_url: String,
    pub gateway_success_url: String,
    pub gateway_cancel_url: String,
    pub gateway_timeout: Duration,
    pub webhook_secret: Option<String>,

    pub price_per_slot: i64,
    pub currency: String,

    pub cache_kind: CacheKind,
    pub cache_url: String,
    pub cache_write_timeout: Duration,
    pub slot_source_url: Option<String>,

    pub sweep_interval: Duration,
    pub sweep_window_days: u32,
    pub slot_duration_minutes: u32,
    pub slot_generation_days: u32,
    pub purge_interval: Duration,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |name: &str, default: String| lookup(name).unwrap_or(default);
        let optional = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let parsed = |name: &str| lookup(name).and_then(|v| v.trim().parse::<u64>().ok());

        Self {
            host: text("HOST", defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: text("RUST_LOG", defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.log_format),
            database_url: optional("DATABASE_URL"),

            gateway_kind: lookup("GATEWAY_KIND")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.gateway_kind),
            gateway_url: text("GATEWAY_URL", defaults.gateway_url),
            gateway_success_url: text("GATEWAY_SUCCESS_URL", defaults.gateway_success_url),
            gateway_cancel_url: text("GATEWAY_CANCEL_URL", defaults.gateway_cancel_url),
            gateway_timeout: parsed("GATEWAY_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.gateway_timeout),
            webhook_secret: optional("WEBHOOK_SECRET"),

            price_per_slot: lookup("PRICE_PER_SLOT")
                .and_then(|v| v.trim().parse::<i64>().ok())
                .filter(|amount| *amount > 0)
                .unwrap_or(defaults.price_per_slot),
            currency: text("CURRENCY", defaults.currency),

            cache_kind: lookup("CACHE_KIND")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cache_kind),
            cache_url: text("CACHE_URL", defaults.cache_url),
            cache_write_timeout: parsed("CACHE_WRITE_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.cache_write_timeout),
            slot_source_url: optional("SLOT_SOURCE_URL"),

            sweep_interval: parsed("SWEEP_INTERVAL_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
            sweep_window_days: parsed("SWEEP_WINDOW_DAYS")
                .map(|v| u32::try_from(v).unwrap_or(u32::MAX).min(MAX_WINDOW_DAYS))
                .unwrap_or(defaults.sweep_window_days),
            slot_duration_minutes: parsed("SLOT_DURATION_MINUTES")
                .and_then(|v| u32::try_from(v).ok())
                .filter(|minutes| *minutes > 0)
                .unwrap_or(defaults.slot_duration_minutes),
            slot_generation_days: parsed("SLOT_GENERATION_DAYS")
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(defaults.slot_generation_days),
            purge_interval: parsed("PURGE_INTERVAL_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.purge_interval),
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
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            database_url: None,

            gateway_kind: GatewayKind::InMemory,
            gateway_url: String::new(),
            gateway_success_url: "http://localhost:3000/payment/success".to_string(),
            gateway_cancel_url: "http://localhost:3000/payment/cancel".to_string(),
            gateway_timeout: Duration::from_millis(10_000),
            webhook_secret: None,

            price_per_slot: 2000,
            currency: "usd".to_string(),

            cache_kind: CacheKind::InMemory,
            cache_url: String::new(),
            cache_write_timeout: Duration::from_millis(5_000),
            slot_source_url: None,

            sweep_interval: Duration::from_secs(900),
            sweep_window_days: 7,
            slot_duration_minutes: 60,
            slot_generation_days: 7,
            purge_interval: Duration::from_secs(86_400),
        }
    }
}
