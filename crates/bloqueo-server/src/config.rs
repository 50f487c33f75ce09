//! Server configuration, loaded from environment variables at startup.

use std::time::Duration;

/// Which BlobStore adapter backs the task container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Local,
    Memory,
}

impl StorageKind {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" => Some(Self::Local),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// Runtime configuration for bloqueo-server.
///
/// Every field has a default so the server starts without any environment
/// variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:7071"`).
    pub bind_address: String,

    /// Blob adapter (default: local directory).
    pub storage: StorageKind,

    /// Directory acting as the blob container when `storage` is local.
    pub container_dir: String,

    /// Firewall address echoed as `host` by the pending-tasks endpoint.
    pub firewall_host: Option<String>,

    /// Firewall token echoed as `token` by the pending-tasks endpoint.
    pub firewall_token: Option<String>,

    /// Cache sweep period; `None` disables the sweep loop.
    pub sweep_interval: Option<Duration>,

    /// Age after which a held lock is considered abandoned.
    pub lock_lease: Option<chrono::Duration>,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let storage = env_or("BLOQUEO_STORAGE", "local");
        let sweep_secs: u64 = parse_env("BLOQUEO_SWEEP_INTERVAL_SECS", 300);
        let lease_secs: Option<i64> = std::env::var("BLOQUEO_LOCK_LEASE_SECS")
            .ok()
            .and_then(|v| v.parse().ok());

        Self {
            bind_address: env_or("BLOQUEO_BIND", "0.0.0.0:7071"),
            storage: StorageKind::parse(&storage).unwrap_or_else(|| {
                eprintln!("WARN: BLOQUEO_STORAGE='{storage}' is not 'local' or 'memory'; using 'local'");
                StorageKind::Local
            }),
            container_dir: env_or("BLOQUEO_CONTAINER_DIR", "./data/tasks"),
            firewall_host: std::env::var("IP_DEL_FIREWALL").ok(),
            firewall_token: std::env::var("TOKEN_DE_AUTENTICACION").ok(),
            sweep_interval: (sweep_secs > 0).then(|| Duration::from_secs(sweep_secs)),
            lock_lease: lease_secs.map(chrono::Duration::seconds),
            log_level: env_or("BLOQUEO_LOG", "info"),
            log_json: std::env::var("BLOQUEO_LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:7071".to_owned(),
            storage: StorageKind::Local,
            container_dir: "./data/tasks".to_owned(),
            firewall_host: None,
            firewall_token: None,
            sweep_interval: Some(Duration::from_secs(300)),
            lock_lease: None,
            log_level: "info".to_owned(),
            log_json: false,
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
