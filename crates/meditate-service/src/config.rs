//! Service configuration.

use std::str::FromStr;

use crate::retry::DEFAULT_MAX_ATTEMPTS;

/// Where profiles are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// In-process map; contents are lost on restart.
    Memory,

    /// PostgreSQL via `sqlx`.
    Postgres {
        /// Connection string.
        database_url: String,
        /// Pool size.
        max_connections: u32,
    },

    /// `RocksDB` (requires the `rocksdb-backend` feature).
    RocksDb {
        /// Path to the data directory.
        data_dir: String,
    },
}

impl StorageBackend {
    /// Short name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Postgres { .. } => "postgres",
            Self::RocksDb { .. } => "rocksdb",
        }
    }
}

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Storage backend (default: memory).
    pub storage: StorageBackend,

    /// Key required by admin endpoints. Admin endpoints are closed when unset.
    pub admin_api_key: Option<String>,

    /// Balance given to newly created profiles (default: 0).
    pub default_credits: i64,

    /// Attempts for a store write that keeps conflicting (default: 3).
    pub max_write_attempts: u32,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            listen_addr: lookup("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            storage: storage_from_lookup(&lookup),
            admin_api_key: lookup("ADMIN_API_KEY").filter(|k| !k.is_empty()),
            default_credits: parsed(&lookup, "DEFAULT_CREDITS")
                .filter(|c: &i64| *c >= 0)
                .unwrap_or(defaults.default_credits),
            max_write_attempts: parsed(&lookup, "MAX_WRITE_ATTEMPTS")
                .unwrap_or(defaults.max_write_attempts),
            cors_origins: lookup("CORS_ORIGINS").map_or(defaults.cors_origins, |s| {
                s.split(',').map(|o| o.trim().to_string()).collect()
            }),
            max_body_bytes: parsed(&lookup, "MAX_BODY_BYTES").unwrap_or(defaults.max_body_bytes),
            request_timeout_seconds: parsed(&lookup, "REQUEST_TIMEOUT_SECONDS")
                .unwrap_or(defaults.request_timeout_seconds),
        }
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|s| s.trim().parse().ok())
}

fn storage_from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> StorageBackend {
    let backend = lookup("STORAGE_BACKEND").unwrap_or_else(|| "memory".into());
    match backend.trim().to_ascii_lowercase().as_str() {
        "memory" => StorageBackend::Memory,
        "postgres" | "postgresql" => StorageBackend::Postgres {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "postgres://localhost/meditate".into()),
            max_connections: parsed(lookup, "DATABASE_MAX_CONNECTIONS").unwrap_or(10),
        },
        "rocksdb" | "rocks" => StorageBackend::RocksDb {
            data_dir: lookup("DATA_DIR").unwrap_or_else(|| "/data/meditate".into()),
        },
        other => {
            tracing::warn!(backend = %other, "Unknown STORAGE_BACKEND, using memory");
            StorageBackend::Memory
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            storage: StorageBackend::Memory,
            admin_api_key: None,
            default_credits: 0,
            max_write_attempts: DEFAULT_MAX_ATTEMPTS,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
        }
    }
}
