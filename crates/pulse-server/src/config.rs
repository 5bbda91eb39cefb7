use pulse_common::env::{self, EnvError};
use pulse_storage::PoolOptions;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_address")]
    pub address: String,

    /// Snapshot period in seconds. `0` writes a snapshot after every
    /// accepted update instead of running the periodic task.
    #[serde(default = "default_store_interval_secs")]
    pub store_interval_secs: u64,

    #[serde(default = "default_store_file")]
    pub store_file: String,

    #[serde(default = "default_restore")]
    pub restore: bool,

    /// Shared HMAC key. Empty disables integrity checks.
    #[serde(default)]
    pub key: String,

    /// Database URL. Empty selects the in-memory store with a file snapshot.
    #[serde(default)]
    pub database_dsn: String,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,
}

fn default_address() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_store_interval_secs() -> u64 {
    300
}

fn default_store_file() -> String {
    "/tmp/devops-metrics-db.json".to_string()
}

fn default_restore() -> bool {
    true
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_acquire_timeout_secs() -> u64 {
    5
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            store_interval_secs: default_store_interval_secs(),
            store_file: default_store_file(),
            restore: default_restore(),
            key: String::new(),
            database_dsn: String::new(),
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
        }
    }
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Applies `ADDRESS`, `STORE_INTERVAL`, `STORE_FILE`, `RESTORE`, `KEY`,
    /// `DATABASE_DSN`, `DB_MAX_CONNECTIONS` and `DB_ACQUIRE_TIMEOUT`.
    pub fn apply_env(&mut self) -> Result<(), EnvError> {
        env::override_string("ADDRESS", &mut self.address)?;
        env::override_secs("STORE_INTERVAL", &mut self.store_interval_secs)?;
        env::override_string("STORE_FILE", &mut self.store_file)?;
        env::override_bool("RESTORE", &mut self.restore)?;
        env::override_string("KEY", &mut self.key)?;
        env::override_string("DATABASE_DSN", &mut self.database_dsn)?;
        env::override_u32("DB_MAX_CONNECTIONS", &mut self.db_max_connections)?;
        env::override_secs("DB_ACQUIRE_TIMEOUT", &mut self.db_acquire_timeout_secs)?;
        Ok(())
    }

    pub fn uses_database(&self) -> bool {
        !self.database_dsn.trim().is_empty()
    }

    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            max_connections: self.db_max_connections,
            acquire_timeout: Duration::from_secs(self.db_acquire_timeout_secs),
        }
    }
}
