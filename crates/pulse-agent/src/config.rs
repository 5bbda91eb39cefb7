use pulse_common::env::{self, EnvError};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Server `host:port`, or a full base URL.
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_report_interval")]
    pub report_interval_secs: u64,
    /// Shared HMAC key. Empty sends unsigned metrics.
    #[serde(default)]
    pub key: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_address() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_poll_interval() -> u64 {
    2
}

fn default_report_interval() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    5
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            poll_interval_secs: default_poll_interval(),
            report_interval_secs: default_report_interval(),
            key: String::new(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl AgentConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn apply_env(&mut self) -> Result<(), EnvError> {
        env::override_string("ADDRESS", &mut self.address)?;
        env::override_secs("POLL_INTERVAL", &mut self.poll_interval_secs)?;
        env::override_secs("REPORT_INTERVAL", &mut self.report_interval_secs)?;
        env::override_string("KEY", &mut self.key)?;
        env::override_secs("REQUEST_TIMEOUT", &mut self.request_timeout_secs)?;
        Ok(())
    }

    /// Base URL of the server, `http://` unless a scheme is given.
    pub fn base_url(&self) -> String {
        let addr = self.address.trim().trim_end_matches('/');
        if addr.contains("://") {
            addr.to_string()
        } else {
            format!("http://{addr}")
        }
    }

    /// Tick intervals are clamped to at least one second.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_empty_file() {
        let config: AgentConfig = toml::from_str("").unwrap();
        assert_eq!(config.address, "127.0.0.1:8080");
        assert_eq!(config.poll_interval(), Duration::from_secs(2));
        assert_eq!(config.report_interval(), Duration::from_secs(10));
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert!(config.key.is_empty());
    }

    #[test]
    fn base_url_adds_scheme_only_when_missing() {
        let mut config = AgentConfig::default();
        assert_eq!(config.base_url(), "http://127.0.0.1:8080");
        config.address = "https://metrics.example.com/".to_string();
        assert_eq!(config.base_url(), "https://metrics.example.com");
    }

    #[test]
    fn zero_intervals_are_clamped() {
        let config = AgentConfig {
            poll_interval_secs: 0,
            ..AgentConfig::default()
        };
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
    }
}
