//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `TENANT_CONFIG_PATH`: JSON file with tenant registrar settings (default: `"tenants.json"`)
/// - `REGISTRAR_TIMEOUT_MS`: timeout for registrar and resolver calls (default: `2000`)
/// - `FANOUT_MAX_ATTEMPTS`: bus submissions per batch before dead-lettering (default: `3`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub tenant_config_path: PathBuf,
    pub registrar_timeout: Duration,
    pub fanout_max_attempts: u32,
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
            tenant_config_path: lookup("TENANT_CONFIG_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.tenant_config_path),
            registrar_timeout: lookup("REGISTRAR_TIMEOUT_MS")
                .and_then(|ms| ms.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.registrar_timeout),
            fanout_max_attempts: lookup("FANOUT_MAX_ATTEMPTS")
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.fanout_max_attempts),
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
            tenant_config_path: PathBuf::from("tenants.json"),
            registrar_timeout: Duration::from_millis(2000),
            fanout_max_attempts: fanout::DEFAULT_MAX_ATTEMPTS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.registrar_timeout, Duration::from_secs(2));
        assert_eq!(config.fanout_max_attempts, 3);
    }

    #[test]
    fn test_reads_overrides() {
        let env: HashMap<&str, &str> = [
            ("PORT", "8080"),
            ("TENANT_CONFIG_PATH", "/etc/doi/tenants.json"),
            ("REGISTRAR_TIMEOUT_MS", "500"),
            ("FANOUT_MAX_ATTEMPTS", "5"),
        ]
        .into_iter()
        .collect();
        let config = Config::from_lookup(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.port, 8080);
        assert_eq!(
            config.tenant_config_path,
            PathBuf::from("/etc/doi/tenants.json")
        );
        assert_eq!(config.registrar_timeout, Duration::from_millis(500));
        assert_eq!(config.fanout_max_attempts, 5);
        assert_eq!(config.host, "0.0.0.0");
    }

    #[test]
    fn test_unparseable_values_fall_back() {
        let config = Config::from_lookup(|key| match key {
            "PORT" => Some("http".to_string()),
            "REGISTRAR_TIMEOUT_MS" => Some("-1".to_string()),
            _ => None,
        });
        assert_eq!(config.port, 3000);
        assert_eq!(config.registrar_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }
}
