//! API configuration

use domain_arrears::ArrearsConfig;
use serde::Deserialize;

/// API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Database URL
    pub database_url: String,
    /// Log level
    pub log_level: String,
    /// `pretty` or `json`
    pub log_format: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            database_url: "postgres://localhost/stall_arrears".to_string(),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

impl ApiConfig {
    /// Loads configuration from `API_*` environment variables
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("API"))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

/// Loads the engine settings from `ARREARS_*` environment variables
///
/// `ARREARS_PENALTY_RATE`, `ARREARS_DUE_INTERVAL_DAYS`,
/// `ARREARS_ACCRUAL_STRATEGY`, `ARREARS_GRACE_DAYS` and `ARREARS_TIMEZONE`
/// are recognised; missing keys keep their defaults. The result is
/// validated before it is returned.
pub fn load_arrears_config() -> anyhow::Result<ArrearsConfig> {
    let config: ArrearsConfig = config::Config::builder()
        .add_source(config::Environment::with_prefix("ARREARS"))
        .build()?
        .try_deserialize()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_addr() {
        let config = ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 9000,
            ..ApiConfig::default()
        };
        assert_eq!(config.server_addr(), "127.0.0.1:9000");
    }

    #[test]
    fn test_json_logs_is_case_insensitive() {
        let config = ApiConfig {
            log_format: "JSON".to_string(),
            ..ApiConfig::default()
        };
        assert!(config.json_logs());
        assert!(!ApiConfig::default().json_logs());
    }
}
