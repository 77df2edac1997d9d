//! Configuration management for the resilience monitor
//!
//! This module handles loading, environment overrides and validation of the
//! YAML configuration file.

pub mod models;
pub mod validation;

pub use models::*;
pub use validation::Validate;

use crate::utils::error::{ResilienceError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Main configuration struct
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub resilience: ResilienceConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub synthetic: SyntheticConfig,
    #[serde(default)]
    pub alerting: AlertingConfig,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
}

impl Config {
    /// Load configuration from file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {:?}", path);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ResilienceError::Config(format!("Failed to read config file: {}", e)))?;

        let config = Self::from_yaml_str(&content)?;

        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| ResilienceError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, keyed by environment variable name
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("RESILIENCE_HOST") {
            self.server.host = host;
        }

        if let Some(port) = lookup("RESILIENCE_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ResilienceError::Config(format!("Invalid RESILIENCE_PORT '{}'", port)))?;
        }

        if let Some(base_url) = lookup("SYNTHETIC_BASE_URL") {
            self.synthetic.base_url = base_url;
        }

        if let Some(json) = lookup("LOG_JSON") {
            self.logging.json = matches!(json.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }

        Ok(())
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        debug!("Validating configuration");

        self.server
            .validate()
            .map_err(|e| ResilienceError::Config(format!("Server config error: {}", e)))?;

        self.logging
            .validate()
            .map_err(|e| ResilienceError::Config(format!("Logging config error: {}", e)))?;

        self.resilience
            .validate()
            .map_err(|e| ResilienceError::Config(format!("Resilience config error: {}", e)))?;

        self.health
            .validate()
            .map_err(|e| ResilienceError::Config(format!("Health config error: {}", e)))?;

        self.synthetic
            .validate()
            .map_err(|e| ResilienceError::Config(format!("Synthetic config error: {}", e)))?;

        self.alerting
            .validate()
            .map_err(|e| ResilienceError::Config(format!("Alerting config error: {}", e)))?;

        self.thresholds
            .validate()
            .map_err(|e| ResilienceError::Config(format!("Threshold config error: {}", e)))?;

        // Scheduler operations address probes and synthetic types by name
        if let Some(probe) = self
            .health
            .probes
            .iter()
            .find(|probe| self.synthetic.schedules.contains_key(&probe.name))
        {
            return Err(ResilienceError::Config(format!(
                "Probe '{}' has the same name as a synthetic schedule",
                probe.name
            )));
        }

        debug!("Configuration validation completed");
        Ok(())
    }

    /// Convert to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| ResilienceError::Config(format!("Failed to serialize config to YAML: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_config_from_file() {
        let config_content = r#"
server:
  host: "127.0.0.1"
  port: 9200

resilience:
  breakers:
    database:
      failure_threshold: 2
      reset_timeout_ms: 1000
      call_timeout_ms: 250

synthetic:
  base_url: "https://staging.caregrid.local"
  schedules:
    health:
      interval_ms: 15000
      enabled: true

thresholds:
  limits:
    response_time_ms: 2500
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(config_content.as_bytes()).unwrap();

        let config = Config::from_file(temp_file.path()).await.unwrap();

        assert_eq!(config.server.address(), "127.0.0.1:9200");
        assert_eq!(config.resilience.breakers.len(), 1);
        assert_eq!(config.resilience.breakers["database"].call_timeout_ms, Some(250));
        assert_eq!(config.synthetic.schedules.len(), 1);
        assert_eq!(config.thresholds.limits.response_time_ms, 2500);
        // Untouched limits keep their defaults
        assert_eq!(config.thresholds.limits.memory_usage_percent, 90.0);
        assert_eq!(config.alerting.history_capacity, 1000);
    }

    #[tokio::test]
    async fn test_missing_file_is_config_error() {
        let result = Config::from_file("/nonexistent/resilience.yaml").await;
        assert!(matches!(result, Err(ResilienceError::Config(_))));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = Config::from_yaml_str("server:\n  port: 0\n");
        match result {
            Err(ResilienceError::Config(message)) => assert!(message.contains("Server")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_probe_and_schedule_names_must_differ() {
        let yaml = r#"
health:
  probes:
    - name: login
      kind: liveness
"#;
        let result = Config::from_yaml_str(yaml);
        match result {
            Err(ResilienceError::Config(message)) => assert!(message.contains("login")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.resilience.breakers.len(), 4);
        assert_eq!(config.resilience.breakers["payment"].reset_timeout_ms, 120_000);
        assert_eq!(config.health.probes.len(), 4);
        assert!(!config.synthetic.schedules["booking"].enabled);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("RESILIENCE_PORT", "9300"),
            ("SYNTHETIC_BASE_URL", "https://api.caregrid.local"),
            ("LOG_JSON", "true"),
        ]);

        let mut config = Config::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.server.port, 9300);
        assert_eq!(config.synthetic.base_url, "https://api.caregrid.local");
        assert!(config.logging.json);

        let bad: HashMap<&str, &str> = HashMap::from([("RESILIENCE_PORT", "not-a-port")]);
        let result = config.apply_overrides(|key| bad.get(key).map(|v| v.to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_config_yaml_round_trip() {
        let config = Config::default();
        let yaml = config.to_yaml().unwrap();
        let parsed = Config::from_yaml_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }
}
