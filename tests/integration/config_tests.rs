//! Configuration loading integration tests

#[cfg(test)]
mod tests {
    use caregrid_resilience::Config;
    use caregrid_resilience::config::{ChannelConfig, ProbeKind};
    use std::collections::HashMap;
    use std::io::Write;

    fn sample_path() -> std::path::PathBuf {
        std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("config/resilience.yaml.example")
    }

    /// The shipped sample must stay loadable
    #[tokio::test]
    async fn test_sample_config_loads() {
        let config = Config::from_file(sample_path()).await.unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.resilience.breakers.len(), 4);
        assert_eq!(
            config.resilience.breakers["external_api"].call_timeout_ms,
            Some(10_000)
        );
        assert_eq!(config.health.probes.len(), 4);
        assert_eq!(config.health.probes[2].kind, ProbeKind::DataStore);
        assert!(config.synthetic.scripts.contains_key("availability"));
        assert_eq!(config.alerting.channels.len(), 4);
        assert!(matches!(
            config.alerting.channels[3],
            ChannelConfig::Slack { .. }
        ));
        // Omitted rules and policies fall back to the built-in set
        assert!(!config.alerting.rules.is_empty());
        assert_eq!(
            config.thresholds.suppression.windows_ms["high_memory_usage"],
            900_000
        );
    }

    #[tokio::test]
    async fn test_config_from_temp_file_and_missing_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server:\n  port: 8088\nlogging:\n  json: true").unwrap();

        let config = Config::from_file(file.path()).await.unwrap();
        assert_eq!(config.server.port, 8088);
        assert!(config.logging.json);
        assert_eq!(config.synthetic.schedules.len(), 6);

        let missing = Config::from_file("/nonexistent/resilience.yaml").await;
        assert!(missing.is_err());
    }

    #[test]
    fn test_schedule_without_script_is_rejected() {
        let yaml = r#"
synthetic:
  schedules:
    checkout: { interval_ms: 60000, enabled: true }
"#;
        let err = Config::from_yaml_str(yaml).unwrap_err();
        assert!(err.to_string().contains("checkout"));
    }

    #[test]
    fn test_environment_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("RESILIENCE_PORT", "7070"),
            ("SYNTHETIC_BASE_URL", "http://booking.internal:3000"),
            ("LOG_JSON", "yes"),
        ]);

        let mut config = Config::default();
        config
            .apply_overrides(|key| env.get(key).map(|value| value.to_string()))
            .unwrap();
        assert_eq!(config.server.port, 7070);
        assert_eq!(config.synthetic.base_url, "http://booking.internal:3000");
        assert!(config.logging.json);

        let mut config = Config::default();
        let bad = config.apply_overrides(|key| (key == "RESILIENCE_PORT").then(|| "http".to_string()));
        assert!(bad.is_err());
    }

    #[test]
    fn test_yaml_export_reloads() {
        let config = Config::default();
        let reloaded = Config::from_yaml_str(&config.to_yaml().unwrap()).unwrap();
        assert_eq!(reloaded, config);
    }
}
