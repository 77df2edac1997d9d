//! Validators for every configuration section

use super::trait_def::Validate;
use crate::config::models::*;
use crate::monitoring::synthetic::BUILTIN_TRANSACTION_TYPES;
use std::collections::HashSet;
use tracing::debug;

impl Validate for ServerConfig {
    fn validate(&self) -> Result<(), String> {
        if self.host.is_empty() {
            return Err("Server host cannot be empty".to_string());
        }

        if self.port == 0 {
            return Err("Server port must be greater than 0".to_string());
        }

        if self.workers == Some(0) {
            return Err("Worker count must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl Validate for LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        if self.level.trim().is_empty() {
            return Err("Log level cannot be empty".to_string());
        }
        Ok(())
    }
}

impl Validate for ResilienceConfig {
    fn validate(&self) -> Result<(), String> {
        debug!("Validating {} circuit breakers", self.breakers.len());

        for (name, breaker) in &self.breakers {
            if name.is_empty() {
                return Err("Circuit breaker name cannot be empty".to_string());
            }
            if breaker.failure_threshold == 0 {
                return Err(format!(
                    "Circuit breaker '{}' failure threshold must be greater than 0",
                    name
                ));
            }
            if breaker.reset_timeout_ms == 0 {
                return Err(format!(
                    "Circuit breaker '{}' reset timeout must be greater than 0",
                    name
                ));
            }
            if breaker.call_timeout_ms == Some(0) {
                return Err(format!(
                    "Circuit breaker '{}' call timeout must be greater than 0",
                    name
                ));
            }
        }

        Ok(())
    }
}

impl Validate for ProbeConfig {
    fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("Probe name cannot be empty".to_string());
        }
        if self.interval_ms == 0 {
            return Err(format!("Probe '{}' interval must be greater than 0", self.name));
        }
        if self.timeout_ms == 0 {
            return Err(format!("Probe '{}' timeout must be greater than 0", self.name));
        }
        if self.failure_threshold == 0 {
            return Err(format!(
                "Probe '{}' failure threshold must be greater than 0",
                self.name
            ));
        }

        let needs_target = matches!(self.kind, ProbeKind::Dependency | ProbeKind::DataStore);
        if needs_target && self.dependency.is_none() && self.url.is_none() {
            return Err(format!(
                "Probe '{}' must name a dependency or a url",
                self.name
            ));
        }

        if let Some(url) = &self.url {
            validate_http_url(url).map_err(|e| format!("Probe '{}': {}", self.name, e))?;
        }

        Ok(())
    }
}

impl Validate for HealthConfig {
    fn validate(&self) -> Result<(), String> {
        let mut names = HashSet::new();
        for probe in &self.probes {
            probe.validate()?;
            if !names.insert(probe.name.as_str()) {
                return Err(format!("Duplicate probe name '{}'", probe.name));
            }
        }
        Ok(())
    }
}

impl Validate for SyntheticConfig {
    fn validate(&self) -> Result<(), String> {
        validate_http_url(&self.base_url).map_err(|e| format!("Synthetic base URL: {}", e))?;

        if self.history_capacity == 0 {
            return Err("Synthetic history capacity must be greater than 0".to_string());
        }

        if self.step_timeout_ms == 0 {
            return Err("Synthetic step timeout must be greater than 0".to_string());
        }

        for (name, steps) in &self.scripts {
            if steps.is_empty() {
                return Err(format!("Synthetic script '{}' has no steps", name));
            }
        }

        for (name, schedule) in &self.schedules {
            if schedule.interval_ms == 0 {
                return Err(format!(
                    "Synthetic schedule '{}' interval must be greater than 0",
                    name
                ));
            }
            let known = BUILTIN_TRANSACTION_TYPES.contains(&name.as_str())
                || self.scripts.contains_key(name);
            if !known {
                return Err(format!(
                    "Synthetic schedule '{}' has no matching script",
                    name
                ));
            }
        }

        Ok(())
    }
}

impl Validate for ChannelConfig {
    fn validate(&self) -> Result<(), String> {
        validate_http_url(self.target()).map_err(|e| format!("{} channel: {}", self.name(), e))
    }
}

impl Validate for AlertingConfig {
    fn validate(&self) -> Result<(), String> {
        if self.history_capacity == 0 {
            return Err("Alert history capacity must be greater than 0".to_string());
        }

        if self.notification_timeout_ms == 0 {
            return Err("Notification timeout must be greater than 0".to_string());
        }

        let mut channels = HashSet::new();
        for channel in &self.channels {
            channel.validate()?;
            if !channels.insert(channel.name()) {
                return Err(format!("Duplicate {} channel", channel.name()));
            }
        }

        let mut policies = HashSet::new();
        for policy in &self.policies {
            if policy.id.is_empty() {
                return Err("Escalation policy id cannot be empty".to_string());
            }
            if policy.steps.is_empty() {
                return Err(format!("Escalation policy '{}' has no steps", policy.id));
            }
            if !policies.insert(policy.id.as_str()) {
                return Err(format!("Duplicate escalation policy '{}'", policy.id));
            }
        }

        for rule in &self.rules {
            if rule.alert_type.is_empty() {
                return Err(format!("Alert rule '{}' has no type", rule.id));
            }
            if !policies.contains(rule.escalation_policy_id.as_str()) {
                return Err(format!(
                    "Alert rule '{}' references unknown escalation policy '{}'",
                    rule.id, rule.escalation_policy_id
                ));
            }
        }

        Ok(())
    }
}

impl Validate for Thresholds {
    fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("synthetic_success_rate_min", self.synthetic_success_rate_min),
            ("error_rate_percent", self.error_rate_percent),
            ("memory_usage_percent", self.memory_usage_percent),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(format!("{} must be between 0 and 100", name));
            }
        }

        if self.synthetic_consecutive_failures == 0 {
            return Err("synthetic_consecutive_failures must be greater than 0".to_string());
        }

        if self.response_time_ms == 0 {
            return Err("response_time_ms must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl Validate for ThresholdConfig {
    fn validate(&self) -> Result<(), String> {
        self.limits.validate()?;

        if self.evaluation_interval_ms == 0 {
            return Err("Threshold evaluation interval must be greater than 0".to_string());
        }

        Ok(())
    }
}

fn validate_http_url(url: &str) -> Result<(), String> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(format!("'{}' must start with http:// or https://", url))
    }
}
