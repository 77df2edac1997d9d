//! Alerting configuration

use crate::monitoring::alerts::{AlertRule, EscalationPolicy, default_policies, default_rules};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Notification transport settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelConfig {
    /// HTTP email API
    Email {
        endpoint: String,
        #[serde(default)]
        api_key: Option<String>,
        from: String,
    },
    /// HTTP SMS gateway
    Sms {
        endpoint: String,
        #[serde(default)]
        api_key: Option<String>,
        from: String,
    },
    /// Generic JSON webhook
    Webhook {
        url: String,
        #[serde(default)]
        headers: BTreeMap<String, String>,
    },
    /// Slack incoming webhook
    Slack {
        webhook_url: String,
        #[serde(default)]
        channel: Option<String>,
        #[serde(default)]
        username: Option<String>,
    },
}

impl ChannelConfig {
    /// Channel name referenced by escalation steps
    pub fn name(&self) -> &'static str {
        match self {
            ChannelConfig::Email { .. } => "email",
            ChannelConfig::Sms { .. } => "sms",
            ChannelConfig::Webhook { .. } => "webhook",
            ChannelConfig::Slack { .. } => "slack",
        }
    }

    /// Transport URL
    pub fn target(&self) -> &str {
        match self {
            ChannelConfig::Email { endpoint, .. } | ChannelConfig::Sms { endpoint, .. } => endpoint,
            ChannelConfig::Webhook { url, .. } => url,
            ChannelConfig::Slack { webhook_url, .. } => webhook_url,
        }
    }
}

/// Alerting section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertingConfig {
    /// Alerts kept in history
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// Ceiling on a single delivery
    #[serde(default = "default_notification_timeout_ms")]
    pub notification_timeout_ms: u64,
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
    #[serde(default = "default_rules")]
    pub rules: Vec<AlertRule>,
    #[serde(default = "default_policies")]
    pub policies: Vec<EscalationPolicy>,
}

fn default_history_capacity() -> usize {
    1000
}

fn default_notification_timeout_ms() -> u64 {
    10_000
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            notification_timeout_ms: default_notification_timeout_ms(),
            channels: Vec::new(),
            rules: default_rules(),
            policies: default_policies(),
        }
    }
}

impl AlertingConfig {
    pub fn notification_timeout(&self) -> Duration {
        Duration::from_millis(self.notification_timeout_ms)
    }
}
