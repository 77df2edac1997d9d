//! Alert engine
//!
//! Alerts are matched against rules; each matching rule schedules the steps of
//! its escalation policy, which deliver through the configured notification
//! channels until the alert is acknowledged or resolved.

mod channels;
mod escalation;
mod manager;
#[cfg(test)]
mod tests;
mod types;

pub use channels::{
    EmailChannel, NotificationChannel, SlackChannel, SmsChannel, WebhookChannel, build_channel,
    render_subject,
};
pub use manager::AlertManager;
pub use types::{
    AlertFilter, AlertRule, AlertSnapshot, AlertStatistics, Comparator, EscalationPolicy,
    EscalationStep, RuleCondition, SeverityCounts, default_policies, default_rules,
};
