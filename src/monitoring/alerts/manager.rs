//! Alert manager implementation

use super::channels::{NotificationChannel, build_channel};
use super::escalation::{EscalationKey, PendingEscalations};
use super::types::{
    AlertFilter, AlertRule, AlertSnapshot, AlertStatistics, AlertStorage, EscalationPolicy,
};
use crate::config::AlertingConfig;
use crate::monitoring::types::{Alert, AlertMetadata, AlertSeverity, AlertStatus};
use crate::utils::error::{ResilienceError, Result};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Creates and stores alerts, matches them to rules and drives escalation
#[derive(Debug, Clone)]
pub struct AlertManager {
    pub(super) storage: Arc<RwLock<AlertStorage>>,
    pub(super) rules: Arc<RwLock<BTreeMap<String, AlertRule>>>,
    pub(super) policies: Arc<RwLock<BTreeMap<String, EscalationPolicy>>>,
    pub(super) channels: Arc<RwLock<HashMap<String, Arc<dyn NotificationChannel>>>>,
    pub(super) pending: PendingEscalations,
    pub(super) history_capacity: usize,
    pub(super) notification_timeout: Duration,
}

impl AlertManager {
    /// Create a new alert manager
    pub fn new(config: &AlertingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.notification_timeout())
            .build()?;

        let mut channels: HashMap<String, Arc<dyn NotificationChannel>> = HashMap::new();
        for channel_config in &config.channels {
            let channel: Arc<dyn NotificationChannel> =
                Arc::from(build_channel(channel_config, client.clone()));
            info!(
                "Configured {} notification channel -> {}",
                channel.name(),
                channel_config.target()
            );
            channels.insert(channel.name().to_string(), channel);
        }

        let manager = Self {
            storage: Arc::new(RwLock::new(AlertStorage::default())),
            rules: Arc::new(RwLock::new(BTreeMap::new())),
            policies: Arc::new(RwLock::new(BTreeMap::new())),
            channels: Arc::new(RwLock::new(channels)),
            pending: Arc::new(Mutex::new(HashMap::new())),
            history_capacity: config.history_capacity,
            notification_timeout: config.notification_timeout(),
        };

        {
            let mut policies = manager.policies.write();
            for policy in &config.policies {
                policies.insert(policy.id.clone(), policy.clone());
            }
        }
        {
            let mut rules = manager.rules.write();
            for rule in &config.rules {
                rules.insert(rule.id.clone(), rule.clone());
            }
        }

        Ok(manager)
    }

    /// Register (or replace) a notification transport under its name
    pub fn register_channel(&self, channel: Arc<dyn NotificationChannel>) {
        debug!("Registering notification channel {}", channel.name());
        self.channels
            .write()
            .insert(channel.name().to_string(), channel);
    }

    pub fn channel_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.channels.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Create an active alert and schedule the escalation of every matching rule
    pub fn create_alert(
        &self,
        alert_type: impl Into<String>,
        severity: AlertSeverity,
        message: impl Into<String>,
        metadata: AlertMetadata,
    ) -> Alert {
        let alert = Alert::new(alert_type, severity, message, metadata);
        info!(
            "Alert {} created: [{}] {} - {}",
            alert.id, alert.severity, alert.alert_type, alert.message
        );

        self.storage
            .write()
            .insert(alert.clone(), self.history_capacity);

        let matching: Vec<AlertRule> = self
            .rules
            .read()
            .values()
            .filter(|rule| rule.matches(&alert))
            .cloned()
            .collect();

        if matching.is_empty() {
            debug!("No enabled rule matches alert type {}", alert.alert_type);
        }

        for rule in matching {
            let policy = self.policies.read().get(&rule.escalation_policy_id).cloned();
            match policy {
                Some(policy) => self.schedule_escalation(&alert, &rule, &policy),
                None => warn!(
                    "Rule {} references unknown escalation policy {}",
                    rule.id, rule.escalation_policy_id
                ),
            }
        }

        alert
    }

    /// Acknowledge an alert, halting its pending escalation steps
    pub fn acknowledge_alert(&self, id: &str, by: &str) -> Result<Alert> {
        let alert = {
            let mut storage = self.storage.write();
            let alert = storage
                .alerts
                .get_mut(id)
                .ok_or_else(|| ResilienceError::not_found(format!("alert {}", id)))?;

            match alert.status {
                AlertStatus::Resolved => {
                    return Err(ResilienceError::validation(format!(
                        "alert {} is already resolved",
                        id
                    )));
                }
                AlertStatus::Acknowledged => return Ok(alert.clone()),
                AlertStatus::Active => {
                    alert.status = AlertStatus::Acknowledged;
                    alert.acknowledged_by = Some(by.to_string());
                    alert.acknowledged_at = Some(Utc::now());
                    alert.clone()
                }
            }
        };

        let cancelled = self.cancel_escalations(id);
        info!(
            "Alert {} acknowledged by {} ({} pending steps cancelled)",
            id, by, cancelled
        );
        Ok(alert)
    }

    /// Resolve an alert and remove it from the active index
    pub fn resolve_alert(&self, id: &str, by: &str) -> Result<Alert> {
        let alert = {
            let mut storage = self.storage.write();
            let alert = storage
                .alerts
                .get_mut(id)
                .ok_or_else(|| ResilienceError::not_found(format!("alert {}", id)))?;

            if alert.status == AlertStatus::Resolved {
                return Ok(alert.clone());
            }

            alert.status = AlertStatus::Resolved;
            alert.resolved_by = Some(by.to_string());
            alert.resolved_at = Some(Utc::now());
            let resolved = alert.clone();

            storage.active.remove(id);
            // Kept only because it was active after leaving history
            if !storage.history.iter().any(|entry| entry == id) {
                storage.alerts.remove(id);
            }
            resolved
        };

        self.cancel_escalations(id);
        info!("Alert {} resolved by {}", id, by);
        Ok(alert)
    }

    pub fn get_alert(&self, id: &str) -> Result<Alert> {
        self.storage
            .read()
            .alerts
            .get(id)
            .cloned()
            .ok_or_else(|| ResilienceError::not_found(format!("alert {}", id)))
    }

    /// Unresolved alerts, newest first
    pub fn get_active_alerts(&self) -> Vec<Alert> {
        let storage = self.storage.read();
        let mut alerts: Vec<Alert> = storage
            .active
            .iter()
            .filter_map(|id| storage.alerts.get(id))
            .cloned()
            .collect();
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        alerts
    }

    /// Alert history, newest first
    pub fn get_alert_history(&self, filter: &AlertFilter) -> Vec<Alert> {
        let storage = self.storage.read();
        storage
            .newest_first()
            .filter(|alert| filter.matches(alert))
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    /// Counts by status, by severity over trailing windows, and deliveries
    pub fn get_alert_statistics(&self) -> AlertStatistics {
        let now = Utc::now();
        let day_ago = now - chrono::Duration::hours(24);
        let week_ago = now - chrono::Duration::days(7);

        let storage = self.storage.read();
        let mut stats = AlertStatistics::default();

        for alert in storage.alerts.values() {
            stats.total += 1;
            match alert.status {
                AlertStatus::Active => stats.active += 1,
                AlertStatus::Acknowledged => stats.acknowledged += 1,
                AlertStatus::Resolved => stats.resolved += 1,
            }
            if alert.created_at >= day_ago {
                stats.last_24h.add(alert.severity);
            }
            if alert.created_at >= week_ago {
                stats.last_7d.add(alert.severity);
            }
            for record in &alert.notification_log {
                if record.success {
                    stats.notifications_sent += 1;
                } else {
                    stats.notifications_failed += 1;
                }
            }
        }

        stats
    }

    // ==================== Rules ====================

    pub fn list_rules(&self) -> Vec<AlertRule> {
        self.rules.read().values().cloned().collect()
    }

    pub fn get_rule(&self, id: &str) -> Result<AlertRule> {
        self.rules
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| ResilienceError::not_found(format!("alert rule {}", id)))
    }

    pub fn create_rule(&self, mut rule: AlertRule) -> Result<AlertRule> {
        if rule.id.is_empty() {
            rule.id = uuid::Uuid::new_v4().to_string();
        }
        if rule.name.is_empty() {
            rule.name = rule.id.clone();
        }
        self.check_rule(&rule)?;

        let mut rules = self.rules.write();
        if rules.contains_key(&rule.id) {
            return Err(ResilienceError::validation(format!(
                "alert rule {} already exists",
                rule.id
            )));
        }
        rules.insert(rule.id.clone(), rule.clone());
        info!("Alert rule {} created for type {}", rule.id, rule.alert_type);
        Ok(rule)
    }

    pub fn update_rule(&self, id: &str, mut rule: AlertRule) -> Result<AlertRule> {
        rule.id = id.to_string();
        if rule.name.is_empty() {
            rule.name = rule.id.clone();
        }
        self.check_rule(&rule)?;

        let mut rules = self.rules.write();
        let existing = rules
            .get_mut(id)
            .ok_or_else(|| ResilienceError::not_found(format!("alert rule {}", id)))?;
        *existing = rule.clone();
        info!("Alert rule {} updated", id);
        Ok(rule)
    }

    pub fn delete_rule(&self, id: &str) -> Result<AlertRule> {
        let removed = self
            .rules
            .write()
            .remove(id)
            .ok_or_else(|| ResilienceError::not_found(format!("alert rule {}", id)))?;
        info!("Alert rule {} deleted", id);
        Ok(removed)
    }

    fn check_rule(&self, rule: &AlertRule) -> Result<()> {
        if rule.alert_type.is_empty() {
            return Err(ResilienceError::validation("alert rule type cannot be empty"));
        }
        if !self.policies.read().contains_key(&rule.escalation_policy_id) {
            return Err(ResilienceError::validation(format!(
                "unknown escalation policy {}",
                rule.escalation_policy_id
            )));
        }
        Ok(())
    }

    // ==================== Escalation policies ====================

    pub fn list_policies(&self) -> Vec<EscalationPolicy> {
        self.policies.read().values().cloned().collect()
    }

    pub fn get_policy(&self, id: &str) -> Result<EscalationPolicy> {
        self.policies
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| ResilienceError::not_found(format!("escalation policy {}", id)))
    }

    pub fn create_policy(&self, mut policy: EscalationPolicy) -> Result<EscalationPolicy> {
        if policy.id.is_empty() {
            policy.id = uuid::Uuid::new_v4().to_string();
        }
        check_policy(&policy)?;

        let mut policies = self.policies.write();
        if policies.contains_key(&policy.id) {
            return Err(ResilienceError::validation(format!(
                "escalation policy {} already exists",
                policy.id
            )));
        }
        policies.insert(policy.id.clone(), policy.clone());
        info!(
            "Escalation policy {} created with {} steps",
            policy.id,
            policy.steps.len()
        );
        Ok(policy)
    }

    /// Replace a policy; alerts already escalating keep their schedule
    pub fn update_policy(&self, id: &str, mut policy: EscalationPolicy) -> Result<EscalationPolicy> {
        policy.id = id.to_string();
        check_policy(&policy)?;

        let mut policies = self.policies.write();
        let existing = policies
            .get_mut(id)
            .ok_or_else(|| ResilienceError::not_found(format!("escalation policy {}", id)))?;
        *existing = policy.clone();
        info!("Escalation policy {} updated", id);
        Ok(policy)
    }

    pub fn delete_policy(&self, id: &str) -> Result<EscalationPolicy> {
        let referenced_by: Vec<String> = self
            .rules
            .read()
            .values()
            .filter(|rule| rule.escalation_policy_id == id)
            .map(|rule| rule.id.clone())
            .collect();
        if !referenced_by.is_empty() {
            return Err(ResilienceError::validation(format!(
                "escalation policy {} is used by rules: {}",
                id,
                referenced_by.join(", ")
            )));
        }

        let removed = self
            .policies
            .write()
            .remove(id)
            .ok_or_else(|| ResilienceError::not_found(format!("escalation policy {}", id)))?;
        info!("Escalation policy {} deleted", id);
        Ok(removed)
    }

    // ==================== Snapshots ====================

    /// Copy of alerts, rules and policies
    pub fn export_snapshot(&self) -> AlertSnapshot {
        let alerts = {
            let storage = self.storage.read();
            let mut orphans: Vec<Alert> = storage
                .active
                .iter()
                .filter(|id| !storage.history.contains(*id))
                .filter_map(|id| storage.alerts.get(id))
                .cloned()
                .collect();
            orphans.sort_by(|a, b| a.created_at.cmp(&b.created_at));

            orphans
                .into_iter()
                .chain(
                    storage
                        .history
                        .iter()
                        .filter_map(|id| storage.alerts.get(id))
                        .cloned(),
                )
                .collect()
        };

        AlertSnapshot {
            taken_at: Utc::now(),
            alerts,
            rules: self.list_rules(),
            policies: self.list_policies(),
        }
    }

    /// Replace all state with `snapshot`
    ///
    /// Pending escalations are cancelled and restored alerts are not re-escalated.
    pub fn restore_snapshot(&self, snapshot: AlertSnapshot) {
        self.shutdown();

        {
            let mut storage = self.storage.write();
            *storage = AlertStorage::default();
            // Capacity is never smaller than the snapshot
            let capacity = self.history_capacity.max(snapshot.alerts.len());
            for alert in snapshot.alerts {
                storage.insert(alert, capacity);
            }
        }

        *self.rules.write() = snapshot
            .rules
            .into_iter()
            .map(|rule| (rule.id.clone(), rule))
            .collect();
        *self.policies.write() = snapshot
            .policies
            .into_iter()
            .map(|policy| (policy.id.clone(), policy))
            .collect();

        info!("Alert state restored from snapshot");
    }

    /// Abort every pending escalation step
    pub fn shutdown(&self) {
        let handles: Vec<_> = {
            let mut pending = self.pending.lock();
            pending.drain().collect()
        };
        if !handles.is_empty() {
            info!("Cancelling {} pending escalation steps", handles.len());
        }
        for (_, handle) in handles {
            handle.abort();
        }
    }

    /// Escalation steps scheduled but not yet fired
    pub fn pending_escalations(&self) -> usize {
        self.pending
            .lock()
            .values()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    pub(super) fn cancel_escalations(&self, alert_id: &str) -> usize {
        let cancelled: Vec<(EscalationKey, _)> = {
            let mut pending = self.pending.lock();
            let keys: Vec<EscalationKey> = pending
                .keys()
                .filter(|key| key.alert_id == alert_id)
                .cloned()
                .collect();
            keys.into_iter()
                .filter_map(|key| pending.remove(&key).map(|handle| (key, handle)))
                .collect()
        };

        let mut count = 0;
        for (key, handle) in cancelled {
            if !handle.is_finished() {
                debug!(
                    "Cancelling step {} of rule {} for alert {}",
                    key.step, key.rule_id, key.alert_id
                );
                count += 1;
            }
            handle.abort();
        }
        count
    }
}

fn check_policy(policy: &EscalationPolicy) -> Result<()> {
    if policy.steps.is_empty() {
        return Err(ResilienceError::validation(format!(
            "escalation policy {} has no steps",
            policy.id
        )));
    }
    Ok(())
}
