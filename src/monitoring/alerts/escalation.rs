//! Delayed escalation steps
//!
//! Every step of a triggered policy becomes its own task, keyed by alert, rule
//! and step index. Acknowledging or resolving the alert aborts the tasks that
//! have not fired. A task that fires leaves the pending table first, so its
//! deliveries run to completion and are logged; it re-checks the alert status
//! before sending.

use super::manager::AlertManager;
use super::types::{AlertRule, AlertStorage, EscalationPolicy, EscalationStep};
use super::channels::NotificationChannel;
use crate::monitoring::types::{Alert, NotificationRecord};
use chrono::Utc;
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Identity of one scheduled step
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(super) struct EscalationKey {
    pub alert_id: String,
    pub rule_id: String,
    pub step: usize,
}

pub(super) type PendingEscalations = Arc<Mutex<HashMap<EscalationKey, JoinHandle<()>>>>;

/// What a step task needs from the manager
struct StepContext {
    key: EscalationKey,
    pending: PendingEscalations,
    storage: Arc<RwLock<AlertStorage>>,
    channels: Arc<RwLock<HashMap<String, Arc<dyn NotificationChannel>>>>,
    notification_timeout: Duration,
}

impl AlertManager {
    /// Schedule every step of `policy` relative to now
    pub(super) fn schedule_escalation(
        &self,
        alert: &Alert,
        rule: &AlertRule,
        policy: &EscalationPolicy,
    ) {
        let created = Instant::now();
        debug!(
            "Scheduling {} escalation steps of policy {} for alert {}",
            policy.steps.len(),
            policy.id,
            alert.id
        );

        let mut pending = self.pending.lock();
        pending.retain(|_, handle| !handle.is_finished());

        for (index, step) in policy.steps.iter().enumerate() {
            let key = EscalationKey {
                alert_id: alert.id.clone(),
                rule_id: rule.id.clone(),
                step: index,
            };
            let context = StepContext {
                key: key.clone(),
                pending: self.pending.clone(),
                storage: self.storage.clone(),
                channels: self.channels.clone(),
                notification_timeout: self.notification_timeout,
            };
            let alert_id = alert.id.clone();
            let fallback_channels = rule.channels.clone();
            let step = step.clone();
            let fire_at = created + step.delay();

            let handle = tokio::spawn(async move {
                tokio::time::sleep_until(fire_at).await;
                fire_step(context, &alert_id, index, &step, &fallback_channels).await;
            });
            pending.insert(key, handle);
        }
    }
}

async fn fire_step(
    context: StepContext,
    alert_id: &str,
    index: usize,
    step: &EscalationStep,
    fallback_channels: &[String],
) {
    // Fired: cancellation no longer applies to this step
    context.pending.lock().remove(&context.key);

    // Status is read at fire time, not at schedule time
    let alert = {
        let storage = context.storage.read();
        match storage.alerts.get(alert_id) {
            Some(alert) if alert.is_active() => alert.clone(),
            Some(alert) => {
                debug!(
                    "Skipping escalation step {} for alert {} ({})",
                    index, alert_id, alert.status
                );
                return;
            }
            None => return,
        }
    };

    let deliveries = step.deliveries(fallback_channels);
    if deliveries.is_empty() {
        warn!(
            "Escalation step {} for alert {} has no recipients",
            index, alert_id
        );
    }

    let sends = deliveries.into_iter().map(|(channel_name, recipient)| {
        let channel = context.channels.read().get(&channel_name).cloned();
        let alert = &alert;
        let timeout = context.notification_timeout;
        async move {
            let outcome = match channel {
                Some(channel) => {
                    match tokio::time::timeout(timeout, channel.send(alert, &recipient, index)).await
                    {
                        Ok(Ok(())) => Ok(()),
                        Ok(Err(e)) => Err(e.to_string()),
                        Err(_) => Err(format!(
                            "delivery timed out after {}ms",
                            timeout.as_millis()
                        )),
                    }
                }
                None => Err(format!("channel {} is not configured", channel_name)),
            };

            if let Err(error) = &outcome {
                warn!(
                    "Failed to notify {} via {} for alert {}: {}",
                    recipient, channel_name, alert.id, error
                );
            }

            NotificationRecord {
                channel: channel_name,
                recipient,
                step: index,
                success: outcome.is_ok(),
                error: outcome.err(),
                timestamp: Utc::now(),
            }
        }
    });
    let records = join_all(sends).await;

    let delivered = records.iter().filter(|record| record.success).count();
    let total = records.len();

    {
        let mut storage = context.storage.write();
        if let Some(stored) = storage.alerts.get_mut(alert_id) {
            stored.escalation_level = Some(stored.escalation_level.map_or(index, |level| level.max(index)));
            stored.notification_log.extend(records);
        }
    }

    info!(
        "Escalation step {} for alert {} delivered {}/{} notifications",
        index, alert_id, delivered, total
    );
}
