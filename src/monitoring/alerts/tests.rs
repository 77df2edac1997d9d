//! Alert engine tests

use super::*;
use crate::alert_metadata;
use crate::config::AlertingConfig;
use crate::monitoring::types::{Alert, AlertSeverity, AlertStatus};
use crate::utils::error::{ResilienceError, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// In-memory channel recording every delivery
#[derive(Debug)]
struct RecordingChannel {
    name: &'static str,
    fail: bool,
    latency: Duration,
    sent: Mutex<Vec<(String, String, usize)>>,
}

impl RecordingChannel {
    fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            fail: false,
            latency: Duration::ZERO,
            sent: Mutex::new(Vec::new()),
        })
    }

    fn slow(name: &'static str, latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            name,
            fail: false,
            latency,
            sent: Mutex::new(Vec::new()),
        })
    }

    fn failing(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            fail: true,
            latency: Duration::ZERO,
            sent: Mutex::new(Vec::new()),
        })
    }

    fn count(&self) -> usize {
        self.sent.lock().len()
    }

    fn steps(&self) -> Vec<usize> {
        self.sent.lock().iter().map(|(_, _, step)| *step).collect()
    }
}

#[async_trait::async_trait]
impl NotificationChannel for RecordingChannel {
    async fn send(&self, alert: &Alert, recipient: &str, step: usize) -> Result<()> {
        if self.fail {
            return Err(ResilienceError::notification("gateway down"));
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.sent
            .lock()
            .push((alert.id.clone(), recipient.to_string(), step));
        Ok(())
    }

    fn name(&self) -> &str {
        self.name
    }
}

fn two_step_policy(first_delay_ms: u64, second_delay_ms: u64) -> EscalationPolicy {
    EscalationPolicy {
        id: "test".to_string(),
        name: "Test escalation".to_string(),
        steps: vec![
            EscalationStep::new(first_delay_ms, &["email"], &["ops@caregrid.local"]),
            EscalationStep::new(second_delay_ms, &["email", "sms"], &["email:lead@caregrid.local", "sms:+15550001"]),
        ],
    }
}

fn manager_with(policy: EscalationPolicy) -> (AlertManager, Arc<RecordingChannel>, Arc<RecordingChannel>) {
    let config = AlertingConfig {
        rules: vec![AlertRule::new(
            "probe-failed",
            "health_check_failed",
            AlertSeverity::High,
            policy.id.clone(),
        )],
        policies: vec![policy],
        ..AlertingConfig::default()
    };
    let manager = AlertManager::new(&config).unwrap();
    let email = RecordingChannel::new("email");
    let sms = RecordingChannel::new("sms");
    manager.register_channel(email.clone());
    manager.register_channel(sms.clone());
    (manager, email, sms)
}

fn raise(manager: &AlertManager) -> Alert {
    manager.create_alert(
        "health_check_failed",
        AlertSeverity::High,
        "database probe failing",
        alert_metadata!("probe" => "database"),
    )
}

#[tokio::test(start_paused = true)]
async fn test_immediate_step_fires() {
    let (manager, email, sms) = manager_with(two_step_policy(0, 60_000));
    let alert = raise(&manager);

    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(email.count(), 1);
    assert_eq!(sms.count(), 0);

    let stored = manager.get_alert(&alert.id).unwrap();
    assert_eq!(stored.escalation_level, Some(0));
    assert_eq!(stored.notification_log.len(), 1);
    assert!(stored.notification_log[0].success);
    assert_eq!(stored.notification_log[0].recipient, "ops@caregrid.local");
}

#[tokio::test(start_paused = true)]
async fn test_acknowledge_before_first_step_sends_nothing() {
    let (manager, email, sms) = manager_with(two_step_policy(1_000, 5_000));
    let alert = raise(&manager);
    assert_eq!(manager.pending_escalations(), 2);

    tokio::time::sleep(Duration::from_millis(500)).await;
    manager.acknowledge_alert(&alert.id, "alice").unwrap();

    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(email.count(), 0);
    assert_eq!(sms.count(), 0);
    assert_eq!(manager.pending_escalations(), 0);
    assert_eq!(manager.get_alert(&alert.id).unwrap().escalation_level, None);
}

#[tokio::test(start_paused = true)]
async fn test_acknowledge_between_steps_sends_one_step() {
    let (manager, email, sms) = manager_with(two_step_policy(0, 5_000));
    let alert = raise(&manager);

    tokio::time::sleep(Duration::from_millis(1_000)).await;
    let acknowledged = manager.acknowledge_alert(&alert.id, "alice").unwrap();
    assert_eq!(acknowledged.status, AlertStatus::Acknowledged);
    assert_eq!(acknowledged.acknowledged_by.as_deref(), Some("alice"));

    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(email.steps(), vec![0]);
    assert_eq!(sms.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_acknowledge_during_delivery_keeps_the_fired_step() {
    let config = AlertingConfig {
        rules: vec![AlertRule::new(
            "probe-failed",
            "health_check_failed",
            AlertSeverity::High,
            "test",
        )],
        policies: vec![two_step_policy(0, 5_000)],
        ..AlertingConfig::default()
    };
    let manager = AlertManager::new(&config).unwrap();
    let email = RecordingChannel::slow("email", Duration::from_secs(1));
    manager.register_channel(email.clone());
    manager.register_channel(RecordingChannel::new("sms"));

    let alert = raise(&manager);

    // Step 0 has fired and its email is still in flight
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(manager.pending_escalations(), 1);
    manager.acknowledge_alert(&alert.id, "alice").unwrap();

    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(email.steps(), vec![0]);
    let stored = manager.get_alert(&alert.id).unwrap();
    assert_eq!(stored.status, AlertStatus::Acknowledged);
    assert_eq!(stored.escalation_level, Some(0));
    assert_eq!(stored.notification_log.len(), 1);
    assert!(stored.notification_log[0].success);
    assert_eq!(manager.get_alert_statistics().notifications_sent, 1);
}

#[tokio::test(start_paused = true)]
async fn test_unacknowledged_alert_escalates_through_every_step() {
    let (manager, email, sms) = manager_with(two_step_policy(0, 5_000));
    let alert = raise(&manager);

    tokio::time::sleep(Duration::from_secs(6)).await;

    assert_eq!(email.steps(), vec![0, 1]);
    assert_eq!(sms.steps(), vec![1]);
    assert_eq!(sms.sent.lock()[0].1, "+15550001");
    assert_eq!(manager.get_alert(&alert.id).unwrap().escalation_level, Some(1));
}

#[tokio::test(start_paused = true)]
async fn test_failed_channel_does_not_block_others() {
    let (manager, email, _) = manager_with(two_step_policy(0, 1_000));
    manager.register_channel(RecordingChannel::failing("sms"));
    let alert = raise(&manager);

    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(email.steps(), vec![0, 1]);
    let stored = manager.get_alert(&alert.id).unwrap();
    let failed: Vec<_> = stored
        .notification_log
        .iter()
        .filter(|record| !record.success)
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].channel, "sms");
    assert!(failed[0].error.as_deref().unwrap().contains("gateway down"));

    let stats = manager.get_alert_statistics();
    assert_eq!(stats.notifications_sent, 2);
    assert_eq!(stats.notifications_failed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_unconfigured_channel_is_recorded_as_failure() {
    let config = AlertingConfig::default();
    let manager = AlertManager::new(&config).unwrap();
    let alert = manager.create_alert(
        "slow_response",
        AlertSeverity::Medium,
        "checkout slow",
        alert_metadata!(),
    );

    tokio::time::sleep(Duration::from_millis(10)).await;

    let stored = manager.get_alert(&alert.id).unwrap();
    assert_eq!(stored.notification_log.len(), 1);
    assert!(!stored.notification_log[0].success);
    assert!(stored.notification_log[0]
        .error
        .as_deref()
        .unwrap()
        .contains("not configured"));
}

#[tokio::test]
async fn test_acknowledge_and_resolve_unknown_alert() {
    let (manager, _, _) = manager_with(two_step_policy(0, 1_000));
    assert!(manager.acknowledge_alert("missing", "bob").unwrap_err().is_not_found());
    assert!(manager.resolve_alert("missing", "bob").unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_resolve_removes_from_active_but_keeps_history() {
    let (manager, _, _) = manager_with(two_step_policy(60_000, 120_000));
    let first = raise(&manager);
    let second = raise(&manager);

    let resolved = manager.resolve_alert(&first.id, "bob").unwrap();
    assert_eq!(resolved.status, AlertStatus::Resolved);
    assert!(resolved.resolved_at.is_some());

    let active = manager.get_active_alerts();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, second.id);

    let history = manager.get_alert_history(&AlertFilter::default());
    assert_eq!(history.len(), 2);

    // Acknowledging a resolved alert is rejected
    let err = manager.acknowledge_alert(&first.id, "bob").unwrap_err();
    assert!(matches!(err, ResilienceError::Validation(_)));

    manager.shutdown();
}

#[tokio::test]
async fn test_history_filters_newest_first() {
    let (manager, _, _) = manager_with(two_step_policy(60_000, 120_000));
    let low = manager.create_alert("slow_response", AlertSeverity::Low, "a", alert_metadata!());
    let high = raise(&manager);
    let newest = manager.create_alert("slow_response", AlertSeverity::Low, "b", alert_metadata!());

    let all = manager.get_alert_history(&AlertFilter::default());
    assert_eq!(all.first().unwrap().id, newest.id);
    assert_eq!(all.last().unwrap().id, low.id);

    let filter = AlertFilter {
        severity: Some(AlertSeverity::High),
        ..AlertFilter::default()
    };
    let filtered = manager.get_alert_history(&filter);
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].id, high.id);

    let filter = AlertFilter {
        alert_type: Some("slow_response".to_string()),
        limit: Some(1),
        ..AlertFilter::default()
    };
    let filtered = manager.get_alert_history(&filter);
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].id, newest.id);

    manager.shutdown();
}

#[tokio::test]
async fn test_history_is_bounded() {
    let config = AlertingConfig {
        history_capacity: 3,
        rules: Vec::new(),
        ..AlertingConfig::default()
    };
    let manager = AlertManager::new(&config).unwrap();
    let mut ids = Vec::new();
    for i in 0..5 {
        let alert = manager.create_alert("slow_response", AlertSeverity::Low, format!("{}", i), alert_metadata!());
        manager.resolve_alert(&alert.id, "bot").unwrap();
        ids.push(alert.id);
    }

    let history = manager.get_alert_history(&AlertFilter::default());
    assert_eq!(history.len(), 3);
    assert!(manager.get_alert(&ids[0]).unwrap_err().is_not_found());
    assert_eq!(manager.get_alert_statistics().total, 3);
}

#[tokio::test]
async fn test_statistics_by_status_and_severity() {
    let (manager, _, _) = manager_with(two_step_policy(60_000, 120_000));
    let a = raise(&manager);
    let b = manager.create_alert("slow_response", AlertSeverity::Low, "slow", alert_metadata!());
    manager.create_alert("circuit_breaker_open", AlertSeverity::Critical, "open", alert_metadata!());
    manager.acknowledge_alert(&a.id, "ops").unwrap();
    manager.resolve_alert(&b.id, "ops").unwrap();

    let stats = manager.get_alert_statistics();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.active, 1);
    assert_eq!(stats.acknowledged, 1);
    assert_eq!(stats.resolved, 1);
    assert_eq!(stats.last_24h.high, 1);
    assert_eq!(stats.last_24h.critical, 1);
    assert_eq!(stats.last_7d.total(), 3);

    manager.shutdown();
}

#[tokio::test]
async fn test_rule_crud() {
    let (manager, _, _) = manager_with(two_step_policy(0, 1_000));

    let mut rule = AlertRule::new("", "high_memory_usage", AlertSeverity::High, "test");
    rule.channels = vec!["slack".to_string()];
    let created = manager.create_rule(rule.clone()).unwrap();
    assert!(!created.id.is_empty());
    assert_eq!(manager.list_rules().len(), 2);

    let mut updated = created.clone();
    updated.enabled = false;
    let updated = manager.update_rule(&created.id, updated).unwrap();
    assert!(!manager.get_rule(&updated.id).unwrap().enabled);

    assert!(manager.update_rule("ghost", rule.clone()).unwrap_err().is_not_found());

    let mut orphan = rule.clone();
    orphan.escalation_policy_id = "nope".to_string();
    assert!(matches!(
        manager.create_rule(orphan),
        Err(ResilienceError::Validation(_))
    ));

    manager.delete_rule(&created.id).unwrap();
    assert!(manager.delete_rule(&created.id).unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_policy_crud() {
    let (manager, _, _) = manager_with(two_step_policy(0, 1_000));

    let err = manager.delete_policy("test").unwrap_err();
    assert!(matches!(err, ResilienceError::Validation(_)));

    let created = manager
        .create_policy(EscalationPolicy {
            id: "pager".to_string(),
            name: "Pager".to_string(),
            steps: vec![EscalationStep::new(0, &["webhook"], &["pagerduty"])],
        })
        .unwrap();
    assert_eq!(manager.list_policies().len(), 2);

    let empty = EscalationPolicy {
        id: String::new(),
        name: "Empty".to_string(),
        steps: Vec::new(),
    };
    assert!(manager.create_policy(empty).is_err());

    let mut slower = created.clone();
    slower.steps[0].delay_ms = 30_000;
    manager.update_policy("pager", slower).unwrap();
    assert_eq!(manager.get_policy("pager").unwrap().steps[0].delay_ms, 30_000);

    manager.delete_policy("pager").unwrap();
    assert!(manager.get_policy("pager").unwrap_err().is_not_found());
}

#[tokio::test(start_paused = true)]
async fn test_condition_filters_rule_matches() {
    let policy = two_step_policy(0, 60_000);
    let config = AlertingConfig {
        rules: vec![AlertRule::new("rate", "synthetic_failure_rate", AlertSeverity::High, "test")
            .with_condition(RuleCondition {
                metric: "success_rate".to_string(),
                comparator: Comparator::LessThan,
                value: 80.0,
                duration_ms: 0,
            })],
        policies: vec![policy],
        ..AlertingConfig::default()
    };
    let manager = AlertManager::new(&config).unwrap();
    let email = RecordingChannel::new("email");
    manager.register_channel(email.clone());

    manager.create_alert(
        "synthetic_failure_rate",
        AlertSeverity::High,
        "fine",
        alert_metadata!("success_rate" => 95.0),
    );
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(email.count(), 0);

    manager.create_alert(
        "synthetic_failure_rate",
        AlertSeverity::High,
        "bad",
        alert_metadata!("success_rate" => 40.0),
    );
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(email.count(), 1);

    manager.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_round_trip_preserves_statistics() {
    let (manager, _, _) = manager_with(two_step_policy(0, 60_000));
    let a = raise(&manager);
    let b = manager.create_alert("slow_response", AlertSeverity::Low, "slow", alert_metadata!());
    tokio::time::sleep(Duration::from_millis(10)).await;
    manager.acknowledge_alert(&a.id, "ops").unwrap();
    manager.resolve_alert(&b.id, "ops").unwrap();

    let snapshot = manager.export_snapshot();
    let json = serde_json::to_string(&snapshot).unwrap();
    let restored: AlertSnapshot = serde_json::from_str(&json).unwrap();

    let (other, _, _) = manager_with(two_step_policy(0, 60_000));
    other.restore_snapshot(restored);

    assert_eq!(other.get_alert_statistics(), manager.get_alert_statistics());
    assert_eq!(
        other.get_alert_history(&AlertFilter::default()),
        manager.get_alert_history(&AlertFilter::default())
    );
    assert_eq!(other.list_rules(), manager.list_rules());
    assert_eq!(other.pending_escalations(), 0);
}
