//! End-to-end failure flows
//!
//! These start from a failing dependency and follow the failure through the
//! breaker or synthetic runner to alerts and channel deliveries.

#[cfg(test)]
mod tests {
    use crate::common::config_for;
    use caregrid_resilience::config::ChannelConfig;
    use caregrid_resilience::monitoring::alert_types;
    use caregrid_resilience::{CircuitBreakerConfig, MonitoringSystem, ResilienceError};
    use serde_json::Value;
    use std::collections::BTreeMap;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Poll `condition` for up to two seconds
    async fn eventually<F: Fn() -> bool>(condition: F) -> bool {
        for _ in 0..100 {
            if condition() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        condition()
    }

    #[tokio::test]
    async fn test_open_breaker_raises_alert_once() {
        let server = MockServer::start().await;
        let monitoring = MonitoringSystem::new(&config_for(&server.uri())).unwrap();
        monitoring.start();

        monitoring
            .registry()
            .register_breaker("insurance", CircuitBreakerConfig::new(2, 60_000));
        for _ in 0..3 {
            let _ = monitoring
                .registry()
                .execute_protected(
                    "insurance",
                    || async { Err::<(), _>(ResilienceError::operation("eligibility API down")) },
                    None,
                )
                .await;
        }

        let alerts = monitoring.alerts().clone();
        let raised = eventually(|| {
            alerts
                .get_active_alerts()
                .iter()
                .any(|alert| alert.alert_type == alert_types::CIRCUIT_BREAKER_OPEN)
        })
        .await;
        assert!(raised);
        assert!(!monitoring.status().healthy);

        let open_alerts = alerts
            .get_active_alerts()
            .into_iter()
            .filter(|alert| alert.alert_type == alert_types::CIRCUIT_BREAKER_OPEN)
            .count();
        assert_eq!(open_alerts, 1);

        monitoring.stop();
    }

    #[tokio::test]
    async fn test_consecutive_synthetic_failures_reach_webhook() {
        let booking = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/health"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&booking)
            .await;

        let hooks = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hooks/caregrid"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&hooks)
            .await;

        let mut config = config_for(&booking.uri());
        config.alerting.channels = vec![ChannelConfig::Webhook {
            url: format!("{}/hooks/caregrid", hooks.uri()),
            headers: BTreeMap::new(),
        }];
        config.thresholds.limits.synthetic_consecutive_failures = 2;
        let monitoring = MonitoringSystem::new(&config).unwrap();

        for _ in 0..2 {
            let transaction = monitoring.synthetic().trigger("health").await.unwrap();
            assert!(!transaction.is_success());
        }
        assert_eq!(monitoring.monitor().consecutive_failures("health"), 2);

        let alert = monitoring
            .alerts()
            .get_active_alerts()
            .into_iter()
            .find(|alert| alert.alert_type == alert_types::SYNTHETIC_CONSECUTIVE_FAILURES)
            .unwrap();

        let alerts = monitoring.alerts().clone();
        let id = alert.id.clone();
        let logged = eventually(|| {
            alerts
                .get_alert(&id)
                .map(|alert| {
                    alert
                        .notification_log
                        .iter()
                        .any(|record| record.channel == "webhook" && record.success)
                })
                .unwrap_or(false)
        })
        .await;
        assert!(logged);

        let requests = hooks.received_requests().await.unwrap_or_default();
        let payloads: Vec<Value> = requests
            .iter()
            .filter_map(|request| serde_json::from_slice(&request.body).ok())
            .collect();
        let delivery = payloads
            .iter()
            .find(|body| body["alert"]["id"] == alert.id.as_str())
            .unwrap();
        assert_eq!(delivery["recipient"], "oncall");
        assert_eq!(delivery["step"], 0);

        monitoring.stop();
    }
}
