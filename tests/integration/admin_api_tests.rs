//! Admin API integration tests
//!
//! Every request goes through the full actix app with the request id
//! middleware and the error rendering of the library.

#[cfg(test)]
mod tests {
    use crate::admin_app;
    use crate::common::{booking_api, monitoring_for};
    use actix_web::http::StatusCode;
    use actix_web::test;
    use serde_json::{Value, json};

    // ==================== Status ====================

    #[actix_web::test]
    async fn test_health_and_status() {
        let server = booking_api().await;
        let app = admin_app!(monitoring_for(&server));

        let res = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key("x-request-id"));
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["status"], "healthy");

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/status").to_request(),
        )
        .await;
        assert_eq!(body["data"]["healthy"], true);
        assert_eq!(body["data"]["breakers"].as_array().unwrap().len(), 4);
        assert_eq!(body["data"]["probes"]["basic"]["status"], "unknown");
    }

    #[actix_web::test]
    async fn test_breaker_reset_and_unknown_breaker() {
        let server = booking_api().await;
        let app = admin_app!(monitoring_for(&server));

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post()
                .uri("/status/breakers/payment/reset")
                .to_request(),
        )
        .await;
        assert_eq!(body["data"]["name"], "payment");
        assert_eq!(body["data"]["state"], "CLOSED");

        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/status/breakers/ledger/reset")
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    // ==================== Alerts ====================

    #[actix_web::test]
    async fn test_alert_lifecycle() {
        let server = booking_api().await;
        let app = admin_app!(monitoring_for(&server));

        let req = test::TestRequest::post()
            .uri("/alerts")
            .set_json(json!({
                "type": "manual_check",
                "severity": "high",
                "message": "Booking confirmations delayed",
                "metadata": { "clinic": "c-7" }
            }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(res).await;
        let id = body["data"]["id"].as_str().unwrap().to_string();
        assert_eq!(body["data"]["status"], "active");

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/alerts/active").to_request(),
        )
        .await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post()
                .uri(&format!("/alerts/{}/acknowledge", id))
                .set_json(json!({ "by": "oncall" }))
                .to_request(),
        )
        .await;
        assert_eq!(body["data"]["status"], "acknowledged");
        assert_eq!(body["data"]["acknowledged_by"], "oncall");

        // Resolve without a body falls back to the default actor
        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post()
                .uri(&format!("/alerts/{}/resolve", id))
                .to_request(),
        )
        .await;
        assert_eq!(body["data"]["status"], "resolved");
        assert_eq!(body["data"]["resolved_by"], "operator");

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get()
                .uri("/alerts/history?status=resolved&severity=high&limit=10")
                .to_request(),
        )
        .await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/alerts/statistics").to_request(),
        )
        .await;
        assert_eq!(body["data"]["total"], 1);
        assert_eq!(body["data"]["resolved"], 1);
        assert_eq!(body["data"]["active"], 0);
    }

    #[actix_web::test]
    async fn test_alert_validation_and_missing_alert() {
        let server = booking_api().await;
        let app = admin_app!(monitoring_for(&server));

        let req = test::TestRequest::post()
            .uri("/alerts")
            .set_json(json!({ "type": " ", "severity": "low", "message": "x" }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/alerts/does-not-exist/acknowledge")
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_rules_and_policies_crud() {
        let server = booking_api().await;
        let app = admin_app!(monitoring_for(&server));

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/alerts/policies").to_request(),
        )
        .await;
        let ids: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|policy| policy["id"].as_str())
            .collect();
        assert!(ids.contains(&"default"));
        assert!(ids.contains(&"critical"));

        // A rule needs an existing policy
        let rule = json!({
            "id": "pager-bookings",
            "type": "booking_backlog",
            "severity": "critical",
            "escalation_policy_id": "pager"
        });
        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/alerts/rules")
                .set_json(&rule)
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/alerts/policies")
                .set_json(json!({
                    "id": "pager",
                    "name": "Pager",
                    "steps": [{ "delay_ms": 0, "channels": ["slack"] }]
                }))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);

        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/alerts/rules")
                .set_json(&rule)
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);

        // In use, so it cannot be deleted
        let res = test::call_service(
            &app,
            test::TestRequest::delete()
                .uri("/alerts/policies/pager")
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::put()
                .uri("/alerts/rules/pager-bookings")
                .set_json(json!({
                    "type": "booking_backlog",
                    "severity": "medium",
                    "escalation_policy_id": "default",
                    "enabled": false
                }))
                .to_request(),
        )
        .await;
        assert_eq!(body["data"]["id"], "pager-bookings");
        assert_eq!(body["data"]["enabled"], false);

        let res = test::call_service(
            &app,
            test::TestRequest::delete()
                .uri("/alerts/policies/pager")
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);

        let res = test::call_service(
            &app,
            test::TestRequest::delete()
                .uri("/alerts/rules/pager-bookings")
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);

        let res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/alerts/rules/pager-bookings")
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    // ==================== Synthetic ====================

    #[actix_web::test]
    async fn test_synthetic_run_history_and_clear() {
        let server = booking_api().await;
        let app = admin_app!(monitoring_for(&server));

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post()
                .uri("/synthetic/run/search")
                .to_request(),
        )
        .await;
        assert_eq!(body["data"]["type"], "search");
        assert_eq!(body["data"]["status"], "success");
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get()
                .uri(&format!("/synthetic/transactions/{}", id))
                .to_request(),
        )
        .await;
        assert_eq!(body["data"]["steps"].as_array().unwrap().len(), 2);

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get()
                .uri("/synthetic/history?type=search")
                .to_request(),
        )
        .await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/synthetic/summary").to_request(),
        )
        .await;
        assert_eq!(body["data"]["total"], 1);
        assert_eq!(body["meta"]["success_rate"], 100.0);

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::delete().uri("/synthetic/history").to_request(),
        )
        .await;
        assert_eq!(body["data"]["cleared"], 1);

        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/synthetic/run/checkout")
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_synthetic_run_all_covers_enabled_types() {
        let server = booking_api().await;
        let app = admin_app!(monitoring_for(&server));

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post().uri("/synthetic/run-all").to_request(),
        )
        .await;
        let mut types: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|transaction| transaction["type"].as_str())
            .collect();
        types.sort();
        assert_eq!(types, vec!["contact", "health", "login", "search"]);
        assert_eq!(body["meta"]["failed"], 0);
    }

    // ==================== Scheduler ====================

    #[actix_web::test]
    async fn test_scheduler_settings_and_trigger() {
        let server = booking_api().await;
        let app = admin_app!(monitoring_for(&server));

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/scheduler").to_request(),
        )
        .await;
        assert_eq!(body["data"]["probes"].as_array().unwrap().len(), 4);
        assert_eq!(body["data"]["synthetic"].as_array().unwrap().len(), 6);

        let res = test::call_service(
            &app,
            test::TestRequest::put()
                .uri("/scheduler/login/interval")
                .set_json(json!({ "interval_ms": 0 }))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::put()
                .uri("/scheduler/login/interval")
                .set_json(json!({ "interval_ms": 120000 }))
                .to_request(),
        )
        .await;
        assert_eq!(body["data"]["interval_ms"], 120000);

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post()
                .uri("/scheduler/booking/enable")
                .to_request(),
        )
        .await;
        assert_eq!(body["data"]["enabled"], true);

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post()
                .uri("/scheduler/basic/trigger")
                .to_request(),
        )
        .await;
        assert_eq!(body["data"]["kind"], "probe");
        assert_eq!(body["data"]["result"]["success"], true);

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post()
                .uri("/scheduler/health/trigger")
                .to_request(),
        )
        .await;
        assert_eq!(body["data"]["kind"], "synthetic");

        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/scheduler/nightly-report/disable")
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    // ==================== Thresholds ====================

    #[actix_web::test]
    async fn test_threshold_update_is_validated() {
        let server = booking_api().await;
        let app = admin_app!(monitoring_for(&server));

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/thresholds").to_request(),
        )
        .await;
        assert_eq!(body["data"]["thresholds"]["synthetic_consecutive_failures"], 5);

        let res = test::call_service(
            &app,
            test::TestRequest::put()
                .uri("/thresholds")
                .set_json(json!({ "error_rate_percent": 150.0 }))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::put()
                .uri("/thresholds")
                .set_json(json!({ "error_rate_percent": 25.0, "response_time_ms": 2000 }))
                .to_request(),
        )
        .await;
        assert_eq!(body["data"]["error_rate_percent"], 25.0);
        // Omitted fields take their defaults
        assert_eq!(body["data"]["memory_usage_percent"], 90.0);
    }
}
