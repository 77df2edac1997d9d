//! Notification channel implementations

use crate::config::ChannelConfig;
use crate::monitoring::types::{Alert, AlertSeverity};
use crate::utils::error::{ResilienceError, Result};
use std::collections::BTreeMap;

/// Notification channel trait
#[async_trait::async_trait]
pub trait NotificationChannel: Send + Sync + std::fmt::Debug {
    /// Deliver `alert` to one recipient on behalf of escalation step `step`
    async fn send(&self, alert: &Alert, recipient: &str, step: usize) -> Result<()>;

    /// Channel name referenced by escalation steps
    fn name(&self) -> &str;
}

/// One-line summary used as subject and SMS body
pub fn render_subject(alert: &Alert) -> String {
    format!(
        "[{}] {}: {}",
        alert.severity.to_string().to_uppercase(),
        alert.alert_type,
        alert.message
    )
}

fn render_body(alert: &Alert, step: usize) -> String {
    let mut body = format!(
        "{}\n\nAlert id: {}\nRaised: {}\nEscalation step: {}\n",
        render_subject(alert),
        alert.id,
        alert.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
        step
    );
    for (key, value) in &alert.metadata {
        body.push_str(&format!("{}: {}\n", key, value));
    }
    body
}

async fn post_json(
    client: &reqwest::Client,
    channel: &str,
    url: &str,
    api_key: Option<&str>,
    headers: &BTreeMap<String, String>,
    payload: &serde_json::Value,
) -> Result<()> {
    let mut request = client.post(url).json(payload);
    if let Some(key) = api_key {
        request = request.bearer_auth(key);
    }
    for (name, value) in headers {
        request = request.header(name.as_str(), value.as_str());
    }

    let response = request.send().await.map_err(|e| {
        ResilienceError::notification(format!("Failed to send {} notification: {}", channel, e))
    })?;

    if !response.status().is_success() {
        return Err(ResilienceError::notification(format!(
            "{} endpoint returned status: {}",
            channel,
            response.status()
        )));
    }

    Ok(())
}

/// Email delivered through an HTTP email API
#[derive(Debug)]
pub struct EmailChannel {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    from: String,
}

impl EmailChannel {
    pub fn new(
        client: reqwest::Client,
        endpoint: String,
        api_key: Option<String>,
        from: String,
    ) -> Self {
        Self {
            client,
            endpoint,
            api_key,
            from,
        }
    }
}

#[async_trait::async_trait]
impl NotificationChannel for EmailChannel {
    async fn send(&self, alert: &Alert, recipient: &str, step: usize) -> Result<()> {
        let payload = serde_json::json!({
            "from": self.from,
            "to": recipient,
            "subject": render_subject(alert),
            "text": render_body(alert, step),
        });
        post_json(
            &self.client,
            "email",
            &self.endpoint,
            self.api_key.as_deref(),
            &BTreeMap::new(),
            &payload,
        )
        .await
    }

    fn name(&self) -> &str {
        "email"
    }
}

/// SMS delivered through an HTTP gateway
#[derive(Debug)]
pub struct SmsChannel {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    from: String,
}

impl SmsChannel {
    pub fn new(
        client: reqwest::Client,
        endpoint: String,
        api_key: Option<String>,
        from: String,
    ) -> Self {
        Self {
            client,
            endpoint,
            api_key,
            from,
        }
    }
}

#[async_trait::async_trait]
impl NotificationChannel for SmsChannel {
    async fn send(&self, alert: &Alert, recipient: &str, _step: usize) -> Result<()> {
        // Gateways reject long bodies
        let mut body = render_subject(alert);
        if body.chars().count() > 160 {
            body = body.chars().take(157).collect::<String>() + "...";
        }

        let payload = serde_json::json!({
            "from": self.from,
            "to": recipient,
            "body": body,
        });
        post_json(
            &self.client,
            "sms",
            &self.endpoint,
            self.api_key.as_deref(),
            &BTreeMap::new(),
            &payload,
        )
        .await
    }

    fn name(&self) -> &str {
        "sms"
    }
}

/// Generic JSON webhook
#[derive(Debug)]
pub struct WebhookChannel {
    client: reqwest::Client,
    url: String,
    headers: BTreeMap<String, String>,
}

impl WebhookChannel {
    pub fn new(client: reqwest::Client, url: String, headers: BTreeMap<String, String>) -> Self {
        Self {
            client,
            url,
            headers,
        }
    }
}

#[async_trait::async_trait]
impl NotificationChannel for WebhookChannel {
    async fn send(&self, alert: &Alert, recipient: &str, step: usize) -> Result<()> {
        let payload = serde_json::json!({
            "recipient": recipient,
            "step": step,
            "alert": alert,
        });
        post_json(&self.client, "webhook", &self.url, None, &self.headers, &payload).await
    }

    fn name(&self) -> &str {
        "webhook"
    }
}

/// Slack notification channel
#[derive(Debug)]
pub struct SlackChannel {
    client: reqwest::Client,
    webhook_url: String,
    channel: Option<String>,
    username: Option<String>,
}

impl SlackChannel {
    pub fn new(
        client: reqwest::Client,
        webhook_url: String,
        channel: Option<String>,
        username: Option<String>,
    ) -> Self {
        Self {
            client,
            webhook_url,
            channel,
            username,
        }
    }
}

#[async_trait::async_trait]
impl NotificationChannel for SlackChannel {
    async fn send(&self, alert: &Alert, recipient: &str, step: usize) -> Result<()> {
        let color = match alert.severity {
            AlertSeverity::Low => "#36a64f",      // Green
            AlertSeverity::Medium => "#ff9500",   // Orange
            AlertSeverity::High => "#ff0000",     // Red
            AlertSeverity::Critical => "#8b0000", // Dark Red
        };

        // A recipient starting with '#' names the Slack channel
        let channel = if recipient.starts_with('#') {
            Some(recipient.to_string())
        } else {
            self.channel.clone()
        };

        let payload = serde_json::json!({
            "username": self.username.as_deref().unwrap_or("CareGrid Monitor"),
            "channel": channel,
            "attachments": [{
                "color": color,
                "title": alert.alert_type,
                "text": alert.message,
                "fields": [
                    {
                        "title": "Severity",
                        "value": alert.severity.to_string(),
                        "short": true
                    },
                    {
                        "title": "Escalation step",
                        "value": step,
                        "short": true
                    },
                    {
                        "title": "Time",
                        "value": alert.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
                        "short": true
                    }
                ],
                "footer": "CareGrid Monitoring",
                "ts": alert.created_at.timestamp()
            }]
        });

        post_json(
            &self.client,
            "slack",
            &self.webhook_url,
            None,
            &BTreeMap::new(),
            &payload,
        )
        .await
    }

    fn name(&self) -> &str {
        "slack"
    }
}

/// Build the transport described by `config`
pub fn build_channel(
    config: &ChannelConfig,
    client: reqwest::Client,
) -> Box<dyn NotificationChannel> {
    match config {
        ChannelConfig::Email {
            endpoint,
            api_key,
            from,
        } => Box::new(EmailChannel::new(
            client,
            endpoint.clone(),
            api_key.clone(),
            from.clone(),
        )),
        ChannelConfig::Sms {
            endpoint,
            api_key,
            from,
        } => Box::new(SmsChannel::new(
            client,
            endpoint.clone(),
            api_key.clone(),
            from.clone(),
        )),
        ChannelConfig::Webhook { url, headers } => {
            Box::new(WebhookChannel::new(client, url.clone(), headers.clone()))
        }
        ChannelConfig::Slack {
            webhook_url,
            channel,
            username,
        } => Box::new(SlackChannel::new(
            client,
            webhook_url.clone(),
            channel.clone(),
            username.clone(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert_metadata;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_alert(severity: AlertSeverity) -> Alert {
        Alert::new(
            "health_check_failed",
            severity,
            "database probe failing",
            alert_metadata!("probe" => "database"),
        )
    }

    #[test]
    fn test_render_subject() {
        let alert = create_test_alert(AlertSeverity::Critical);
        assert_eq!(
            render_subject(&alert),
            "[CRITICAL] health_check_failed: database probe failing"
        );
    }

    #[tokio::test]
    async fn test_email_channel_posts_to_api() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .and(header("authorization", "Bearer secret"))
            .and(body_partial_json(serde_json::json!({
                "to": "ops@caregrid.local",
                "from": "alerts@caregrid.local",
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let channel = build_channel(
            &ChannelConfig::Email {
                endpoint: format!("{}/send", server.uri()),
                api_key: Some("secret".to_string()),
                from: "alerts@caregrid.local".to_string(),
            },
            reqwest::Client::new(),
        );

        assert_eq!(channel.name(), "email");
        channel
            .send(&create_test_alert(AlertSeverity::High), "ops@caregrid.local", 0)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_webhook_failure_status_is_notification_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let channel = WebhookChannel::new(reqwest::Client::new(), server.uri(), BTreeMap::new());
        let result = channel
            .send(&create_test_alert(AlertSeverity::Low), "oncall", 1)
            .await;

        assert!(matches!(result, Err(ResilienceError::Notification(_))));
    }

    #[tokio::test]
    async fn test_sms_body_is_truncated() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let channel = SmsChannel::new(
            reqwest::Client::new(),
            server.uri(),
            None,
            "+10000000000".to_string(),
        );
        let mut alert = create_test_alert(AlertSeverity::Medium);
        alert.message = "x".repeat(400);
        channel.send(&alert, "+15550001", 0).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["body"].as_str().unwrap().chars().count(), 160);
    }
}
