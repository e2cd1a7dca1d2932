/// Push delivery through an HTTP push gateway
use super::{DeliveryOutcome, Notification, Notifier, Recipient};
use crate::config::PushConfig;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct PushMessage<'a> {
    to: &'a str,
    title: &'a str,
    body: &'a str,
    data: &'a serde_json::Value,
}

/// Sends `{to, title, body, data}` to the configured gateway
#[derive(Clone)]
pub struct PushNotifier {
    client: reqwest::Client,
    config: PushConfig,
}

impl PushNotifier {
    pub fn new(config: PushConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self { client, config }
    }

    async fn send(&self, token: &str, notification: &Notification) -> Result<(), String> {
        let message = PushMessage {
            to: token,
            title: &notification.title,
            body: &notification.body,
            data: &notification.data,
        };

        let mut request = self.client.post(&self.config.gateway_url).json(&message);
        if let Some(ref access_token) = self.config.access_token {
            request = request.bearer_auth(access_token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| format!("Push gateway unreachable: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("Push gateway returned {}", status));
        }

        // The gateway answers 200 with a per-ticket status
        let body: serde_json::Value = response.json().await.unwrap_or_default();
        match gateway_error(&body) {
            Some(message) => Err(message),
            None => Ok(()),
        }
    }
}

/// Error message of a rejected push ticket, if any
fn gateway_error(body: &serde_json::Value) -> Option<String> {
    let data = body.get("data")?;
    let ticket = match data {
        serde_json::Value::Array(tickets) => tickets.first()?,
        other => other,
    };

    if ticket.get("status").and_then(|s| s.as_str()) == Some("error") {
        let message = ticket
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("push ticket rejected");
        return Some(message.to_string());
    }
    None
}

#[async_trait]
impl Notifier for PushNotifier {
    async fn deliver(&self, recipient: &Recipient, notification: &Notification) -> DeliveryOutcome {
        let Some(ref token) = recipient.push_token else {
            return DeliveryOutcome::Failed("No push token registered".to_string());
        };

        match self.send(token, notification).await {
            Ok(()) => {
                tracing::debug!(user_id = %recipient.user_id, "Push notification delivered");
                DeliveryOutcome::Delivered
            }
            Err(reason) => {
                tracing::warn!(user_id = %recipient.user_id, "Push delivery failed: {}", reason);
                DeliveryOutcome::Failed(reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn notification() -> Notification {
        Notification {
            title: "Maya's birthday".to_string(),
            body: "Maya's birthday is tomorrow".to_string(),
            data: json!({ "celebrationId": "c1" }),
        }
    }

    #[test]
    fn test_gateway_error_parsing() {
        assert_eq!(gateway_error(&json!({ "data": { "status": "ok", "id": "x" } })), None);
        assert_eq!(
            gateway_error(&json!({ "data": [{ "status": "error", "message": "DeviceNotRegistered" }] })),
            Some("DeviceNotRegistered".to_string())
        );
        assert_eq!(gateway_error(&json!({})), None);
    }

    #[tokio::test]
    async fn test_missing_token_fails_without_request() {
        let notifier = PushNotifier::new(PushConfig {
            gateway_url: "http://127.0.0.1:9/push".to_string(),
            access_token: None,
        });

        let outcome = notifier.deliver(&Recipient::default(), &notification()).await;
        assert!(matches!(outcome, DeliveryOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_reported_not_raised() {
        let notifier = PushNotifier::new(PushConfig {
            gateway_url: "http://127.0.0.1:9/push".to_string(),
            access_token: Some("secret".to_string()),
        });
        let recipient = Recipient {
            user_id: "u1".to_string(),
            push_token: Some("ExponentPushToken[abc]".to_string()),
            ..Default::default()
        };

        let outcome = notifier.deliver(&recipient, &notification()).await;
        assert!(!outcome.is_delivered());
    }
}
