/// Notification delivery
///
/// Delivery is best-effort. A `Notifier` reports failure as a value and
/// never returns an error to the caller.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod mail;
pub mod push;

pub use mail::MailNotifier;
pub use push::PushNotifier;

/// Who a notification is addressed to
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Recipient {
    pub user_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub push_token: Option<String>,
}

/// Message content, independent of transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Result of one delivery attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed(String),
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered)
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, recipient: &Recipient, notification: &Notification) -> DeliveryOutcome;
}
