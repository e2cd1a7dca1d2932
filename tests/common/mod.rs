//! Shared fixtures for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use kindred::{
    config::ServerConfig,
    db::create_memory_pool,
    notifier::{DeliveryOutcome, Notification, Notifier, Recipient},
    AppContext,
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

/// Notifier that records every delivery and always succeeds
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(Recipient, Notification)>>,
}

impl RecordingNotifier {
    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, recipient: &Recipient, notification: &Notification) -> DeliveryOutcome {
        self.sent
            .lock()
            .unwrap()
            .push((recipient.clone(), notification.clone()));
        DeliveryOutcome::Delivered
    }
}

/// Notifier whose gateway is always down
#[derive(Default)]
pub struct FailingNotifier {
    attempts: AtomicUsize,
}

impl FailingNotifier {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for FailingNotifier {
    async fn deliver(&self, _recipient: &Recipient, _notification: &Notification) -> DeliveryOutcome {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        DeliveryOutcome::Failed("gateway unavailable".to_string())
    }
}

pub struct TestApp {
    pub ctx: AppContext,
    pub push: Arc<RecordingNotifier>,
    pub mail: Arc<RecordingNotifier>,
}

/// App whose push deliveries go to `push`
pub async fn app_with_push(push: Arc<dyn Notifier>) -> AppContext {
    let db = create_memory_pool().await.unwrap();
    let mail: Arc<dyn Notifier> = Arc::new(RecordingNotifier::default());
    AppContext::with_notifiers(ServerConfig::default(), db, push, mail)
}

pub async fn test_app() -> TestApp {
    let db = create_memory_pool().await.unwrap();
    let push = Arc::new(RecordingNotifier::default());
    let mail = Arc::new(RecordingNotifier::default());
    let ctx = AppContext::with_notifiers(ServerConfig::default(), db, push.clone(), mail.clone());

    TestApp { ctx, push, mail }
}
