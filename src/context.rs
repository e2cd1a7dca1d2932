/// Application context and dependency injection
use crate::{
    celebrations::CelebrationManager,
    config::ServerConfig,
    db,
    dedup::DedupEngine,
    digest::DigestGenerator,
    error::KindredResult,
    events::EventManager,
    notifier::{MailNotifier, Notifier, PushNotifier},
    people::PeopleManager,
    reminders::ReminderScheduler,
    users::UserManager,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub users: Arc<UserManager>,
    pub people: Arc<PeopleManager>,
    pub dedup: Arc<DedupEngine>,
    pub celebrations: Arc<CelebrationManager>,
    pub events: Arc<EventManager>,
    pub reminders: Arc<ReminderScheduler>,
    pub digests: Arc<DigestGenerator>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> KindredResult<Self> {
        config.validate()?;

        let db = db::create_pool(
            &config.storage.database_path,
            db::DatabaseOptions {
                max_connections: config.storage.max_connections,
                ..Default::default()
            },
        )
        .await?;

        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        let push: Arc<dyn Notifier> = Arc::new(PushNotifier::new(config.push.clone()));
        let mailer = MailNotifier::new(config.email.clone())?;
        if mailer.is_configured() {
            tracing::info!("Email delivery enabled");
        } else {
            tracing::warn!("Email not configured, weekly digests will not be delivered");
        }

        Ok(Self::with_notifiers(config, db, push, Arc::new(mailer)))
    }

    /// Wire every manager over an existing pool and notifiers
    pub fn with_notifiers(
        config: ServerConfig,
        db: SqlitePool,
        push: Arc<dyn Notifier>,
        mailer: Arc<dyn Notifier>,
    ) -> Self {
        let reminders = ReminderScheduler::new(db.clone(), config.reminders.clone(), push);
        let celebrations = CelebrationManager::new(db.clone(), reminders.clone());
        let events = EventManager::new(db.clone(), reminders.clone(), config.events.clone());
        let digests = DigestGenerator::new(
            db.clone(),
            celebrations.clone(),
            mailer,
            config.digest.window_days,
        );

        Self {
            users: Arc::new(UserManager::new(db.clone())),
            people: Arc::new(PeopleManager::new(db.clone())),
            dedup: Arc::new(DedupEngine::new(db.clone())),
            celebrations: Arc::new(celebrations),
            events: Arc::new(events),
            reminders: Arc::new(reminders),
            digests: Arc::new(digests),
            config: Arc::new(config),
            db,
        }
    }
}
