/// Weekly digest of upcoming celebrations and events
use crate::{
    celebrations::{CelebrationManager, UpcomingCelebration},
    db::models::{CelebrationKind, Event, User},
    error::{KindredError, KindredResult},
    metrics,
    notifier::{DeliveryOutcome, Notification, Notifier, Recipient},
    reminders::local_instant,
    users::UserManager,
};
use chrono::{Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{FromRow, SqlitePool};
use std::{fmt::Write as _, sync::Arc};

/// A hosted event with its accepted-guest count
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DigestEvent {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub event: Event,
    pub accepted_guests: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Digest {
    pub user_id: String,
    pub from: NaiveDate,
    pub until: NaiveDate,
    pub celebrations: Vec<UpcomingCelebration>,
    pub events: Vec<DigestEvent>,
}

impl Digest {
    pub fn is_empty(&self) -> bool {
        self.celebrations.is_empty() && self.events.is_empty()
    }

    /// Plain-text rendering for mail delivery
    pub fn render(&self, user_name: &str) -> Notification {
        let mut body = String::new();
        let _ = writeln!(body, "Hi {},", user_name);
        let _ = writeln!(body);
        let _ = writeln!(
            body,
            "Here is what's coming up between {} and {}.",
            self.from.format("%a %b %-d"),
            self.until.format("%a %b %-d")
        );

        if !self.celebrations.is_empty() {
            let _ = writeln!(body);
            let _ = writeln!(body, "Celebrations:");
            for upcoming in &self.celebrations {
                let what = match upcoming.celebration.kind {
                    CelebrationKind::LifeEvent => upcoming
                        .celebration
                        .title
                        .clone()
                        .unwrap_or_else(|| "Life event".to_string()),
                    kind => kind.label().to_string(),
                };
                let when = match upcoming.days_until {
                    0 => "today".to_string(),
                    1 => "tomorrow".to_string(),
                    n => format!("in {} days", n),
                };
                let _ = writeln!(
                    body,
                    "- {}: {}'s {} ({})",
                    upcoming.next_occurrence.format("%a %b %-d"),
                    upcoming.person_name,
                    what,
                    when
                );
            }
        }

        if !self.events.is_empty() {
            let _ = writeln!(body);
            let _ = writeln!(body, "Events:");
            for item in &self.events {
                let _ = writeln!(
                    body,
                    "- {}: {} ({} accepted)",
                    item.event.starts_at.with_timezone(&Local).format("%a %b %-d %H:%M"),
                    item.event.title,
                    item.accepted_guests
                );
            }
        }

        Notification {
            title: "Your week ahead".to_string(),
            body,
            data: json!({
                "type": "digest",
                "celebrations": self.celebrations.len(),
                "events": self.events.len(),
            }),
        }
    }
}

/// Digest generator
#[derive(Clone)]
pub struct DigestGenerator {
    db: SqlitePool,
    users: UserManager,
    celebrations: CelebrationManager,
    mailer: Arc<dyn Notifier>,
    window_days: i64,
}

impl DigestGenerator {
    pub fn new(
        db: SqlitePool,
        celebrations: CelebrationManager,
        mailer: Arc<dyn Notifier>,
        window_days: i64,
    ) -> Self {
        Self {
            users: UserManager::new(db.clone()),
            db,
            celebrations,
            mailer,
            window_days,
        }
    }

    /// Build the digest covering `today` through `today + window_days`
    pub async fn generate_digest(
        &self,
        user_id: &str,
        today: NaiveDate,
        window_days: i64,
    ) -> KindredResult<Digest> {
        let celebrations = self.celebrations.upcoming(user_id, today, window_days).await?;

        let until = today
            .checked_add_signed(Duration::days(window_days))
            .ok_or_else(|| KindredError::Validation("Digest window out of range".to_string()))?;
        let day_after = until
            .succ_opt()
            .ok_or_else(|| KindredError::Validation("Digest window out of range".to_string()))?;
        let window_start = local_instant(today, 0);
        let window_end = local_instant(day_after, 0);

        let events = sqlx::query_as::<_, DigestEvent>(
            r#"
            SELECT e.*,
                   (SELECT COUNT(*) FROM event_guest g
                    WHERE g.event_id = e.id AND g.status = 'ACCEPTED') AS accepted_guests
            FROM event e
            WHERE e.host_user_id = ? AND e.starts_at >= ? AND e.starts_at < ?
            ORDER BY e.starts_at, e.id
            "#,
        )
        .bind(user_id)
        .bind(window_start)
        .bind(window_end)
        .fetch_all(&self.db)
        .await?;

        Ok(Digest {
            user_id: user_id.to_string(),
            from: today,
            until,
            celebrations,
            events,
        })
    }

    async fn send_digest(&self, user: &User, today: NaiveDate) -> KindredResult<Option<DeliveryOutcome>> {
        let digest = self.generate_digest(&user.id, today, self.window_days).await?;
        if digest.is_empty() {
            return Ok(None);
        }

        let recipient = Recipient {
            user_id: user.id.clone(),
            name: Some(user.name.clone()),
            email: Some(user.email.clone()),
            push_token: None,
        };
        let outcome = self
            .mailer
            .deliver(&recipient, &digest.render(&user.name))
            .await;

        Ok(Some(outcome))
    }

    /// Mail a digest to every user who wants one.
    ///
    /// Empty digests are not sent. A failure for one user is logged and the
    /// run continues. Returns the number of digests delivered.
    pub async fn send_weekly_digests(&self, today: NaiveDate) -> KindredResult<usize> {
        let recipients = self.users.list_digest_recipients().await?;
        let mut delivered = 0;
        let mut failed = 0;

        for user in &recipients {
            match self.send_digest(user, today).await {
                Ok(Some(DeliveryOutcome::Delivered)) => {
                    delivered += 1;
                    metrics::record_digest(true);
                }
                Ok(Some(DeliveryOutcome::Failed(reason))) => {
                    failed += 1;
                    metrics::record_digest(false);
                    tracing::warn!(user_id = %user.id, "Digest not delivered: {}", reason);
                }
                Ok(None) => {}
                Err(e) => {
                    failed += 1;
                    tracing::error!(user_id = %user.id, error = %e, "Failed to build digest");
                }
            }
        }

        tracing::info!(
            recipients = recipients.len(),
            delivered,
            failed,
            "Weekly digest run complete"
        );

        Ok(delivered)
    }
}
