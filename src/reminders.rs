/// Reminder scheduling and due-reminder processing
///
/// Scheduled reminders are derived data. Whenever a celebration's date or
/// offsets, or an event's start time, change, every reminder of that parent
/// is deleted and recreated inside the caller's transaction. Rows are never
/// patched in place.
///
/// Celebration reminders fire at the configured hour (09:00 by default) in
/// the server's local time zone.
use crate::{
    config::ReminderConfig,
    db::models::{CelebrationKind, Recurrence, ScheduledReminder},
    error::{KindredError, KindredResult},
    metrics,
    notifier::{DeliveryOutcome, Notification, Notifier, Recipient},
};
use chrono::{
    DateTime, Datelike, Duration, Local, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc,
};
use serde_json::json;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use std::{collections::BTreeSet, sync::Arc};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Largest accepted reminder offset, in days
pub const MAX_OFFSET_DAYS: i64 = 365;

/// Validate offsets, drop duplicates and order them descending
pub fn normalize_offsets(offsets: &[i64]) -> KindredResult<Vec<i64>> {
    if let Some(bad) = offsets.iter().find(|o| !(0..=MAX_OFFSET_DAYS).contains(*o)) {
        return Err(KindredError::Validation(format!(
            "Reminder offset must be between 0 and {} days, got {}",
            MAX_OFFSET_DAYS, bad
        )));
    }

    let unique: BTreeSet<i64> = offsets.iter().copied().collect();
    Ok(unique.into_iter().rev().collect())
}

/// The given local wall-clock hour on `date`, as a UTC instant
pub fn local_instant(date: NaiveDate, hour: u32) -> DateTime<Utc> {
    let naive = date
        .and_hms_opt(hour, 0, 0)
        .unwrap_or_else(|| date.and_time(NaiveTime::default()));

    match Local.from_local_datetime(&naive) {
        LocalResult::Single(t) => t.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        // Wall-clock hour skipped by a DST transition
        LocalResult::None => Utc.from_utc_datetime(&naive),
    }
}

/// One instant per offset: `date - offset` days at `hour`
pub fn celebration_reminder_instants(
    date: NaiveDate,
    offsets: &[i64],
    hour: u32,
) -> Vec<DateTime<Utc>> {
    offsets
        .iter()
        .filter_map(|offset| date.checked_sub_signed(Duration::days(*offset)))
        .map(|day| local_instant(day, hour))
        .collect()
}

/// The calendar day before the event at `hour`, and one hour before it starts.
///
/// An instant that falls outside the representable range is left out.
pub fn event_reminder_instants(starts_at: DateTime<Utc>, hour: u32) -> Vec<DateTime<Utc>> {
    let utc = starts_at.naive_utc();
    let offset = Local.offset_from_utc_datetime(&utc);
    let day_before = utc
        .checked_add_signed(Duration::seconds(i64::from(offset.local_minus_utc())))
        .and_then(|local| local.date().pred_opt())
        .map(|day| local_instant(day, hour));
    let hour_before = starts_at.checked_sub_signed(Duration::hours(1));

    day_before.into_iter().chain(hour_before).collect()
}

fn in_year(anchor: NaiveDate, year: i32) -> Option<NaiveDate> {
    anchor
        .with_year(year)
        // Feb 29 falls on Feb 28 in common years
        .or_else(|| NaiveDate::from_ymd_opt(year, anchor.month(), 28))
}

/// Next yearly occurrence of `anchor` on or after `from`.
///
/// Saturates at `from` when the next occurrence lies past the last
/// representable year.
pub fn get_next_occurrence(anchor: NaiveDate, from: NaiveDate) -> NaiveDate {
    match in_year(anchor, from.year()) {
        Some(this_year) if this_year >= from => this_year,
        _ => in_year(anchor, from.year() + 1).unwrap_or(from),
    }
}

/// Date a celebration is next observed: the next occurrence for yearly
/// celebrations, the stored date otherwise
pub fn occurrence_on_or_after(
    date: NaiveDate,
    recurrence: Option<Recurrence>,
    from: NaiveDate,
) -> NaiveDate {
    match recurrence {
        Some(Recurrence::Yearly) => get_next_occurrence(date, from),
        None => date,
    }
}

fn describe_days(days: i64) -> String {
    match days {
        0 => "today".to_string(),
        1 => "tomorrow".to_string(),
        d if d > 1 => format!("in {} days", d),
        -1 => "yesterday".to_string(),
        d => format!("{} days ago", -d),
    }
}

fn describe_hours(hours: i64) -> String {
    match hours {
        h if h <= 0 => "now".to_string(),
        1 => "in 1 hour".to_string(),
        h => format!("in {} hours", h),
    }
}

/// Parent a reminder derives from
#[derive(Debug, Clone, Copy)]
enum ReminderTarget<'a> {
    Celebration(&'a str),
    Event(&'a str),
}

impl<'a> ReminderTarget<'a> {
    fn ids(&self) -> (Option<&'a str>, Option<&'a str>) {
        match *self {
            ReminderTarget::Celebration(id) => (Some(id), None),
            ReminderTarget::Event(id) => (None, Some(id)),
        }
    }
}

async fn insert_reminder(
    conn: &mut SqliteConnection,
    user_id: &str,
    target: ReminderTarget<'_>,
    scheduled_for: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<ScheduledReminder, sqlx::Error> {
    let (celebration_id, event_id) = target.ids();
    let reminder = ScheduledReminder {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        celebration_id: celebration_id.map(str::to_string),
        event_id: event_id.map(str::to_string),
        scheduled_for,
        sent: false,
        sent_at: None,
        delivered: false,
        created_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO scheduled_reminder (id, user_id, celebration_id, event_id, scheduled_for, sent, sent_at, delivered, created_at)
        VALUES (?, ?, ?, ?, ?, 0, NULL, 0, ?)
        "#,
    )
    .bind(&reminder.id)
    .bind(&reminder.user_id)
    .bind(&reminder.celebration_id)
    .bind(&reminder.event_id)
    .bind(reminder.scheduled_for)
    .bind(reminder.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(reminder)
}

/// A due reminder joined with its user and parent
#[derive(Debug, FromRow)]
struct DueReminder {
    id: String,
    user_id: String,
    celebration_id: Option<String>,
    event_id: Option<String>,
    scheduled_for: DateTime<Utc>,
    user_name: String,
    notifications_enabled: bool,
    push_token: Option<String>,
    celebration_kind: Option<CelebrationKind>,
    celebration_title: Option<String>,
    celebration_date: Option<NaiveDate>,
    celebration_recurrence: Option<Recurrence>,
    person_id: Option<String>,
    person_name: Option<String>,
    event_title: Option<String>,
    event_starts_at: Option<DateTime<Utc>>,
}

impl DueReminder {
    /// Message text, computed at processing time
    fn notification(&self, now: DateTime<Utc>, today: NaiveDate) -> Option<Notification> {
        if let (Some(kind), Some(date)) = (self.celebration_kind, self.celebration_date) {
            let person = self.person_name.as_deref().unwrap_or("Someone");
            let subject = match kind {
                CelebrationKind::Birthday | CelebrationKind::Anniversary => {
                    format!("{}'s {}", person, kind.label())
                }
                CelebrationKind::LifeEvent => format!(
                    "{} ({})",
                    self.celebration_title.as_deref().unwrap_or("Life event"),
                    person
                ),
            };

            // The occurrence this reminder was scheduled for; reminders of an
            // anchor older than the offset range point at the next one instead
            let scheduled_day = self.scheduled_for.with_timezone(&Local).date_naive();
            let reference = if (today - scheduled_day).num_days() > MAX_OFFSET_DAYS {
                today
            } else {
                scheduled_day
            };
            let occurrence = occurrence_on_or_after(date, self.celebration_recurrence, reference);
            let days_until = (occurrence - today).num_days();
            let verb = if days_until < 0 { "was" } else { "is" };

            return Some(Notification {
                title: subject.clone(),
                body: format!("{} {} {}", subject, verb, describe_days(days_until)),
                data: json!({
                    "type": "celebration",
                    "celebrationId": self.celebration_id,
                    "personId": self.person_id,
                    "daysUntil": days_until,
                }),
            });
        }

        if let (Some(title), Some(starts_at)) = (&self.event_title, self.event_starts_at) {
            let hours_until = (starts_at - now).num_hours();
            let body = if hours_until <= 0 {
                format!("{} is starting now", title)
            } else {
                format!("{} starts {}", title, describe_hours(hours_until))
            };

            return Some(Notification {
                title: title.clone(),
                body,
                data: json!({
                    "type": "event",
                    "eventId": self.event_id,
                    "hoursUntil": hours_until,
                }),
            });
        }

        None
    }
}

/// What happened to one processed reminder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderOutcome {
    Delivered,
    Failed,
    /// Notifications disabled or no delivery token
    Skipped,
}

impl ReminderOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderOutcome::Delivered => "delivered",
            ReminderOutcome::Failed => "failed",
            ReminderOutcome::Skipped => "skipped",
        }
    }
}

/// Reminder scheduler
#[derive(Clone)]
pub struct ReminderScheduler {
    db: SqlitePool,
    config: ReminderConfig,
    notifier: Arc<dyn Notifier>,
}

impl ReminderScheduler {
    pub fn new(db: SqlitePool, config: ReminderConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            db,
            config,
            notifier,
        }
    }

    /// Offsets applied when a celebration supplies none
    pub fn default_offsets(&self) -> &[i64] {
        &self.config.default_offsets
    }

    /// Replace a celebration's reminders inside an open transaction
    pub async fn replace_celebration_reminders(
        &self,
        conn: &mut SqliteConnection,
        user_id: &str,
        celebration_id: &str,
        date: NaiveDate,
        offsets: &[i64],
    ) -> Result<Vec<ScheduledReminder>, sqlx::Error> {
        sqlx::query("DELETE FROM scheduled_reminder WHERE celebration_id = ?")
            .bind(celebration_id)
            .execute(&mut *conn)
            .await?;

        let now = Utc::now();
        let mut created = Vec::with_capacity(offsets.len());
        for instant in celebration_reminder_instants(date, offsets, self.config.hour) {
            created.push(
                insert_reminder(
                    conn,
                    user_id,
                    ReminderTarget::Celebration(celebration_id),
                    instant,
                    now,
                )
                .await?,
            );
        }

        Ok(created)
    }

    /// Replace an event's two reminders inside an open transaction
    pub async fn replace_event_reminders(
        &self,
        conn: &mut SqliteConnection,
        user_id: &str,
        event_id: &str,
        starts_at: DateTime<Utc>,
    ) -> Result<Vec<ScheduledReminder>, sqlx::Error> {
        sqlx::query("DELETE FROM scheduled_reminder WHERE event_id = ?")
            .bind(event_id)
            .execute(&mut *conn)
            .await?;

        let now = Utc::now();
        let mut created = Vec::with_capacity(2);
        for instant in event_reminder_instants(starts_at, self.config.hour) {
            created.push(
                insert_reminder(conn, user_id, ReminderTarget::Event(event_id), instant, now)
                    .await?,
            );
        }

        Ok(created)
    }

    /// Regenerate all reminders of a celebration atomically
    pub async fn schedule_celebration_reminders(
        &self,
        user_id: &str,
        celebration_id: &str,
        date: NaiveDate,
        offsets: &[i64],
    ) -> KindredResult<Vec<ScheduledReminder>> {
        let offsets = normalize_offsets(offsets)?;

        let mut tx = self.db.begin().await?;
        let created = match self
            .replace_celebration_reminders(&mut tx, user_id, celebration_id, date, &offsets)
            .await
        {
            Ok(created) => created,
            Err(e) => {
                tx.rollback().await.ok();
                return Err(KindredError::transaction(e));
            }
        };
        tx.commit().await.map_err(KindredError::transaction)?;

        Ok(created)
    }

    /// Regenerate both reminders of an event atomically
    pub async fn schedule_event_reminders(
        &self,
        user_id: &str,
        event_id: &str,
        starts_at: DateTime<Utc>,
    ) -> KindredResult<Vec<ScheduledReminder>> {
        let mut tx = self.db.begin().await?;
        let created = match self
            .replace_event_reminders(&mut tx, user_id, event_id, starts_at)
            .await
        {
            Ok(created) => created,
            Err(e) => {
                tx.rollback().await.ok();
                return Err(KindredError::transaction(e));
            }
        };
        tx.commit().await.map_err(KindredError::transaction)?;

        Ok(created)
    }

    pub async fn list_for_celebration(
        &self,
        celebration_id: &str,
    ) -> KindredResult<Vec<ScheduledReminder>> {
        let reminders = sqlx::query_as::<_, ScheduledReminder>(
            "SELECT * FROM scheduled_reminder WHERE celebration_id = ? ORDER BY scheduled_for, id",
        )
        .bind(celebration_id)
        .fetch_all(&self.db)
        .await?;

        Ok(reminders)
    }

    pub async fn list_for_event(&self, event_id: &str) -> KindredResult<Vec<ScheduledReminder>> {
        let reminders = sqlx::query_as::<_, ScheduledReminder>(
            "SELECT * FROM scheduled_reminder WHERE event_id = ? ORDER BY scheduled_for, id",
        )
        .bind(event_id)
        .fetch_all(&self.db)
        .await?;

        Ok(reminders)
    }

    /// Process one batch of unsent reminders due at `now`.
    ///
    /// Each reminder is claimed (marked sent) before delivery is attempted,
    /// so it is handled at most once whatever the delivery outcome. A failure
    /// on one reminder is logged and the rest of the batch continues. Returns
    /// the number of reminders processed.
    pub async fn process_due_reminders(&self, now: DateTime<Utc>) -> KindredResult<usize> {
        let due = sqlx::query_as::<_, DueReminder>(
            r#"
            SELECT r.id, r.user_id, r.celebration_id, r.event_id, r.scheduled_for,
                   u.name AS user_name, u.notifications_enabled, u.push_token,
                   c.kind AS celebration_kind, c.title AS celebration_title,
                   c.date AS celebration_date, c.recurrence AS celebration_recurrence,
                   p.id AS person_id, p.name AS person_name,
                   e.title AS event_title, e.starts_at AS event_starts_at
            FROM scheduled_reminder r
            JOIN users u ON u.id = r.user_id
            LEFT JOIN celebration c ON c.id = r.celebration_id
            LEFT JOIN person p ON p.id = c.person_id
            LEFT JOIN event e ON e.id = r.event_id
            WHERE r.sent = 0 AND r.scheduled_for <= ?
            ORDER BY r.scheduled_for, r.id
            LIMIT ?
            "#,
        )
        .bind(now)
        .bind(i64::from(self.config.batch_size))
        .fetch_all(&self.db)
        .await?;

        if due.is_empty() {
            return Ok(0);
        }

        let today = now.with_timezone(&Local).date_naive();
        let mut processed = 0;
        let mut delivered = 0;

        for reminder in &due {
            match self.process_one(reminder, now, today).await {
                Ok(Some(outcome)) => {
                    processed += 1;
                    if outcome == ReminderOutcome::Delivered {
                        delivered += 1;
                    }
                    metrics::record_reminder(outcome.as_str());
                }
                Ok(None) => {}
                Err(e) => {
                    error!(reminder_id = %reminder.id, error = %e, "Failed to process reminder");
                }
            }
        }

        info!(
            due = due.len(),
            processed, delivered, "Processed due reminders"
        );

        Ok(processed)
    }

    async fn process_one(
        &self,
        reminder: &DueReminder,
        now: DateTime<Utc>,
        today: NaiveDate,
    ) -> KindredResult<Option<ReminderOutcome>> {
        let claimed = sqlx::query(
            "UPDATE scheduled_reminder SET sent = 1, sent_at = ? WHERE id = ? AND sent = 0",
        )
        .bind(now)
        .bind(&reminder.id)
        .execute(&self.db)
        .await?;

        // Already handled by a concurrent pass
        if claimed.rows_affected() == 0 {
            return Ok(None);
        }

        let Some(notification) = reminder.notification(now, today) else {
            warn!(reminder_id = %reminder.id, "Reminder has no celebration or event");
            return Ok(Some(ReminderOutcome::Skipped));
        };

        if !reminder.notifications_enabled || reminder.push_token.is_none() {
            return Ok(Some(ReminderOutcome::Skipped));
        }

        let recipient = Recipient {
            user_id: reminder.user_id.clone(),
            name: Some(reminder.user_name.clone()),
            email: None,
            push_token: reminder.push_token.clone(),
        };

        match self.notifier.deliver(&recipient, &notification).await {
            DeliveryOutcome::Delivered => {
                sqlx::query("UPDATE scheduled_reminder SET delivered = 1 WHERE id = ?")
                    .bind(&reminder.id)
                    .execute(&self.db)
                    .await?;
                Ok(Some(ReminderOutcome::Delivered))
            }
            DeliveryOutcome::Failed(reason) => {
                warn!(reminder_id = %reminder.id, user_id = %reminder.user_id, "Reminder not delivered: {}", reason);
                Ok(Some(ReminderOutcome::Failed))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::create_memory_pool, users::UserManager};
    use async_trait::async_trait;
    use chrono::Timelike;
    use std::sync::Mutex;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, Notification)>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn deliver(&self, recipient: &Recipient, notification: &Notification) -> DeliveryOutcome {
            self.sent
                .lock()
                .unwrap()
                .push((recipient.user_id.clone(), notification.clone()));
            DeliveryOutcome::Delivered
        }
    }

    async fn scheduler() -> (ReminderScheduler, Arc<RecordingNotifier>) {
        let db = create_memory_pool().await.unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        (
            ReminderScheduler::new(db, ReminderConfig::default(), notifier.clone()),
            notifier,
        )
    }

    #[test]
    fn test_next_occurrence() {
        assert_eq!(get_next_occurrence(date(2020, 3, 15), date(2025, 1, 1)), date(2025, 3, 15));
        assert_eq!(get_next_occurrence(date(2020, 3, 15), date(2025, 4, 1)), date(2026, 3, 15));
        // Same day counts as upcoming
        assert_eq!(get_next_occurrence(date(1990, 6, 1), date(2025, 6, 1)), date(2025, 6, 1));
    }

    #[test]
    fn test_next_occurrence_leap_day() {
        assert_eq!(get_next_occurrence(date(2000, 2, 29), date(2025, 1, 10)), date(2025, 2, 28));
        assert_eq!(get_next_occurrence(date(2000, 2, 29), date(2027, 3, 1)), date(2028, 2, 29));
    }

    #[test]
    fn test_occurrence_for_one_off_dates() {
        assert_eq!(
            occurrence_on_or_after(date(2025, 9, 1), None, date(2025, 10, 1)),
            date(2025, 9, 1)
        );
        assert_eq!(
            occurrence_on_or_after(date(2000, 9, 1), Some(Recurrence::Yearly), date(2025, 10, 1)),
            date(2026, 9, 1)
        );
    }

    #[test]
    fn test_normalize_offsets() {
        assert_eq!(normalize_offsets(&[0, 7, 1, 7]).unwrap(), vec![7, 1, 0]);
        assert!(normalize_offsets(&[]).unwrap().is_empty());
        assert!(normalize_offsets(&[-1]).is_err());
        assert!(normalize_offsets(&[366]).is_err());
    }

    #[test]
    fn test_celebration_instants_are_local_nine_am() {
        let instants = celebration_reminder_instants(date(2025, 3, 15), &[7, 1, 0], 9);
        let local: Vec<_> = instants.iter().map(|i| i.with_timezone(&Local)).collect();

        assert_eq!(local.len(), 3);
        assert_eq!(local[0].date_naive(), date(2025, 3, 8));
        assert_eq!(local[1].date_naive(), date(2025, 3, 14));
        assert_eq!(local[2].date_naive(), date(2025, 3, 15));
        assert!(local.iter().all(|t| t.hour() == 9 && t.minute() == 0));
    }

    #[test]
    fn test_event_instants() {
        let starts_at = local_instant(date(2025, 7, 4), 18);
        let instants = event_reminder_instants(starts_at, 9);
        assert_eq!(instants.len(), 2);
        let (day_before, hour_before) = (instants[0], instants[1]);

        let day_before = day_before.with_timezone(&Local);
        assert_eq!(day_before.date_naive(), date(2025, 7, 3));
        assert_eq!(day_before.hour(), 9);
        assert_eq!(starts_at - hour_before, Duration::hours(1));
    }

    #[test]
    fn test_describe_days() {
        assert_eq!(describe_days(0), "today");
        assert_eq!(describe_days(1), "tomorrow");
        assert_eq!(describe_days(7), "in 7 days");
        assert_eq!(describe_days(-3), "3 days ago");
    }

    #[tokio::test]
    async fn test_schedule_rejects_bad_offsets_without_writing() {
        let (scheduler, _) = scheduler().await;

        let err = scheduler
            .schedule_celebration_reminders("u", "c", date(2025, 3, 15), &[400])
            .await
            .unwrap_err();
        assert!(matches!(err, KindredError::Validation(_)));
    }

    #[tokio::test]
    async fn test_empty_due_set_is_a_noop() {
        let (scheduler, notifier) = scheduler().await;
        UserManager::new(scheduler.db.clone())
            .create_user("ana@example.com", "Ana")
            .await
            .unwrap();

        assert_eq!(scheduler.process_due_reminders(Utc::now()).await.unwrap(), 0);
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_next_occurrence_saturates_at_calendar_end() {
        assert_eq!(get_next_occurrence(date(2000, 1, 1), NaiveDate::MAX), NaiveDate::MAX);
        assert!(get_next_occurrence(date(2000, 6, 1), NaiveDate::MAX) >= NaiveDate::MAX);
    }

    #[test]
    fn test_event_instants_near_range_start_do_not_overflow() {
        let starts_at = DateTime::<Utc>::MIN_UTC + Duration::minutes(30);
        let instants = event_reminder_instants(starts_at, 9);
        assert!(instants.len() < 2);
    }

    fn due_birthday(anchor: NaiveDate, scheduled_day: NaiveDate) -> DueReminder {
        DueReminder {
            id: "r1".to_string(),
            user_id: "u1".to_string(),
            celebration_id: Some("c1".to_string()),
            event_id: None,
            scheduled_for: local_instant(scheduled_day, 9),
            user_name: "Ana".to_string(),
            notifications_enabled: true,
            push_token: Some("tok".to_string()),
            celebration_kind: Some(CelebrationKind::Birthday),
            celebration_title: None,
            celebration_date: Some(anchor),
            celebration_recurrence: Some(Recurrence::Yearly),
            person_id: Some("p1".to_string()),
            person_name: Some("Maya".to_string()),
            event_title: None,
            event_starts_at: None,
        }
    }

    #[test]
    fn test_late_day_of_reminder_reports_yesterday() {
        let reminder = due_birthday(date(1990, 3, 15), date(2025, 3, 15));
        let next_morning = date(2025, 3, 16);

        let notification = reminder
            .notification(local_instant(next_morning, 0), next_morning)
            .unwrap();
        assert_eq!(notification.body, "Maya's birthday was yesterday");
        assert_eq!(notification.data["daysUntil"], -1);
    }

    #[test]
    fn test_on_time_reminder_counts_down() {
        let reminder = due_birthday(date(1990, 3, 15), date(2025, 3, 14));
        let today = date(2025, 3, 14);

        let notification = reminder
            .notification(local_instant(today, 9), today)
            .unwrap();
        assert_eq!(notification.body, "Maya's birthday is tomorrow");
    }

    #[test]
    fn test_stale_anchor_reminder_points_at_next_occurrence() {
        // Scheduled against the anchor year, processed decades later
        let reminder = due_birthday(date(1990, 3, 15), date(1990, 3, 8));
        let today = date(2025, 3, 10);

        let notification = reminder
            .notification(local_instant(today, 9), today)
            .unwrap();
        assert_eq!(notification.body, "Maya's birthday is in 5 days");
    }
}
