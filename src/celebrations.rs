/// Celebrations: birthdays, anniversaries and one-off life events
use crate::{
    db::models::{Celebration, CelebrationKind},
    error::{KindredError, KindredResult},
    normalize::non_blank,
    people::fetch_owned_person,
    reminders::{normalize_offsets, occurrence_on_or_after, ReminderScheduler},
};
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

/// Upper bound for the `upcoming` window
pub const MAX_WINDOW_DAYS: i64 = 366;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCelebration {
    pub kind: CelebrationKind,
    pub title: Option<String>,
    pub date: NaiveDate,
    /// Days before the occurrence; the configured default when absent
    pub reminder_offsets: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CelebrationUpdate {
    pub kind: Option<CelebrationKind>,
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub reminder_offsets: Option<Vec<i64>>,
}

/// A celebration falling inside a lookahead window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpcomingCelebration {
    pub celebration: Celebration,
    pub person_name: String,
    pub next_occurrence: NaiveDate,
    pub days_until: i64,
}

fn check_title(kind: CelebrationKind, title: Option<&str>) -> KindredResult<()> {
    if kind == CelebrationKind::LifeEvent && title.is_none() {
        return Err(KindredError::Validation(
            "Life events require a title".to_string(),
        ));
    }
    Ok(())
}

fn encode_offsets(offsets: &[i64]) -> KindredResult<String> {
    serde_json::to_string(offsets).map_err(|e| KindredError::Internal(e.to_string()))
}

/// Celebration manager
#[derive(Clone)]
pub struct CelebrationManager {
    db: SqlitePool,
    reminders: ReminderScheduler,
}

impl CelebrationManager {
    pub fn new(db: SqlitePool, reminders: ReminderScheduler) -> Self {
        Self { db, reminders }
    }

    /// Create a celebration and its reminders in one transaction
    pub async fn create_celebration(
        &self,
        user_id: &str,
        person_id: &str,
        input: NewCelebration,
    ) -> KindredResult<Celebration> {
        let title = non_blank(input.title.as_deref()).map(str::to_string);
        check_title(input.kind, title.as_deref())?;

        let offsets = match input.reminder_offsets {
            Some(ref offsets) => normalize_offsets(offsets)?,
            None => normalize_offsets(self.reminders.default_offsets())?,
        };
        let offsets_json = encode_offsets(&offsets)?;

        fetch_owned_person(&self.db, user_id, person_id).await?;

        let now = Utc::now();
        let celebration = Celebration {
            id: Uuid::new_v4().to_string(),
            person_id: person_id.to_string(),
            kind: input.kind,
            title,
            date: input.date,
            recurrence: input.kind.recurrence(),
            reminder_offsets: offsets,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.db.begin().await?;
        let saved = self.insert_with_reminders(&mut tx, user_id, &celebration, &offsets_json).await;
        if let Err(e) = saved {
            tx.rollback().await.ok();
            return Err(KindredError::transaction(e));
        }
        tx.commit().await.map_err(KindredError::transaction)?;

        tracing::info!(
            celebration_id = %celebration.id,
            kind = celebration.kind.label(),
            reminders = celebration.reminder_offsets.len(),
            "Created celebration"
        );

        Ok(celebration)
    }

    async fn insert_with_reminders(
        &self,
        conn: &mut SqliteConnection,
        user_id: &str,
        celebration: &Celebration,
        offsets_json: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO celebration (id, person_id, kind, title, date, recurrence, reminder_offsets, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&celebration.id)
        .bind(&celebration.person_id)
        .bind(celebration.kind)
        .bind(&celebration.title)
        .bind(celebration.date)
        .bind(celebration.recurrence)
        .bind(offsets_json)
        .bind(celebration.created_at)
        .bind(celebration.updated_at)
        .execute(&mut *conn)
        .await?;

        self.reminders
            .replace_celebration_reminders(
                conn,
                user_id,
                &celebration.id,
                celebration.date,
                &celebration.reminder_offsets,
            )
            .await?;

        Ok(())
    }

    /// Get a celebration owned (through its person) by `user_id`
    pub async fn get_celebration(
        &self,
        user_id: &str,
        celebration_id: &str,
    ) -> KindredResult<Celebration> {
        sqlx::query_as::<_, Celebration>(
            r#"
            SELECT c.* FROM celebration c
            JOIN person p ON p.id = c.person_id
            WHERE c.id = ? AND p.user_id = ?
            "#,
        )
        .bind(celebration_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| KindredError::NotFound(format!("Celebration {} not found", celebration_id)))
    }

    /// Update a celebration.
    ///
    /// Reminders are regenerated in the same transaction when the date or
    /// the offsets change.
    pub async fn update_celebration(
        &self,
        user_id: &str,
        celebration_id: &str,
        update: CelebrationUpdate,
    ) -> KindredResult<Celebration> {
        let mut celebration = self.get_celebration(user_id, celebration_id).await?;
        let previous_date = celebration.date;
        let previous_offsets = celebration.reminder_offsets.clone();

        if let Some(kind) = update.kind {
            celebration.kind = kind;
            celebration.recurrence = kind.recurrence();
        }
        if let Some(ref title) = update.title {
            celebration.title = non_blank(Some(title)).map(str::to_string);
        }
        if let Some(date) = update.date {
            celebration.date = date;
        }
        if let Some(ref offsets) = update.reminder_offsets {
            celebration.reminder_offsets = normalize_offsets(offsets)?;
        }
        check_title(celebration.kind, celebration.title.as_deref())?;
        celebration.updated_at = Utc::now();

        let offsets_json = encode_offsets(&celebration.reminder_offsets)?;
        let reschedule = celebration.date != previous_date
            || celebration.reminder_offsets != previous_offsets;

        let mut tx = self.db.begin().await?;
        let saved = self
            .save_update(&mut tx, user_id, &celebration, &offsets_json, reschedule)
            .await;
        if let Err(e) = saved {
            tx.rollback().await.ok();
            return Err(KindredError::transaction(e));
        }
        tx.commit().await.map_err(KindredError::transaction)?;

        if reschedule {
            tracing::info!(celebration_id, "Regenerated celebration reminders");
        }

        Ok(celebration)
    }

    async fn save_update(
        &self,
        conn: &mut SqliteConnection,
        user_id: &str,
        celebration: &Celebration,
        offsets_json: &str,
        reschedule: bool,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE celebration
            SET kind = ?, title = ?, date = ?, recurrence = ?, reminder_offsets = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(celebration.kind)
        .bind(&celebration.title)
        .bind(celebration.date)
        .bind(celebration.recurrence)
        .bind(offsets_json)
        .bind(celebration.updated_at)
        .bind(&celebration.id)
        .execute(&mut *conn)
        .await?;

        if reschedule {
            self.reminders
                .replace_celebration_reminders(
                    conn,
                    user_id,
                    &celebration.id,
                    celebration.date,
                    &celebration.reminder_offsets,
                )
                .await?;
        }

        Ok(())
    }

    /// Delete a celebration; its reminders cascade
    pub async fn delete_celebration(&self, user_id: &str, celebration_id: &str) -> KindredResult<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM celebration
            WHERE id = ? AND person_id IN (SELECT id FROM person WHERE user_id = ?)
            "#,
        )
        .bind(celebration_id)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(KindredError::NotFound(format!(
                "Celebration {} not found",
                celebration_id
            )));
        }

        Ok(())
    }

    pub async fn list_for_person(
        &self,
        user_id: &str,
        person_id: &str,
    ) -> KindredResult<Vec<Celebration>> {
        fetch_owned_person(&self.db, user_id, person_id).await?;

        let celebrations = sqlx::query_as::<_, Celebration>(
            "SELECT * FROM celebration WHERE person_id = ? ORDER BY date, id",
        )
        .bind(person_id)
        .fetch_all(&self.db)
        .await?;

        Ok(celebrations)
    }

    /// Celebrations whose next occurrence falls within `window_days` of `from`,
    /// soonest first
    pub async fn upcoming(
        &self,
        user_id: &str,
        from: NaiveDate,
        window_days: i64,
    ) -> KindredResult<Vec<UpcomingCelebration>> {
        if !(0..=MAX_WINDOW_DAYS).contains(&window_days) {
            return Err(KindredError::Validation(format!(
                "Window must be between 0 and {} days",
                MAX_WINDOW_DAYS
            )));
        }
        let until = from
            .checked_add_signed(Duration::days(window_days))
            .ok_or_else(|| KindredError::Validation("Window extends past the supported calendar".to_string()))?;

        let rows = sqlx::query(
            r#"
            SELECT c.*, p.name AS person_name FROM celebration c
            JOIN person p ON p.id = c.person_id
            WHERE p.user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        let mut upcoming = Vec::new();
        for row in rows {
            let celebration = Celebration::from_row(&row)?;
            let next_occurrence = occurrence_on_or_after(celebration.date, celebration.recurrence, from);
            if next_occurrence < from || next_occurrence > until {
                continue;
            }

            upcoming.push(UpcomingCelebration {
                person_name: row.try_get("person_name")?,
                days_until: (next_occurrence - from).num_days(),
                next_occurrence,
                celebration,
            });
        }

        upcoming.sort_by(|a, b| {
            a.days_until
                .cmp(&b.days_until)
                .then_with(|| a.person_name.cmp(&b.person_name))
        });

        Ok(upcoming)
    }
}
