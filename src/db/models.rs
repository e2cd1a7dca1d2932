/// Row models for the relationship store
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, FromRow, Row};

/// Account that owns people and hosts events
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub notifications_enabled: bool,
    pub digest_enabled: bool,
    /// Registered push delivery token (device)
    pub push_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A contact owned by exactly one user
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub relationship: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Where an identity came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdentitySource {
    Phone,
    Email,
    Instagram,
    Facebook,
    Manual,
}

/// A reachable channel attached to a person.
///
/// At most one of `phone`, `email`, `username` is populated. Phone and email
/// are always stored normalized.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub person_id: String,
    pub source: IdentitySource,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Postal address of a person
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Address {
    pub id: String,
    pub person_id: String,
    pub label: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CelebrationKind {
    Birthday,
    Anniversary,
    LifeEvent,
}

impl CelebrationKind {
    /// Birthdays and anniversaries repeat every year; life events never do
    pub fn recurrence(&self) -> Option<Recurrence> {
        match self {
            CelebrationKind::Birthday | CelebrationKind::Anniversary => Some(Recurrence::Yearly),
            CelebrationKind::LifeEvent => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CelebrationKind::Birthday => "birthday",
            CelebrationKind::Anniversary => "anniversary",
            CelebrationKind::LifeEvent => "life event",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recurrence {
    Yearly,
}

/// Birthday, anniversary or one-off life event of a person
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Celebration {
    pub id: String,
    pub person_id: String,
    pub kind: CelebrationKind,
    pub title: Option<String>,
    pub date: NaiveDate,
    pub recurrence: Option<Recurrence>,
    /// Whole days before the occurrence, descending
    pub reminder_offsets: Vec<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Celebration {
    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }
}

impl<'r> FromRow<'r, SqliteRow> for Celebration {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let offsets_json: String = row.try_get("reminder_offsets")?;
        let reminder_offsets =
            serde_json::from_str(&offsets_json).map_err(|e| sqlx::Error::ColumnDecode {
                index: "reminder_offsets".to_string(),
                source: Box::new(e),
            })?;

        Ok(Celebration {
            id: row.try_get("id")?,
            person_id: row.try_get("person_id")?,
            kind: row.try_get("kind")?,
            title: row.try_get("title")?,
            date: row.try_get("date")?,
            recurrence: row.try_get("recurrence")?,
            reminder_offsets,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Invite-only gathering hosted by a user
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub host_user_id: String,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub invite_token: String,
    pub invite_expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RsvpStatus {
    Pending,
    Accepted,
    Declined,
    Maybe,
}

/// Invitee of an event, linked to a person or identified by contact details
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct EventGuest {
    pub id: String,
    pub event_id: String,
    pub person_id: Option<String>,
    pub invited_email: Option<String>,
    pub invited_phone: Option<String>,
    pub invited_name: Option<String>,
    pub status: RsvpStatus,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Concrete delivery instant derived from a celebration or an event
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ScheduledReminder {
    pub id: String,
    pub user_id: String,
    pub celebration_id: Option<String>,
    pub event_id: Option<String>,
    pub scheduled_for: DateTime<Utc>,
    pub sent: bool,
    pub sent_at: Option<DateTime<Utc>>,
    /// False when processed but the notifier could not reach the user
    pub delivered: bool,
    pub created_at: DateTime<Utc>,
}
