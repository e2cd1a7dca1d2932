/// Events, invite tokens, guests and RSVP
use crate::{
    config::EventConfig,
    db::models::{Event, EventGuest, RsvpStatus},
    error::{KindredError, KindredResult},
    normalize::{is_valid_email, is_valid_phone, non_blank, normalize_email, normalize_phone},
    people::fetch_owned_person,
    reminders::ReminderScheduler,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub location: Option<String>,
    pub description: Option<String>,
}

/// Partial event update; a blank string clears an optional field
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventUpdate {
    pub title: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub description: Option<String>,
}

/// A guest is either one of the host's people or bare contact details
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuestInput {
    pub person_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RsvpInput {
    pub status: RsvpStatus,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// What an invitee sees when opening an invite link
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct InviteView {
    pub event_id: String,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub host_name: String,
    pub invite_expires_at: DateTime<Utc>,
}

/// Generate a random URL-safe invite token (32 bytes of entropy)
pub fn generate_invite_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Validate and normalize optional contact channels
fn contact_channels(
    email: Option<&str>,
    phone: Option<&str>,
) -> KindredResult<(Option<String>, Option<String>)> {
    let email = match non_blank(email) {
        Some(raw) if is_valid_email(raw) => Some(normalize_email(raw)),
        Some(_) => return Err(KindredError::Validation("Invalid email address".to_string())),
        None => None,
    };
    let phone = match non_blank(phone) {
        Some(raw) if is_valid_phone(raw) => Some(normalize_phone(raw)),
        Some(_) => return Err(KindredError::Validation("Invalid phone number".to_string())),
        None => None,
    };
    Ok((email, phone))
}

fn clean(value: Option<&str>) -> Option<String> {
    non_blank(value).map(str::to_string)
}

/// Event manager
#[derive(Clone)]
pub struct EventManager {
    db: SqlitePool,
    reminders: ReminderScheduler,
    config: EventConfig,
}

impl EventManager {
    pub fn new(db: SqlitePool, reminders: ReminderScheduler, config: EventConfig) -> Self {
        Self {
            db,
            reminders,
            config,
        }
    }

    fn invite_expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::days(self.config.invite_ttl_days)
    }

    /// Create an event with a fresh invite token and its two reminders
    pub async fn create_event(&self, host_user_id: &str, input: NewEvent) -> KindredResult<Event> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(KindredError::Validation("Event title is required".to_string()));
        }

        let now = Utc::now();
        let event = Event {
            id: Uuid::new_v4().to_string(),
            host_user_id: host_user_id.to_string(),
            title: title.to_string(),
            starts_at: input.starts_at,
            location: clean(input.location.as_deref()),
            description: clean(input.description.as_deref()),
            invite_token: generate_invite_token(),
            invite_expires_at: self.invite_expiry(now),
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.db.begin().await?;
        if let Err(e) = self.insert_with_reminders(&mut tx, &event).await {
            tx.rollback().await.ok();
            return Err(KindredError::transaction(e));
        }
        tx.commit().await.map_err(KindredError::transaction)?;

        tracing::info!(event_id = %event.id, "Created event");
        Ok(event)
    }

    async fn insert_with_reminders(
        &self,
        conn: &mut SqliteConnection,
        event: &Event,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO event (id, host_user_id, title, starts_at, location, description,
                               invite_token, invite_expires_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&event.id)
        .bind(&event.host_user_id)
        .bind(&event.title)
        .bind(event.starts_at)
        .bind(&event.location)
        .bind(&event.description)
        .bind(&event.invite_token)
        .bind(event.invite_expires_at)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&mut *conn)
        .await?;

        self.reminders
            .replace_event_reminders(conn, &event.host_user_id, &event.id, event.starts_at)
            .await?;

        Ok(())
    }

    /// Get an event hosted by `host_user_id`
    pub async fn get_event(&self, host_user_id: &str, event_id: &str) -> KindredResult<Event> {
        sqlx::query_as::<_, Event>("SELECT * FROM event WHERE id = ? AND host_user_id = ?")
            .bind(event_id)
            .bind(host_user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| KindredError::NotFound(format!("Event {} not found", event_id)))
    }

    /// Host's events by start time
    pub async fn list_events(&self, host_user_id: &str) -> KindredResult<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(
            "SELECT * FROM event WHERE host_user_id = ? ORDER BY starts_at, id",
        )
        .bind(host_user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(events)
    }

    /// Update an event, rescheduling its reminders when the start time moves
    pub async fn update_event(
        &self,
        host_user_id: &str,
        event_id: &str,
        update: EventUpdate,
    ) -> KindredResult<Event> {
        let mut event = self.get_event(host_user_id, event_id).await?;
        let previous_start = event.starts_at;

        if let Some(title) = update.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(KindredError::Validation("Event title cannot be blank".to_string()));
            }
            event.title = title.to_string();
        }
        if let Some(starts_at) = update.starts_at {
            event.starts_at = starts_at;
        }
        if let Some(location) = update.location {
            event.location = clean(Some(&location));
        }
        if let Some(description) = update.description {
            event.description = clean(Some(&description));
        }
        event.updated_at = Utc::now();
        let reschedule = event.starts_at != previous_start;

        let mut tx = self.db.begin().await?;
        if let Err(e) = self.save_update(&mut tx, &event, reschedule).await {
            tx.rollback().await.ok();
            return Err(KindredError::transaction(e));
        }
        tx.commit().await.map_err(KindredError::transaction)?;

        Ok(event)
    }

    async fn save_update(
        &self,
        conn: &mut SqliteConnection,
        event: &Event,
        reschedule: bool,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE event SET title = ?, starts_at = ?, location = ?, description = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&event.title)
        .bind(event.starts_at)
        .bind(&event.location)
        .bind(&event.description)
        .bind(event.updated_at)
        .bind(&event.id)
        .execute(&mut *conn)
        .await?;

        if reschedule {
            self.reminders
                .replace_event_reminders(conn, &event.host_user_id, &event.id, event.starts_at)
                .await?;
        }

        Ok(())
    }

    /// Issue a new invite token; the old one stops working immediately
    pub async fn regenerate_invite_token(
        &self,
        host_user_id: &str,
        event_id: &str,
    ) -> KindredResult<Event> {
        let mut event = self.get_event(host_user_id, event_id).await?;

        let now = Utc::now();
        event.invite_token = generate_invite_token();
        event.invite_expires_at = self.invite_expiry(now);
        event.updated_at = now;

        sqlx::query(
            "UPDATE event SET invite_token = ?, invite_expires_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&event.invite_token)
        .bind(event.invite_expires_at)
        .bind(event.updated_at)
        .bind(&event.id)
        .execute(&self.db)
        .await?;

        tracing::info!(event_id, "Regenerated invite token");
        Ok(event)
    }

    /// Delete an event; guests and reminders cascade
    pub async fn delete_event(&self, host_user_id: &str, event_id: &str) -> KindredResult<()> {
        let result = sqlx::query("DELETE FROM event WHERE id = ? AND host_user_id = ?")
            .bind(event_id)
            .bind(host_user_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(KindredError::NotFound(format!("Event {} not found", event_id)));
        }

        Ok(())
    }

    /// Invite someone to an event
    pub async fn add_guest(
        &self,
        host_user_id: &str,
        event_id: &str,
        input: GuestInput,
    ) -> KindredResult<EventGuest> {
        let (invited_email, invited_phone) =
            contact_channels(input.email.as_deref(), input.phone.as_deref())?;
        let person_id = clean(input.person_id.as_deref());

        if person_id.is_none() && invited_email.is_none() && invited_phone.is_none() {
            return Err(KindredError::Validation(
                "A guest needs a person, an email or a phone number".to_string(),
            ));
        }

        self.get_event(host_user_id, event_id).await?;

        if let Some(ref person_id) = person_id {
            fetch_owned_person(&self.db, host_user_id, person_id).await?;

            let already: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM event_guest WHERE event_id = ? AND person_id = ?",
            )
            .bind(event_id)
            .bind(person_id)
            .fetch_one(&self.db)
            .await?;
            if already > 0 {
                return Err(KindredError::Validation("Person is already invited".to_string()));
            }
        }

        let guest = EventGuest {
            id: Uuid::new_v4().to_string(),
            event_id: event_id.to_string(),
            person_id,
            invited_email,
            invited_phone,
            invited_name: clean(input.name.as_deref()),
            status: RsvpStatus::Pending,
            responded_at: None,
            created_at: Utc::now(),
        };
        self.insert_guest(&guest).await?;

        Ok(guest)
    }

    async fn insert_guest(&self, guest: &EventGuest) -> KindredResult<()> {
        sqlx::query(
            r#"
            INSERT INTO event_guest (id, event_id, person_id, invited_email, invited_phone,
                                     invited_name, status, responded_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&guest.id)
        .bind(&guest.event_id)
        .bind(&guest.person_id)
        .bind(&guest.invited_email)
        .bind(&guest.invited_phone)
        .bind(&guest.invited_name)
        .bind(guest.status)
        .bind(guest.responded_at)
        .bind(guest.created_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    pub async fn list_guests(
        &self,
        host_user_id: &str,
        event_id: &str,
    ) -> KindredResult<Vec<EventGuest>> {
        self.get_event(host_user_id, event_id).await?;

        let guests = sqlx::query_as::<_, EventGuest>(
            "SELECT * FROM event_guest WHERE event_id = ? ORDER BY created_at, id",
        )
        .bind(event_id)
        .fetch_all(&self.db)
        .await?;

        Ok(guests)
    }

    /// Resolve an invite token.
    ///
    /// Unknown tokens are NotFound; tokens past their expiry are Expired.
    pub async fn get_invite(&self, token: &str, now: DateTime<Utc>) -> KindredResult<InviteView> {
        let invite = sqlx::query_as::<_, InviteView>(
            r#"
            SELECT e.id AS event_id, e.title, e.starts_at, e.location, e.description,
                   u.name AS host_name, e.invite_expires_at
            FROM event e
            JOIN users u ON u.id = e.host_user_id
            WHERE e.invite_token = ?
            "#,
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| KindredError::NotFound("Invite not found".to_string()))?;

        if invite.invite_expires_at <= now {
            return Err(KindredError::Expired("Invite link has expired".to_string()));
        }

        Ok(invite)
    }

    /// Record an RSVP through an invite link.
    ///
    /// An existing guest is matched on normalized email or phone, including
    /// guests linked to a person owning that channel. Otherwise a new guest
    /// is added.
    pub async fn respond_to_invite(
        &self,
        token: &str,
        input: RsvpInput,
        now: DateTime<Utc>,
    ) -> KindredResult<EventGuest> {
        if input.status == RsvpStatus::Pending {
            return Err(KindredError::Validation(
                "RSVP status must be ACCEPTED, DECLINED or MAYBE".to_string(),
            ));
        }
        let (email, phone) = contact_channels(input.email.as_deref(), input.phone.as_deref())?;
        let name = clean(input.name.as_deref());
        if email.is_none() && phone.is_none() && name.is_none() {
            return Err(KindredError::Validation(
                "Tell the host who you are: a name, email or phone".to_string(),
            ));
        }

        let invite = self.get_invite(token, now).await?;

        let existing = if email.is_some() || phone.is_some() {
            sqlx::query_as::<_, EventGuest>(
                r#"
                SELECT g.* FROM event_guest g
                WHERE g.event_id = ? AND (
                    g.invited_email = ? OR g.invited_phone = ?
                    OR g.person_id IN (
                        SELECT i.person_id FROM identity i WHERE i.email = ? OR i.phone = ?
                    )
                )
                ORDER BY g.created_at, g.id
                LIMIT 1
                "#,
            )
            .bind(&invite.event_id)
            .bind(&email)
            .bind(&phone)
            .bind(&email)
            .bind(&phone)
            .fetch_optional(&self.db)
            .await?
        } else {
            None
        };

        let guest = match existing {
            Some(mut guest) => {
                guest.status = input.status;
                guest.responded_at = Some(now);
                if guest.invited_name.is_none() {
                    guest.invited_name = name;
                }

                sqlx::query(
                    "UPDATE event_guest SET status = ?, responded_at = ?, invited_name = ? WHERE id = ?",
                )
                .bind(guest.status)
                .bind(guest.responded_at)
                .bind(&guest.invited_name)
                .bind(&guest.id)
                .execute(&self.db)
                .await?;

                guest
            }
            None => {
                let guest = EventGuest {
                    id: Uuid::new_v4().to_string(),
                    event_id: invite.event_id.clone(),
                    person_id: None,
                    invited_email: email,
                    invited_phone: phone,
                    invited_name: name,
                    status: input.status,
                    responded_at: Some(now),
                    created_at: now,
                };
                self.insert_guest(&guest).await?;
                guest
            }
        };

        tracing::info!(event_id = %invite.event_id, guest_id = %guest.id, status = ?guest.status, "RSVP recorded");
        Ok(guest)
    }

    /// Number of accepted guests per event
    pub async fn accepted_count(&self, event_id: &str) -> KindredResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM event_guest WHERE event_id = ? AND status = 'ACCEPTED'",
        )
        .bind(event_id)
        .fetch_one(&self.db)
        .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ReminderConfig,
        db::{create_memory_pool, models::IdentitySource},
        notifier::{MailNotifier, Notifier},
        people::{NewIdentity, NewPerson, PeopleManager},
        users::UserManager,
    };
    use std::sync::Arc;

    struct Fixture {
        events: EventManager,
        reminders: ReminderScheduler,
        people: PeopleManager,
        users: UserManager,
        host_id: String,
    }

    async fn setup() -> Fixture {
        let db = create_memory_pool().await.unwrap();
        let users = UserManager::new(db.clone());
        let host = users.create_user("host@example.com", "Host").await.unwrap();

        let notifier: Arc<dyn Notifier> = Arc::new(MailNotifier::new(None).unwrap());
        let reminders = ReminderScheduler::new(db.clone(), ReminderConfig::default(), notifier);

        Fixture {
            events: EventManager::new(db.clone(), reminders.clone(), EventConfig::default()),
            reminders,
            people: PeopleManager::new(db),
            users,
            host_id: host.id,
        }
    }

    fn party(starts_at: DateTime<Utc>) -> NewEvent {
        NewEvent {
            title: "Housewarming".to_string(),
            starts_at,
            location: Some("Our place".to_string()),
            description: None,
        }
    }

    #[test]
    fn test_invite_tokens_are_url_safe_and_unique() {
        let a = generate_invite_token();
        let b = generate_invite_token();

        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_create_event_schedules_two_reminders() {
        let fx = setup().await;
        let starts_at = Utc::now() + Duration::days(10);

        let event = fx.events.create_event(&fx.host_id, party(starts_at)).await.unwrap();
        assert!(event.invite_expires_at > Utc::now() + Duration::days(29));

        let reminders = fx.reminders.list_for_event(&event.id).await.unwrap();
        assert_eq!(reminders.len(), 2);
        assert!(reminders.iter().any(|r| r.scheduled_for == starts_at - Duration::hours(1)));

        assert!(matches!(
            fx.events
                .create_event(&fx.host_id, NewEvent { title: " ".to_string(), ..party(starts_at) })
                .await,
            Err(KindredError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_update_event_reschedules_on_new_start() {
        let fx = setup().await;
        let starts_at = Utc::now() + Duration::days(10);
        let event = fx.events.create_event(&fx.host_id, party(starts_at)).await.unwrap();
        let before = fx.reminders.list_for_event(&event.id).await.unwrap();

        let moved = starts_at + Duration::days(2);
        fx.events
            .update_event(
                &fx.host_id,
                &event.id,
                EventUpdate {
                    starts_at: Some(moved),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let after = fx.reminders.list_for_event(&event.id).await.unwrap();
        assert_eq!(after.len(), 2);
        assert!(after.iter().all(|r| before.iter().all(|b| b.id != r.id)));
        assert!(after.iter().any(|r| r.scheduled_for == moved - Duration::hours(1)));
    }

    #[tokio::test]
    async fn test_invite_lifecycle() {
        let fx = setup().await;
        let event = fx
            .events
            .create_event(&fx.host_id, party(Utc::now() + Duration::days(3)))
            .await
            .unwrap();

        let invite = fx.events.get_invite(&event.invite_token, Utc::now()).await.unwrap();
        assert_eq!(invite.host_name, "Host");

        assert!(matches!(
            fx.events
                .get_invite(&event.invite_token, Utc::now() + Duration::days(31))
                .await,
            Err(KindredError::Expired(_))
        ));

        let renewed = fx.events.regenerate_invite_token(&fx.host_id, &event.id).await.unwrap();
        assert_ne!(renewed.invite_token, event.invite_token);
        assert!(matches!(
            fx.events.get_invite(&event.invite_token, Utc::now()).await,
            Err(KindredError::NotFound(_))
        ));
        assert!(fx.events.get_invite(&renewed.invite_token, Utc::now()).await.is_ok());
    }

    #[tokio::test]
    async fn test_rsvp_matches_existing_guest() {
        let fx = setup().await;
        let event = fx
            .events
            .create_event(&fx.host_id, party(Utc::now() + Duration::days(3)))
            .await
            .unwrap();

        let guest = fx
            .events
            .add_guest(
                &fx.host_id,
                &event.id,
                GuestInput {
                    email: Some("Sam@Example.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(guest.invited_email.as_deref(), Some("sam@example.com"));

        let responded = fx
            .events
            .respond_to_invite(
                &event.invite_token,
                RsvpInput {
                    status: RsvpStatus::Accepted,
                    name: Some("Sam".to_string()),
                    email: Some(" SAM@example.com".to_string()),
                    phone: None,
                },
                Utc::now(),
            )
            .await
            .unwrap();

        assert_eq!(responded.id, guest.id);
        assert_eq!(responded.status, RsvpStatus::Accepted);
        assert!(responded.responded_at.is_some());
        assert_eq!(fx.events.list_guests(&fx.host_id, &event.id).await.unwrap().len(), 1);
        assert_eq!(fx.events.accepted_count(&event.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rsvp_matches_linked_person_by_identity() {
        let fx = setup().await;
        let event = fx
            .events
            .create_event(&fx.host_id, party(Utc::now() + Duration::days(3)))
            .await
            .unwrap();
        let maya = fx
            .people
            .create_person(
                &fx.host_id,
                NewPerson {
                    name: "Maya".to_string(),
                    identities: vec![NewIdentity::new(IdentitySource::Phone, "5551234567")],
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .person
            .person;

        let guest = fx
            .events
            .add_guest(
                &fx.host_id,
                &event.id,
                GuestInput {
                    person_id: Some(maya.id.clone()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let responded = fx
            .events
            .respond_to_invite(
                &event.invite_token,
                RsvpInput {
                    status: RsvpStatus::Maybe,
                    name: None,
                    email: None,
                    phone: Some("(555) 123-4567".to_string()),
                },
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(responded.id, guest.id);
        assert_eq!(responded.person_id.as_deref(), Some(maya.id.as_str()));
    }

    #[tokio::test]
    async fn test_rsvp_adds_unknown_guest_and_rejects_pending() {
        let fx = setup().await;
        let event = fx
            .events
            .create_event(&fx.host_id, party(Utc::now() + Duration::days(3)))
            .await
            .unwrap();

        let err = fx
            .events
            .respond_to_invite(
                &event.invite_token,
                RsvpInput {
                    status: RsvpStatus::Pending,
                    name: Some("Lee".to_string()),
                    email: None,
                    phone: None,
                },
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, KindredError::Validation(_)));

        let added = fx
            .events
            .respond_to_invite(
                &event.invite_token,
                RsvpInput {
                    status: RsvpStatus::Declined,
                    name: Some("Lee".to_string()),
                    email: None,
                    phone: None,
                },
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(added.status, RsvpStatus::Declined);
        assert_eq!(added.invited_name.as_deref(), Some("Lee"));
    }

    #[tokio::test]
    async fn test_guests_must_belong_to_host() {
        let fx = setup().await;
        let stranger = fx.users.create_user("stranger@example.com", "Stranger").await.unwrap();
        let theirs = fx
            .people
            .create_person(&stranger.id, NewPerson { name: "Theirs".to_string(), ..Default::default() })
            .await
            .unwrap()
            .person
            .person;
        let event = fx
            .events
            .create_event(&fx.host_id, party(Utc::now() + Duration::days(3)))
            .await
            .unwrap();

        assert!(matches!(
            fx.events
                .add_guest(
                    &fx.host_id,
                    &event.id,
                    GuestInput {
                        person_id: Some(theirs.id),
                        ..Default::default()
                    },
                )
                .await,
            Err(KindredError::NotFound(_))
        ));
        assert!(matches!(
            fx.events.get_event(&stranger.id, &event.id).await,
            Err(KindredError::NotFound(_))
        ));
        assert!(matches!(
            fx.events.add_guest(&fx.host_id, &event.id, GuestInput::default()).await,
            Err(KindredError::Validation(_))
        ));
    }
}
