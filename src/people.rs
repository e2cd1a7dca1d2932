/// People, identities and addresses
///
/// Every write validates and normalizes its input before touching the store.
/// Identity creation consults the dedup engine to flag (never merge) a person
/// that already owns the same phone number or email address.
use crate::{
    db::models::{Address, Celebration, Identity, IdentitySource, Person},
    dedup::{DedupEngine, MatchCondition},
    error::{KindredError, KindredResult},
    normalize::{is_valid_email, is_valid_phone, non_blank, normalize_email, normalize_phone},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use uuid::Uuid;

/// Person creation request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPerson {
    pub name: String,
    pub relationship: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub identities: Vec<NewIdentity>,
}

/// Raw contact channel as supplied by a caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewIdentity {
    pub source: IdentitySource,
    pub value: String,
}

impl NewIdentity {
    pub fn new(source: IdentitySource, value: impl Into<String>) -> Self {
        Self {
            source,
            value: value.into(),
        }
    }
}

/// Partial person update; a blank string clears an optional field
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonUpdate {
    pub name: Option<String>,
    pub relationship: Option<String>,
    pub notes: Option<String>,
}

/// Address creation request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewAddress {
    pub label: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

/// A person with its related collections loaded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonDetail {
    #[serde(flatten)]
    pub person: Person,
    pub identities: Vec<Identity>,
    pub addresses: Vec<Address>,
    pub celebrations: Vec<Celebration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonCreated {
    pub person: PersonDetail,
    /// Existing person sharing a phone or email with the new one
    pub possible_duplicate: Option<Person>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityCreated {
    pub identity: Identity,
    pub possible_duplicate: Option<Person>,
}

/// One entry of a device contact import
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportedContact {
    pub name: String,
    #[serde(default)]
    pub phones: Vec<String>,
    #[serde(default)]
    pub emails: Vec<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlaggedImport {
    pub person_id: String,
    pub possible_duplicate: Person,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportSummary {
    pub created: Vec<Person>,
    pub flagged: Vec<FlaggedImport>,
    /// Channels dropped because they failed validation
    pub skipped_channels: usize,
}

/// Identity after slot routing and normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub source: IdentitySource,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
}

/// Route a raw channel into its slot, validating and normalizing it
pub fn resolve_identity(input: &NewIdentity) -> KindredResult<ResolvedIdentity> {
    let value = input.value.trim();
    if value.is_empty() {
        return Err(KindredError::Validation("Identity value is required".to_string()));
    }

    let empty = ResolvedIdentity {
        source: input.source,
        phone: None,
        email: None,
        username: None,
    };

    match input.source {
        IdentitySource::Phone => {
            if !is_valid_phone(value) {
                return Err(KindredError::Validation("Invalid phone number".to_string()));
            }
            Ok(ResolvedIdentity {
                phone: Some(normalize_phone(value)),
                ..empty
            })
        }
        IdentitySource::Email => {
            if !is_valid_email(value) {
                return Err(KindredError::Validation("Invalid email address".to_string()));
            }
            Ok(ResolvedIdentity {
                email: Some(normalize_email(value)),
                ..empty
            })
        }
        IdentitySource::Instagram | IdentitySource::Facebook => {
            let handle = value.trim_start_matches('@').trim();
            if handle.is_empty() {
                return Err(KindredError::Validation("Username is required".to_string()));
            }
            Ok(ResolvedIdentity {
                username: Some(handle.to_string()),
                ..empty
            })
        }
        IdentitySource::Manual => {
            if is_valid_email(value) {
                Ok(ResolvedIdentity {
                    email: Some(normalize_email(value)),
                    ..empty
                })
            } else if is_valid_phone(value) {
                Ok(ResolvedIdentity {
                    phone: Some(normalize_phone(value)),
                    ..empty
                })
            } else {
                Ok(ResolvedIdentity {
                    username: Some(value.to_string()),
                    ..empty
                })
            }
        }
    }
}

/// Fetch a person, failing with NotFound unless `user_id` owns it
pub(crate) async fn fetch_owned_person<'e>(
    exec: impl SqliteExecutor<'e>,
    user_id: &str,
    person_id: &str,
) -> KindredResult<Person> {
    sqlx::query_as::<_, Person>("SELECT * FROM person WHERE id = ? AND user_id = ?")
        .bind(person_id)
        .bind(user_id)
        .fetch_optional(exec)
        .await?
        .ok_or_else(|| KindredError::NotFound(format!("Person {} not found", person_id)))
}

/// Load a person with identities, addresses and celebrations
pub(crate) async fn load_person_detail(
    db: &SqlitePool,
    user_id: &str,
    person_id: &str,
) -> KindredResult<PersonDetail> {
    let person = fetch_owned_person(db, user_id, person_id).await?;

    let identities = sqlx::query_as::<_, Identity>(
        "SELECT * FROM identity WHERE person_id = ? ORDER BY created_at, id",
    )
    .bind(person_id)
    .fetch_all(db)
    .await?;

    let addresses = sqlx::query_as::<_, Address>(
        "SELECT * FROM address WHERE person_id = ? ORDER BY created_at, id",
    )
    .bind(person_id)
    .fetch_all(db)
    .await?;

    let celebrations = sqlx::query_as::<_, Celebration>(
        "SELECT * FROM celebration WHERE person_id = ? ORDER BY date, id",
    )
    .bind(person_id)
    .fetch_all(db)
    .await?;

    Ok(PersonDetail {
        person,
        identities,
        addresses,
        celebrations,
    })
}

async fn insert_identity(
    conn: &mut SqliteConnection,
    person_id: &str,
    resolved: ResolvedIdentity,
    now: DateTime<Utc>,
) -> Result<Identity, sqlx::Error> {
    let identity = Identity {
        id: Uuid::new_v4().to_string(),
        person_id: person_id.to_string(),
        source: resolved.source,
        phone: resolved.phone,
        email: resolved.email,
        username: resolved.username,
        created_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO identity (id, person_id, source, phone, email, username, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&identity.id)
    .bind(&identity.person_id)
    .bind(identity.source)
    .bind(&identity.phone)
    .bind(&identity.email)
    .bind(&identity.username)
    .bind(identity.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(identity)
}

/// Match condition over the first phone and first email of a set of identities
fn condition_for(identities: &[ResolvedIdentity]) -> Option<MatchCondition> {
    let phone = identities.iter().find_map(|i| i.phone.as_deref());
    let email = identities.iter().find_map(|i| i.email.as_deref());
    MatchCondition::from_normalized(phone, email)
}

fn clean(value: Option<&str>) -> Option<String> {
    non_blank(value).map(str::to_string)
}

/// People manager
#[derive(Clone)]
pub struct PeopleManager {
    db: SqlitePool,
    dedup: DedupEngine,
}

impl PeopleManager {
    pub fn new(db: SqlitePool) -> Self {
        let dedup = DedupEngine::new(db.clone());
        Self { db, dedup }
    }

    /// Create a person with its initial identities.
    ///
    /// The duplicate check runs before the insert, so the new person never
    /// matches itself.
    pub async fn create_person(&self, user_id: &str, input: NewPerson) -> KindredResult<PersonCreated> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(KindredError::Validation("Name is required".to_string()));
        }

        let resolved = input
            .identities
            .iter()
            .map(resolve_identity)
            .collect::<KindredResult<Vec<_>>>()?;

        let possible_duplicate = match condition_for(&resolved) {
            Some(condition) => self.dedup.find_by_condition(user_id, &condition, None).await?,
            None => None,
        };

        let now = Utc::now();
        let person = Person {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            relationship: clean(input.relationship.as_deref()),
            notes: clean(input.notes.as_deref()),
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.db.begin().await?;
        let identities = match Self::insert_person(&mut tx, &person, resolved, now).await {
            Ok(identities) => identities,
            Err(e) => {
                tx.rollback().await.ok();
                return Err(KindredError::transaction(e));
            }
        };
        tx.commit().await.map_err(KindredError::transaction)?;

        if let Some(ref dup) = possible_duplicate {
            tracing::info!(person_id = %person.id, duplicate_of = %dup.id, "New person flagged as possible duplicate");
        }

        Ok(PersonCreated {
            person: PersonDetail {
                person,
                identities,
                addresses: Vec::new(),
                celebrations: Vec::new(),
            },
            possible_duplicate,
        })
    }

    async fn insert_person(
        conn: &mut SqliteConnection,
        person: &Person,
        identities: Vec<ResolvedIdentity>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Identity>, sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO person (id, user_id, name, relationship, notes, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&person.id)
        .bind(&person.user_id)
        .bind(&person.name)
        .bind(&person.relationship)
        .bind(&person.notes)
        .bind(person.created_at)
        .bind(person.updated_at)
        .execute(&mut *conn)
        .await?;

        let mut created = Vec::with_capacity(identities.len());
        for resolved in identities {
            created.push(insert_identity(conn, &person.id, resolved, now).await?);
        }

        Ok(created)
    }

    /// Get a person with related collections
    pub async fn get_person(&self, user_id: &str, person_id: &str) -> KindredResult<PersonDetail> {
        load_person_detail(&self.db, user_id, person_id).await
    }

    /// List a user's people by name
    pub async fn list_people(&self, user_id: &str) -> KindredResult<Vec<Person>> {
        let people = sqlx::query_as::<_, Person>(
            "SELECT * FROM person WHERE user_id = ? ORDER BY name COLLATE NOCASE, id",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(people)
    }

    /// Update name, relationship tag or notes
    pub async fn update_person(
        &self,
        user_id: &str,
        person_id: &str,
        update: PersonUpdate,
    ) -> KindredResult<Person> {
        let mut person = fetch_owned_person(&self.db, user_id, person_id).await?;

        if let Some(name) = update.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(KindredError::Validation("Name cannot be blank".to_string()));
            }
            person.name = name.to_string();
        }
        if let Some(relationship) = update.relationship {
            person.relationship = clean(Some(&relationship));
        }
        if let Some(notes) = update.notes {
            person.notes = clean(Some(&notes));
        }
        person.updated_at = Utc::now();

        sqlx::query(
            "UPDATE person SET name = ?, relationship = ?, notes = ?, updated_at = ? WHERE id = ? AND user_id = ?",
        )
        .bind(&person.name)
        .bind(&person.relationship)
        .bind(&person.notes)
        .bind(person.updated_at)
        .bind(person_id)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        Ok(person)
    }

    /// Delete a person.
    ///
    /// Identities, addresses, celebrations (and their reminders) cascade;
    /// event guest links are nulled by the store.
    pub async fn delete_person(&self, user_id: &str, person_id: &str) -> KindredResult<()> {
        let result = sqlx::query("DELETE FROM person WHERE id = ? AND user_id = ?")
            .bind(person_id)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(KindredError::NotFound(format!("Person {} not found", person_id)));
        }

        tracing::info!(person_id, "Deleted person");
        Ok(())
    }

    /// Attach a contact channel to a person, flagging a possible duplicate
    pub async fn add_identity(
        &self,
        user_id: &str,
        person_id: &str,
        input: NewIdentity,
    ) -> KindredResult<IdentityCreated> {
        let resolved = resolve_identity(&input)?;
        fetch_owned_person(&self.db, user_id, person_id).await?;

        let possible_duplicate = match condition_for(std::slice::from_ref(&resolved)) {
            Some(condition) => {
                self.dedup
                    .find_by_condition(user_id, &condition, Some(person_id))
                    .await?
            }
            None => None,
        };

        let mut conn = self.db.acquire().await?;
        let identity = insert_identity(&mut conn, person_id, resolved, Utc::now()).await?;

        Ok(IdentityCreated {
            identity,
            possible_duplicate,
        })
    }

    /// Remove one identity of a person
    pub async fn remove_identity(
        &self,
        user_id: &str,
        person_id: &str,
        identity_id: &str,
    ) -> KindredResult<()> {
        fetch_owned_person(&self.db, user_id, person_id).await?;

        let result = sqlx::query("DELETE FROM identity WHERE id = ? AND person_id = ?")
            .bind(identity_id)
            .bind(person_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(KindredError::NotFound(format!("Identity {} not found", identity_id)));
        }

        Ok(())
    }

    /// Add a postal address
    pub async fn add_address(
        &self,
        user_id: &str,
        person_id: &str,
        input: NewAddress,
    ) -> KindredResult<Address> {
        let address = Address {
            id: Uuid::new_v4().to_string(),
            person_id: person_id.to_string(),
            label: clean(input.label.as_deref()),
            street: clean(input.street.as_deref()),
            city: clean(input.city.as_deref()),
            postal_code: clean(input.postal_code.as_deref()),
            country: clean(input.country.as_deref()),
            created_at: Utc::now(),
        };

        if address.street.is_none()
            && address.city.is_none()
            && address.postal_code.is_none()
            && address.country.is_none()
        {
            return Err(KindredError::Validation("Address is empty".to_string()));
        }

        fetch_owned_person(&self.db, user_id, person_id).await?;

        sqlx::query(
            r#"
            INSERT INTO address (id, person_id, label, street, city, postal_code, country, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&address.id)
        .bind(&address.person_id)
        .bind(&address.label)
        .bind(&address.street)
        .bind(&address.city)
        .bind(&address.postal_code)
        .bind(&address.country)
        .bind(address.created_at)
        .execute(&self.db)
        .await?;

        Ok(address)
    }

    /// Remove an address
    pub async fn remove_address(
        &self,
        user_id: &str,
        person_id: &str,
        address_id: &str,
    ) -> KindredResult<()> {
        fetch_owned_person(&self.db, user_id, person_id).await?;

        let result = sqlx::query("DELETE FROM address WHERE id = ? AND person_id = ?")
            .bind(address_id)
            .bind(person_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(KindredError::NotFound(format!("Address {} not found", address_id)));
        }

        Ok(())
    }

    /// Import device contacts, one person per contact.
    ///
    /// Invalid channels are skipped rather than failing the import; contacts
    /// matching an existing person are created and reported as flagged.
    pub async fn import_contacts(
        &self,
        user_id: &str,
        contacts: Vec<ImportedContact>,
    ) -> KindredResult<ImportSummary> {
        let mut summary = ImportSummary::default();

        for contact in contacts {
            if contact.name.trim().is_empty() {
                summary.skipped_channels += contact.phones.len() + contact.emails.len();
                continue;
            }

            let mut identities = Vec::new();
            for phone in &contact.phones {
                if is_valid_phone(phone) {
                    identities.push(NewIdentity::new(IdentitySource::Phone, phone.as_str()));
                } else {
                    summary.skipped_channels += 1;
                }
            }
            for email in &contact.emails {
                if is_valid_email(email) {
                    identities.push(NewIdentity::new(IdentitySource::Email, email.as_str()));
                } else {
                    summary.skipped_channels += 1;
                }
            }

            let created = self
                .create_person(
                    user_id,
                    NewPerson {
                        name: contact.name,
                        relationship: None,
                        notes: contact.notes,
                        identities,
                    },
                )
                .await?;

            if let Some(dup) = created.possible_duplicate {
                summary.flagged.push(FlaggedImport {
                    person_id: created.person.person.id.clone(),
                    possible_duplicate: dup,
                });
            }
            summary.created.push(created.person.person);
        }

        tracing::info!(
            created = summary.created.len(),
            flagged = summary.flagged.len(),
            skipped = summary.skipped_channels,
            "Imported contacts"
        );

        Ok(summary)
    }
}
