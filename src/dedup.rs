/// Identity deduplication and person merge
///
/// Two people are considered the same contact only when they share a
/// normalized phone number or email address. Names are never compared.
use crate::{
    db::models::{Identity, Person},
    error::{KindredError, KindredResult},
    metrics,
    normalize::{non_blank, normalize_email, normalize_phone},
    people::{fetch_owned_person, load_person_detail, PersonDetail},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::{HashMap, HashSet};

/// Identity lookup predicate over normalized values
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchCondition {
    ByPhone(String),
    ByEmail(String),
    ByBoth { phone: String, email: String },
}

impl MatchCondition {
    /// Build a condition from raw caller input, normalizing both channels.
    ///
    /// Returns `None` when neither input carries a usable value.
    pub fn from_raw(phone: Option<&str>, email: Option<&str>) -> Option<Self> {
        let phone = non_blank(phone)
            .map(normalize_phone)
            .filter(|p| p.len() > 1);
        let email = non_blank(email).map(normalize_email);
        Self::build(phone, email)
    }

    /// Build a condition from values that are already canonical
    pub fn from_normalized(phone: Option<&str>, email: Option<&str>) -> Option<Self> {
        Self::build(phone.map(str::to_string), email.map(str::to_string))
    }

    fn build(phone: Option<String>, email: Option<String>) -> Option<Self> {
        match (phone, email) {
            (Some(phone), Some(email)) => Some(MatchCondition::ByBoth { phone, email }),
            (Some(phone), None) => Some(MatchCondition::ByPhone(phone)),
            (None, Some(email)) => Some(MatchCondition::ByEmail(email)),
            (None, None) => None,
        }
    }

    fn predicate(&self) -> &'static str {
        match self {
            MatchCondition::ByPhone(_) => "i.phone = ?",
            MatchCondition::ByEmail(_) => "i.email = ?",
            MatchCondition::ByBoth { .. } => "(i.phone = ? OR i.email = ?)",
        }
    }

    fn values(&self) -> Vec<&str> {
        match self {
            MatchCondition::ByPhone(phone) => vec![phone],
            MatchCondition::ByEmail(email) => vec![email],
            MatchCondition::ByBoth { phone, email } => vec![phone, email],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Phone,
    Email,
}

/// Two people that share a normalized channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateSuggestion {
    pub person1: Person,
    pub person2: Person,
    pub match_type: MatchType,
    pub match_value: String,
}

/// Normalized value -> person ids, in discovery order
#[derive(Default)]
struct ValueIndex {
    order: Vec<String>,
    persons: HashMap<String, Vec<String>>,
}

impl ValueIndex {
    fn insert(&mut self, value: &str, person_id: &str) {
        if !self.persons.contains_key(value) {
            self.order.push(value.to_string());
        }
        let entry = self.persons.entry(value.to_string()).or_default();
        if !entry.iter().any(|p| p == person_id) {
            entry.push(person_id.to_string());
        }
    }

    fn groups(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.order
            .iter()
            .map(move |value| (value.as_str(), self.persons[value].as_slice()))
    }
}

fn pair_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{}:{}", a, b)
    } else {
        format!("{}:{}", b, a)
    }
}

/// Dedup engine
#[derive(Clone)]
pub struct DedupEngine {
    db: SqlitePool,
}

impl DedupEngine {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Find the person owning a matching phone or email.
    ///
    /// Inputs are normalized first. Returns `None` when neither is supplied.
    pub async fn find_matching_person(
        &self,
        user_id: &str,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> KindredResult<Option<Person>> {
        match MatchCondition::from_raw(phone, email) {
            Some(condition) => self.find_by_condition(user_id, &condition, None).await,
            None => Ok(None),
        }
    }

    /// Owner of the earliest identity satisfying `condition`
    pub async fn find_by_condition(
        &self,
        user_id: &str,
        condition: &MatchCondition,
        exclude_person: Option<&str>,
    ) -> KindredResult<Option<Person>> {
        let exclusion = if exclude_person.is_some() {
            " AND p.id <> ?"
        } else {
            ""
        };
        let sql = format!(
            r#"
            SELECT p.* FROM identity i
            JOIN person p ON p.id = i.person_id
            WHERE p.user_id = ? AND {}{}
            ORDER BY i.created_at, i.id
            LIMIT 1
            "#,
            condition.predicate(),
            exclusion
        );

        let mut query = sqlx::query_as::<_, Person>(&sql).bind(user_id);
        for value in condition.values() {
            query = query.bind(value);
        }
        if let Some(excluded) = exclude_person {
            query = query.bind(excluded);
        }

        Ok(query.fetch_optional(&self.db).await?)
    }

    /// Every pair of the user's people sharing a phone or an email.
    ///
    /// A pair appears at most once per match type. Output is grouped by match
    /// type (phone first), then in discovery order.
    pub async fn get_suggested_duplicates(
        &self,
        user_id: &str,
    ) -> KindredResult<Vec<DuplicateSuggestion>> {
        let people = sqlx::query_as::<_, Person>(
            "SELECT * FROM person WHERE user_id = ? ORDER BY created_at, id",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        let identities = sqlx::query_as::<_, Identity>(
            r#"
            SELECT i.* FROM identity i
            JOIN person p ON p.id = i.person_id
            WHERE p.user_id = ?
            ORDER BY i.created_at, i.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        let by_id: HashMap<&str, &Person> = people.iter().map(|p| (p.id.as_str(), p)).collect();

        let mut phones = ValueIndex::default();
        let mut emails = ValueIndex::default();
        for identity in &identities {
            if let Some(ref phone) = identity.phone {
                phones.insert(phone, &identity.person_id);
            }
            if let Some(ref email) = identity.email {
                emails.insert(email, &identity.person_id);
            }
        }

        let mut suggestions = Vec::new();
        for (match_type, index) in [(MatchType::Phone, &phones), (MatchType::Email, &emails)] {
            let mut seen_pairs = HashSet::new();

            for (value, person_ids) in index.groups() {
                if person_ids.len() < 2 {
                    continue;
                }

                for (i, first) in person_ids.iter().enumerate() {
                    for second in &person_ids[i + 1..] {
                        if !seen_pairs.insert(pair_key(first, second)) {
                            continue;
                        }
                        if let (Some(p1), Some(p2)) = (by_id.get(first.as_str()), by_id.get(second.as_str())) {
                            suggestions.push(DuplicateSuggestion {
                                person1: (*p1).clone(),
                                person2: (*p2).clone(),
                                match_type,
                                match_value: value.to_string(),
                            });
                        }
                    }
                }
            }
        }

        metrics::record_duplicate_suggestions(suggestions.len());

        Ok(suggestions)
    }

    /// Merge `donor_id` into `survivor_id`.
    ///
    /// Identities, addresses, celebrations and event guest links move to the
    /// survivor and the donor is deleted, all in one transaction. Duplicate
    /// normalized values on both sides are kept as-is.
    pub async fn merge_people(
        &self,
        user_id: &str,
        survivor_id: &str,
        donor_id: &str,
    ) -> KindredResult<PersonDetail> {
        if survivor_id == donor_id {
            return Err(KindredError::Validation(
                "Cannot merge a person into itself".to_string(),
            ));
        }

        fetch_owned_person(&self.db, user_id, survivor_id).await?;
        fetch_owned_person(&self.db, user_id, donor_id).await?;

        let mut tx = self.db.begin().await?;
        let moved = match Self::repoint_and_delete(&mut tx, user_id, survivor_id, donor_id).await {
            Ok(moved) => moved,
            Err(e) => {
                tx.rollback().await.ok();
                tracing::warn!(survivor = %survivor_id, donor = %donor_id, error = %e, "Merge rolled back");
                return Err(e);
            }
        };
        tx.commit().await.map_err(KindredError::transaction)?;

        tracing::info!(
            survivor = %survivor_id,
            donor = %donor_id,
            rows_moved = moved,
            "Merged people"
        );
        metrics::record_merge();

        load_person_detail(&self.db, user_id, survivor_id).await
    }

    async fn repoint_and_delete(
        conn: &mut SqliteConnection,
        user_id: &str,
        survivor_id: &str,
        donor_id: &str,
    ) -> KindredResult<u64> {
        let mut moved = 0;

        for table in ["identity", "address", "celebration", "event_guest"] {
            let result = sqlx::query(&format!(
                "UPDATE {} SET person_id = ? WHERE person_id = ?",
                table
            ))
            .bind(survivor_id)
            .bind(donor_id)
            .execute(&mut *conn)
            .await
            .map_err(KindredError::transaction)?;
            moved += result.rows_affected();
        }

        sqlx::query("UPDATE person SET updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(survivor_id)
            .execute(&mut *conn)
            .await
            .map_err(KindredError::transaction)?;

        let deleted = sqlx::query("DELETE FROM person WHERE id = ? AND user_id = ?")
            .bind(donor_id)
            .bind(user_id)
            .execute(&mut *conn)
            .await
            .map_err(KindredError::transaction)?;

        // Lost a race with a concurrent delete or merge of the donor
        if deleted.rows_affected() != 1 {
            return Err(KindredError::Transaction(format!(
                "Person {} vanished during merge",
                donor_id
            )));
        }

        Ok(moved)
    }
}
