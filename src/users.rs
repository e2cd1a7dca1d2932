/// User records and notification preferences
use crate::{
    db::models::User,
    error::{KindredError, KindredResult},
    normalize::{is_valid_email, normalize_email},
};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

/// User manager
#[derive(Clone)]
pub struct UserManager {
    db: SqlitePool,
}

impl UserManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a user
    pub async fn create_user(&self, email: &str, name: &str) -> KindredResult<User> {
        if !is_valid_email(email) {
            return Err(KindredError::Validation("Invalid email address".to_string()));
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(KindredError::Validation("Name is required".to_string()));
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            email: normalize_email(email),
            name: name.to_string(),
            notifications_enabled: true,
            digest_enabled: true,
            push_token: None,
            created_at: Utc::now(),
        };

        let result = sqlx::query(
            r#"
            INSERT INTO users (id, email, name, notifications_enabled, digest_enabled, push_token, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.notifications_enabled)
        .bind(user.digest_enabled)
        .bind(&user.push_token)
        .bind(user.created_at)
        .execute(&self.db)
        .await;

        match result {
            Ok(_) => Ok(user),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(
                KindredError::Validation("Email already registered".to_string()),
            ),
            Err(e) => Err(e.into()),
        }
    }

    /// Get a user by id
    pub async fn get_user(&self, user_id: &str) -> KindredResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(user)
    }

    /// Get a user or fail with NotFound
    pub async fn require_user(&self, user_id: &str) -> KindredResult<User> {
        self.get_user(user_id)
            .await?
            .ok_or_else(|| KindredError::NotFound("User not found".to_string()))
    }

    /// Users that want the weekly digest
    pub async fn list_digest_recipients(&self) -> KindredResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE digest_enabled = 1 ORDER BY created_at",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(users)
    }

    /// Toggle reminder notifications and the weekly digest
    pub async fn update_notification_settings(
        &self,
        user_id: &str,
        notifications_enabled: bool,
        digest_enabled: bool,
    ) -> KindredResult<User> {
        let result = sqlx::query(
            "UPDATE users SET notifications_enabled = ?, digest_enabled = ? WHERE id = ?",
        )
        .bind(notifications_enabled)
        .bind(digest_enabled)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(KindredError::NotFound("User not found".to_string()));
        }

        self.require_user(user_id).await
    }

    /// Register the device token reminders are pushed to
    pub async fn register_push_token(&self, user_id: &str, token: &str) -> KindredResult<()> {
        let token = token.trim();
        if token.is_empty() {
            return Err(KindredError::Validation("Push token cannot be empty".to_string()));
        }

        let result = sqlx::query("UPDATE users SET push_token = ? WHERE id = ?")
            .bind(token)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(KindredError::NotFound("User not found".to_string()));
        }

        tracing::debug!(user_id, "Registered push token");
        Ok(())
    }

    /// Forget the registered device token
    pub async fn clear_push_token(&self, user_id: &str) -> KindredResult<()> {
        sqlx::query("UPDATE users SET push_token = NULL WHERE id = ?")
            .bind(user_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_memory_pool;

    #[tokio::test]
    async fn test_create_and_get_user() {
        let manager = UserManager::new(create_memory_pool().await.unwrap());

        let user = manager.create_user(" Ana@Example.com ", "Ana").await.unwrap();
        assert_eq!(user.email, "ana@example.com");
        assert!(user.notifications_enabled);

        let loaded = manager.get_user(&user.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Ana");
        assert!(manager.get_user("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let manager = UserManager::new(create_memory_pool().await.unwrap());

        manager.create_user("ana@example.com", "Ana").await.unwrap();
        let err = manager.create_user("ANA@example.com", "Other").await.unwrap_err();
        assert!(matches!(err, KindredError::Validation(_)));
    }

    #[tokio::test]
    async fn test_push_token_and_settings() {
        let manager = UserManager::new(create_memory_pool().await.unwrap());
        let user = manager.create_user("ana@example.com", "Ana").await.unwrap();

        manager.register_push_token(&user.id, "ExponentPushToken[abc]").await.unwrap();
        let updated = manager
            .update_notification_settings(&user.id, false, true)
            .await
            .unwrap();
        assert_eq!(updated.push_token.as_deref(), Some("ExponentPushToken[abc]"));
        assert!(!updated.notifications_enabled);

        manager.clear_push_token(&user.id).await.unwrap();
        assert!(manager.require_user(&user.id).await.unwrap().push_token.is_none());

        assert!(matches!(
            manager.register_push_token("missing", "tok").await,
            Err(KindredError::NotFound(_))
        ));
    }
}
