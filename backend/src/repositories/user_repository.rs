//! Database repository for the local user directory.
//!
//! Provides lookups by email/id, sign-in bookkeeping and the race-safe insert
//! used by OAuth profile linking.

use crate::database::models::{CreateOAuthUser, User, UserStatus};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

const USER_COLUMNS: &str = "id, email, name, password_hash, avatar, role_id, status, \
     email_verified_at, last_sign_in_at, created_at, updated_at";

/// Fields for a password-backed directory record.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
    pub avatar: Option<String>,
    pub role_id: String,
    pub status: UserStatus,
}

/// Repository for user database operations.
///
/// Email is the directory's uniqueness key; every write path relies on the
/// `UNIQUE` constraint rather than on read-then-write checks.
pub struct UserRepository<'a> {
    /// Shared SQLite connection pool
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates a password-backed user.
    pub async fn create_user(&self, user: NewUser, now: DateTime<Utc>) -> Result<User> {
        let sql = format!(
            "INSERT INTO users (id, email, name, password_hash, avatar, role_id, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(&user.id)
            .bind(&user.email)
            .bind(&user.name)
            .bind(&user.password_hash)
            .bind(&user.avatar)
            .bind(&user.role_id)
            .bind(user.status)
            .bind(now)
            .bind(now)
            .fetch_one(self.pool)
            .await?;

        Ok(user)
    }

    /// Retrieves a user by their unique identifier.
    pub async fn get_user_by_id(&self, id: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(user)
    }

    /// Retrieves a user by their email.
    ///
    /// # Returns
    /// `Some(User)` if a directory record exists, `None` otherwise
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(self.pool)
            .await?;

        Ok(user)
    }

    /// Records a successful sign-in.
    pub async fn touch_last_sign_in(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE users SET last_sign_in_at = ?, updated_at = ? WHERE id = ?")
            .bind(at)
            .bind(at)
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Refreshes name/avatar from an OAuth profile and records the sign-in.
    /// A missing name keeps the stored one; a missing avatar clears it.
    pub async fn update_oauth_profile(
        &self,
        id: &str,
        name: Option<&str>,
        avatar: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE users SET name = COALESCE(?, name), avatar = ?, last_sign_in_at = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(name)
        .bind(avatar)
        .bind(at)
        .bind(at)
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Inserts an ACTIVE, email-verified user unless the email is already taken.
    ///
    /// # Returns
    /// `true` when this call created the record
    pub async fn insert_oauth_user_if_absent(
        &self,
        user: &CreateOAuthUser,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO users (id, email, name, password_hash, avatar, role_id, status,
                                email_verified_at, last_sign_in_at, created_at, updated_at)
             VALUES (?, ?, ?, '', ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (email) DO NOTHING",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.avatar)
        .bind(&user.role_id)
        .bind(UserStatus::Active)
        .bind(now)
        .bind(now)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Checks if an email already exists in the directory.
    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(self.pool)
            .await?;

        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_pool;
    use crate::repositories::role_repository::RoleRepository;

    #[tokio::test]
    async fn test_insert_oauth_user_is_idempotent_per_email() {
        let pool = test_pool().await;
        let now = Utc::now();
        let role = RoleRepository::new(&pool)
            .create_role("member", true, now)
            .await
            .unwrap();
        let repo = UserRepository::new(&pool);

        let first = CreateOAuthUser {
            id: "u-1".to_string(),
            email: "new@example.com".to_string(),
            name: Some("New".to_string()),
            avatar: None,
            role_id: role.id.clone(),
        };
        let second = CreateOAuthUser {
            id: "u-2".to_string(),
            ..first.clone()
        };

        assert!(repo.insert_oauth_user_if_absent(&first, now).await.unwrap());
        assert!(!repo.insert_oauth_user_if_absent(&second, now).await.unwrap());

        let stored = repo
            .get_user_by_email("new@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, "u-1");
        assert_eq!(stored.status, UserStatus::Active);
        assert!(stored.email_verified_at.is_some());
        assert!(repo.get_user_by_id("u-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_touch_last_sign_in() {
        let pool = test_pool().await;
        let now = Utc::now();
        let role = RoleRepository::new(&pool)
            .create_role("admin", false, now)
            .await
            .unwrap();
        let repo = UserRepository::new(&pool);
        let user = repo
            .create_user(
                NewUser {
                    id: "u-9".to_string(),
                    email: "ops@example.com".to_string(),
                    name: None,
                    password_hash: String::new(),
                    avatar: None,
                    role_id: role.id,
                    status: UserStatus::Pending,
                },
                now,
            )
            .await
            .unwrap();
        assert!(user.last_sign_in_at.is_none());
        assert!(repo.email_exists("ops@example.com").await.unwrap());

        repo.touch_last_sign_in(&user.id, now).await.unwrap();
        let reloaded = repo.get_user_by_id(&user.id).await.unwrap().unwrap();
        assert!(reloaded.last_sign_in_at.is_some());
    }
}
