//! Database repository for role management operations.
//!
//! Provides role lookup by ID and resolution of the designated default role
//! assigned to users created through OAuth profile linking.
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::database::models::UserRole;

/// Repository for role database operations.
pub struct RoleRepository<'a> {
    /// Shared SQLite connection pool
    pool: &'a SqlitePool,
}

impl<'a> RoleRepository<'a> {
    /// Creates a new RoleRepository instance.
    ///
    /// # Arguments
    /// * `pool` - Reference to SQLite connection pool
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates a role with a fresh identifier.
    pub async fn create_role(
        &self,
        name: &str,
        is_default: bool,
        now: DateTime<Utc>,
    ) -> Result<UserRole> {
        let role = sqlx::query_as::<_, UserRole>(
            r#"
            INSERT INTO user_roles (id, name, is_default, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, name, is_default, created_at, updated_at
            "#,
        )
        .bind(Uuid::now_v7().to_string())
        .bind(name)
        .bind(is_default)
        .bind(now)
        .bind(now)
        .fetch_one(self.pool)
        .await?;

        Ok(role)
    }

    /// Retrieves a role by its unique identifier.
    ///
    /// # Returns
    /// `Some(UserRole)` if found, `None` otherwise
    pub async fn get_role_by_id(&self, id: &str) -> Result<Option<UserRole>> {
        let role = sqlx::query_as::<_, UserRole>(
            "SELECT id, name, is_default, created_at, updated_at FROM user_roles WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(role)
    }

    /// Retrieves the role flagged as default, if one is configured.
    pub async fn get_default_role(&self) -> Result<Option<UserRole>> {
        let role = sqlx::query_as::<_, UserRole>(
            r#"
            SELECT id, name, is_default, created_at, updated_at
            FROM user_roles WHERE is_default = 1
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .fetch_optional(self.pool)
        .await?;

        Ok(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_pool;

    #[tokio::test]
    async fn test_default_role_lookup() {
        let pool = test_pool().await;
        let repo = RoleRepository::new(&pool);
        assert!(repo.get_default_role().await.unwrap().is_none());

        let now = Utc::now();
        repo.create_role("admin", false, now).await.unwrap();
        let member = repo.create_role("member", true, now).await.unwrap();

        let default = repo.get_default_role().await.unwrap().unwrap();
        assert_eq!(default.id, member.id);
        assert_eq!(
            repo.get_role_by_id(&member.id).await.unwrap().unwrap().name,
            "member"
        );
    }
}
