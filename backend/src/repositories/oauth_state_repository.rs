//! Pending OAuth authorizations (CSRF state + PKCE verifier).

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::database::models::OAuthState;

pub struct OAuthStateRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> OAuthStateRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Records a pending authorization and drops every expired one.
    pub async fn store(
        &self,
        state: &str,
        provider: &str,
        pkce_verifier: &str,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let purged = sqlx::query("DELETE FROM oauth_states WHERE expires_at <= ?")
            .bind(now)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query(
            "INSERT INTO oauth_states (state, provider, pkce_verifier, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(state)
        .bind(provider)
        .bind(pkce_verifier)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        if purged > 0 {
            debug!(purged, "Expired OAuth states removed");
        }
        Ok(())
    }

    /// Consumes a state exactly once, returning its verifier if it has not expired.
    pub async fn take(&self, state: &str, provider: &str, now: DateTime<Utc>) -> Result<Option<String>> {
        let row = sqlx::query_as::<_, OAuthState>(
            "DELETE FROM oauth_states WHERE state = ? AND provider = ?
             RETURNING state, provider, pkce_verifier, expires_at",
        )
        .bind(state)
        .bind(provider)
        .fetch_optional(self.pool)
        .await?;

        Ok(row
            .filter(|pending| pending.expires_at > now)
            .map(|pending| pending.pkce_verifier))
    }
}
