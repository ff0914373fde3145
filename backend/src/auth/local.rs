//! Credential exchange backed by the local user directory.
//!
//! Password sign-in checks the stored bcrypt hash and the account status.
//! OAuth profile linking creates or refreshes a directory record from a
//! provider-verified profile, keyed by email.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::auth::exchange::CredentialExchange;
use crate::auth::models::{Credentials, Identity, LocalIdentity, OAuthProfile};
use crate::config::AuthMode;
use crate::database::models::{CreateOAuthUser, User, UserStatus};
use crate::errors::{AuthError, AuthResult};
use crate::repositories::role_repository::RoleRepository;
use crate::repositories::user_repository::UserRepository;

const ANONYMOUS_NAME: &str = "Anonymous";

pub struct LocalExchange {
    pool: SqlitePool,
}

impl LocalExchange {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Verifies email/password against the directory.
    pub async fn sign_in(&self, credentials: &Credentials) -> AuthResult<LocalIdentity> {
        let (Some(email), Some(password)) = (credentials.email(), credentials.password_value())
        else {
            return Err(AuthError::MissingCredentials);
        };

        let users = UserRepository::new(&self.pool);
        let Some(user) = users.get_user_by_email(email).await? else {
            warn!(email = %email, "Sign-in for unknown email");
            return Err(AuthError::UserNotFound);
        };

        if !verify_password(password, &user.password_hash).await? {
            warn!(user_id = %user.id, "Sign-in with incorrect password");
            return Err(AuthError::InvalidCredentials);
        }

        if user.status != UserStatus::Active {
            warn!(user_id = %user.id, status = %user.status, "Sign-in for inactive account");
            return Err(AuthError::AccountNotActive);
        }

        users.touch_last_sign_in(&user.id, Utc::now()).await?;
        let role_name = self.role_name(&user.role_id).await?;

        info!(user_id = %user.id, "Local sign-in succeeded");
        Ok(to_identity(user, role_name))
    }

    /// Creates or refreshes the directory record for a provider-verified profile.
    ///
    /// Email is the uniqueness key: concurrent first logins for the same email
    /// converge on a single record.
    pub async fn link_profile(&self, profile: OAuthProfile) -> AuthResult<LocalIdentity> {
        profile
            .validate()
            .map_err(|e| AuthError::validation(format!("Invalid OAuth profile: {e}")))?;

        let users = UserRepository::new(&self.pool);
        let now = Utc::now();

        if let Some(existing) = users.get_user_by_email(&profile.email).await? {
            users
                .update_oauth_profile(
                    &existing.id,
                    profile.name.as_deref(),
                    profile.picture.as_deref(),
                    now,
                )
                .await?;
            let role_name = self.role_name(&existing.role_id).await?;
            let user = User {
                name: profile.name.or(existing.name),
                avatar: profile.picture,
                ..existing
            };
            info!(user_id = %user.id, "OAuth profile linked to existing user");
            return Ok(to_identity(user, role_name));
        }

        let Some(default_role) = RoleRepository::new(&self.pool).get_default_role().await? else {
            error!(email = %profile.email, "No default role configured for OAuth sign-up");
            return Err(AuthError::NoDefaultRole);
        };

        let new_user = CreateOAuthUser {
            id: Uuid::now_v7().to_string(),
            email: profile.email.clone(),
            name: profile.name,
            avatar: profile.picture,
            role_id: default_role.id.clone(),
        };
        new_user
            .validate()
            .map_err(|e| AuthError::validation(format!("Invalid OAuth user: {e}")))?;

        let created = users.insert_oauth_user_if_absent(&new_user, now).await?;
        let user = users
            .get_user_by_email(&profile.email)
            .await?
            .ok_or_else(|| AuthError::internal("OAuth user missing after insert"))?;

        let role_name = if user.role_id == default_role.id {
            Some(default_role.name)
        } else {
            self.role_name(&user.role_id).await?
        };

        if created {
            info!(user_id = %user.id, "OAuth sign-up created user");
        } else {
            info!(user_id = %user.id, "OAuth sign-up raced an existing insert");
        }
        Ok(to_identity(user, role_name))
    }

    async fn role_name(&self, role_id: &str) -> AuthResult<Option<String>> {
        let role = RoleRepository::new(&self.pool).get_role_by_id(role_id).await?;
        Ok(role.map(|role| role.name))
    }
}

#[async_trait]
impl CredentialExchange for LocalExchange {
    fn mode(&self) -> AuthMode {
        AuthMode::Local
    }

    async fn authorize(&self, credentials: Credentials) -> AuthResult<Identity> {
        self.sign_in(&credentials).await.map(Identity::Local)
    }
}

fn to_identity(user: User, role_name: Option<String>) -> LocalIdentity {
    LocalIdentity {
        id: user.id,
        email: user.email,
        name: user
            .name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| ANONYMOUS_NAME.to_string()),
        status: user.status,
        role_id: user.role_id,
        role_name,
        avatar: user.avatar,
    }
}

/// Adaptive hash comparison off the async workers. Unusable hashes never match.
async fn verify_password(password: &str, hash: &str) -> AuthResult<bool> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
        .await
        .map_err(|e| AuthError::internal(format!("Password verification task failed: {e}")))
}
