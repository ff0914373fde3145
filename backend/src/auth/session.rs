//! The signed session and its transitions.
//!
//! A session is a JWT carrying a denormalized snapshot of the identity. It is
//! minted fresh on every login, re-minted on every explicit update and
//! projected onto a consumer-facing [`SessionView`] when read. In external
//! mode the view also exposes the backend token pair, company and language at
//! the top level so callers can attach them to outbound requests.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::models::{Identity, SessionUpdate};
use crate::config::{AuthMode, SESSION_MAX_AGE_SECONDS};
use crate::database::models::UserStatus;
use crate::errors::AuthResult;
use crate::utils::jwt::JwtUtils;

/// Payload of the signed session token.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<UserStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

impl std::fmt::Debug for SessionClaims {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClaims")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("status", &self.status)
            .field("role_name", &self.role_name)
            .field("has_access_token", &self.access_token.is_some())
            .field("exp", &self.exp)
            .finish_non_exhaustive()
    }
}

/// The "current user" as request handlers and front-ends see it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub status: Option<UserStatus>,
    #[serde(default)]
    pub role_id: Option<String>,
    #[serde(default)]
    pub role_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub user: SessionUser,
    pub expires: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SessionBridge {
    mode: AuthMode,
    jwt: JwtUtils,
    max_age: Duration,
}

impl SessionBridge {
    pub fn new(mode: AuthMode, secret: &str) -> Self {
        Self {
            mode,
            jwt: JwtUtils::new(secret),
            max_age: Duration::seconds(SESSION_MAX_AGE_SECONDS),
        }
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Login success: fresh claims from the identity, nothing carried over.
    pub fn establish(&self, identity: &Identity) -> SessionClaims {
        let claims = match identity {
            Identity::External(external) => SessionClaims {
                id: Some(external.id.clone()),
                userid: Some(external.userid.clone()),
                email: Some(external.email.clone()),
                name: Some(external.name.clone()),
                access_token: Some(external.access_token.clone()),
                refresh_token: external.refresh_token.clone(),
                company: external.company.clone(),
                lang: external.lang.clone(),
                ..SessionClaims::default()
            },
            Identity::Local(local) => SessionClaims {
                id: Some(local.id.clone()),
                email: Some(local.email.clone()),
                name: Some(local.name.clone()),
                avatar: local.avatar.clone(),
                status: Some(local.status),
                role_id: Some(local.role_id.clone()),
                role_name: local.role_name.clone(),
                ..SessionClaims::default()
            },
        };
        self.stamp(claims)
    }

    /// Explicit update: supplied fields win, authorization is not re-run.
    pub fn update(&self, claims: SessionClaims, update: SessionUpdate) -> SessionClaims {
        let SessionUpdate {
            id,
            userid,
            email,
            name,
            avatar,
            status,
            role_id,
            role_name,
            access_token,
            refresh_token,
            company,
            lang,
        } = update;

        let merged = SessionClaims {
            id: id.or(claims.id),
            userid: userid.or(claims.userid),
            email: email.or(claims.email),
            name: name.or(claims.name),
            avatar: avatar.or(claims.avatar),
            status: status.or(claims.status),
            role_id: role_id.or(claims.role_id),
            role_name: role_name.or(claims.role_name),
            access_token: access_token.or(claims.access_token),
            refresh_token: refresh_token.or(claims.refresh_token),
            company: company.or(claims.company),
            lang: lang.or(claims.lang),
            iat: claims.iat,
            exp: claims.exp,
        };
        self.stamp(merged)
    }

    /// Projects the session onto the consumer view. Session fields win over
    /// whatever `defaults` already carries.
    pub fn read(&self, claims: &SessionClaims, defaults: SessionUser) -> SessionView {
        let user = SessionUser {
            id: claims
                .id
                .clone()
                .or_else(|| claims.userid.clone())
                .or(defaults.id),
            email: claims.email.clone().or(defaults.email),
            name: claims.name.clone().or(defaults.name),
            avatar: claims.avatar.clone().or(defaults.avatar),
            status: claims.status.or(defaults.status),
            role_id: claims.role_id.clone().or(defaults.role_id),
            role_name: claims.role_name.clone().or(defaults.role_name),
        };
        let expires = DateTime::<Utc>::from_timestamp(claims.exp, 0)
            .map(|at| at.to_rfc3339())
            .unwrap_or_default();

        let mut view = SessionView {
            user,
            expires,
            access_token: None,
            refresh_token: None,
            company: None,
            lang: None,
        };
        if self.mode.is_external() {
            view.access_token = claims.access_token.clone();
            view.refresh_token = claims.refresh_token.clone();
            view.company = claims.company.clone();
            view.lang = claims.lang.clone();
        }
        view
    }

    pub fn sign(&self, claims: &SessionClaims) -> AuthResult<String> {
        self.jwt.encode(claims)
    }

    pub fn verify(&self, token: &str) -> AuthResult<SessionClaims> {
        self.jwt.decode(token)
    }

    fn stamp(&self, mut claims: SessionClaims) -> SessionClaims {
        let now = Utc::now();
        claims.iat = now.timestamp();
        claims.exp = (now + self.max_age).timestamp();
        claims
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::{ExternalIdentity, LocalIdentity};

    fn external_identity() -> Identity {
        Identity::External(ExternalIdentity {
            id: "42".to_string(),
            userid: "42".to_string(),
            email: "ahmet@example.com".to_string(),
            name: "Ahmet".to_string(),
            access_token: "acc-1".to_string(),
            refresh_token: Some("ref-1".to_string()),
            company: Some(Value::from("Acme")),
            lang: Some("tr".to_string()),
        })
    }

    fn local_identity() -> Identity {
        Identity::Local(LocalIdentity {
            id: "u-1".to_string(),
            email: "local@example.com".to_string(),
            name: "Local".to_string(),
            status: UserStatus::Active,
            role_id: "r-1".to_string(),
            role_name: Some("admin".to_string()),
            avatar: None,
        })
    }

    #[test]
    fn test_external_session_reads_back_every_field() {
        let bridge = SessionBridge::new(AuthMode::External, "secret");
        let claims = bridge.establish(&external_identity());
        let claims = bridge.update(
            claims,
            SessionUpdate {
                avatar: Some("https://example.com/a.png".to_string()),
                status: Some(UserStatus::Active),
                role_id: Some("r-9".to_string()),
                role_name: Some("buyer".to_string()),
                ..SessionUpdate::default()
            },
        );

        let token = bridge.sign(&claims).unwrap();
        let view = bridge.read(&bridge.verify(&token).unwrap(), SessionUser::default());

        assert_eq!(view.user.id.as_deref(), Some("42"));
        assert_eq!(view.user.email.as_deref(), Some("ahmet@example.com"));
        assert_eq!(view.user.name.as_deref(), Some("Ahmet"));
        assert_eq!(view.user.avatar.as_deref(), Some("https://example.com/a.png"));
        assert_eq!(view.user.status, Some(UserStatus::Active));
        assert_eq!(view.user.role_id.as_deref(), Some("r-9"));
        assert_eq!(view.user.role_name.as_deref(), Some("buyer"));
        assert_eq!(view.access_token.as_deref(), Some("acc-1"));
        assert_eq!(view.refresh_token.as_deref(), Some("ref-1"));
        assert_eq!(view.company, Some(Value::from("Acme")));
        assert_eq!(view.lang.as_deref(), Some("tr"));
    }

    #[test]
    fn test_login_overwrites_previous_identity() {
        let bridge = SessionBridge::new(AuthMode::Local, "secret");
        let external = bridge.establish(&external_identity());
        assert!(external.access_token.is_some());

        let local = bridge.establish(&local_identity());
        assert_eq!(local.id.as_deref(), Some("u-1"));
        assert!(local.access_token.is_none());
        assert!(local.company.is_none());
        assert_eq!(local.role_name.as_deref(), Some("admin"));
    }

    #[test]
    fn test_update_replaces_stale_fields_and_remints() {
        let bridge = SessionBridge::new(AuthMode::External, "secret");
        let mut claims = bridge.establish(&external_identity());
        claims.exp -= 100;
        let old_exp = claims.exp;

        let updated = bridge.update(
            claims,
            SessionUpdate {
                access_token: Some("acc-2".to_string()),
                name: Some("Ahmet Y.".to_string()),
                ..SessionUpdate::default()
            },
        );

        assert_eq!(updated.access_token.as_deref(), Some("acc-2"));
        assert_eq!(updated.name.as_deref(), Some("Ahmet Y."));
        assert_eq!(updated.refresh_token.as_deref(), Some("ref-1"));
        assert!(updated.exp > old_exp);
    }

    #[test]
    fn test_local_mode_hides_backend_tokens() {
        let bridge = SessionBridge::new(AuthMode::Local, "secret");
        let mut claims = bridge.establish(&local_identity());
        claims.access_token = Some("leak".to_string());

        let view = bridge.read(&claims, SessionUser::default());
        assert!(view.access_token.is_none());
        assert_eq!(view.user.status, Some(UserStatus::Active));
    }

    #[test]
    fn test_session_fields_win_over_defaults() {
        let bridge = SessionBridge::new(AuthMode::Local, "secret");
        let claims = bridge.establish(&local_identity());
        let defaults = SessionUser {
            name: Some("Stale".to_string()),
            avatar: Some("https://example.com/old.png".to_string()),
            ..SessionUser::default()
        };

        let view = bridge.read(&claims, defaults);
        assert_eq!(view.user.name.as_deref(), Some("Local"));
        assert_eq!(view.user.avatar.as_deref(), Some("https://example.com/old.png"));
    }

    #[test]
    fn test_tampered_session_is_rejected() {
        let bridge = SessionBridge::new(AuthMode::Local, "secret");
        let token = bridge.sign(&bridge.establish(&local_identity())).unwrap();
        let other = SessionBridge::new(AuthMode::Local, "another-secret");
        assert!(other.verify(&token).is_err());
    }
}
