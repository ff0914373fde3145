//! The auth cache and its async operations.
//!
//! Operations run one at a time behind a FIFO lock. Every login, logout and
//! `clear_auth` bumps a generation counter; login and refresh results are
//! dropped if the generation moved while they were in flight. `clear_auth`
//! also cancels whatever is in flight.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::reducer::{AuthAction, reduce};
use super::registrar::{SessionRegistrar, SessionRegistration};
use super::state::{AuthState, CachedUser};
use crate::auth::external::ExternalExchange;
use crate::auth::models::{Credentials, ExternalIdentity};
use crate::client::ApiClient;
use crate::client::http::HttpError;
use crate::errors::{AuthError, AuthResult, ProfileFetchError};
use crate::utils::non_empty;

#[derive(Debug, Clone)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub remember_me: bool,
    pub device: String,
    pub device_id: Option<String>,
}

impl LoginForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            remember_me: true,
            device: "web".to_string(),
            device_id: None,
        }
    }
}

#[derive(Debug)]
pub enum ProfileFetch {
    Loaded,
    /// The login still succeeded with the minimal identity.
    Degraded(ProfileFetchError),
}

#[derive(Debug)]
pub struct LoginOutcome {
    pub user: CachedUser,
    pub access_token: String,
    pub profile: ProfileFetch,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Applied { access_token: String },
    /// A login, logout or clear happened meanwhile; nothing was applied.
    Discarded,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Skipped,
    Done,
    Failed(String),
}

/// What happened remotely during a logout. Locally the cache is always cleared.
#[derive(Debug, Clone, PartialEq)]
pub struct LogoutOutcome {
    pub remote: StepOutcome,
    pub bridge: StepOutcome,
}

pub struct AuthStore {
    exchange: ExternalExchange,
    registrar: Arc<dyn SessionRegistrar>,
    state: Mutex<AuthState>,
    op_lock: tokio::sync::Mutex<()>,
    generation: AtomicU64,
    cancel: Mutex<CancellationToken>,
}

impl AuthStore {
    pub fn new(exchange: ExternalExchange, registrar: Arc<dyn SessionRegistrar>) -> Self {
        Self {
            exchange,
            registrar,
            state: Mutex::new(AuthState::default()),
            op_lock: tokio::sync::Mutex::new(()),
            generation: AtomicU64::new(0),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Copy of the current state for rendering.
    pub fn snapshot(&self) -> AuthState {
        self.state().clone()
    }

    pub async fn login_with_password(&self, form: LoginForm) -> AuthResult<LoginOutcome> {
        let _op = self.op_lock.lock().await;
        let generation = self.advance_generation();
        let cancel = self.operation_token();
        self.dispatch(AuthAction::LoginStarted);

        match self.run_login(form, generation, &cancel).await {
            Ok(outcome) if self.is_current(generation) => {
                self.dispatch(AuthAction::LoginSucceeded {
                    user: outcome.user.clone(),
                    access_token: outcome.access_token.clone(),
                });
                Ok(outcome)
            }
            Ok(_) => Err(HttpError::Cancelled.into()),
            Err(e) => {
                if self.is_current(generation) {
                    self.dispatch(AuthAction::LoginFailed {
                        message: Some(e.message()),
                    });
                }
                Err(e)
            }
        }
    }

    async fn run_login(
        &self,
        form: LoginForm,
        generation: u64,
        cancel: &CancellationToken,
    ) -> AuthResult<LoginOutcome> {
        let credentials = Credentials {
            email: Some(form.email),
            password: Some(form.password),
            remember_me: Some(form.remember_me),
            device: Some(form.device),
            device_id: form.device_id,
            ..Credentials::default()
        };
        let identity = self
            .exchange
            .login(credentials, Some(cancel.clone()))
            .await?;

        if !self.is_current(generation) {
            return Err(HttpError::Cancelled.into());
        }
        self.registrar
            .register(
                SessionRegistration {
                    email: Some(identity.email.clone()),
                    access_token: identity.access_token.clone(),
                    name: Some(identity.name.clone()),
                    userid: Some(identity.userid.clone()),
                },
                Some(cancel.clone()),
            )
            .await?;

        let (user, profile) = match self.fetch_profile(&identity.access_token, cancel).await {
            Ok(user) => (user, ProfileFetch::Loaded),
            Err(e) => {
                warn!(error = %e, "Profile fetch failed, using login identity");
                (minimal_user(&identity), ProfileFetch::Degraded(e))
            }
        };

        info!(userid = %identity.userid, "Login completed");
        Ok(LoginOutcome {
            user,
            access_token: identity.access_token,
            profile,
        })
    }

    async fn fetch_profile(
        &self,
        access_token: &str,
        cancel: &CancellationToken,
    ) -> Result<CachedUser, ProfileFetchError> {
        let data = self
            .client()
            .get_me(access_token, Some(cancel.clone()))
            .await?;
        let profile = data
            .get("profile")
            .filter(|profile| profile.is_object())
            .cloned()
            .ok_or(ProfileFetchError::MissingProfile)?;
        Ok(serde_json::from_value(profile)?)
    }

    /// Mints a new access token from the refresh cookie and re-registers it
    /// with the bridge. Never changes `status`.
    pub async fn refresh_session(&self) -> AuthResult<RefreshOutcome> {
        let _op = self.op_lock.lock().await;
        let generation = self.current_generation();
        let cancel = self.operation_token();

        let refreshed = self
            .client()
            .refresh_access_token(Some(cancel.clone()))
            .await?;
        let access_token = refreshed
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::RefreshTokenMissing)?;

        if !self.is_current(generation) {
            debug!("Refresh result discarded before registration");
            return Ok(RefreshOutcome::Discarded);
        }

        let user = self.snapshot().user.unwrap_or_default();
        self.registrar
            .register(
                SessionRegistration {
                    email: user.email,
                    access_token: access_token.clone(),
                    name: user.name,
                    userid: user.id,
                },
                Some(cancel),
            )
            .await?;

        if !self.is_current(generation) {
            debug!("Refresh result discarded after registration");
            return Ok(RefreshOutcome::Discarded);
        }

        self.dispatch(AuthAction::TokenRefreshed {
            access_token: access_token.clone(),
        });
        Ok(RefreshOutcome::Applied { access_token })
    }

    /// Signs out remotely on a best-effort basis, then always clears locally.
    pub async fn perform_logout(&self) -> LogoutOutcome {
        let _op = self.op_lock.lock().await;
        self.advance_generation();
        let cancel = self.operation_token();

        let remote = match self.snapshot().access_token {
            Some(token) => match self
                .client()
                .logout_request(&token, Some(cancel.clone()))
                .await
            {
                Ok(()) => StepOutcome::Done,
                Err(e) => {
                    warn!(error = %e, "Remote logout failed");
                    StepOutcome::Failed(e.to_string())
                }
            },
            None => StepOutcome::Skipped,
        };

        let bridge = match self.registrar.clear(Some(cancel)).await {
            Ok(()) => StepOutcome::Done,
            Err(e) => {
                warn!(error = %e, "Bridge sign-out failed");
                StepOutcome::Failed(e.message())
            }
        };

        self.dispatch(AuthAction::LoggedOut);
        info!("Logged out");
        LogoutOutcome { remote, bridge }
    }

    /// Forced local sign-out. No network calls; in-flight operations are
    /// cancelled and their results dropped.
    pub fn clear_auth(&self) {
        self.advance_generation();
        {
            let mut cancel = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
            cancel.cancel();
            *cancel = CancellationToken::new();
        }
        self.dispatch(AuthAction::Cleared);
    }

    fn client(&self) -> &ApiClient {
        self.exchange.client()
    }

    fn dispatch(&self, action: AuthAction) {
        reduce(&mut self.state(), action);
    }

    fn state(&self) -> MutexGuard<'_, AuthState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn operation_token(&self) -> CancellationToken {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .child_token()
    }

    fn advance_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.current_generation() == generation
    }
}

fn minimal_user(identity: &ExternalIdentity) -> CachedUser {
    CachedUser {
        id: Some(identity.userid.clone()),
        email: Some(identity.email.clone()),
        name: non_empty(Some(identity.name.as_str())).map(str::to_string),
        ..CachedUser::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::AuthStatus;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct RecordingRegistrar {
        registrations: Mutex<Vec<SessionRegistration>>,
        clears: AtomicU64,
    }

    #[async_trait::async_trait]
    impl SessionRegistrar for RecordingRegistrar {
        async fn register(
            &self,
            registration: SessionRegistration,
            _cancel: Option<CancellationToken>,
        ) -> AuthResult<()> {
            self.registrations.lock().unwrap().push(registration);
            Ok(())
        }

        async fn clear(&self, _cancel: Option<CancellationToken>) -> AuthResult<()> {
            self.clears.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn store_for(server: &MockServer) -> (Arc<AuthStore>, Arc<RecordingRegistrar>) {
        let registrar = Arc::new(RecordingRegistrar::default());
        let exchange = ExternalExchange::new(ApiClient::new(server.uri()).unwrap());
        let store = Arc::new(AuthStore::new(exchange, registrar.clone()));
        (store, registrar)
    }

    async fn mount_login(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": {
                    "accessToken": "acc-1",
                    "refreshToken": "ref-1",
                    "userid": "42",
                    "info": { "name": "Ahmet" }
                }
            })))
            .mount(server)
            .await;
    }

    async fn mount_refresh(server: &MockServer, token: &str) {
        Mock::given(method("POST"))
            .and(path("/auth/refresh-token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "data": { "accessToken": token } })),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_login_registers_and_loads_profile() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("GET"))
            .and(path("/profile/me"))
            .and(header("authorization", "Bearer acc-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "profile": { "id": 42, "email": "ahmet@example.com", "name": "Ahmet", "phone": "555" } }
            })))
            .mount(&server)
            .await;

        let (store, registrar) = store_for(&server);
        let outcome = store
            .login_with_password(LoginForm::new("ahmet@example.com", "secret"))
            .await
            .unwrap();

        assert!(matches!(outcome.profile, ProfileFetch::Loaded));
        assert_eq!(outcome.user.id.as_deref(), Some("42"));
        assert_eq!(outcome.user.extra["phone"], "555");

        let state = store.snapshot();
        assert_eq!(state.status, AuthStatus::Succeeded);
        assert_eq!(state.access_token.as_deref(), Some("acc-1"));

        let registrations = registrar.registrations.lock().unwrap();
        assert_eq!(registrations.len(), 1);
        assert_eq!(registrations[0].access_token, "acc-1");
        assert_eq!(registrations[0].userid.as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn test_profile_failure_degrades_login() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("GET"))
            .and(path("/profile/me"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (store, _registrar) = store_for(&server);
        let outcome = store
            .login_with_password(LoginForm::new("ahmet@example.com", "secret"))
            .await
            .unwrap();

        assert!(matches!(
            outcome.profile,
            ProfileFetch::Degraded(ProfileFetchError::Request(_))
        ));
        assert_eq!(outcome.user.email.as_deref(), Some("ahmet@example.com"));
        assert_eq!(outcome.user.name.as_deref(), Some("Ahmet"));
        assert_eq!(store.snapshot().status, AuthStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_rejected_login_fails_with_backend_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "success": false, "message": "Locked" })),
            )
            .mount(&server)
            .await;

        let (store, registrar) = store_for(&server);
        let err = store
            .login_with_password(LoginForm::new("ahmet@example.com", "secret"))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::LoginRejected { .. }));
        let state = store.snapshot();
        assert_eq!(state.status, AuthStatus::Failed);
        assert_eq!(state.error.as_deref(), Some("Locked"));
        assert!(registrar.registrations.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_refresh_only_touches_token() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        mount_refresh(&server, "acc-2").await;

        let (store, registrar) = store_for(&server);
        store
            .login_with_password(LoginForm::new("ahmet@example.com", "secret"))
            .await
            .unwrap();
        let before = store.snapshot();

        for _ in 0..2 {
            let outcome = store.refresh_session().await.unwrap();
            assert_eq!(
                outcome,
                RefreshOutcome::Applied {
                    access_token: "acc-2".to_string()
                }
            );
        }

        let after = store.snapshot();
        assert_eq!(after.status, before.status);
        assert_eq!(after.user, before.user);
        assert_eq!(after.access_token.as_deref(), Some("acc-2"));

        let registrations = registrar.registrations.lock().unwrap();
        assert_eq!(registrations.len(), 3);
        assert_eq!(registrations[2].email.as_deref(), Some("ahmet@example.com"));
        assert_eq!(registrations[2].userid.as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn test_refresh_without_token_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
            .mount(&server)
            .await;

        let (store, _registrar) = store_for(&server);
        let err = store.refresh_session().await.unwrap_err();

        assert!(matches!(err, AuthError::RefreshTokenMissing));
        assert_eq!(err.message(), "accessToken missing");
        assert_eq!(store.snapshot().status, AuthStatus::Idle);
    }

    #[tokio::test]
    async fn test_logout_clears_even_when_remote_fails() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("POST"))
            .and(path("/auth/logout"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "boom" })))
            .mount(&server)
            .await;

        let (store, registrar) = store_for(&server);
        store
            .login_with_password(LoginForm::new("ahmet@example.com", "secret"))
            .await
            .unwrap();

        let outcome = store.perform_logout().await;
        assert_eq!(outcome.remote, StepOutcome::Failed("boom".to_string()));
        assert_eq!(outcome.bridge, StepOutcome::Done);
        assert_eq!(registrar.clears.load(Ordering::SeqCst), 1);

        let state = store.snapshot();
        assert!(state.user.is_none());
        assert!(state.access_token.is_none());
        assert_eq!(state.status, AuthStatus::Idle);
    }

    #[tokio::test]
    async fn test_logout_without_token_skips_remote_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/logout"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let (store, _registrar) = store_for(&server);
        let outcome = store.perform_logout().await;
        assert_eq!(outcome.remote, StepOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_clear_auth_cancels_in_flight_refresh() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh-token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "data": { "accessToken": "late" } }))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let (store, registrar) = store_for(&server);
        store
            .login_with_password(LoginForm::new("ahmet@example.com", "secret"))
            .await
            .unwrap();

        let refreshing = tokio::spawn({
            let store = store.clone();
            async move { store.refresh_session().await }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        store.clear_auth();

        let result = refreshing.await.unwrap();
        assert!(matches!(result, Err(AuthError::Http(HttpError::Cancelled))));
        assert_eq!(store.snapshot(), AuthState::default());
        assert_eq!(registrar.registrations.lock().unwrap().len(), 1);
    }
}
