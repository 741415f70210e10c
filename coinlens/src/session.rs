//! Session gate
//!
//! The only local truth is a boolean plus loading/error flags; the server
//! cookie is authoritative. A `SessionContext` is created once by the app
//! shell and handed to every view that needs to know who is logged in.
//!
//! # State machine
//! `Unchecked -> Checking -> {Authenticated, Unauthenticated}`, re-entered on
//! every protected navigation unless `session_cache_ttl` allows reusing a
//! recent Authenticated verdict.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::auth::{Credentials, RegistrationForm};
use crate::client::RemoteApi;
use crate::config::Config;
use crate::error::{LensError, Result};

/// Where the gate currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Unchecked,
    Checking,
    Authenticated,
    Unauthenticated,
}

/// Observable session flags
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Session {
    pub state: SessionState,
    pub loading: bool,
    pub error: Option<String>,
    /// Protected path the user was bounced from, consumed by the next login
    pub return_path: Option<String>,
    #[serde(skip)]
    verified_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated
    }
}

/// Instruction to move the browser elsewhere
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Redirect {
    pub to: String,
    /// Originating path carried to the login view
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

impl Redirect {
    pub fn to(path: impl Into<String>) -> Self {
        Self { to: path.into(), from: None }
    }
}

/// Outcome of guarding a protected view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Granted,
    Redirect(Redirect),
}

/// Session capability passed explicitly to protected views
pub struct SessionContext {
    api: Rc<dyn RemoteApi>,
    config: Rc<Config>,
    session: RefCell<Session>,
}

impl SessionContext {
    pub fn new(api: Rc<dyn RemoteApi>, config: Rc<Config>) -> Self {
        debug!("session context created");
        Self {
            api,
            config,
            session: RefCell::new(Session::default()),
        }
    }

    pub fn api(&self) -> &Rc<dyn RemoteApi> {
        &self.api
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Copy of the current flags
    pub fn snapshot(&self) -> Session {
        self.session.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.borrow().is_authenticated()
    }

    pub fn clear_error(&self) {
        self.update(|s| s.error = None);
    }

    fn update(&self, f: impl FnOnce(&mut Session)) {
        f(&mut self.session.borrow_mut());
    }

    /// A recent Authenticated verdict that the configured TTL lets us reuse
    fn cached_verdict(&self) -> bool {
        if !self.config.caches_session() {
            return false;
        }
        let session = self.session.borrow();
        let ttl = TimeDelta::from_std(self.config.session_cache_ttl).unwrap_or(TimeDelta::MAX);
        session.is_authenticated()
            && session
                .verified_at
                .is_some_and(|at| Utc::now().signed_duration_since(at) < ttl)
    }

    /// Ask the server whether the session cookie is valid.
    ///
    /// Any failure, including network errors and 5xx, counts as
    /// Unauthenticated.
    pub async fn check_session(&self) -> SessionState {
        if self.cached_verdict() {
            debug!("reusing cached session verdict");
            return SessionState::Authenticated;
        }

        self.update(|s| s.state = SessionState::Checking);

        let state = match self.api.check_session().await {
            Ok(()) => SessionState::Authenticated,
            Err(e) => {
                if !matches!(e, LensError::Auth(_)) {
                    warn!(error = %e, "session check failed");
                }
                SessionState::Unauthenticated
            }
        };

        self.update(|s| {
            s.state = state;
            s.verified_at = (state == SessionState::Authenticated).then(Utc::now);
        });
        state
    }

    /// Gate a protected view at `path`
    pub async fn guard(&self, path: &str) -> GateDecision {
        match self.check_session().await {
            SessionState::Authenticated => GateDecision::Granted,
            _ => {
                info!(path, "redirecting to login");
                self.update(|s| s.return_path = Some(path.to_string()));
                GateDecision::Redirect(Redirect {
                    to: self.config.login_path.clone(),
                    from: Some(path.to_string()),
                })
            }
        }
    }

    /// Remember where to go after the next login (e.g. from router state)
    pub fn set_return_path(&self, path: Option<String>) {
        self.update(|s| s.return_path = path);
    }

    /// Log in and return where the user should land
    pub async fn login(&self, credentials: &Credentials) -> Result<Redirect> {
        if let Err(e) = credentials.validate() {
            self.update(|s| s.error = Some(e.user_message()));
            return Err(e);
        }

        self.update(|s| {
            s.loading = true;
            s.error = None;
        });

        let result = self.api.login(credentials).await;

        match result {
            Ok(_) => {
                let mut landing = None;
                self.update(|s| {
                    s.loading = false;
                    s.state = SessionState::Authenticated;
                    s.verified_at = Some(Utc::now());
                    landing = s.return_path.take();
                });
                let to = landing.unwrap_or_else(|| self.config.default_landing.clone());
                info!(username = %credentials.username, landing = %to, "logged in");
                Ok(Redirect::to(to))
            }
            Err(e) => {
                warn!(error = %e, "login failed");
                self.update(|s| {
                    s.loading = false;
                    s.error = Some(e.user_message());
                });
                Err(e)
            }
        }
    }

    /// Log out. Always ends Unauthenticated on the public page, even when the
    /// server call fails.
    pub async fn logout(&self) -> Redirect {
        self.update(|s| s.loading = true);

        if let Err(e) = self.api.logout().await {
            warn!(error = %e, "logout request failed, clearing local session anyway");
        }

        self.update(|s| {
            s.loading = false;
            s.state = SessionState::Unauthenticated;
            s.verified_at = None;
            s.return_path = None;
        });
        info!("logged out");
        Redirect::to(self.config.public_landing.clone())
    }

    /// Validate, create the account, then log in with the same credentials
    pub async fn register(&self, form: &RegistrationForm) -> Result<Redirect> {
        let request = match form.to_request() {
            Ok(request) => request,
            Err(e) => {
                self.update(|s| s.error = Some(e.user_message()));
                return Err(e);
            }
        };

        self.update(|s| {
            s.loading = true;
            s.error = None;
        });

        if let Err(e) = self.api.register(&request).await {
            warn!(error = %e, "registration failed");
            self.update(|s| {
                s.loading = false;
                s.error = Some(e.user_message());
            });
            return Err(e);
        }

        info!(username = %request.username, "registered");
        self.login(&form.credentials()).await
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        debug!("session context dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeApi;
    use std::time::Duration;

    fn context(api: &Rc<FakeApi>) -> SessionContext {
        SessionContext::new(api.clone(), Rc::new(Config::default()))
    }

    #[tokio::test]
    async fn test_guard_grants_valid_session() {
        let api = Rc::new(FakeApi::default());
        api.session_valid.set(true);
        let ctx = context(&api);

        assert_eq!(ctx.snapshot().state, SessionState::Unchecked);
        assert_eq!(ctx.guard("/analysis").await, GateDecision::Granted);
        assert!(ctx.is_authenticated());
    }

    #[tokio::test]
    async fn test_guard_redirects_and_keeps_origin() {
        let api = Rc::new(FakeApi::default());
        let ctx = context(&api);

        let decision = ctx.guard("/analysis/btc").await;
        assert_eq!(
            decision,
            GateDecision::Redirect(Redirect {
                to: "/login".into(),
                from: Some("/analysis/btc".into()),
            })
        );
        assert_eq!(ctx.snapshot().state, SessionState::Unauthenticated);
        assert_eq!(ctx.snapshot().return_path.as_deref(), Some("/analysis/btc"));
    }

    #[tokio::test]
    async fn test_network_failure_counts_as_unauthenticated() {
        let api = Rc::new(FakeApi::default());
        api.session_valid.set(true);
        api.session_network_error.set(true);
        let ctx = context(&api);

        assert_eq!(ctx.check_session().await, SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_zero_ttl_rechecks_every_time() {
        let api = Rc::new(FakeApi::default());
        api.session_valid.set(true);
        let ctx = context(&api);

        ctx.check_session().await;
        ctx.check_session().await;
        assert_eq!(api.count("check_session"), 2);
    }

    #[tokio::test]
    async fn test_ttl_reuses_recent_verdict() {
        let api = Rc::new(FakeApi::default());
        api.session_valid.set(true);
        let mut config = Config::default();
        config.session_cache_ttl = Duration::from_secs(300);
        let ctx = SessionContext::new(api.clone(), Rc::new(config));

        assert_eq!(ctx.check_session().await, SessionState::Authenticated);
        assert_eq!(ctx.check_session().await, SessionState::Authenticated);
        assert_eq!(api.count("check_session"), 1);
    }

    #[tokio::test]
    async fn test_login_returns_to_origin() {
        let api = Rc::new(FakeApi::default());
        let ctx = context(&api);

        ctx.guard("/profile").await;
        let redirect = ctx.login(&Credentials::new("ada", "analytical")).await.unwrap();
        assert_eq!(redirect, Redirect::to("/profile"));
        assert!(ctx.is_authenticated());
        assert!(ctx.snapshot().return_path.is_none());

        // The stored path is consumed; the next login lands on the default
        let redirect = ctx.login(&Credentials::new("ada", "analytical")).await.unwrap();
        assert_eq!(redirect, Redirect::to("/dashboard"));
    }

    #[tokio::test]
    async fn test_login_failure_sets_error() {
        let api = Rc::new(FakeApi::default());
        *api.login_error.borrow_mut() = Some("Invalid credentials".into());
        let ctx = context(&api);

        let err = ctx.login(&Credentials::new("ada", "wrong-pass")).await.unwrap_err();
        assert!(matches!(err, LensError::Auth(_)));
        let session = ctx.snapshot();
        assert!(!session.is_authenticated());
        assert!(!session.loading);
        assert_eq!(session.error.as_deref(), Some("Invalid credentials"));

        ctx.clear_error();
        assert!(ctx.snapshot().error.is_none());
    }

    #[tokio::test]
    async fn test_empty_credentials_never_hit_network() {
        let api = Rc::new(FakeApi::default());
        let ctx = context(&api);

        assert!(ctx.login(&Credentials::new("", "")).await.is_err());
        assert_eq!(api.count("login"), 0);
    }

    #[tokio::test]
    async fn test_logout_is_best_effort() {
        let api = Rc::new(FakeApi::default());
        api.logout_fails.set(true);
        let ctx = context(&api);
        ctx.login(&Credentials::new("ada", "analytical")).await.unwrap();

        let redirect = ctx.logout().await;
        assert_eq!(redirect, Redirect::to("/"));
        assert_eq!(ctx.snapshot().state, SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_register_rejects_short_password_locally() {
        let api = Rc::new(FakeApi::default());
        let ctx = context(&api);
        let form = RegistrationForm {
            email: "ada@example.com".into(),
            username: "ada".into(),
            password: "short".into(),
            confirm_password: "short".into(),
            ..RegistrationForm::default()
        };

        let err = ctx.register(&form).await.unwrap_err();
        assert!(matches!(err, LensError::Validation(ref m) if m.contains("at least 8 characters")));
        assert_eq!(api.count("register"), 0);
        assert_eq!(api.count("login"), 0);
        assert!(ctx.snapshot().error.is_some());
    }

    #[tokio::test]
    async fn test_register_then_logs_in() {
        let api = Rc::new(FakeApi::default());
        let ctx = context(&api);
        let form = RegistrationForm {
            email: "ada@example.com".into(),
            username: "ada".into(),
            password: "analytical".into(),
            confirm_password: "analytical".into(),
            ..RegistrationForm::default()
        };

        let redirect = ctx.register(&form).await.unwrap();
        assert_eq!(redirect, Redirect::to("/dashboard"));
        assert_eq!(api.count("register"), 1);
        assert_eq!(api.count("login"), 1);
        assert!(ctx.is_authenticated());
    }

    #[tokio::test]
    async fn test_register_server_error_skips_login() {
        let api = Rc::new(FakeApi::default());
        *api.register_error.borrow_mut() = Some("username: Username already exists".into());
        let ctx = context(&api);
        let form = RegistrationForm {
            email: "ada@example.com".into(),
            username: "ada".into(),
            password: "analytical".into(),
            confirm_password: "analytical".into(),
            ..RegistrationForm::default()
        };

        assert!(ctx.register(&form).await.is_err());
        assert_eq!(api.count("login"), 0);
        assert_eq!(
            ctx.snapshot().error.as_deref(),
            Some("username: Username already exists")
        );
    }
}
