//! Application state shared across handlers.

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::{RateLimitConfig, SessionConfig};
use crate::db::{AdminDirectory, SettingsStore};
use crate::services::{
    AttemptLimiter, IdentityProvider, InMemoryRateLimiter, LoginService, SessionService,
};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Collaborators are held as
/// trait objects so tests can run the full router against in-memory
/// implementations.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    session_config: SessionConfig,
    trust_proxy_headers: bool,
    directory: Arc<dyn AdminDirectory>,
    settings: Arc<dyn SettingsStore>,
    clock: Arc<dyn Clock>,
    sessions: SessionService,
    login: LoginService,
}

impl AppState {
    /// Start building application state.
    #[must_use]
    pub fn builder(
        session: SessionConfig,
        directory: Arc<dyn AdminDirectory>,
        identity: Arc<dyn IdentityProvider>,
        settings: Arc<dyn SettingsStore>,
    ) -> AppStateBuilder {
        AppStateBuilder {
            session,
            directory,
            identity,
            settings,
            clock: Arc::new(SystemClock),
            rate_limit: RateLimitConfig::default(),
            limiter: None,
            trust_proxy_headers: false,
        }
    }

    /// Session cookie settings.
    #[must_use]
    pub fn session_config(&self) -> &SessionConfig {
        &self.inner.session_config
    }

    /// Whether client addresses may be read from proxy headers.
    #[must_use]
    pub fn trust_proxy_headers(&self) -> bool {
        self.inner.trust_proxy_headers
    }

    /// Administrator directory.
    #[must_use]
    pub fn directory(&self) -> &Arc<dyn AdminDirectory> {
        &self.inner.directory
    }

    /// Site settings store.
    #[must_use]
    pub fn settings(&self) -> &Arc<dyn SettingsStore> {
        &self.inner.settings
    }

    /// Time source.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.inner.clock
    }

    /// Session issuance and verification.
    #[must_use]
    pub fn sessions(&self) -> &SessionService {
        &self.inner.sessions
    }

    /// Login orchestration.
    #[must_use]
    pub fn login(&self) -> &LoginService {
        &self.inner.login
    }
}

/// Builder for [`AppState`].
pub struct AppStateBuilder {
    session: SessionConfig,
    directory: Arc<dyn AdminDirectory>,
    identity: Arc<dyn IdentityProvider>,
    settings: Arc<dyn SettingsStore>,
    clock: Arc<dyn Clock>,
    rate_limit: RateLimitConfig,
    limiter: Option<Arc<dyn AttemptLimiter>>,
    trust_proxy_headers: bool,
}

impl AppStateBuilder {
    /// Use a different time source.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Policy for the in-memory login rate limiter.
    #[must_use]
    pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit = config;
        self
    }

    /// Replace the in-memory rate limiter, e.g. with a shared one.
    #[must_use]
    pub fn limiter(mut self, limiter: Arc<dyn AttemptLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Read client addresses from proxy headers.
    #[must_use]
    pub fn trust_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }

    #[must_use]
    pub fn build(self) -> AppState {
        let limiter: Arc<dyn AttemptLimiter> = match self.limiter {
            Some(limiter) => limiter,
            None => Arc::new(InMemoryRateLimiter::new(self.rate_limit, self.clock.clone())),
        };
        let sessions = SessionService::new(&self.session, self.directory.clone(), self.clock.clone());
        let login = LoginService::new(
            limiter,
            self.identity,
            self.directory.clone(),
            sessions.clone(),
        );

        AppState {
            inner: Arc::new(AppStateInner {
                session_config: self.session,
                trust_proxy_headers: self.trust_proxy_headers,
                directory: self.directory,
                settings: self.settings,
                clock: self.clock,
                sessions,
                login,
            }),
        }
    }
}
