use super::config::{SecureCookie, SessionConfig};
use super::controller::Session;
use super::cookie::{find_request_cookie, is_secure_request};
use super::key::SigningKey;
use super::layer::SessionLayer;
use crate::error::Result;
use crate::traits::session::SessionStore;
use axum::http::{HeaderMap, Uri};
use std::sync::Arc;

/// Shared, per-application session settings
///
/// Holds the store, signing key, and cookie policy. One manager serves every
/// request; [`SessionManager::start`] hands out a fresh [`Session`] per request.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    store: Arc<dyn SessionStore>,
    key: SigningKey,
    cookie_name: String,
    secure: SecureCookie,
    trust_forwarded_headers: bool,
}

impl SessionManager {
    /// Create a manager, loading the signing key from the configuration.
    ///
    /// # Errors
    ///
    /// Fails fast on an invalid cookie name or missing/invalid secret key.
    pub fn new(config: &SessionConfig, store: Arc<dyn SessionStore>) -> Result<Self> {
        let key = config.signing_key()?;
        Self::with_key(config, key, store)
    }

    /// Create a manager with an explicit signing key
    pub fn with_key(
        config: &SessionConfig,
        key: SigningKey,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            inner: Arc::new(ManagerInner {
                store,
                key,
                cookie_name: config.cookie_name.clone(),
                secure: config.secure,
                trust_forwarded_headers: config.trust_forwarded_headers,
            }),
        })
    }

    /// Tower layer that attaches a [`Session`] to every request
    pub fn layer(&self) -> SessionLayer {
        SessionLayer::new(self.clone())
    }

    /// Begin a session for one request.
    ///
    /// Nothing is loaded here; the session loads lazily on first access.
    pub fn start(&self, uri: &Uri, headers: &HeaderMap) -> Session {
        let request_token = find_request_cookie(headers, &self.inner.cookie_name);

        let secure = match self.inner.secure {
            SecureCookie::Always => true,
            SecureCookie::Never => false,
            SecureCookie::Auto => {
                is_secure_request(uri, headers, self.inner.trust_forwarded_headers)
            }
        };

        Session::new(self.clone(), request_token, secure)
    }

    pub fn cookie_name(&self) -> &str {
        &self.inner.cookie_name
    }

    pub(crate) fn store(&self) -> Arc<dyn SessionStore> {
        Arc::clone(&self.inner.store)
    }

    pub(crate) fn key(&self) -> &SigningKey {
        &self.inner.key
    }
}
