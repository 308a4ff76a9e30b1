//! Per-request session state
//!
//! A [`Session`] starts out unloaded. The first read or write resolves the
//! request cookie against the store and settles into either an active
//! session or "no session". Writes to "no session" create a new record.
//!
//! ```text
//! Uninitialized --first access--> Absent | Active(Loaded)
//! Absent        --set-----------> Active(Created)
//! Active        --set/remove/bump--> dirty, flushed once at end of request
//! ```

use super::cookie::{build_session_cookie, replace_set_cookie};
use super::manager::SessionManager;
use super::token::SessionToken;
use crate::error::{Result, SessionError};
use crate::traits::session::{ReservedKey, SessionData, SessionId};
use axum::http::HeaderMap;
use cookie::Cookie;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Handle to the current request's session
///
/// Cloning is cheap and every clone refers to the same per-request state.
/// Obtain one with the [`Session`] extractor once
/// [`SessionLayer`](super::SessionLayer) is installed.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Mutex<SessionInner>>,
}

struct SessionInner {
    manager: SessionManager,
    request_token: Option<String>,
    secure: bool,
    state: SessionState,
    outgoing: Option<Cookie<'static>>,
    finished: bool,
}

enum SessionState {
    Uninitialized,
    Absent,
    Active(ActiveSession),
}

struct ActiveSession {
    id: SessionId,
    data: SessionData,
    origin: Origin,
    dirty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Loaded,
    Created,
}

/// Why a presented cookie did not yield a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadFailure {
    /// No cookie was sent
    NoSession,
    /// The cookie was forged, stale, or points at a missing record
    BadSession,
}

impl Session {
    pub(crate) fn new(manager: SessionManager, request_token: Option<String>, secure: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionInner {
                manager,
                request_token,
                secure,
                state: SessionState::Uninitialized,
                outgoing: None,
                finished: false,
            })),
        }
    }

    /// Get a value and deserialize it.
    ///
    /// Returns `Ok(None)` both when the key is absent and when there is no
    /// valid session. Errors only if the stored value does not deserialize
    /// into `T`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_value(key).await {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Get the raw stored value for a key
    pub async fn get_value(&self, key: &str) -> Option<Value> {
        let mut inner = self.inner.lock().await;
        if !inner.ensure_loaded().await {
            return None;
        }
        inner.active().and_then(|active| active.data.get(key).cloned())
    }

    /// Store a value, creating a session if there is none.
    ///
    /// # Errors
    ///
    /// - [`SessionError::ReservedKey`] if `key` is reserved (e.g. `"epoch"`)
    /// - [`SessionError::Serialization`] if `value` cannot be serialized
    /// - [`SessionError::Storage`] if a new session record cannot be created
    /// - [`SessionError::Finished`] if the request has already been flushed
    pub async fn set<T: Serialize>(&self, key: impl Into<String>, value: T) -> Result<()> {
        let key = key.into();
        if ReservedKey::from_key(&key).is_some() {
            return Err(SessionError::ReservedKey(key));
        }
        let value = serde_json::to_value(value)?;

        let mut inner = self.inner.lock().await;
        if inner.finished {
            tracing::warn!(key = %key, "Session write after end of request refused");
            return Err(SessionError::Finished);
        }
        if !inner.ensure_loaded().await {
            inner.create_session().await?;
        }

        if let Some(active) = inner.active_mut() {
            active.data.insert(key, value)?;
            active.dirty = true;
        }
        Ok(())
    }

    /// Remove a key, returning its previous value.
    ///
    /// Does nothing without a valid session, or once the request has been
    /// flushed. Otherwise the session is marked dirty even when the key was
    /// absent.
    pub async fn remove(&self, key: &str) -> Option<Value> {
        let mut inner = self.inner.lock().await;
        if inner.finished {
            tracing::warn!(key, "Session remove after end of request refused");
            return None;
        }
        if !inner.ensure_loaded().await {
            return None;
        }

        let active = inner.active_mut()?;
        active.dirty = true;
        active.data.remove(key)
    }

    /// Advance the session epoch, invalidating every previously issued cookie.
    ///
    /// Call this on privilege changes such as login. Sessions created during
    /// this request have never been handed out, so they are left alone.
    /// Returns the new epoch if one was issued. Refused once the request has
    /// been flushed.
    pub async fn bump(&self) -> Option<u32> {
        let mut inner = self.inner.lock().await;
        if inner.finished {
            tracing::warn!("Session bump after end of request refused");
            return None;
        }
        if !inner.ensure_loaded().await {
            return None;
        }

        let token = {
            let active = inner.active_mut()?;
            if active.origin == Origin::Created {
                return None;
            }

            // Wraps after 2^32 bumps.
            let epoch = active.data.epoch().unwrap_or_default().wrapping_add(1);
            active.data.set_epoch(epoch);
            active.dirty = true;
            SessionToken::new(active.id.clone(), epoch)
        };

        let epoch = token.epoch;
        inner.write_cookie(Some(&token));
        tracing::debug!(session_id = %token.id, epoch, "Session epoch bumped");
        Some(epoch)
    }

    /// Persist pending changes.
    ///
    /// A no-op when nothing changed. [`SessionLayer`](super::SessionLayer)
    /// calls this once after the handler finishes.
    pub async fn save(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.save().await
    }

    /// The session ID, loading the session if needed
    pub async fn id(&self) -> Option<SessionId> {
        let mut inner = self.inner.lock().await;
        if !inner.ensure_loaded().await {
            return None;
        }
        inner.active().map(|active| active.id.clone())
    }

    /// The current epoch, loading the session if needed
    pub async fn epoch(&self) -> Option<u32> {
        let mut inner = self.inner.lock().await;
        if !inner.ensure_loaded().await {
            return None;
        }
        inner.active().and_then(|active| active.data.epoch())
    }

    /// Whether the session was created during this request, loading the
    /// session if needed
    pub async fn is_new(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if !inner.ensure_loaded().await {
            return false;
        }
        inner
            .active()
            .is_some_and(|active| active.origin == Origin::Created)
    }

    /// Whether there are changes not yet written to the store
    pub async fn is_dirty(&self) -> bool {
        let inner = self.inner.lock().await;
        inner.active().is_some_and(|active| active.dirty)
    }

    /// The `Set-Cookie` this request will emit, if any
    pub async fn outgoing_cookie(&self) -> Option<Cookie<'static>> {
        self.inner.lock().await.outgoing.clone()
    }

    /// Flush pending changes and write the session cookie into `headers`.
    ///
    /// Runs at most once; later calls do nothing. Storage failures are
    /// logged, since the handler has already produced its response.
    pub(crate) async fn finish(&self, headers: Option<&mut HeaderMap>) {
        let mut inner = self.inner.lock().await;
        if inner.finished {
            return;
        }
        inner.finished = true;

        if let Err(err) = inner.save().await {
            tracing::error!(error = %err, "Failed to persist session at end of request");
        }

        if let (Some(headers), Some(cookie)) = (headers, inner.outgoing.as_ref()) {
            if let Err(err) = replace_set_cookie(headers, cookie) {
                tracing::error!(error = %err, "Failed to write session cookie");
            }
        }
    }
}

impl SessionInner {
    /// Resolve the request cookie on first use. Returns whether a session is active.
    async fn ensure_loaded(&mut self) -> bool {
        if matches!(self.state, SessionState::Uninitialized) {
            self.state = match self.load().await {
                Ok(active) => SessionState::Active(active),
                Err(LoadFailure::NoSession) => SessionState::Absent,
                Err(LoadFailure::BadSession) => {
                    self.write_cookie(None);
                    SessionState::Absent
                }
            };
        }

        matches!(self.state, SessionState::Active(_))
    }

    async fn load(&self) -> std::result::Result<ActiveSession, LoadFailure> {
        let raw = self.request_token.as_deref().ok_or(LoadFailure::NoSession)?;

        let token = SessionToken::decode(raw, self.manager.key()).map_err(|_| {
            tracing::debug!("Session cookie failed verification");
            LoadFailure::BadSession
        })?;

        let mut data = self.manager.store().get(&token.id).await.map_err(|err| {
            tracing::debug!(session_id = %token.id, error = %err, "Session lookup failed");
            LoadFailure::BadSession
        })?;

        match data.epoch() {
            Some(stored) if stored != token.epoch => {
                tracing::debug!(
                    session_id = %token.id,
                    stored,
                    presented = token.epoch,
                    "Session epoch mismatch"
                );
                return Err(LoadFailure::BadSession);
            }
            Some(_) => {}
            None => data.set_epoch(token.epoch),
        }

        Ok(ActiveSession {
            id: token.id,
            data,
            origin: Origin::Loaded,
            dirty: false,
        })
    }

    async fn create_session(&mut self) -> Result<()> {
        let id = self.manager.store().create().await?;
        tracing::debug!(session_id = %id, "Created session");

        self.write_cookie(Some(&SessionToken::new(id.clone(), 0)));
        self.state = SessionState::Active(ActiveSession {
            id,
            data: SessionData::with_epoch(0),
            origin: Origin::Created,
            dirty: true,
        });
        Ok(())
    }

    async fn save(&mut self) -> Result<()> {
        let store = self.manager.store();
        let Some(active) = self.active_mut() else {
            return Ok(());
        };
        if !active.dirty {
            return Ok(());
        }

        store.set(&active.id, active.data.clone()).await?;
        active.dirty = false;
        Ok(())
    }

    /// Replace the outgoing cookie. `None` clears the client's cookie.
    fn write_cookie(&mut self, token: Option<&SessionToken>) {
        let value = token
            .map(|token| token.encode(self.manager.key()))
            .unwrap_or_default();
        self.outgoing = Some(build_session_cookie(
            self.manager.cookie_name(),
            value,
            self.secure,
        ));
    }

    fn active(&self) -> Option<&ActiveSession> {
        match &self.state {
            SessionState::Active(active) => Some(active),
            _ => None,
        }
    }

    fn active_mut(&mut self) -> Option<&mut ActiveSession> {
        match &mut self.state {
            SessionState::Active(active) => Some(active),
            _ => None,
        }
    }
}
