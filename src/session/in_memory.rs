use crate::error::{Result, SessionError};
use crate::traits::session::{SessionData, SessionId, SessionStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory session store implementation
///
/// Stores sessions in a HashMap keyed by random UUIDs. Suitable for
/// development and testing, but not for production (sessions are lost on
/// restart and not shared across instances).
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, SessionData>>>,
}

impl InMemorySessionStore {
    /// Create a new in-memory session store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Drop a session record, e.g. to emulate backend expiry
    pub async fn remove(&self, id: &SessionId) -> Option<SessionData> {
        self.sessions.write().await.remove(id)
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self) -> Result<SessionId> {
        let mut sessions = self.sessions.write().await;
        loop {
            let id = SessionId::new(uuid::Uuid::new_v4().as_bytes().to_vec());
            if !sessions.contains_key(&id) {
                sessions.insert(id.clone(), SessionData::new());
                return Ok(id);
            }
        }
    }

    async fn get(&self, id: &SessionId) -> Result<SessionData> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::not_found(id.to_string()))
    }

    /// Replace a record's contents. Unknown IDs are inserted (last write wins).
    async fn set(&self, id: &SessionId, data: SessionData) -> Result<()> {
        self.sessions.write().await.insert(id.clone(), data);
        Ok(())
    }
}
