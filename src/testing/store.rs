use crate::error::{Result, SessionError};
use crate::traits::session::{SessionData, SessionId, SessionStore};
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Store wrapper that counts calls and remembers the last write
pub struct RecordingStore<S> {
    inner: S,
    creates: AtomicUsize,
    gets: AtomicUsize,
    sets: AtomicUsize,
    last_set: Mutex<Option<(SessionId, SessionData)>>,
}

impl<S: SessionStore> RecordingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            creates: AtomicUsize::new(0),
            gets: AtomicUsize::new(0),
            sets: AtomicUsize::new(0),
            last_set: Mutex::new(None),
        }
    }

    /// The wrapped store. Calls made through it are not counted.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    /// `(creates, gets, sets)`
    pub fn calls(&self) -> (usize, usize, usize) {
        (self.creates(), self.gets(), self.sets())
    }

    /// The arguments of the most recent `set` call
    pub fn last_set(&self) -> Option<(SessionId, SessionData)> {
        self.last_set
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl<S: SessionStore> SessionStore for RecordingStore<S> {
    async fn create(&self) -> Result<SessionId> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create().await
    }

    async fn get(&self, id: &SessionId) -> Result<SessionData> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(id).await
    }

    async fn set(&self, id: &SessionId, data: SessionData) -> Result<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        *self
            .last_set
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some((id.clone(), data.clone()));
        self.inner.set(id, data).await
    }
}

/// Store that fails every operation with a storage error
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingStore;

impl FailingStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SessionStore for FailingStore {
    async fn create(&self) -> Result<SessionId> {
        Err(SessionError::storage("store unavailable"))
    }

    async fn get(&self, _id: &SessionId) -> Result<SessionData> {
        Err(SessionError::storage("store unavailable"))
    }

    async fn set(&self, _id: &SessionId, _data: SessionData) -> Result<()> {
        Err(SessionError::storage("store unavailable"))
    }
}
