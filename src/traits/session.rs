//! Session storage trait
//!
//! The session layer only ever talks to storage through [`SessionStore`], so
//! in-memory, database-backed, or distributed backends can be swapped freely.

use crate::error::{Result, SessionError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Opaque session identifier assigned by the store on creation
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionId(Vec<u8>);

impl SessionId {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self)
    }
}

/// Keys the session layer keeps for its own bookkeeping.
///
/// Callers cannot write these through the generic accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservedKey {
    /// Current epoch, stored as an unsigned 32-bit integer
    Epoch,
}

impl ReservedKey {
    pub const ALL: [ReservedKey; 1] = [ReservedKey::Epoch];

    pub fn as_str(self) -> &'static str {
        match self {
            ReservedKey::Epoch => "epoch",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|reserved| reserved.as_str() == key)
    }
}

/// Data held for one session
///
/// The epoch lives in a typed field; every other key maps to an arbitrary
/// JSON value. Serialized form is a single string-keyed object with the
/// epoch under `"epoch"`. Deserializing goes through [`SessionData::from_map`],
/// so serialized backends get the epoch check at decode time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct SessionData {
    epoch: Option<u32>,
    values: HashMap<String, Value>,
}

impl SessionData {
    /// Create empty session data with no stored epoch
    pub fn new() -> Self {
        Self::default()
    }

    /// Create empty session data with the given epoch
    pub fn with_epoch(epoch: u32) -> Self {
        Self {
            epoch: Some(epoch),
            values: HashMap::new(),
        }
    }

    /// Build session data from a raw key/value mapping.
    ///
    /// Fails if the reserved `"epoch"` key holds anything other than an
    /// unsigned 32-bit integer.
    pub fn from_map(mut map: Map<String, Value>) -> Result<Self> {
        let epoch = match map.remove(ReservedKey::Epoch.as_str()) {
            None => None,
            Some(value) => {
                let epoch = value
                    .as_u64()
                    .and_then(|v| u32::try_from(v).ok())
                    .ok_or_else(|| {
                        SessionError::Serialization(format!(
                            "stored epoch is not a u32: {}",
                            value
                        ))
                    })?;
                Some(epoch)
            }
        };

        Ok(Self {
            epoch,
            values: map.into_iter().collect(),
        })
    }

    /// Flatten into a raw key/value mapping, epoch included
    pub fn into_map(self) -> Map<String, Value> {
        let mut map: Map<String, Value> = self.values.into_iter().collect();
        if let Some(epoch) = self.epoch {
            map.insert(ReservedKey::Epoch.as_str().to_string(), Value::from(epoch));
        }
        map
    }

    /// The stored epoch, if one has been recorded
    pub fn epoch(&self) -> Option<u32> {
        self.epoch
    }

    pub fn set_epoch(&mut self, epoch: u32) {
        self.epoch = Some(epoch);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Insert a caller-defined value, returning the previous one
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Result<Option<Value>> {
        let key = key.into();
        if ReservedKey::from_key(&key).is_some() {
            return Err(SessionError::ReservedKey(key));
        }
        Ok(self.values.insert(key, value))
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Caller-defined keys, excluding reserved ones
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl TryFrom<Map<String, Value>> for SessionData {
    type Error = SessionError;

    fn try_from(map: Map<String, Value>) -> Result<Self> {
        Self::from_map(map)
    }
}

impl From<SessionData> for Map<String, Value> {
    fn from(data: SessionData) -> Self {
        data.into_map()
    }
}

/// Session storage trait
///
/// All three operations may block on I/O. Implementations must be safe for
/// concurrent use across requests; the session layer assumes last-write-wins
/// and does no conflict detection of its own.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Allocate a new, empty session record and return its unique ID
    async fn create(&self) -> Result<SessionId>;

    /// Fetch the data for a session.
    ///
    /// Returns [`SessionError::NotFound`] if no record exists.
    async fn get(&self, id: &SessionId) -> Result<SessionData>;

    /// Replace the full contents of a session record
    async fn set(&self, id: &SessionId, data: SessionData) -> Result<()>;
}
