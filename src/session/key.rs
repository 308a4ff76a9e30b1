use crate::error::{Result, SessionError};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretSlice};
use std::fmt;
use std::sync::Arc;

/// Minimum key length accepted for signing session tokens (256 bits)
pub const MIN_KEY_LEN: usize = 32;

const GENERATED_KEY_LEN: usize = 64;

/// Server-held secret used to sign session cookie tokens
#[derive(Clone)]
pub struct SigningKey {
    secret: Arc<SecretSlice<u8>>,
}

impl SigningKey {
    /// Create a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the key is shorter than [`MIN_KEY_LEN`].
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.len() < MIN_KEY_LEN {
            return Err(SessionError::configuration(format!(
                "Session secret key must be at least {} bytes, got {}. Generate one with: openssl rand -hex 32",
                MIN_KEY_LEN,
                bytes.len()
            )));
        }

        Ok(Self {
            secret: Arc::new(SecretSlice::from(bytes)),
        })
    }

    /// Create a key from a hex string
    pub fn from_hex(hex_key: &str) -> Result<Self> {
        let bytes = hex::decode(hex_key.trim())
            .map_err(|e| SessionError::configuration(format!("Invalid secret key format: {}", e)))?;
        Self::from_bytes(bytes)
    }

    /// Generate a random key.
    ///
    /// Tokens signed with a generated key stop verifying when the process
    /// restarts, so this is only suitable for development.
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; GENERATED_KEY_LEN];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self {
            secret: Arc::new(SecretSlice::from(bytes)),
        }
    }

    pub(crate) fn expose(&self) -> &[u8] {
        self.secret.expose_secret()
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey([REDACTED])")
    }
}
