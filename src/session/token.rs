//! Signed session cookie token
//!
//! A token carries a session ID and epoch, authenticated with HMAC-SHA256
//! under the server's [`SigningKey`]. Wire layout before encoding:
//!
//! ```text
//! version (1) | epoch (4, big-endian) | session id (n >= 1) | tag (32)
//! ```
//!
//! The whole buffer is encoded as unpadded URL-safe base64, which is valid in
//! a cookie value without further escaping.

use super::key::SigningKey;
use crate::error::{Result, SessionError};
use crate::traits::session::SessionId;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

const VERSION: u8 = 1;
const HEADER_LEN: usize = 1 + 4;
const TAG_LEN: usize = 32;

/// Decoded contents of a session cookie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub id: SessionId,
    pub epoch: u32,
}

impl SessionToken {
    pub fn new(id: SessionId, epoch: u32) -> Self {
        Self { id, epoch }
    }

    /// Encode and sign the token
    pub fn encode(&self, key: &SigningKey) -> String {
        let mut buf = Vec::with_capacity(HEADER_LEN + self.id.len() + TAG_LEN);
        buf.push(VERSION);
        buf.extend_from_slice(&self.epoch.to_be_bytes());
        buf.extend_from_slice(self.id.as_bytes());

        let tag = compute_tag(key, &buf);
        buf.extend_from_slice(&tag);

        URL_SAFE_NO_PAD.encode(buf)
    }

    /// Decode a token and verify its signature.
    ///
    /// Any failure, structural or cryptographic, yields
    /// [`SessionError::InvalidToken`]. The tag is checked before the payload
    /// is interpreted.
    pub fn decode(token: &str, key: &SigningKey) -> Result<Self> {
        let raw = URL_SAFE_NO_PAD
            .decode(token.as_bytes())
            .map_err(|_| SessionError::InvalidToken)?;

        if raw.len() < HEADER_LEN + 1 + TAG_LEN {
            return Err(SessionError::InvalidToken);
        }

        let (payload, provided) = raw.split_at(raw.len() - TAG_LEN);
        let expected = compute_tag(key, payload);
        if !bool::from(expected[..].ct_eq(provided)) {
            return Err(SessionError::InvalidToken);
        }

        if payload[0] != VERSION {
            return Err(SessionError::InvalidToken);
        }

        let epoch_bytes: [u8; 4] = payload[1..HEADER_LEN]
            .try_into()
            .map_err(|_| SessionError::InvalidToken)?;

        Ok(Self {
            id: SessionId::new(&payload[HEADER_LEN..]),
            epoch: u32::from_be_bytes(epoch_bytes),
        })
    }
}

fn compute_tag(key: &SigningKey, payload: &[u8]) -> [u8; TAG_LEN] {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key.expose())
        .expect("HMAC can take key of any size");
    mac.update(payload);

    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&mac.finalize().into_bytes());
    tag
}
