//! Protected download links.
//!
//! A [`ProtectedLink`] carries an action, a [`RelativePath`], an expiry and a
//! proof. The proof is a BLAKE3 keyed hash over the other three fields, so a
//! link is only valid for the exact path and action it was minted for and
//! only until it expires.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use url::Url;

use crate::path::RelativePath;

/// Size of a link signing key in bytes (256 bits)
pub const LINK_KEY_SIZE: usize = 32;

/// The only action a protected link may declare.
pub const DOWNLOAD_ACTION: &str = "privy_download";

/// Route that serves protected links.
pub const DOWNLOAD_ROUTE: &str = "download";

/// Default lifetime of a minted link.
pub const DEFAULT_LINK_TTL: Duration = Duration::from_secs(12 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    #[error("invalid link key: {0}")]
    InvalidKey(String),
    #[error("link proof is malformed")]
    MalformedProof,
    #[error("link proof does not match path and action")]
    Tampered,
    #[error("link expired")]
    Expired,
}

/// Secret used to sign protected links.
#[derive(Clone, PartialEq, Eq)]
pub struct LinkKey([u8; LINK_KEY_SIZE]);

impl fmt::Debug for LinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LinkKey(..)")
    }
}

impl From<[u8; LINK_KEY_SIZE]> for LinkKey {
    fn from(bytes: [u8; LINK_KEY_SIZE]) -> Self {
        Self(bytes)
    }
}

impl LinkKey {
    /// Generate a new random key using a cryptographically secure RNG
    pub fn generate() -> Result<Self, LinkError> {
        let mut buff = [0; LINK_KEY_SIZE];
        getrandom::getrandom(&mut buff).map_err(|e| LinkError::InvalidKey(e.to_string()))?;
        Ok(Self(buff))
    }

    pub fn from_hex(value: &str) -> Result<Self, LinkError> {
        let bytes = hex::decode(value.trim()).map_err(|e| LinkError::InvalidKey(e.to_string()))?;
        let bytes: [u8; LINK_KEY_SIZE] = bytes.try_into().map_err(|b: Vec<u8>| {
            LinkError::InvalidKey(format!(
                "expected {} bytes, got {}",
                LINK_KEY_SIZE,
                b.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// A minted link, ready to be turned into a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedLink {
    pub action: String,
    pub path: RelativePath,
    /// Expiry as unix seconds.
    pub expires: i64,
    /// Hex encoded proof.
    pub proof: String,
}

impl ProtectedLink {
    /// Build `{base}/download?action=..&path=..&expires=..&proof=..`.
    pub fn to_url(&self, base: &Url) -> Url {
        let mut url = base.clone();
        let path = format!("{}/{}", base.path().trim_end_matches('/'), DOWNLOAD_ROUTE);
        url.set_path(&path);
        url.set_fragment(None);
        url.query_pairs_mut()
            .clear()
            .append_pair("action", &self.action)
            .append_pair("path", self.path.as_str())
            .append_pair("expires", &self.expires.to_string())
            .append_pair("proof", &self.proof);
        url
    }
}

#[derive(Debug, Clone)]
pub struct LinkSigner {
    key: LinkKey,
    ttl: Duration,
}

impl LinkSigner {
    pub fn new(key: LinkKey, ttl: Duration) -> Self {
        Self { key, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Mint a download link for `path`, valid from `now` for the signer's ttl.
    pub fn mint(&self, path: &RelativePath, now: OffsetDateTime) -> ProtectedLink {
        // Saturates instead of wrapping for absurd lifetimes
        let expires = i64::try_from(self.ttl.as_secs())
            .ok()
            .and_then(|ttl| now.unix_timestamp().checked_add(ttl))
            .unwrap_or(i64::MAX);
        ProtectedLink {
            action: DOWNLOAD_ACTION.to_string(),
            path: path.clone(),
            expires,
            proof: self.proof(DOWNLOAD_ACTION, path, expires).to_hex().to_string(),
        }
    }

    /// Check a proof against a freshly sanitized path and the declared action.
    ///
    /// The proof is checked before the expiry so that an edited expiry is
    /// reported as tampering.
    pub fn verify(
        &self,
        action: &str,
        path: &RelativePath,
        expires: i64,
        proof: &str,
        now: OffsetDateTime,
    ) -> Result<(), LinkError> {
        let presented = blake3::Hash::from_hex(proof.trim()).map_err(|_| LinkError::MalformedProof)?;
        // blake3::Hash equality is constant time
        if presented != self.proof(action, path, expires) {
            return Err(LinkError::Tampered);
        }
        if now.unix_timestamp() > expires {
            return Err(LinkError::Expired);
        }
        Ok(())
    }

    fn proof(&self, action: &str, path: &RelativePath, expires: i64) -> blake3::Hash {
        blake3::Hasher::new_keyed(&self.key.0)
            .update(action.as_bytes())
            .update(&[0])
            .update(path.as_str().as_bytes())
            .update(&[0])
            .update(expires.to_string().as_bytes())
            .finalize()
    }
}
