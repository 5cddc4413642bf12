//! Record-protection transforms.
//!
//! The record layer itself lives outside this crate; what the handshake
//! installs into it are the opaque transform values built here.  An
//! AEAD implementation turns a derived traffic key and IV into a pair
//! of transforms; the key schedule performs the derivation.

use alloc::boxed::Box;
use alloc::vec::Vec;

use zeroize::Zeroize;

use crate::enums::ContentType;
use crate::error::Error;

/// Protects outbound records.  Installed into the record layer when the
/// sending direction changes keys.
pub trait MessageEncrypter: Send + Sync {
    /// Seal one record's payload carrying `content_type`, under the
    /// given sequence number.
    fn encrypt(&mut self, payload: &[u8], content_type: ContentType, seq: u64)
        -> Result<Vec<u8>, Error>;
}

/// Unprotects inbound records.  Installed into the record layer when
/// the receiving direction changes keys.
pub trait MessageDecrypter: Send + Sync {
    /// Open one record, yielding the inner payload and its true content
    /// type.
    fn decrypt(&mut self, payload: &[u8], seq: u64) -> Result<(Vec<u8>, ContentType), Error>;
}

/// A TLS 1.3 AEAD algorithm: constructs transforms from derived key
/// material.
pub trait Tls13AeadAlgorithm: Send + Sync {
    /// Build the sealing transform.
    fn encrypter(&self, key: AeadKey, iv: Iv) -> Box<dyn MessageEncrypter>;

    /// Build the opening transform.
    fn decrypter(&self, key: AeadKey, iv: Iv) -> Box<dyn MessageDecrypter>;

    /// The key length this AEAD requires.
    fn key_len(&self) -> usize;
}

/// An AEAD key, stored inline and zeroed on drop.
pub struct AeadKey {
    buf: [u8; Self::MAX_LEN],
    used: usize,
}

impl AeadKey {
    pub const MAX_LEN: usize = 32;

    pub(crate) fn with_length(mut self, len: usize) -> Self {
        assert!(len <= self.used);
        self.used = len;
        self
    }
}

impl From<[u8; Self::MAX_LEN]> for AeadKey {
    fn from(buf: [u8; Self::MAX_LEN]) -> Self {
        Self {
            buf,
            used: Self::MAX_LEN,
        }
    }
}

impl AsRef<[u8]> for AeadKey {
    fn as_ref(&self) -> &[u8] {
        &self.buf[..self.used]
    }
}

impl Drop for AeadKey {
    fn drop(&mut self) {
        self.buf.zeroize();
    }
}

/// A per-direction nonce base, XORed with the record sequence number.
pub struct Iv(pub(crate) [u8; Self::LEN]);

impl Iv {
    pub const LEN: usize = 12;

    pub fn new(value: [u8; Self::LEN]) -> Self {
        Self(value)
    }
}

impl AsRef<[u8]> for Iv {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Drop for Iv {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}
