//! The HMAC seam; the TLS 1.3 key schedule is HKDF, which is built
//! entirely out of HMAC invocations.

use alloc::boxed::Box;
use core::fmt::Debug;

use zeroize::Zeroize;

/// An HMAC implementation over some hash function.
pub trait Hmac: Send + Sync + Debug {
    /// Prepare to use `key` as an HMAC key.
    fn with_key(&self, key: &[u8]) -> Box<dyn Key>;

    /// The length of the tags this HMAC produces (equal to the
    /// underlying hash's output length).
    fn hash_output_len(&self) -> usize;
}

/// A keyed HMAC instance.
pub trait Key: Send + Sync {
    /// Compute the tag over the concatenation of `data`.
    fn sign(&self, data: &[&[u8]]) -> Tag;

    /// The tag length.
    fn tag_len(&self) -> usize;
}

/// An HMAC tag, stored inline.  Zeroed on drop: tags double as derived
/// secrets in the key schedule.
#[derive(Clone)]
pub struct Tag {
    buf: [u8; Self::MAX_LEN],
    used: usize,
}

impl Tag {
    pub const MAX_LEN: usize = 64;

    pub fn new(bytes: &[u8]) -> Self {
        debug_assert!(bytes.len() <= Self::MAX_LEN);
        let mut tag = Self {
            buf: [0u8; Self::MAX_LEN],
            used: bytes.len(),
        };
        tag.buf[..bytes.len()].copy_from_slice(bytes);
        tag
    }
}

impl AsRef<[u8]> for Tag {
    fn as_ref(&self) -> &[u8] {
        &self.buf[..self.used]
    }
}

impl Drop for Tag {
    fn drop(&mut self) {
        self.buf.zeroize();
    }
}

impl Debug for Tag {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Tag")
    }
}
