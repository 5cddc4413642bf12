//! Seams to the cryptographic primitives this crate deliberately does
//! not implement.
//!
//! A [`CryptoProvider`] bundles everything the handshake needs: the
//! cipher suites it may negotiate (each naming its hash, HMAC and AEAD
//! implementations), the key-exchange groups it may offer, and a source
//! of randomness.  Providers live outside this crate; the handshake
//! only ever calls through these traits.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt::Debug;

use zeroize::Zeroize;

use crate::enums::CipherSuite;
use crate::error::Error;
use crate::msgs::enums::NamedGroup;
use crate::tls13::Tls13CipherSuite;

pub mod cipher;
pub mod hash;
pub mod hmac;

/// The cryptographic back-end for a connection.
#[derive(Clone, Debug)]
pub struct CryptoProvider {
    /// Cipher suites, in descending order of preference.
    pub cipher_suites: Vec<&'static Tls13CipherSuite>,

    /// Key exchange groups, in descending order of preference.  The
    /// first entry is the group a fresh ClientHello generates its key
    /// share for.
    pub kx_groups: Vec<&'static dyn SupportedKxGroup>,

    /// A cryptographically secure random source.
    pub secure_random: &'static dyn SecureRandom,
}

impl CryptoProvider {
    pub(crate) fn find_cipher_suite(&self, suite: CipherSuite) -> Option<&'static Tls13CipherSuite> {
        self.cipher_suites
            .iter()
            .copied()
            .find(|candidate| candidate.common.suite == suite)
    }

    pub(crate) fn find_kx_group(&self, group: NamedGroup) -> Option<&'static dyn SupportedKxGroup> {
        self.kx_groups
            .iter()
            .copied()
            .find(|candidate| candidate.name() == group)
    }
}

/// A source of cryptographically secure randomness.
pub trait SecureRandom: Send + Sync + Debug {
    /// Fill the given buffer with random bytes.
    fn fill(&self, buf: &mut [u8]) -> Result<(), GetRandomFailed>;
}

/// Random material generation failed.
#[derive(Debug)]
pub struct GetRandomFailed;

impl From<GetRandomFailed> for Error {
    fn from(_: GetRandomFailed) -> Self {
        Self::FailedToGetRandomBytes
    }
}

/// A supported key exchange group.
pub trait SupportedKxGroup: Send + Sync + Debug {
    /// The IANA name of this group.
    fn name(&self) -> NamedGroup;

    /// Generate a fresh ephemeral key pair.
    fn start(&self) -> Result<Box<dyn ActiveKeyExchange>, Error>;
}

/// An in-progress key exchange: holds the ephemeral private key until
/// the peer share arrives.
///
/// Dropping a value of this type destroys the private key; the
/// handshake relies on this when a HelloRetryRequest forces a new
/// share.
pub trait ActiveKeyExchange: Send + Sync {
    /// The group the keys belong to.
    fn group(&self) -> NamedGroup;

    /// Our public share, in the group's wire format.
    fn pub_key(&self) -> &[u8];

    /// Complete the exchange against the peer's public share,
    /// consuming the private key.
    fn complete(self: Box<Self>, peer_pub_key: &[u8]) -> Result<SharedSecret, Error>;
}

/// The result of a completed key exchange.  Zeroed on drop.
pub struct SharedSecret {
    buf: Vec<u8>,
}

impl SharedSecret {
    pub fn secret_bytes(&self) -> &[u8] {
        &self.buf
    }
}

impl From<Vec<u8>> for SharedSecret {
    fn from(buf: Vec<u8>) -> Self {
        Self { buf }
    }
}

impl Drop for SharedSecret {
    fn drop(&mut self) {
        self.buf.zeroize();
    }
}
