//! TLS 1.3 cipher-suite descriptors.

use core::fmt;

use crate::crypto::cipher::Tls13AeadAlgorithm;
use crate::crypto::hash;
use crate::crypto::hmac;
use crate::enums::CipherSuite;

pub(crate) mod key_schedule;

/// Fields shared by all cipher-suite descriptors.
pub struct CipherSuiteCommon {
    /// The IANA suite code.
    pub suite: CipherSuite,

    /// Which hash function the suite uses.
    pub hash_provider: &'static dyn hash::Hash,
}

/// A TLS 1.3 cipher suite: the negotiable unit tying together a hash,
/// an HMAC over that hash, and an AEAD.
pub struct Tls13CipherSuite {
    pub common: CipherSuiteCommon,

    /// The HMAC implementation the key schedule runs over.
    pub hmac_provider: &'static dyn hmac::Hmac,

    /// The AEAD that record-protection transforms are built from.
    pub aead_alg: &'static dyn Tls13AeadAlgorithm,
}

impl Tls13CipherSuite {
    /// Whether a PSK bound to `psk_suite` can be used with this suite:
    /// the two must share a hash function (RFC 8446 §4.2.11).
    pub fn usable_for_psk_of(&self, psk_suite: &Self) -> bool {
        self.common.hash_provider.algorithm() == psk_suite.common.hash_provider.algorithm()
    }
}

impl PartialEq for Tls13CipherSuite {
    fn eq(&self, other: &Self) -> bool {
        self.common.suite == other.common.suite
    }
}

impl fmt::Debug for Tls13CipherSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tls13CipherSuite")
            .field("suite", &self.common.suite)
            .finish()
    }
}
