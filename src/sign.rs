//! The client-authentication signing seam.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt::Debug;

use pki_types::CertificateDer;

use crate::enums::SignatureScheme;
use crate::error::Error;

/// An abstract signing key.
pub trait SigningKey: Send + Sync + Debug {
    /// Choose a scheme from those offered by the server, if this key
    /// supports any.
    fn choose_scheme(&self, offered: &[SignatureScheme]) -> Option<Box<dyn Signer>>;
}

/// A thing that can sign a message with a chosen scheme.
pub trait Signer: Send + Sync {
    /// Sign `message` using the scheme this signer was made for.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, Error>;

    /// The scheme this signer signs with.
    fn scheme(&self) -> SignatureScheme;
}

/// A certificate chain plus the key for its end-entity certificate.
#[derive(Clone, Debug)]
pub struct CertifiedKey {
    /// The certificate chain, end-entity first.
    pub cert: Vec<CertificateDer<'static>>,

    /// The end-entity certificate's key.
    pub key: Arc<dyn SigningKey>,
}

/// Decides which client credentials, if any, to present in response to
/// a CertificateRequest.
pub trait ResolvesClientCert: Send + Sync + Debug {
    /// Resolve a certified key for the given acceptable issuer hints
    /// and signature schemes.  Returning `None` sends an empty
    /// Certificate, declining authentication.
    fn resolve(
        &self,
        root_hint_subjects: &[&[u8]],
        sigschemes: &[SignatureScheme],
    ) -> Option<Arc<CertifiedKey>>;
}
