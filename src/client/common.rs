use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;

use pki_types::CertificateDer;
use zeroize::Zeroizing;

use crate::msgs::enums::ExtensionType;
use crate::sign::{CertifiedKey, Signer};
use crate::tls13::key_schedule::BinderKind;
use crate::tls13::Tls13CipherSuite;

/// Tracks what went into the last ClientHello, so replies can be
/// policed for unsolicited extensions.
pub(super) struct ClientHelloDetails {
    pub(super) sent_extensions: Vec<ExtensionType>,
}

impl ClientHelloDetails {
    pub(super) fn new() -> Self {
        Self {
            sent_extensions: Vec::new(),
        }
    }

    /// Whether any of `received` was never offered and is not in
    /// `allowed_unsolicited`.
    pub(super) fn server_sent_unsolicited_extensions(
        &self,
        received: impl Iterator<Item = ExtensionType>,
        allowed_unsolicited: &[ExtensionType],
    ) -> bool {
        for ext_type in received {
            if !self.sent_extensions.contains(&ext_type)
                && !allowed_unsolicited.contains(&ext_type)
            {
                return true;
            }
        }
        false
    }
}

/// One PSK we put on the wire in `pre_shared_key`, in offer order.
pub(super) struct OfferedPsk {
    pub(super) identity: Vec<u8>,
    pub(super) obfuscated_ticket_age: u32,
    pub(super) secret: Zeroizing<Vec<u8>>,
    pub(super) suite: &'static Tls13CipherSuite,
    pub(super) kind: BinderKind,
    /// For resumption offers: whether the ticket permits pure-PSK /
    /// PSK-ephemeral use respectively.  External PSKs permit whatever
    /// the config enables.
    pub(super) allows_psk: bool,
    pub(super) allows_psk_ephemeral: bool,
}

/// Client-authentication material gathered from a CertificateRequest.
pub(super) struct ClientAuthDetails {
    pub(super) certkey: Option<Arc<CertifiedKey>>,
    pub(super) signer: Option<Box<dyn Signer>>,
    pub(super) auth_context: Vec<u8>,
}

/// The server's certificate chain, carried between the Certificate and
/// CertificateVerify states.
pub(super) struct ServerCertDetails {
    pub(super) cert_chain: Vec<CertificateDer<'static>>,
}
