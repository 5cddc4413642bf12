//! The certificate-validation seam.  Chain building, trust-anchor
//! handling and signature verification all happen behind
//! [`ServerCertVerifier`]; this crate only sequences the calls.

use alloc::vec::Vec;
use core::fmt::Debug;

use pki_types::{CertificateDer, ServerName, UnixTime};

use crate::crypto::hash;
use crate::error::Error;
use crate::msgs::handshake::DigitallySignedStruct;

/// Zero-sized proof that a server certificate chain was presented to a
/// verifier and accepted.
#[derive(Debug)]
pub struct ServerCertVerified(());

impl ServerCertVerified {
    /// Make a `ServerCertVerified`.
    pub fn assertion() -> Self {
        Self(())
    }
}

/// Zero-sized proof that a handshake signature was checked.
#[derive(Debug)]
pub struct HandshakeSignatureValid(());

impl HandshakeSignatureValid {
    /// Make a `HandshakeSignatureValid`.
    pub fn assertion() -> Self {
        Self(())
    }
}

/// Something that can verify a server certificate chain, and the
/// signature the server makes over the handshake transcript.
pub trait ServerCertVerifier: Send + Sync + Debug {
    /// Verify `end_entity` (with `intermediates` available for chain
    /// building) against the implementation's trust anchors, for use
    /// with `server_name`, at time `now` if a clock is available.
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        now: Option<UnixTime>,
    ) -> Result<ServerCertVerified, Error>;

    /// Verify the CertificateVerify signature `dss` over `message`,
    /// made with `cert`'s public key.
    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, Error>;
}

/// The payload a TLS 1.3 CertificateVerify signature covers
/// (RFC 8446 §4.4.3): 64 spaces, a context string, a zero byte and the
/// transcript hash.
fn construct_verify_message(
    context_string: &'static [u8],
    transcript_hash: &hash::Output,
) -> Vec<u8> {
    let mut message = Vec::with_capacity(64 + context_string.len() + 1 + 64);
    message.resize(64, 0x20);
    message.extend_from_slice(context_string);
    message.push(0x00);
    message.extend_from_slice(transcript_hash.as_ref());
    message
}

pub(crate) fn construct_tls13_server_verify_message(transcript_hash: &hash::Output) -> Vec<u8> {
    construct_verify_message(b"TLS 1.3, server CertificateVerify", transcript_hash)
}

pub(crate) fn construct_tls13_client_verify_message(transcript_hash: &hash::Output) -> Vec<u8> {
    construct_verify_message(b"TLS 1.3, client CertificateVerify", transcript_hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_message_layout() {
        let hash = hash::Output::new(&[0xab; 32]);
        let message = construct_tls13_server_verify_message(&hash);
        assert_eq!(&message[..64], &[0x20; 64]);
        assert_eq!(&message[64..97], b"TLS 1.3, server CertificateVerify");
        assert_eq!(message[97], 0x00);
        assert_eq!(&message[98..], &[0xab; 32]);
    }
}
