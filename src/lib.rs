//! # thintls
//!
//! A client-side TLS 1.3 handshake engine.
//!
//! This crate owns the hard, protocol-shaped middle of a TLS 1.3
//! client: the RFC 8446 handshake state machine (full handshakes,
//! HelloRetryRequest retries, PSK and PSK-ECDHE resumption, optional
//! client authentication, downgrade detection), the handshake wire
//! codec with its per-message extension rules, and the key schedule
//! that turns transcript hashes into traffic secrets.
//!
//! It deliberately does not own the edges.  Record protection lives
//! behind [`RecordLayer`]; raw cryptography (hashing, HMAC, AEAD,
//! key exchange) behind the traits in [`crypto`]; certificate
//! validation behind [`ServerCertVerifier`]; the wall clock behind
//! [`TimeProvider`].  Callers wire those up once, then drive
//! [`ClientConnection::step`] until the handshake completes:
//!
//! ```ignore
//! let config = Arc::new(ClientConfig::new(provider, verifier));
//! let mut conn = ClientConnection::new(config, server_name, record_layer)?;
//!
//! loop {
//!     match conn.step()? {
//!         Status::WantRead => feed_more_bytes(),
//!         Status::Complete => break,
//!         Status::ReceivedNewSessionTicket => persist(conn.take_received_session()),
//!         Status::DowngradedToTls12 => return continue_with_tls12(conn),
//!         Status::InProgress => {}
//!     }
//! }
//! ```
//!
//! The engine is single-threaded and cooperative: each `step()` call
//! processes at most one handshake message, and all suspension points
//! are record-layer boundaries.

#![no_std]
#![allow(clippy::upper_case_acronyms)]

extern crate alloc;

#[cfg(any(test, feature = "std"))]
extern crate std;

#[macro_use]
mod msgs;

mod check;
mod client;
mod conn;
mod enums;
mod error;
mod hash_hs;
mod key_log;
mod log;
mod persist;
mod record;
mod sign;
mod time_provider;
mod verify;

pub mod crypto;
pub mod tls13;

#[cfg(test)]
mod test_provider;

pub use crate::client::{
    ClientConfig, ClientConnection, EarlyDataStatus, ExternalPsk, KeyExchangeMode, Status,
};
pub use crate::enums::{
    AlertDescription, CipherSuite, ContentType, HandshakeType, ProtocolVersion, SignatureScheme,
};
pub use crate::error::{
    CertificateError, Error, InvalidMessage, PeerIncompatible, PeerMisbehaved,
};
pub use crate::key_log::{KeyLog, NoKeyLog};
pub use crate::msgs::handshake::DigitallySignedStruct;
pub use crate::msgs::enums::{
    Compression, ExtensionType, NamedGroup, PskKeyExchangeMode, ServerNameType,
};
pub use crate::persist::{TicketFlags, Tls13ClientSessionValue};
pub use crate::record::RecordLayer;
pub use crate::sign::{CertifiedKey, ResolvesClientCert, Signer, SigningKey};
pub use crate::time_provider::TimeProvider;
#[cfg(feature = "std")]
pub use crate::time_provider::DefaultTimeProvider;
pub use crate::verify::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};

/// Items for use by crates providing cryptographic primitives or
/// record layers, not needed by ordinary callers.
pub mod internal {
    /// Low-level handshake message types.
    pub mod msgs {
        pub use crate::msgs::base::{Payload, PayloadU16, PayloadU24, PayloadU8};
        pub use crate::msgs::codec::{u24, Codec, ListLength, Reader, TlsListElement};
        pub use crate::msgs::handshake::{
            CertReqExtension, CertificateEntry, CertificateExtension, CertificatePayloadTls13,
            CertificateRequestPayloadTls13, ClientExtension, ClientHelloPayload,
            DigitallySignedStruct, HandshakeMessagePayload, HandshakePayload, HasServerExtensions,
            HelloRetryExtension, HelloRetryRequest, KeyShareEntry, NewSessionTicketExtension,
            NewSessionTicketPayloadTls13, PresharedKeyBinder, PresharedKeyIdentity,
            PresharedKeyOffer, ProtocolName, Random, ServerExtension, ServerHelloPayload,
            ServerNameEntry, SessionId, UnknownExtension, HELLO_RETRY_REQUEST_RANDOM,
        };
    }
}
