//! The TLS 1.3 client: configuration, the connection driver, and the
//! handshake states behind it.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;

use pki_types::{CertificateDer, ServerName, UnixTime};
use zeroize::Zeroizing;

use crate::conn::CommonState;
use crate::crypto::CryptoProvider;
use crate::enums::ProtocolVersion;
use crate::error::Error;
use crate::key_log::{KeyLog, NoKeyLog};
use crate::log::trace;
use crate::msgs::codec::Codec;
use crate::msgs::handshake::{HandshakeMessagePayload, ServerHelloPayload};
use crate::persist::Tls13ClientSessionValue;
use crate::record::RecordLayer;
use crate::sign::ResolvesClientCert;
use crate::time_provider::TimeProvider;
use crate::tls13::Tls13CipherSuite;
use crate::verify::ServerCertVerifier;

mod common;
pub(crate) mod hs;
mod tls13;

/// A key-exchange mode the client is willing to end up in.  The final
/// mode is decided by which extensions the ServerHello carries.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyExchangeMode {
    /// Pure PSK: no forward secrecy, no certificates.
    Psk,
    /// Certificates and an ephemeral key exchange.
    Ephemeral,
    /// A PSK combined with an ephemeral key exchange.
    PskEphemeral,
}

/// An externally provisioned PSK (identity plus secret), offered in
/// addition to any resumption ticket.  Bound to SHA-256 by convention.
#[derive(Clone, Debug)]
pub struct ExternalPsk {
    identity: Vec<u8>,
    secret: Zeroizing<Vec<u8>>,
}

impl ExternalPsk {
    pub fn new(identity: Vec<u8>, secret: Vec<u8>) -> Self {
        Self {
            identity,
            secret: Zeroizing::new(secret),
        }
    }

    pub fn identity(&self) -> &[u8] {
        &self.identity
    }

    pub(crate) fn secret(&self) -> &[u8] {
        &self.secret
    }
}

/// Where the early-data offer stands.  Tracking only; shuttling actual
/// 0-RTT application data is the record layer's business.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EarlyDataStatus {
    /// Not configured, not offered, or no usable ticket.
    NotOffered,
    /// Offered in the ClientHello; the server has not answered yet.
    Offered,
    /// The server accepted the offer in EncryptedExtensions.
    Accepted,
    /// The server ignored or rejected the offer (including via HRR).
    Rejected,
}

/// Configuration for a client connection, shared by reference and
/// read-only once a handshake starts.
///
/// Construct with [`ClientConfig::new`] and adjust the public fields
/// before the first connection uses it.
#[derive(Debug)]
pub struct ClientConfig {
    /// The cryptographic back-end: suites, key-exchange groups and
    /// randomness.
    pub provider: Arc<CryptoProvider>,

    /// The lowest protocol version we complete a handshake for.  When
    /// this is TLS 1.2 and the server genuinely selects TLS 1.2, the
    /// engine reports [`Status::DowngradedToTls12`] instead of failing.
    pub min_version: ProtocolVersion,

    /// The highest protocol version we offer; must be TLS 1.3.
    pub max_version: ProtocolVersion,

    /// Signature schemes we advertise for server authentication.
    pub signature_algorithms: Vec<crate::enums::SignatureScheme>,

    /// Which key-exchange modes may be negotiated.
    pub kex_modes: Vec<KeyExchangeMode>,

    /// An external PSK to offer alongside any resumption ticket.
    pub external_psk: Option<ExternalPsk>,

    /// A previous session to offer for resumption.
    pub resumption: Option<Tls13ClientSessionValue>,

    /// ALPN protocols, in preference order.  Empty disables ALPN.
    pub alpn_protocols: Vec<Vec<u8>>,

    /// Verifies the server's certificate chain; owns the trust
    /// anchors.
    pub verifier: Arc<dyn ServerCertVerifier>,

    /// Supplies client credentials when the server asks for them.
    pub client_auth_cert_resolver: Option<Arc<dyn ResolvesClientCert>>,

    /// Offer early data when a suitable ticket is available.
    pub enable_early_data: bool,

    /// Emit a dummy ChangeCipherSpec to humour inspecting middleboxes.
    pub enable_middlebox_compat: bool,

    /// Where derived secrets are logged for debugging.
    pub key_log: Arc<dyn KeyLog>,

    /// The wall clock, used only for ticket ages.
    pub time_provider: Option<Arc<dyn TimeProvider>>,
}

impl ClientConfig {
    /// A configuration with the given provider and verifier, ephemeral
    /// and PSK-ephemeral modes enabled, and everything optional off.
    pub fn new(provider: Arc<CryptoProvider>, verifier: Arc<dyn ServerCertVerifier>) -> Self {
        Self {
            provider,
            min_version: ProtocolVersion::TLSv1_2,
            max_version: ProtocolVersion::TLSv1_3,
            signature_algorithms: DEFAULT_SIGNATURE_ALGORITHMS.to_vec(),
            kex_modes: alloc::vec![KeyExchangeMode::Ephemeral, KeyExchangeMode::PskEphemeral],
            external_psk: None,
            resumption: None,
            alpn_protocols: Vec::new(),
            verifier,
            client_auth_cert_resolver: None,
            enable_early_data: false,
            enable_middlebox_compat: false,
            key_log: Arc::new(NoKeyLog),
            time_provider: None,
        }
    }

    pub(crate) fn supports_version(&self, version: ProtocolVersion) -> bool {
        u16::from(self.min_version) <= u16::from(version)
            && u16::from(version) <= u16::from(self.max_version)
    }

    pub(crate) fn ephemeral_mode_enabled(&self) -> bool {
        self.kex_modes
            .iter()
            .any(|m| matches!(m, KeyExchangeMode::Ephemeral | KeyExchangeMode::PskEphemeral))
    }

    pub(crate) fn mode_enabled(&self, mode: KeyExchangeMode) -> bool {
        self.kex_modes.contains(&mode)
    }

    pub(crate) fn current_time(&self) -> Option<UnixTime> {
        self.time_provider
            .as_ref()
            .and_then(|provider| provider.current_time())
    }
}

static DEFAULT_SIGNATURE_ALGORITHMS: &[crate::enums::SignatureScheme] = &[
    crate::enums::SignatureScheme::ECDSA_NISTP384_SHA384,
    crate::enums::SignatureScheme::ECDSA_NISTP256_SHA256,
    crate::enums::SignatureScheme::ED25519,
    crate::enums::SignatureScheme::RSA_PSS_SHA512,
    crate::enums::SignatureScheme::RSA_PSS_SHA384,
    crate::enums::SignatureScheme::RSA_PSS_SHA256,
    crate::enums::SignatureScheme::RSA_PKCS1_SHA512,
    crate::enums::SignatureScheme::RSA_PKCS1_SHA384,
    crate::enums::SignatureScheme::RSA_PKCS1_SHA256,
];

/// What one [`ClientConnection::step`] accomplished.
#[derive(Debug, Eq, PartialEq)]
pub enum Status {
    /// A message was processed; call `step` again.
    InProgress,
    /// The record layer has no complete message; feed it more input
    /// and call `step` again.
    WantRead,
    /// Application traffic keys are installed in both directions.
    Complete,
    /// A NewSessionTicket was processed; the caller may persist the
    /// session via [`ClientConnection::take_received_session`].
    ReceivedNewSessionTicket,
    /// The server selected TLS 1.2.  This engine goes no further; the
    /// kept ServerHello is available from
    /// [`ClientConnection::tls12_server_hello`] for a TLS 1.2 stack to
    /// continue with.
    DowngradedToTls12,
}

/// Connection-lifetime client data the states write into.
pub(crate) struct ClientConnectionData {
    pub(crate) early_data: EarlyDataStatus,
    pub(crate) handshake_complete: bool,
    pub(crate) received_ticket: bool,
    pub(crate) latest_session: Option<Tls13ClientSessionValue>,
    pub(crate) tls12_server_hello: Option<ServerHelloPayload>,
    pub(crate) server_cert_chain: Vec<CertificateDer<'static>>,
}

impl ClientConnectionData {
    fn new() -> Self {
        Self {
            early_data: EarlyDataStatus::NotOffered,
            handshake_complete: false,
            received_ticket: false,
            latest_session: None,
            tls12_server_hello: None,
            server_cert_chain: Vec::new(),
        }
    }
}

/// A single client connection's handshake engine.
///
/// Drive it by calling [`step`][ClientConnection::step] until it
/// reports [`Status::Complete`]; keep stepping afterwards to ingest
/// post-handshake NewSessionTicket messages.
pub struct ClientConnection {
    common: CommonState,
    data: ClientConnectionData,
    state: Option<Box<dyn hs::State>>,
    terminal_error: Option<Error>,
    reported_complete: bool,
}

impl ClientConnection {
    /// Begin a handshake with `server_name`, immediately queuing the
    /// ClientHello onto `record_layer`.
    pub fn new(
        config: Arc<ClientConfig>,
        server_name: ServerName<'static>,
        record_layer: Box<dyn RecordLayer>,
    ) -> Result<Self, Error> {
        let mut common = CommonState::new(record_layer, config.enable_middlebox_compat);
        let mut data = ClientConnectionData::new();

        let state = {
            let mut cx = hs::ClientContext {
                common: &mut common,
                data: &mut data,
            };
            hs::start_handshake(config, server_name, &mut cx)?
        };

        Ok(Self {
            common,
            data,
            state: Some(state),
            terminal_error: None,
            reported_complete: false,
        })
    }

    /// Run one state's worth of work: fetch at most one handshake
    /// message from the record layer and process it.
    pub fn step(&mut self) -> Result<Status, Error> {
        if let Some(err) = &self.terminal_error {
            return Err(err.clone());
        }

        if self.data.tls12_server_hello.is_some() {
            return Ok(Status::DowngradedToTls12);
        }

        let encoded = match self.common.record_layer.fetch_handshake_message() {
            Ok(Some(encoded)) => encoded,
            Ok(None) => return Ok(Status::WantRead),
            Err(err) => return Err(self.fatal(err)),
        };

        let msg = match HandshakeMessagePayload::read_bytes(&encoded) {
            Ok(msg) => msg,
            Err(err) => return Err(self.fatal(err.into())),
        };
        trace!("processing {:?}", msg.typ);

        let state = self
            .state
            .take()
            .ok_or(Error::HandshakeNotComplete)?;

        let mut cx = hs::ClientContext {
            common: &mut self.common,
            data: &mut self.data,
        };

        match state.handle(&mut cx, msg) {
            Ok(next) => {
                self.state = Some(next);
                Ok(self.status_after_progress())
            }
            Err(err) => Err(self.fatal(err)),
        }
    }

    fn status_after_progress(&mut self) -> Status {
        if core::mem::replace(&mut self.data.received_ticket, false) {
            return Status::ReceivedNewSessionTicket;
        }

        if self.data.tls12_server_hello.is_some() {
            return Status::DowngradedToTls12;
        }

        if self.data.handshake_complete && !self.reported_complete {
            self.reported_complete = true;
            return Status::Complete;
        }

        Status::InProgress
    }

    fn fatal(&mut self, err: Error) -> Error {
        if !self.common.has_sent_fatal_alert() {
            let desc = err.alert_description();
            let _ = self
                .common
                .send_fatal_alert(desc, err.clone());
        }
        self.terminal_error = Some(err.clone());
        self.state = None;
        err
    }

    /// Whether the handshake is still in flight.
    pub fn is_handshaking(&self) -> bool {
        !self.data.handshake_complete && self.terminal_error.is_none()
    }

    /// The negotiated protocol version, once ServerHello has been
    /// processed.  TLS 1.2 here means a handoff happened.
    pub fn protocol_version(&self) -> Option<ProtocolVersion> {
        self.common.negotiated_version
    }

    /// The negotiated cipher suite, once ServerHello has been
    /// processed.
    pub fn negotiated_cipher_suite(&self) -> Option<&'static Tls13CipherSuite> {
        self.common.suite
    }

    /// The protocol negotiated via ALPN, if any.
    pub fn alpn_protocol(&self) -> Option<&[u8]> {
        self.common.alpn_protocol.as_deref()
    }

    /// Where the early-data offer stands.
    pub fn early_data_status(&self) -> EarlyDataStatus {
        self.data.early_data
    }

    /// The server's certificate chain, once validated.
    pub fn peer_certificates(&self) -> &[CertificateDer<'static>] {
        &self.data.server_cert_chain
    }

    /// Take the most recent resumable session, produced by a
    /// NewSessionTicket.  Each new ticket replaces the previous one.
    pub fn take_received_session(&mut self) -> Option<Tls13ClientSessionValue> {
        self.data.latest_session.take()
    }

    /// The ServerHello kept for a TLS 1.2 stack after
    /// [`Status::DowngradedToTls12`].
    pub fn tls12_server_hello(&self) -> Option<&ServerHelloPayload> {
        self.data.tls12_server_hello.as_ref()
    }
}
