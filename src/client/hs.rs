//! The first act of the client handshake: ClientHello construction
//! (including the PSK offer and its binders), and classification of the
//! server's first message into ServerHello, HelloRetryRequest or a
//! TLS 1.2 downgrade.

use alloc::boxed::Box;
use alloc::borrow::ToOwned;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use pki_types::ServerName;
use zeroize::Zeroizing;

use crate::check::require_handshake_msg;
use crate::client::common::{ClientHelloDetails, OfferedPsk};
use crate::client::{tls13, ClientConfig, ClientConnectionData, EarlyDataStatus, KeyExchangeMode};
use crate::conn::{CommonState, ConnectionRandoms};
use crate::crypto::hash::HashAlgorithm;
use crate::crypto::ActiveKeyExchange;
use crate::enums::{AlertDescription, HandshakeType, ProtocolVersion};
use crate::error::{Error, PeerIncompatible, PeerMisbehaved};
use crate::hash_hs::HandshakeHashBuffer;
use crate::key_log::KeyLog;
use crate::log::{debug, trace};
use crate::msgs::enums::{Compression, PskKeyExchangeMode};
use crate::msgs::handshake::{
    ClientExtension, ClientHelloPayload, HandshakeMessagePayload, HandshakePayload,
    HasServerExtensions, HelloRetryRequest, KeyShareEntry, PresharedKeyBinder,
    PresharedKeyIdentity, PresharedKeyOffer, Random, ServerExtension, ServerHelloPayload,
    SessionId, ALLOWED_IN_SERVER_HELLO,
};
use crate::persist::TicketFlags;
use crate::tls13::key_schedule::{BinderKind, KeyScheduleEarly};
use crate::tls13::Tls13CipherSuite;

pub(super) type NextState = Box<dyn State>;
pub(super) type NextStateOrError = Result<NextState, Error>;

/// One client handshake state.  Each `handle()` consumes a whole
/// handshake message and yields the next state or a fatal error.
pub(crate) trait State: Send {
    fn handle(
        self: Box<Self>,
        cx: &mut ClientContext<'_>,
        m: HandshakeMessagePayload,
    ) -> NextStateOrError;
}

pub(crate) struct ClientContext<'a> {
    pub(crate) common: &'a mut CommonState,
    pub(crate) data: &'a mut ClientConnectionData,
}

pub(crate) fn start_handshake(
    config: Arc<ClientConfig>,
    server_name: ServerName<'static>,
    cx: &mut ClientContext<'_>,
) -> NextStateOrError {
    let transcript_buffer = HandshakeHashBuffer::new();

    let random = Random::new(config.provider.secure_random)?;
    let session_id = SessionId::random(config.provider.secure_random)?;

    let key_share = match config.ephemeral_mode_enabled() {
        true => Some(initial_key_share(&config)?),
        false => None,
    };

    emit_client_hello_for_retry(
        config,
        cx,
        random,
        transcript_buffer,
        ClientHelloDetails::new(),
        session_id,
        None,
        server_name,
        key_share,
        None,
    )
}

fn initial_key_share(config: &ClientConfig) -> Result<Box<dyn ActiveKeyExchange>, Error> {
    let group = config
        .provider
        .kx_groups
        .first()
        .ok_or_else(|| Error::General("no kx groups configured".into()))?;
    group.start()
}

/// Enumerate the PSKs worth offering, in their on-the-wire order: the
/// resumption ticket first, the external PSK second.
///
/// `selected_suite` is set after a HelloRetryRequest, when the cipher
/// suite is already fixed; offers bound to a different hash are
/// dropped.
fn offered_psks(
    config: &ClientConfig,
    selected_suite: Option<&'static Tls13CipherSuite>,
) -> Vec<OfferedPsk> {
    let mut offers = Vec::new();
    let hash_matches = |suite: &'static Tls13CipherSuite| match selected_suite {
        Some(selected) => selected.usable_for_psk_of(suite),
        None => true,
    };

    if let Some(resumption) = &config.resumption {
        let flags = resumption.flags();
        let allows_psk = flags.contains(TicketFlags::ALLOW_PSK_RESUMPTION)
            && config.mode_enabled(KeyExchangeMode::Psk);
        let allows_psk_ephemeral = flags.contains(TicketFlags::ALLOW_PSK_EPHEMERAL_RESUMPTION)
            && config.mode_enabled(KeyExchangeMode::PskEphemeral);
        let now = config.current_time();

        let usable = !resumption.ticket().is_empty()
            && (allows_psk || allows_psk_ephemeral)
            && !resumption.has_expired(now)
            && config
                .provider
                .find_cipher_suite(resumption.suite().common.suite)
                .is_some()
            && hash_matches(resumption.suite());

        if usable {
            offers.push(OfferedPsk {
                identity: resumption.ticket().to_vec(),
                obfuscated_ticket_age: resumption.obfuscated_ticket_age(now),
                secret: Zeroizing::new(resumption.secret().to_vec()),
                suite: resumption.suite(),
                kind: BinderKind::Resumption,
                allows_psk,
                allows_psk_ephemeral,
            });
        }
    }

    if let Some(psk) = &config.external_psk {
        let any_psk_mode = config.mode_enabled(KeyExchangeMode::Psk)
            || config.mode_enabled(KeyExchangeMode::PskEphemeral);

        // external PSKs are bound to SHA-256 by convention
        let suite = config
            .provider
            .cipher_suites
            .iter()
            .copied()
            .find(|suite| suite.common.hash_provider.algorithm() == HashAlgorithm::SHA256);

        match (any_psk_mode, suite) {
            (true, Some(suite)) if hash_matches(suite) => offers.push(OfferedPsk {
                identity: psk.identity().to_vec(),
                obfuscated_ticket_age: 0,
                secret: Zeroizing::new(psk.secret().to_vec()),
                suite,
                kind: BinderKind::External,
                allows_psk: config.mode_enabled(KeyExchangeMode::Psk),
                allows_psk_ephemeral: config.mode_enabled(KeyExchangeMode::PskEphemeral),
            }),
            (true, _) => {
                debug!("external PSK configured but no usable SHA-256 suite; not offering it");
            }
            _ => {}
        }
    }

    offers
}

fn emit_client_hello_for_retry(
    config: Arc<ClientConfig>,
    cx: &mut ClientContext<'_>,
    random: Random,
    mut transcript_buffer: HandshakeHashBuffer,
    mut hello: ClientHelloDetails,
    session_id: SessionId,
    retryreq: Option<&HelloRetryRequest>,
    server_name: ServerName<'static>,
    key_share: Option<Box<dyn ActiveKeyExchange>>,
    suite: Option<&'static Tls13CipherSuite>,
) -> NextStateOrError {
    let mut supported_versions = vec![ProtocolVersion::TLSv1_3];
    if config.supports_version(ProtocolVersion::TLSv1_2) {
        supported_versions.push(ProtocolVersion::TLSv1_2);
    }

    let mut exts = vec![ClientExtension::SupportedVersions(supported_versions)];

    if let ServerName::DnsName(dns_name) = &server_name {
        exts.push(ClientExtension::make_sni(dns_name.as_ref()));
    }

    exts.push(ClientExtension::NamedGroups(
        config
            .provider
            .kx_groups
            .iter()
            .map(|group| group.name())
            .collect(),
    ));
    exts.push(ClientExtension::SignatureAlgorithms(
        config.signature_algorithms.clone(),
    ));

    if !config.alpn_protocols.is_empty() {
        exts.push(ClientExtension::Protocols(
            config
                .alpn_protocols
                .iter()
                .map(|proto| proto.clone().into())
                .collect(),
        ));
    }

    // echo the HelloRetryRequest cookie, if any
    if let Some(cookie) = retryreq.and_then(HelloRetryRequest::cookie) {
        exts.push(ClientExtension::Cookie(cookie.clone()));
    }

    if let Some(key_share) = &key_share {
        let entry = KeyShareEntry::new(key_share.group(), key_share.pub_key());
        exts.push(ClientExtension::KeyShare(vec![entry]));
    }

    let mut psk_modes = Vec::new();
    if config.mode_enabled(KeyExchangeMode::PskEphemeral) {
        psk_modes.push(PskKeyExchangeMode::PSK_DHE_KE);
    }
    if config.mode_enabled(KeyExchangeMode::Psk) {
        psk_modes.push(PskKeyExchangeMode::PSK_KE);
    }
    if !psk_modes.is_empty() {
        exts.push(ClientExtension::PresharedKeyModes(psk_modes));
    }

    let offers = offered_psks(&config, suite);

    // Early data rides on the first offer, which must be a ticket that
    // permits it; never re-offered after a retry.
    let early_data_possible = config.enable_early_data
        && retryreq.is_none()
        && matches!(
            offers.first(),
            Some(offer) if offer.kind == BinderKind::Resumption
        )
        && matches!(
            &config.resumption,
            Some(resumption) if resumption.flags().contains(TicketFlags::ALLOW_EARLY_DATA)
                && resumption.max_early_data_size() > 0
        );
    if early_data_possible {
        exts.push(ClientExtension::EarlyData);
    }

    // `pre_shared_key` must come last: binders cover everything before
    // them.
    if !offers.is_empty() {
        let identities = offers
            .iter()
            .map(|offer| PresharedKeyIdentity::new(offer.identity.clone(), offer.obfuscated_ticket_age))
            .collect();
        let binders = offers
            .iter()
            .map(|offer| {
                PresharedKeyBinder::new(vec![0u8; offer.suite.common.hash_provider.output_len()])
            })
            .collect();
        exts.push(ClientExtension::PresharedKey(PresharedKeyOffer {
            identities,
            binders,
        }));
    }

    hello.sent_extensions = exts
        .iter()
        .map(ClientExtension::ext_type)
        .collect();

    let mut chp = HandshakeMessagePayload {
        typ: HandshakeType::ClientHello,
        payload: HandshakePayload::ClientHello(ClientHelloPayload {
            client_version: ProtocolVersion::TLSv1_2,
            random,
            session_id,
            cipher_suites: config
                .provider
                .cipher_suites
                .iter()
                .map(|suite| suite.common.suite)
                .collect(),
            compression_methods: vec![Compression::Null],
            extensions: exts,
        }),
    };

    if !offers.is_empty() {
        tls13::fill_in_psk_binders(&offers, &transcript_buffer, &mut chp);
    }

    trace!("sending ClientHello {:?}", chp);
    transcript_buffer.add_message(&chp);

    // dummy CCS before the second ClientHello, in compatibility mode
    if retryreq.is_some() {
        cx.common.send_fake_ccs();
    }
    cx.common.send_handshake_message(&chp);

    if early_data_possible {
        cx.data.early_data = EarlyDataStatus::Offered;
        derive_early_traffic_secret(&offers[0], &transcript_buffer, &random, &*config.key_log);
    }

    let next = ExpectServerHello {
        config,
        server_name,
        random,
        session_id,
        transcript_buffer,
        hello,
        offered_key_share: key_share,
        offered_psks: offers,
        suite,
    };

    match retryreq {
        // an initial ClientHello may be answered with a retry
        None => Ok(Box::new(ExpectServerHelloOrHelloRetryRequest { next })),
        // a second one may not
        Some(_) => Ok(Box::new(next)),
    }
}

/// Derive (and log) the early traffic secret.  Carrying actual 0-RTT
/// application data is the record layer's business; the engine only
/// tracks the offer and provides the secret to observers.
fn derive_early_traffic_secret(
    offer: &OfferedPsk,
    transcript_buffer: &HandshakeHashBuffer,
    random: &Random,
    key_log: &dyn KeyLog,
) {
    if !key_log.will_log("CLIENT_EARLY_TRAFFIC_SECRET") {
        return;
    }

    let schedule = KeyScheduleEarly::new(offer.suite, &offer.secret);
    let hello_hash = transcript_buffer.hash_given(offer.suite.common.hash_provider, &[]);
    let _ = schedule.client_early_traffic_secret(&hello_hash, key_log, &random.0);
}

pub(super) fn process_alpn_protocol(
    cx: &mut ClientContext<'_>,
    config: &ClientConfig,
    proto: Option<&[u8]>,
) -> Result<(), Error> {
    cx.common.alpn_protocol = proto.map(ToOwned::to_owned);

    if let Some(alpn_protocol) = &cx.common.alpn_protocol {
        if !config.alpn_protocols.contains(alpn_protocol) {
            return Err(cx.common.send_fatal_alert(
                AlertDescription::IllegalParameter,
                PeerMisbehaved::SelectedUnofferedApplicationProtocol,
            ));
        }
    }

    debug!("ALPN protocol is {:?}", cx.common.alpn_protocol);
    Ok(())
}

struct ExpectServerHello {
    config: Arc<ClientConfig>,
    server_name: ServerName<'static>,
    random: Random,
    session_id: SessionId,
    transcript_buffer: HandshakeHashBuffer,
    hello: ClientHelloDetails,
    offered_key_share: Option<Box<dyn ActiveKeyExchange>>,
    offered_psks: Vec<OfferedPsk>,
    /// Fixed by a HelloRetryRequest; the ServerHello may not vary it.
    suite: Option<&'static Tls13CipherSuite>,
}

struct ExpectServerHelloOrHelloRetryRequest {
    next: ExpectServerHello,
}

impl State for ExpectServerHello {
    fn handle(
        self: Box<Self>,
        cx: &mut ClientContext<'_>,
        m: HandshakeMessagePayload,
    ) -> NextStateOrError {
        let mut st = *self;
        let server_hello =
            require_handshake_msg!(m, HandshakeType::ServerHello, HandshakePayload::ServerHello)?;
        trace!("got ServerHello {:?}", server_hello);

        if server_hello.legacy_version != ProtocolVersion::TLSv1_2 {
            return Err(cx.common.send_fatal_alert(
                AlertDescription::ProtocolVersion,
                PeerIncompatible::ServerSentWrongLegacyVersion,
            ));
        }

        // The presence (and value) of supported_versions decides
        // whether this is TLS 1.3 at all; everything below it is a
        // TLS 1.3 rule.  In particular a genuine TLS 1.2 ServerHello
        // carries a server-chosen session id, not an echo.
        match server_hello.supported_versions() {
            Some(ProtocolVersion::TLSv1_3) => {}
            Some(_) => {
                return Err(cx.common.send_fatal_alert(
                    AlertDescription::IllegalParameter,
                    PeerMisbehaved::SelectedTls12UsingTls13VersionExtension,
                ));
            }
            None => return st.handle_tls12_selection(cx, server_hello),
        }

        if server_hello.compression_method != Compression::Null {
            return Err(cx.common.send_fatal_alert(
                AlertDescription::IllegalParameter,
                PeerMisbehaved::SelectedUnofferedCompression,
            ));
        }

        if server_hello.session_id != st.session_id {
            return Err(cx.common.send_fatal_alert(
                AlertDescription::IllegalParameter,
                PeerMisbehaved::ServerEchoedIncompatibleSessionId,
            ));
        }

        if server_hello.has_duplicate_extension() {
            return Err(cx.common.send_fatal_alert(
                AlertDescription::IllegalParameter,
                PeerMisbehaved::DuplicateExtension,
            ));
        }

        if server_hello
            .extensions
            .iter()
            .any(|ext| !ALLOWED_IN_SERVER_HELLO.contains(&ext.ext_type()))
        {
            return Err(cx.common.send_fatal_alert(
                AlertDescription::UnsupportedExtension,
                PeerMisbehaved::DisallowedExtension,
            ));
        }

        if st.hello.server_sent_unsolicited_extensions(
            server_hello
                .extensions
                .iter()
                .map(ServerExtension::ext_type),
            &[],
        ) {
            return Err(cx.common.send_fatal_alert(
                AlertDescription::UnsupportedExtension,
                PeerMisbehaved::UnsolicitedExtension,
            ));
        }

        let suite = st
            .config
            .provider
            .find_cipher_suite(server_hello.cipher_suite)
            .ok_or_else(|| {
                cx.common.send_fatal_alert(
                    AlertDescription::HandshakeFailure,
                    PeerIncompatible::SelectedUnofferedCipherSuite,
                )
            })?;

        if let Some(fixed) = st.suite {
            // a retry pinned the suite already
            if fixed != suite {
                return Err(cx.common.send_fatal_alert(
                    AlertDescription::IllegalParameter,
                    PeerMisbehaved::SelectedDifferentCipherSuiteAfterRetry,
                ));
            }
        }
        debug!("using cipher suite {:?}", suite);

        cx.common.suite = Some(suite);
        cx.common.negotiated_version = Some(ProtocolVersion::TLSv1_3);

        let mut transcript = st
            .transcript_buffer
            .start_hash(suite.common.hash_provider);
        transcript.add_message(&m);

        let randoms = ConnectionRandoms::new(st.random.0, server_hello.random.0);

        tls13::handle_server_hello(
            st.config,
            cx,
            server_hello,
            st.server_name,
            randoms,
            suite,
            transcript,
            st.hello,
            st.offered_psks,
            st.offered_key_share,
        )
    }
}

impl ExpectServerHello {
    /// The server picked TLS ≤ 1.2.  Check the RFC 8446 §4.1.3
    /// downgrade guard, then either refuse or hand the connection off.
    fn handle_tls12_selection(
        self,
        cx: &mut ClientContext<'_>,
        server_hello: &ServerHelloPayload,
    ) -> NextStateOrError {
        // We always offer TLS 1.3, so a sentinel is always an attack.
        if server_hello.random.has_downgrade_sentinel() {
            return Err(cx.common.send_fatal_alert(
                AlertDescription::IllegalParameter,
                PeerMisbehaved::AttemptedDowngradeToTls12WhenTls13IsSupported,
            ));
        }

        if !self.config.supports_version(ProtocolVersion::TLSv1_2) {
            return Err(cx.common.send_fatal_alert(
                AlertDescription::IllegalParameter,
                PeerMisbehaved::SelectedUnofferedVersion,
            ));
        }

        debug!("server chose TLS 1.2; handing off");
        cx.common.negotiated_version = Some(ProtocolVersion::TLSv1_2);

        // The ephemeral key is for TLS 1.3 key shares only.
        drop(self.offered_key_share);

        cx.data.tls12_server_hello = Some(server_hello.clone());
        Ok(Box::new(ExpectTls12Handoff))
    }
}

/// Terminal state after a TLS 1.2 handoff: this engine processes
/// nothing further.
struct ExpectTls12Handoff;

impl State for ExpectTls12Handoff {
    fn handle(
        self: Box<Self>,
        _cx: &mut ClientContext<'_>,
        m: HandshakeMessagePayload,
    ) -> NextStateOrError {
        Err(crate::check::inappropriate_handshake_message(&m, &[]))
    }
}

impl ExpectServerHelloOrHelloRetryRequest {
    fn handle_hello_retry_request(
        self,
        cx: &mut ClientContext<'_>,
        m: HandshakeMessagePayload,
    ) -> NextStateOrError {
        let hrr = require_handshake_msg!(
            m,
            HandshakeType::ServerHello,
            HandshakePayload::HelloRetryRequest
        )?;
        trace!("got HRR {:?}", hrr);

        let mut st = self.next;

        if hrr.has_duplicate_extension() {
            return Err(cx.common.send_fatal_alert(
                AlertDescription::IllegalParameter,
                PeerMisbehaved::DuplicateExtension,
            ));
        }

        if hrr.has_disallowed_extension() {
            return Err(cx.common.send_fatal_alert(
                AlertDescription::UnsupportedExtension,
                PeerIncompatible::ServerSentHelloRetryRequestWithUnknownExtension,
            ));
        }

        if hrr.session_id != st.session_id {
            return Err(cx.common.send_fatal_alert(
                AlertDescription::IllegalParameter,
                PeerMisbehaved::ServerEchoedIncompatibleSessionId,
            ));
        }

        match hrr.supported_versions() {
            Some(ProtocolVersion::TLSv1_3) => {
                cx.common.negotiated_version = Some(ProtocolVersion::TLSv1_3);
            }
            _ => {
                return Err(cx.common.send_fatal_alert(
                    AlertDescription::IllegalParameter,
                    PeerMisbehaved::IllegalHelloRetryRequestWithWrongVersion,
                ));
            }
        }

        let cookie = hrr.cookie();
        if let Some(cookie) = cookie {
            if cookie.0.is_empty() {
                return Err(cx.common.send_fatal_alert(
                    AlertDescription::IllegalParameter,
                    PeerMisbehaved::IllegalHelloRetryRequestWithEmptyCookie,
                ));
            }
        }

        let req_group = hrr.requested_key_share_group();
        if cookie.is_none() && req_group.is_none() {
            return Err(cx.common.send_fatal_alert(
                AlertDescription::IllegalParameter,
                PeerMisbehaved::IllegalHelloRetryRequestWithNoChanges,
            ));
        }

        let offered_group = st
            .offered_key_share
            .as_ref()
            .map(|share| share.group());
        if let Some(group) = req_group {
            // a retry can only ask us to move a share we actually sent
            if offered_group.is_none() {
                return Err(cx.common.send_fatal_alert(
                    AlertDescription::UnsupportedExtension,
                    PeerMisbehaved::UnsolicitedExtension,
                ));
            }

            if Some(group) == offered_group {
                return Err(cx.common.send_fatal_alert(
                    AlertDescription::IllegalParameter,
                    PeerMisbehaved::IllegalHelloRetryRequestWithOfferedGroup,
                ));
            }

            if st.config.provider.find_kx_group(group).is_none() {
                return Err(cx.common.send_fatal_alert(
                    AlertDescription::IllegalParameter,
                    PeerMisbehaved::IllegalHelloRetryRequestWithUnofferedGroup,
                ));
            }
        }

        let suite = st
            .config
            .provider
            .find_cipher_suite(hrr.cipher_suite)
            .ok_or_else(|| {
                cx.common.send_fatal_alert(
                    AlertDescription::HandshakeFailure,
                    PeerIncompatible::SelectedUnofferedCipherSuite,
                )
            })?;

        // The retry fixes the suite; roll the transcript up into the
        // synthetic message_hash form (RFC 8446 §4.4.1).
        cx.common.suite = Some(suite);
        let transcript = st
            .transcript_buffer
            .start_hash(suite.common.hash_provider);
        let mut transcript_buffer = transcript.into_hrr_buffer();
        transcript_buffer.add_message(&m);

        // Early data may not survive a retry.
        if cx.data.early_data == EarlyDataStatus::Offered {
            cx.data.early_data = EarlyDataStatus::Rejected;
        }

        // Regenerate the key share for the requested group, destroying
        // the old private key before a new one exists.
        let key_share = match req_group {
            Some(group) => {
                let skxg = st
                    .config
                    .provider
                    .find_kx_group(group)
                    .expect("checked above");
                st.offered_key_share.take();
                Some(skxg.start()?)
            }
            None => st.offered_key_share.take(),
        };

        emit_client_hello_for_retry(
            st.config,
            cx,
            st.random,
            transcript_buffer,
            st.hello,
            st.session_id,
            Some(hrr),
            st.server_name,
            key_share,
            Some(suite),
        )
    }
}

impl State for ExpectServerHelloOrHelloRetryRequest {
    fn handle(
        self: Box<Self>,
        cx: &mut ClientContext<'_>,
        m: HandshakeMessagePayload,
    ) -> NextStateOrError {
        match &m.payload {
            HandshakePayload::ServerHello(_) => Box::new(self.next).handle(cx, m),
            HandshakePayload::HelloRetryRequest(_) => self.handle_hello_retry_request(cx, m),
            _ => Err(crate::check::inappropriate_handshake_message(
                &m,
                &[HandshakeType::ServerHello],
            )),
        }
    }
}
