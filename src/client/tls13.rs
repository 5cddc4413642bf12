//! The encrypted half of the client handshake: everything after the
//! ServerHello decides the key-exchange mode, through the server and
//! client flights, into post-handshake ticket processing.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;

use pki_types::ServerName;

use crate::check::require_handshake_msg;
use crate::client::common::{ClientAuthDetails, ClientHelloDetails, OfferedPsk, ServerCertDetails};
use crate::client::hs::{self, ClientContext};
use crate::client::{ClientConfig, EarlyDataStatus, KeyExchangeMode};
use crate::conn::{CommonState, ConnectionRandoms};
use crate::crypto::ActiveKeyExchange;
use crate::enums::{AlertDescription, HandshakeType, SignatureScheme};
use crate::error::{Error, InvalidMessage, PeerIncompatible, PeerMisbehaved};
use crate::hash_hs::{HandshakeHash, HandshakeHashBuffer};
use crate::log::{debug, trace, warn};
use crate::msgs::base::{Payload, PayloadU8};
use crate::msgs::enums::ExtensionType;
use crate::msgs::handshake::{
    CertificateEntry, CertificatePayloadTls13, DigitallySignedStruct, HandshakeMessagePayload,
    HandshakePayload, HasServerExtensions, NewSessionTicketPayloadTls13, ServerExtension,
    ServerHelloPayload, ALLOWED_IN_ENCRYPTED_EXTENSIONS, ALLOWED_IN_HELLO_RETRY,
    ALLOWED_IN_SERVER_HELLO,
};
use crate::persist::{TicketFlags, Tls13ClientSessionValue};
use crate::tls13::key_schedule::{
    new_tls13_read, new_tls13_write, verify_data_matches, KeyScheduleEarly,
    KeyScheduleHandshake, KeySchedulePreHandshake, KeyScheduleTraffic,
};
use crate::tls13::Tls13CipherSuite;
use crate::verify::{
    construct_tls13_client_verify_message, construct_tls13_server_verify_message,
    HandshakeSignatureValid, ServerCertVerified,
};

/// Process a genuine TLS 1.3 ServerHello: decide the key-exchange
/// mode, run the key schedule up to the handshake secrets, and install
/// the handshake transforms.
pub(super) fn handle_server_hello(
    config: Arc<ClientConfig>,
    cx: &mut ClientContext<'_>,
    server_hello: &ServerHelloPayload,
    server_name: ServerName<'static>,
    randoms: ConnectionRandoms,
    suite: &'static Tls13CipherSuite,
    transcript: HandshakeHash,
    hello: ClientHelloDetails,
    offered_psks: Vec<OfferedPsk>,
    our_key_share: Option<Box<dyn ActiveKeyExchange>>,
) -> hs::NextStateOrError {
    let their_key_share = server_hello.key_share();
    let selected_psk = server_hello.psk_index();

    // The mode decision table: which extensions came back decides the
    // key-exchange mode, subject to the locally enabled modes.
    let (mode, selected_offer) = match (selected_psk, their_key_share.is_some()) {
        (None, false) => {
            return Err(cx.common.send_fatal_alert(
                AlertDescription::HandshakeFailure,
                PeerIncompatible::ServerOmittedKeyShareAndPreSharedKey,
            ));
        }
        (None, true) => {
            if !config.mode_enabled(KeyExchangeMode::Ephemeral) {
                return Err(cx.common.send_fatal_alert(
                    AlertDescription::HandshakeFailure,
                    PeerIncompatible::NoKeyExchangeModeInCommon,
                ));
            }
            (KeyExchangeMode::Ephemeral, None)
        }
        (Some(index), key_share_present) => {
            let index = usize::from(index);
            let offer = match offered_psks.get(index) {
                Some(offer) => offer,
                None => {
                    return Err(cx.common.send_fatal_alert(
                        AlertDescription::IllegalParameter,
                        PeerMisbehaved::SelectedInvalidPsk,
                    ));
                }
            };

            if !suite.usable_for_psk_of(offer.suite) {
                return Err(cx.common.send_fatal_alert(
                    AlertDescription::IllegalParameter,
                    PeerMisbehaved::OfferedIncompatibleCipherSuiteForPsk,
                ));
            }

            let (mode, permitted) = match key_share_present {
                true => (KeyExchangeMode::PskEphemeral, offer.allows_psk_ephemeral),
                false => (KeyExchangeMode::Psk, offer.allows_psk),
            };
            if !permitted {
                return Err(cx.common.send_fatal_alert(
                    AlertDescription::HandshakeFailure,
                    PeerIncompatible::NoKeyExchangeModeInCommon,
                ));
            }

            debug!("using PSK at index {} in {:?} mode", index, mode);
            (mode, Some(offer))
        }
    };

    // Early data can only have been accepted against our first offer.
    if cx.data.early_data == EarlyDataStatus::Offered && selected_psk != Some(0) {
        cx.data.early_data = EarlyDataStatus::Rejected;
    }

    let shared = match (mode, their_key_share) {
        (KeyExchangeMode::Psk, _) => {
            // the handshake is anchored in the PSK alone; the ephemeral
            // key (if any) dies here
            drop(our_key_share);
            None
        }
        (_, Some(their_key_share)) => {
            let ours = our_key_share.ok_or_else(|| {
                Error::General("server sent key_share but none was offered".into())
            })?;

            if ours.group() != their_key_share.group {
                return Err(cx.common.send_fatal_alert(
                    AlertDescription::HandshakeFailure,
                    PeerIncompatible::SelectedUnofferedKxGroup,
                ));
            }

            Some(ours.complete(&their_key_share.payload.0)?)
        }
        _ => unreachable!("modes with a key exchange imply a server key_share"),
    };

    let start = match selected_offer {
        Some(offer) => {
            KeyScheduleEarly::new(suite, &offer.secret).into_handshake(shared.as_ref())
        }
        None => KeySchedulePreHandshake::new(suite).into_handshake(shared.as_ref()),
    };

    let hello_hash = transcript.current_hash();
    let key_schedule =
        start.derive_handshake_secrets(&hello_hash, &*config.key_log, &randoms.client);

    // Decrypt with the peer's key from the very next record, encrypt
    // with ours from our next flight.
    cx.common
        .record_layer
        .set_message_decrypter(new_tls13_read(suite, key_schedule.server_key()));
    cx.common
        .record_layer
        .set_message_encrypter(new_tls13_write(suite, key_schedule.client_key()));

    Ok(Box::new(ExpectEncryptedExtensions {
        config,
        server_name,
        randoms,
        suite,
        transcript,
        key_schedule,
        hello,
        mode,
    }))
}

struct ExpectEncryptedExtensions {
    config: Arc<ClientConfig>,
    server_name: ServerName<'static>,
    randoms: ConnectionRandoms,
    suite: &'static Tls13CipherSuite,
    transcript: HandshakeHash,
    key_schedule: KeyScheduleHandshake,
    hello: ClientHelloDetails,
    mode: KeyExchangeMode,
}

fn validate_encrypted_extensions(
    common: &mut CommonState,
    hello: &ClientHelloDetails,
    exts: &[ServerExtension],
) -> Result<(), Error> {
    if exts.has_duplicate_extension() {
        return Err(common.send_fatal_alert(
            AlertDescription::IllegalParameter,
            PeerMisbehaved::DuplicateExtension,
        ));
    }

    if hello.server_sent_unsolicited_extensions(
        exts.iter().map(ServerExtension::ext_type),
        &[],
    ) {
        return Err(common.send_fatal_alert(
            AlertDescription::UnsupportedExtension,
            PeerMisbehaved::UnsolicitedExtension,
        ));
    }

    // Extensions confined to (retry-)hello messages cannot reappear
    // here; anything else we offered but don't act on is ignored.
    for ext in exts {
        let typ = ext.ext_type();
        let hello_only = (ALLOWED_IN_SERVER_HELLO.contains(&typ)
            || ALLOWED_IN_HELLO_RETRY.contains(&typ)
            || typ == ExtensionType::PSKKeyExchangeModes)
            && !ALLOWED_IN_ENCRYPTED_EXTENSIONS.contains(&typ);
        if hello_only {
            return Err(common.send_fatal_alert(
                AlertDescription::UnsupportedExtension,
                PeerMisbehaved::DisallowedExtension,
            ));
        }
    }

    Ok(())
}

impl hs::State for ExpectEncryptedExtensions {
    fn handle(
        self: Box<Self>,
        cx: &mut ClientContext<'_>,
        m: HandshakeMessagePayload,
    ) -> hs::NextStateOrError {
        let mut st = *self;
        let exts = require_handshake_msg!(
            m,
            HandshakeType::EncryptedExtensions,
            HandshakePayload::EncryptedExtensions
        )?;
        debug!("TLS 1.3 encrypted extensions: {:?}", exts);
        st.transcript.add_message(&m);

        validate_encrypted_extensions(cx.common, &st.hello, exts)?;

        if exts
            .find_extension(ExtensionType::ALProtocolNegotiation)
            .is_some()
            && exts.alpn_entry_count() != 1
        {
            return Err(cx.common.send_fatal_alert(
                AlertDescription::IllegalParameter,
                PeerMisbehaved::TooManyApplicationProtocols,
            ));
        }
        hs::process_alpn_protocol(cx, &st.config, exts.alpn_protocol())?;

        if exts.early_data_extension_offered() {
            // the offer dies when the server picks another PSK or none;
            // accepting it regardless is a protocol violation
            if cx.data.early_data != EarlyDataStatus::Offered {
                return Err(cx.common.send_fatal_alert(
                    AlertDescription::IllegalParameter,
                    PeerMisbehaved::EarlyDataExtensionWithoutResumption,
                ));
            }
            cx.data.early_data = EarlyDataStatus::Accepted;
            cx.common.early_traffic = true;
            trace!("early data accepted");
        } else if cx.data.early_data == EarlyDataStatus::Offered {
            cx.data.early_data = EarlyDataStatus::Rejected;
        }

        match st.mode {
            // With a PSK in play the server authenticates through the
            // binder; there is no certificate flight to wait for.
            KeyExchangeMode::Psk | KeyExchangeMode::PskEphemeral => {
                Ok(Box::new(ExpectFinished {
                    config: st.config,
                    randoms: st.randoms,
                    suite: st.suite,
                    transcript: st.transcript,
                    key_schedule: st.key_schedule,
                    client_auth: None,
                    cert_verified: ServerCertVerified::assertion(),
                    sig_verified: HandshakeSignatureValid::assertion(),
                }))
            }
            KeyExchangeMode::Ephemeral => Ok(Box::new(ExpectCertificateOrCertReq {
                config: st.config,
                server_name: st.server_name,
                randoms: st.randoms,
                suite: st.suite,
                transcript: st.transcript,
                key_schedule: st.key_schedule,
            })),
        }
    }
}

struct ExpectCertificateOrCertReq {
    config: Arc<ClientConfig>,
    server_name: ServerName<'static>,
    randoms: ConnectionRandoms,
    suite: &'static Tls13CipherSuite,
    transcript: HandshakeHash,
    key_schedule: KeyScheduleHandshake,
}

impl hs::State for ExpectCertificateOrCertReq {
    fn handle(
        self: Box<Self>,
        cx: &mut ClientContext<'_>,
        m: HandshakeMessagePayload,
    ) -> hs::NextStateOrError {
        match &m.payload {
            HandshakePayload::Certificate(_) => Box::new(ExpectCertificate {
                config: self.config,
                server_name: self.server_name,
                randoms: self.randoms,
                suite: self.suite,
                transcript: self.transcript,
                key_schedule: self.key_schedule,
                client_auth: None,
            })
            .handle(cx, m),
            HandshakePayload::CertificateRequest(_) => Box::new(ExpectCertificateRequest {
                config: self.config,
                server_name: self.server_name,
                randoms: self.randoms,
                suite: self.suite,
                transcript: self.transcript,
                key_schedule: self.key_schedule,
            })
            .handle(cx, m),
            _ => Err(crate::check::inappropriate_handshake_message(
                &m,
                &[HandshakeType::Certificate, HandshakeType::CertificateRequest],
            )),
        }
    }
}

struct ExpectCertificateRequest {
    config: Arc<ClientConfig>,
    server_name: ServerName<'static>,
    randoms: ConnectionRandoms,
    suite: &'static Tls13CipherSuite,
    transcript: HandshakeHash,
    key_schedule: KeyScheduleHandshake,
}

impl hs::State for ExpectCertificateRequest {
    fn handle(
        self: Box<Self>,
        cx: &mut ClientContext<'_>,
        m: HandshakeMessagePayload,
    ) -> hs::NextStateOrError {
        let mut st = *self;
        let certreq = require_handshake_msg!(
            m,
            HandshakeType::CertificateRequest,
            HandshakePayload::CertificateRequest
        )?;
        st.transcript.add_message(&m);
        debug!("got CertificateRequest {:?}", certreq);

        if certreq.has_duplicate_extension() {
            return Err(cx.common.send_fatal_alert(
                AlertDescription::IllegalParameter,
                PeerMisbehaved::DuplicateExtension,
            ));
        }

        // signature_algorithms is the one extension the message cannot
        // omit
        let sigalgs = match certreq.sigalgs_extension() {
            Some(sigalgs) => sigalgs,
            None => {
                return Err(InvalidMessage::MissingExtension(
                    "CertificateRequest signature_algorithms",
                )
                .into());
            }
        };

        let compat_sigschemes = sigalgs
            .iter()
            .copied()
            .filter(|scheme| st.config.signature_algorithms.contains(scheme))
            .collect::<Vec<SignatureScheme>>();

        if compat_sigschemes.is_empty() {
            return Err(cx.common.send_fatal_alert(
                AlertDescription::HandshakeFailure,
                PeerIncompatible::NoSignatureSchemesInCommon,
            ));
        }

        let mut client_auth = ClientAuthDetails {
            certkey: None,
            signer: None,
            auth_context: certreq.context.0.clone(),
        };

        if let Some(resolver) = &st.config.client_auth_cert_resolver {
            let hints = certreq
                .authorities_extension()
                .unwrap_or(&[])
                .iter()
                .map(|name| name.0.as_slice())
                .collect::<Vec<&[u8]>>();

            if let Some(certkey) = resolver.resolve(&hints, &compat_sigschemes) {
                debug!("attempting client auth");
                client_auth.signer = certkey.key.choose_scheme(&compat_sigschemes);
                client_auth.certkey = Some(certkey);
            } else {
                debug!("client auth requested but no cert selected");
            }
        } else {
            debug!("client auth requested but not configured");
        }

        Ok(Box::new(ExpectCertificate {
            config: st.config,
            server_name: st.server_name,
            randoms: st.randoms,
            suite: st.suite,
            transcript: st.transcript,
            key_schedule: st.key_schedule,
            client_auth: Some(client_auth),
        }))
    }
}

struct ExpectCertificate {
    config: Arc<ClientConfig>,
    server_name: ServerName<'static>,
    randoms: ConnectionRandoms,
    suite: &'static Tls13CipherSuite,
    transcript: HandshakeHash,
    key_schedule: KeyScheduleHandshake,
    client_auth: Option<ClientAuthDetails>,
}

impl hs::State for ExpectCertificate {
    fn handle(
        self: Box<Self>,
        cx: &mut ClientContext<'_>,
        m: HandshakeMessagePayload,
    ) -> hs::NextStateOrError {
        let mut st = *self;
        let cert_chain = require_handshake_msg!(
            m,
            HandshakeType::Certificate,
            HandshakePayload::Certificate
        )?;
        st.transcript.add_message(&m);

        // This context is only ever non-empty for post-handshake
        // authentication, which does not exist for us.
        if !cert_chain.context.0.is_empty() {
            warn!("certificate with non-empty context during handshake");
            return Err(InvalidMessage::UnexpectedMessage(
                "Certificate with non-empty context",
            )
            .into());
        }

        if cert_chain.entries.is_empty() {
            return Err(InvalidMessage::IllegalEmptyList("CertificateEntries").into());
        }

        if cert_chain.any_entry_has_duplicate_extension() || cert_chain.any_entry_has_extension() {
            warn!("certificate chain contains unsolicited extensions");
            return Err(cx.common.send_fatal_alert(
                AlertDescription::UnsupportedExtension,
                PeerMisbehaved::UnsolicitedExtension,
            ));
        }

        let server_cert = ServerCertDetails {
            cert_chain: cert_chain.clone().into_certificate_chain(),
        };

        Ok(Box::new(ExpectCertificateVerify {
            config: st.config,
            server_name: st.server_name,
            randoms: st.randoms,
            suite: st.suite,
            transcript: st.transcript,
            key_schedule: st.key_schedule,
            server_cert,
            client_auth: st.client_auth,
        }))
    }
}

fn send_cert_error_alert(common: &mut CommonState, err: Error) -> Error {
    let desc = err.alert_description();
    common.send_fatal_alert(desc, err)
}

struct ExpectCertificateVerify {
    config: Arc<ClientConfig>,
    server_name: ServerName<'static>,
    randoms: ConnectionRandoms,
    suite: &'static Tls13CipherSuite,
    transcript: HandshakeHash,
    key_schedule: KeyScheduleHandshake,
    server_cert: ServerCertDetails,
    client_auth: Option<ClientAuthDetails>,
}

impl hs::State for ExpectCertificateVerify {
    fn handle(
        self: Box<Self>,
        cx: &mut ClientContext<'_>,
        m: HandshakeMessagePayload,
    ) -> hs::NextStateOrError {
        let mut st = *self;
        let cert_verify = require_handshake_msg!(
            m,
            HandshakeType::CertificateVerify,
            HandshakePayload::CertificateVerify
        )?;

        trace!("server cert is {:?}", st.server_cert.cert_chain);

        // 1. Verify the certificate chain.
        let (end_entity, intermediates) = st
            .server_cert
            .cert_chain
            .split_first()
            .ok_or(InvalidMessage::IllegalEmptyList("CertificateEntries"))?;

        let now = st.config.current_time();
        let cert_verified = st
            .config
            .verifier
            .verify_server_cert(end_entity, intermediates, &st.server_name, now)
            .map_err(|err| send_cert_error_alert(cx.common, err))?;

        // 2. Check the signature scheme is one we offered.
        if !st
            .config
            .signature_algorithms
            .contains(&cert_verify.scheme)
        {
            return Err(cx.common.send_fatal_alert(
                AlertDescription::HandshakeFailure,
                PeerIncompatible::NoSignatureSchemesInCommon,
            ));
        }

        // 3. Verify the signature over the transcript.
        let handshake_hash = st.transcript.current_hash();
        let message = construct_tls13_server_verify_message(&handshake_hash);
        let sig_verified = st
            .config
            .verifier
            .verify_tls13_signature(&message, &st.server_cert.cert_chain[0], cert_verify)
            .map_err(|err| send_cert_error_alert(cx.common, err))?;

        cx.data.server_cert_chain = core::mem::take(&mut st.server_cert.cert_chain);
        st.transcript.add_message(&m);

        Ok(Box::new(ExpectFinished {
            config: st.config,
            randoms: st.randoms,
            suite: st.suite,
            transcript: st.transcript,
            key_schedule: st.key_schedule,
            client_auth: st.client_auth,
            cert_verified,
            sig_verified,
        }))
    }
}

fn emit_end_of_early_data(transcript: &mut HandshakeHash, common: &mut CommonState) {
    let m = HandshakeMessagePayload {
        typ: HandshakeType::EndOfEarlyData,
        payload: HandshakePayload::EndOfEarlyData,
    };
    transcript.add_message(&m);
    common.send_handshake_message(&m);
}

fn emit_certificate_tls13(
    transcript: &mut HandshakeHash,
    client_auth: &mut ClientAuthDetails,
    common: &mut CommonState,
) {
    let mut cert_payload = CertificatePayloadTls13 {
        context: PayloadU8::new(core::mem::take(&mut client_auth.auth_context)),
        entries: Vec::new(),
    };

    if let Some(certkey) = &client_auth.certkey {
        for cert in &certkey.cert {
            cert_payload
                .entries
                .push(CertificateEntry::new(cert.clone()));
        }
    }

    let m = HandshakeMessagePayload {
        typ: HandshakeType::Certificate,
        payload: HandshakePayload::Certificate(cert_payload),
    };
    transcript.add_message(&m);
    common.send_handshake_message(&m);
}

fn emit_certverify_tls13(
    transcript: &mut HandshakeHash,
    client_auth: &mut ClientAuthDetails,
    common: &mut CommonState,
) -> Result<(), Error> {
    let signer = match client_auth.signer.take() {
        Some(signer) => signer,
        None => {
            debug!("skipping CertificateVerify, no client scheme/key");
            return Ok(());
        }
    };

    let message = construct_tls13_client_verify_message(&transcript.current_hash());
    let scheme = signer.scheme();
    let sig = signer.sign(&message)?;

    let m = HandshakeMessagePayload {
        typ: HandshakeType::CertificateVerify,
        payload: HandshakePayload::CertificateVerify(DigitallySignedStruct::new(scheme, sig)),
    };
    transcript.add_message(&m);
    common.send_handshake_message(&m);
    Ok(())
}

fn emit_finished_tls13(
    transcript: &mut HandshakeHash,
    verify_data: &[u8],
    common: &mut CommonState,
) {
    let m = HandshakeMessagePayload {
        typ: HandshakeType::Finished,
        payload: HandshakePayload::Finished(Payload::new(verify_data)),
    };
    transcript.add_message(&m);
    common.send_handshake_message(&m);
}

struct ExpectFinished {
    config: Arc<ClientConfig>,
    randoms: ConnectionRandoms,
    suite: &'static Tls13CipherSuite,
    transcript: HandshakeHash,
    key_schedule: KeyScheduleHandshake,
    client_auth: Option<ClientAuthDetails>,
    cert_verified: ServerCertVerified,
    sig_verified: HandshakeSignatureValid,
}

impl hs::State for ExpectFinished {
    fn handle(
        self: Box<Self>,
        cx: &mut ClientContext<'_>,
        m: HandshakeMessagePayload,
    ) -> hs::NextStateOrError {
        let mut st = *self;
        let finished =
            require_handshake_msg!(m, HandshakeType::Finished, HandshakePayload::Finished)?;

        let handshake_hash = st.transcript.current_hash();
        let expect_verify_data = st.key_schedule.sign_server_finish(&handshake_hash);

        if !verify_data_matches(&expect_verify_data, &finished.0) {
            return Err(cx
                .common
                .send_fatal_alert(AlertDescription::DecryptError, Error::DecryptError));
        }

        st.transcript.add_message(&m);
        let hash_after_handshake = st.transcript.current_hash();

        // The server is authenticated and its flight complete: move the
        // schedule to the application secrets, and decrypt with the
        // server's application key from the next record on.
        let key_schedule = st.key_schedule.into_traffic_with_client_finished_pending(
            &hash_after_handshake,
            &*st.config.key_log,
            &st.randoms.client,
        );
        cx.common
            .record_layer
            .set_message_decrypter(new_tls13_read(
                st.suite,
                key_schedule.server_application_traffic_secret(),
            ));

        // Our flight: EndOfEarlyData if the server took our early data,
        // then authentication, then Finished.
        if core::mem::replace(&mut cx.common.early_traffic, false) {
            emit_end_of_early_data(&mut st.transcript, cx.common);
        }

        if let Some(client_auth) = &mut st.client_auth {
            emit_certificate_tls13(&mut st.transcript, client_auth, cx.common);
            emit_certverify_tls13(&mut st.transcript, client_auth, cx.common)?;
        }

        // dummy CCS ahead of our final flight, in compatibility mode
        cx.common.send_fake_ccs();

        let handshake_hash = st.transcript.current_hash();
        let verify_data = key_schedule.sign_client_finish(&handshake_hash);
        emit_finished_tls13(&mut st.transcript, verify_data.as_ref(), cx.common);

        // Both directions now run under application keys, and the
        // resumption master secret closes out the schedule.
        cx.common
            .record_layer
            .set_message_encrypter(new_tls13_write(
                st.suite,
                key_schedule.client_application_traffic_secret(),
            ));

        let hash_with_client_finished = st.transcript.current_hash();
        let key_schedule = key_schedule.into_traffic(&hash_with_client_finished);

        cx.data.handshake_complete = true;
        debug!("handshake complete");

        Ok(Box::new(ExpectTraffic {
            config: st.config,
            suite: st.suite,
            key_schedule,
            _cert_verified: st.cert_verified,
            _sig_verified: st.sig_verified,
        }))
    }
}

/// Steady state: the handshake is over; the only handshake messages we
/// accept are NewSessionTickets.
struct ExpectTraffic {
    config: Arc<ClientConfig>,
    suite: &'static Tls13CipherSuite,
    key_schedule: KeyScheduleTraffic,
    _cert_verified: ServerCertVerified,
    _sig_verified: HandshakeSignatureValid,
}

impl ExpectTraffic {
    fn handle_new_ticket(
        &mut self,
        cx: &mut ClientContext<'_>,
        nst: &NewSessionTicketPayloadTls13,
    ) -> Result<(), Error> {
        if nst.has_duplicate_extension() {
            return Err(cx.common.send_fatal_alert(
                AlertDescription::IllegalParameter,
                PeerMisbehaved::DuplicateExtension,
            ));
        }

        let secret = self
            .key_schedule
            .derive_ticket_psk(&nst.nonce.0);

        let mut flags = TicketFlags::default();
        if self.config.mode_enabled(KeyExchangeMode::Psk) {
            flags.insert(TicketFlags::ALLOW_PSK_RESUMPTION);
        }
        if self
            .config
            .mode_enabled(KeyExchangeMode::PskEphemeral)
        {
            flags.insert(TicketFlags::ALLOW_PSK_EPHEMERAL_RESUMPTION);
        }

        let max_early_data_size = nst.max_early_data_size();
        if max_early_data_size.is_some() {
            flags.insert(TicketFlags::ALLOW_EARLY_DATA);
        }

        let value = Tls13ClientSessionValue::new(
            self.suite,
            nst.ticket.0.clone(),
            secret.as_ref().to_vec(),
            nst.lifetime,
            nst.age_add,
            self.config.current_time(),
            flags,
            max_early_data_size.unwrap_or(0),
        );

        // each fresh ticket replaces the previous snapshot
        cx.data.latest_session = Some(value);
        cx.data.received_ticket = true;
        trace!("got new session ticket, lifetime {}s", nst.lifetime);
        Ok(())
    }
}

impl hs::State for ExpectTraffic {
    fn handle(
        mut self: Box<Self>,
        cx: &mut ClientContext<'_>,
        m: HandshakeMessagePayload,
    ) -> hs::NextStateOrError {
        match &m.payload {
            HandshakePayload::NewSessionTicket(nst) => {
                self.handle_new_ticket(cx, nst)?;
                Ok(self)
            }
            _ => Err(crate::check::inappropriate_handshake_message(
                &m,
                &[HandshakeType::NewSessionTicket],
            )),
        }
    }
}

/// Fill in the reserved binder bytes of a serialized ClientHello.
///
/// Each binder is the HMAC, under that PSK's binder key, of the
/// transcript up to the truncated ClientHello (RFC 8446 §4.2.11.2).
pub(super) fn fill_in_psk_binders(
    offers: &[OfferedPsk],
    transcript_buffer: &HandshakeHashBuffer,
    hmp: &mut HandshakeMessagePayload,
) {
    let truncated = hmp.encoding_for_binder_signing();

    let binders = offers
        .iter()
        .map(|offer| {
            let handshake_hash =
                transcript_buffer.hash_given(offer.suite.common.hash_provider, &truncated);
            let schedule = KeyScheduleEarly::new(offer.suite, &offer.secret);
            schedule.binder_verify_data(offer.kind, &handshake_hash)
        })
        .collect::<Vec<_>>();

    if let HandshakePayload::ClientHello(ch) = &mut hmp.payload {
        for (index, binder) in binders.iter().enumerate() {
            ch.set_psk_binder(index, binder.as_ref());
        }
    }
}
