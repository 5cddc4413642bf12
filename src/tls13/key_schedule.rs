//! The TLS 1.3 key schedule (RFC 8446 §7.1), expressed as a typestate:
//! each phase of the schedule is a distinct type, and the transitions
//! between them are exactly the transitions the handshake is allowed to
//! make.
//!
//! Everything here is HKDF over the negotiated suite's HMAC.  Secrets
//! live in [`Tag`]s, which zero themselves on drop.

use alloc::boxed::Box;
use alloc::vec::Vec;

use subtle::ConstantTimeEq;

use crate::crypto::cipher::{AeadKey, Iv, MessageDecrypter, MessageEncrypter};
use crate::crypto::hash;
use crate::crypto::hmac::{self, Tag};
use crate::crypto::SharedSecret;
use crate::key_log::KeyLog;
use crate::tls13::Tls13CipherSuite;

/// Which derivation a PSK's binder key uses.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum BinderKind {
    /// A PSK from a prior session's ticket: `"res binder"`.
    Resumption,
    /// An externally provisioned PSK: `"ext binder"`.
    External,
}

/// HKDF-Extract.
fn hkdf_extract(hmac: &'static dyn hmac::Hmac, salt: &[u8], ikm: &[u8]) -> Tag {
    hmac.with_key(salt).sign(&[ikm])
}

/// HKDF-Expand with the HkdfLabel info structure, writing `out.len()`
/// bytes.
fn hkdf_expand_label(
    hmac: &'static dyn hmac::Hmac,
    secret: &[u8],
    label: &[u8],
    context: &[u8],
    out: &mut [u8],
) {
    const LABEL_PREFIX: &[u8] = b"tls13 ";

    let key = hmac.with_key(secret);
    let out_len = (out.len() as u16).to_be_bytes();
    let label_len = [(LABEL_PREFIX.len() + label.len()) as u8];
    let context_len = [context.len() as u8];

    let mut filled = 0;
    let mut counter = 1u8;
    let mut prev: Option<Tag> = None;

    while filled < out.len() {
        let counter_buf = [counter];
        let mut parts: Vec<&[u8]> = Vec::with_capacity(8);
        if let Some(prev) = &prev {
            parts.push(prev.as_ref());
        }
        parts.extend_from_slice(&[
            &out_len,
            &label_len,
            LABEL_PREFIX,
            label,
            &context_len,
            context,
            &counter_buf,
        ]);

        let block = key.sign(&parts);
        let take = Ord::min(block.as_ref().len(), out.len() - filled);
        out[filled..filled + take].copy_from_slice(&block.as_ref()[..take]);
        filled += take;
        counter += 1;
        prev = Some(block);
    }
}

/// HKDF-Expand-Label producing a hash-length secret.
fn expand_secret(
    hmac: &'static dyn hmac::Hmac,
    secret: &[u8],
    label: &[u8],
    context: &[u8],
) -> Tag {
    let mut out = [0u8; Tag::MAX_LEN];
    let len = hmac.hash_output_len();
    hkdf_expand_label(hmac, secret, label, context, &mut out[..len]);
    let tag = Tag::new(&out[..len]);
    out.iter_mut().for_each(|b| *b = 0);
    tag
}

/// Build the sealing transform for `secret` under `suite`.
pub(crate) fn new_tls13_write(
    suite: &'static Tls13CipherSuite,
    secret: &[u8],
) -> Box<dyn MessageEncrypter> {
    let (key, iv) = derive_traffic_key_iv(suite, secret);
    suite.aead_alg.encrypter(key, iv)
}

/// Build the opening transform for `secret` under `suite`.
pub(crate) fn new_tls13_read(
    suite: &'static Tls13CipherSuite,
    secret: &[u8],
) -> Box<dyn MessageDecrypter> {
    let (key, iv) = derive_traffic_key_iv(suite, secret);
    suite.aead_alg.decrypter(key, iv)
}

fn derive_traffic_key_iv(suite: &'static Tls13CipherSuite, secret: &[u8]) -> (AeadKey, Iv) {
    let hmac = suite.hmac_provider;

    let mut key_buf = [0u8; AeadKey::MAX_LEN];
    let key_len = suite.aead_alg.key_len();
    hkdf_expand_label(hmac, secret, b"key", &[], &mut key_buf[..key_len]);
    let key = AeadKey::from(key_buf).with_length(key_len);

    let mut iv = [0u8; Iv::LEN];
    hkdf_expand_label(hmac, secret, b"iv", &[], &mut iv);

    (key, Iv::new(iv))
}

/// Compare a received Finished (or binder) against its expected value
/// in constant time.
pub(crate) fn verify_data_matches(expect: &Tag, received: &[u8]) -> bool {
    expect.as_ref().ct_eq(received).into()
}

/// The common portion of the schedule: the suite and the secret for the
/// current extraction stage.
struct KeySchedule {
    suite: &'static Tls13CipherSuite,
    current: Tag,
}

impl KeySchedule {
    fn new(suite: &'static Tls13CipherSuite, psk: Option<&[u8]>) -> Self {
        let zeroes = [0u8; hash::Output::MAX_LEN];
        let hash_len = suite.common.hash_provider.output_len();
        let ikm = psk.unwrap_or(&zeroes[..hash_len]);
        Self {
            suite,
            current: hkdf_extract(suite.hmac_provider, &zeroes[..hash_len], ikm),
        }
    }

    /// Derive-Secret: Expand-Label keyed by the current secret, with a
    /// transcript hash as context.
    fn derive_secret(&self, label: &[u8], context: &[u8]) -> Tag {
        expand_secret(self.suite.hmac_provider, self.current.as_ref(), label, context)
    }

    fn derive_for_empty_hash(&self, label: &[u8]) -> Tag {
        let empty_hash = self.suite.common.hash_provider.hash(&[]);
        self.derive_secret(label, empty_hash.as_ref())
    }

    /// Move to the next extraction stage, mixing in `secret`.
    fn input_secret(&mut self, secret: &[u8]) {
        let salt = self.derive_for_empty_hash(b"derived");
        self.current = hkdf_extract(self.suite.hmac_provider, salt.as_ref(), secret);
    }

    /// Move to the next extraction stage with nothing to mix in.
    fn input_empty(&mut self) {
        let zeroes = [0u8; hash::Output::MAX_LEN];
        let hash_len = self.suite.common.hash_provider.output_len();
        let secret = &zeroes[..hash_len];
        self.input_secret(secret);
    }

    /// The HMAC of `transcript_hash` under the finished key of
    /// `base_secret` (RFC 8446 §4.4.4).
    fn sign_verify_data(&self, base_secret: &Tag, transcript_hash: &hash::Output) -> Tag {
        let hmac = self.suite.hmac_provider;
        let finished_key = expand_secret(hmac, base_secret.as_ref(), b"finished", &[]);
        hmac.with_key(finished_key.as_ref())
            .sign(&[transcript_hash.as_ref()])
    }
}

/// The schedule before any secret is mixed in: no PSK in play.
pub(crate) struct KeySchedulePreHandshake {
    ks: KeySchedule,
}

impl KeySchedulePreHandshake {
    pub(crate) fn new(suite: &'static Tls13CipherSuite) -> Self {
        Self {
            ks: KeySchedule::new(suite, None),
        }
    }

    pub(crate) fn into_handshake(
        mut self,
        shared: Option<&SharedSecret>,
    ) -> KeyScheduleHandshakeStart {
        input_kx_secret(&mut self.ks, shared);
        KeyScheduleHandshakeStart { ks: self.ks }
    }
}

/// The schedule once the early secret exists, seeded from a PSK.
pub(crate) struct KeyScheduleEarly {
    ks: KeySchedule,
}

impl KeyScheduleEarly {
    pub(crate) fn new(suite: &'static Tls13CipherSuite, psk: &[u8]) -> Self {
        Self {
            ks: KeySchedule::new(suite, Some(psk)),
        }
    }

    /// The binder for this PSK over the truncated-ClientHello
    /// transcript hash.
    pub(crate) fn binder_verify_data(
        &self,
        kind: BinderKind,
        truncated_transcript_hash: &hash::Output,
    ) -> Tag {
        let label: &[u8] = match kind {
            BinderKind::Resumption => b"res binder",
            BinderKind::External => b"ext binder",
        };
        let binder_key = self.ks.derive_for_empty_hash(label);
        self.ks
            .sign_verify_data(&binder_key, truncated_transcript_hash)
    }

    /// The early traffic secret, bound to the hash of the full
    /// ClientHello.
    pub(crate) fn client_early_traffic_secret(
        &self,
        client_hello_hash: &hash::Output,
        key_log: &dyn KeyLog,
        client_random: &[u8],
    ) -> Tag {
        let secret = self
            .ks
            .derive_secret(b"c e traffic", client_hello_hash.as_ref());
        key_log.log("CLIENT_EARLY_TRAFFIC_SECRET", client_random, secret.as_ref());
        secret
    }

    pub(crate) fn into_handshake(
        mut self,
        shared: Option<&SharedSecret>,
    ) -> KeyScheduleHandshakeStart {
        input_kx_secret(&mut self.ks, shared);
        KeyScheduleHandshakeStart { ks: self.ks }
    }
}

fn input_kx_secret(ks: &mut KeySchedule, shared: Option<&SharedSecret>) {
    match shared {
        Some(shared) => ks.input_secret(shared.secret_bytes()),
        None => ks.input_empty(),
    }
}

/// The handshake secret exists but no traffic secrets have been carved
/// out of it yet.
pub(crate) struct KeyScheduleHandshakeStart {
    ks: KeySchedule,
}

impl KeyScheduleHandshakeStart {
    /// Derive both handshake traffic secrets from the transcript up to
    /// and including ServerHello.
    pub(crate) fn derive_handshake_secrets(
        self,
        hello_hash: &hash::Output,
        key_log: &dyn KeyLog,
        client_random: &[u8],
    ) -> KeyScheduleHandshake {
        let client = self
            .ks
            .derive_secret(b"c hs traffic", hello_hash.as_ref());
        let server = self
            .ks
            .derive_secret(b"s hs traffic", hello_hash.as_ref());

        key_log.log("CLIENT_HANDSHAKE_TRAFFIC_SECRET", client_random, client.as_ref());
        key_log.log("SERVER_HANDSHAKE_TRAFFIC_SECRET", client_random, server.as_ref());

        KeyScheduleHandshake {
            ks: self.ks,
            client_handshake_traffic_secret: client,
            server_handshake_traffic_secret: server,
        }
    }
}

/// Handshake traffic secrets are live.
pub(crate) struct KeyScheduleHandshake {
    ks: KeySchedule,
    client_handshake_traffic_secret: Tag,
    server_handshake_traffic_secret: Tag,
}

impl KeyScheduleHandshake {
    pub(crate) fn client_key(&self) -> &[u8] {
        self.client_handshake_traffic_secret.as_ref()
    }

    pub(crate) fn server_key(&self) -> &[u8] {
        self.server_handshake_traffic_secret.as_ref()
    }

    /// What the server's Finished must contain, given the transcript
    /// before it.
    pub(crate) fn sign_server_finish(&self, transcript_hash: &hash::Output) -> Tag {
        self.ks
            .sign_verify_data(&self.server_handshake_traffic_secret, transcript_hash)
    }

    /// Step to the master secret and application traffic secrets.  The
    /// client Finished has not been sent yet, so its signing secret is
    /// carried forward.
    pub(crate) fn into_traffic_with_client_finished_pending(
        mut self,
        hash_after_server_finished: &hash::Output,
        key_log: &dyn KeyLog,
        client_random: &[u8],
    ) -> KeyScheduleTrafficWithClientFinishedPending {
        self.ks.input_empty();

        let context = hash_after_server_finished.as_ref();
        let client_app = self.ks.derive_secret(b"c ap traffic", context);
        let server_app = self.ks.derive_secret(b"s ap traffic", context);

        key_log.log("CLIENT_TRAFFIC_SECRET_0", client_random, client_app.as_ref());
        key_log.log("SERVER_TRAFFIC_SECRET_0", client_random, server_app.as_ref());

        KeyScheduleTrafficWithClientFinishedPending {
            ks: self.ks,
            client_handshake_traffic_secret: self.client_handshake_traffic_secret,
            client_application_traffic_secret: client_app,
            server_application_traffic_secret: server_app,
        }
    }
}

/// Application traffic secrets exist, but the client Finished is still
/// owed.
pub(crate) struct KeyScheduleTrafficWithClientFinishedPending {
    ks: KeySchedule,
    client_handshake_traffic_secret: Tag,
    client_application_traffic_secret: Tag,
    server_application_traffic_secret: Tag,
}

impl KeyScheduleTrafficWithClientFinishedPending {
    pub(crate) fn server_application_traffic_secret(&self) -> &[u8] {
        self.server_application_traffic_secret.as_ref()
    }

    pub(crate) fn client_application_traffic_secret(&self) -> &[u8] {
        self.client_application_traffic_secret.as_ref()
    }

    /// What our Finished must contain, given the transcript before it.
    pub(crate) fn sign_client_finish(&self, transcript_hash: &hash::Output) -> Tag {
        self.ks
            .sign_verify_data(&self.client_handshake_traffic_secret, transcript_hash)
    }

    /// Finish the schedule: derive the resumption master secret from
    /// the transcript including the client Finished.
    pub(crate) fn into_traffic(
        self,
        hash_with_client_finished: &hash::Output,
    ) -> KeyScheduleTraffic {
        let resumption_master_secret = self
            .ks
            .derive_secret(b"res master", hash_with_client_finished.as_ref());

        KeyScheduleTraffic {
            ks: self.ks,
            resumption_master_secret,
        }
    }
}

/// The steady state after the handshake.
pub(crate) struct KeyScheduleTraffic {
    ks: KeySchedule,
    resumption_master_secret: Tag,
}

impl KeyScheduleTraffic {
    pub(crate) fn resumption_master_secret(&self) -> &[u8] {
        self.resumption_master_secret.as_ref()
    }

    /// The PSK a NewSessionTicket confers:
    /// `HKDF-Expand-Label(resumption_master_secret, "resumption",
    /// ticket_nonce, Hash.length)`.
    pub(crate) fn derive_ticket_psk(&self, nonce: &[u8]) -> Tag {
        expand_secret(
            self.ks.suite.hmac_provider,
            self.resumption_master_secret.as_ref(),
            b"resumption",
            nonce,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_provider::TLS13_AES_128_GCM_SHA256;

    fn schedule() -> KeySchedule {
        KeySchedule::new(&TLS13_AES_128_GCM_SHA256, None)
    }

    #[test]
    fn early_secret_with_no_psk_matches_rfc8448() {
        // HKDF-Extract(zeros, zeros) with SHA-256, from the RFC 8448
        // simple 1-RTT trace.
        assert_eq!(
            schedule().current.as_ref(),
            hex::decode("33ad0a1c607ec03b09e6cd9893680ce210adf300aa1f2660e1b22e10f170f92a")
                .unwrap()
                .as_slice()
        );
    }

    #[test]
    fn derived_secret_matches_rfc8448() {
        let derived = schedule().derive_for_empty_hash(b"derived");
        assert_eq!(
            derived.as_ref(),
            hex::decode("6f2615a108c702c5678f54fc9dbab69716c076189c48250cebeac3576c3611ba")
                .unwrap()
                .as_slice()
        );
    }

    #[test]
    fn binder_kinds_use_distinct_labels() {
        let early = KeyScheduleEarly::new(&TLS13_AES_128_GCM_SHA256, &[0xab; 32]);
        let hash = TLS13_AES_128_GCM_SHA256
            .common
            .hash_provider
            .hash(b"some transcript");

        let res = early.binder_verify_data(BinderKind::Resumption, &hash);
        let ext = early.binder_verify_data(BinderKind::External, &hash);
        assert_eq!(res.as_ref().len(), 32);
        assert_ne!(res.as_ref(), ext.as_ref());

        // and the binder is a deterministic function of the transcript
        let res2 = early.binder_verify_data(BinderKind::Resumption, &hash);
        assert_eq!(res.as_ref(), res2.as_ref());
    }

    #[test]
    fn ticket_psk_has_hash_length() {
        let traffic = KeySchedulePreHandshake::new(&TLS13_AES_128_GCM_SHA256)
            .into_handshake(None)
            .derive_handshake_secrets(
                &TLS13_AES_128_GCM_SHA256.common.hash_provider.hash(b"hs"),
                &crate::key_log::NoKeyLog,
                &[0; 32],
            )
            .into_traffic_with_client_finished_pending(
                &TLS13_AES_128_GCM_SHA256.common.hash_provider.hash(b"sf"),
                &crate::key_log::NoKeyLog,
                &[0; 32],
            )
            .into_traffic(&TLS13_AES_128_GCM_SHA256.common.hash_provider.hash(b"cf"));

        assert_eq!(traffic.derive_ticket_psk(&[1, 2, 3]).as_ref().len(), 32);
        assert!(traffic
            .resumption_master_secret()
            .iter()
            .any(|&b| b != 0));
    }

    #[test]
    fn verify_data_comparison_is_length_safe() {
        let tag = Tag::new(&[1; 32]);
        assert!(verify_data_matches(&tag, &[1; 32]));
        assert!(!verify_data_matches(&tag, &[1; 31]));
        assert!(!verify_data_matches(&tag, &[2; 32]));
    }
}
