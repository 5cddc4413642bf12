//! Shared harness for the handshake integration tests: a deterministic
//! crypto provider built over the public provider traits, a scriptable
//! in-memory record layer, and a verifier that accepts anything.

#![allow(dead_code)]

pub mod kschedule;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use pki_types::{CertificateDer, ServerName, UnixTime};
use sha2::Digest;

use thintls::crypto::cipher::{
    AeadKey, Iv, MessageDecrypter, MessageEncrypter, Tls13AeadAlgorithm,
};
use thintls::crypto::hash::{self, HashAlgorithm};
use thintls::crypto::hmac::{Hmac, Key, Tag};
use thintls::crypto::{
    ActiveKeyExchange, CryptoProvider, GetRandomFailed, SecureRandom, SharedSecret,
    SupportedKxGroup,
};
use thintls::internal::msgs::{Codec, HandshakeMessagePayload};
use thintls::tls13::{CipherSuiteCommon, Tls13CipherSuite};
use thintls::{
    AlertDescription, CipherSuite, ContentType, DigitallySignedStruct, Error,
    HandshakeSignatureValid, NamedGroup, RecordLayer, ServerCertVerified, ServerCertVerifier,
};

pub static TLS13_AES_128_GCM_SHA256: Tls13CipherSuite = Tls13CipherSuite {
    common: CipherSuiteCommon {
        suite: CipherSuite::TLS13_AES_128_GCM_SHA256,
        hash_provider: &Sha256Provider,
    },
    hmac_provider: &HmacSha256Provider,
    aead_alg: &NullAead { key_len: 16 },
};

pub static X25519: TestKxGroup = TestKxGroup {
    name: NamedGroup::X25519,
};

pub static SECP256R1: TestKxGroup = TestKxGroup {
    name: NamedGroup::secp256r1,
};

/// The public share every [`TestKxGroup`] key pair presents: the group
/// code followed by a fixed pattern.
pub fn test_pub_key(group: NamedGroup) -> Vec<u8> {
    let mut pub_key = Vec::with_capacity(34);
    pub_key.extend_from_slice(&group.to_array());
    pub_key.extend_from_slice(&[0x5a; 32]);
    pub_key
}

/// The shared secret [`TestKxGroup`] computes: SHA-256 over the
/// client's share followed by the server's.
pub fn test_shared_secret(client_share: &[u8], server_share: &[u8]) -> Vec<u8> {
    let mut ctx = sha2::Sha256::new();
    ctx.update(client_share);
    ctx.update(server_share);
    ctx.finalize().to_vec()
}

pub fn provider() -> Arc<CryptoProvider> {
    Arc::new(CryptoProvider {
        cipher_suites: vec![&TLS13_AES_128_GCM_SHA256],
        kx_groups: vec![&X25519, &SECP256R1],
        secure_random: &TestRandom,
    })
}

#[derive(Debug)]
pub struct Sha256Provider;

impl hash::Hash for Sha256Provider {
    fn algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::SHA256
    }

    fn start(&self) -> Box<dyn hash::Context> {
        Box::new(Sha256Context(sha2::Sha256::new()))
    }

    fn hash(&self, data: &[u8]) -> hash::Output {
        hash::Output::new(&sha2::Sha256::digest(data))
    }
}

struct Sha256Context(sha2::Sha256);

impl hash::Context for Sha256Context {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn fork_finish(&self) -> hash::Output {
        hash::Output::new(&self.0.clone().finalize())
    }

    fn fork(&self) -> Box<dyn hash::Context> {
        Box::new(Self(self.0.clone()))
    }

    fn finish(self: Box<Self>) -> hash::Output {
        hash::Output::new(&self.0.finalize())
    }
}

#[derive(Debug)]
pub struct HmacSha256Provider;

impl Hmac for HmacSha256Provider {
    fn with_key(&self, key: &[u8]) -> Box<dyn Key> {
        use hmac::Mac;
        Box::new(HmacSha256Key(
            hmac::Hmac::<sha2::Sha256>::new_from_slice(key).unwrap(),
        ))
    }

    fn hash_output_len(&self) -> usize {
        32
    }
}

struct HmacSha256Key(hmac::Hmac<sha2::Sha256>);

impl Key for HmacSha256Key {
    fn sign(&self, data: &[&[u8]]) -> Tag {
        use hmac::Mac;
        let mut mac = self.0.clone();
        for chunk in data {
            mac.update(chunk);
        }
        Tag::new(&mac.finalize().into_bytes())
    }

    fn tag_len(&self) -> usize {
        32
    }
}

pub struct NullAead {
    key_len: usize,
}

impl Tls13AeadAlgorithm for NullAead {
    fn encrypter(&self, _key: AeadKey, _iv: Iv) -> Box<dyn MessageEncrypter> {
        Box::new(NullTransform)
    }

    fn decrypter(&self, _key: AeadKey, _iv: Iv) -> Box<dyn MessageDecrypter> {
        Box::new(NullTransform)
    }

    fn key_len(&self) -> usize {
        self.key_len
    }
}

struct NullTransform;

impl MessageEncrypter for NullTransform {
    fn encrypt(
        &mut self,
        payload: &[u8],
        _content_type: ContentType,
        _seq: u64,
    ) -> Result<Vec<u8>, Error> {
        Ok(payload.to_vec())
    }
}

impl MessageDecrypter for NullTransform {
    fn decrypt(&mut self, payload: &[u8], _seq: u64) -> Result<(Vec<u8>, ContentType), Error> {
        Ok((payload.to_vec(), ContentType::Handshake))
    }
}

#[derive(Debug)]
pub struct TestRandom;

impl SecureRandom for TestRandom {
    fn fill(&self, buf: &mut [u8]) -> Result<(), GetRandomFailed> {
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = 0x40 | (i as u8 & 0x3f);
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct TestKxGroup {
    name: NamedGroup,
}

impl SupportedKxGroup for TestKxGroup {
    fn name(&self) -> NamedGroup {
        self.name
    }

    fn start(&self) -> Result<Box<dyn ActiveKeyExchange>, Error> {
        Ok(Box::new(TestKx {
            group: self.name,
            pub_key: test_pub_key(self.name),
        }))
    }
}

struct TestKx {
    group: NamedGroup,
    pub_key: Vec<u8>,
}

impl ActiveKeyExchange for TestKx {
    fn group(&self) -> NamedGroup {
        self.group
    }

    fn pub_key(&self) -> &[u8] {
        &self.pub_key
    }

    fn complete(self: Box<Self>, peer_pub_key: &[u8]) -> Result<SharedSecret, Error> {
        Ok(SharedSecret::from(test_shared_secret(
            &self.pub_key,
            peer_pub_key,
        )))
    }
}

/// A verifier that accepts any chain and any signature; the tests here
/// exercise sequencing, not PKI.
#[derive(Debug)]
pub struct PermissiveVerifier;

impl ServerCertVerifier for PermissiveVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _now: Option<UnixTime>,
    ) -> Result<ServerCertVerified, Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, Error> {
        Ok(HandshakeSignatureValid::assertion())
    }
}

#[derive(Default)]
struct RecordLayerInner {
    inbound: VecDeque<Vec<u8>>,
    outbound: Vec<Vec<u8>>,
    ccs_count: usize,
    decrypters_installed: usize,
    encrypters_installed: usize,
    alerts: Vec<AlertDescription>,
}

/// A scriptable record layer: the test queues inbound handshake
/// messages and inspects what the client sent, installed and alerted.
pub struct MockRecordLayer {
    inner: Arc<Mutex<RecordLayerInner>>,
}

/// The test-side handle onto a [`MockRecordLayer`] given to a
/// connection.
#[derive(Clone)]
pub struct RecordLayerHandle {
    inner: Arc<Mutex<RecordLayerInner>>,
}

pub fn mock_record_layer() -> (Box<MockRecordLayer>, RecordLayerHandle) {
    let inner = Arc::new(Mutex::new(RecordLayerInner::default()));
    (
        Box::new(MockRecordLayer {
            inner: inner.clone(),
        }),
        RecordLayerHandle { inner },
    )
}

impl RecordLayer for MockRecordLayer {
    fn fetch_handshake_message(&mut self) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.inner.lock().unwrap().inbound.pop_front())
    }

    fn send_handshake_message(&mut self, encoded: &[u8]) {
        self.inner
            .lock()
            .unwrap()
            .outbound
            .push(encoded.to_vec());
    }

    fn send_change_cipher_spec(&mut self) {
        self.inner.lock().unwrap().ccs_count += 1;
    }

    fn set_message_decrypter(&mut self, _decrypter: Box<dyn MessageDecrypter>) {
        self.inner.lock().unwrap().decrypters_installed += 1;
    }

    fn set_message_encrypter(&mut self, _encrypter: Box<dyn MessageEncrypter>) {
        self.inner.lock().unwrap().encrypters_installed += 1;
    }

    fn queue_fatal_alert(&mut self, alert: AlertDescription) {
        self.inner.lock().unwrap().alerts.push(alert);
    }
}

impl RecordLayerHandle {
    pub fn push_inbound(&self, m: &HandshakeMessagePayload) {
        self.push_inbound_raw(m.get_encoding());
    }

    pub fn push_inbound_raw(&self, encoded: Vec<u8>) {
        self.inner
            .lock()
            .unwrap()
            .inbound
            .push_back(encoded);
    }

    /// All handshake messages the client has sent so far, oldest first,
    /// draining the buffer.
    pub fn take_outbound(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.inner.lock().unwrap().outbound)
    }

    pub fn ccs_count(&self) -> usize {
        self.inner.lock().unwrap().ccs_count
    }

    pub fn decrypters_installed(&self) -> usize {
        self.inner.lock().unwrap().decrypters_installed
    }

    pub fn encrypters_installed(&self) -> usize {
        self.inner.lock().unwrap().encrypters_installed
    }

    pub fn alerts(&self) -> Vec<AlertDescription> {
        self.inner.lock().unwrap().alerts.clone()
    }
}
