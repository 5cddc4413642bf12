//! An independent, test-only rendition of the RFC 8446 §7.1 key
//! schedule over SHA-256, used to play the server's side of the
//! derivations and to cross-check the crate's results.

use hmac::Mac;
use sha2::Digest;

pub fn sha256(data: &[u8]) -> Vec<u8> {
    sha2::Sha256::digest(data).to_vec()
}

pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = hmac::Hmac::<sha2::Sha256>::new_from_slice(key).unwrap();
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// HKDF-Extract.
pub fn extract(salt: &[u8], ikm: &[u8]) -> Vec<u8> {
    hmac_sha256(salt, ikm)
}

/// HKDF-Expand-Label; all outputs here fit one HMAC block.
pub fn expand_label(secret: &[u8], label: &[u8], context: &[u8], len: usize) -> Vec<u8> {
    assert!(len <= 32);
    let mut info = Vec::new();
    info.extend_from_slice(&(len as u16).to_be_bytes());
    info.push((6 + label.len()) as u8);
    info.extend_from_slice(b"tls13 ");
    info.extend_from_slice(label);
    info.push(context.len() as u8);
    info.extend_from_slice(context);
    info.push(0x01);

    let mut okm = hmac_sha256(secret, &info);
    okm.truncate(len);
    okm
}

/// Derive-Secret.
pub fn derive_secret(secret: &[u8], label: &[u8], transcript_hash: &[u8]) -> Vec<u8> {
    expand_label(secret, label, transcript_hash, 32)
}

/// The early secret for an optional PSK.
pub fn early_secret(psk: Option<&[u8]>) -> Vec<u8> {
    let zeroes = [0u8; 32];
    extract(&zeroes, psk.unwrap_or(&zeroes))
}

/// The handshake secret, mixing an optional ECDHE shared secret into
/// the early secret.
pub fn handshake_secret(early: &[u8], shared: Option<&[u8]>) -> Vec<u8> {
    let zeroes = [0u8; 32];
    let salt = derive_secret(early, b"derived", &sha256(&[]));
    extract(&salt, shared.unwrap_or(&zeroes))
}

/// The master secret above a handshake secret.
pub fn master_secret(handshake: &[u8]) -> Vec<u8> {
    let zeroes = [0u8; 32];
    let salt = derive_secret(handshake, b"derived", &sha256(&[]));
    extract(&salt, &zeroes)
}

/// The Finished verify_data for `traffic_secret` over
/// `transcript_hash`.
pub fn finished_verify_data(traffic_secret: &[u8], transcript_hash: &[u8]) -> Vec<u8> {
    let finished_key = expand_label(traffic_secret, b"finished", &[], 32);
    hmac_sha256(&finished_key, transcript_hash)
}

/// The binder a client must produce for a PSK over the truncated
/// ClientHello transcript hash.
pub fn psk_binder(psk: &[u8], label: &[u8], truncated_transcript_hash: &[u8]) -> Vec<u8> {
    let early = early_secret(Some(psk));
    let binder_key = derive_secret(&early, label, &sha256(&[]));
    finished_verify_data(&binder_key, truncated_transcript_hash)
}

/// An incremental SHA-256 transcript.
#[derive(Clone, Default)]
pub struct Transcript {
    buffer: Vec<u8>,
}

impl Transcript {
    pub fn add(&mut self, message: &[u8]) {
        self.buffer.extend_from_slice(message);
    }

    pub fn hash(&self) -> Vec<u8> {
        sha256(&self.buffer)
    }

    /// Replace the transcript with the RFC 8446 §4.4.1 synthetic
    /// `message_hash` message, as a HelloRetryRequest demands.
    pub fn rollup_for_hrr(&mut self) {
        let hash = self.hash();
        self.buffer.clear();
        self.buffer.push(0xfe);
        self.buffer.extend_from_slice(&[0, 0, 32]);
        self.buffer.extend_from_slice(&hash);
    }
}
