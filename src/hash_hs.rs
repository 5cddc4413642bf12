//! The handshake transcript hash.
//!
//! Until ServerHello selects a cipher suite we don't know which hash
//! function the transcript uses, so early messages are buffered as
//! bytes ([`HandshakeHashBuffer`]) and replayed into the real hash
//! ([`HandshakeHash`]) once the suite is known.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::crypto::hash;
use crate::enums::HandshakeType;
use crate::msgs::codec::Codec;
use crate::msgs::handshake::HandshakeMessagePayload;

/// Buffered transcript bytes from before the hash function was known.
pub(crate) struct HandshakeHashBuffer {
    buffer: Vec<u8>,
}

impl HandshakeHashBuffer {
    pub(crate) fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Hash a handshake message, header included.
    pub(crate) fn add_message(&mut self, m: &HandshakeMessagePayload) {
        m.encode(&mut self.buffer);
    }

    /// The hash of the transcript so far followed by `extra`, under
    /// `provider`.  `extra` is how the PSK binder obtains the hash of a
    /// truncated ClientHello that is not itself part of the transcript
    /// yet.
    pub(crate) fn hash_given(
        &self,
        provider: &'static dyn hash::Hash,
        extra: &[u8],
    ) -> hash::Output {
        let mut ctx = provider.start();
        ctx.update(&self.buffer);
        ctx.update(extra);
        ctx.finish()
    }

    /// Move to a running hash now that the suite hash is known.
    pub(crate) fn start_hash(self, provider: &'static dyn hash::Hash) -> HandshakeHash {
        let mut ctx = provider.start();
        ctx.update(&self.buffer);
        HandshakeHash { provider, ctx }
    }
}

/// The running transcript hash.
pub(crate) struct HandshakeHash {
    provider: &'static dyn hash::Hash,
    ctx: Box<dyn hash::Context>,
}

impl HandshakeHash {
    /// Hash a handshake message, header included.
    pub(crate) fn add_message(&mut self, m: &HandshakeMessagePayload) {
        self.ctx.update(&m.get_encoding());
    }

    /// Hash raw transcript bytes; used to feed binder bytes after the
    /// truncated portion was snapshotted.
    pub(crate) fn add_raw(&mut self, bytes: &[u8]) {
        self.ctx.update(bytes);
    }

    /// The hash of the transcript so far.
    pub(crate) fn current_hash(&self) -> hash::Output {
        self.ctx.fork_finish()
    }

    pub(crate) fn algorithm(&self) -> hash::HashAlgorithm {
        self.provider.algorithm()
    }

    /// Perform the transcript reset a HelloRetryRequest demands
    /// (RFC 8446 §4.4.1): the ClientHello hashed so far is replaced by
    /// a synthetic `message_hash` message containing its hash.
    pub(crate) fn into_hrr_buffer(self) -> HandshakeHashBuffer {
        let old_hash = self.ctx.finish();
        let hash_len = old_hash.as_ref().len();

        let mut buffer = Vec::with_capacity(4 + hash_len);
        buffer.push(u8::from(HandshakeType::MessageHash));
        buffer.extend_from_slice(&[0, 0, hash_len as u8]);
        buffer.extend_from_slice(old_hash.as_ref());

        HandshakeHashBuffer { buffer }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_provider::TLS13_AES_128_GCM_SHA256;

    fn provider() -> &'static dyn hash::Hash {
        TLS13_AES_128_GCM_SHA256.common.hash_provider
    }

    #[test]
    fn buffered_and_running_hashes_agree() {
        let mut buffer = HandshakeHashBuffer::new();
        buffer.buffer.extend_from_slice(b"hello world");

        let expected = provider().hash(b"hello world");
        assert_eq!(
            buffer.hash_given(provider(), &[]).as_ref(),
            expected.as_ref()
        );

        let running = buffer.start_hash(provider());
        assert_eq!(running.current_hash().as_ref(), expected.as_ref());
    }

    #[test]
    fn hash_given_appends_extra_bytes() {
        let mut buffer = HandshakeHashBuffer::new();
        buffer.buffer.extend_from_slice(b"hello ");
        let spliced = buffer.hash_given(provider(), b"world");
        assert_eq!(
            spliced.as_ref(),
            provider().hash(b"hello world").as_ref()
        );
    }

    #[test]
    fn hrr_buffer_contains_message_hash_header() {
        let mut buffer = HandshakeHashBuffer::new();
        buffer.buffer.extend_from_slice(b"client hello bytes");
        let running = buffer.start_hash(provider());

        let rolled = running.into_hrr_buffer();
        let expected_hash = provider().hash(b"client hello bytes");
        assert_eq!(rolled.buffer[0], 0xfe);
        assert_eq!(&rolled.buffer[1..4], &[0, 0, 32]);
        assert_eq!(&rolled.buffer[4..], expected_hash.as_ref());
    }
}
