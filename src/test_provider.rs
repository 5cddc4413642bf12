//! A deterministic crypto provider for in-crate tests: real SHA-2
//! hashing and HMAC (the key schedule must produce real values), a
//! pass-through AEAD, and a key exchange whose shared secret is a hash
//! of both public shares.

use alloc::boxed::Box;
use alloc::vec::Vec;

use hmac::Mac;
use sha2::Digest;

use crate::crypto::cipher::{
    AeadKey, Iv, MessageDecrypter, MessageEncrypter, Tls13AeadAlgorithm,
};
use crate::crypto::hash::{self, HashAlgorithm};
use crate::crypto::hmac::{Hmac, Key, Tag};
use crate::crypto::{
    ActiveKeyExchange, CryptoProvider, GetRandomFailed, SecureRandom, SharedSecret,
    SupportedKxGroup,
};
use crate::enums::{CipherSuite, ContentType};
use crate::error::Error;
use crate::msgs::enums::NamedGroup;
use crate::tls13::{CipherSuiteCommon, Tls13CipherSuite};

pub(crate) static TLS13_AES_128_GCM_SHA256: Tls13CipherSuite = Tls13CipherSuite {
    common: CipherSuiteCommon {
        suite: CipherSuite::TLS13_AES_128_GCM_SHA256,
        hash_provider: &Sha256Provider,
    },
    hmac_provider: &HmacSha256Provider,
    aead_alg: &NullAead { key_len: 16 },
};

pub(crate) static TLS13_AES_256_GCM_SHA384: Tls13CipherSuite = Tls13CipherSuite {
    common: CipherSuiteCommon {
        suite: CipherSuite::TLS13_AES_256_GCM_SHA384,
        hash_provider: &Sha384Provider,
    },
    hmac_provider: &HmacSha384Provider,
    aead_alg: &NullAead { key_len: 32 },
};

pub(crate) static X25519: TestKxGroup = TestKxGroup {
    name: NamedGroup::X25519,
};

pub(crate) static SECP256R1: TestKxGroup = TestKxGroup {
    name: NamedGroup::secp256r1,
};

pub(crate) fn provider() -> CryptoProvider {
    CryptoProvider {
        cipher_suites: alloc::vec![&TLS13_AES_128_GCM_SHA256, &TLS13_AES_256_GCM_SHA384],
        kx_groups: alloc::vec![&X25519, &SECP256R1],
        secure_random: &TestRandom,
    }
}

#[derive(Debug)]
pub(crate) struct Sha256Provider;

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
pub(crate) struct Sha384Provider;

impl hash::Hash for Sha384Provider {
    fn algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::SHA384
    }

    fn start(&self) -> Box<dyn hash::Context> {
        Box::new(Sha384Context(sha2::Sha384::new()))
    }

    fn hash(&self, data: &[u8]) -> hash::Output {
        hash::Output::new(&sha2::Sha384::digest(data))
    }
}

struct Sha384Context(sha2::Sha384);

impl hash::Context for Sha384Context {
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
pub(crate) struct HmacSha256Provider;

impl Hmac for HmacSha256Provider {
    fn with_key(&self, key: &[u8]) -> Box<dyn Key> {
        Box::new(HmacSha256Key(
            hmac::Hmac::<sha2::Sha256>::new_from_slice(key).expect("any key length works"),
        ))
    }

    fn hash_output_len(&self) -> usize {
        32
    }
}

struct HmacSha256Key(hmac::Hmac<sha2::Sha256>);

impl Key for HmacSha256Key {
    fn sign(&self, data: &[&[u8]]) -> Tag {
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

#[derive(Debug)]
pub(crate) struct HmacSha384Provider;

impl Hmac for HmacSha384Provider {
    fn with_key(&self, key: &[u8]) -> Box<dyn Key> {
        Box::new(HmacSha384Key(
            hmac::Hmac::<sha2::Sha384>::new_from_slice(key).expect("any key length works"),
        ))
    }

    fn hash_output_len(&self) -> usize {
        48
    }
}

struct HmacSha384Key(hmac::Hmac<sha2::Sha384>);

impl Key for HmacSha384Key {
    fn sign(&self, data: &[&[u8]]) -> Tag {
        let mut mac = self.0.clone();
        for chunk in data {
            mac.update(chunk);
        }
        Tag::new(&mac.finalize().into_bytes())
    }

    fn tag_len(&self) -> usize {
        48
    }
}

/// An "AEAD" that changes nothing: tests inspect plaintext.
pub(crate) struct NullAead {
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
pub(crate) struct TestRandom;

impl SecureRandom for TestRandom {
    fn fill(&self, buf: &mut [u8]) -> Result<(), GetRandomFailed> {
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = 0x40 | (i as u8 & 0x3f);
        }
        Ok(())
    }
}

#[derive(Debug)]
pub(crate) struct TestKxGroup {
    name: NamedGroup,
}

impl SupportedKxGroup for TestKxGroup {
    fn name(&self) -> NamedGroup {
        self.name
    }

    fn start(&self) -> Result<Box<dyn ActiveKeyExchange>, Error> {
        let mut pub_key = Vec::with_capacity(34);
        pub_key.extend_from_slice(&self.name.to_array());
        pub_key.extend_from_slice(&[0x5a; 32]);
        Ok(Box::new(TestKx {
            group: self.name,
            pub_key,
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
        // deterministic and symmetric-free: both sides hash
        // (client_share, server_share) in that order
        let mut ctx = sha2::Sha256::new();
        ctx.update(&self.pub_key);
        ctx.update(peer_pub_key);
        Ok(SharedSecret::from(ctx.finalize().to_vec()))
    }
}
