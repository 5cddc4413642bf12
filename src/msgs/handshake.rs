//! Handshake message payloads and their extensions: everything between
//! a handshake header and the record layer.
//!
//! Parsing here is strict about lengths and structure only; rules that
//! depend on negotiation state (allow-masks, solicitation, duplicate
//! extensions) are enforced by the state machine, which knows which
//! alert each violation deserves.

use alloc::vec;
use alloc::vec::Vec;

use pki_types::CertificateDer;

use crate::crypto::SecureRandom;
use crate::enums::{CipherSuite, HandshakeType, ProtocolVersion, SignatureScheme};
use crate::error::{Error, InvalidMessage};
use crate::msgs::base::{Payload, PayloadU16, PayloadU24, PayloadU8};
use crate::msgs::codec::{Codec, LengthPrefixedBuffer, ListLength, Reader, TlsListElement, u24};
use crate::msgs::enums::{
    Compression, ExtensionType, NamedGroup, PskKeyExchangeMode, ServerNameType,
};

/// The fixed ServerHello.random that reclassifies the message as a
/// HelloRetryRequest: SHA-256("HelloRetryRequest").
pub static HELLO_RETRY_REQUEST_RANDOM: Random = Random([
    0xcf, 0x21, 0xad, 0x74, 0xe5, 0x9a, 0x61, 0x11, 0xbe, 0x1d, 0x8c, 0x02, 0x1e, 0x65, 0xb8,
    0x91, 0xc2, 0xa2, 0x11, 0x16, 0x7a, 0xbb, 0x8c, 0x5e, 0x07, 0x9e, 0x09, 0xe2, 0xc8, 0xa8,
    0x33, 0x9c,
]);

/// Last eight bytes of ServerHello.random when a TLS 1.3-capable server
/// deliberately negotiates TLS 1.2 (RFC 8446 §4.1.3).
pub(crate) static DOWNGRADE_SENTINEL_TLS12: [u8; 8] =
    [0x44, 0x4f, 0x57, 0x4e, 0x47, 0x52, 0x44, 0x01];

/// As above, for a negotiation of TLS 1.1 or below.
pub(crate) static DOWNGRADE_SENTINEL_TLS11_OR_BELOW: [u8; 8] =
    [0x44, 0x4f, 0x57, 0x4e, 0x47, 0x52, 0x44, 0x00];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Random(pub [u8; 32]);

impl Random {
    pub(crate) fn new(secure_random: &dyn SecureRandom) -> Result<Self, Error> {
        let mut data = [0u8; 32];
        secure_random
            .fill(&mut data)
            .map_err(|_| Error::FailedToGetRandomBytes)?;
        Ok(Self(data))
    }

    /// Whether the trailing eight bytes carry either downgrade sentinel.
    pub(crate) fn has_downgrade_sentinel(&self) -> bool {
        let tail = &self.0[24..];
        tail == DOWNGRADE_SENTINEL_TLS12 || tail == DOWNGRADE_SENTINEL_TLS11_OR_BELOW
    }
}

impl<'a> Codec<'a> for Random {
    fn encode(&self, bytes: &mut Vec<u8>) {
        bytes.extend_from_slice(&self.0);
    }

    fn read(r: &mut Reader<'a>) -> Result<Self, InvalidMessage> {
        let bytes = r
            .take(32)
            .ok_or(InvalidMessage::MissingData("Random"))?;
        let mut opaque = [0; 32];
        opaque.copy_from_slice(bytes);
        Ok(Self(opaque))
    }
}

impl From<[u8; 32]> for Random {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// The legacy_session_id: up to 32 opaque bytes, echoed verbatim by a
/// TLS 1.3 server.
#[derive(Clone, Copy)]
pub struct SessionId {
    len: usize,
    data: [u8; 32],
}

impl SessionId {
    pub(crate) fn random(secure_random: &dyn SecureRandom) -> Result<Self, Error> {
        let mut data = [0u8; 32];
        secure_random
            .fill(&mut data)
            .map_err(|_| Error::FailedToGetRandomBytes)?;
        Ok(Self { len: 32, data })
    }

    pub fn empty() -> Self {
        Self {
            len: 0,
            data: [0; 32],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl AsRef<[u8]> for SessionId {
    fn as_ref(&self) -> &[u8] {
        &self.data[..self.len]
    }
}

impl PartialEq for SessionId {
    fn eq(&self, other: &Self) -> bool {
        self.as_ref() == other.as_ref()
    }
}

impl core::fmt::Debug for SessionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for b in self.as_ref() {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl<'a> Codec<'a> for SessionId {
    fn encode(&self, bytes: &mut Vec<u8>) {
        debug_assert!(self.len <= 32);
        (self.len as u8).encode(bytes);
        bytes.extend_from_slice(self.as_ref());
    }

    fn read(r: &mut Reader<'a>) -> Result<Self, InvalidMessage> {
        let len = usize::from(u8::read(r)?);
        if len > 32 {
            return Err(InvalidMessage::TrailingData("SessionID"));
        }

        let bytes = r
            .take(len)
            .ok_or(InvalidMessage::MissingData("SessionID"))?;
        let mut out = [0u8; 32];
        out[..len].copy_from_slice(bytes);
        Ok(Self { len, data: out })
    }
}

/// An extension we received but have no knowledge of: type plus raw body.
#[derive(Clone, Debug, PartialEq)]
pub struct UnknownExtension {
    pub typ: ExtensionType,
    pub payload: Payload,
}

impl UnknownExtension {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.payload.encode(bytes);
    }

    fn read(typ: ExtensionType, r: &mut Reader<'_>) -> Self {
        let payload = Payload::new(r.rest());
        Self { typ, payload }
    }
}

impl TlsListElement for ProtocolVersion {
    const SIZE_LEN: ListLength = ListLength::U8;
}

impl TlsListElement for CipherSuite {
    const SIZE_LEN: ListLength = ListLength::U16;
}

impl TlsListElement for Compression {
    const SIZE_LEN: ListLength = ListLength::U8;
}

impl TlsListElement for NamedGroup {
    const SIZE_LEN: ListLength = ListLength::U16;
}

impl TlsListElement for SignatureScheme {
    const SIZE_LEN: ListLength = ListLength::U16;
}

impl TlsListElement for PskKeyExchangeMode {
    const SIZE_LEN: ListLength = ListLength::U8;
}

impl TlsListElement for PayloadU16 {
    const SIZE_LEN: ListLength = ListLength::U16;
}

/// A single ALPN protocol name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProtocolName(PayloadU8);

impl ProtocolName {
    pub fn as_ref(&self) -> &[u8] {
        &self.0 .0
    }
}

impl From<Vec<u8>> for ProtocolName {
    fn from(bytes: Vec<u8>) -> Self {
        Self(PayloadU8::new(bytes))
    }
}

impl<'a> Codec<'a> for ProtocolName {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.0.encode(bytes);
    }

    fn read(r: &mut Reader<'a>) -> Result<Self, InvalidMessage> {
        PayloadU8::read(r).map(Self)
    }
}

impl TlsListElement for ProtocolName {
    const SIZE_LEN: ListLength = ListLength::U16;
}

/// One entry of the `server_name` extension.  We only ever produce
/// `host_name` entries.
#[derive(Clone, Debug, PartialEq)]
pub struct ServerNameEntry {
    pub typ: ServerNameType,
    pub hostname: PayloadU16,
}

impl ServerNameEntry {
    fn hostname(name: &str) -> Self {
        Self {
            typ: ServerNameType::HostName,
            hostname: PayloadU16::new(name.as_bytes().to_vec()),
        }
    }
}

impl<'a> Codec<'a> for ServerNameEntry {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.typ.encode(bytes);
        self.hostname.encode(bytes);
    }

    fn read(r: &mut Reader<'a>) -> Result<Self, InvalidMessage> {
        Ok(Self {
            typ: ServerNameType::read(r)?,
            hostname: PayloadU16::read(r)?,
        })
    }
}

impl TlsListElement for ServerNameEntry {
    const SIZE_LEN: ListLength = ListLength::U16;
}

/// One `KeyShareEntry`: a named group plus the sender's public share.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyShareEntry {
    pub group: NamedGroup,
    pub payload: PayloadU16,
}

impl KeyShareEntry {
    pub fn new(group: NamedGroup, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            group,
            payload: PayloadU16::new(payload.into()),
        }
    }
}

impl<'a> Codec<'a> for KeyShareEntry {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.group.encode(bytes);
        self.payload.encode(bytes);
    }

    fn read(r: &mut Reader<'a>) -> Result<Self, InvalidMessage> {
        let group = NamedGroup::read(r)?;
        let payload = PayloadU16::read(r)?;
        if payload.0.is_empty() {
            return Err(InvalidMessage::IllegalEmptyValue("KeyShareEntry"));
        }
        Ok(Self { group, payload })
    }
}

impl TlsListElement for KeyShareEntry {
    const SIZE_LEN: ListLength = ListLength::U16;
}

/// One offered PSK identity with its obfuscated ticket age.
#[derive(Clone, Debug, PartialEq)]
pub struct PresharedKeyIdentity {
    pub identity: PayloadU16,
    pub obfuscated_ticket_age: u32,
}

impl PresharedKeyIdentity {
    pub fn new(identity: Vec<u8>, obfuscated_ticket_age: u32) -> Self {
        Self {
            identity: PayloadU16::new(identity),
            obfuscated_ticket_age,
        }
    }
}

impl<'a> Codec<'a> for PresharedKeyIdentity {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.identity.encode(bytes);
        self.obfuscated_ticket_age.encode(bytes);
    }

    fn read(r: &mut Reader<'a>) -> Result<Self, InvalidMessage> {
        Ok(Self {
            identity: PayloadU16::read(r)?,
            obfuscated_ticket_age: u32::read(r)?,
        })
    }
}

impl TlsListElement for PresharedKeyIdentity {
    const SIZE_LEN: ListLength = ListLength::U16;
}

/// One PSK binder: an HMAC over the truncated ClientHello transcript.
#[derive(Clone, Debug, PartialEq)]
pub struct PresharedKeyBinder(PayloadU8);

impl PresharedKeyBinder {
    pub fn new(body: Vec<u8>) -> Self {
        Self(PayloadU8::new(body))
    }

    pub fn as_ref(&self) -> &[u8] {
        &self.0 .0
    }
}

impl<'a> Codec<'a> for PresharedKeyBinder {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.0.encode(bytes);
    }

    fn read(r: &mut Reader<'a>) -> Result<Self, InvalidMessage> {
        PayloadU8::read(r).map(Self)
    }
}

impl TlsListElement for PresharedKeyBinder {
    const SIZE_LEN: ListLength = ListLength::U16;
}

/// The whole `pre_shared_key` offer: parallel lists of identities and
/// binders.
#[derive(Clone, Debug, PartialEq)]
pub struct PresharedKeyOffer {
    pub identities: Vec<PresharedKeyIdentity>,
    pub binders: Vec<PresharedKeyBinder>,
}

impl PresharedKeyOffer {
    /// Wire length of the binders list, including its two length bytes.
    ///
    /// This many bytes at the tail of the ClientHello encoding are
    /// excluded from the transcript hash the binders authenticate.
    pub(crate) fn binders_encoding_len(&self) -> usize {
        2 + self
            .binders
            .iter()
            .map(|binder| 1 + binder.as_ref().len())
            .sum::<usize>()
    }
}

impl<'a> Codec<'a> for PresharedKeyOffer {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.identities.encode(bytes);
        self.binders.encode(bytes);
    }

    fn read(r: &mut Reader<'a>) -> Result<Self, InvalidMessage> {
        let offer = Self {
            identities: Vec::read(r)?,
            binders: Vec::read(r)?,
        };
        if offer.identities.is_empty() || offer.binders.is_empty() {
            return Err(InvalidMessage::IllegalEmptyList("PskIdentity"));
        }
        Ok(offer)
    }
}

/// An extension in a ClientHello.
#[derive(Clone, Debug, PartialEq)]
pub enum ClientExtension {
    SupportedVersions(Vec<ProtocolVersion>),
    NamedGroups(Vec<NamedGroup>),
    SignatureAlgorithms(Vec<SignatureScheme>),
    ServerName(Vec<ServerNameEntry>),
    Protocols(Vec<ProtocolName>),
    Cookie(PayloadU16),
    PresharedKeyModes(Vec<PskKeyExchangeMode>),
    KeyShare(Vec<KeyShareEntry>),
    EarlyData,
    PresharedKey(PresharedKeyOffer),
    Unknown(UnknownExtension),
}

impl ClientExtension {
    pub fn ext_type(&self) -> ExtensionType {
        match self {
            Self::SupportedVersions(_) => ExtensionType::SupportedVersions,
            Self::NamedGroups(_) => ExtensionType::SupportedGroups,
            Self::SignatureAlgorithms(_) => ExtensionType::SignatureAlgorithms,
            Self::ServerName(_) => ExtensionType::ServerName,
            Self::Protocols(_) => ExtensionType::ALProtocolNegotiation,
            Self::Cookie(_) => ExtensionType::Cookie,
            Self::PresharedKeyModes(_) => ExtensionType::PSKKeyExchangeModes,
            Self::KeyShare(_) => ExtensionType::KeyShare,
            Self::EarlyData => ExtensionType::EarlyData,
            Self::PresharedKey(_) => ExtensionType::PreSharedKey,
            Self::Unknown(r) => r.typ,
        }
    }

    pub fn make_sni(hostname: &str) -> Self {
        Self::ServerName(vec![ServerNameEntry::hostname(hostname)])
    }
}

impl<'a> Codec<'a> for ClientExtension {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.ext_type().encode(bytes);

        let nested = &mut LengthPrefixedBuffer::new(ListLength::U16, bytes);
        match self {
            Self::SupportedVersions(r) => r.encode(nested),
            Self::NamedGroups(r) => r.encode(nested),
            Self::SignatureAlgorithms(r) => r.encode(nested),
            Self::ServerName(r) => r.encode(nested),
            Self::Protocols(r) => r.encode(nested),
            Self::Cookie(r) => r.encode(nested),
            Self::PresharedKeyModes(r) => r.encode(nested),
            Self::KeyShare(r) => r.encode(nested),
            Self::EarlyData => {}
            Self::PresharedKey(r) => r.encode(nested),
            Self::Unknown(r) => r.encode(nested),
        }
    }

    fn read(r: &mut Reader<'a>) -> Result<Self, InvalidMessage> {
        let typ = ExtensionType::read(r)?;
        let len = usize::from(u16::read(r)?);
        let mut sub = r.sub(len)?;

        let ext = match typ {
            ExtensionType::SupportedVersions => Self::SupportedVersions(Vec::read(&mut sub)?),
            ExtensionType::SupportedGroups => Self::NamedGroups(Vec::read(&mut sub)?),
            ExtensionType::SignatureAlgorithms => Self::SignatureAlgorithms(Vec::read(&mut sub)?),
            ExtensionType::ServerName => Self::ServerName(Vec::read(&mut sub)?),
            ExtensionType::ALProtocolNegotiation => Self::Protocols(Vec::read(&mut sub)?),
            ExtensionType::Cookie => Self::Cookie(PayloadU16::read(&mut sub)?),
            ExtensionType::PSKKeyExchangeModes => Self::PresharedKeyModes(Vec::read(&mut sub)?),
            ExtensionType::KeyShare => Self::KeyShare(Vec::read(&mut sub)?),
            ExtensionType::EarlyData => Self::EarlyData,
            ExtensionType::PreSharedKey => Self::PresharedKey(PresharedKeyOffer::read(&mut sub)?),
            _ => Self::Unknown(UnknownExtension::read(typ, &mut sub)),
        };

        sub.expect_empty("ClientExtension")?;
        Ok(ext)
    }
}

impl TlsListElement for ClientExtension {
    const SIZE_LEN: ListLength = ListLength::U16;
}

/// An extension in a ServerHello or EncryptedExtensions.
#[derive(Clone, Debug, PartialEq)]
pub enum ServerExtension {
    ServerNameAck,
    Protocols(Vec<ProtocolName>),
    KeyShare(KeyShareEntry),
    PresharedKey(u16),
    SupportedVersions(ProtocolVersion),
    EarlyData,
    Unknown(UnknownExtension),
}

impl ServerExtension {
    pub fn ext_type(&self) -> ExtensionType {
        match self {
            Self::ServerNameAck => ExtensionType::ServerName,
            Self::Protocols(_) => ExtensionType::ALProtocolNegotiation,
            Self::KeyShare(_) => ExtensionType::KeyShare,
            Self::PresharedKey(_) => ExtensionType::PreSharedKey,
            Self::SupportedVersions(_) => ExtensionType::SupportedVersions,
            Self::EarlyData => ExtensionType::EarlyData,
            Self::Unknown(r) => r.typ,
        }
    }
}

impl<'a> Codec<'a> for ServerExtension {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.ext_type().encode(bytes);

        let nested = &mut LengthPrefixedBuffer::new(ListLength::U16, bytes);
        match self {
            Self::ServerNameAck | Self::EarlyData => {}
            Self::Protocols(r) => r.encode(nested),
            Self::KeyShare(r) => r.encode(nested),
            Self::PresharedKey(r) => r.encode(nested),
            Self::SupportedVersions(r) => r.encode(nested),
            Self::Unknown(r) => r.encode(nested),
        }
    }

    fn read(r: &mut Reader<'a>) -> Result<Self, InvalidMessage> {
        let typ = ExtensionType::read(r)?;
        let len = usize::from(u16::read(r)?);
        let mut sub = r.sub(len)?;

        let ext = match typ {
            ExtensionType::ServerName => Self::ServerNameAck,
            ExtensionType::ALProtocolNegotiation => Self::Protocols(Vec::read(&mut sub)?),
            ExtensionType::KeyShare => Self::KeyShare(KeyShareEntry::read(&mut sub)?),
            ExtensionType::PreSharedKey => Self::PresharedKey(u16::read(&mut sub)?),
            ExtensionType::SupportedVersions => {
                Self::SupportedVersions(ProtocolVersion::read(&mut sub)?)
            }
            ExtensionType::EarlyData => Self::EarlyData,
            _ => Self::Unknown(UnknownExtension::read(typ, &mut sub)),
        };

        sub.expect_empty("ServerExtension")?;
        Ok(ext)
    }
}

impl TlsListElement for ServerExtension {
    const SIZE_LEN: ListLength = ListLength::U16;
}

/// An extension in a HelloRetryRequest.  The `key_share` body differs
/// from the ServerHello shape: it is a bare group with no share.
#[derive(Clone, Debug, PartialEq)]
pub enum HelloRetryExtension {
    KeyShare(NamedGroup),
    Cookie(PayloadU16),
    SupportedVersions(ProtocolVersion),
    Unknown(UnknownExtension),
}

impl HelloRetryExtension {
    pub fn ext_type(&self) -> ExtensionType {
        match self {
            Self::KeyShare(_) => ExtensionType::KeyShare,
            Self::Cookie(_) => ExtensionType::Cookie,
            Self::SupportedVersions(_) => ExtensionType::SupportedVersions,
            Self::Unknown(r) => r.typ,
        }
    }
}

impl<'a> Codec<'a> for HelloRetryExtension {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.ext_type().encode(bytes);

        let nested = &mut LengthPrefixedBuffer::new(ListLength::U16, bytes);
        match self {
            Self::KeyShare(r) => r.encode(nested),
            Self::Cookie(r) => r.encode(nested),
            Self::SupportedVersions(r) => r.encode(nested),
            Self::Unknown(r) => r.encode(nested),
        }
    }

    fn read(r: &mut Reader<'a>) -> Result<Self, InvalidMessage> {
        let typ = ExtensionType::read(r)?;
        let len = usize::from(u16::read(r)?);
        let mut sub = r.sub(len)?;

        let ext = match typ {
            ExtensionType::KeyShare => Self::KeyShare(NamedGroup::read(&mut sub)?),
            ExtensionType::Cookie => Self::Cookie(PayloadU16::read(&mut sub)?),
            ExtensionType::SupportedVersions => {
                Self::SupportedVersions(ProtocolVersion::read(&mut sub)?)
            }
            _ => Self::Unknown(UnknownExtension::read(typ, &mut sub)),
        };

        sub.expect_empty("HelloRetryExtension")?;
        Ok(ext)
    }
}

impl TlsListElement for HelloRetryExtension {
    const SIZE_LEN: ListLength = ListLength::U16;
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClientHelloPayload {
    pub client_version: ProtocolVersion,
    pub random: Random,
    pub session_id: SessionId,
    pub cipher_suites: Vec<CipherSuite>,
    pub compression_methods: Vec<Compression>,
    pub extensions: Vec<ClientExtension>,
}

impl ClientHelloPayload {
    pub fn find_extension(&self, ext: ExtensionType) -> Option<&ClientExtension> {
        self.extensions
            .iter()
            .find(|x| x.ext_type() == ext)
    }

    pub fn has_duplicate_extension(&self) -> bool {
        has_duplicates(self.extensions.iter().map(ClientExtension::ext_type))
    }

    pub(crate) fn preshared_key_offer(&self) -> Option<&PresharedKeyOffer> {
        match self.find_extension(ExtensionType::PreSharedKey) {
            Some(ClientExtension::PresharedKey(psk)) => Some(psk),
            _ => None,
        }
    }

    /// Overwrite the `index`th reserved binder with its real value.
    ///
    /// Only meaningful once the `pre_shared_key` extension is in place
    /// as the final extension.
    pub(crate) fn set_psk_binder(&mut self, index: usize, binder: impl Into<Vec<u8>>) {
        if let Some(ClientExtension::PresharedKey(offer)) = self.extensions.last_mut() {
            offer.binders[index] = PresharedKeyBinder::new(binder.into());
        }
    }
}

impl<'a> Codec<'a> for ClientHelloPayload {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.client_version.encode(bytes);
        self.random.encode(bytes);
        self.session_id.encode(bytes);
        self.cipher_suites.encode(bytes);
        self.compression_methods.encode(bytes);

        if !self.extensions.is_empty() {
            self.extensions.encode(bytes);
        }
    }

    fn read(r: &mut Reader<'a>) -> Result<Self, InvalidMessage> {
        let mut ret = Self {
            client_version: ProtocolVersion::read(r)?,
            random: Random::read(r)?,
            session_id: SessionId::read(r)?,
            cipher_suites: Vec::read(r)?,
            compression_methods: Vec::read(r)?,
            extensions: Vec::new(),
        };

        if r.any_left() {
            ret.extensions = Vec::read(r)?;
        }

        match r.any_left() {
            true => Err(InvalidMessage::TrailingData("ClientHelloPayload")),
            false => Ok(ret),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ServerHelloPayload {
    pub legacy_version: ProtocolVersion,
    pub random: Random,
    pub session_id: SessionId,
    pub cipher_suite: CipherSuite,
    pub compression_method: Compression,
    pub extensions: Vec<ServerExtension>,
}

impl ServerHelloPayload {
    /// Reads everything after the random, which the caller has already
    /// consumed to classify the message.
    fn read_after_random(
        legacy_version: ProtocolVersion,
        random: Random,
        r: &mut Reader<'_>,
    ) -> Result<Self, InvalidMessage> {
        Ok(Self {
            legacy_version,
            random,
            session_id: SessionId::read(r)?,
            cipher_suite: CipherSuite::read(r)?,
            compression_method: Compression::read(r)?,
            // absent on some TLS 1.2 servers, which we still classify
            extensions: match r.any_left() {
                true => Vec::read(r)?,
                false => Vec::new(),
            },
        })
    }
}

impl<'a> Codec<'a> for ServerHelloPayload {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.legacy_version.encode(bytes);
        self.random.encode(bytes);
        self.session_id.encode(bytes);
        self.cipher_suite.encode(bytes);
        self.compression_method.encode(bytes);
        self.extensions.encode(bytes);
    }

    fn read(r: &mut Reader<'a>) -> Result<Self, InvalidMessage> {
        let legacy_version = ProtocolVersion::read(r)?;
        let random = Random::read(r)?;
        Self::read_after_random(legacy_version, random, r)
    }
}

impl HasServerExtensions for ServerHelloPayload {
    fn extensions(&self) -> &[ServerExtension] {
        &self.extensions
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HelloRetryRequest {
    pub legacy_version: ProtocolVersion,
    pub session_id: SessionId,
    pub cipher_suite: CipherSuite,
    pub extensions: Vec<HelloRetryExtension>,
}

impl HelloRetryRequest {
    pub fn requested_key_share_group(&self) -> Option<NamedGroup> {
        self.extensions
            .iter()
            .find_map(|ext| match ext {
                HelloRetryExtension::KeyShare(group) => Some(*group),
                _ => None,
            })
    }

    pub fn cookie(&self) -> Option<&PayloadU16> {
        self.extensions
            .iter()
            .find_map(|ext| match ext {
                HelloRetryExtension::Cookie(cookie) => Some(cookie),
                _ => None,
            })
    }

    pub fn supported_versions(&self) -> Option<ProtocolVersion> {
        self.extensions
            .iter()
            .find_map(|ext| match ext {
                HelloRetryExtension::SupportedVersions(version) => Some(*version),
                _ => None,
            })
    }

    pub fn has_duplicate_extension(&self) -> bool {
        has_duplicates(
            self.extensions
                .iter()
                .map(HelloRetryExtension::ext_type),
        )
    }

    /// Whether any extension falls outside the HelloRetryRequest
    /// allow-mask.
    pub fn has_disallowed_extension(&self) -> bool {
        self.extensions
            .iter()
            .any(|ext| !ALLOWED_IN_HELLO_RETRY.contains(&ext.ext_type()))
    }

    fn read_after_random(
        legacy_version: ProtocolVersion,
        r: &mut Reader<'_>,
    ) -> Result<Self, InvalidMessage> {
        let session_id = SessionId::read(r)?;
        let cipher_suite = CipherSuite::read(r)?;
        if Compression::read(r)? != Compression::Null {
            return Err(InvalidMessage::UnexpectedMessage(
                "HelloRetryRequest with compression",
            ));
        }

        Ok(Self {
            legacy_version,
            session_id,
            cipher_suite,
            extensions: Vec::read(r)?,
        })
    }
}

impl<'a> Codec<'a> for HelloRetryRequest {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.legacy_version.encode(bytes);
        HELLO_RETRY_REQUEST_RANDOM.encode(bytes);
        self.session_id.encode(bytes);
        self.cipher_suite.encode(bytes);
        Compression::Null.encode(bytes);
        self.extensions.encode(bytes);
    }

    fn read(r: &mut Reader<'a>) -> Result<Self, InvalidMessage> {
        let legacy_version = ProtocolVersion::read(r)?;
        let random = Random::read(r)?;
        if random != HELLO_RETRY_REQUEST_RANDOM {
            return Err(InvalidMessage::UnexpectedMessage(
                "HelloRetryRequest without magic random",
            ));
        }
        Self::read_after_random(legacy_version, r)
    }
}

/// Accessors shared by every message carrying `ServerExtension`s.
pub trait HasServerExtensions {
    fn extensions(&self) -> &[ServerExtension];

    fn find_extension(&self, ext: ExtensionType) -> Option<&ServerExtension> {
        self.extensions()
            .iter()
            .find(|x| x.ext_type() == ext)
    }

    /// The selected ALPN protocol, if the extension carries exactly one
    /// entry.
    fn alpn_protocol(&self) -> Option<&[u8]> {
        match self.find_extension(ExtensionType::ALProtocolNegotiation) {
            Some(ServerExtension::Protocols(protos)) if protos.len() == 1 => {
                Some(protos[0].as_ref())
            }
            _ => None,
        }
    }

    fn alpn_entry_count(&self) -> usize {
        match self.find_extension(ExtensionType::ALProtocolNegotiation) {
            Some(ServerExtension::Protocols(protos)) => protos.len(),
            _ => 0,
        }
    }

    fn key_share(&self) -> Option<&KeyShareEntry> {
        match self.find_extension(ExtensionType::KeyShare) {
            Some(ServerExtension::KeyShare(entry)) => Some(entry),
            _ => None,
        }
    }

    fn psk_index(&self) -> Option<u16> {
        match self.find_extension(ExtensionType::PreSharedKey) {
            Some(ServerExtension::PresharedKey(index)) => Some(*index),
            _ => None,
        }
    }

    fn supported_versions(&self) -> Option<ProtocolVersion> {
        match self.find_extension(ExtensionType::SupportedVersions) {
            Some(ServerExtension::SupportedVersions(version)) => Some(*version),
            _ => None,
        }
    }

    fn early_data_extension_offered(&self) -> bool {
        self.find_extension(ExtensionType::EarlyData)
            .is_some()
    }

    fn has_duplicate_extension(&self) -> bool {
        has_duplicates(
            self.extensions()
                .iter()
                .map(ServerExtension::ext_type),
        )
    }
}

impl HasServerExtensions for [ServerExtension] {
    fn extensions(&self) -> &[ServerExtension] {
        self
    }
}

/// An extension in a TLS 1.3 CertificateRequest.
#[derive(Clone, Debug, PartialEq)]
pub enum CertReqExtension {
    SignatureAlgorithms(Vec<SignatureScheme>),
    AuthorityNames(Vec<PayloadU16>),
    Unknown(UnknownExtension),
}

impl CertReqExtension {
    pub fn ext_type(&self) -> ExtensionType {
        match self {
            Self::SignatureAlgorithms(_) => ExtensionType::SignatureAlgorithms,
            Self::AuthorityNames(_) => ExtensionType::CertificateAuthorities,
            Self::Unknown(r) => r.typ,
        }
    }
}

impl<'a> Codec<'a> for CertReqExtension {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.ext_type().encode(bytes);

        let nested = &mut LengthPrefixedBuffer::new(ListLength::U16, bytes);
        match self {
            Self::SignatureAlgorithms(r) => r.encode(nested),
            Self::AuthorityNames(r) => r.encode(nested),
            Self::Unknown(r) => r.encode(nested),
        }
    }

    fn read(r: &mut Reader<'a>) -> Result<Self, InvalidMessage> {
        let typ = ExtensionType::read(r)?;
        let len = usize::from(u16::read(r)?);
        let mut sub = r.sub(len)?;

        let ext = match typ {
            ExtensionType::SignatureAlgorithms => {
                let schemes: Vec<SignatureScheme> = Vec::read(&mut sub)?;
                if schemes.is_empty() {
                    return Err(InvalidMessage::IllegalEmptyList("SignatureSchemes"));
                }
                Self::SignatureAlgorithms(schemes)
            }
            ExtensionType::CertificateAuthorities => Self::AuthorityNames(Vec::read(&mut sub)?),
            _ => Self::Unknown(UnknownExtension::read(typ, &mut sub)),
        };

        sub.expect_empty("CertReqExtension")?;
        Ok(ext)
    }
}

impl TlsListElement for CertReqExtension {
    const SIZE_LEN: ListLength = ListLength::U16;
}

#[derive(Clone, Debug, PartialEq)]
pub struct CertificateRequestPayloadTls13 {
    pub context: PayloadU8,
    pub extensions: Vec<CertReqExtension>,
}

impl CertificateRequestPayloadTls13 {
    pub fn sigalgs_extension(&self) -> Option<&[SignatureScheme]> {
        self.extensions
            .iter()
            .find_map(|ext| match ext {
                CertReqExtension::SignatureAlgorithms(schemes) => Some(schemes.as_slice()),
                _ => None,
            })
    }

    pub fn authorities_extension(&self) -> Option<&[PayloadU16]> {
        self.extensions
            .iter()
            .find_map(|ext| match ext {
                CertReqExtension::AuthorityNames(names) => Some(names.as_slice()),
                _ => None,
            })
    }

    pub fn has_duplicate_extension(&self) -> bool {
        has_duplicates(
            self.extensions
                .iter()
                .map(CertReqExtension::ext_type),
        )
    }
}

impl<'a> Codec<'a> for CertificateRequestPayloadTls13 {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.context.encode(bytes);
        self.extensions.encode(bytes);
    }

    fn read(r: &mut Reader<'a>) -> Result<Self, InvalidMessage> {
        Ok(Self {
            context: PayloadU8::read(r)?,
            extensions: Vec::read(r)?,
        })
    }
}

/// An extension attached to one entry in a Certificate message.  We
/// never solicit any, so everything is `Unknown`.
#[derive(Clone, Debug, PartialEq)]
pub struct CertificateExtension(UnknownExtension);

impl CertificateExtension {
    pub fn ext_type(&self) -> ExtensionType {
        self.0.typ
    }
}

impl<'a> Codec<'a> for CertificateExtension {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.0.typ.encode(bytes);
        let nested = &mut LengthPrefixedBuffer::new(ListLength::U16, bytes);
        self.0.encode(nested);
    }

    fn read(r: &mut Reader<'a>) -> Result<Self, InvalidMessage> {
        let typ = ExtensionType::read(r)?;
        let len = usize::from(u16::read(r)?);
        let mut sub = r.sub(len)?;
        Ok(Self(UnknownExtension::read(typ, &mut sub)))
    }
}

impl TlsListElement for CertificateExtension {
    const SIZE_LEN: ListLength = ListLength::U16;
}

#[derive(Clone, Debug, PartialEq)]
pub struct CertificateEntry {
    pub cert: CertificateDer<'static>,
    pub exts: Vec<CertificateExtension>,
}

impl CertificateEntry {
    pub fn new(cert: CertificateDer<'static>) -> Self {
        Self {
            cert,
            exts: Vec::new(),
        }
    }
}

impl<'a> Codec<'a> for CertificateEntry {
    fn encode(&self, bytes: &mut Vec<u8>) {
        PayloadU24::new(self.cert.as_ref().to_vec()).encode(bytes);
        self.exts.encode(bytes);
    }

    fn read(r: &mut Reader<'a>) -> Result<Self, InvalidMessage> {
        let body = PayloadU24::read(r)?;
        Ok(Self {
            cert: CertificateDer::from(body.0),
            exts: Vec::read(r)?,
        })
    }
}

impl TlsListElement for CertificateEntry {
    const SIZE_LEN: ListLength = ListLength::U24 { max: 0xff_ffff };
}

#[derive(Clone, Debug, PartialEq)]
pub struct CertificatePayloadTls13 {
    pub context: PayloadU8,
    pub entries: Vec<CertificateEntry>,
}

impl CertificatePayloadTls13 {
    pub fn into_certificate_chain(self) -> Vec<CertificateDer<'static>> {
        self.entries
            .into_iter()
            .map(|entry| entry.cert)
            .collect()
    }

    pub fn any_entry_has_duplicate_extension(&self) -> bool {
        self.entries.iter().any(|entry| {
            has_duplicates(
                entry
                    .exts
                    .iter()
                    .map(CertificateExtension::ext_type),
            )
        })
    }

    pub fn any_entry_has_extension(&self) -> bool {
        self.entries
            .iter()
            .any(|entry| !entry.exts.is_empty())
    }
}

impl<'a> Codec<'a> for CertificatePayloadTls13 {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.context.encode(bytes);
        self.entries.encode(bytes);
    }

    fn read(r: &mut Reader<'a>) -> Result<Self, InvalidMessage> {
        Ok(Self {
            context: PayloadU8::read(r)?,
            entries: Vec::read(r)?,
        })
    }
}

/// A signature scheme plus the signature bytes: the body of a
/// CertificateVerify.
#[derive(Clone, Debug, PartialEq)]
pub struct DigitallySignedStruct {
    pub scheme: SignatureScheme,
    sig: PayloadU16,
}

impl DigitallySignedStruct {
    pub fn new(scheme: SignatureScheme, sig: Vec<u8>) -> Self {
        Self {
            scheme,
            sig: PayloadU16::new(sig),
        }
    }

    pub fn signature(&self) -> &[u8] {
        &self.sig.0
    }
}

impl<'a> Codec<'a> for DigitallySignedStruct {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.scheme.encode(bytes);
        self.sig.encode(bytes);
    }

    fn read(r: &mut Reader<'a>) -> Result<Self, InvalidMessage> {
        Ok(Self {
            scheme: SignatureScheme::read(r)?,
            sig: PayloadU16::read(r)?,
        })
    }
}

/// An extension in a NewSessionTicket.
#[derive(Clone, Debug, PartialEq)]
pub enum NewSessionTicketExtension {
    EarlyData(u32),
    Unknown(UnknownExtension),
}

impl NewSessionTicketExtension {
    pub fn ext_type(&self) -> ExtensionType {
        match self {
            Self::EarlyData(_) => ExtensionType::EarlyData,
            Self::Unknown(r) => r.typ,
        }
    }
}

impl<'a> Codec<'a> for NewSessionTicketExtension {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.ext_type().encode(bytes);

        let nested = &mut LengthPrefixedBuffer::new(ListLength::U16, bytes);
        match self {
            Self::EarlyData(r) => r.encode(nested),
            Self::Unknown(r) => r.encode(nested),
        }
    }

    fn read(r: &mut Reader<'a>) -> Result<Self, InvalidMessage> {
        let typ = ExtensionType::read(r)?;
        let len = usize::from(u16::read(r)?);
        let mut sub = r.sub(len)?;

        let ext = match typ {
            ExtensionType::EarlyData => Self::EarlyData(u32::read(&mut sub)?),
            _ => Self::Unknown(UnknownExtension::read(typ, &mut sub)),
        };

        sub.expect_empty("NewSessionTicketExtension")?;
        Ok(ext)
    }
}

impl TlsListElement for NewSessionTicketExtension {
    const SIZE_LEN: ListLength = ListLength::U16;
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewSessionTicketPayloadTls13 {
    pub lifetime: u32,
    pub age_add: u32,
    pub nonce: PayloadU8,
    pub ticket: PayloadU16,
    pub exts: Vec<NewSessionTicketExtension>,
}

impl NewSessionTicketPayloadTls13 {
    pub fn max_early_data_size(&self) -> Option<u32> {
        self.exts.iter().find_map(|ext| match ext {
            NewSessionTicketExtension::EarlyData(sz) => Some(*sz),
            _ => None,
        })
    }

    pub fn has_duplicate_extension(&self) -> bool {
        has_duplicates(
            self.exts
                .iter()
                .map(NewSessionTicketExtension::ext_type),
        )
    }
}

impl<'a> Codec<'a> for NewSessionTicketPayloadTls13 {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.lifetime.encode(bytes);
        self.age_add.encode(bytes);
        self.nonce.encode(bytes);
        self.ticket.encode(bytes);
        self.exts.encode(bytes);
    }

    fn read(r: &mut Reader<'a>) -> Result<Self, InvalidMessage> {
        let ret = Self {
            lifetime: u32::read(r)?,
            age_add: u32::read(r)?,
            nonce: PayloadU8::read(r)?,
            ticket: PayloadU16::read(r)?,
            exts: Vec::read(r)?,
        };
        if ret.ticket.0.is_empty() {
            return Err(InvalidMessage::IllegalEmptyValue("ticket"));
        }
        Ok(ret)
    }
}

/// The interior of a handshake message.
#[derive(Clone, Debug, PartialEq)]
pub enum HandshakePayload {
    ClientHello(ClientHelloPayload),
    ServerHello(ServerHelloPayload),
    HelloRetryRequest(HelloRetryRequest),
    EncryptedExtensions(Vec<ServerExtension>),
    CertificateRequest(CertificateRequestPayloadTls13),
    Certificate(CertificatePayloadTls13),
    CertificateVerify(DigitallySignedStruct),
    EndOfEarlyData,
    Finished(Payload),
    NewSessionTicket(NewSessionTicketPayloadTls13),
    KeyUpdate(Payload),
}

impl HandshakePayload {
    fn encode(&self, bytes: &mut Vec<u8>) {
        match self {
            Self::ClientHello(x) => x.encode(bytes),
            Self::ServerHello(x) => x.encode(bytes),
            Self::HelloRetryRequest(x) => x.encode(bytes),
            Self::EncryptedExtensions(x) => x.encode(bytes),
            Self::CertificateRequest(x) => x.encode(bytes),
            Self::Certificate(x) => x.encode(bytes),
            Self::CertificateVerify(x) => x.encode(bytes),
            Self::EndOfEarlyData => {}
            Self::Finished(x) => x.encode(bytes),
            Self::NewSessionTicket(x) => x.encode(bytes),
            Self::KeyUpdate(x) => x.encode(bytes),
        }
    }
}

/// A complete handshake message: type, length and payload.
#[derive(Clone, Debug, PartialEq)]
pub struct HandshakeMessagePayload {
    pub typ: HandshakeType,
    pub payload: HandshakePayload,
}

impl HandshakeMessagePayload {
    /// The full message encoding truncated at the start of the PSK
    /// binders list.  This is the exact span of ClientHello bytes the
    /// binders authenticate (RFC 8446 §4.2.11.2).
    pub(crate) fn encoding_for_binder_signing(&self) -> Vec<u8> {
        let mut ret = self.get_encoding();

        let binders_len = match &self.payload {
            HandshakePayload::ClientHello(ch) => match ch.preshared_key_offer() {
                Some(offer) => offer.binders_encoding_len(),
                None => 0,
            },
            _ => 0,
        };

        let ret_len = ret.len() - binders_len;
        ret.truncate(ret_len);
        ret
    }
}

impl<'a> Codec<'a> for HandshakeMessagePayload {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.typ.encode(bytes);
        let nested = &mut LengthPrefixedBuffer::new(ListLength::U24 { max: 0xff_ffff }, bytes);
        self.payload.encode(nested);
    }

    fn read(r: &mut Reader<'a>) -> Result<Self, InvalidMessage> {
        let typ = HandshakeType::read(r)?;
        let len = usize::from(u24::read(r)?);
        let mut sub = r.sub(len)?;

        let payload = match typ {
            HandshakeType::ClientHello => {
                HandshakePayload::ClientHello(ClientHelloPayload::read(&mut sub)?)
            }
            HandshakeType::ServerHello => {
                let legacy_version = ProtocolVersion::read(&mut sub)?;
                let random = Random::read(&mut sub)?;
                if random == HELLO_RETRY_REQUEST_RANDOM {
                    HandshakePayload::HelloRetryRequest(HelloRetryRequest::read_after_random(
                        legacy_version,
                        &mut sub,
                    )?)
                } else {
                    HandshakePayload::ServerHello(ServerHelloPayload::read_after_random(
                        legacy_version,
                        random,
                        &mut sub,
                    )?)
                }
            }
            HandshakeType::EncryptedExtensions => {
                HandshakePayload::EncryptedExtensions(Vec::read(&mut sub)?)
            }
            HandshakeType::CertificateRequest => HandshakePayload::CertificateRequest(
                CertificateRequestPayloadTls13::read(&mut sub)?,
            ),
            HandshakeType::Certificate => {
                HandshakePayload::Certificate(CertificatePayloadTls13::read(&mut sub)?)
            }
            HandshakeType::CertificateVerify => {
                HandshakePayload::CertificateVerify(DigitallySignedStruct::read(&mut sub)?)
            }
            HandshakeType::EndOfEarlyData => HandshakePayload::EndOfEarlyData,
            HandshakeType::Finished => HandshakePayload::Finished(Payload::read(&mut sub)?),
            HandshakeType::NewSessionTicket => {
                HandshakePayload::NewSessionTicket(NewSessionTicketPayloadTls13::read(&mut sub)?)
            }
            HandshakeType::KeyUpdate => HandshakePayload::KeyUpdate(Payload::read(&mut sub)?),
            HandshakeType::Unknown(byte) => {
                return Err(InvalidMessage::UnknownHandshakeType(byte));
            }
            other => {
                return Err(InvalidMessage::UnknownHandshakeType(u8::from(other)));
            }
        };

        sub.expect_empty("HandshakeMessagePayload")?;
        Ok(Self { typ, payload })
    }
}

/// Extension codes a TLS 1.3 ServerHello may carry; anything else is
/// fatal.
pub(crate) static ALLOWED_IN_SERVER_HELLO: &[ExtensionType] = &[
    ExtensionType::SupportedVersions,
    ExtensionType::KeyShare,
    ExtensionType::PreSharedKey,
];

/// Extension codes a HelloRetryRequest may carry; anything else is
/// fatal.
pub(crate) static ALLOWED_IN_HELLO_RETRY: &[ExtensionType] = &[
    ExtensionType::SupportedVersions,
    ExtensionType::KeyShare,
    ExtensionType::Cookie,
];

/// Extension codes we act on in EncryptedExtensions; codes outside this
/// set that we offered are tolerated and ignored, codes we never
/// offered are fatal.
pub(crate) static ALLOWED_IN_ENCRYPTED_EXTENSIONS: &[ExtensionType] = &[
    ExtensionType::ServerName,
    ExtensionType::ALProtocolNegotiation,
    ExtensionType::EarlyData,
];

fn has_duplicates<I: IntoIterator<Item = ExtensionType>>(iter: I) -> bool {
    let mut seen = Vec::new();
    for typ in iter {
        if seen.contains(&typ) {
            return true;
        }
        seen.push(typ);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::HandshakeType;

    fn sample_hello() -> ClientHelloPayload {
        ClientHelloPayload {
            client_version: ProtocolVersion::TLSv1_2,
            random: Random([7; 32]),
            session_id: SessionId::empty(),
            cipher_suites: vec![CipherSuite::TLS13_AES_128_GCM_SHA256],
            compression_methods: vec![Compression::Null],
            extensions: vec![
                ClientExtension::SupportedVersions(vec![ProtocolVersion::TLSv1_3]),
                ClientExtension::NamedGroups(vec![NamedGroup::X25519]),
            ],
        }
    }

    #[test]
    fn supported_versions_encoding_tls13_only() {
        let ext = ClientExtension::SupportedVersions(vec![ProtocolVersion::TLSv1_3]);
        assert_eq!(ext.get_encoding(), &[0x00, 0x2b, 0x00, 0x03, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn supported_versions_encoding_with_tls12() {
        let ext = ClientExtension::SupportedVersions(vec![
            ProtocolVersion::TLSv1_3,
            ProtocolVersion::TLSv1_2,
        ]);
        assert_eq!(
            ext.get_encoding(),
            &[0x00, 0x2b, 0x00, 0x05, 0x04, 0x03, 0x04, 0x03, 0x03]
        );
    }

    #[test]
    fn client_hello_round_trip() {
        let hello = sample_hello();
        let encoding = hello.get_encoding();
        let parsed = ClientHelloPayload::read_bytes(&encoding).unwrap();
        assert_eq!(parsed, hello);
    }

    #[test]
    fn client_hello_detects_duplicates() {
        let mut hello = sample_hello();
        assert!(!hello.has_duplicate_extension());
        hello
            .extensions
            .push(ClientExtension::NamedGroups(vec![NamedGroup::secp256r1]));
        assert!(hello.has_duplicate_extension());
    }

    #[test]
    fn server_hello_with_magic_random_parses_as_hrr() {
        let hrr = HelloRetryRequest {
            legacy_version: ProtocolVersion::TLSv1_2,
            session_id: SessionId::empty(),
            cipher_suite: CipherSuite::TLS13_AES_128_GCM_SHA256,
            extensions: vec![
                HelloRetryExtension::SupportedVersions(ProtocolVersion::TLSv1_3),
                HelloRetryExtension::KeyShare(NamedGroup::secp256r1),
            ],
        };
        let msg = HandshakeMessagePayload {
            typ: HandshakeType::ServerHello,
            payload: HandshakePayload::HelloRetryRequest(hrr.clone()),
        };

        let parsed = HandshakeMessagePayload::read_bytes(&msg.get_encoding()).unwrap();
        assert_eq!(parsed.typ, HandshakeType::ServerHello);
        match parsed.payload {
            HandshakePayload::HelloRetryRequest(parsed_hrr) => {
                assert_eq!(parsed_hrr, hrr);
                assert_eq!(
                    parsed_hrr.requested_key_share_group(),
                    Some(NamedGroup::secp256r1)
                );
            }
            other => panic!("parsed as {:?}", other),
        }
    }

    #[test]
    fn downgrade_sentinel_is_detected() {
        let mut random = [1u8; 32];
        random[24..].copy_from_slice(b"DOWNGRD\x01");
        assert!(Random(random).has_downgrade_sentinel());
        random[31] = 0x00;
        assert!(Random(random).has_downgrade_sentinel());
        random[31] = 0x02;
        assert!(!Random(random).has_downgrade_sentinel());
    }

    #[test]
    fn binder_signing_truncation_stops_before_binders() {
        let mut hello = sample_hello();
        hello
            .extensions
            .push(ClientExtension::PresharedKey(PresharedKeyOffer {
                identities: vec![PresharedKeyIdentity::new(vec![0xaa; 5], 0)],
                binders: vec![PresharedKeyBinder::new(vec![0u8; 32])],
            }));
        let msg = HandshakeMessagePayload {
            typ: HandshakeType::ClientHello,
            payload: HandshakePayload::ClientHello(hello),
        };

        let full = msg.get_encoding();
        let truncated = msg.encoding_for_binder_signing();
        // binders list: 2 length bytes + (1 + 32) for the single binder
        assert_eq!(full.len() - truncated.len(), 2 + 33);
        assert_eq!(&full[..truncated.len()], &truncated[..]);
    }

    #[test]
    fn new_session_ticket_rejects_empty_ticket() {
        let nst = NewSessionTicketPayloadTls13 {
            lifetime: 7200,
            age_add: 1,
            nonce: PayloadU8::new(vec![0]),
            ticket: PayloadU16::new(vec![1, 2, 3]),
            exts: Vec::new(),
        };
        let mut encoding = nst.get_encoding();
        assert_eq!(
            NewSessionTicketPayloadTls13::read_bytes(&encoding).unwrap(),
            nst
        );

        // surgically empty the ticket: nonce is at offset 8 (1 len + 1
        // body), ticket length at offset 10
        encoding.truncate(10);
        encoding.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
        assert!(NewSessionTicketPayloadTls13::read_bytes(&encoding).is_err());
    }

    #[test]
    fn key_share_entry_rejects_empty_share() {
        let encoding = KeyShareEntry::new(NamedGroup::X25519, vec![0xab; 4]).get_encoding();
        assert!(KeyShareEntry::read_bytes(&encoding).is_ok());
        assert!(KeyShareEntry::read_bytes(&[0x00, 0x1d, 0x00, 0x00]).is_err());
    }
}
