use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::enums::{AlertDescription, HandshakeType};

/// The top-level error type for this crate.
///
/// Any of these is fatal to the handshake that produced it: the engine
/// queues the matching alert on the record layer and refuses further
/// progress.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A handshake message arrived that is not acceptable in the
    /// current state.
    InappropriateHandshakeMessage {
        /// What the state machine could have processed.
        expect_types: Vec<HandshakeType>,
        /// What arrived instead.
        got_type: HandshakeType,
    },

    /// The peer sent something that could not be decoded.
    InvalidMessage(InvalidMessage),

    /// The peer sent a well-encoded message containing a value the
    /// protocol forbids at this point.
    PeerMisbehaved(PeerMisbehaved),

    /// The peer and this client have no usable parameters in common.
    PeerIncompatible(PeerIncompatible),

    /// The server's certificate chain was rejected.
    InvalidCertificate(CertificateError),

    /// The server's Finished message did not verify.
    DecryptError,

    /// The random source failed.
    FailedToGetRandomBytes,

    /// An API was used before the handshake finished.
    HandshakeNotComplete,

    /// Any other unclassified error.
    General(String),
}

impl Error {
    /// The alert that accompanies this error on the wire.
    pub(crate) fn alert_description(&self) -> AlertDescription {
        match self {
            Self::InappropriateHandshakeMessage { .. } => AlertDescription::UnexpectedMessage,
            Self::InvalidMessage(_) => AlertDescription::DecodeError,
            Self::PeerMisbehaved(reason) => reason.alert_description(),
            Self::PeerIncompatible(reason) => reason.alert_description(),
            Self::InvalidCertificate(e) => e.alert_description(),
            Self::DecryptError => AlertDescription::DecryptError,
            _ => AlertDescription::InternalError,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InappropriateHandshakeMessage {
                expect_types,
                got_type,
            } => write!(
                f,
                "received unexpected handshake message: got {:?} when expecting {:?}",
                got_type, expect_types
            ),
            Self::InvalidMessage(e) => write!(f, "invalid peer message: {:?}", e),
            Self::PeerMisbehaved(e) => write!(f, "peer misbehaved: {:?}", e),
            Self::PeerIncompatible(e) => write!(f, "peer incompatible: {:?}", e),
            Self::InvalidCertificate(e) => write!(f, "invalid peer certificate: {:?}", e),
            Self::DecryptError => write!(f, "cannot verify peer message"),
            Self::FailedToGetRandomBytes => write!(f, "cannot get random bytes"),
            Self::HandshakeNotComplete => write!(f, "handshake not complete"),
            Self::General(msg) => write!(f, "unexpected error: {}", msg),
        }
    }
}

impl core::error::Error for Error {}

/// A corrupt TLS message payload that resulted in an error.
///
/// Every variant names the field or structure the decoder was working on
/// when it gave up. All of these surface as a `decode_error` alert.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InvalidMessage {
    /// A field was shorter than its encoding requires.
    MissingData(&'static str),
    /// A message or field carried bytes after its declared end.
    TrailingData(&'static str),
    /// An outer length disagreed with the content it framed.
    InvalidDeclaredLength(&'static str),
    /// A list that must not be empty was empty.
    IllegalEmptyList(&'static str),
    /// A value that must not be empty was empty.
    IllegalEmptyValue(&'static str),
    /// A message type we do not know how to parse.
    UnknownHandshakeType(u8),
    /// An extension the message type requires was absent.
    MissingExtension(&'static str),
    /// The message was structurally valid but unexpected here.
    UnexpectedMessage(&'static str),
}

impl From<InvalidMessage> for Error {
    fn from(e: InvalidMessage) -> Self {
        Self::InvalidMessage(e)
    }
}

/// The peer sent a valid encoding of an illegal value.
///
/// The variant records which protocol rule was broken; the alert is
/// `illegal_parameter` unless the rule concerns extension solicitation,
/// in which case it is `unsupported_extension`.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PeerMisbehaved {
    AttemptedDowngradeToTls12WhenTls13IsSupported,
    DisallowedExtension,
    DuplicateExtension,
    EarlyDataExtensionWithoutResumption,
    IllegalHelloRetryRequestWithEmptyCookie,
    IllegalHelloRetryRequestWithNoChanges,
    IllegalHelloRetryRequestWithOfferedGroup,
    IllegalHelloRetryRequestWithUnofferedGroup,
    IllegalHelloRetryRequestWithWrongVersion,
    OfferedIncompatibleCipherSuiteForPsk,
    SelectedDifferentCipherSuiteAfterRetry,
    SelectedInvalidPsk,
    SelectedTls12UsingTls13VersionExtension,
    SelectedUnofferedApplicationProtocol,
    SelectedUnofferedCompression,
    SelectedUnofferedVersion,
    ServerEchoedIncompatibleSessionId,
    TooManyApplicationProtocols,
    UnsolicitedExtension,
    WrongGroupForKeyShare,
}

impl PeerMisbehaved {
    fn alert_description(&self) -> AlertDescription {
        match self {
            Self::DisallowedExtension | Self::UnsolicitedExtension => {
                AlertDescription::UnsupportedExtension
            }
            _ => AlertDescription::IllegalParameter,
        }
    }
}

impl From<PeerMisbehaved> for Error {
    fn from(e: PeerMisbehaved) -> Self {
        Self::PeerMisbehaved(e)
    }
}

/// The peer and this client cannot agree on parameters.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PeerIncompatible {
    NoKeyExchangeModeInCommon,
    NoSignatureSchemesInCommon,
    SelectedUnofferedCipherSuite,
    SelectedUnofferedKxGroup,
    ServerSentHelloRetryRequestWithUnknownExtension,
    ServerDoesNotSupportTls13,
    ServerSentWrongLegacyVersion,
    ServerOmittedKeyShareAndPreSharedKey,
}

impl PeerIncompatible {
    fn alert_description(&self) -> AlertDescription {
        match self {
            Self::ServerDoesNotSupportTls13 | Self::ServerSentWrongLegacyVersion => {
                AlertDescription::ProtocolVersion
            }
            Self::ServerSentHelloRetryRequestWithUnknownExtension => {
                AlertDescription::UnsupportedExtension
            }
            _ => AlertDescription::HandshakeFailure,
        }
    }
}

impl From<PeerIncompatible> for Error {
    fn from(e: PeerIncompatible) -> Self {
        Self::PeerIncompatible(e)
    }
}

/// The ways a certificate can fail validation.
///
/// The actual validation happens behind [`ServerCertVerifier`]; these
/// variants exist so a verifier can signal the precise failure and get
/// the right alert on the wire.
///
/// [`ServerCertVerifier`]: crate::verify::ServerCertVerifier
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CertificateError {
    BadEncoding,
    Expired,
    NotValidYet,
    UnknownIssuer,
    BadSignature,
    NotValidForName,
    ApplicationVerificationFailure,
}

impl CertificateError {
    fn alert_description(&self) -> AlertDescription {
        match self {
            Self::BadEncoding => AlertDescription::DecodeError,
            Self::Expired | Self::NotValidYet => AlertDescription::CertificateExpired,
            Self::UnknownIssuer => AlertDescription::UnknownCa,
            _ => AlertDescription::BadCertificate,
        }
    }
}

impl From<CertificateError> for Error {
    fn from(e: CertificateError) -> Self {
        Self::InvalidCertificate(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_mapping_follows_rfc8446() {
        assert_eq!(
            Error::from(InvalidMessage::TrailingData("ClientHello")).alert_description(),
            AlertDescription::DecodeError
        );
        assert_eq!(
            Error::from(PeerMisbehaved::ServerEchoedIncompatibleSessionId).alert_description(),
            AlertDescription::IllegalParameter
        );
        assert_eq!(
            Error::from(PeerMisbehaved::UnsolicitedExtension).alert_description(),
            AlertDescription::UnsupportedExtension
        );
        assert_eq!(
            Error::from(PeerIncompatible::SelectedUnofferedCipherSuite).alert_description(),
            AlertDescription::HandshakeFailure
        );
        assert_eq!(
            Error::from(PeerIncompatible::ServerSentWrongLegacyVersion).alert_description(),
            AlertDescription::ProtocolVersion
        );
        assert_eq!(
            Error::General(String::from("no")).alert_description(),
            AlertDescription::InternalError
        );
    }

    #[test]
    fn display_is_stable() {
        let err = Error::InappropriateHandshakeMessage {
            expect_types: alloc::vec![HandshakeType::ServerHello],
            got_type: HandshakeType::ClientHello,
        };
        assert_eq!(
            alloc::format!("{}", err),
            "received unexpected handshake message: got ClientHello when expecting [ServerHello]"
        );
    }
}
