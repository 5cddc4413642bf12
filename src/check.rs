use crate::enums::HandshakeType;
use crate::error::Error;
use crate::msgs::handshake::HandshakeMessagePayload;

/// Reject a message that arrived in a state that cannot accept it.
pub(crate) fn inappropriate_handshake_message(
    m: &HandshakeMessagePayload,
    expect_types: &[HandshakeType],
) -> Error {
    Error::InappropriateHandshakeMessage {
        expect_types: expect_types.to_vec(),
        got_type: m.typ,
    }
}

/// Extract a handshake payload of the given variant, or fail with
/// `unexpected_message`.
macro_rules! require_handshake_msg {
    ($m:expr, $handshake_type:path, $payload_type:path) => {
        match &$m.payload {
            $payload_type(x) => Ok(x),
            _ => Err($crate::check::inappropriate_handshake_message(
                &$m,
                &[$handshake_type],
            )),
        }
    };
}

pub(crate) use require_handshake_msg;
