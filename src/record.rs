//! The seam between the handshake engine and the record layer.
//!
//! Record framing, fragmentation and reassembly, encryption and
//! decryption, and the serialization of queued alerts all live on the
//! other side of this trait.  The engine hands it complete handshake
//! messages and transform objects; it hands back complete, decrypted
//! handshake messages.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::crypto::cipher::{MessageDecrypter, MessageEncrypter};
use crate::enums::AlertDescription;
use crate::error::Error;

/// A connection's record layer, owned by the caller.
///
/// Implementations are responsible for dropping inbound
/// ChangeCipherSpec records during the handshake (RFC 8446 §5) and for
/// delivering handshake messages whole, across record boundaries.
pub trait RecordLayer: Send {
    /// The next complete, decrypted handshake message (header
    /// included), or `None` if more input is needed from the transport.
    fn fetch_handshake_message(&mut self) -> Result<Option<Vec<u8>>, Error>;

    /// Frame and send one encoded handshake message under the current
    /// outbound transform (or in the clear if none is installed).
    fn send_handshake_message(&mut self, encoded: &[u8]);

    /// Emit a ChangeCipherSpec record for middlebox compatibility.
    fn send_change_cipher_spec(&mut self);

    /// Switch inbound record protection, effective from the next
    /// record.
    fn set_message_decrypter(&mut self, decrypter: Box<dyn MessageDecrypter>);

    /// Switch outbound record protection, effective from the next
    /// record sent.
    fn set_message_encrypter(&mut self, encrypter: Box<dyn MessageEncrypter>);

    /// Queue a fatal alert for transmission on the next write.
    fn queue_fatal_alert(&mut self, alert: AlertDescription);
}
