//! State shared across the whole connection, below the level of any
//! particular handshake state.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::enums::{AlertDescription, ProtocolVersion};
use crate::error::Error;
use crate::msgs::codec::Codec;
use crate::msgs::handshake::HandshakeMessagePayload;
use crate::record::RecordLayer;
use crate::tls13::Tls13CipherSuite;

/// The client and server randoms, kept for key logging and downgrade
/// checks.
#[derive(Clone, Copy)]
pub(crate) struct ConnectionRandoms {
    pub(crate) client: [u8; 32],
    pub(crate) server: [u8; 32],
}

impl ConnectionRandoms {
    pub(crate) fn new(client: [u8; 32], server: [u8; 32]) -> Self {
        Self { client, server }
    }
}

pub(crate) struct CommonState {
    pub(crate) record_layer: Box<dyn RecordLayer>,
    pub(crate) negotiated_version: Option<ProtocolVersion>,
    pub(crate) suite: Option<&'static Tls13CipherSuite>,
    pub(crate) alpn_protocol: Option<Vec<u8>>,
    /// Outbound early-data protection is active; the handshake
    /// encrypter installation is deferred until EndOfEarlyData.
    pub(crate) early_traffic: bool,
    enable_middlebox_compat: bool,
    sent_fake_ccs: bool,
    sent_fatal_alert: bool,
}

impl CommonState {
    pub(crate) fn new(record_layer: Box<dyn RecordLayer>, enable_middlebox_compat: bool) -> Self {
        Self {
            record_layer,
            negotiated_version: None,
            suite: None,
            alpn_protocol: None,
            early_traffic: false,
            enable_middlebox_compat,
            sent_fake_ccs: false,
            sent_fatal_alert: false,
        }
    }

    /// Encode and send one handshake message.  Transcript maintenance
    /// is the caller's job; ordering relative to transform installation
    /// matters and is owned by the states.
    pub(crate) fn send_handshake_message(&mut self, m: &HandshakeMessagePayload) {
        self.record_layer
            .send_handshake_message(&m.get_encoding());
    }

    /// Emit the single dummy ChangeCipherSpec middlebox-compatibility
    /// mode calls for.  A no-op when the mode is off or the record was
    /// already sent.
    pub(crate) fn send_fake_ccs(&mut self) {
        if !self.enable_middlebox_compat {
            return;
        }

        if core::mem::replace(&mut self.sent_fake_ccs, true) {
            return;
        }

        self.record_layer.send_change_cipher_spec();
    }

    /// Queue `desc` as this connection's fatal alert (first caller
    /// wins) and convert `err` for returning.
    pub(crate) fn send_fatal_alert(
        &mut self,
        desc: AlertDescription,
        err: impl Into<Error>,
    ) -> Error {
        if !core::mem::replace(&mut self.sent_fatal_alert, true) {
            self.record_layer.queue_fatal_alert(desc);
        }
        err.into()
    }

    pub(crate) fn has_sent_fatal_alert(&self) -> bool {
        self.sent_fatal_alert
    }
}
