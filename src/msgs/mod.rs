//! Wire-level structures for the handshake protocol.

#[macro_use]
mod macros;

pub mod base;
pub mod codec;
pub mod enums;
pub mod handshake;
