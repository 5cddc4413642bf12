//! The resumable session produced by a NewSessionTicket.  Storage
//! format and persistence are the caller's business; this is the
//! in-memory value they snapshot.

use alloc::vec::Vec;

use pki_types::UnixTime;
use zeroize::Zeroizing;

use crate::tls13::Tls13CipherSuite;

/// Usage flags on a stored ticket, seeded from the PSK key-exchange
/// modes that were enabled when the ticket arrived.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TicketFlags(u8);

impl TicketFlags {
    /// The ticket may be offered for PSK-only resumption.
    pub const ALLOW_PSK_RESUMPTION: Self = Self(0x01);

    /// The ticket may be offered for PSK-with-ECDHE resumption.
    pub const ALLOW_PSK_EPHEMERAL_RESUMPTION: Self = Self(0x02);

    /// The server advertised early data for this ticket.
    pub const ALLOW_EARLY_DATA: Self = Self(0x04);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

/// A TLS 1.3 session usable for resumption.
#[derive(Clone, Debug)]
pub struct Tls13ClientSessionValue {
    suite: &'static Tls13CipherSuite,
    ticket: Vec<u8>,
    secret: Zeroizing<Vec<u8>>,
    lifetime: u32,
    age_add: u32,
    received_at: Option<UnixTime>,
    flags: TicketFlags,
    max_early_data_size: u32,
}

impl Tls13ClientSessionValue {
    pub fn new(
        suite: &'static Tls13CipherSuite,
        ticket: Vec<u8>,
        secret: Vec<u8>,
        lifetime: u32,
        age_add: u32,
        received_at: Option<UnixTime>,
        flags: TicketFlags,
        max_early_data_size: u32,
    ) -> Self {
        Self {
            suite,
            ticket,
            secret: Zeroizing::new(secret),
            lifetime,
            age_add,
            received_at,
            flags,
            max_early_data_size,
        }
    }

    pub fn suite(&self) -> &'static Tls13CipherSuite {
        self.suite
    }

    pub fn ticket(&self) -> &[u8] {
        &self.ticket
    }

    /// The resumption key derived from this ticket's nonce.
    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    pub fn lifetime(&self) -> u32 {
        self.lifetime
    }

    pub fn age_add(&self) -> u32 {
        self.age_add
    }

    pub fn flags(&self) -> TicketFlags {
        self.flags
    }

    pub fn max_early_data_size(&self) -> u32 {
        self.max_early_data_size
    }

    /// The obfuscated ticket age to put on the wire.
    ///
    /// One second is subtracted from the real age to compensate for
    /// sub-second rounding, so a server with millisecond clocks does
    /// not reject a ticket reused immediately after issue.  Without a
    /// clock at either end the age is simply zero.
    pub fn obfuscated_ticket_age(&self, now: Option<UnixTime>) -> u32 {
        let age_secs = match (now, self.received_at) {
            (Some(now), Some(received)) => now.as_secs().saturating_sub(received.as_secs()),
            _ => return 0,
        };

        let age_ms = age_secs.saturating_sub(1).wrapping_mul(1000);
        (age_ms as u32).wrapping_add(self.age_add)
    }

    /// Whether the ticket's lifetime has elapsed.  Tickets never expire
    /// when no clock is available.
    pub fn has_expired(&self, now: Option<UnixTime>) -> bool {
        let age_secs = match (now, self.received_at) {
            (Some(now), Some(received)) => now.as_secs().saturating_sub(received.as_secs()),
            _ => return false,
        };
        self.lifetime != 0 && age_secs >= u64::from(self.lifetime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_provider::TLS13_AES_128_GCM_SHA256;
    use core::time::Duration;

    fn session(received_at: Option<UnixTime>, age_add: u32) -> Tls13ClientSessionValue {
        Tls13ClientSessionValue::new(
            &TLS13_AES_128_GCM_SHA256,
            alloc::vec![1, 2, 3],
            alloc::vec![9; 32],
            7200,
            age_add,
            received_at,
            TicketFlags::default(),
            0,
        )
    }

    fn at(secs: u64) -> UnixTime {
        UnixTime::since_unix_epoch(Duration::from_secs(secs))
    }

    #[test]
    fn obfuscated_age_subtracts_one_second_and_adds_age_add() {
        let value = session(Some(at(1000)), 0x11223344);
        assert_eq!(value.obfuscated_ticket_age(Some(at(1005))), 0x1122_5e64);
    }

    #[test]
    fn obfuscated_age_floors_at_zero() {
        let value = session(Some(at(1000)), 7);
        // age below one second rounds down to zero before obfuscation
        assert_eq!(value.obfuscated_ticket_age(Some(at(1000))), 7);
    }

    #[test]
    fn missing_clock_means_age_zero_and_no_expiry() {
        let value = session(None, 42);
        assert_eq!(value.obfuscated_ticket_age(None), 0);
        assert!(!value.has_expired(Some(at(999_999_999))));
    }

    #[test]
    fn expiry_respects_lifetime() {
        let value = session(Some(at(1000)), 0);
        assert!(!value.has_expired(Some(at(1000 + 7199))));
        assert!(value.has_expired(Some(at(1000 + 7200))));
    }

    #[test]
    fn flag_operations() {
        let mut flags = TicketFlags::ALLOW_PSK_RESUMPTION;
        flags.insert(TicketFlags::ALLOW_EARLY_DATA);
        assert!(flags.contains(TicketFlags::ALLOW_EARLY_DATA));
        assert!(!flags.contains(TicketFlags::ALLOW_PSK_EPHEMERAL_RESUMPTION));
        assert!(flags.intersects(TicketFlags::ALLOW_PSK_RESUMPTION));
    }
}
