//! The wall-clock seam, used only for ticket ages.

use core::fmt::Debug;

use pki_types::UnixTime;

/// A source of wall-clock time.  Optional: without one, ticket ages go
/// on the wire as zero and tickets never locally expire.
pub trait TimeProvider: Send + Sync + Debug {
    /// The current wall time, or `None` if unavailable right now.
    fn current_time(&self) -> Option<UnixTime>;
}

/// A `TimeProvider` reading the system clock.
#[cfg(feature = "std")]
#[derive(Debug)]
pub struct DefaultTimeProvider;

#[cfg(feature = "std")]
impl TimeProvider for DefaultTimeProvider {
    fn current_time(&self) -> Option<UnixTime> {
        std::time::SystemTime::now()
            .duration_since(std::time::SystemTime::UNIX_EPOCH)
            .ok()
            .map(UnixTime::since_unix_epoch)
    }
}
