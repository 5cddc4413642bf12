use core::fmt::Debug;

/// This trait represents the ability to do something useful with key
/// material, such as logging it to a file for debugging.
///
/// Naturally, secrets passed over this interface are extremely
/// sensitive and can break the security of past, present and future
/// sessions.  You'll likely want some interlock to prevent its use in
/// production code.
pub trait KeyLog: Send + Sync + Debug {
    /// Log the given `secret`.  `label` describes precisely what it
    /// means (using the NSS key log format labels) and `client_random`
    /// identifies the session.
    fn log(&self, label: &str, client_random: &[u8], secret: &[u8]);

    /// Indicates whether the secret with the given label will be
    /// logged, letting callers skip derivation work when it won't be.
    fn will_log(&self, _label: &str) -> bool {
        true
    }
}

/// A `KeyLog` that does exactly nothing.
#[derive(Debug)]
pub struct NoKeyLog;

impl KeyLog for NoKeyLog {
    fn log(&self, _: &str, _: &[u8], _: &[u8]) {}

    #[inline]
    fn will_log(&self, _label: &str) -> bool {
        false
    }
}
