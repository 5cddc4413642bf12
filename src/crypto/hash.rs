//! The hashing seam: transcript hashing and HKDF both run over these
//! traits.

use alloc::boxed::Box;
use core::fmt::Debug;

/// Identifies a hash function.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HashAlgorithm {
    SHA256,
    SHA384,
}

impl HashAlgorithm {
    /// The length of this hash's output, in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            Self::SHA256 => 32,
            Self::SHA384 => 48,
        }
    }
}

/// A hash function implementation.
pub trait Hash: Send + Sync + Debug {
    /// Which hash function this is.
    fn algorithm(&self) -> HashAlgorithm;

    /// The length of the output, in bytes.
    fn output_len(&self) -> usize {
        self.algorithm().output_len()
    }

    /// Begin an incremental hashing operation.
    fn start(&self) -> Box<dyn Context>;

    /// Hash `data` in one shot.
    fn hash(&self, data: &[u8]) -> Output;
}

/// An incremental hashing context.
pub trait Context: Send + Sync {
    /// Add `data` to the computation so far.
    fn update(&mut self, data: &[u8]);

    /// Generate the hash of everything fed so far, without ending the
    /// computation.
    fn fork_finish(&self) -> Output;

    /// Clone the computation so far.
    fn fork(&self) -> Box<dyn Context>;

    /// Terminate and output the hash.
    fn finish(self: Box<Self>) -> Output;
}

/// A hash output, stored inline.
#[derive(Clone, Copy)]
pub struct Output {
    buf: [u8; Self::MAX_LEN],
    used: usize,
}

impl Output {
    pub const MAX_LEN: usize = 64;

    pub fn new(bytes: &[u8]) -> Self {
        debug_assert!(bytes.len() <= Self::MAX_LEN);
        let mut output = Self {
            buf: [0u8; Self::MAX_LEN],
            used: bytes.len(),
        };
        output.buf[..bytes.len()].copy_from_slice(bytes);
        output
    }
}

impl AsRef<[u8]> for Output {
    fn as_ref(&self) -> &[u8] {
        &self.buf[..self.used]
    }
}

impl Debug for Output {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for b in self.as_ref() {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}
