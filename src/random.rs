//! Source of salts and nonces.

use getrandom::fill;

use crate::error::RandomError;

/// Capability to fill buffers with unpredictable bytes.
///
/// The engine receives this instead of reaching for a global RNG, so tests
/// can supply deterministic bytes. Implementations must be safe to share
/// between threads.
pub trait RandomSource: Send + Sync {
    fn fill(&self, buf: &mut [u8]) -> Result<(), RandomError>;
}

/// The operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill(&self, buf: &mut [u8]) -> Result<(), RandomError> {
        fill(buf).map_err(|e| RandomError(format!("OS random generator unavailable: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_random_fills_distinct_buffers() {
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        OsRandom.fill(&mut a).unwrap();
        OsRandom.fill(&mut b).unwrap();

        assert_ne!(a, b);
    }

    #[test]
    fn empty_buffer_is_fine() {
        OsRandom.fill(&mut []).unwrap();
    }
}
