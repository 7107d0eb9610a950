//! Owned secret bytes that are zeroed when released or dropped.

use std::fmt;

use subtle::ConstantTimeEq;
use zeroize::{Zeroize, Zeroizing};

/// Owns secret byte material such as a passphrase or a derived key.
///
/// The bytes are overwritten with zeros by [`SecretBuffer::release`], which
/// also runs on drop. Release is idempotent; after it the buffer is empty.
pub struct SecretBuffer {
    bytes: Vec<u8>,
    released: bool,
}

impl SecretBuffer {
    /// Takes ownership of `bytes` without copying them.
    ///
    /// The caller must not keep other copies of the material around.
    pub fn acquire(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            released: false,
        }
    }

    /// Allocates `len` zero bytes to be filled in place.
    pub(crate) fn zeroed(len: usize) -> Self {
        Self::acquire(vec![0u8; len])
    }

    /// Borrows the secret bytes. Empty once released.
    pub fn expose(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn expose_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Compares two secrets without early exit on the first differing byte.
    pub fn ct_eq(&self, other: &SecretBuffer) -> bool {
        self.bytes.as_slice().ct_eq(other.bytes.as_slice()).into()
    }

    /// Overwrites every byte with zero, including spare capacity.
    pub fn release(&mut self) {
        if self.released {
            return;
        }

        self.bytes.as_mut_slice().zeroize();
        #[cfg(test)]
        audit::record(&self.bytes);

        // clears the length and wipes the spare capacity as well
        self.bytes.zeroize();
        self.released = true;
    }
}

impl Drop for SecretBuffer {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for SecretBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretBuffer")
            .field("len", &self.bytes.len())
            .field("released", &self.released)
            .finish()
    }
}

impl From<Vec<u8>> for SecretBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self::acquire(bytes)
    }
}

impl From<String> for SecretBuffer {
    fn from(s: String) -> Self {
        Self::acquire(s.into_bytes())
    }
}

impl From<Zeroizing<String>> for SecretBuffer {
    fn from(mut s: Zeroizing<String>) -> Self {
        // moves the allocation out, leaving an empty string behind
        Self::from(std::mem::take(&mut *s))
    }
}
