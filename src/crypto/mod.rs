//! Cryptographic primitives for the container.
//!
//! Provides scrypt key derivation and ChaCha20-Poly1305 sealing.

pub mod aead;
pub mod kdf;

pub use kdf::{DerivedKey, KdfParams, derive_key};

/// Length of the salt (16 bytes).
pub const SALT_LEN: usize = 16;
/// Length of the nonce (12 bytes for IETF ChaCha20-Poly1305).
pub const NONCE_LEN: usize = 12;
/// Length of the encryption key (32 bytes / 256 bits).
pub const KEY_LEN: usize = 32;
/// Length of the Poly1305 authentication tag (16 bytes).
pub const TAG_LEN: usize = 16;
