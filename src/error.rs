//! Error types for sealing and opening containers.
//!
//! Each failure category has its own enum so callers can match on the
//! condition they care about. [`Error`] collects them for the engine.

use thiserror::Error;

/// Result type alias for passcrypt operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Key derivation failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KdfError {
    /// The cost, block size or parallelism is outside the legal range.
    #[error("invalid key derivation parameters: {0}")]
    InvalidParams(String),

    /// The host could not provide the memory the parameters demand.
    #[error("not enough memory for key derivation ({required_bytes} bytes required)")]
    ResourceExhausted { required_bytes: usize },
}

/// Structural container failures, detected before any cryptography runs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("container too short: {len} bytes, need at least {min}")]
    TooShort { len: usize, min: usize },

    #[error("not a passcrypt container")]
    BadMagic,

    /// The file may come from a newer release rather than being damaged.
    #[error("unsupported container version: {0}")]
    UnsupportedVersion(u8),

    /// A header records scrypt parameters outside their legal ranges.
    #[error("container records invalid key derivation parameters")]
    InvalidKdfParams,
}

/// Tag verification failure.
///
/// Deliberately carries no detail: a wrong passphrase, a corrupted file and
/// a tampered file are indistinguishable to the caller.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("authentication failed")]
    AuthenticationFailed,
}

/// The random source could not produce bytes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("random source unavailable: {0}")]
pub struct RandomError(pub String);

/// Umbrella error for engine and file operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Kdf(#[from] KdfError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Random(#[from] RandomError),

    /// The plaintext exceeds what the cipher can process under one nonce.
    #[error("encryption failed: plaintext too large")]
    Encrypt,

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}
