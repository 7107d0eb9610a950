//! Container format handling.
//!
//! Provides version-aware parsing and serialization of sealed containers.
//! The codec checks structure only; authenticity is the cipher's job.

use crate::crypto::{KdfParams, NONCE_LEN, SALT_LEN};
use crate::error::FormatError;

pub mod v1;
pub mod v2;

/// Magic bytes identifying a passcrypt container ("PCRY").
pub const MAGIC: &[u8; 4] = b"PCRY";
/// Length of magic bytes.
pub const MAGIC_LEN: usize = 4;
/// Length of version field.
pub const VER_LEN: usize = 1;
/// Smallest valid container of any known version.
pub const MIN_CONTAINER_LEN: usize = v1::MIN_LEN;

/// Container format versions this build understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum FormatVersion {
    /// scrypt with the default parameters + ChaCha20-Poly1305, no associated data.
    V1,
    /// As V1, with the scrypt parameters recorded in the header.
    V2,
}

impl FormatVersion {
    /// The version [`encode`] writes for `kdf`: v1 for the default
    /// parameters, v2 otherwise.
    pub fn for_kdf(kdf: &KdfParams) -> Self {
        if *kdf == KdfParams::default() {
            FormatVersion::V1
        } else {
            FormatVersion::V2
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            FormatVersion::V1 => v1::VERSION_V1,
            FormatVersion::V2 => v2::VERSION_V2,
        }
    }
}

impl TryFrom<u8> for FormatVersion {
    type Error = FormatError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            v1::VERSION_V1 => Ok(FormatVersion::V1),
            v2::VERSION_V2 => Ok(FormatVersion::V2),
            other => Err(FormatError::UnsupportedVersion(other)),
        }
    }
}

/// A parsed container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    version: FormatVersion,
    kdf: KdfParams,
    salt: [u8; SALT_LEN],
    nonce: [u8; NONCE_LEN],
    ciphertext: Vec<u8>,
}

impl Container {
    pub fn version(&self) -> FormatVersion {
        self.version
    }

    /// Parameters the container was sealed with.
    pub fn kdf_params(&self) -> KdfParams {
        self.kdf
    }

    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        &self.nonce
    }

    /// Ciphertext with the authentication tag appended.
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }
}

/// Serializes container fields in the version chosen by
/// [`FormatVersion::for_kdf`].
pub fn encode(
    kdf: &KdfParams,
    salt: &[u8; SALT_LEN],
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
) -> Vec<u8> {
    match FormatVersion::for_kdf(kdf) {
        FormatVersion::V1 => v1::serialize(salt, nonce, ciphertext),
        FormatVersion::V2 => v2::serialize(kdf, salt, nonce, ciphertext),
    }
}

/// Parses a container, dispatching on its version byte.
///
/// # Errors
///
/// Returns an error if:
/// - The data is shorter than the smallest valid container
/// - The magic bytes are invalid
/// - The version is unsupported
/// - A v2 header records illegal KDF parameters
pub fn decode(data: &[u8]) -> Result<Container, FormatError> {
    if data.len() < MIN_CONTAINER_LEN {
        return Err(FormatError::TooShort {
            len: data.len(),
            min: MIN_CONTAINER_LEN,
        });
    }

    if &data[..MAGIC_LEN] != MAGIC {
        return Err(FormatError::BadMagic);
    }

    match FormatVersion::try_from(data[MAGIC_LEN])? {
        FormatVersion::V1 => v1::parse(data),
        FormatVersion::V2 => v2::parse(data),
    }
}
