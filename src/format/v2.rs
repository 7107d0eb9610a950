//! Container format v2.
//!
//! Same as v1 with the scrypt parameters recorded after the version byte,
//! so containers sealed with non-default costs open without extra input.
//!
//! V2 Container Format:
//! ```text
//! MAGIC (4) | VERSION (1) | LOG_N (1) | R (4) | P (4) | SALT (16) | NONCE (12) | CIPHERTEXT || TAG (N + 16)
//! ```
//!
//! R and P are little-endian `u32`.

use super::{Container, FormatVersion, MAGIC, MAGIC_LEN, VER_LEN};
use crate::crypto::{KdfParams, NONCE_LEN, SALT_LEN, TAG_LEN};
use crate::error::FormatError;

/// Version byte of this format.
pub const VERSION_V2: u8 = 2;

const LOG_N_LEN: usize = 1;
const R_LEN: usize = 4;
const P_LEN: usize = 4;

/// Bytes before the ciphertext.
pub const HEADER_LEN: usize =
    MAGIC_LEN + VER_LEN + LOG_N_LEN + R_LEN + P_LEN + SALT_LEN + NONCE_LEN;

/// A zero-length plaintext still carries a full tag.
pub const MIN_LEN: usize = HEADER_LEN + TAG_LEN;

/// Parses a v2 container whose magic and version were already checked.
///
/// # Errors
///
/// Returns an error if the data is too short to hold a header and tag, or
/// if the recorded parameters are outside scrypt's legal ranges.
pub fn parse(data: &[u8]) -> Result<Container, FormatError> {
    if data.len() < MIN_LEN {
        return Err(FormatError::TooShort {
            len: data.len(),
            min: MIN_LEN,
        });
    }

    let mut offset = MAGIC_LEN + VER_LEN;

    let log_n = data[offset];
    offset += LOG_N_LEN;

    let r = u32::from_le_bytes(
        data[offset..offset + R_LEN]
            .try_into()
            .map_err(|_| FormatError::InvalidKdfParams)?,
    );
    offset += R_LEN;

    let p = u32::from_le_bytes(
        data[offset..offset + P_LEN]
            .try_into()
            .map_err(|_| FormatError::InvalidKdfParams)?,
    );
    offset += P_LEN;

    let kdf = KdfParams::from_log_n(log_n, r, p).map_err(|_| FormatError::InvalidKdfParams)?;

    let mut salt = [0u8; SALT_LEN];
    salt.copy_from_slice(&data[offset..offset + SALT_LEN]);
    offset += SALT_LEN;

    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&data[offset..offset + NONCE_LEN]);
    offset += NONCE_LEN;

    Ok(Container {
        version: FormatVersion::V2,
        kdf,
        salt,
        nonce,
        ciphertext: data[offset..].to_vec(),
    })
}

/// Serializes container fields to v2 bytes.
pub fn serialize(
    kdf: &KdfParams,
    salt: &[u8; SALT_LEN],
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + ciphertext.len());

    buf.extend_from_slice(MAGIC);
    buf.push(VERSION_V2);
    buf.push(kdf.log_n());
    buf.extend_from_slice(&kdf.block_size().to_le_bytes());
    buf.extend_from_slice(&kdf.parallelism().to_le_bytes());
    buf.extend_from_slice(salt);
    buf.extend_from_slice(nonce);
    buf.extend_from_slice(ciphertext);

    buf
}
