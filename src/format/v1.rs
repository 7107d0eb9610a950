//! Container format v1.
//!
//! The header records no KDF parameters; v1 containers are always sealed
//! with [`KdfParams::default`].
//!
//! V1 Container Format:
//! ```text
//! MAGIC (4) | VERSION (1) | SALT (16) | NONCE (12) | CIPHERTEXT || TAG (N + 16)
//! ```

use super::{Container, FormatVersion, MAGIC, MAGIC_LEN, VER_LEN};
use crate::crypto::{KdfParams, NONCE_LEN, SALT_LEN, TAG_LEN};
use crate::error::FormatError;

/// Version byte of this format.
pub const VERSION_V1: u8 = 1;

/// Bytes before the ciphertext.
pub const HEADER_LEN: usize = MAGIC_LEN + VER_LEN + SALT_LEN + NONCE_LEN;

/// A zero-length plaintext still carries a full tag.
pub const MIN_LEN: usize = HEADER_LEN + TAG_LEN;

/// Parses a v1 container whose magic and version were already checked.
///
/// # Errors
///
/// Returns an error if the data is too short to hold a header and tag.
pub fn parse(data: &[u8]) -> Result<Container, FormatError> {
    if data.len() < MIN_LEN {
        return Err(FormatError::TooShort {
            len: data.len(),
            min: MIN_LEN,
        });
    }

    let mut offset = MAGIC_LEN + VER_LEN;

    let mut salt = [0u8; SALT_LEN];
    salt.copy_from_slice(&data[offset..offset + SALT_LEN]);
    offset += SALT_LEN;

    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&data[offset..offset + NONCE_LEN]);
    offset += NONCE_LEN;

    Ok(Container {
        version: FormatVersion::V1,
        kdf: KdfParams::default(),
        salt,
        nonce,
        ciphertext: data[offset..].to_vec(),
    })
}

/// Serializes container fields to v1 bytes.
pub fn serialize(
    salt: &[u8; SALT_LEN],
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + ciphertext.len());

    buf.extend_from_slice(MAGIC);
    buf.push(VERSION_V1);
    buf.extend_from_slice(salt);
    buf.extend_from_slice(nonce);
    buf.extend_from_slice(ciphertext);

    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_bit_exact() {
        let salt = [0xAAu8; 16];
        let nonce = [0xBBu8; 12];
        let ct = [0xCCu8; 16];

        let bytes = serialize(&salt, &nonce, &ct);

        assert_eq!(bytes.len(), 33 + 16);
        assert_eq!(&bytes[0..4], b"PCRY");
        assert_eq!(bytes[4], 1);
        assert_eq!(&bytes[5..21], &salt);
        assert_eq!(&bytes[21..33], &nonce);
        assert_eq!(&bytes[33..], &ct);
    }

    #[test]
    fn header_and_min_lengths() {
        assert_eq!(HEADER_LEN, 33);
        assert_eq!(MIN_LEN, 49);
    }

    #[test]
    fn parse_rejects_missing_tag_bytes() {
        let bytes = serialize(&[0u8; 16], &[0u8; 12], &[0u8; 15]);
        assert_eq!(
            parse(&bytes).unwrap_err(),
            FormatError::TooShort { len: 48, min: 49 }
        );
    }

    #[test]
    fn parse_takes_remainder_as_ciphertext() {
        let bytes = serialize(&[4u8; 16], &[5u8; 12], &[6u8; 100]);
        let parsed = parse(&bytes).unwrap();

        assert_eq!(parsed.kdf_params(), KdfParams::default());
        assert_eq!(parsed.salt(), &[4u8; 16]);
        assert_eq!(parsed.nonce(), &[5u8; 12]);
        assert_eq!(parsed.ciphertext().len(), 100);
    }
}
