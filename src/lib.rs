//! Password-based authenticated file encryption.
//!
//! [`Engine::seal`] derives a key from a passphrase with scrypt, encrypts with
//! ChaCha20-Poly1305 and returns a self-describing container holding the
//! salt and nonce. [`Engine::open`] needs only the passphrase and those bytes.

pub mod crypto;
pub mod error;
pub mod format;
pub mod random;
pub mod secret;
pub mod storage;

pub use crate::crypto::KdfParams;
pub use crate::error::{AuthError, Error, FormatError, KdfError, RandomError, Result};
pub use crate::format::{Container, FormatVersion};
pub use crate::random::{OsRandom, RandomSource};
pub use crate::secret::SecretBuffer;
pub use crate::storage::Storage;

use crate::crypto::{NONCE_LEN, SALT_LEN, aead, derive_key};
use tracing::debug;
use zeroize::Zeroizing;

/// Seals and opens containers.
///
/// Holds no mutable state, so one engine can serve many threads at once.
#[derive(Debug, Clone)]
pub struct Engine<R = OsRandom> {
    kdf: KdfParams,
    rng: R,
}

impl Default for Engine<OsRandom> {
    fn default() -> Self {
        Self::new(KdfParams::default())
    }
}

impl Engine<OsRandom> {
    pub fn new(kdf: KdfParams) -> Self {
        Self::with_random_source(kdf, OsRandom)
    }
}

impl<R: RandomSource> Engine<R> {
    pub fn with_random_source(kdf: KdfParams, rng: R) -> Self {
        Self { kdf, rng }
    }

    pub fn kdf(&self) -> KdfParams {
        self.kdf
    }

    /// Encrypts `plaintext` under `passphrase` into a new container.
    ///
    /// Salt and nonce are drawn fresh for every call. The passphrase and the
    /// derived key are zeroed before this returns, whatever the outcome.
    pub fn seal(&self, mut passphrase: SecretBuffer, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        self.rng.fill(&mut salt)?;
        self.rng.fill(&mut nonce)?;

        let mut key = derive_key(&passphrase, &salt, self.kdf)?;
        passphrase.release();

        let sealed = aead::seal(&key, &nonce, plaintext, &[]);
        key.release();
        let ciphertext = sealed?;

        let container = format::encode(&self.kdf, &salt, &nonce, &ciphertext);
        debug!(
            plaintext_len = plaintext.len(),
            container_len = container.len(),
            "sealed container"
        );
        Ok(container)
    }

    /// Verifies and decrypts a container produced by [`Engine::seal`].
    ///
    /// The key is derived with the parameters the container was sealed
    /// with, whatever this engine's own are. Any tag mismatch is reported as [`AuthError::AuthenticationFailed`],
    /// with no hint whether the passphrase or the data was wrong.
    pub fn open(&self, mut passphrase: SecretBuffer, data: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let container = format::decode(data)?;
        debug!(
            version = container.version().as_u8(),
            cost = container.kdf_params().cost(),
            payload_len = container.ciphertext().len(),
            "decoded container"
        );

        let mut key = derive_key(&passphrase, container.salt(), container.kdf_params())?;
        passphrase.release();

        let opened = aead::open(&key, container.nonce(), container.ciphertext(), &[]);
        key.release();

        Ok(opened?)
    }
}

/// Seals `plaintext` with the OS random source.
pub fn seal(passphrase: SecretBuffer, plaintext: &[u8], kdf: KdfParams) -> Result<Vec<u8>> {
    Engine::new(kdf).seal(passphrase, plaintext)
}

/// Opens a container with the parameters recorded for it.
pub fn open(passphrase: SecretBuffer, data: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    Engine::default().open(passphrase, data)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU8, Ordering};

    use super::*;
    use crate::crypto::KEY_LEN;
    use crate::secret::audit;

    fn fast() -> KdfParams {
        KdfParams::new(1 << 10, 8, 1).unwrap()
    }

    fn pw(s: &str) -> SecretBuffer {
        SecretBuffer::from(s.to_string())
    }

    /// Counts upward from a seed, one byte at a time.
    struct CountingRandom(AtomicU8);

    impl RandomSource for CountingRandom {
        fn fill(&self, buf: &mut [u8]) -> std::result::Result<(), RandomError> {
            for b in buf {
                *b = self.0.fetch_add(1, Ordering::Relaxed);
            }
            Ok(())
        }
    }

    struct BrokenRandom;

    impl RandomSource for BrokenRandom {
        fn fill(&self, _buf: &mut [u8]) -> std::result::Result<(), RandomError> {
            Err(RandomError("no entropy".into()))
        }
    }

    fn key_releases() -> Vec<audit::Release> {
        audit::take()
            .into_iter()
            .filter(|r| r.len == KEY_LEN)
            .collect()
    }

    #[test]
    fn seal_open_roundtrip() {
        let engine = Engine::new(fast());
        let sealed = engine.seal(pw("correct horse"), b"hello world").unwrap();

        // v2 header: 42 bytes
        assert_eq!(sealed.len(), 42 + 11 + 16);
        let opened = engine.open(pw("correct horse"), &sealed).unwrap();
        assert_eq!(opened.as_slice(), b"hello world");
    }

    #[test]
    fn injected_random_source_fills_salt_then_nonce() {
        let engine = Engine::with_random_source(fast(), CountingRandom(AtomicU8::new(0)));
        let sealed = engine.seal(pw("pw"), b"x").unwrap();

        let expected_salt: Vec<u8> = (0..16).collect();
        let expected_nonce: Vec<u8> = (16..28).collect();
        let container = format::decode(&sealed).unwrap();
        assert_eq!(container.salt().as_slice(), expected_salt.as_slice());
        assert_eq!(container.nonce().as_slice(), expected_nonce.as_slice());
    }

    #[test]
    fn deterministic_random_gives_reproducible_containers() {
        let a = Engine::with_random_source(fast(), CountingRandom(AtomicU8::new(7)));
        let b = Engine::with_random_source(fast(), CountingRandom(AtomicU8::new(7)));

        assert_eq!(
            a.seal(pw("pw"), b"same").unwrap(),
            b.seal(pw("pw"), b"same").unwrap()
        );
    }

    #[test]
    fn random_failure_is_reported() {
        let engine = Engine::with_random_source(fast(), BrokenRandom);
        let err = engine.seal(pw("pw"), b"data").unwrap_err();

        assert!(matches!(err, Error::Random(_)));
    }

    #[test]
    fn seal_zeroes_key_and_passphrase() {
        audit::take();
        let engine = Engine::new(fast());
        engine.seal(pw("correct horse"), b"hello").unwrap();

        let releases = audit::take();
        assert!(releases.iter().all(|r| r.all_zero));
        assert!(releases.iter().any(|r| r.len == KEY_LEN));
        assert!(releases.iter().any(|r| r.len == "correct horse".len()));
    }

    #[test]
    fn open_zeroes_key_on_success() {
        let engine = Engine::new(fast());
        let sealed = engine.seal(pw("pw"), b"hello").unwrap();
        audit::take();

        engine.open(pw("pw"), &sealed).unwrap();

        let keys = key_releases();
        assert_eq!(keys.len(), 1);
        assert!(keys[0].all_zero);
    }

    #[test]
    fn open_zeroes_key_on_auth_failure() {
        let engine = Engine::new(fast());
        let sealed = engine.seal(pw("pw"), b"hello").unwrap();
        audit::take();

        let err = engine.open(pw("wrong"), &sealed).unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::AuthenticationFailed)));

        let keys = key_releases();
        assert_eq!(keys.len(), 1);
        assert!(keys[0].all_zero);
    }

    #[test]
    fn format_error_still_zeroes_passphrase() {
        audit::take();
        let err = Engine::new(fast())
            .open(pw("twelve chars"), b"short")
            .unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::TooShort { .. })));

        let releases = audit::take();
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].len, "twelve chars".len());
        assert!(releases[0].all_zero);
    }

    #[test]
    fn kdf_error_still_zeroes_passphrase() {
        audit::take();
        let huge = KdfParams::new(1 << 40, 8, 1).unwrap();
        let err = Engine::new(huge).seal(pw("pw"), b"data").unwrap_err();
        assert!(matches!(
            err,
            Error::Kdf(KdfError::ResourceExhausted { .. })
        ));

        let releases = audit::take();
        assert!(!releases.is_empty());
        assert!(releases.iter().all(|r| r.all_zero));
    }

    #[test]
    fn open_uses_params_recorded_in_container() {
        let sealed = Engine::new(KdfParams::new(1 << 11, 8, 1).unwrap())
            .seal(pw("pw"), b"data")
            .unwrap();
        assert_eq!(sealed[4], FormatVersion::V2.as_u8());

        let opened = Engine::default().open(pw("pw"), &sealed).unwrap();
        assert_eq!(opened.as_slice(), b"data");

        let opened = Engine::new(fast()).open(pw("pw"), &sealed).unwrap();
        assert_eq!(opened.as_slice(), b"data");
    }

    #[test]
    fn default_params_seal_as_v1() {
        let sealed = Engine::default().seal(pw("pw"), b"hello world").unwrap();

        assert_eq!(sealed.len(), 60);
        assert_eq!(sealed[4], FormatVersion::V1.as_u8());
        let opened = Engine::new(fast()).open(pw("pw"), &sealed).unwrap();
        assert_eq!(opened.as_slice(), b"hello world");
    }

    #[test]
    fn free_functions_roundtrip() {
        let sealed = seal(pw("p"), b"", fast()).unwrap();
        assert_eq!(sealed.len(), 42 + 16);
        assert!(open(pw("p"), &sealed).unwrap().is_empty());
    }

    #[test]
    fn engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine>();
    }
}
