use scrypt::Params;
use tracing::debug;

use super::{KEY_LEN, SALT_LEN};
use crate::error::KdfError;
use crate::secret::SecretBuffer;

/// scrypt cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    cost: u64,
    block_size: u32,
    parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            // N = 2^15, about 32 MiB of memory with r = 8
            cost: 1 << 15,
            block_size: 8,
            parallelism: 1,
        }
    }
}

impl KdfParams {
    pub fn new(cost: u64, block_size: u32, parallelism: u32) -> Result<Self, KdfError> {
        let params = Self {
            cost,
            block_size,
            parallelism,
        };
        params.validate()?;
        Ok(params)
    }

    /// Builds parameters from N's base-2 logarithm, as stored in container headers.
    pub fn from_log_n(log_n: u8, block_size: u32, parallelism: u32) -> Result<Self, KdfError> {
        let cost = 1u64.checked_shl(u32::from(log_n)).ok_or_else(|| {
            KdfError::InvalidParams(format!("scrypt log2 cost {log_n} is out of range"))
        })?;
        Self::new(cost, block_size, parallelism)
    }

    /// CPU/memory cost factor N.
    pub fn cost(&self) -> u64 {
        self.cost
    }

    /// Block size r.
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Parallelization factor p.
    pub fn parallelism(&self) -> u32 {
        self.parallelism
    }

    pub fn output_length(&self) -> usize {
        KEY_LEN
    }

    /// Checks the parameters against scrypt's legal ranges.
    pub fn validate(&self) -> Result<(), KdfError> {
        if self.cost < 2 || !self.cost.is_power_of_two() {
            return Err(KdfError::InvalidParams(format!(
                "scrypt cost must be a power of two >= 2, got {}",
                self.cost
            )));
        }
        if self.block_size < 1 {
            return Err(KdfError::InvalidParams(
                "scrypt block size must be >= 1".into(),
            ));
        }
        if u64::from(self.log_n()) >= 16 * u64::from(self.block_size) {
            return Err(KdfError::InvalidParams(format!(
                "scrypt cost 2^{} needs block size > {}",
                self.log_n(),
                self.log_n() / 16
            )));
        }
        if self.parallelism < 1 {
            return Err(KdfError::InvalidParams(
                "scrypt parallelism must be >= 1".into(),
            ));
        }
        if u64::from(self.block_size) * u64::from(self.parallelism) >= 1 << 30 {
            return Err(KdfError::InvalidParams(
                "scrypt block size * parallelism must be < 2^30".into(),
            ));
        }
        self.memory_bytes()?;
        Ok(())
    }

    /// Bytes of working memory scrypt allocates: 128·r·N plus 128·r·p.
    pub fn memory_bytes(&self) -> Result<usize, KdfError> {
        let too_large =
            || KdfError::InvalidParams("scrypt memory requirement exceeds address space".into());

        let cost = usize::try_from(self.cost).map_err(|_| too_large())?;
        let r128 = (self.block_size as usize)
            .checked_mul(128)
            .ok_or_else(too_large)?;
        let v = r128.checked_mul(cost).ok_or_else(too_large)?;
        let b = r128
            .checked_mul(self.parallelism as usize)
            .ok_or_else(too_large)?;
        v.checked_add(b).ok_or_else(too_large)
    }

    /// Base-2 logarithm of the cost.
    pub fn log_n(&self) -> u8 {
        self.cost.trailing_zeros() as u8
    }
}

/// A 32-byte key produced by [`derive_key`], zeroed on release or drop.
#[derive(Debug)]
pub struct DerivedKey(SecretBuffer);

impl DerivedKey {
    pub fn as_bytes(&self) -> &[u8] {
        self.0.expose()
    }

    pub fn release(&mut self) {
        self.0.release();
    }

    pub fn is_released(&self) -> bool {
        self.0.is_released()
    }
}

/// Stretches `passphrase` into a key with scrypt.
///
/// Deterministic for identical inputs. Fails with
/// [`KdfError::ResourceExhausted`] when the host cannot reserve the memory
/// the parameters require.
pub fn derive_key(
    passphrase: &SecretBuffer,
    salt: &[u8; SALT_LEN],
    kdf: KdfParams,
) -> Result<DerivedKey, KdfError> {
    kdf.validate()?;

    let params = Params::new(
        kdf.log_n(),
        kdf.block_size,
        kdf.parallelism,
        KEY_LEN,
    )
    .map_err(|e| KdfError::InvalidParams(format!("rejected by scrypt: {e}")))?;

    let required_bytes = kdf.memory_bytes()?;
    reserve_probe(required_bytes)?;

    debug!(
        cost = kdf.cost,
        block_size = kdf.block_size,
        parallelism = kdf.parallelism,
        "deriving key"
    );

    let mut key = SecretBuffer::zeroed(KEY_LEN);
    scrypt::scrypt(passphrase.expose(), salt, &params, key.expose_mut())
        .map_err(|e| KdfError::InvalidParams(format!("scrypt output length: {e}")))?;

    Ok(DerivedKey(key))
}

/// scrypt aborts the process when its allocation fails, so ask the
/// allocator first and turn a refusal into an error.
fn reserve_probe(required_bytes: usize) -> Result<(), KdfError> {
    let mut probe: Vec<u8> = Vec::new();
    probe
        .try_reserve_exact(required_bytes)
        .map_err(|_| KdfError::ResourceExhausted { required_bytes })
}
