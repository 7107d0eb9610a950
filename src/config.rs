//! KDF settings from flags, environment and the config file.
//!
//! Precedence: command-line flag, then `PASSCRYPT_KDF_*` environment
//! variables (both handled by clap), then the JSON config file, then the
//! built-in defaults.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use passcrypt::KdfParams;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, clap::Args)]
pub struct KdfArgs {
    /// scrypt CPU/memory cost N, a power of two (default: 32768)
    #[arg(long = "kdf-cost", env = "PASSCRYPT_KDF_COST")]
    pub cost: Option<u64>,

    /// scrypt block size r (default: 8)
    #[arg(long = "kdf-block-size", env = "PASSCRYPT_KDF_BLOCK_SIZE")]
    pub block_size: Option<u32>,

    /// scrypt parallelism p (default: 1)
    #[arg(long = "kdf-parallelism", env = "PASSCRYPT_KDF_PARALLELISM")]
    pub parallelism: Option<u32>,
}

impl KdfArgs {
    /// Merges flags over the config file over defaults and validates the result.
    pub fn resolve(&self, config: &Config) -> Result<KdfParams> {
        let default = KdfParams::default();

        let params = KdfParams::new(
            self.cost.or(config.kdf.cost).unwrap_or(default.cost()),
            self.block_size
                .or(config.kdf.block_size)
                .unwrap_or(default.block_size()),
            self.parallelism
                .or(config.kdf.parallelism)
                .unwrap_or(default.parallelism()),
        )
        .map_err(passcrypt::Error::from)?;

        Ok(params)
    }
}

/// Contents of `config.json`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub kdf: KdfSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KdfSection {
    pub cost: Option<u64>,
    pub block_size: Option<u32>,
    pub parallelism: Option<u32>,
}

impl Config {
    /// Loads `explicit` if given, else the platform default file if it exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid config file '{}'", path.display()))
    }
}

pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "passcrypt").map(|dirs| dirs.config_dir().join("config.json"))
}
