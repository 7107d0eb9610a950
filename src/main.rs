use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
mod auth;
mod config;
use config::{Config, KdfArgs};
use passcrypt::{Engine, Error, FormatError, KdfError, KdfParams, Storage, crypto::TAG_LEN, format};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use zeroize::Zeroizing;

const DECRYPT_FAILED: &str = "decryption failed: wrong passphrase or corrupted file";

#[derive(Debug, Parser)]
#[command(name = "passcrypt")]
#[command(
    version,
    about = "Encrypts files under a passphrase into self-describing containers."
)]
struct Cli {
    /// Path to a JSON config file
    #[arg(long, global = true, value_name = "PATH", env = "PASSCRYPT_CONFIG")]
    config: Option<PathBuf>,

    /// Log engine steps to stderr
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Encrypts a file (output defaults to <INPUT>.enc)
    #[command(arg_required_else_help = true)]
    Encrypt {
        input: PathBuf,
        output: Option<PathBuf>,

        /// Overwrite the output file if it exists
        #[arg(short, long, default_value_t = false)]
        force: bool,

        #[command(flatten)]
        kdf: KdfArgs,
    },

    /// Decrypts a container (output strips .enc, or appends .dec)
    ///
    /// Key derivation uses the parameters recorded in the container.
    #[command(arg_required_else_help = true)]
    Decrypt {
        input: PathBuf,
        output: Option<PathBuf>,

        /// Overwrite the output file if it exists
        #[arg(short, long, default_value_t = false)]
        force: bool,
    },

    /// Shows the header of a container without decrypting it
    #[command(arg_required_else_help = true)]
    Inspect { input: PathBuf },
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Cli::parse();
    init_logging(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", user_message(&e));
            ExitCode::FAILURE
        }
    }
}

fn run(args: Cli) -> Result<()> {
    match args.command {
        Commands::Encrypt {
            input,
            output,
            force,
            kdf,
        } => {
            let config = Config::load(args.config.as_deref())?;
            let kdf = kdf.resolve(&config)?;
            let output = output.unwrap_or_else(|| with_suffix(&input, ".enc"));
            encrypt(&input, &output, force, kdf)?;
            println!("encrypted '{}' -> '{}'", input.display(), output.display());
        }
        Commands::Decrypt {
            input,
            output,
            force,
        } => {
            let output = output.unwrap_or_else(|| decrypted_path(&input));
            decrypt(&input, &output, force)?;
            println!("decrypted '{}' -> '{}'", input.display(), output.display());
        }
        Commands::Inspect { input } => inspect(&input)?,
    }

    Ok(())
}

fn encrypt(input: &Path, output: &Path, force: bool, kdf: KdfParams) -> Result<()> {
    let target = writable_target(output, force)?;
    let plaintext = Zeroizing::new(read_input(input)?);

    let passphrase = auth::read_new_passphrase_with_confirmation()?;
    let interrupted = watch_interrupt()?;

    debug!(input = %input.display(), "sealing");
    let container = Engine::new(kdf).seal(passphrase, &plaintext)?;

    if interrupted.load(Ordering::SeqCst) {
        bail!("interrupted; no output written");
    }

    target
        .save(&container)
        .with_context(|| format!("failed to write '{}'", output.display()))
}

fn decrypt(input: &Path, output: &Path, force: bool) -> Result<()> {
    let target = writable_target(output, force)?;
    let data = read_input(input)?;

    let passphrase = auth::read_passphrase()?;
    let interrupted = watch_interrupt()?;

    debug!(input = %input.display(), "opening");
    let plaintext = Engine::default().open(passphrase, &data)?;

    if interrupted.load(Ordering::SeqCst) {
        bail!("interrupted; no output written");
    }

    target
        .save(&plaintext)
        .with_context(|| format!("failed to write '{}'", output.display()))
}

fn inspect(input: &Path) -> Result<()> {
    let data = read_input(input)?;
    let container = format::decode(&data).map_err(Error::from)?;
    let payload = container.ciphertext().len();
    let kdf = container.kdf_params();

    println!("format version: {}", container.version().as_u8());
    println!(
        "kdf:            scrypt N={} r={} p={}",
        kdf.cost(),
        kdf.block_size(),
        kdf.parallelism()
    );
    println!("salt:           {}", hex::encode(container.salt()));
    println!("nonce:          {}", hex::encode(container.nonce()));
    println!(
        "payload:        {payload} bytes ({} plaintext + {TAG_LEN} tag)",
        payload - TAG_LEN
    );

    Ok(())
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    Storage::new(path)
        .load()
        .with_context(|| format!("failed to read '{}'", path.display()))
}

fn writable_target(path: &Path, force: bool) -> Result<Storage> {
    let target = Storage::new(path);
    if target.exists() && !force {
        bail!(
            "output '{}' already exists (use --force to overwrite)",
            path.display()
        );
    }
    Ok(target)
}

/// Ctrl-C only raises a flag. The running seal/open finishes and zeroes its
/// buffers; the caller then drops the result.
fn watch_interrupt() -> Result<Arc<AtomicBool>> {
    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = interrupted.clone();
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .context("failed to install Ctrl-C handler")?;
    Ok(interrupted)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn decrypted_path(input: &Path) -> PathBuf {
    match input.extension() {
        Some(ext) if ext == "enc" => input.with_extension(""),
        _ => with_suffix(input, ".dec"),
    }
}

/// Maps an error to the line shown to the user.
///
/// Authentication and format failures share one message so the output
/// cannot be used to tell a wrong passphrase from a damaged file.
fn user_message(err: &anyhow::Error) -> String {
    let Some(engine_err) = err.chain().find_map(|e| e.downcast_ref::<Error>()) else {
        return format!("{err:#}");
    };

    match engine_err {
        Error::Auth(_) => DECRYPT_FAILED.to_string(),
        Error::Format(FormatError::UnsupportedVersion(v)) => format!(
            "{DECRYPT_FAILED}\nhint: container format version {v} is not supported by this build; a newer passcrypt may read it"
        ),
        Error::Format(_) => DECRYPT_FAILED.to_string(),
        Error::Kdf(KdfError::ResourceExhausted { required_bytes }) => format!(
            "not enough memory for key derivation: {required_bytes} bytes required; free memory or encrypt with a lower --kdf-cost"
        ),
        _ => format!("{err:#}"),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "passcrypt=debug" } else { "warn" };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_env("PASSCRYPT_LOG").unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Unable to set global default subscriber");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decrypted_path_strips_enc_or_appends_dec() {
        assert_eq!(
            decrypted_path(Path::new("dir/notes.txt.enc")),
            PathBuf::from("dir/notes.txt")
        );
        assert_eq!(
            decrypted_path(Path::new("notes.bin")),
            PathBuf::from("notes.bin.dec")
        );
    }

    #[test]
    fn encrypted_path_appends_enc() {
        assert_eq!(
            with_suffix(Path::new("notes.txt"), ".enc"),
            PathBuf::from("notes.txt.enc")
        );
    }

    #[test]
    fn auth_and_format_errors_share_message() {
        let auth = anyhow::Error::from(Error::from(passcrypt::AuthError::AuthenticationFailed));
        let magic = anyhow::Error::from(Error::from(FormatError::BadMagic));
        let short = anyhow::Error::from(Error::from(FormatError::TooShort { len: 3, min: 49 }));

        assert_eq!(user_message(&auth), DECRYPT_FAILED);
        assert_eq!(user_message(&magic), DECRYPT_FAILED);
        assert_eq!(user_message(&short), DECRYPT_FAILED);
    }

    #[test]
    fn unsupported_version_adds_hint() {
        let err = anyhow::Error::from(Error::from(FormatError::UnsupportedVersion(9)));
        let msg = user_message(&err);

        assert!(msg.starts_with(DECRYPT_FAILED));
        assert!(msg.contains("version 9"));
    }

    #[test]
    fn invalid_recorded_params_share_message() {
        let err = anyhow::Error::from(Error::from(FormatError::InvalidKdfParams));
        assert_eq!(user_message(&err), DECRYPT_FAILED);
    }

    #[test]
    fn resource_exhaustion_is_distinct() {
        let err = anyhow::Error::from(Error::from(KdfError::ResourceExhausted {
            required_bytes: 1024,
        }));
        let msg = user_message(&err);

        assert_ne!(msg, DECRYPT_FAILED);
        assert!(msg.contains("not enough memory"));
    }
}
