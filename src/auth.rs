use anyhow::{Result, bail};
use passcrypt::SecretBuffer;
use std::io::{self, BufRead, IsTerminal};
use zeroize::Zeroizing;

pub const PASSPHRASE_ENV: &str = "PASSCRYPT_PASSPHRASE";

/// Reads the passphrase for opening a container.
pub fn read_passphrase() -> Result<SecretBuffer> {
    //  Environment Variable
    //  PASSCRYPT_PASSPHRASE="supersecret" passcrypt decrypt notes.txt.enc
    if let Some(pw) = from_env() {
        return Ok(pw);
    }

    //  stdin (Pipeline)
    //  printf "%s\n" "$SECRET" | passcrypt decrypt notes.txt.enc
    if !io::stdin().is_terminal() {
        let pw = read_line(&mut io::stdin().lock())?;
        if pw.is_empty() {
            bail!("No passphrase provided");
        }
        return Ok(SecretBuffer::from(pw));
    }

    let pw = Zeroizing::new(rpassword::prompt_password("Passphrase: ")?);
    if pw.is_empty() {
        bail!("No passphrase provided");
    }
    Ok(SecretBuffer::from(pw))
}

/// Reads a new passphrase twice and checks both entries match.
pub fn read_new_passphrase_with_confirmation() -> Result<SecretBuffer> {
    if let Some(pw) = from_env() {
        return Ok(pw);
    }

    let (first, second) = if !io::stdin().is_terminal() {
        let stdin = io::stdin();
        let mut handle = stdin.lock();
        (read_line(&mut handle)?, read_line(&mut handle)?)
    } else {
        (
            Zeroizing::new(rpassword::prompt_password("New passphrase: ")?),
            Zeroizing::new(rpassword::prompt_password("Confirm passphrase: ")?),
        )
    };

    confirm(SecretBuffer::from(first), SecretBuffer::from(second))
}

fn confirm(first: SecretBuffer, second: SecretBuffer) -> Result<SecretBuffer> {
    if first.is_empty() {
        bail!("passphrase cannot be empty");
    }

    if !first.ct_eq(&second) {
        bail!("passphrases do not match");
    }

    Ok(first)
}

fn from_env() -> Option<SecretBuffer> {
    let pw = Zeroizing::new(std::env::var(PASSPHRASE_ENV).ok()?);
    if pw.is_empty() {
        return None;
    }
    Some(SecretBuffer::from(pw))
}

fn read_line(reader: &mut impl BufRead) -> Result<Zeroizing<String>> {
    let mut line = Zeroizing::new(String::new());
    reader.read_line(&mut line)?;
    trim_newline(&mut line);
    Ok(line)
}

fn trim_newline(s: &mut String) {
    while s.ends_with('\n') || s.ends_with('\r') {
        s.pop();
    }
}
