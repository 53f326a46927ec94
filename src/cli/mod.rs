//! CLI module — Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use clap::Parser;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::errors::{KeystashError, Result};
use crate::session::SessionManager;
use crate::vault::EntryFilter;

/// Minimum passphrase length accepted when creating a vault.
const MIN_PASSPHRASE_LEN: usize = 8;

/// Environment variable checked before prompting for the passphrase.
pub const PASSPHRASE_ENV: &str = "KEYSTASH_PASSPHRASE";

/// Keystash CLI: encrypted local key-value vault.
#[derive(Parser)]
#[command(
    name = "keystash",
    about = "Encrypted local key-value vault for API keys and secrets",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Vault file (default: keystash.vault, or `vault_path` in .keystash.toml)
    #[arg(long, global = true, env = "KEYSTASH_VAULT")]
    pub vault: Option<PathBuf>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create a new, empty vault
    Init,

    /// Add a new entry
    Add {
        /// Entry name (e.g. github)
        name: String,
        /// Secret value (omit for interactive prompt)
        value: Option<String>,
        #[command(flatten)]
        labels: LabelArgs,
        /// Expiry date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        expires: Option<String>,
        /// Store the entry as inactive
        #[arg(long)]
        inactive: bool,
    },

    /// Print an entry's secret value
    Get {
        /// Entry name
        name: String,
    },

    /// Replace an entry's secret value
    Update {
        /// Entry name
        name: String,
        /// New secret value (omit for interactive prompt)
        value: Option<String>,
    },

    /// Remove an entry
    Remove {
        /// Entry name
        name: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// List entries (never prints secret values)
    List {
        #[command(flatten)]
        labels: LabelArgs,
        /// Only show active entries
        #[arg(long)]
        active_only: bool,
        /// Show usable/unusable counts per source, login and batch
        #[arg(long)]
        counts: bool,
    },

    /// Change an entry's labels or expiry
    Label {
        /// Entry name
        name: String,
        #[command(flatten)]
        labels: LabelArgs,
        /// New expiry date (YYYY-MM-DD or RFC 3339)
        #[arg(long, conflicts_with = "no_expiry")]
        expires: Option<String>,
        /// Remove the expiry
        #[arg(long)]
        no_expiry: bool,
    },

    /// Print the name of the next usable entry
    Next {
        #[command(flatten)]
        labels: LabelArgs,
        /// Print the secret value instead of the name
        #[arg(long)]
        value: bool,
    },

    /// Mark an entry as active
    Activate {
        /// Entry name
        name: String,
    },

    /// Mark an entry as inactive
    Deactivate {
        /// Entry name
        name: String,
    },
}

/// Descriptive labels shared by `add` and `list`.
#[derive(clap::Args, Debug, Default)]
pub struct LabelArgs {
    /// Where the key came from (e.g. github)
    #[arg(long)]
    pub source: Option<String>,
    /// Account or login the key belongs to
    #[arg(long)]
    pub login: Option<String>,
    /// Batch label
    #[arg(long)]
    pub batch: Option<String>,
}

impl LabelArgs {
    /// Filter matching these labels; unset labels match everything.
    pub fn filter(&self, active: Option<bool>) -> EntryFilter {
        EntryFilter {
            source: self.source.clone(),
            login: self.login.clone(),
            batch: self.batch.clone(),
            active,
        }
    }
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Resolve the vault file from `--vault` and `.keystash.toml`.
pub fn vault_path(cli: &Cli) -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    let settings = Settings::load(&cwd)?;
    Ok(settings.vault_path(&cwd, cli.vault.as_deref()))
}

/// Prompt for the passphrase and unlock the vault.
pub fn open_session(cli: &Cli) -> Result<SessionManager> {
    let path = vault_path(cli)?;
    let passphrase = prompt_passphrase()?;

    let mut session = SessionManager::new();
    session.unlock(&path, passphrase.as_bytes())?;
    Ok(session)
}

/// Get the vault passphrase, trying in order:
/// 1. `KEYSTASH_PASSPHRASE` env var (CI/CD)
/// 2. Interactive prompt
///
/// Returns `Zeroizing<String>` so the passphrase is wiped from memory on drop.
pub fn prompt_passphrase() -> Result<Zeroizing<String>> {
    if let Some(pw) = passphrase_from_env() {
        return Ok(pw);
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Enter vault passphrase")
        .interact()
        .map_err(|e| KeystashError::CommandFailed(format!("passphrase prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new passphrase with confirmation (used during `init`).
///
/// Also respects `KEYSTASH_PASSPHRASE` for scripted usage.  Enforces a
/// minimum length.
pub fn prompt_new_passphrase() -> Result<Zeroizing<String>> {
    if let Some(pw) = passphrase_from_env() {
        if pw.len() < MIN_PASSPHRASE_LEN {
            return Err(KeystashError::CommandFailed(format!(
                "passphrase must be at least {MIN_PASSPHRASE_LEN} characters"
            )));
        }
        return Ok(pw);
    }

    loop {
        let pw = Zeroizing::new(
            dialoguer::Password::new()
                .with_prompt("Choose vault passphrase")
                .with_confirmation(
                    "Confirm vault passphrase",
                    "Passphrases do not match, try again",
                )
                .interact()
                .map_err(|e| KeystashError::CommandFailed(format!("passphrase prompt: {e}")))?,
        );

        if pw.len() < MIN_PASSPHRASE_LEN {
            output::warning(&format!(
                "Passphrase must be at least {MIN_PASSPHRASE_LEN} characters. Try again."
            ));
            continue;
        }

        return Ok(pw);
    }
}

fn passphrase_from_env() -> Option<Zeroizing<String>> {
    std::env::var(PASSPHRASE_ENV)
        .ok()
        .filter(|pw| !pw.is_empty())
        .map(Zeroizing::new)
}

/// Read a secret value from the argument, piped stdin, or a hidden prompt.
pub fn read_secret_value(name: &str, value: Option<&str>) -> Result<Zeroizing<String>> {
    if let Some(v) = value {
        output::warning("Value provided on command line — it may appear in shell history.");
        return Ok(Zeroizing::new(v.to_string()));
    }

    if !io::stdin().is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().read_to_string(&mut buf)?;
        let trimmed_len = buf.trim_end().len();
        buf.truncate(trimmed_len);
        return Ok(buf);
    }

    let v = dialoguer::Password::new()
        .with_prompt(format!("Enter value for {name}"))
        .interact()
        .map_err(|e| KeystashError::CommandFailed(format!("input prompt: {e}")))?;
    Ok(Zeroizing::new(v))
}

/// Parse an expiry given as `YYYY-MM-DD` (midnight UTC) or RFC 3339.
pub fn parse_expiry(input: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| {
            KeystashError::CommandFailed(format!(
                "invalid expiry '{input}' — use YYYY-MM-DD or an RFC 3339 timestamp"
            ))
        })
}
