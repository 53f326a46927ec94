//! `keystash add` — add a new entry to the vault.

use crate::cli::output;
use crate::cli::{open_session, parse_expiry, read_secret_value, Cli, LabelArgs};
use crate::errors::Result;
use crate::vault::EntryMetadata;

/// Execute the `add` command.
pub fn execute(
    cli: &Cli,
    name: &str,
    value: Option<&str>,
    labels: &LabelArgs,
    expires: Option<&str>,
    inactive: bool,
) -> Result<()> {
    // Validate the flags before asking for anything secret.
    let expires_at = expires.map(parse_expiry).transpose()?;
    let metadata = EntryMetadata {
        source: labels.source.clone(),
        login: labels.login.clone(),
        batch: labels.batch.clone(),
        active: !inactive,
        expires_at,
    };

    let secret = read_secret_value(name, value)?;
    let mut session = open_session(cli)?;
    session.add_with(name, &secret, metadata)?;

    let total = session.vault()?.len();
    output::success(&format!("Entry '{name}' added ({total} total)"));

    Ok(())
}
