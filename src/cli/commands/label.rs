//! `keystash label` — change an entry's labels or expiry.

use crate::cli::output;
use crate::cli::{open_session, parse_expiry, Cli, LabelArgs};
use crate::errors::{KeystashError, Result};

/// Execute the `label` command.
///
/// Only the labels given on the command line change; the rest are kept.
pub fn execute(
    cli: &Cli,
    name: &str,
    labels: &LabelArgs,
    expires: Option<&str>,
    no_expiry: bool,
) -> Result<()> {
    let expires_at = expires.map(parse_expiry).transpose()?;

    let mut session = open_session(cli)?;
    let mut metadata = session
        .list()?
        .into_iter()
        .find(|e| e.name == name)
        .map(|e| e.metadata)
        .ok_or_else(|| KeystashError::NotFound(name.to_string()))?;

    if let Some(source) = &labels.source {
        metadata.source = Some(source.clone());
    }
    if let Some(login) = &labels.login {
        metadata.login = Some(login.clone());
    }
    if let Some(batch) = &labels.batch {
        metadata.batch = Some(batch.clone());
    }
    if expires_at.is_some() {
        metadata.expires_at = expires_at;
    } else if no_expiry {
        metadata.expires_at = None;
    }

    session.set_metadata(name, metadata)?;

    output::success(&format!("Entry '{name}' relabeled"));
    Ok(())
}
