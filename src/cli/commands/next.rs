//! `keystash next` — pick the entry that should be used next.

use chrono::Utc;

use crate::cli::{open_session, Cli, LabelArgs};
use crate::errors::{KeystashError, Result};

/// Execute the `next` command.
///
/// Prints only the entry name (or its value with `--value`) so the
/// output can be captured by scripts.
pub fn execute(cli: &Cli, labels: &LabelArgs, value: bool) -> Result<()> {
    let session = open_session(cli)?;

    let entry = session
        .next_usable(&labels.filter(None), Utc::now())?
        .ok_or_else(|| {
            KeystashError::CommandFailed("no active, unexpired entry matches these labels".into())
        })?;

    if value {
        let secret = session.get(&entry.name)?;
        println!("{}", secret.as_str());
    } else {
        println!("{}", entry.name);
    }

    Ok(())
}
