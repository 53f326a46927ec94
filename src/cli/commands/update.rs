//! `keystash update` — replace an entry's secret value.

use crate::cli::output;
use crate::cli::{open_session, read_secret_value, Cli};
use crate::errors::{KeystashError, Result};

/// Execute the `update` command.
pub fn execute(cli: &Cli, name: &str, value: Option<&str>) -> Result<()> {
    let mut session = open_session(cli)?;

    // Check before prompting for the new value.
    if !session.vault()?.contains(name) {
        return Err(KeystashError::NotFound(name.to_string()));
    }

    let secret = read_secret_value(name, value)?;
    session.update(name, &secret)?;

    output::success(&format!("Entry '{name}' updated"));
    Ok(())
}
