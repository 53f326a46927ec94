//! `keystash remove` — delete an entry from the vault.

use dialoguer::Confirm;

use crate::cli::output;
use crate::cli::{open_session, Cli};
use crate::errors::{KeystashError, Result};

/// Execute the `remove` command.
pub fn execute(cli: &Cli, name: &str, force: bool) -> Result<()> {
    // Unless --force is set, ask for confirmation before deleting.
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Remove entry '{name}'?"))
            .default(false)
            .interact()
            .map_err(|e| KeystashError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    let mut session = open_session(cli)?;
    session.remove(name)?;

    output::success(&format!("Removed entry '{name}'"));
    Ok(())
}
