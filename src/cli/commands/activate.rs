//! `keystash activate` / `keystash deactivate` — flip an entry's active flag.

use crate::cli::output;
use crate::cli::{open_session, Cli};
use crate::errors::Result;

/// Execute `activate` (`active = true`) or `deactivate` (`active = false`).
pub fn execute(cli: &Cli, name: &str, active: bool) -> Result<()> {
    let mut session = open_session(cli)?;
    session.set_active(name, active)?;

    let state = if active { "active" } else { "inactive" };
    output::success(&format!("Entry '{name}' marked {state}"));
    Ok(())
}
