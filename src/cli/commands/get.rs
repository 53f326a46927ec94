//! `keystash get` — print a single entry's secret value.

use crate::cli::{open_session, Cli};
use crate::errors::Result;

/// Execute the `get` command.
pub fn execute(cli: &Cli, name: &str) -> Result<()> {
    let session = open_session(cli)?;

    // Decrypt and print the value to stdout (nothing else goes there).
    let value = session.get(name)?;
    println!("{}", value.as_str());

    Ok(())
}
