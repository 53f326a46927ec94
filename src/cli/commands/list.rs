//! `keystash list` — display entry metadata in a table.

use chrono::Utc;

use crate::cli::output;
use crate::cli::{open_session, Cli, LabelArgs};
use crate::errors::Result;

/// Execute the `list` command.
pub fn execute(cli: &Cli, labels: &LabelArgs, active_only: bool, counts: bool) -> Result<()> {
    let session = open_session(cli)?;
    let filter = labels.filter(active_only.then_some(true));

    if counts {
        let groups = session.usability_counts(&filter, Utc::now())?;
        output::print_usage_counts(&groups);
        return Ok(());
    }

    let entries = session.find(&filter)?;

    output::info(&format!(
        "{} — {} entr{}",
        session.vault()?.path().display(),
        entries.len(),
        if entries.len() == 1 { "y" } else { "ies" }
    ));
    output::print_entries_table(&entries);

    Ok(())
}
