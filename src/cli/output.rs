//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use std::collections::BTreeMap;

use chrono::Utc;
use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::vault::{EntryInfo, UsageCounts, UsageGroup};

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print a table of entry metadata.  Secret values are never shown.
pub fn print_entries_table(entries: &[EntryInfo]) {
    if entries.is_empty() {
        info("No entries in this vault yet.");
        tip("Run `keystash add <NAME>` to add your first secret.");
        return;
    }

    let now = Utc::now();
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Name", "Source", "Login", "Batch", "Status", "Expires", "Updated",
    ]);

    for e in entries {
        let status = if !e.metadata.active {
            "inactive"
        } else if e.is_expired(now) {
            "expired"
        } else {
            "usable"
        };

        table.add_row(vec![
            e.name.clone(),
            label(e.metadata.source.as_deref()),
            label(e.metadata.login.as_deref()),
            label(e.metadata.batch.as_deref()),
            status.to_string(),
            e.metadata
                .expires_at
                .map_or_else(|| "never".to_string(), |at| at.format("%Y-%m-%d").to_string()),
            e.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }

    println!("{table}");
}

/// Print usable/unusable counts per source, login and batch.
pub fn print_usage_counts(counts: &BTreeMap<UsageGroup, UsageCounts>) {
    if counts.is_empty() {
        info("No entries match.");
        return;
    }

    let (usable, unusable) = counts
        .values()
        .fold((0, 0), |(u, n), c| (u + c.usable, n + c.unusable));
    info(&format!(
        "Usability counts ({} entries, {usable} usable, {unusable} not)",
        usable + unusable
    ));

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Source", "Login", "Batch", "Usable", "Unusable"]);
    for (group, c) in counts {
        table.add_row(vec![
            label(group.source.as_deref()),
            label(group.login.as_deref()),
            label(group.batch.as_deref()),
            c.usable.to_string(),
            c.unusable.to_string(),
        ]);
    }

    println!("{table}");
}

fn label(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}
