//! `keystash init` — create a new, empty vault.

use crate::cli::output;
use crate::cli::{prompt_new_passphrase, vault_path, Cli};
use crate::config::Settings;
use crate::errors::{KeystashError, Result};
use crate::session::SessionManager;

/// Execute the `init` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let path = vault_path(cli)?;

    // Fail before prompting so nobody types a passphrase for nothing.
    if path.exists() {
        output::tip("Use `keystash add` to add entries to the existing vault.");
        return Err(KeystashError::AlreadyExists(path));
    }

    let passphrase = prompt_new_passphrase()?;
    let settings = Settings::load(&cwd)?;

    let mut session = SessionManager::new();
    session.init_with_params(&path, passphrase.as_bytes(), &settings.kdf_params())?;
    session.lock();

    output::success(&format!("Vault created at {}", path.display()));
    output::tip("Run `keystash add <NAME>` to add a secret.");
    output::tip("Run `keystash list` to see all entries.");

    Ok(())
}
