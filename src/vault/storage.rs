//! Atomic file replacement.
//!
//! The vault file is never written in place.  New bytes go to a
//! temporary file in the same directory, are flushed to stable storage,
//! and the temporary file is then renamed over the target.  Readers see
//! either the old file or the new one, never a mix.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::errors::Result;

/// Read the raw bytes of a vault file.
pub fn read(path: &Path) -> Result<Vec<u8>> {
    Ok(fs::read(path)?)
}

/// Replace `path` with `bytes` atomically.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    write_atomic_with(path, bytes, |_| Ok(()))
}

/// Like `write_atomic`, but runs `before_rename` once the temporary file
/// is fully written and synced.  If it fails, the temporary file is
/// removed and `path` is left untouched.
pub fn write_atomic_with<F>(path: &Path, bytes: &[u8], before_rename: F) -> Result<()>
where
    F: FnOnce(&Path) -> Result<()>,
{
    replace_file(path, bytes, before_rename, sync_dir)
}

// Once `persist` returns, the new contents are in place; an error after
// that point would make callers undo a change that is already on disk.
fn replace_file<F, S>(path: &Path, bytes: &[u8], before_rename: F, sync_parent: S) -> Result<()>
where
    F: FnOnce(&Path) -> Result<()>,
    S: FnOnce(&Path) -> Result<()>,
{
    // The temp file must live next to the target so the rename stays on
    // one filesystem.
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    // Dropping `tmp` on any early return deletes the temporary file.
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    before_rename(tmp.path())?;

    tmp.persist(path).map_err(|e| e.error)?;

    if let Err(e) = sync_parent(parent) {
        warn!(
            dir = %parent.display(),
            error = %e,
            "vault file replaced but directory sync failed"
        );
    }

    debug!(path = %path.display(), bytes = bytes.len(), "vault file replaced");
    Ok(())
}

/// Flush the directory entry so the rename itself survives a crash.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    fs::File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
