//! Crash-safe file replacement.

use crate::errors::{RepoError, Result};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use tracing::debug;

/// Write `path` through a sibling temporary file that is renamed over it once
/// complete. On any failure the temporary file is removed and `path` is left
/// as it was.
pub fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let fail = |source: io::Error| RepoError::Persistence {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(fail)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".ideapress-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(fail)?;
    debug!(tmp = %tmp.path().display(), target = %path.display(), "writing");

    if let Err(e) = write(tmp.as_file_mut()).and_then(|()| tmp.as_file().sync_all()) {
        // ignore cleanup errors; the write error is the one to report
        let _ = tmp.close();
        return Err(fail(e));
    }

    // A failed rename hands the temp file back; dropping it deletes it.
    tmp.persist(path).map_err(|e| fail(e.error))?;
    Ok(())
}
