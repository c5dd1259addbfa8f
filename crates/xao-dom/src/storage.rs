//! File access under co-operative advisory locks.
//!
//! Reads take a shared lock, writes an exclusive one. The lock is released
//! whether or not the I/O call succeeded.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;

use fs2::FileExt;
use tracing::debug;

use crate::error::{DomError, Result};

/// Read a whole file while holding a shared lock on it.
pub fn read_locked(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    file.lock_shared().map_err(|source| DomError::Lock {
        kind: "shared",
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "shared lock acquired");

    let mut data = String::new();
    let read = file.read_to_string(&mut data);
    let unlocked = FileExt::unlock(&file);
    read?;
    unlocked?;
    Ok(data)
}

/// Replace the contents of an existing file while holding an exclusive lock.
///
/// The file is truncated only once the lock is held, so a concurrent reader
/// never observes a half-written document.
pub fn write_locked(path: &Path, contents: &str) -> Result<()> {
    if !path.exists() {
        return Err(DomError::FileNotFound(path.to_path_buf()));
    }

    let mut file = OpenOptions::new().write(true).open(path)?;
    file.lock_exclusive().map_err(|source| DomError::Lock {
        kind: "exclusive",
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "exclusive lock acquired");

    let written = overwrite(&mut file, contents);
    let unlocked = FileExt::unlock(&file);
    written?;
    unlocked?;
    Ok(())
}

fn overwrite(file: &mut File, contents: &str) -> std::io::Result<()> {
    file.set_len(0)?;
    file.write_all(contents.as_bytes())?;
    file.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_locked_returns_contents() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(tmp, "<a/>").unwrap();
        assert_eq!(read_locked(tmp.path()).unwrap(), "<a/>");
    }

    #[test]
    fn write_locked_truncates_previous_contents() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(tmp, "<long-previous-content/>").unwrap();
        write_locked(tmp.path(), "<b/>").unwrap();
        assert_eq!(std::fs::read_to_string(tmp.path()).unwrap(), "<b/>");
    }

    #[test]
    fn write_locked_requires_existing_target() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.xml");
        let err = write_locked(&missing, "<b/>").unwrap_err();
        assert!(matches!(err, DomError::FileNotFound(_)));
        assert!(!missing.exists());
    }
}
