//! File system helpers shared by the file-backed stores.

use crate::{IntakeError, IntakeResult};
use std::{
    fs,
    io::{self, ErrorKind, Write},
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

/// Attempts made to claim a fresh record file before giving up.
pub(crate) const MAX_CLAIM_ATTEMPTS: usize = 5;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

pub(crate) fn ensure_dir(dir: &Path) -> IntakeResult<()> {
    fs::create_dir_all(dir).map_err(IntakeError::StorageDirCreation)
}

/// Reads a file, mapping "not found" to `None`.
pub(crate) fn read_optional(path: &Path) -> IntakeResult<Option<String>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(IntakeError::FileRead(e)),
    }
}

/// Replaces `path` with `contents` by writing a sibling temporary file and renaming it into
/// place. Readers see either the old document or the new one, never a partial write.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> IntakeResult<()> {
    let dir = path.parent().ok_or_else(|| {
        IntakeError::FileWrite(io::Error::new(
            ErrorKind::InvalidInput,
            format!("{} has no parent directory", path.display()),
        ))
    })?;
    ensure_dir(dir)?;

    let temp_path = temp_sibling(dir, path);
    let result = (|| {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&temp_path, path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&temp_path);
        return Err(IntakeError::FileWrite(e));
    }
    Ok(())
}

fn temp_sibling(dir: &Path, path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    dir.join(format!(".{name}.{}.{n}.tmp", std::process::id()))
}

/// Creates `path` only if nothing exists there yet.
///
/// Returns `Ok(None)` when the path is already taken so the caller can try another name.
pub(crate) fn create_new_file(path: &Path) -> IntakeResult<Option<fs::File>> {
    match fs::OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => Ok(Some(file)),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(None),
        Err(e) => Err(IntakeError::FileWrite(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn read_optional_maps_missing_to_none() {
        let temp = TempDir::new().unwrap();
        assert_eq!(read_optional(&temp.path().join("absent.json")).unwrap(), None);
    }

    #[test]
    fn write_atomic_replaces_and_leaves_no_temp_files() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("doc.json");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(read_optional(&path).unwrap().as_deref(), Some("second"));
        let entries: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn create_new_file_refuses_existing_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("1.yaml");
        assert!(create_new_file(&path).unwrap().is_some());
        assert!(create_new_file(&path).unwrap().is_none());
    }
}
