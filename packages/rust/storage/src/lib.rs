//! Persisted run state for drivesite.
//!
//! Three small files live next to the generated site:
//! - [`ListingCache`]: the last full remote listing plus its fetch time
//! - [`ProcessedSet`]: ids of remote items that already produced a document
//! - [`KeywordQueue`]: names still available for renaming outputs
//!
//! **Access rules:** a single run owns all three files. No lock is taken;
//! concurrent runs against the same directory are unsupported. Every write
//! goes through [`write_atomic`] so a crash leaves either the old or the new
//! contents, never a torn file.

mod cache;
mod keywords;
mod processed;

use std::path::Path;

use drivesite_shared::{DriveSiteError, Result};
use tracing::debug;

pub use cache::{CacheStatus, ListingCache};
pub use keywords::KeywordQueue;
pub use processed::ProcessedSet;

/// Write `content` to `path` via a sibling temp file and a rename.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| DriveSiteError::io(parent, e))?;
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| DriveSiteError::validation(format!("not a file path: {}", path.display())))?;
    let temp = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

    std::fs::write(&temp, content).map_err(|e| DriveSiteError::io(&temp, e))?;
    if let Err(e) = std::fs::rename(&temp, path) {
        let _ = std::fs::remove_file(&temp);
        return Err(DriveSiteError::io(path, e));
    }

    debug!(path = %path.display(), bytes = content.len(), "wrote file");
    Ok(())
}

/// Write a JSON file (pretty-printed) atomically.
pub(crate) fn write_json<T: serde::Serialize>(path: &Path, data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| DriveSiteError::Serialization(format!("{}: {e}", path.display())))?;
    write_atomic(path, json.as_bytes())
}

/// Read a file to a string, mapping "not found" to `None`.
pub(crate) fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(DriveSiteError::io(path, e)),
    }
}

#[cfg(test)]
pub(crate) fn temp_dir() -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("ds-storage-test-{}", uuid::Uuid::now_v7()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_atomic_creates_parents_and_leaves_no_temp() {
        let tmp = temp_dir();
        let target = tmp.join("nested/state.json");

        write_atomic(&target, b"{}").unwrap();
        write_atomic(&target, b"{\"a\":1}").unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "{\"a\":1}");
        for entry in std::fs::read_dir(tmp.join("nested")).unwrap() {
            let name = entry.unwrap().file_name().to_string_lossy().to_string();
            assert!(!name.starts_with('.'), "temp file left behind: {name}");
        }

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn failed_rename_removes_temp_file() {
        let dir = temp_dir();
        let target = dir.join("taken.html");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("inner"), "x").unwrap();

        let err = write_atomic(&target, b"body").unwrap_err();

        assert!(matches!(err, DriveSiteError::Io { .. }));
        assert!(!dir.join(".taken.html.tmp").exists());
        assert!(target.is_dir());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn read_optional_missing_is_none() {
        let tmp = temp_dir();
        assert!(read_optional(&tmp.join("absent.json")).unwrap().is_none());
        let _ = std::fs::remove_dir_all(&tmp);
    }
}
