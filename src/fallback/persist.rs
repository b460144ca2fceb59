//! Whole-file JSON persistence for disk-backed fallback collections.
//!
//! Load reads the entire file; save rewrites it through a temporary file in
//! the same directory followed by a rename, so a crash mid-write leaves either
//! the previous or the new collection on disk, never a torn one.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::warn;

use crate::error::{MarketplaceError, MarketplaceResult};

/// Load a JSON list; a missing or unreadable file yields an empty list
pub fn load_json_list<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(error) => {
            warn!(
                path = %path.display(),
                error = %error,
                "Fallback file unreadable, starting with an empty collection"
            );
            return Vec::new();
        }
    };

    if raw.trim().is_empty() {
        return Vec::new();
    }

    match serde_json::from_str(&raw) {
        Ok(items) => items,
        Err(error) => {
            warn!(
                path = %path.display(),
                error = %error,
                "Fallback file corrupt, starting with an empty collection"
            );
            Vec::new()
        }
    }
}

/// Atomically replace `path` with the pretty-printed JSON of `items`
pub fn write_json_atomic<T: Serialize>(path: &Path, items: &[T]) -> MarketplaceResult<()> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(directory)?;

    let body = serde_json::to_vec_pretty(items)?;

    let mut staged = NamedTempFile::new_in(directory)?;
    staged.write_all(&body)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|error| {
        MarketplaceError::StorageError(format!(
            "failed to replace {}: {}",
            path.display(),
            error.error
        ))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let items: Vec<String> = load_json_list(&dir.path().join("absent.json"));
        assert!(items.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "[{\"id\": ").unwrap();

        let items: Vec<serde_json::Value> = load_json_list(&path);
        assert!(items.is_empty());
    }

    #[test]
    fn test_write_creates_directories_and_replaces() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("list.json");

        write_json_atomic(&path, &["a".to_string(), "b".to_string()]).unwrap();
        write_json_atomic(&path, &["c".to_string()]).unwrap();

        let items: Vec<String> = load_json_list(&path);
        assert_eq!(items, vec!["c".to_string()]);

        let leftovers = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1, "temporary files must not be left behind");
    }
}
