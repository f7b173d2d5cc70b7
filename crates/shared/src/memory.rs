//! Flat JSON file recording which articles were already turned into videos.
//!
//! The file holds a JSON array of title hashes. It is read once at the start
//! of a run and rewritten wholesale at the end; there is no locking, so only
//! one run may use a given file at a time.

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::MemoryError;

const MEMORY_FILE_NAME: &str = "video_memory.json";

/// Hashes of every article that has been published
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishedSet {
    hashes: BTreeSet<String>,
}

impl PublishedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.hashes.contains(hash)
    }

    /// Returns false if the hash was already present.
    pub fn insert(&mut self, hash: impl Into<String>) -> bool {
        self.hashes.insert(hash.into())
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.hashes.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for PublishedSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            hashes: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Default location of the memory file
pub fn default_memory_path() -> PathBuf {
    match dirs::data_local_dir() {
        Some(data_dir) => data_dir.join("news-shorts").join(MEMORY_FILE_NAME),
        None => PathBuf::from(MEMORY_FILE_NAME),
    }
}

/// Load the published set. A missing or unreadable file yields an empty set.
pub fn load_published(path: &Path) -> PublishedSet {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!("No memory file at {}, starting empty", path.display());
            return PublishedSet::new();
        }
        Err(e) => {
            tracing::warn!("Could not read memory file {}: {}", path.display(), e);
            return PublishedSet::new();
        }
    };

    match serde_json::from_str::<Vec<String>>(&content) {
        Ok(hashes) => hashes.into_iter().collect(),
        Err(e) => {
            tracing::warn!(
                "Memory file {} is not a JSON list of hashes ({}), starting empty",
                path.display(),
                e
            );
            PublishedSet::new()
        }
    }
}

/// Overwrite the memory file with the full set
pub fn save_published(path: &Path, published: &PublishedSet) -> Result<(), MemoryError> {
    let write_err = |source| MemoryError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
    }

    let hashes: Vec<&str> = published.iter().collect();
    let json = serde_json::to_string_pretty(&hashes)?;

    fs::write(path, json).map_err(write_err)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memory.json");

        let published: PublishedSet = ["b2", "a1", "c3"].into_iter().collect();
        save_published(&path, &published).unwrap();

        assert_eq!(load_published(&path), published);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let loaded = load_published(&dir.path().join("absent.json"));
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memory.json");

        fs::write(&path, "{not json").unwrap();
        assert!(load_published(&path).is_empty());

        fs::write(&path, r#"{"hashes": ["abc"]}"#).unwrap();
        assert!(load_published(&path).is_empty());
    }

    #[test]
    fn test_save_overwrites_and_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("memory.json");

        let first: PublishedSet = ["aaa", "bbb"].into_iter().collect();
        save_published(&path, &first).unwrap();

        let second: PublishedSet = ["ccc"].into_iter().collect();
        save_published(&path, &second).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let on_disk: Vec<String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(on_disk, vec!["ccc".to_string()]);
    }

    #[test]
    fn test_insert_reports_duplicates() {
        let mut published = PublishedSet::new();
        assert!(published.insert("abc"));
        assert!(!published.insert("abc"));
        assert_eq!(published.len(), 1);
        assert!(published.contains("abc"));
    }
}
