//! Named snapshots of the open-file set.
//!
//! A cache blob maps each path to the raw lines and mtime it had when the
//! blob was written. Loading one repopulates the store with cold buffers;
//! files whose mtime still matches skip the disk read.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::key::slashed;
use crate::{CoreError, CoreResult};

/// Directory under the data dir holding blobs.
const CACHE_DIR: &str = "cache";
const CACHE_EXT: &str = "json";

/// One file as cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedFile {
    pub lines: Vec<String>,
    pub mtime: Option<SystemTime>,
}

/// A cache blob: path -> cached file.
pub type CacheBlob = BTreeMap<String, CachedFile>;

/// Blob name for user input: words joined with `_`.
pub fn blob_name(words: &[&str]) -> String {
    words
        .iter()
        .filter(|w| !w.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_")
}

/// Location of the blob called `name`.
pub fn blob_path(data_dir: &Path, name: &str) -> PathBuf {
    data_dir.join(CACHE_DIR).join(format!("{}.{}", name, CACHE_EXT))
}

/// Writes a blob built from `files`.
pub fn save(data_dir: &Path, name: &str, files: Vec<(PathBuf, CachedFile)>) -> CoreResult<usize> {
    let blob: CacheBlob = files
        .into_iter()
        .map(|(path, cached)| (slashed(&path), cached))
        .collect();
    let path = blob_path(data_dir, name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| CoreError::file(parent, e))?;
    }
    let json = serde_json::to_string(&blob)?;
    std::fs::write(&path, json).map_err(|e| CoreError::file(&path, e))?;
    Ok(blob.len())
}

/// Reads the blob called `name`.
pub fn load(data_dir: &Path, name: &str) -> CoreResult<CacheBlob> {
    let path = blob_path(data_dir, name);
    let json = std::fs::read_to_string(&path).map_err(|e| CoreError::file(&path, e))?;
    Ok(serde_json::from_str(&json)?)
}

pub fn exists(data_dir: &Path, name: &str) -> bool {
    blob_path(data_dir, name).is_file()
}

/// Names of every saved blob, sorted.
pub fn names(data_dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(data_dir.join(CACHE_DIR)) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == CACHE_EXT))
        .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_name() {
        assert_eq!(blob_name(&["my", "project"]), "my_project");
        assert_eq!(blob_name(&["", "x"]), "x");
        assert_eq!(blob_name(&[]), "");
    }

    #[test]
    fn test_save_load_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![(
            PathBuf::from("/work/a.txt"),
            CachedFile {
                lines: vec!["a\n".to_string()],
                mtime: Some(SystemTime::UNIX_EPOCH),
            },
        )];
        assert_eq!(save(dir.path(), "proj", files).unwrap(), 1);
        assert!(exists(dir.path(), "proj"));

        let blob = load(dir.path(), "proj").unwrap();
        assert_eq!(blob["/work/a.txt"].lines, vec!["a\n".to_string()]);
        assert_eq!(names(dir.path()), vec!["proj".to_string()]);
    }

    #[test]
    fn test_missing_blob() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!exists(dir.path(), "nope"));
        assert!(matches!(load(dir.path(), "nope"), Err(CoreError::File { .. })));
        assert!(names(dir.path()).is_empty());
    }
}
