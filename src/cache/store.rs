//! Filesystem-backed response store

use crate::cache::CacheEntry;
use crate::error::Result;
use dashmap::DashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Key → entry store rooted at a directory
///
/// Every entry lives in `<dir>/<key>.json`. Writes go to a temporary file
/// that is renamed into place, so concurrent readers never see a partial
/// entry. Entries read or written during the store's lifetime are mirrored
/// in memory.
pub struct FileCacheStore {
    dir: PathBuf,
    memory: DashMap<String, CacheEntry>,
}

impl FileCacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            memory: DashMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Load an entry, `None` if nothing is stored under `key`
    pub async fn load(&self, key: &str) -> Result<Option<CacheEntry>> {
        if let Some(entry) = self.memory.get(key) {
            return Ok(Some(entry.clone()));
        }

        let raw = match fs::read_to_string(self.path_for(key)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let entry: CacheEntry = serde_json::from_str(&raw)?;
        self.memory.insert(key.to_string(), entry.clone());
        Ok(Some(entry))
    }

    /// Store an entry under its request key, replacing any previous one
    pub async fn save(&self, entry: &CacheEntry) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(&entry.request_key);
        let tmp = self
            .dir
            .join(format!(".{}.{}.tmp", entry.request_key, Uuid::new_v4()));

        fs::write(&tmp, serde_json::to_vec(entry)?).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        self.memory
            .insert(entry.request_key.clone(), entry.clone());
        Ok(())
    }

    /// Number of entries mirrored in memory
    pub fn cached_in_memory(&self) -> usize {
        self.memory.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use reqwest::header::HeaderMap;

    fn entry(key: &str, body: &str) -> CacheEntry {
        CacheEntry::new(key, 200, &HeaderMap::new(), body.to_string(), Utc::now(), 60)
    }

    #[tokio::test]
    async fn test_missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCacheStore::new(dir.path());

        assert!(store.load("nothing").await.unwrap().is_none());
        assert_eq!(store.cached_in_memory(), 0);
    }

    #[tokio::test]
    async fn test_entries_survive_a_new_store() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = dir.path().join("github");

        let store = FileCacheStore::new(&cache_dir);
        store.save(&entry("abc", "[1]")).await.unwrap();
        store.save(&entry("abc", "[2]")).await.unwrap();
        assert_eq!(store.cached_in_memory(), 1);

        let reopened = FileCacheStore::new(&cache_dir);
        let loaded = reopened.load("abc").await.unwrap().unwrap();
        assert_eq!(loaded.body, "[2]");
        assert_eq!(reopened.cached_in_memory(), 1);

        // No temporary files left behind
        let files: Vec<_> = std::fs::read_dir(&cache_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(files, vec!["abc.json".to_string()]);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), "{not json").unwrap();

        let store = FileCacheStore::new(dir.path());
        assert!(store.load("bad").await.is_err());
    }

    #[tokio::test]
    async fn test_unwritable_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        let store = FileCacheStore::new(blocker.join("github"));
        assert!(store.save(&entry("abc", "[]")).await.is_err());
        assert_eq!(store.cached_in_memory(), 0);
    }
}
