//! File-backed store: one file per key under a root directory.

use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tracing::debug;

use super::{KeyValueStore, StoreError};

pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: PathBuf) -> Result<Self, StoreError> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Map a key to a file name. Bytes outside `[A-Za-z0-9-]` are
    /// percent-encoded, so distinct keys always get distinct files.
    fn key_path(&self, key: &str) -> PathBuf {
        let mut name = String::with_capacity(key.len() + 5);
        for b in key.bytes() {
            if b.is_ascii_alphanumeric() || b == b'-' {
                name.push(b as char);
            } else {
                name.push_str(&format!("%{:02X}", b));
            }
        }
        name.push_str(".json");
        self.root.join(name)
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.key_path(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.key_path(key);
        let root = self.root.clone();
        let contents = value.to_string();

        // Each writer gets its own temp file; the rename replaces the entry whole
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let mut tmp = NamedTempFile::new_in(&root)?;
            tmp.write_all(contents.as_bytes())?;
            tmp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("write task failed: {e}")))??;

        debug!(key = key, bytes = value.len(), "Stored value");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        assert!(store.get("members:nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        store.set("members:g1", r#"{"ts":1,"members":[]}"#).await.unwrap();
        assert_eq!(
            store.get("members:g1").await.unwrap().as_deref(),
            Some(r#"{"ts":1,"members":[]}"#)
        );
    }

    #[tokio::test]
    async fn test_keys_are_namespaced_per_group() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        store.set("members:g1", "one").await.unwrap();
        store.set("members:g2", "two").await.unwrap();
        assert_eq!(store.get("members:g1").await.unwrap().as_deref(), Some("one"));
        assert_eq!(store.get("members:g2").await.unwrap().as_deref(), Some("two"));
        assert!(dir.path().join("members%3Ag1.json").exists());
    }

    #[tokio::test]
    async fn test_similar_group_ids_do_not_share_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        let keys = ["members:a.b", "members:a_b", "members:x:y", "members:x__y", "members:x%3Ay"];
        for key in keys {
            store.set(key, key).await.unwrap();
        }
        for key in keys {
            assert_eq!(store.get(key).await.unwrap().as_deref(), Some(key));
        }
    }

    #[tokio::test]
    async fn test_concurrent_writes_to_one_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        let values: Vec<String> = (0..10).map(|i| format!("value {i}")).collect();

        let results =
            futures::future::join_all(values.iter().map(|v| store.set("members:g1", v))).await;

        assert!(results.iter().all(|r| r.is_ok()));
        let stored = store.get("members:g1").await.unwrap().unwrap();
        assert!(values.contains(&stored));
        let files = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(files, 1);
    }

    #[test]
    fn test_key_path_stays_inside_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        let path = store.key_path("members:../etc/passwd");
        assert_eq!(path.parent(), Some(dir.path()));
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some("members%3A%2E%2E%2Fetc%2Fpasswd.json")
        );
    }
}
