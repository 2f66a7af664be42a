//! The persistence boundary: a `RunStore` trait plus one reference
//! implementation backed by atomically-written JSON files.
//!
//! An external key-value store (the original system used Redis, including a
//! TTL on stored runs) is the collaborator's concern; `FileRunStore` exists
//! so the kernel has something real to run against, not a production-grade
//! store of its own.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::StoreError;

#[async_trait]
pub trait RunStore: Send + Sync {
    async fn save_update<T: Serialize + Send + Sync>(&self, update: &T) -> Result<(), StoreError>;
    async fn load_updates<T: DeserializeOwned + Send>(&self) -> Result<Vec<T>, StoreError>;
    async fn save_results<T: Serialize + Send + Sync>(&self, results: &T) -> Result<(), StoreError>;
    async fn load_results<T: DeserializeOwned + Send>(&self) -> Result<Option<T>, StoreError>;
    async fn clear_run(&self) -> Result<(), StoreError>;
}

/// Returns `$XDG_STATE_HOME` or `~/.local/state` if unset, matching the
/// teacher's `xdg_state_home` helper.
fn xdg_state_home() -> PathBuf {
    if let Ok(dir) = std::env::var("XDG_STATE_HOME") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".local").join("state")
}

fn run_dir(run_id: &str) -> PathBuf {
    xdg_state_home().join("sim").join(run_id)
}

/// Atomically writes `contents` to `path` by writing to a sibling temp file
/// and renaming over the destination.
async fn write_atomic(path: &Path, contents: Vec<u8>) -> Result<(), StoreError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = path.with_extension("tmp");
        std::fs::write(&tmp_path, &contents)?;
        std::fs::rename(&tmp_path, &path)?;
        Ok(())
    })
    .await
    .expect("blocking task panicked")
}

async fn read_if_exists(path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<Option<Vec<u8>>, StoreError> {
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    })
    .await
    .expect("blocking task panicked")
}

/// JSON-file-backed `RunStore`, one directory per run under
/// `$XDG_STATE_HOME/sim/<run_id>/`: `updates.jsonl` appended one snapshot per
/// line, `results.json` holding the final results record.
pub struct FileRunStore {
    dir: PathBuf,
}

impl FileRunStore {
    pub fn new(run_id: &str) -> Self {
        FileRunStore { dir: run_dir(run_id) }
    }

    fn updates_path(&self) -> PathBuf {
        self.dir.join("updates.jsonl")
    }

    fn results_path(&self) -> PathBuf {
        self.dir.join("results.json")
    }
}

#[async_trait]
impl RunStore for FileRunStore {
    async fn save_update<T: Serialize + Send + Sync>(&self, update: &T) -> Result<(), StoreError> {
        let mut existing = read_if_exists(&self.updates_path())
            .await?
            .unwrap_or_default();
        let mut line = serde_json::to_vec(update)?;
        existing.append(&mut line);
        existing.push(b'\n');
        write_atomic(&self.updates_path(), existing).await
    }

    async fn load_updates<T: DeserializeOwned + Send>(&self) -> Result<Vec<T>, StoreError> {
        let Some(bytes) = read_if_exists(&self.updates_path()).await? else {
            return Ok(Vec::new());
        };
        let text = String::from_utf8_lossy(&bytes);
        let mut updates = Vec::new();
        for line in text.lines().filter(|l| !l.is_empty()) {
            updates.push(serde_json::from_str(line)?);
        }
        Ok(updates)
    }

    async fn save_results<T: Serialize + Send + Sync>(&self, results: &T) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(results)?;
        write_atomic(&self.results_path(), bytes).await
    }

    async fn load_results<T: DeserializeOwned + Send>(&self) -> Result<Option<T>, StoreError> {
        let Some(bytes) = read_if_exists(&self.results_path()).await? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn clear_run(&self) -> Result<(), StoreError> {
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            match std::fs::remove_dir_all(&dir) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .expect("blocking task panicked")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Dummy {
        n: u32,
    }

    fn unique_store() -> FileRunStore {
        let id = format!("test-run-{:?}", std::thread::current().id());
        FileRunStore::new(&id)
    }

    #[tokio::test]
    async fn round_trips_updates_and_results() {
        let store = unique_store();
        store.clear_run().await.unwrap();

        store.save_update(&Dummy { n: 1 }).await.unwrap();
        store.save_update(&Dummy { n: 2 }).await.unwrap();
        let updates: Vec<Dummy> = store.load_updates().await.unwrap();
        assert_eq!(updates, vec![Dummy { n: 1 }, Dummy { n: 2 }]);

        assert!(store.load_results::<Dummy>().await.unwrap().is_none());
        store.save_results(&Dummy { n: 42 }).await.unwrap();
        assert_eq!(store.load_results::<Dummy>().await.unwrap(), Some(Dummy { n: 42 }));

        store.clear_run().await.unwrap();
        assert!(store.load_updates::<Dummy>().await.unwrap().is_empty());
    }
}
