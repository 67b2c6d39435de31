//! 파일 기반 로컬 저장소 어댑터.
//! id마다 `<dir>/.local_storage_<id>.json` 파일 하나에 키-값을 보관한다.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result, bail};
use tracing::debug;

use crate::application::ports::{KeyValueStore, StorageProvider};

const FILE_PREFIX: &str = ".local_storage_";

/// 저장소 파일을 만들 디렉터리를 가진 팩토리.
#[derive(Debug, Clone)]
pub struct FileStorageProvider {
    dir: PathBuf,
}

impl Default for FileStorageProvider {
    fn default() -> Self {
        Self {
            dir: std::env::temp_dir(),
        }
    }
}

impl FileStorageProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl StorageProvider for FileStorageProvider {
    fn open(&self, id: &str) -> Result<Arc<dyn KeyValueStore>> {
        let store = FileLocalStorage::open(&self.dir, id)?;
        Ok(Arc::new(store))
    }
}

/// JSON 파일 하나에 대응하는 키-값 저장소. 쓰기마다 파일 전체를 다시 쓴다.
#[derive(Debug)]
pub struct FileLocalStorage {
    path: PathBuf,
    items: Mutex<BTreeMap<String, String>>,
}

impl FileLocalStorage {
    pub fn open(dir: &Path, id: &str) -> Result<Self> {
        if id.is_empty() || id.contains(['/', '\\']) {
            bail!("invalid local storage id `{id}`");
        }
        let path = dir.join(format!("{FILE_PREFIX}{id}.json"));
        let items = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("failed to read local storage at {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse local storage in {}", path.display()))?
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), "local storage opened");
        Ok(Self {
            path,
            items: Mutex::new(items),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, items: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        let rendered = serde_json::to_string_pretty(items)?;
        fs::write(&self.path, format!("{rendered}\n"))
            .with_context(|| format!("failed to write local storage at {}", self.path.display()))
    }
}

impl KeyValueStore for FileLocalStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.lock();
        items.insert(key.to_string(), value.to_string());
        self.persist(&items)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut items = self.lock();
        if items.remove(key).is_some() {
            self.persist(&items)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FileStorageProvider::new(dir.path());

        let store = provider.open("app").unwrap();
        store.set_item("theme", "dark").unwrap();
        store.set_item("lang", "ko").unwrap();
        store.remove_item("lang").unwrap();

        let reopened = provider.open("app").unwrap();
        assert_eq!(reopened.get_item("theme").unwrap().as_deref(), Some("dark"));
        assert_eq!(reopened.get_item("lang").unwrap(), None);
        assert!(dir.path().join(".local_storage_app.json").exists());
    }

    #[test]
    fn ids_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FileStorageProvider::new(dir.path());
        provider.open("a").unwrap().set_item("k", "1").unwrap();
        assert_eq!(provider.open("b").unwrap().get_item("k").unwrap(), None);
    }

    #[test]
    fn rejects_path_like_ids() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FileLocalStorage::open(dir.path(), "../x").is_err());
        assert!(FileLocalStorage::open(dir.path(), "").is_err());
    }
}
