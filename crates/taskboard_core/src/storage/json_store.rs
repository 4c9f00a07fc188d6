use crate::error::AppError;
use crate::storage::kv::KvStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const SCHEMA_VERSION: u32 = 1;
const STORE_FILE_NAME: &str = "store.json";

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntries {
    schema_version: u32,
    entries: BTreeMap<String, String>,
}

/// File-backed key-value store: one JSON document holding every key.
/// Each operation reads and rewrites the whole file, which keeps calls
/// independent the way the storage contract requires.
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn open_default() -> Result<Self, AppError> {
        Ok(Self::new(store_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>, AppError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = std::fs::read_to_string(&self.path)
            .map_err(|err| AppError::storage_read(err.to_string()))?;
        let stored: StoredEntries = serde_json::from_str(&content)
            .map_err(|err| AppError::storage_read(err.to_string()))?;

        if !(1..=SCHEMA_VERSION).contains(&stored.schema_version) {
            return Err(AppError::storage_read("schema_version mismatch"));
        }

        Ok(stored.entries)
    }

    fn write_entries(&self, entries: BTreeMap<String, String>) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|err| AppError::storage_write(err.to_string()))?;
        }

        let stored = StoredEntries {
            schema_version: SCHEMA_VERSION,
            entries,
        };
        let content = serde_json::to_string_pretty(&stored)
            .map_err(|err| AppError::storage_write(err.to_string()))?;
        std::fs::write(&self.path, content)
            .map_err(|err| AppError::storage_write(err.to_string()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.path, permissions)
                .map_err(|err| AppError::storage_write(err.to_string()))?;
        }

        Ok(())
    }
}

impl KvStore for JsonStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.read_entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let mut entries = self.read_entries()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_entries(entries)
    }

    fn delete(&self, key: &str) -> Result<(), AppError> {
        let mut entries = self
            .read_entries()
            .map_err(|err| AppError::storage_delete(err.message().to_string()))?;
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.write_entries(entries)
            .map_err(|err| AppError::storage_delete(err.message().to_string()))
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, AppError> {
        Ok(self
            .read_entries()?
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}

pub fn store_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var("TASKBOARD_STORE_PATH")
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata = std::env::var("APPDATA")
            .map_err(|_| AppError::storage_read("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata)
            .join("taskboard")
            .join(STORE_FILE_NAME))
    } else {
        let home =
            std::env::var("HOME").map_err(|_| AppError::storage_read("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("taskboard")
            .join(STORE_FILE_NAME))
    }
}
