//! API key storage
//!
//! Keys are scoped per service, with optional per-profile overrides stored
//! under `"{service}_{profile_id}"`. Lookups fall back from the profile key
//! to the global service key. A missing key is `Ok(None)`, never an error.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::models::LlmService;

pub trait SecretStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;
}

/// Helpers over the raw key/value contract
pub trait SecretStoreExt: SecretStore {
    /// Global key for a service
    fn service_key(&self, service: LlmService) -> Result<Option<String>> {
        self.get(service.key_name())
    }

    /// Profile-scoped key, falling back to the global service key
    fn profile_key(&self, service: LlmService, profile_key_id: &str) -> Result<Option<String>> {
        let scoped = format!("{}_{}", service.key_name(), profile_key_id);
        if let Some(key) = self.get(&scoped)? {
            return Ok(Some(key));
        }
        self.service_key(service)
    }
}

impl<T: SecretStore + ?Sized> SecretStoreExt for T {}

/// Secrets kept in a JSON file under the platform data directory
///
/// Stands in for an OS keychain; file permissions are the only protection.
pub struct FileSecretStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileSecretStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create secrets directory")?;
        }

        let entries = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read secrets file {:?}", path))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse secrets file {:?}", path))?
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("voxnotes")
            .join("secrets.json")
    }

    fn persist(&self, entries: &HashMap<String, String>) -> Result<()> {
        let contents = serde_json::to_string_pretty(entries)
            .context("Failed to serialize secrets")?;
        fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write secrets file {:?}", self.path))?;
        Ok(())
    }
}

impl SecretStore for FileSecretStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}

/// In-memory store for tests
#[derive(Default)]
pub struct MemorySecretStore {
    entries: Mutex<HashMap<String, String>>,
}

impl SecretStore for MemorySecretStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}
