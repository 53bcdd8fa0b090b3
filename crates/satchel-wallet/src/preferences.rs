//! [`Preferences`] implementations: in-memory and a JSON file on disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use satchel_core::error::PreferencesError;
use satchel_core::traits::Preferences;
use serde::{Deserialize, Serialize};

/// The four persisted wallet fields.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct StoredPreferences {
    pub address: String,
    pub private_key: String,
    pub is_encrypted: bool,
    pub last_balance: u64,
}

/// Preferences held in process memory. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    fields: Mutex<StoredPreferences>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing field values.
    pub fn with_fields(fields: StoredPreferences) -> Self {
        Self {
            fields: Mutex::new(fields),
        }
    }

    /// Copy of the current field values.
    pub fn snapshot(&self) -> StoredPreferences {
        self.fields.lock().clone()
    }
}

#[async_trait]
impl Preferences for MemoryPreferences {
    async fn address(&self) -> Result<String, PreferencesError> {
        Ok(self.fields.lock().address.clone())
    }

    async fn set_address(&self, address: &str) -> Result<(), PreferencesError> {
        self.fields.lock().address = address.to_string();
        Ok(())
    }

    async fn private_key(&self) -> Result<String, PreferencesError> {
        Ok(self.fields.lock().private_key.clone())
    }

    async fn set_private_key(&self, key: &str) -> Result<(), PreferencesError> {
        self.fields.lock().private_key = key.to_string();
        Ok(())
    }

    async fn is_encrypted(&self) -> Result<bool, PreferencesError> {
        Ok(self.fields.lock().is_encrypted)
    }

    async fn set_is_encrypted(&self, encrypted: bool) -> Result<(), PreferencesError> {
        self.fields.lock().is_encrypted = encrypted;
        Ok(())
    }

    async fn last_balance(&self) -> Result<u64, PreferencesError> {
        Ok(self.fields.lock().last_balance)
    }

    async fn set_last_balance(&self, balance: u64) -> Result<(), PreferencesError> {
        self.fields.lock().last_balance = balance;
        Ok(())
    }
}

/// Preferences stored as one JSON document on disk.
///
/// Every setter rewrites the whole file through a temporary sibling and a
/// rename, so a crash leaves either the old or the new document. A missing
/// file reads as all defaults.
#[derive(Debug)]
pub struct JsonFilePreferences {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonFilePreferences {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<StoredPreferences, PreferencesError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| PreferencesError::Serialization(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoredPreferences::default()),
            Err(e) => Err(PreferencesError::Io(e.to_string())),
        }
    }

    async fn update(
        &self,
        apply: impl FnOnce(&mut StoredPreferences),
    ) -> Result<(), PreferencesError> {
        let _guard = self.write_lock.lock().await;
        let mut fields = self.load().await?;
        apply(&mut fields);

        let bytes = serde_json::to_vec_pretty(&fields)
            .map_err(|e| PreferencesError::Serialization(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| PreferencesError::Io(e.to_string()))?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| PreferencesError::Io(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| PreferencesError::Io(e.to_string()))
    }
}

#[async_trait]
impl Preferences for JsonFilePreferences {
    async fn address(&self) -> Result<String, PreferencesError> {
        Ok(self.load().await?.address)
    }

    async fn set_address(&self, address: &str) -> Result<(), PreferencesError> {
        self.update(|f| f.address = address.to_string()).await
    }

    async fn private_key(&self) -> Result<String, PreferencesError> {
        Ok(self.load().await?.private_key)
    }

    async fn set_private_key(&self, key: &str) -> Result<(), PreferencesError> {
        self.update(|f| f.private_key = key.to_string()).await
    }

    async fn is_encrypted(&self) -> Result<bool, PreferencesError> {
        Ok(self.load().await?.is_encrypted)
    }

    async fn set_is_encrypted(&self, encrypted: bool) -> Result<(), PreferencesError> {
        self.update(|f| f.is_encrypted = encrypted).await
    }

    async fn last_balance(&self) -> Result<u64, PreferencesError> {
        Ok(self.load().await?.last_balance)
    }

    async fn set_last_balance(&self, balance: u64) -> Result<(), PreferencesError> {
        self.update(|f| f.last_balance = balance).await
    }
}
