//! services/api/src/adapters/json_store.rs
//!
//! This module contains the storage adapter, the concrete implementation of the
//! `SubscriptionRepository` and `SettingsRepository` ports. Each collection is a
//! single pretty-printed JSON document under the data directory, read and
//! rewritten whole on every operation.
//!
//! There is no file locking: two concurrent writers can lose an update.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use subtrack_core::domain::{Settings, Subscription};
use subtrack_core::ports::{PortError, PortResult, SettingsRepository, SubscriptionRepository};
use tracing::{debug, info};
use uuid::Uuid;

const SUBSCRIPTIONS_FILE: &str = "subscriptions.json";
const SETTINGS_FILE: &str = "settings.json";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A file-backed store that implements both storage ports.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    data_dir: PathBuf,
}

impl JsonFileStore {
    /// Creates a new `JsonFileStore` rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn subscriptions_path(&self) -> PathBuf {
        self.data_dir.join(SUBSCRIPTIONS_FILE)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join(SETTINGS_FILE)
    }

    /// Reads the subscriptions document, creating an empty one if it is missing.
    async fn read_subscriptions(&self) -> PortResult<Vec<Subscription>> {
        let path = self.subscriptions_path();
        match read_json::<Vec<Subscription>>(&path).await? {
            Some(subscriptions) => Ok(subscriptions),
            None => {
                info!("Creating empty subscriptions file at {}", path.display());
                write_json(&path, &Vec::<Subscription>::new()).await?;
                Ok(Vec::new())
            }
        }
    }

    async fn write_subscriptions(&self, subscriptions: &[Subscription]) -> PortResult<()> {
        write_json(&self.subscriptions_path(), &subscriptions).await
    }
}

/// Gives every record without an identifier a fresh one. Returns whether any changed.
fn backfill_ids(subscriptions: &mut [Subscription]) -> bool {
    let mut modified = false;
    for subscription in subscriptions.iter_mut() {
        let missing = subscription
            .id
            .as_deref()
            .map_or(true, |id| id.trim().is_empty());
        if missing {
            subscription.id = Some(Uuid::new_v4().to_string());
            modified = true;
        }
    }
    modified
}

//=========================================================================================
// File helpers
//=========================================================================================

/// Returns `None` when the file does not exist.
async fn read_json<T: DeserializeOwned>(path: &Path) -> PortResult<Option<T>> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(PortError::Unexpected(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            )))
        }
    };
    serde_json::from_str(&raw).map(Some).map_err(|e| {
        PortError::Unexpected(format!("Failed to parse {}: {}", path.display(), e))
    })
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> PortResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to create {}: {}", parent.display(), e)))?;
    }
    let body = serde_json::to_string_pretty(value)
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
    tokio::fs::write(path, body)
        .await
        .map_err(|e| PortError::Unexpected(format!("Failed to write {}: {}", path.display(), e)))
}

//=========================================================================================
// `SubscriptionRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl SubscriptionRepository for JsonFileStore {
    async fn list_subscriptions(&self) -> PortResult<Vec<Subscription>> {
        let mut subscriptions = self.read_subscriptions().await?;
        if backfill_ids(&mut subscriptions) {
            debug!("Backfilled missing subscription identifiers");
            self.write_subscriptions(&subscriptions).await?;
        }
        Ok(subscriptions)
    }

    async fn save_subscription(&self, subscription: Subscription) -> PortResult<Subscription> {
        let mut subscriptions = self.list_subscriptions().await?;

        let existing = subscription
            .id
            .as_deref()
            .and_then(|id| subscriptions.iter().position(|s| s.id.as_deref() == Some(id)));

        let saved = match existing {
            Some(index) => {
                subscriptions[index].merge_from(subscription);
                subscriptions[index].clone()
            }
            None => {
                let mut created = subscription;
                created.id = Some(Uuid::new_v4().to_string());
                subscriptions.push(created.clone());
                created
            }
        };

        self.write_subscriptions(&subscriptions).await?;
        Ok(saved)
    }

    async fn delete_subscription(&self, id: &str) -> PortResult<()> {
        let subscriptions = self.list_subscriptions().await?;
        let remaining: Vec<Subscription> = subscriptions
            .into_iter()
            .filter(|s| s.id.as_deref() != Some(id))
            .collect();
        self.write_subscriptions(&remaining).await
    }
}

//=========================================================================================
// `SettingsRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl SettingsRepository for JsonFileStore {
    async fn load_settings(&self) -> PortResult<Settings> {
        Ok(read_json::<Settings>(&self.settings_path())
            .await?
            .unwrap_or_default())
    }

    async fn save_settings(&self, settings: &Settings) -> PortResult<()> {
        write_json(&self.settings_path(), settings).await
    }
}
