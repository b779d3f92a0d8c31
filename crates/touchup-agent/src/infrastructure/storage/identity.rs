//! Durable storage of the touchscreen identity cue.
//!
//! The cue is only written after the user confirms a touchscreen, and the
//! write happens off the coordinator task so a slow disk can never delay
//! touch handling.

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;
use touchup_core::IdentityCue;

use super::config::{load_config_from, save_config_to, ConfigError};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The blocking write task panicked or was cancelled.
    #[error("identity store task failed: {0}")]
    Task(String),
}

/// Persists the identity cue.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn save_cue(&self, cue: &IdentityCue) -> Result<(), StoreError>;
}

/// Stores the cue in the `[identity]` section of the TOML config file,
/// leaving every other section untouched.
#[derive(Debug, Clone)]
pub struct TomlIdentityStore {
    path: PathBuf,
}

impl TomlIdentityStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl IdentityStore for TomlIdentityStore {
    async fn save_cue(&self, cue: &IdentityCue) -> Result<(), StoreError> {
        let path = self.path.clone();
        let cue = cue.clone();
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let mut config = load_config_from(&path)?;
            config.set_identity_cue(&cue);
            save_config_to(&config, &path)?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

/// Keeps every saved cue in memory.  Used by tests and the demo binary.
#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    saved: Mutex<Vec<IdentityCue>>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All cues saved so far, oldest first.
    pub fn saved(&self) -> Vec<IdentityCue> {
        self.saved.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn save_cue(&self, cue: &IdentityCue) -> Result<(), StoreError> {
        self.saved.lock().expect("lock poisoned").push(cue.clone());
        Ok(())
    }
}
