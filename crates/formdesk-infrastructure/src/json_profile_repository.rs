//! JSON file implementation of [`ProfileRepository`].
//!
//! All profiles live in one pretty-printed JSON object keyed by profile name.

use crate::storage::AtomicFile;
use async_trait::async_trait;
use formdesk_core::error::{FormdeskError, Result};
use formdesk_core::profile::{ProfileMap, ProfileRepository};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Profile repository persisting to a single JSON file.
#[derive(Clone)]
pub struct JsonProfileRepository {
    file: Arc<AtomicFile<ProfileMap>>,
}

impl JsonProfileRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: Arc::new(AtomicFile::json(path)),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

#[async_trait]
impl ProfileRepository for JsonProfileRepository {
    async fn get_all(&self) -> Result<ProfileMap> {
        let file = Arc::clone(&self.file);
        let loaded = tokio::task::spawn_blocking(move || file.load())
            .await
            .map_err(|e| FormdeskError::internal(format!("profile load task failed: {}", e)))??;
        Ok(loaded.unwrap_or_default())
    }

    async fn save_all(&self, profiles: &ProfileMap) -> Result<()> {
        let file = Arc::clone(&self.file);
        let profiles = profiles.clone();
        tokio::task::spawn_blocking(move || file.save(&profiles))
            .await
            .map_err(|e| FormdeskError::internal(format!("profile save task failed: {}", e)))??;
        tracing::debug!(
            "[JsonProfileRepository] Saved profiles to {}",
            self.file.path().display()
        );
        Ok(())
    }
}
