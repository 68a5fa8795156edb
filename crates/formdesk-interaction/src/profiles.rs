//! Named profile management.

use formdesk_core::error::{FormdeskError, Result};
use formdesk_core::profile::{Profile, ProfileRepository};
use serde_json::{Map, Value};
use std::sync::Arc;

/// CRUD over named profiles; every change rewrites the whole store.
#[derive(Clone)]
pub struct ProfileManager {
    repository: Arc<dyn ProfileRepository>,
}

impl ProfileManager {
    pub fn new(repository: Arc<dyn ProfileRepository>) -> Self {
        Self { repository }
    }

    /// Fails with `InvalidInput` if `name` already exists.
    pub async fn create(&self, name: &str, data: Map<String, Value>) -> Result<Profile> {
        let mut profiles = self.repository.get_all().await?;
        if profiles.contains_key(name) {
            tracing::warn!("[ProfileManager] Profile {} already exists", name);
            return Err(FormdeskError::invalid_input(format!(
                "profile '{}' already exists",
                name
            )));
        }
        let profile = Profile::new(data);
        profiles.insert(name.to_string(), profile.clone());
        self.repository.save_all(&profiles).await?;
        tracing::info!("[ProfileManager] Profile {} created", name);
        Ok(profile)
    }

    /// Merges `data` into an existing profile.
    pub async fn update(&self, name: &str, data: Map<String, Value>) -> Result<Profile> {
        let mut profiles = self.repository.get_all().await?;
        let Some(profile) = profiles.get_mut(name) else {
            tracing::warn!("[ProfileManager] Profile {} not found", name);
            return Err(FormdeskError::not_found("Profile", name));
        };
        profile.merge(data);
        let updated = profile.clone();
        self.repository.save_all(&profiles).await?;
        tracing::info!("[ProfileManager] Profile {} updated", name);
        Ok(updated)
    }

    pub async fn delete(&self, name: &str) -> Result<()> {
        let mut profiles = self.repository.get_all().await?;
        if profiles.remove(name).is_none() {
            tracing::warn!("[ProfileManager] Profile {} not found", name);
            return Err(FormdeskError::not_found("Profile", name));
        }
        self.repository.save_all(&profiles).await?;
        tracing::info!("[ProfileManager] Profile {} deleted", name);
        Ok(())
    }

    pub async fn get(&self, name: &str) -> Result<Option<Profile>> {
        Ok(self.repository.get_all().await?.remove(name))
    }

    /// Profile names in order.
    pub async fn list(&self) -> Result<Vec<String>> {
        Ok(self.repository.get_all().await?.into_keys().collect())
    }
}
