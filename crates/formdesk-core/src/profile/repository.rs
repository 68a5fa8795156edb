//! Profile repository trait.

use super::model::ProfileMap;
use crate::error::Result;

/// An abstract repository for profile persistence.
///
/// Profiles are small and always read and written as a whole.
#[async_trait::async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Retrieves all profiles from storage.
    ///
    /// # Returns
    ///
    /// - `Ok(ProfileMap)`: All stored profiles (empty if nothing was saved yet)
    /// - `Err(FormdeskError)`: Error if retrieval fails
    async fn get_all(&self) -> Result<ProfileMap>;

    /// Saves all profiles to storage, replacing existing ones.
    async fn save_all(&self, profiles: &ProfileMap) -> Result<()>;
}
