//! Configuration service implementation.
//!
//! Loads the root configuration from `config.toml` (by default
//! `~/.config/formdesk/config.toml`) and writes a default file the first
//! time it is missing.

use crate::paths::FormdeskPaths;
use crate::storage::AtomicFile;
use formdesk_core::config::RootConfig;
use formdesk_core::error::Result;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

/// Configuration service that loads and caches the root configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    paths: FormdeskPaths,
    /// Cached configuration loaded from file.
    config: Arc<RwLock<Option<RootConfig>>>,
}

impl ConfigService {
    /// Creates a service resolving paths from the environment.
    ///
    /// The configuration is loaded lazily on first access.
    pub fn new() -> Self {
        Self::with_paths(FormdeskPaths::from_env())
    }

    pub fn with_paths(paths: FormdeskPaths) -> Self {
        Self {
            paths,
            config: Arc::new(RwLock::new(None)),
        }
    }

    pub fn paths(&self) -> &FormdeskPaths {
        &self.paths
    }

    /// Gets the root configuration, loading from file if not cached.
    ///
    /// A file that cannot be read or parsed yields the defaults; the problem
    /// is logged rather than returned.
    pub fn get_config(&self) -> RootConfig {
        {
            let read_lock = self.config.read().unwrap_or_else(|e| e.into_inner());
            if let Some(ref cached) = *read_lock {
                return cached.clone();
            }
        }

        let loaded = self.load_config().unwrap_or_else(|e| {
            tracing::warn!("[Config] Falling back to defaults: {}", e);
            RootConfig::default()
        });

        let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
        *write_lock = Some(loaded.clone());

        loaded
    }

    /// Loads the configuration, propagating read and parse errors.
    pub fn try_get_config(&self) -> Result<RootConfig> {
        let loaded = self.load_config()?;
        let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
        *write_lock = Some(loaded.clone());
        Ok(loaded)
    }

    /// Writes `config` to disk and replaces the cached copy.
    pub fn save_config(&self, config: &RootConfig) -> Result<()> {
        AtomicFile::<RootConfig>::toml(self.config_path()?).save(config)?;
        let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
        *write_lock = Some(config.clone());
        Ok(())
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
        *write_lock = None;
    }

    pub fn config_path(&self) -> Result<PathBuf> {
        Ok(self.paths.config_file()?)
    }

    /// Resolves the form database path from the bot section.
    pub fn database_path(&self, config: &RootConfig) -> Result<PathBuf> {
        Ok(self.paths.resolve_data(&config.bot.database_path)?)
    }

    pub fn sessions_dir(&self, config: &RootConfig) -> Result<PathBuf> {
        Ok(self.paths.resolve_data(&config.client.sessions_dir)?)
    }

    pub fn profiles_file(&self, config: &RootConfig) -> Result<PathBuf> {
        Ok(self.paths.resolve_data(&config.client.profiles_file)?)
    }

    /// Configured log directory, or the default one under the config dir.
    pub fn log_dir(&self, config: &RootConfig) -> Result<PathBuf> {
        match &config.logging.log_dir {
            Some(dir) => Ok(self.paths.resolve_data(dir)?),
            None => Ok(self.paths.logs_dir()?),
        }
    }

    fn load_config(&self) -> Result<RootConfig> {
        let path = self.config_path()?;
        let file = AtomicFile::<RootConfig>::toml(path.clone());

        match file.load()? {
            Some(config) => {
                config.validate()?;
                Ok(config)
            }
            None => {
                let default_config = RootConfig::default();
                file.save(&default_config)?;
                tracing::info!("[Config] Wrote default configuration to {}", path.display());
                Ok(default_config)
            }
        }
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> ConfigService {
        ConfigService::with_paths(FormdeskPaths::new(Some(dir.path().to_path_buf())))
    }

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);

        let config = service.get_config();

        assert_eq!(config, RootConfig::default());
        assert!(dir.path().join("config.toml").exists());
    }

    #[test]
    fn test_existing_file_is_read_and_cached() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "[bot]\nadmin_ids = [7]\n[client]\nworker_threads = 2\n",
        )
        .unwrap();
        let service = service(&dir);

        let config = service.get_config();
        assert_eq!(config.bot.admin_ids, vec![7]);
        assert_eq!(config.client.worker_threads, 2);

        std::fs::write(dir.path().join("config.toml"), "[bot]\nadmin_ids = [8]\n").unwrap();
        assert_eq!(service.get_config().bot.admin_ids, vec![7]);

        service.invalidate_cache();
        assert_eq!(service.get_config().bot.admin_ids, vec![8]);
    }

    #[test]
    fn test_malformed_file_falls_back_but_try_reports() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.toml"), "[bot\n").unwrap();
        let service = service(&dir);

        assert!(service.try_get_config().is_err());
        assert_eq!(service.get_config(), RootConfig::default());
    }

    #[test]
    fn test_invalid_values_fall_back_but_try_reports() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "[bot]\nadmin_ids = [1]\nback_side_marker = \"\"\n",
        )
        .unwrap();
        let service = service(&dir);

        assert!(service.try_get_config().unwrap_err().is_config());
        assert_eq!(service.get_config(), RootConfig::default());
    }

    #[test]
    fn test_save_then_resolve_paths() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);

        let mut config = RootConfig::default();
        config.bot.admin_ids = vec![1, 2];
        service.save_config(&config).unwrap();
        service.invalidate_cache();

        let reloaded = service.get_config();
        assert_eq!(reloaded.bot.admin_ids, vec![1, 2]);
        assert_eq!(
            service.database_path(&reloaded).unwrap(),
            dir.path().join("forms.db")
        );
        assert_eq!(service.log_dir(&reloaded).unwrap(), dir.path().join("logs"));
    }
}
