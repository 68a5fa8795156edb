//! Unified path management for formdesk files.
//!
//! Configuration, the form database, client sessions, profiles and logs all
//! resolve from two roots: the config directory and the data directory.
//! Setting `FORMDESK_CONFIG_DIR` collapses both roots into that directory,
//! which keeps a deployment self-contained.

use std::path::{Path, PathBuf};

/// Environment variable overriding both the config and data roots.
pub const CONFIG_DIR_ENV: &str = "FORMDESK_CONFIG_DIR";

const APP_DIR: &str = "formdesk";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for formdesk_core::FormdeskError {
    fn from(e: PathError) -> Self {
        formdesk_core::FormdeskError::config(e.to_string())
    }
}

/// Path resolver for formdesk.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/formdesk/          # Config directory
/// ├── config.toml              # Application configuration
/// └── logs/                    # Rolling log files
///     └── formdesk.log.YYYY-MM-DD
///
/// ~/.local/share/formdesk/     # Data directory
/// ├── forms.db                 # Form database
/// ├── profiles.json            # Automation client profiles
/// └── sessions/                # Platform session files
/// ```
#[derive(Debug, Clone, Default)]
pub struct FormdeskPaths {
    root: Option<PathBuf>,
}

impl FormdeskPaths {
    /// Creates a resolver. `root` replaces both platform directories when set.
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    /// Creates a resolver honoring `FORMDESK_CONFIG_DIR`.
    pub fn from_env() -> Self {
        let root = std::env::var_os(CONFIG_DIR_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        Self::new(root)
    }

    /// Returns the configuration directory (e.g., `~/.config/formdesk/`).
    pub fn config_dir(&self) -> Result<PathBuf, PathError> {
        if let Some(root) = &self.root {
            return Ok(root.clone());
        }
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the data directory (e.g., `~/.local/share/formdesk/`).
    pub fn data_dir(&self) -> Result<PathBuf, PathError> {
        if let Some(root) = &self.root {
            return Ok(root.clone());
        }
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the path to `config.toml`.
    pub fn config_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("config.toml"))
    }

    /// Returns the default directory for rolling log files.
    pub fn logs_dir(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("logs"))
    }

    /// Resolves a configured path against the data directory.
    ///
    /// Absolute paths are returned unchanged.
    pub fn resolve_data(&self, path: &Path) -> Result<PathBuf, PathError> {
        if path.is_absolute() {
            return Ok(path.to_path_buf());
        }
        Ok(self.data_dir()?.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_dirs_end_with_app_name() {
        let paths = FormdeskPaths::new(None);
        assert!(paths.config_dir().unwrap().ends_with("formdesk"));
        assert!(paths.data_dir().unwrap().ends_with("formdesk"));
    }

    #[test]
    fn test_config_file_under_config_dir() {
        let paths = FormdeskPaths::new(None);
        let config_file = paths.config_file().unwrap();
        assert!(config_file.ends_with("config.toml"));
        assert!(config_file.starts_with(paths.config_dir().unwrap()));
    }

    #[test]
    fn test_root_override_collapses_both_dirs() {
        let paths = FormdeskPaths::new(Some(PathBuf::from("/srv/formdesk")));
        assert_eq!(paths.config_dir().unwrap(), PathBuf::from("/srv/formdesk"));
        assert_eq!(paths.data_dir().unwrap(), PathBuf::from("/srv/formdesk"));
        assert_eq!(
            paths.logs_dir().unwrap(),
            PathBuf::from("/srv/formdesk/logs")
        );
    }

    #[test]
    fn test_resolve_data() {
        let paths = FormdeskPaths::new(Some(PathBuf::from("/srv/formdesk")));
        assert_eq!(
            paths.resolve_data(Path::new("forms.db")).unwrap(),
            PathBuf::from("/srv/formdesk/forms.db")
        );
        assert_eq!(
            paths.resolve_data(Path::new("/var/lib/forms.db")).unwrap(),
            PathBuf::from("/var/lib/forms.db")
        );
    }
}
