//! Atomic file operations for TOML and JSON documents.
//!
//! Writes go to a sibling temporary file which is synced and renamed over the
//! target, so readers never observe a half-written document.

use formdesk_core::FormdeskError;
use serde::{Serialize, de::DeserializeOwned};
use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// On-disk encoding of an [`AtomicFile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Toml,
    Json,
}

impl FileFormat {
    fn name(self) -> &'static str {
        match self {
            FileFormat::Toml => "toml",
            FileFormat::Json => "json",
        }
    }
}

/// Errors that can occur during atomic file operations.
#[derive(Debug)]
pub enum AtomicFileError {
    /// File I/O error.
    IoError(std::io::Error),
    /// The document could not be parsed or rendered.
    FormatError { format: FileFormat, message: String },
    /// File locking error.
    LockError(String),
}

impl std::fmt::Display for AtomicFileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AtomicFileError::IoError(e) => write!(f, "I/O error: {}", e),
            AtomicFileError::FormatError { format, message } => {
                write!(f, "{} error: {}", format.name().to_uppercase(), message)
            }
            AtomicFileError::LockError(e) => write!(f, "Lock error: {}", e),
        }
    }
}

impl std::error::Error for AtomicFileError {}

impl From<std::io::Error> for AtomicFileError {
    fn from(e: std::io::Error) -> Self {
        AtomicFileError::IoError(e)
    }
}

impl From<AtomicFileError> for FormdeskError {
    fn from(e: AtomicFileError) -> Self {
        match e {
            AtomicFileError::IoError(io) => FormdeskError::from(io),
            AtomicFileError::FormatError { format, message } => FormdeskError::Serialization {
                format: format.name().to_uppercase(),
                message,
            },
            AtomicFileError::LockError(message) => FormdeskError::io(message),
        }
    }
}

/// A handle to a document file that is replaced atomically on save.
pub struct AtomicFile<T> {
    path: PathBuf,
    format: FileFormat,
    _phantom: PhantomData<T>,
}

impl<T> AtomicFile<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: PathBuf, format: FileFormat) -> Self {
        Self {
            path,
            format,
            _phantom: PhantomData,
        }
    }

    pub fn toml(path: PathBuf) -> Self {
        Self::new(path, FileFormat::Toml)
    }

    pub fn json(path: PathBuf) -> Self {
        Self::new(path, FileFormat::Json)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads and deserializes the file.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(T))`: Successfully loaded and deserialized
    /// - `Ok(None)`: File doesn't exist or is empty
    /// - `Err`: Failed to read or parse the file
    pub fn load(&self) -> Result<Option<T>, AtomicFileError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(None);
        }

        self.decode(&content).map(Some)
    }

    /// Saves data atomically via a temporary file and rename.
    pub fn save(&self, data: &T) -> Result<(), AtomicFileError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = self.encode(data)?;

        let tmp_path = self.temp_path()?;
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(content.as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Loads, modifies and saves the file under an exclusive lock.
    ///
    /// `default_value` is used when the file is missing or empty. Nothing is
    /// written when `f` fails.
    pub fn update<F, R>(&self, default_value: T, f: F) -> Result<R, AtomicFileError>
    where
        F: FnOnce(&mut T) -> Result<R, AtomicFileError>,
    {
        let _lock = FileLock::acquire(&self.path)?;

        let mut data = self.load()?.unwrap_or(default_value);
        let result = f(&mut data)?;
        self.save(&data)?;

        Ok(result)
    }

    fn decode(&self, content: &str) -> Result<T, AtomicFileError> {
        let parsed = match self.format {
            FileFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
            FileFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        };
        parsed.map_err(|message| AtomicFileError::FormatError {
            format: self.format,
            message,
        })
    }

    fn encode(&self, data: &T) -> Result<String, AtomicFileError> {
        let rendered = match self.format {
            FileFormat::Toml => toml::to_string_pretty(data).map_err(|e| e.to_string()),
            FileFormat::Json => serde_json::to_string_pretty(data).map_err(|e| e.to_string()),
        };
        rendered.map_err(|message| AtomicFileError::FormatError {
            format: self.format,
            message,
        })
    }

    fn temp_path(&self) -> Result<PathBuf, AtomicFileError> {
        let file_name = self.path.file_name().ok_or_else(|| {
            AtomicFileError::IoError(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Path has no file name",
            ))
        })?;

        let tmp_name = format!(".{}.tmp", file_name.to_string_lossy());
        Ok(self.path.with_file_name(tmp_name))
    }
}

/// Exclusive lock on a sibling `.lock` file, released on drop.
struct FileLock {
    _file: File,
    lock_path: PathBuf,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self, AtomicFileError> {
        let lock_path = path.with_extension("lock");

        if let Some(parent) = lock_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        {
            use fs2::FileExt;
            file.lock_exclusive()
                .map_err(|e| AtomicFileError::LockError(format!("Failed to acquire lock: {}", e)))?;
        }

        Ok(FileLock {
            _file: file,
            lock_path,
        })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        name: String,
        count: u32,
    }

    fn counter(count: u32) -> Counter {
        Counter {
            name: "invites".to_string(),
            count,
        }
    }

    #[test]
    fn test_save_and_load_toml() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicFile::<Counter>::toml(temp_dir.path().join("counter.toml"));

        file.save(&counter(42)).unwrap();

        assert_eq!(file.load().unwrap(), Some(counter(42)));
    }

    #[test]
    fn test_save_and_load_json_map() {
        let temp_dir = TempDir::new().unwrap();
        let file =
            AtomicFile::<BTreeMap<String, Counter>>::json(temp_dir.path().join("nested/map.json"));

        let mut map = BTreeMap::new();
        map.insert("a".to_string(), counter(1));
        file.save(&map).unwrap();

        assert_eq!(file.load().unwrap(), Some(map));
    }

    #[test]
    fn test_missing_and_empty_files_load_as_none() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("empty.json");
        let file = AtomicFile::<Counter>::json(path.clone());
        assert!(file.load().unwrap().is_none());

        fs::write(&path, "  \n").unwrap();
        assert!(file.load().unwrap().is_none());
    }

    #[test]
    fn test_malformed_file_reports_format() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let err = AtomicFile::<Counter>::json(path).load().unwrap_err();
        assert!(matches!(
            err,
            AtomicFileError::FormatError {
                format: FileFormat::Json,
                ..
            }
        ));
    }

    #[test]
    fn test_update_starts_from_default_and_accumulates() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicFile::<Counter>::toml(temp_dir.path().join("counter.toml"));

        file.update(counter(0), |c| {
            c.count += 10;
            Ok(())
        })
        .unwrap();
        let total = file
            .update(counter(0), |c| {
                c.count += 5;
                Ok(c.count)
            })
            .unwrap();

        assert_eq!(total, 15);
        assert_eq!(file.load().unwrap().unwrap().count, 15);
        assert!(!temp_dir.path().join("counter.lock").exists());
    }

    #[test]
    fn test_failed_update_leaves_file_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicFile::<Counter>::toml(temp_dir.path().join("counter.toml"));
        file.save(&counter(3)).unwrap();

        let result: Result<(), _> = file.update(counter(0), |c| {
            c.count = 99;
            Err(AtomicFileError::LockError("abort".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(file.load().unwrap().unwrap().count, 3);
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("counter.toml");
        AtomicFile::<Counter>::toml(path.clone())
            .save(&counter(1))
            .unwrap();

        assert!(path.exists());
        assert!(!temp_dir.path().join(".counter.toml.tmp").exists());
    }
}
