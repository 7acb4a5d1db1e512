#![forbid(unsafe_code)]

//! Narrow persistence port for small per-field value lists.
//!
//! Fields that remember things between sessions (recently used values) do
//! so through a [`PersistencePort`] injected at construction. Nothing in
//! this crate keeps process-global state.
//!
//! # Backends
//!
//! - [`MemoryPersistence`]: in-memory, for tests and ephemeral use.
//! - [`FilePersistence`]: JSON file with atomic write-then-rename
//!   (requires the `persistence` feature).
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | `StorageError::Io` | File I/O failure | Returned; callers degrade to memory |
//! | `StorageError::Serialization` | JSON encode/decode | Returned |
//! | `StorageError::Corruption` | Unknown format version | Returned |
//! | Missing file | First run | `load` yields an empty list |

use std::fmt;
use std::sync::{PoisonError, RwLock};

/// Errors from a persistence backend.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error during file operations.
    Io(std::io::Error),
    /// JSON encode/decode failure.
    #[cfg(feature = "persistence")]
    Serialization(String),
    /// Stored data has an unexpected shape or version.
    Corruption(String),
    /// Backend cannot be used.
    Unavailable(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "persistence")]
            Self::Serialization(msg) => write!(f, "serialization error: {msg}"),
            Self::Corruption(msg) => write!(f, "storage corruption: {msg}"),
            Self::Unavailable(msg) => write!(f, "storage unavailable: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Load/save port for an ordered list of strings.
pub trait PersistencePort: Send + Sync {
    /// Human-readable backend name for logs.
    fn name(&self) -> &str;

    /// Load the stored list; an absent list is an empty one.
    fn load(&self) -> StorageResult<Vec<String>>;

    /// Replace the stored list.
    fn save(&self, values: &[String]) -> StorageResult<()>;
}

/// In-memory backend.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    values: RwLock<Vec<String>>,
}

impl MemoryPersistence {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated backend.
    #[must_use]
    pub fn with_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: RwLock::new(values.into_iter().map(Into::into).collect()),
        }
    }

    /// Snapshot of the stored list.
    #[must_use]
    pub fn values(&self) -> Vec<String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl PersistencePort for MemoryPersistence {
    fn name(&self) -> &str {
        "MemoryPersistence"
    }

    fn load(&self) -> StorageResult<Vec<String>> {
        Ok(self.values())
    }

    fn save(&self, values: &[String]) -> StorageResult<()> {
        let mut guard = self.values.write().unwrap_or_else(PoisonError::into_inner);
        guard.clear();
        guard.extend_from_slice(values);
        Ok(())
    }
}

#[cfg(feature = "persistence")]
pub use file::FilePersistence;

#[cfg(feature = "persistence")]
mod file {
    use std::fs::{self, File};
    use std::io::{BufReader, BufWriter, Write};
    use std::path::{Path, PathBuf};

    use serde::{Deserialize, Serialize};

    use super::{PersistencePort, StorageError, StorageResult};

    #[derive(Serialize, Deserialize)]
    struct ValuesFile {
        format_version: u32,
        values: Vec<String>,
    }

    impl ValuesFile {
        const FORMAT_VERSION: u32 = 1;
    }

    /// JSON file backend.
    ///
    /// ```json
    /// { "format_version": 1, "values": ["most recent", "older"] }
    /// ```
    ///
    /// Saves write `{path}.tmp`, sync it, then rename over `{path}`.
    #[derive(Debug, Clone)]
    pub struct FilePersistence {
        path: PathBuf,
    }

    impl FilePersistence {
        /// Backend at `path`; the file is created on first save.
        #[must_use]
        pub fn new(path: impl AsRef<Path>) -> Self {
            Self {
                path: path.as_ref().to_path_buf(),
            }
        }

        /// The backing file.
        #[must_use]
        pub fn path(&self) -> &Path {
            &self.path
        }

        fn temp_path(&self) -> PathBuf {
            let mut tmp = self.path.clone();
            tmp.set_extension("json.tmp");
            tmp
        }
    }

    impl PersistencePort for FilePersistence {
        fn name(&self) -> &str {
            "FilePersistence"
        }

        fn load(&self) -> StorageResult<Vec<String>> {
            if !self.path.exists() {
                return Ok(Vec::new());
            }
            let reader = BufReader::new(File::open(&self.path)?);
            let file: ValuesFile = serde_json::from_reader(reader).map_err(|e| {
                StorageError::Serialization(format!("failed to parse values file: {e}"))
            })?;
            if file.format_version != ValuesFile::FORMAT_VERSION {
                return Err(StorageError::Corruption(format!(
                    "format version {} (expected {})",
                    file.format_version,
                    ValuesFile::FORMAT_VERSION
                )));
            }
            Ok(file.values)
        }

        fn save(&self, values: &[String]) -> StorageResult<()> {
            if let Some(parent) = self.path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent)?;
            }
            let file = ValuesFile {
                format_version: ValuesFile::FORMAT_VERSION,
                values: values.to_vec(),
            };
            let tmp_path = self.temp_path();
            {
                let mut writer = BufWriter::new(File::create(&tmp_path)?);
                serde_json::to_writer_pretty(&mut writer, &file).map_err(|e| {
                    StorageError::Serialization(format!("failed to serialize values: {e}"))
                })?;
                writer.flush()?;
                writer.get_ref().sync_all()?;
            }
            fs::rename(&tmp_path, &self.path)?;
            tracing::debug!(
                target: "fieldguard.persistence",
                path = %self.path.display(),
                values = values.len(),
                "saved values"
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_round_trip() {
        let port = MemoryPersistence::new();
        assert!(port.load().unwrap().is_empty());
        port.save(&["a".to_owned(), "b".to_owned()]).unwrap();
        assert_eq!(port.load().unwrap(), vec!["a", "b"]);
        port.save(&[]).unwrap();
        assert!(port.values().is_empty());
    }

    #[test]
    fn memory_prepopulated() {
        let port = MemoryPersistence::with_values(["x"]);
        assert_eq!(port.name(), "MemoryPersistence");
        assert_eq!(port.load().unwrap(), vec!["x"]);
    }

    #[test]
    fn error_display() {
        let err = StorageError::Corruption("bad header".into());
        assert_eq!(err.to_string(), "storage corruption: bad header");
        let err: StorageError = std::io::Error::other("disk").into();
        assert!(err.to_string().starts_with("I/O error"));
    }

    #[cfg(feature = "persistence")]
    mod file_backend {
        use super::super::*;

        #[test]
        fn missing_file_is_empty() {
            let dir = tempfile::tempdir().unwrap();
            let port = FilePersistence::new(dir.path().join("recent.json"));
            assert!(port.load().unwrap().is_empty());
        }

        #[test]
        fn save_then_load() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("nested").join("recent.json");
            let port = FilePersistence::new(&path);
            port.save(&["one".to_owned(), "two".to_owned()]).unwrap();
            assert!(path.exists());
            assert!(!path.with_extension("json.tmp").exists());
            assert_eq!(port.load().unwrap(), vec!["one", "two"]);
        }

        #[test]
        fn garbage_is_a_serialization_error() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("recent.json");
            std::fs::write(&path, b"not json").unwrap();
            let err = FilePersistence::new(&path).load().unwrap_err();
            assert!(matches!(err, StorageError::Serialization(_)));
        }

        #[test]
        fn unknown_version_is_corruption() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("recent.json");
            std::fs::write(&path, br#"{"format_version": 9, "values": []}"#).unwrap();
            let err = FilePersistence::new(&path).load().unwrap_err();
            assert!(matches!(err, StorageError::Corruption(_)));
        }
    }
}
