//! SHELF - Engine Configuration
//! Defines the file location, debounce policy, file-replacement policy
//! and serializer for a store. Immutable once the store is open.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::engine::paths::{Disabled, PathStrategy, Suffix};
use crate::engine::serializer::{JsonSerializer, Serializer};
use crate::error::{Result, ShelfError};

/// Configuration for a Shelf store.
#[derive(Clone)]
pub struct Config {
    /// The primary file holding the whole dataset.
    pub location: PathBuf,

    /// Quiet period between the first mutation and the flush it schedules.
    /// Zero makes every mutation flush synchronously before returning.
    pub delay: Duration,

    /// Create the file (and its parent directory) when it does not exist.
    pub create_if_missing: bool,

    /// Refuse to open when the file already exists.
    pub error_if_exists: bool,

    /// fsync each written file before it is renamed into place.
    pub sync_writes: bool,

    /// Where new data is staged before replacing the primary file.
    pub staging: Arc<dyn PathStrategy>,

    /// Where the previous primary file is kept after each flush.
    pub backup: Arc<dyn PathStrategy>,

    pub serializer: Arc<dyn Serializer>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            location: PathBuf::from("./data/shelf.json"),
            delay: Duration::from_millis(1000),
            create_if_missing: true,
            error_if_exists: false,
            sync_writes: true,
            staging: Arc::new(Suffix::new(".next")),
            backup: Arc::new(Suffix::new(".back")),
            serializer: Arc::new(JsonSerializer::default()),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("location", &self.location)
            .field("delay", &self.delay)
            .field("create_if_missing", &self.create_if_missing)
            .field("error_if_exists", &self.error_if_exists)
            .field("sync_writes", &self.sync_writes)
            .field("uses_buffers", &self.serializer.uses_buffers())
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Create a new Config with a custom file location.
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
            ..Default::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_delay_ms(self, ms: u64) -> Self {
        self.with_delay(Duration::from_millis(ms))
    }

    pub fn with_create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    pub fn with_error_if_exists(mut self, exclusive: bool) -> Self {
        self.error_if_exists = exclusive;
        self
    }

    pub fn with_sync_writes(mut self, sync: bool) -> Self {
        self.sync_writes = sync;
        self
    }

    pub fn with_staging(mut self, staging: impl PathStrategy + 'static) -> Self {
        self.staging = Arc::new(staging);
        self
    }

    /// Write the primary file in place.
    pub fn without_staging(self) -> Self {
        self.with_staging(Disabled)
    }

    pub fn with_backup(mut self, backup: impl PathStrategy + 'static) -> Self {
        self.backup = Arc::new(backup);
        self
    }

    pub fn without_backup(self) -> Self {
        self.with_backup(Disabled)
    }

    pub fn with_serializer(mut self, serializer: impl Serializer + 'static) -> Self {
        self.serializer = Arc::new(serializer);
        self
    }

    /// True when mutations flush before returning.
    pub fn is_synchronous(&self) -> bool {
        self.delay.is_zero()
    }

    /// Reject configurations that can never flush correctly.
    pub fn validate(&self) -> Result<()> {
        if self.location.as_os_str().is_empty() {
            return Err(ShelfError::Config("location must not be empty".into()));
        }
        if self.staging.resolve(&self.location).as_deref() == Some(self.location.as_path()) {
            return Err(ShelfError::Config(
                "staging path must differ from location".into(),
            ));
        }
        if self.backup.resolve(&self.location).as_deref() == Some(self.location.as_path()) {
            return Err(ShelfError::Config(
                "backup path must differ from location".into(),
            ));
        }
        Ok(())
    }

    /// Ensure the directory containing the primary file exists.
    pub fn ensure_parent_dir(&self) -> std::io::Result<()> {
        match self.location.parent() {
            Some(parent) if parent != Path::new("") => std::fs::create_dir_all(parent),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::paths::Fixed;

    #[test]
    fn test_defaults_mirror_boolean_policies() {
        let config = Config::new("/tmp/db.json");
        assert_eq!(
            config.staging.resolve(&config.location),
            Some(PathBuf::from("/tmp/db.json.next"))
        );
        assert_eq!(
            config.backup.resolve(&config.location),
            Some(PathBuf::from("/tmp/db.json.back"))
        );
        assert!(!config.is_synchronous());
        assert!(!config.serializer.uses_buffers());
    }

    #[test]
    fn test_builders() {
        let config = Config::new("db")
            .with_delay_ms(0)
            .without_staging()
            .without_backup()
            .with_error_if_exists(true)
            .with_create_if_missing(false);
        assert!(config.is_synchronous());
        assert_eq!(config.staging.resolve(&config.location), None);
        assert_eq!(config.backup.resolve(&config.location), None);
        assert!(config.error_if_exists);
        assert!(!config.create_if_missing);
    }

    #[test]
    fn test_validate_rejects_self_referencing_paths() {
        assert!(Config::new("").validate().is_err());
        assert!(Config::new("db")
            .with_staging(Fixed(PathBuf::from("db")))
            .validate()
            .is_err());
        assert!(Config::new("db")
            .with_backup(Fixed(PathBuf::from("db")))
            .validate()
            .is_err());
        assert!(Config::new("db").validate().is_ok());
    }

    #[test]
    fn test_ensure_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(dir.path().join("a").join("b").join("db.json"));
        config.ensure_parent_dir().unwrap();
        assert!(dir.path().join("a").join("b").is_dir());
    }
}
