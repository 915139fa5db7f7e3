//! SHELF - Durable Writer
//! Replaces the primary file with a new serialized dataset.
//!
//! ## Protocols
//! - **Staging mode** (staging path resolved): write `staging`, then
//!   rename `primary -> backup` (if a backup path resolved), then rename
//!   `staging -> primary`. The final rename is the only operation visible
//!   at the primary path.
//! - **In-place mode** (no staging path): rename `primary -> backup` (if
//!   a backup path resolved), then write `primary`. Not atomic: a crash
//!   between the rename and the end of the write leaves no primary file,
//!   only the backup.
//!
//! A failing step aborts the sequence and its error is returned as-is.
//! Nothing is rolled back, so a staging and/or backup file may be left
//! behind.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;

use super::paths::PathStrategy;

/// The last stage of a flush: puts serialized bytes on disk.
///
/// `DurableWriter` is the only production implementation. Wrappers can be
/// passed to `Shelf::open_with_writer` to observe or alter writes.
pub trait FileWriter: Send + Sync {
    /// Primary file this writer replaces.
    fn location(&self) -> &Path;

    /// Replace the primary file with `bytes`.
    fn write(&self, bytes: &[u8]) -> Result<WriteOutcome>;
}

impl<W: FileWriter + ?Sized> FileWriter for Arc<W> {
    fn location(&self) -> &Path {
        (**self).location()
    }

    fn write(&self, bytes: &[u8]) -> Result<WriteOutcome> {
        (**self).write(bytes)
    }
}

/// Where the bytes of one `write` call ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Staging file used for this write, if any (already renamed away).
    pub staging: Option<PathBuf>,
    /// Backup file now holding the previous primary contents, if any.
    pub backup: Option<PathBuf>,
    /// Bytes written.
    pub bytes: usize,
}

/// Executes the file-replacement protocol for one primary location.
pub struct DurableWriter {
    location: PathBuf,
    staging: Arc<dyn PathStrategy>,
    backup: Arc<dyn PathStrategy>,
    sync_writes: bool,
}

impl DurableWriter {
    pub fn new(
        location: PathBuf,
        staging: Arc<dyn PathStrategy>,
        backup: Arc<dyn PathStrategy>,
        sync_writes: bool,
    ) -> Self {
        Self {
            location,
            staging,
            backup,
            sync_writes,
        }
    }

    /// Writer for the location and file-set options of `config`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.location.clone(),
            config.staging.clone(),
            config.backup.clone(),
            config.sync_writes,
        )
    }
}

impl FileWriter for DurableWriter {
    fn location(&self) -> &Path {
        &self.location
    }

    fn write(&self, bytes: &[u8]) -> Result<WriteOutcome> {
        let staging = self.staging.resolve(&self.location);
        let backup = self.backup.resolve(&self.location);

        match &staging {
            None => {
                if let Some(backup) = &backup {
                    fs::rename(&self.location, backup)?;
                }
                write_file(&self.location, bytes, self.sync_writes)?;
            }
            Some(staging) => {
                write_file(staging, bytes, self.sync_writes)?;
                if let Some(backup) = &backup {
                    fs::rename(&self.location, backup)?;
                }
                fs::rename(staging, &self.location)?;
            }
        }

        log::trace!(
            "Wrote {} bytes to {:?} (staging: {:?}, backup: {:?})",
            bytes.len(),
            self.location,
            staging,
            backup
        );

        Ok(WriteOutcome {
            staging,
            backup,
            bytes: bytes.len(),
        })
    }
}

/// Create or truncate `path` and write `bytes` to it, optionally fsyncing.
pub fn write_file(path: &Path, bytes: &[u8], sync: bool) -> Result<()> {
    let mut file: File = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    file.write_all(bytes)?;
    if sync {
        file.sync_all()?; // fsync before any rename exposes the file
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::paths::{Disabled, Fixed, Suffix};
    use crate::error::ShelfError;

    fn writer(
        location: &Path,
        staging: impl PathStrategy + 'static,
        backup: impl PathStrategy + 'static,
    ) -> DurableWriter {
        DurableWriter::new(
            location.to_path_buf(),
            Arc::new(staging),
            Arc::new(backup),
            true,
        )
    }

    #[test]
    fn test_in_place_without_backup() {
        let dir = tempfile::tempdir().unwrap();
        let primary = dir.path().join("db.json");
        fs::write(&primary, b"old").unwrap();

        let out = writer(&primary, Disabled, Disabled).write(b"new").unwrap();

        assert_eq!(fs::read(&primary).unwrap(), b"new");
        assert_eq!(out.staging, None);
        assert_eq!(out.backup, None);
        assert_eq!(out.bytes, 3);
    }

    #[test]
    fn test_in_place_with_backup() {
        let dir = tempfile::tempdir().unwrap();
        let primary = dir.path().join("db.json");
        fs::write(&primary, b"old").unwrap();

        writer(&primary, Disabled, Suffix::new(".back"))
            .write(b"new")
            .unwrap();

        assert_eq!(fs::read(&primary).unwrap(), b"new");
        assert_eq!(fs::read(dir.path().join("db.json.back")).unwrap(), b"old");
    }

    #[test]
    fn test_staging_with_backup() {
        let dir = tempfile::tempdir().unwrap();
        let primary = dir.path().join("db.json");
        fs::write(&primary, b"old").unwrap();

        let out = writer(&primary, Suffix::new(".next"), Suffix::new(".back"))
            .write(b"new")
            .unwrap();

        assert_eq!(fs::read(&primary).unwrap(), b"new");
        assert_eq!(fs::read(dir.path().join("db.json.back")).unwrap(), b"old");
        // staging file was renamed onto the primary
        assert!(!dir.path().join("db.json.next").exists());
        assert_eq!(out.staging, Some(dir.path().join("db.json.next")));
    }

    #[test]
    fn test_staging_failure_leaves_primary_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let primary = dir.path().join("db.json");
        fs::write(&primary, b"old").unwrap();

        let unreachable = dir.path().join("no-such-dir").join("db.json.next");
        let err = writer(&primary, Fixed(unreachable), Suffix::new(".back"))
            .write(b"new")
            .unwrap_err();

        assert!(matches!(err, ShelfError::Io(_)));
        assert_eq!(fs::read(&primary).unwrap(), b"old");
        assert!(!dir.path().join("db.json.back").exists());
    }

    #[test]
    fn test_backup_rename_failure_keeps_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let primary = dir.path().join("db.json");
        // no primary file: renaming it to the backup location fails

        let err = writer(&primary, Suffix::new(".next"), Suffix::new(".back"))
            .write(b"new")
            .unwrap_err();

        assert!(matches!(err, ShelfError::Io(_)));
        assert!(!primary.exists());
        assert_eq!(fs::read(dir.path().join("db.json.next")).unwrap(), b"new");
    }

    #[test]
    fn test_paths_resolved_per_write() {
        let dir = tempfile::tempdir().unwrap();
        let primary = dir.path().join("db.json");
        fs::write(&primary, b"v0").unwrap();

        let counter = std::sync::atomic::AtomicUsize::new(0);
        let backup_dir = dir.path().to_path_buf();
        let backup = move |_: &Path| {
            let n = counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Some(backup_dir.join(format!("{}.back", n)))
        };
        let w = writer(&primary, Disabled, backup);

        w.write(b"v1").unwrap();
        w.write(b"v2").unwrap();

        assert_eq!(fs::read(dir.path().join("0.back")).unwrap(), b"v0");
        assert_eq!(fs::read(dir.path().join("1.back")).unwrap(), b"v1");
        assert_eq!(fs::read(&primary).unwrap(), b"v2");
    }
}
