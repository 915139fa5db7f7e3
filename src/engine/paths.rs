//! SHELF - Staging & Backup Path Strategies
//! Decides, freshly on every flush, where the staging file and the
//! backup file live. `None` means "write in place" for staging and
//! "keep no backup" for backup.

use std::path::{Path, PathBuf};

/// Resolves an auxiliary file path relative to the primary location.
///
/// Called once per flush, so implementations may return a different path
/// every time (randomized, time-stamped, computed from configuration).
/// Any `Fn(&Path) -> Option<PathBuf>` closure is a strategy.
pub trait PathStrategy: Send + Sync {
    fn resolve(&self, location: &Path) -> Option<PathBuf>;
}

impl<F> PathStrategy for F
where
    F: Fn(&Path) -> Option<PathBuf> + Send + Sync,
{
    fn resolve(&self, location: &Path) -> Option<PathBuf> {
        self(location)
    }
}

/// Never resolves: no staging file (in-place writes) or no backup.
#[derive(Debug, Clone, Copy, Default)]
pub struct Disabled;

impl PathStrategy for Disabled {
    fn resolve(&self, _location: &Path) -> Option<PathBuf> {
        None
    }
}

/// The primary location with a suffix appended to its file name,
/// e.g. `db.json` + `.next` = `db.json.next`.
#[derive(Debug, Clone)]
pub struct Suffix(pub String);

impl Suffix {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self(suffix.into())
    }
}

impl PathStrategy for Suffix {
    fn resolve(&self, location: &Path) -> Option<PathBuf> {
        if self.0.is_empty() {
            return None;
        }
        Some(append_suffix(location, &self.0))
    }
}

/// The same fixed path on every flush.
#[derive(Debug, Clone)]
pub struct Fixed(pub PathBuf);

impl PathStrategy for Fixed {
    fn resolve(&self, _location: &Path) -> Option<PathBuf> {
        if self.0.as_os_str().is_empty() {
            None
        } else {
            Some(self.0.clone())
        }
    }
}

/// Append `suffix` to the final component of `location` without touching its extension.
pub fn append_suffix(location: &Path, suffix: &str) -> PathBuf {
    let mut name = location.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_suffix_appends_to_file_name() {
        let s = Suffix::new(".next");
        assert_eq!(
            s.resolve(Path::new("/tmp/db.json")),
            Some(PathBuf::from("/tmp/db.json.next"))
        );
    }

    #[test]
    fn test_empty_suffix_disables() {
        assert_eq!(Suffix::new("").resolve(Path::new("db")), None);
        assert_eq!(Disabled.resolve(Path::new("db")), None);
        assert_eq!(Fixed(PathBuf::new()).resolve(Path::new("db")), None);
    }

    #[test]
    fn test_fixed_ignores_location() {
        let f = Fixed(PathBuf::from("/var/backup.bin"));
        assert_eq!(
            f.resolve(Path::new("/a/b")),
            Some(PathBuf::from("/var/backup.bin"))
        );
    }

    #[test]
    fn test_closure_resolves_on_every_call() {
        let calls = AtomicUsize::new(0);
        let strategy = move |loc: &Path| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n % 2 == 0 {
                Some(append_suffix(loc, &format!(".{}", n)))
            } else {
                None
            }
        };

        assert_eq!(
            strategy.resolve(Path::new("db")),
            Some(PathBuf::from("db.0"))
        );
        assert_eq!(strategy.resolve(Path::new("db")), None);
        assert_eq!(
            strategy.resolve(Path::new("db")),
            Some(PathBuf::from("db.2"))
        );
    }
}
