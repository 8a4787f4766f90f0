//! Persistent browser profile directory management.
//!
//! The profile directory holds the web client's login state, which is what
//! makes QR pairing a one-time cost: as long as the directory survives,
//! relaunching the browser restores the paired session. Exactly one live
//! session may own a given directory.

use std::{
    io,
    path::{Path, PathBuf},
    time::Duration,
};

use tracing::{debug, warn};

const REMOVE_ATTEMPTS: u32 = 5;
const REMOVE_BACKOFF: Duration = Duration::from_millis(500);

/// Owns the on-disk profile directory for one browser session.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the profile directory if it does not exist yet.
    pub fn ensure(&self) -> io::Result<&Path> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(&self.dir)
    }

    /// Whether a profile (and thus possibly a paired login) exists on disk.
    pub fn exists(&self) -> bool {
        self.dir.is_dir()
    }

    /// Delete the profile directory, retrying with backoff.
    ///
    /// The browser process can still hold file locks for a moment after
    /// close, so deletion races its exit. After the final attempt fails the
    /// error is logged and swallowed; a leftover directory only costs disk
    /// space and the next teardown tries again.
    pub async fn remove(&self) {
        for attempt in 1..=REMOVE_ATTEMPTS {
            match std::fs::remove_dir_all(&self.dir) {
                Ok(()) => {
                    debug!(dir = %self.dir.display(), attempt, "removed profile directory");
                    return;
                },
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!(dir = %self.dir.display(), "profile directory already absent");
                    return;
                },
                Err(e) if attempt < REMOVE_ATTEMPTS => {
                    debug!(
                        dir = %self.dir.display(),
                        attempt,
                        error = %e,
                        "profile removal failed, retrying"
                    );
                    tokio::time::sleep(REMOVE_BACKOFF).await;
                },
                Err(e) => {
                    warn!(
                        dir = %self.dir.display(),
                        error = %e,
                        "giving up on profile removal"
                    );
                },
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn ensure_creates_nested_dirs() {
        let root = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(root.path().join("profiles").join("whatsapp"));
        assert!(!store.exists());
        store.ensure().unwrap();
        assert!(store.exists());
        // Idempotent.
        store.ensure().unwrap();
    }

    #[tokio::test]
    async fn remove_deletes_populated_dir() {
        let root = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(root.path().join("profile"));
        store.ensure().unwrap();
        std::fs::write(store.dir().join("state.bin"), b"leveldb").unwrap();

        store.remove().await;
        assert!(!store.exists());
    }

    #[tokio::test]
    async fn remove_missing_dir_is_noop() {
        let root = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(root.path().join("never-created"));
        store.remove().await;
        store.remove().await;
        assert!(!store.exists());
    }
}
