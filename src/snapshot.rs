//! File-backed cache for the serialized merchant directory.
//!
//! Every stored blob is versioned by its SHA-256 digest. Writers go through
//! [`SnapshotStore::compare_and_swap`], which holds an exclusive lock file
//! while it checks that the cache still holds the version the writer started
//! from, so two concurrent read-insert-write cycles cannot silently drop one
//! of the inserts.
//!
//! The lock file records the holder's pid and the time it was taken. A lock
//! older than [`STALE_LOCK_AFTER`] belongs to a writer that died without
//! cleaning up and is broken by the next writer.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// A write holds the lock for one read and one rename, far below this.
pub const STALE_LOCK_AFTER: Duration = Duration::from_secs(30);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub blob: String,
    pub version: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SwapOutcome {
    Stored { version: String },
    /// The cache moved on since the caller read it.
    Conflict { current: Option<String> },
    /// Another writer holds the lock.
    Locked,
}

pub fn version_of(blob: &str) -> String {
    hex::encode(Sha256::digest(blob.as_bytes()))
}

pub struct SnapshotStore {
    path: PathBuf,
    stale_lock_after: Duration,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SnapshotStore {
            path: path.into(),
            stale_lock_after: STALE_LOCK_AFTER,
        }
    }

    pub fn with_stale_lock_after(mut self, stale_lock_after: Duration) -> Self {
        self.stale_lock_after = stale_lock_after;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(suffix);
        name.into()
    }

    pub fn load(&self) -> Result<Option<Snapshot>> {
        match fs::read_to_string(&self.path) {
            Ok(blob) => Ok(Some(Snapshot {
                version: version_of(&blob),
                blob,
            })),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err)
                .with_context(|| format!("failed to read snapshot {}", self.path.display())),
        }
    }

    /// Replaces the cached blob if its current version is `expected`
    /// (`None` meaning no snapshot exists yet).
    pub fn compare_and_swap(&self, expected: Option<&str>, blob: &str) -> Result<SwapOutcome> {
        let Some(_lock) = WriteLock::acquire(self.sibling(".lock"), self.stale_lock_after)? else {
            return Ok(SwapOutcome::Locked);
        };

        let current = self.load()?.map(|snapshot| snapshot.version);
        if current.as_deref() != expected {
            debug!(?expected, ?current, "snapshot version moved");
            return Ok(SwapOutcome::Conflict { current });
        }

        let staging = self.sibling(".tmp");
        let mut file = File::create(&staging)
            .with_context(|| format!("failed to create {}", staging.display()))?;
        file.write_all(blob.as_bytes())?;
        file.sync_all()?;
        drop(file);
        fs::rename(&staging, &self.path)
            .with_context(|| format!("failed to replace snapshot {}", self.path.display()))?;

        let version = version_of(blob);
        debug!(path = %self.path.display(), %version, "stored snapshot");
        Ok(SwapOutcome::Stored { version })
    }
}

struct WriteLock {
    path: PathBuf,
}

impl WriteLock {
    fn acquire(path: PathBuf, stale_after: Duration) -> Result<Option<Self>> {
        if let Some(lock) = Self::try_create(&path)? {
            return Ok(Some(lock));
        }
        if !Self::is_stale(&path, stale_after)? {
            return Ok(None);
        }

        warn!(path = %path.display(), "breaking stale snapshot lock");
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                return Err(err).with_context(|| format!("failed to break {}", path.display()))
            }
        }
        Self::try_create(&path)
    }

    fn try_create(path: &Path) -> Result<Option<Self>> {
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                let lock = WriteLock {
                    path: path.to_path_buf(),
                };
                writeln!(file, "{}", process::id())?;
                writeln!(file, "{}", Utc::now().to_rfc3339())?;
                Ok(Some(lock))
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(None),
            Err(err) => Err(err).with_context(|| format!("failed to lock {}", path.display())),
        }
    }

    /// Age comes from the recorded timestamp, or the file's mtime when the
    /// holder died before writing one.
    fn is_stale(path: &Path, stale_after: Duration) -> Result<bool> {
        let taken_at = match fs::read_to_string(path) {
            Ok(contents) => contents
                .lines()
                .nth(1)
                .and_then(|line| DateTime::parse_from_rfc3339(line.trim()).ok())
                .map(SystemTime::from),
            // Released between our attempts
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(true),
            Err(err) => {
                return Err(err).with_context(|| format!("failed to inspect {}", path.display()))
            }
        };
        let taken_at = match taken_at {
            Some(taken_at) => taken_at,
            None => fs::metadata(path)
                .and_then(|metadata| metadata.modified())
                .with_context(|| format!("failed to inspect {}", path.display()))?,
        };

        let age = SystemTime::now()
            .duration_since(taken_at)
            .unwrap_or(Duration::ZERO);
        Ok(age >= stale_after)
    }
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %err, "failed to release snapshot lock");
        }
    }
}
