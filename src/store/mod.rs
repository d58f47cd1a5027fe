//! Snapshot persistence.
//!
//! One snapshot file per competition, holding the full
//! [`CompetitionState`] inside a versioned, checksummed JSON envelope:
//!
//! - the schema version gates decoding: an unknown version is an
//!   error, never a silent best-effort parse;
//! - the checksum is a SHA-256 of the encoded state and catches torn
//!   or hand-edited snapshots before they reach the engine.
//!
//! Saves write a temporary file in the snapshot directory and rename it
//! over the previous snapshot, so a failed save leaves the committed
//! snapshot readable. [`SnapshotStore::update`] wraps the whole
//! load-mutate-save cycle behind an advisory lock file, giving the
//! at-most-one-writer guarantee across processes.

use log::info;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::PathBuf;

use crate::models::CompetitionState;

/// Current snapshot schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Snapshot store failures. Always fatal to the current call; the
/// previously committed snapshot is never touched by a failed operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("competition '{0}' not found")]
    NotFound(String),

    #[error("competition '{0}' is locked by another writer")]
    Locked(String),

    #[error("snapshot io: {0}")]
    Io(#[from] io::Error),

    #[error("snapshot encoding: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("snapshot schema version {0} is not supported")]
    UnsupportedVersion(u32),

    #[error("snapshot for '{0}' failed its checksum; refusing to load corrupted state")]
    ChecksumMismatch(String),
}

/// On-disk envelope, decode side.
#[derive(Deserialize)]
struct SnapshotEnvelope {
    schema_version: u32,
    checksum: String,
    state: CompetitionState,
}

/// On-disk envelope, encode side (borrows the state).
#[derive(Serialize)]
struct SnapshotEnvelopeRef<'a> {
    schema_version: u32,
    checksum: &'a str,
    state: &'a CompetitionState,
}

/// File-backed snapshot store: one JSON snapshot per competition.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    /// Opens a store rooted at the given directory, creating it if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Path of the snapshot for a competition name.
    pub fn snapshot_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.json", file_stem(name)))
    }

    fn lock_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.lock", file_stem(name)))
    }

    /// Whether a snapshot exists for the competition.
    pub fn exists(&self, name: &str) -> bool {
        self.snapshot_path(name).is_file()
    }

    /// Loads the snapshot for a named competition.
    ///
    /// Fails with [`StoreError::NotFound`] when no snapshot exists, and
    /// refuses snapshots with an unknown schema version or a checksum
    /// that does not match their content.
    pub fn load(&self, name: &str) -> Result<CompetitionState, StoreError> {
        let path = self.snapshot_path(name);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let envelope: SnapshotEnvelope = serde_json::from_str(&raw)?;
        if envelope.schema_version != SCHEMA_VERSION {
            return Err(StoreError::UnsupportedVersion(envelope.schema_version));
        }

        let body = serde_json::to_string(&envelope.state)?;
        if checksum(&body) != envelope.checksum {
            return Err(StoreError::ChecksumMismatch(name.to_string()));
        }

        Ok(envelope.state)
    }

    /// Atomically replaces the snapshot for the state's competition.
    ///
    /// The new snapshot is written to a temporary file in the same
    /// directory and renamed over the old one; on any failure the prior
    /// snapshot remains intact and the error propagates.
    pub fn save(&self, state: &CompetitionState) -> Result<(), StoreError> {
        let body = serde_json::to_string(state)?;
        let digest = checksum(&body);
        let envelope = SnapshotEnvelopeRef {
            schema_version: SCHEMA_VERSION,
            checksum: &digest,
            state,
        };
        let json = serde_json::to_string_pretty(&envelope)?;

        let path = self.snapshot_path(state.name());
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;

        info!(
            "saved snapshot for '{}' ({} students)",
            state.name(),
            state.student_count()
        );
        Ok(())
    }

    /// Runs one load-mutate-save transaction under the competition's
    /// advisory lock.
    ///
    /// Fails fast with [`StoreError::Locked`] when another writer holds
    /// the lock; the lock is released on every exit path.
    pub fn update<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut CompetitionState) -> T,
    ) -> Result<T, StoreError> {
        let _lock = LockGuard::acquire(self.lock_path(name), name)?;
        let mut state = self.load(name)?;
        let out = f(&mut state);
        self.save(&state)?;
        Ok(out)
    }
}

/// Held lock file; removed on drop.
struct LockGuard {
    path: PathBuf,
}

impl LockGuard {
    fn acquire(path: PathBuf, name: &str) -> Result<Self, StoreError> {
        match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(Self { path }),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(StoreError::Locked(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// SHA-256 hex digest of snapshot content.
fn checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Flattens a competition name into a file stem: alphanumerics, `-`,
/// and `_` pass through, everything else becomes `_`.
fn file_stem(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
