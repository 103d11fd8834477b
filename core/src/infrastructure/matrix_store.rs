// Copyright (c) 2026 Opspulse
// SPDX-License-Identifier: AGPL-3.0

//! Durable pressure matrix store.
//!
//! Many independent probes write into one shared document, and independent
//! OS processes (CLI invocations, a running server) may write concurrently.
//! Serialization happens at two levels:
//!
//! - in-process, a single-writer owner task: handles are cheap sender
//!   clones and every command is serialized through the owner's mailbox;
//! - cross-process, an advisory file lock held around each
//!   reload-merge-persist cycle, so a write to sector A can never erase a
//!   concurrent write to sector B made by another process.
//!
//! The lock lives on a sibling `.lock` file rather than the document
//! itself: the atomic rename in [`persist`] replaces the document's inode,
//! which would silently detach a lock held on it. File IO runs on the
//! blocking pool, never on the async owner thread.
//!
//! The document persists as one JSON file, written atomically (temp file +
//! rename). A missing or corrupt file reinitializes an empty document
//! instead of failing.

use crate::domain::matrix::PressureMatrixDocument;
use crate::domain::pressure::{PressureReading, PressureSample};
use chrono::Utc;
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

const MAILBOX_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to persist pressure matrix to {path:?}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("pressure matrix store is shut down")]
    Closed,
}

enum StoreCommand {
    Update {
        group: String,
        sector: String,
        sample: PressureSample,
        reply: oneshot::Sender<Result<PressureReading, StoreError>>,
    },
    Snapshot {
        reply: oneshot::Sender<PressureMatrixDocument>,
    },
}

/// Cloneable handle to the store owner task.
#[derive(Clone)]
pub struct MatrixStore {
    tx: mpsc::Sender<StoreCommand>,
}

impl MatrixStore {
    /// Open the store at `path`, spawning the owner task. Must be called
    /// from within a tokio runtime.
    pub fn open(path: impl Into<PathBuf>, trend_threshold: u8) -> Self {
        let path = path.into();
        let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
        tokio::spawn(run_owner(path, trend_threshold, rx));
        Self { tx }
    }

    /// Merge a sample into the addressed sector and persist the document.
    /// Returns the stored reading (with trend assigned by the owner).
    pub async fn update(
        &self,
        group: &str,
        sector: &str,
        sample: PressureSample,
    ) -> Result<PressureReading, StoreError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(StoreCommand::Update {
                group: group.to_string(),
                sector: sector.to_string(),
                sample,
                reply,
            })
            .await
            .map_err(|_| StoreError::Closed)?;
        response.await.map_err(|_| StoreError::Closed)?
    }

    /// Current state of the whole document, including writes by other
    /// processes.
    pub async fn snapshot(&self) -> Result<PressureMatrixDocument, StoreError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(StoreCommand::Snapshot { reply })
            .await
            .map_err(|_| StoreError::Closed)?;
        response.await.map_err(|_| StoreError::Closed)
    }
}

async fn run_owner(path: PathBuf, trend_threshold: u8, mut rx: mpsc::Receiver<StoreCommand>) {
    info!(path = %path.display(), "pressure matrix store opened");
    while let Some(command) = rx.recv().await {
        match command {
            StoreCommand::Update {
                group,
                sector,
                sample,
                reply,
            } => {
                let path = path.clone();
                let result = tokio::task::spawn_blocking(move || {
                    locked_update(&path, &group, &sector, sample, trend_threshold)
                })
                .await
                .unwrap_or(Err(StoreError::Closed));

                match &result {
                    Ok(reading) => {
                        debug!(pressure = reading.pressure, trend = ?reading.trend,
                               "pressure matrix updated");
                    }
                    Err(err) => error!(error = %err, "failed to persist pressure matrix"),
                }
                let _ = reply.send(result);
            }
            StoreCommand::Snapshot { reply } => {
                let path = path.clone();
                let document = tokio::task::spawn_blocking(move || {
                    let _lock = FileLock::acquire(&path);
                    load_or_init(&path)
                })
                .await
                .unwrap_or_else(|_| PressureMatrixDocument::empty());
                let _ = reply.send(document);
            }
        }
    }
}

/// One locked read-merge-write cycle. Reloading under the lock picks up
/// whatever other processes persisted since our last write, so the trend
/// compares against the latest stored value regardless of who stored it.
fn locked_update(
    path: &Path,
    group: &str,
    sector: &str,
    sample: PressureSample,
    trend_threshold: u8,
) -> Result<PressureReading, StoreError> {
    let _lock = FileLock::acquire(path).map_err(|source| StoreError::Persist {
        path: path.to_path_buf(),
        source,
    })?;
    let mut document = load_or_init(path);
    let reading = document.apply(group, sector, sample, trend_threshold, Utc::now());
    persist(path, &document)?;
    Ok(reading)
}

/// Advisory exclusive lock on a sibling `.lock` file. Released when the
/// descriptor closes, so dropping the guard is enough.
struct FileLock {
    _file: File,
}

impl FileLock {
    fn acquire(path: &Path) -> std::io::Result<Self> {
        let lock_path = path.with_extension("json.lock");
        let file = File::create(&lock_path)?;
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            if unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) } != 0 {
                return Err(std::io::Error::last_os_error());
            }
        }
        Ok(Self { _file: file })
    }
}

fn load_or_init(path: &Path) -> PressureMatrixDocument {
    match std::fs::read_to_string(path) {
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(document) => document,
            Err(error) => {
                warn!(%error, path = %path.display(),
                      "pressure matrix is corrupt, reinitializing empty document");
                PressureMatrixDocument::empty()
            }
        },
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            PressureMatrixDocument::empty()
        }
        Err(error) => {
            warn!(%error, path = %path.display(),
                  "pressure matrix is unreadable, reinitializing empty document");
            PressureMatrixDocument::empty()
        }
    }
}

/// Atomic write: serialize to a sibling temp file, then rename over the
/// target. A crash mid-write never leaves a half-written document behind.
fn persist(path: &Path, document: &PressureMatrixDocument) -> Result<(), StoreError> {
    let to_store_err = |source: std::io::Error| StoreError::Persist {
        path: path.to_path_buf(),
        source,
    };

    let serialized = serde_json::to_string_pretty(document)
        .map_err(|e| to_store_err(std::io::Error::other(e)))?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, serialized).map_err(to_store_err)?;
    std::fs::rename(&tmp, path).map_err(to_store_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pressure::Trend;
    use serde_json::json;

    fn sample(label: &str, pressure: u8) -> PressureSample {
        PressureSample::new(label, pressure, json!({}))
    }

    fn store_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("pressure_matrix.json")
    }

    #[tokio::test]
    async fn concurrent_updates_to_distinct_sectors_both_persist() {
        let dir = tempfile::tempdir().unwrap();
        let store = MatrixStore::open(store_path(&dir), 5);

        let a = store.update("marketing", "email_health", sample("Email", 40));
        let b = store.update("commerce", "storefront", sample("Store", 70));
        let (a, b) = tokio::join!(a, b);
        a.unwrap();
        b.unwrap();

        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(snapshot.get("marketing", "email_health").unwrap().pressure, 40);
        assert_eq!(snapshot.get("commerce", "storefront").unwrap().pressure, 70);

        // And the persisted file agrees with the in-memory view.
        let raw = std::fs::read_to_string(store_path(&dir)).unwrap();
        let reloaded: PressureMatrixDocument = serde_json::from_str(&raw).unwrap();
        assert_eq!(reloaded.sector_count(), 2);
    }

    #[tokio::test]
    async fn independent_stores_on_one_path_merge_their_writes() {
        // Two owner tasks on the same file, as two separate processes
        // would have. Neither write may erase the other's sector.
        let dir = tempfile::tempdir().unwrap();
        let first = MatrixStore::open(store_path(&dir), 5);
        let second = MatrixStore::open(store_path(&dir), 5);

        let (a, b) = tokio::join!(
            first.update("commerce", "storefront", sample("Store", 70)),
            second.update("marketing", "email_health", sample("Email", 40)),
        );
        a.unwrap();
        b.unwrap();

        let raw = std::fs::read_to_string(store_path(&dir)).unwrap();
        let reloaded: PressureMatrixDocument = serde_json::from_str(&raw).unwrap();
        assert_eq!(reloaded.get("commerce", "storefront").unwrap().pressure, 70);
        assert_eq!(reloaded.get("marketing", "email_health").unwrap().pressure, 40);
    }

    #[tokio::test]
    async fn trend_tracks_writes_made_through_another_handle() {
        let dir = tempfile::tempdir().unwrap();
        let first = MatrixStore::open(store_path(&dir), 5);
        let second = MatrixStore::open(store_path(&dir), 5);

        first
            .update("commerce", "storefront", sample("Store", 20))
            .await
            .unwrap();
        let reading = second
            .update("commerce", "storefront", sample("Store", 60))
            .await
            .unwrap();
        assert_eq!(reading.trend, Trend::Up);
    }

    #[tokio::test]
    async fn trend_is_assigned_against_prior_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = MatrixStore::open(store_path(&dir), 5);

        let first = store
            .update("marketing", "email_health", sample("Email", 40))
            .await
            .unwrap();
        assert_eq!(first.trend, Trend::Stable);

        let second = store
            .update("marketing", "email_health", sample("Email", 60))
            .await
            .unwrap();
        assert_eq!(second.trend, Trend::Up);

        let third = store
            .update("marketing", "email_health", sample("Email", 60))
            .await
            .unwrap();
        assert_eq!(third.trend, Trend::Stable);
    }

    #[tokio::test]
    async fn corrupt_document_reinitializes_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_path(&dir);
        std::fs::write(&path, "{ this is not json").unwrap();

        let store = MatrixStore::open(path, 5);
        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(snapshot.sector_count(), 0);
    }

    #[tokio::test]
    async fn document_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_path(&dir);
        {
            let store = MatrixStore::open(path.clone(), 5);
            store
                .update("commerce", "storefront", sample("Store", 55))
                .await
                .unwrap();
        }
        let store = MatrixStore::open(path, 5);
        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(snapshot.get("commerce", "storefront").unwrap().pressure, 55);
    }
}
