//! Local snapshot persistence
//!
//! The full serialized `SiteData` lives under one fixed key. It is read once
//! at start-up and rewritten after every state change. Rewrites go through
//! [`SnapshotWriter`], which coalesces bursts of changes with a trailing
//! debounce so rapid edits produce one write of the latest state.

use crate::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default key for the persisted site snapshot
pub const DEFAULT_SNAPSHOT_KEY: &str = "stagefront_site_data";

/// String-keyed blob storage for the local snapshot
pub trait SnapshotStore: Send + Sync {
    /// Read the blob stored under `key`, `None` when never written
    fn load(&self, key: &str) -> Result<Option<String>>;

    /// Replace the blob stored under `key`
    fn save(&self, key: &str, payload: &str) -> Result<()>;
}

/// One file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(Error::InvalidInput(format!("invalid snapshot key '{}'", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, payload: &str) -> Result<()> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;

        // Write beside the target then rename so readers never see a torn file
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, payload)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// In-process store, used by tests and by `--ephemeral` runs
#[derive(Debug, Default, Clone)]
pub struct MemorySnapshotStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
    writes: Arc<Mutex<usize>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with one entry
    pub fn with_entry(key: &str, payload: &str) -> Self {
        let store = Self::new();
        if let Ok(mut entries) = store.entries.lock() {
            entries.insert(key.to_string(), payload.to_string());
        }
        store
    }

    /// Number of `save` calls so far
    pub fn write_count(&self) -> usize {
        self.writes.lock().map(|w| *w).unwrap_or(0)
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| Error::Internal("snapshot store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn save(&self, key: &str, payload: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::Internal("snapshot store lock poisoned".to_string()))?;
        entries.insert(key.to_string(), payload.to_string());
        if let Ok(mut writes) = self.writes.lock() {
            *writes += 1;
        }
        Ok(())
    }
}

enum WriterMsg {
    Save(String),
    Flush(oneshot::Sender<()>),
}

/// Trailing-debounce writer for the local snapshot
///
/// Each [`schedule`](Self::schedule) replaces the pending payload and restarts
/// the quiet-period timer; the store is written once the timer expires with
/// no further changes. Pending payloads are written on [`flush`](Self::flush)
/// and when the writer is closed.
pub struct SnapshotWriter {
    tx: mpsc::UnboundedSender<WriterMsg>,
    handle: Option<JoinHandle<()>>,
}

impl SnapshotWriter {
    /// Spawn the writer task; must be called inside a tokio runtime
    pub fn spawn(store: Arc<dyn SnapshotStore>, key: impl Into<String>, debounce: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_writer(store, key.into(), debounce, rx));
        Self {
            tx,
            handle: Some(handle),
        }
    }

    /// Queue `payload` as the latest snapshot
    pub fn schedule(&self, payload: String) {
        if self.tx.send(WriterMsg::Save(payload)).is_err() {
            warn!("Snapshot writer stopped; dropping snapshot update");
        }
    }

    /// Write any pending payload now and wait for it to land
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(WriterMsg::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }

    /// Stop accepting updates, write what is pending and wait for the task
    pub async fn close(mut self) {
        let (tx, _) = mpsc::unbounded_channel();
        drop(std::mem::replace(&mut self.tx, tx));
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

async fn run_writer(
    store: Arc<dyn SnapshotStore>,
    key: String,
    debounce: Duration,
    mut rx: mpsc::UnboundedReceiver<WriterMsg>,
) {
    let mut pending: Option<String> = None;

    loop {
        let msg = if pending.is_some() {
            tokio::select! {
                msg = rx.recv() => msg,
                _ = tokio::time::sleep(debounce) => {
                    write_pending(&store, &key, &mut pending).await;
                    continue;
                }
            }
        } else {
            rx.recv().await
        };

        match msg {
            Some(WriterMsg::Save(payload)) => pending = Some(payload),
            Some(WriterMsg::Flush(ack)) => {
                write_pending(&store, &key, &mut pending).await;
                let _ = ack.send(());
            }
            None => {
                write_pending(&store, &key, &mut pending).await;
                debug!("Snapshot writer closed");
                break;
            }
        }
    }
}

async fn write_pending(store: &Arc<dyn SnapshotStore>, key: &str, pending: &mut Option<String>) {
    let Some(payload) = pending.take() else {
        return;
    };

    let store = Arc::clone(store);
    let key = key.to_string();
    let bytes = payload.len();
    match tokio::task::spawn_blocking(move || store.save(&key, &payload)).await {
        Ok(Ok(())) => debug!("Persisted site snapshot ({} bytes)", bytes),
        Ok(Err(e)) => warn!("Failed to persist site snapshot: {}", e),
        Err(e) => warn!("Snapshot write task failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_roundtrip_and_missing_key() {
        let dir = TempDir::new().unwrap();
        let store = FileSnapshotStore::new(dir.path().join("nested"));

        assert_eq!(store.load("site").unwrap(), None);
        store.save("site", "{\"a\":1}").unwrap();
        assert_eq!(store.load("site").unwrap().as_deref(), Some("{\"a\":1}"));
        assert!(!dir.path().join("nested/site.json.tmp").exists());
    }

    #[test]
    fn test_file_store_rejects_path_like_keys() {
        let store = FileSnapshotStore::new("/tmp");
        assert!(store.save("../escape", "x").is_err());
        assert!(store.load("").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_writer_coalesces_bursts() {
        let store = MemorySnapshotStore::new();
        let writer = SnapshotWriter::spawn(Arc::new(store.clone()), "k", Duration::from_millis(200));

        for i in 0..5 {
            writer.schedule(format!("v{}", i));
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(store.write_count(), 0, "no write while edits keep arriving");

        tokio::time::sleep(Duration::from_millis(300)).await;
        // Let the blocking save complete
        writer.flush().await;

        assert_eq!(store.write_count(), 1);
        assert_eq!(store.load("k").unwrap().as_deref(), Some("v4"));
    }

    #[tokio::test]
    async fn test_flush_writes_pending_immediately() {
        let store = MemorySnapshotStore::new();
        let writer = SnapshotWriter::spawn(Arc::new(store.clone()), "k", Duration::from_secs(3600));

        writer.schedule("latest".to_string());
        writer.flush().await;

        assert_eq!(store.load("k").unwrap().as_deref(), Some("latest"));
    }

    #[tokio::test]
    async fn test_close_writes_pending() {
        let store = MemorySnapshotStore::new();
        let writer = SnapshotWriter::spawn(Arc::new(store.clone()), "k", Duration::from_secs(3600));

        writer.schedule("final".to_string());
        writer.close().await;

        assert_eq!(store.load("k").unwrap().as_deref(), Some("final"));
    }
}
