//! KV bindings backing the store proxy
//!
//! The proxy only ever touches one record, but bindings are keyed so the same
//! storage directory can hold records for several sites.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Error, Debug)]
pub enum KvError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

/// Key-value storage for raw record text
#[async_trait]
pub trait KvBinding: Send + Sync {
    /// Stored text for `key`, `None` if never written
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    /// Replace the text stored under `key`
    async fn put(&self, key: &str, value: String) -> Result<(), KvError>;
}

/// One file per key under a data directory
#[derive(Debug, Clone)]
pub struct FileKv {
    dir: PathBuf,
}

impl FileKv {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, KvError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
            && !key.starts_with('.');
        if !valid {
            return Err(KvError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.kv", key)))
    }
}

#[async_trait]
impl KvBinding for FileKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, value: String) -> Result<(), KvError> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        // Temp file + rename keeps concurrent GETs from reading half a record
        let tmp = path.with_extension("kv.tmp");
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

/// Process-local binding; contents are lost on restart
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvBinding for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<(), KvError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_kv_missing_then_stored() {
        let dir = TempDir::new().unwrap();
        let kv = FileKv::new(dir.path());

        assert_eq!(kv.get("site_data").await.unwrap(), None);

        kv.put("site_data", "{\"hero\":{}}".to_string()).await.unwrap();
        assert_eq!(
            kv.get("site_data").await.unwrap().as_deref(),
            Some("{\"hero\":{}}")
        );
    }

    #[tokio::test]
    async fn test_file_kv_overwrites() {
        let dir = TempDir::new().unwrap();
        let kv = FileKv::new(dir.path());

        kv.put("k", "one".to_string()).await.unwrap();
        kv.put("k", "two".to_string()).await.unwrap();
        assert_eq!(kv.get("k").await.unwrap().as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn test_file_kv_rejects_traversal() {
        let kv = FileKv::new("/tmp");
        assert!(matches!(kv.get("../etc/passwd").await, Err(KvError::InvalidKey(_))));
        assert!(matches!(kv.put(".hidden", String::new()).await, Err(KvError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_memory_kv() {
        let kv = MemoryKv::new();
        assert_eq!(kv.get("k").await.unwrap(), None);
        kv.put("k", "v".to_string()).await.unwrap();
        assert_eq!(kv.get("k").await.unwrap().as_deref(), Some("v"));
    }
}
