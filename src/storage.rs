use crate::query::CountQuery;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::{fs, sync::Mutex};
use tracing::error;

type Collections = BTreeMap<String, BTreeMap<String, Value>>;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub key: String,
    pub data: Value,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("store serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("malformed document {collection}/{key}: {source}")]
    Decode {
        collection: String,
        key: String,
        source: serde_json::Error,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("invalid seed file {path}: {reason}")]
    InvalidSeed { path: String, reason: String },
}

/// The remote document database, reduced to the four calls the counter uses.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn fetch_all(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    async fn count(&self, query: &CountQuery) -> Result<u64, StoreError>;

    async fn set(&self, collection: &str, key: &str, value: Value) -> Result<(), StoreError>;

    async fn delete(&self, collection: &str, key: &str) -> Result<(), StoreError>;
}

pub struct LocalDocumentStore {
    path: Option<PathBuf>,
    collections: Mutex<Collections>,
}

impl LocalDocumentStore {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            collections: Mutex::new(Collections::new()),
        }
    }

    pub async fn open(path: &Path) -> Self {
        Self {
            path: Some(path.to_path_buf()),
            collections: Mutex::new(load_collections(path).await),
        }
    }

    async fn persist(&self, collections: &Collections) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let payload = serde_json::to_vec_pretty(collections)?;
        fs::write(path, payload).await?;
        Ok(())
    }
}

async fn load_collections(path: &Path) -> Collections {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(collections) => collections,
            Err(err) => {
                error!("failed to parse store file {}: {err}", path.display());
                Collections::new()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Collections::new(),
        Err(err) => {
            error!("failed to read store file {}: {err}", path.display());
            Collections::new()
        }
    }
}

#[async_trait]
impl DocumentStore for LocalDocumentStore {
    async fn fetch_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.lock().await;
        Ok(collections
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .map(|(key, data)| Document {
                        key: key.clone(),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn count(&self, query: &CountQuery) -> Result<u64, StoreError> {
        let collections = self.collections.lock().await;
        let count = collections
            .get(&query.collection)
            .map(|documents| documents.values().filter(|doc| query.matches(doc)).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn set(&self, collection: &str, key: &str, value: Value) -> Result<(), StoreError> {
        let mut collections = self.collections.lock().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), value);
        self.persist(&collections).await
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.lock().await;
        let removed = collections
            .get_mut(collection)
            .and_then(|documents| documents.remove(key))
            .is_some();
        if removed {
            self.persist(&collections).await?;
        }
        Ok(())
    }
}
