use crate::models::{CounterRecord, MarkerType};
use crate::query::{COUNTER_RECORDS, CountQuery, MARKER_TYPES};
use crate::storage::{Document, DocumentStore, StoreError};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio::fs;

fn decode<T: DeserializeOwned>(collection: &str, document: Document) -> Result<T, StoreError> {
    serde_json::from_value(document.data).map_err(|source| StoreError::Decode {
        collection: collection.to_string(),
        key: document.key,
        source,
    })
}

pub async fn load_marker_types(store: &dyn DocumentStore) -> Result<Vec<MarkerType>, StoreError> {
    store
        .fetch_all(MARKER_TYPES)
        .await?
        .into_iter()
        .map(|document| -> Result<MarkerType, StoreError> {
            let id = document.key.clone();
            let mut marker: MarkerType = decode(MARKER_TYPES, document)?;
            marker.id = id;
            Ok(marker)
        })
        .collect()
}

pub async fn load_counter_records(
    store: &dyn DocumentStore,
) -> Result<Vec<CounterRecord>, StoreError> {
    store
        .fetch_all(COUNTER_RECORDS)
        .await?
        .into_iter()
        .map(|document| decode::<CounterRecord>(COUNTER_RECORDS, document))
        .collect()
}

pub async fn save_record(store: &dyn DocumentStore, record: &CounterRecord) -> Result<(), StoreError> {
    let value = serde_json::to_value(record)?;
    store.set(COUNTER_RECORDS, &record.key(), value).await
}

pub async fn delete_record(store: &dyn DocumentStore, key: &str) -> Result<(), StoreError> {
    store.delete(COUNTER_RECORDS, key).await
}

pub async fn count_marker_since(
    store: &dyn DocumentStore,
    marker_id: &str,
    since: DateTime<Utc>,
) -> Result<i64, StoreError> {
    let count = store.count(&CountQuery::markers_since(marker_id, since)).await?;
    Ok(count as i64)
}

pub async fn seed_marker_types(store: &dyn DocumentStore, path: &Path) -> Result<usize, StoreError> {
    let bytes = fs::read(path).await?;
    let markers: Vec<MarkerType> = serde_json::from_slice(&bytes)?;
    for marker in &markers {
        if marker.id.trim().is_empty() {
            return Err(StoreError::InvalidSeed {
                path: path.display().to_string(),
                reason: format!("marker '{}' has no id", marker.label),
            });
        }
        store
            .set(MARKER_TYPES, &marker.id, serde_json::to_value(marker)?)
            .await?;
    }
    Ok(markers.len())
}
