use crate::clock::format_localized;
use crate::models::CounterRecord;
use crate::records::{load_counter_records, load_marker_types};
use crate::storage::{DocumentStore, StoreError};
use std::collections::HashMap;

pub const EXPORT_FILE_NAME: &str = "TimedCounterData.txt";

/// `owner: datetime[ (label)][ Ccamera][ //comment]`
pub fn format_record_line(record: &CounterRecord, labels: &HashMap<String, String>) -> String {
    let mut line = format!("{}: {}", record.owner, format_localized(record.timestamp));
    if let Some(marker) = &record.marker {
        let label = labels.get(marker).map(String::as_str).unwrap_or(marker.as_str());
        line.push_str(&format!(" ({label})"));
    }
    if let Some(camera) = record.camera_number {
        line.push_str(&format!(" C{camera}"));
    }
    if let Some(comment) = &record.comment {
        line.push_str(&format!(" //{comment}"));
    }
    line
}

pub async fn export_database(store: &dyn DocumentStore) -> Result<String, StoreError> {
    let labels: HashMap<String, String> = load_marker_types(store)
        .await?
        .into_iter()
        .map(|marker| (marker.id, marker.label))
        .collect();
    let records = load_counter_records(store).await?;

    Ok(records
        .iter()
        .map(|record| format_record_line(record, &labels))
        .collect::<Vec<_>>()
        .join("\n"))
}
