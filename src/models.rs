use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Marker id whose tally is kept but left out of the aggregate total.
pub const EXCLUDED_FROM_TOTAL: &str = "Event";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MarkerColor {
    Solid(String),
    Gradient(String, String),
}

impl MarkerColor {
    pub fn css_background(&self) -> String {
        match self {
            MarkerColor::Solid(color) => color.clone(),
            MarkerColor::Gradient(from, to) => {
                format!("no-repeat padding-box linear-gradient({from}, {to})")
            }
        }
    }
}

/// A tally category. Administered out-of-band; the document key is the id,
/// so the id itself is never written into the document body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerType {
    #[serde(default, skip_serializing)]
    pub id: String,
    pub color: MarkerColor,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<f64>,
}

pub fn sort_marker_types(markers: &mut [MarkerType]) {
    markers.sort_by(|a, b| {
        let by_order = match (a.order, b.order) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_order.then_with(|| a.label.cmp(&b.label))
    });
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterRecord {
    pub owner: String,
    #[serde(rename = "timeStamp", with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl CounterRecord {
    pub fn key(&self) -> String {
        record_key(&self.owner, self.timestamp)
    }
}

pub fn record_key(owner: &str, timestamp: DateTime<Utc>) -> String {
    format!("{owner}:{}", timestamp.timestamp_millis())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum LogEntryKind {
    Marker(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalLogEntry {
    pub key: String,
    pub timestamp: DateTime<Utc>,
    pub kind: LogEntryKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CounterCounts(BTreeMap<String, i64>);

impl CounterCounts {
    pub fn get(&self, marker: &str) -> i64 {
        self.0.get(marker).copied().unwrap_or(0)
    }

    pub fn increment(&mut self, marker: &str) {
        *self.0.entry(marker.to_string()).or_insert(0) += 1;
    }

    pub fn decrement(&mut self, marker: &str) {
        *self.0.entry(marker.to_string()).or_insert(0) -= 1;
    }

    pub fn total(&self) -> i64 {
        self.0
            .iter()
            .filter(|(marker, _)| marker.as_str() != EXCLUDED_FROM_TOTAL)
            .map(|(_, count)| *count)
            .sum()
    }
}

impl FromIterator<(String, i64)> for CounterCounts {
    fn from_iter<T: IntoIterator<Item = (String, i64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub owner_id: String,
    pub reference_time: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentDraftRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct KeypadRequest {
    pub key: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkerView {
    pub id: String,
    pub label: String,
    pub background: String,
    pub count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogEntryView {
    pub key: String,
    pub time: String,
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionView {
    pub id: Uuid,
    pub owner_id: String,
    pub ready: bool,
    pub offset_ms: Option<i64>,
    pub logical_now: Option<String>,
    pub markers: Vec<MarkerView>,
    pub total: i64,
    pub log: Vec<LogEntryView>,
    pub can_undo: bool,
    pub comment_text: String,
    pub camera_number_text: String,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn marker(id: &str, label: &str, order: Option<f64>) -> MarkerType {
        MarkerType {
            id: id.to_string(),
            color: MarkerColor::Solid("#fff".to_string()),
            label: label.to_string(),
            order,
        }
    }

    #[test]
    fn total_skips_event_marker() {
        let counts: CounterCounts = [
            ("Adult".to_string(), 4),
            ("Child".to_string(), 2),
            (EXCLUDED_FROM_TOTAL.to_string(), 9),
        ]
        .into_iter()
        .collect();
        assert_eq!(counts.total(), 6);
        assert_eq!(counts.get(EXCLUDED_FROM_TOTAL), 9);
        assert_eq!(counts.get("missing"), 0);
    }

    #[test]
    fn markers_sort_by_order_then_unordered_last() {
        let mut markers = vec![
            marker("c", "Gamma", None),
            marker("b", "Beta", Some(2.0)),
            marker("a", "Alpha", Some(1.0)),
            marker("d", "Delta", None),
        ];
        sort_marker_types(&mut markers);
        let ids: Vec<_> = markers.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "d", "c"]);
    }

    #[test]
    fn marker_color_accepts_one_or_two_colors() {
        let solid: MarkerColor = serde_json::from_str("\"#123456\"").unwrap();
        assert_eq!(solid.css_background(), "#123456");

        let gradient: MarkerColor = serde_json::from_str("[\"#22e6d3\", \"#0092aa\"]").unwrap();
        assert_eq!(
            gradient.css_background(),
            "no-repeat padding-box linear-gradient(#22e6d3, #0092aa)"
        );
    }

    #[test]
    fn record_document_uses_store_field_names() {
        let record = CounterRecord {
            owner: "bob".to_string(),
            timestamp: Utc.timestamp_millis_opt(1_700_000_000_123).unwrap(),
            marker: None,
            camera_number: Some(7),
            comment: Some("gate".to_string()),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["timeStamp"], 1_700_000_000_123i64);
        assert_eq!(value["cameraNumber"], 7);
        assert!(value.get("marker").is_none());
        assert_eq!(record.key(), "bob:1700000000123");
    }

    #[test]
    fn marker_document_omits_id() {
        let value = serde_json::to_value(marker("A", "Alpha", Some(1.0))).unwrap();
        assert!(value.get("id").is_none());
        assert_eq!(value["label"], "Alpha");
    }
}
