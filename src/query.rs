use chrono::{DateTime, Utc};
use serde_json::Value;
use std::cmp::Ordering;

pub const MARKER_TYPES: &str = "markerTypes";
pub const COUNTER_RECORDS: &str = "counterRecords";

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    Gt(String, Value),
}

impl Filter {
    pub fn matches(&self, document: &Value) -> bool {
        match self {
            Filter::Eq(field, expected) => document.get(field) == Some(expected),
            Filter::Gt(field, bound) => document
                .get(field)
                .and_then(|actual| compare(actual, bound))
                .is_some_and(|ordering| ordering == Ordering::Greater),
        }
    }
}

fn compare(actual: &Value, bound: &Value) -> Option<Ordering> {
    match (actual, bound) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CountQuery {
    pub collection: String,
    pub filters: Vec<Filter>,
}

impl CountQuery {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filters: Vec::new(),
        }
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(field.into(), value.into()));
        self
    }

    pub fn where_gt(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Gt(field.into(), value.into()));
        self
    }

    /// Records tallied against `marker_id` strictly after `since`.
    pub fn markers_since(marker_id: &str, since: DateTime<Utc>) -> Self {
        Self::new(COUNTER_RECORDS)
            .where_eq("marker", marker_id)
            .where_gt("timeStamp", since.timestamp_millis())
    }

    pub fn matches(&self, document: &Value) -> bool {
        self.filters.iter().all(|filter| filter.matches(document))
    }
}
