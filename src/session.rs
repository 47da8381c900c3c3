use crate::clock::{TimeOffset, format_clock, reference_instant};
use crate::models::{
    CounterCounts, CounterRecord, LocalLogEntry, LogEntryKind, LogEntryView, MarkerType,
    MarkerView, SessionView, sort_marker_types,
};
use crate::storage::StoreError;
use chrono::{DateTime, Duration, Local, Utc};
use thiserror::Error;
use uuid::Uuid;

const MAX_CAMERA_DIGITS: usize = 9;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("enter an owner ID and the current time first")]
    NotReady,
    #[error("nothing to undo")]
    NothingToUndo,
    #[error("unknown marker '{0}'")]
    UnknownMarker(String),
    #[error("comment is empty")]
    EmptyComment,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefreshTicket {
    pub seq: u64,
    pub marker_ids: Vec<String>,
}

#[derive(Debug, Default)]
pub struct SessionController {
    owner_id: String,
    offset: Option<TimeOffset>,
    comment_text: String,
    camera_number_text: String,
    markers: Vec<MarkerType>,
    log: Vec<LocalLogEntry>,
    counts: CounterCounts,
    error: Option<String>,
    issued_refresh_seq: u64,
    applied_refresh_seq: u64,
    last_timestamp: Option<DateTime<Utc>>,
}

impl SessionController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unparseable time text is ignored without a message. Once ready,
    /// further calls change nothing. Returns whether the session became ready.
    pub fn start_session(&mut self, owner_id: &str, reference_text: &str, now: DateTime<Local>) -> bool {
        if self.allow_add_record() {
            return false;
        }
        self.owner_id = owner_id.trim().to_string();
        if let Some(reference) = reference_instant(reference_text, now) {
            self.offset = Some(TimeOffset::between(reference, now));
        }
        self.allow_add_record()
    }

    pub fn allow_add_record(&self) -> bool {
        !self.owner_id.trim().is_empty() && self.offset.is_some()
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn offset(&self) -> Option<TimeOffset> {
        self.offset
    }

    pub fn logical_now(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.offset.map(|offset| offset.apply(now))
    }

    pub fn set_marker_types(&mut self, mut markers: Vec<MarkerType>) {
        sort_marker_types(&mut markers);
        self.markers = markers;
    }

    pub fn markers(&self) -> &[MarkerType] {
        &self.markers
    }

    pub fn counts(&self) -> &CounterCounts {
        &self.counts
    }

    pub fn total(&self) -> i64 {
        self.counts.total()
    }

    pub fn log(&self) -> &[LocalLogEntry] {
        &self.log
    }

    // Keys are `owner:millis`, so every record of this session gets a
    // strictly later millisecond than the one before it.
    fn next_timestamp(&mut self, now: DateTime<Utc>) -> Result<DateTime<Utc>, SessionError> {
        let mut timestamp = self.logical_now(now).ok_or(SessionError::NotReady)?;
        if let Some(last) = self.last_timestamp {
            let floor = last + Duration::milliseconds(1);
            if timestamp.timestamp_millis() < floor.timestamp_millis() {
                timestamp = floor;
            }
        }
        self.last_timestamp = Some(timestamp);
        Ok(timestamp)
    }

    pub fn record_marker_event(
        &mut self,
        marker_id: &str,
        now: DateTime<Utc>,
    ) -> Result<CounterRecord, SessionError> {
        if !self.allow_add_record() {
            return Err(SessionError::NotReady);
        }
        if !self.markers.iter().any(|marker| marker.id == marker_id) {
            return Err(SessionError::UnknownMarker(marker_id.to_string()));
        }

        let timestamp = self.next_timestamp(now)?;
        let record = CounterRecord {
            owner: self.owner_id.clone(),
            timestamp,
            marker: Some(marker_id.to_string()),
            camera_number: None,
            comment: None,
        };
        self.log.push(LocalLogEntry {
            key: record.key(),
            timestamp,
            kind: LogEntryKind::Marker(marker_id.to_string()),
        });
        self.counts.increment(marker_id);
        Ok(record)
    }

    pub fn record_comment(&mut self, now: DateTime<Utc>) -> Result<CounterRecord, SessionError> {
        if !self.allow_add_record() {
            return Err(SessionError::NotReady);
        }
        let comment = self.comment_text.trim().to_string();
        if comment.is_empty() {
            return Err(SessionError::EmptyComment);
        }

        let timestamp = self.next_timestamp(now)?;
        let record = CounterRecord {
            owner: self.owner_id.clone(),
            timestamp,
            marker: None,
            camera_number: self.camera_number_text.parse().ok(),
            comment: Some(comment.clone()),
        };
        self.log.push(LocalLogEntry {
            key: record.key(),
            timestamp,
            kind: LogEntryKind::Comment(comment),
        });
        self.comment_text.clear();
        self.camera_number_text.clear();
        Ok(record)
    }

    pub fn undo_last(&mut self) -> Result<LocalLogEntry, SessionError> {
        let entry = self.log.pop().ok_or(SessionError::NothingToUndo)?;
        if let LogEntryKind::Marker(marker_id) = &entry.kind {
            self.counts.decrement(marker_id);
        }
        Ok(entry)
    }

    pub fn begin_refresh(&mut self) -> RefreshTicket {
        self.issued_refresh_seq += 1;
        RefreshTicket {
            seq: self.issued_refresh_seq,
            marker_ids: self.markers.iter().map(|marker| marker.id.clone()).collect(),
        }
    }

    pub fn apply_refresh(&mut self, seq: u64, counts: CounterCounts) -> bool {
        if seq <= self.applied_refresh_seq {
            return false;
        }
        self.applied_refresh_seq = seq;
        self.counts = counts;
        true
    }

    pub fn report(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_comment_text(&mut self, text: &str) {
        self.comment_text = text.to_string();
    }

    pub fn comment_text(&self) -> &str {
        &self.comment_text
    }

    pub fn push_camera_digit(&mut self, digit: char) -> bool {
        if !digit.is_ascii_digit() || self.camera_number_text.len() >= MAX_CAMERA_DIGITS {
            return false;
        }
        self.camera_number_text.push(digit);
        true
    }

    pub fn pop_camera_digit(&mut self) {
        self.camera_number_text.pop();
    }

    pub fn clear_camera_number(&mut self) {
        self.camera_number_text.clear();
    }

    pub fn camera_number_text(&self) -> &str {
        &self.camera_number_text
    }

    pub fn view(&self, id: Uuid, now: DateTime<Utc>) -> SessionView {
        let markers = self
            .markers
            .iter()
            .map(|marker| MarkerView {
                id: marker.id.clone(),
                label: marker.label.clone(),
                background: marker.color.css_background(),
                count: self.counts.get(&marker.id),
            })
            .collect();
        let log = self
            .log
            .iter()
            .rev()
            .map(|entry| LogEntryView {
                key: entry.key.clone(),
                time: format_clock(entry.timestamp),
                description: match &entry.kind {
                    LogEntryKind::Marker(marker_id) => self.marker_label(marker_id).to_string(),
                    LogEntryKind::Comment(comment) => format!("//{comment}"),
                },
            })
            .collect();

        SessionView {
            id,
            owner_id: self.owner_id.clone(),
            ready: self.allow_add_record(),
            offset_ms: self.offset.map(|offset| offset.as_millis()),
            logical_now: self.logical_now(now).map(format_clock),
            markers,
            total: self.total(),
            log,
            can_undo: !self.log.is_empty(),
            comment_text: self.comment_text.clone(),
            camera_number_text: self.camera_number_text.clone(),
            error: self.error.clone(),
        }
    }

    fn marker_label<'a>(&'a self, marker_id: &'a str) -> &'a str {
        self.markers
            .iter()
            .find(|marker| marker.id == marker_id)
            .map(|marker| marker.label.as_str())
            .unwrap_or(marker_id)
    }
}
