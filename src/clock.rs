use chrono::{DateTime, Duration, Local, NaiveTime, Utc};

const TIME_OF_DAY_FORMATS: [&str; 6] = [
    "%I:%M:%S %p",
    "%I:%M %p",
    "%I:%M:%S%p",
    "%I:%M%p",
    "%H:%M:%S",
    "%H:%M",
];

pub fn parse_time_of_day(text: &str) -> Option<NaiveTime> {
    let normalized = text.trim().to_ascii_uppercase();
    if normalized.is_empty() {
        return None;
    }
    TIME_OF_DAY_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(&normalized, format).ok())
}

pub fn reference_instant(text: &str, now: DateTime<Local>) -> Option<DateTime<Local>> {
    let time = parse_time_of_day(text)?;
    now.date_naive()
        .and_time(time)
        .and_local_timezone(Local)
        .earliest()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOffset(Duration);

impl TimeOffset {
    pub fn between(reference: DateTime<Local>, now: DateTime<Local>) -> Self {
        Self(reference - now)
    }

    pub fn apply(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.0
    }

    pub fn as_millis(&self) -> i64 {
        self.0.num_milliseconds()
    }
}

pub fn start_of_local_day(now: DateTime<Local>) -> DateTime<Utc> {
    let midnight = now
        .date_naive()
        .and_time(NaiveTime::MIN)
        .and_local_timezone(Local)
        .earliest();
    match midnight {
        Some(midnight) => midnight.with_timezone(&Utc),
        // No local midnight on DST-at-midnight days; step back by the elapsed time instead.
        None => (now - now.time().signed_duration_since(NaiveTime::MIN)).with_timezone(&Utc),
    }
}

pub fn format_localized(instant: DateTime<Utc>) -> String {
    instant
        .with_timezone(&Local)
        .format("%-m/%-d/%Y, %-I:%M:%S %p")
        .to_string()
}

pub fn format_clock(instant: DateTime<Utc>) -> String {
    instant
        .with_timezone(&Local)
        .format("%-I:%M:%S %p")
        .to_string()
}
