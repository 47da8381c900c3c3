use crate::refresh::RefreshTiming;
use std::{env, path::PathBuf, str::FromStr, time::Duration};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub data_path: PathBuf,
    pub markers_path: Option<PathBuf>,
    pub refresh: RefreshTiming,
    pub session_idle: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            data_path: PathBuf::from("data/store.json"),
            markers_path: None,
            refresh: RefreshTiming::default(),
            session_idle: Duration::from_secs(120),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            port: parsed::<u16>(&lookup, "PORT").unwrap_or(defaults.port),
            data_path: lookup("APP_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_path),
            markers_path: lookup("APP_MARKERS_PATH")
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from),
            refresh: RefreshTiming {
                initial_delay: parsed::<u64>(&lookup, "APP_REFRESH_DELAY_MS")
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.refresh.initial_delay),
                period: parsed::<u64>(&lookup, "APP_REFRESH_SECS")
                    .filter(|secs| *secs > 0)
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.refresh.period),
            },
            session_idle: parsed::<u64>(&lookup, "APP_SESSION_IDLE_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_idle),
        }
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|value| value.trim().parse().ok())
}
