use crate::clock::start_of_local_day;
use crate::models::{CounterCounts, CounterRecord};
use crate::records::{count_marker_since, delete_record, load_marker_types, save_record};
use crate::session::SessionController;
use crate::storage::{DocumentStore, StoreError};
use chrono::Local;
use futures::future::try_join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, sleep};
use tracing::{debug, error};

pub type SharedStore = Arc<dyn DocumentStore>;
pub type SharedSession = Arc<Mutex<SessionController>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTiming {
    pub initial_delay: Duration,
    pub period: Duration,
}

impl Default for RefreshTiming {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            period: Duration::from_secs(10),
        }
    }
}

async fn report_failure(session: &Mutex<SessionController>, action: &str, err: &StoreError) {
    error!("{action} failed: {err}");
    session.lock().await.report(format!("{action} failed: {err}"));
}

pub async fn refresh_counts(
    store: &dyn DocumentStore,
    session: &Mutex<SessionController>,
) -> Result<bool, StoreError> {
    let ticket = session.lock().await.begin_refresh();
    let since = start_of_local_day(Local::now());

    let fetched = try_join_all(
        ticket
            .marker_ids
            .iter()
            .map(|marker_id| count_marker_since(store, marker_id, since)),
    )
    .await;

    match fetched {
        Ok(values) => {
            let counts: CounterCounts = ticket.marker_ids.into_iter().zip(values).collect();
            let applied = session.lock().await.apply_refresh(ticket.seq, counts);
            if !applied {
                debug!(seq = ticket.seq, "discarded stale count refresh");
            }
            Ok(applied)
        }
        Err(err) => {
            report_failure(session, "refreshing counts", &err).await;
            Err(err)
        }
    }
}

pub async fn load_markers(
    store: &dyn DocumentStore,
    session: &Mutex<SessionController>,
) -> Result<usize, StoreError> {
    match load_marker_types(store).await {
        Ok(markers) => {
            let loaded = markers.len();
            session.lock().await.set_marker_types(markers);
            Ok(loaded)
        }
        Err(err) => {
            report_failure(session, "loading marker types", &err).await;
            Err(err)
        }
    }
}

pub fn spawn_session_task(
    store: SharedStore,
    session: SharedSession,
    timing: RefreshTiming,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Ok(loaded) = load_markers(store.as_ref(), &session).await {
            debug!(loaded, "marker types loaded");
        }
        sleep(timing.initial_delay).await;

        let mut ticker = interval(timing.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let _ = refresh_counts(store.as_ref(), &session).await;
        }
    })
}

pub async fn write_record(
    store: &dyn DocumentStore,
    session: &Mutex<SessionController>,
    record: &CounterRecord,
) -> Result<(), StoreError> {
    if let Err(err) = save_record(store, record).await {
        report_failure(session, &format!("saving {}", record.key()), &err).await;
        return Err(err);
    }
    Ok(())
}

pub async fn remove_record(
    store: &dyn DocumentStore,
    session: &Mutex<SessionController>,
    key: &str,
) -> Result<(), StoreError> {
    if let Err(err) = delete_record(store, key).await {
        report_failure(session, &format!("deleting {key}"), &err).await;
        return Err(err);
    }
    Ok(())
}

pub fn spawn_write(store: SharedStore, session: SharedSession, record: CounterRecord) {
    tokio::spawn(async move {
        let _ = write_record(store.as_ref(), &session, &record).await;
    });
}

pub fn spawn_delete(store: SharedStore, session: SharedSession, key: String) {
    tokio::spawn(async move {
        let _ = remove_record(store.as_ref(), &session, &key).await;
    });
}
