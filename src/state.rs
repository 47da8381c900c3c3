use crate::config::AppConfig;
use crate::refresh::{RefreshTiming, SharedSession, SharedStore, spawn_session_task};
use crate::session::SessionController;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{sync::Mutex, task::JoinHandle, time::Instant};
use uuid::Uuid;

struct SessionEntry {
    controller: SharedSession,
    task: JoinHandle<()>,
    last_seen: Instant,
}

impl Drop for SessionEntry {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<Uuid, SessionEntry>>>,
}

impl SessionRegistry {
    pub async fn create(&self, store: SharedStore, timing: RefreshTiming) -> (Uuid, SharedSession) {
        let id = Uuid::new_v4();
        let controller: SharedSession = Arc::new(Mutex::new(SessionController::new()));
        let task = spawn_session_task(store, Arc::clone(&controller), timing);
        self.sessions.lock().await.insert(
            id,
            SessionEntry {
                controller: Arc::clone(&controller),
                task,
                last_seen: Instant::now(),
            },
        );
        (id, controller)
    }

    pub async fn get(&self, id: Uuid) -> Option<SharedSession> {
        let mut sessions = self.sessions.lock().await;
        let entry = sessions.get_mut(&id)?;
        entry.last_seen = Instant::now();
        Some(Arc::clone(&entry.controller))
    }

    pub async fn reap_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.last_seen.elapsed() < max_idle);
        before - sessions.len()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub sessions: SessionRegistry,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: SharedStore, config: AppConfig) -> Self {
        Self {
            store,
            sessions: SessionRegistry::default(),
            config: Arc::new(config),
        }
    }

    pub async fn create_session(&self) -> (Uuid, SharedSession) {
        self.sessions
            .create(Arc::clone(&self.store), self.config.refresh)
            .await
    }
}
