//! Typed per-player session records.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use uuid::Uuid;

use crate::core::progress::PlayerProgress;

pub type SessionId = String;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub verified: bool,
    pub progress: PlayerProgress,
}

struct Entry {
    session: Session,
    last_seen: Instant,
}

/// Session records keyed by id. Each record has its own lock so
/// read-modify-write on one session is serialized without blocking others.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, Arc<Mutex<Entry>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resumes `id` if it is known, otherwise starts a fresh session under a
    /// new id.
    pub async fn get_or_create(&self, id: Option<&str>) -> (SessionId, Session) {
        if let Some(id) = id {
            if let Some(entry) = self.entry(id).await {
                let mut entry = entry.lock().await;
                entry.last_seen = Instant::now();
                return (id.to_string(), entry.session);
            }
        }

        let id = Uuid::new_v4().to_string();
        let entry = Entry { session: Session::default(), last_seen: Instant::now() };
        self.sessions
            .write()
            .await
            .insert(id.clone(), Arc::new(Mutex::new(entry)));
        (id, Session::default())
    }

    pub async fn get(&self, id: &str) -> Option<Session> {
        let entry = self.entry(id).await?;
        let entry = entry.lock().await;
        Some(entry.session)
    }

    /// Applies `f` to the session while holding its lock. `None` if the
    /// session is gone.
    pub async fn update<F, T>(&self, id: &str, f: F) -> Option<T>
    where
        F: FnOnce(&mut Session) -> T,
    {
        let entry = self.entry(id).await?;
        let mut entry = entry.lock().await;
        entry.last_seen = Instant::now();
        Some(f(&mut entry.session))
    }

    /// Drops sessions untouched for at least `ttl`. Sessions that are locked
    /// right now are in use and kept.
    pub async fn purge_idle(&self, ttl: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| match entry.try_lock() {
            Ok(entry) => entry.last_seen.elapsed() < ttl,
            Err(_) => true,
        });
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn entry(&self, id: &str) -> Option<Arc<Mutex<Entry>>> {
        self.sessions.read().await.get(id).cloned()
    }
}
