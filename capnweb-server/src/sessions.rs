//! The server's session table: tracks live WebSocket sessions (HTTP-batch
//! requests are stateless and never enter this table) so an idle sweep
//! can evict connections a client abandoned without closing cleanly.

use std::sync::Arc;
use std::time::{Duration, Instant};

use currentspace_capnweb_core::{RpcTarget, Session};
use dashmap::DashMap;
use tracing::{debug, info};

struct TrackedSession {
    session: Arc<Session>,
    last_activity: std::sync::Mutex<Instant>,
}

/// Registry of active WebSocket sessions, keyed by a server-generated
/// session id (a connection id, not a protocol `ExportId`).
#[derive(Clone)]
pub struct SessionTable {
    sessions: Arc<DashMap<String, Arc<TrackedSession>>>,
    target: Arc<dyn RpcTarget>,
}

impl SessionTable {
    pub fn new(target: Arc<dyn RpcTarget>) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            target,
        }
    }

    /// Register a freshly-opened WebSocket connection and return its
    /// session plus the id it was registered under.
    pub fn open(&self) -> (String, Arc<Session>) {
        let id = uuid::Uuid::new_v4().to_string();
        let session = Arc::new(Session::new(self.target.clone()));
        self.sessions.insert(
            id.clone(),
            Arc::new(TrackedSession {
                session: session.clone(),
                last_activity: std::sync::Mutex::new(Instant::now()),
            }),
        );
        debug!(session_id = %id, "session opened");
        (id, session)
    }

    pub fn touch(&self, id: &str) {
        if let Some(entry) = self.sessions.get(id) {
            if let Ok(mut last) = entry.last_activity.lock() {
                *last = Instant::now();
            }
        }
    }

    pub fn close(&self, id: &str) {
        if self.sessions.remove(id).is_some() {
            debug!(session_id = %id, "session closed");
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Build a fresh, untracked session for one HTTP-batch request: the
    /// core requires a `target` but HTTP-batch is stateless across
    /// requests, so it never lives in the table (spec.md §3's Lifecycle:
    /// "created... per HTTP batch request... destroyed... after the
    /// batch's response is emitted").
    pub fn new_batch_session(&self) -> Session {
        Session::new(self.target.clone())
    }

    /// Evict sessions idle past `timeout`. Returns the number removed.
    pub fn sweep(&self, timeout: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_id, tracked| {
            tracked
                .last_activity
                .lock()
                .map(|last| last.elapsed() < timeout)
                .unwrap_or(true)
        });
        let removed = before - self.sessions.len();
        if removed > 0 {
            info!(removed, remaining = self.sessions.len(), "swept idle sessions");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use currentspace_capnweb_core::MockRpcTarget;

    #[test]
    fn open_and_close_track_membership() {
        let table = SessionTable::new(Arc::new(MockRpcTarget));
        let (id, _session) = table.open();
        assert_eq!(table.len(), 1);
        table.close(&id);
        assert!(table.is_empty());
    }

    #[test]
    fn sweep_evicts_only_past_timeout() {
        let table = SessionTable::new(Arc::new(MockRpcTarget));
        let (_id, _session) = table.open();
        assert_eq!(table.sweep(Duration::from_secs(300)), 0);
        assert_eq!(table.sweep(Duration::from_secs(0)), 1);
        assert!(table.is_empty());
    }
}
