//! Per-session boundary sets.
//!
//! Each boundary upload opens a session identified by a random token. The
//! page passes the token back on every render, so one visitor's upload is
//! never visible to another. A session ends when the page closes it, when
//! it has been idle longer than the timeout, or when it is evicted to make
//! room for a newer one.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;
use visitor_map_boundary::BoundarySet;

/// Sessions kept before the least recently used one is evicted.
pub const MAX_SESSIONS: usize = 64;

/// Idle time after which a session is discarded.
pub const SESSION_IDLE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(2 * 60 * 60);

struct Session {
    boundaries: Arc<BoundarySet>,
    last_used: DateTime<Utc>,
}

/// Boundary sets keyed by session token.
pub struct BoundarySessions {
    idle: Duration,
    capacity: usize,
    sessions: Mutex<BTreeMap<Uuid, Session>>,
}

impl Default for BoundarySessions {
    fn default() -> Self {
        Self::new(SESSION_IDLE_TIMEOUT, MAX_SESSIONS)
    }
}

impl BoundarySessions {
    /// Creates an empty store.
    #[must_use]
    pub fn new(idle: std::time::Duration, capacity: usize) -> Self {
        Self {
            idle: Duration::from_std(idle).unwrap_or(Duration::MAX),
            capacity: capacity.max(1),
            sessions: Mutex::new(BTreeMap::new()),
        }
    }

    /// Starts a session holding `boundaries` and returns its token.
    pub fn open(&self, boundaries: BoundarySet, now: DateTime<Utc>) -> Uuid {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions.retain(|_, session| now.signed_duration_since(session.last_used) < self.idle);

        while sessions.len() >= self.capacity {
            let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, session)| session.last_used)
                .map(|(id, _)| *id)
            else {
                break;
            };
            log::info!("Evicting boundary session {oldest}");
            sessions.remove(&oldest);
        }

        let id = Uuid::new_v4();
        sessions.insert(
            id,
            Session {
                boundaries: Arc::new(boundaries),
                last_used: now,
            },
        );
        id
    }

    /// Returns the boundary set of a live session and marks it used.
    pub fn get(&self, id: &Uuid, now: DateTime<Utc>) -> Option<Arc<BoundarySet>> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let session = sessions.get_mut(id)?;

        if now.signed_duration_since(session.last_used) >= self.idle {
            log::debug!("Boundary session {id} expired");
            sessions.remove(id);
            return None;
        }

        session.last_used = now;
        Some(Arc::clone(&session.boundaries))
    }

    /// Ends a session. Returns `false` if it did not exist.
    pub fn close(&self, id: &Uuid) -> bool {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some()
    }

    /// Number of stored sessions, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if no session is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
