//! The connected-client registry: the session table, private-chat table,
//! presence broadcast, and idle tracking.
//!
//! The session table is a `Mutex<BTreeMap<u16, _>>`, not a `DashMap`,
//! because broadcast fan-out needs deterministic ascending-session-ID
//! iteration; a sharded concurrent map does not give that ordering for
//! free. Private chats have no such ordering requirement, so they use
//! a `DashMap` keyed by chat ID instead.

use std::collections::BTreeMap;

use dashmap::DashMap;
use tokio::sync::{mpsc, Mutex};
use tracing::trace;

use crate::chat::PrivateChat;
use crate::session::ClientSession;

/// One outbound frame, addressed to a session by ID. The dispatcher's
/// central sender task drains these and forwards each to the named
/// session's own outbox; a target that no longer exists is silently
/// skipped.
#[derive(Debug)]
pub struct Outgoing {
    /// The session this frame is addressed to.
    pub target: u16,
    /// Encoded transaction bytes.
    pub bytes: Vec<u8>,
}

/// A snapshot of one session's presence attributes, for user-list pushes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceEntry {
    /// Session ID.
    pub id: u16,
    /// Display name.
    pub name: String,
    /// Icon ID.
    pub icon_id: u16,
    /// Flags bitmap.
    pub flags: u16,
}

/// The connected-client registry.
pub struct ClientRegistry {
    sessions: Mutex<BTreeMap<u16, ClientSession>>,
    private_chats: DashMap<u32, PrivateChat>,
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(BTreeMap::new()),
            private_chats: DashMap::new(),
        }
    }

    /// Insert a newly accepted session.
    pub async fn insert(&self, session: ClientSession) {
        self.sessions.lock().await.insert(session.id, session);
    }

    /// Remove a session, returning it if present.
    pub async fn remove(&self, id: u16) -> Option<ClientSession> {
        self.sessions.lock().await.remove(&id)
    }

    /// Run `f` against the session named `id`, holding the table lock for
    /// only the duration of the closure.
    pub async fn with_session<R>(&self, id: u16, f: impl FnOnce(&mut ClientSession) -> R) -> Option<R> {
        let mut guard = self.sessions.lock().await;
        guard.get_mut(&id).map(f)
    }

    /// Number of currently live sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Whether a session with this ID is currently registered.
    pub async fn contains(&self, id: u16) -> bool {
        self.sessions.lock().await.contains_key(&id)
    }

    /// Find the session ID currently authenticated as `login`, if any.
    pub async fn find_by_login(&self, login: &str) -> Option<u16> {
        let guard = self.sessions.lock().await;
        guard
            .values()
            .find(|s| s.login.as_deref() == Some(login))
            .map(|s| s.id)
    }

    /// Presence entries for every visible session, in ascending
    /// session-ID order.
    pub async fn presence_snapshot(&self) -> Vec<PresenceEntry> {
        let guard = self.sessions.lock().await;
        guard
            .values()
            .filter(|s| s.is_visible())
            .map(|s| PresenceEntry {
                id: s.id,
                name: s.name.clone(),
                icon_id: s.icon_id,
                flags: s.flags,
            })
            .collect()
    }

    /// Send `build(session)`'s bytes to every session matching
    /// `predicate`, in ascending session-ID order, via `outbox`.
    pub async fn broadcast(
        &self,
        outbox: &mpsc::UnboundedSender<Outgoing>,
        predicate: impl Fn(&ClientSession) -> bool,
        mut build: impl FnMut(&ClientSession) -> Vec<u8>,
    ) {
        let guard = self.sessions.lock().await;
        for (id, session) in guard.iter() {
            if predicate(session) {
                let bytes = build(session);
                if outbox.send(Outgoing { target: *id, bytes }).is_err() {
                    trace!(target = id, "central outbox closed during broadcast");
                }
            }
        }
    }

    /// Advance every session's idle counter by `tick_secs`, flipping the
    /// away flag for any session that has now crossed `threshold_secs`.
    /// Returns the IDs whose away flag just changed, for the caller to
    /// broadcast `notifyChangeUser` about.
    pub async fn tick_idle(&self, tick_secs: u32, threshold_secs: u32) -> Vec<u16> {
        let mut changed = Vec::new();
        let mut guard = self.sessions.lock().await;
        for session in guard.values_mut() {
            session.idle_seconds = session.idle_seconds.saturating_add(tick_secs);
            if session.idle_seconds >= threshold_secs
                && !session.has_flag(crate::session::flag_bit::AWAY)
            {
                session.set_flag(crate::session::flag_bit::AWAY, true);
                changed.push(session.id);
            }
        }
        changed
    }

    /// Reset a session's idle counter on a non-keepalive request,
    /// clearing the away flag if it was set. Returns `true` if the flag
    /// changed (the caller should broadcast `notifyChangeUser`).
    pub async fn clear_idle(&self, id: u16) -> bool {
        let mut guard = self.sessions.lock().await;
        let Some(session) = guard.get_mut(&id) else {
            return false;
        };
        session.idle_seconds = 0;
        if session.has_flag(crate::session::flag_bit::AWAY) {
            session.set_flag(crate::session::flag_bit::AWAY, false);
            true
        } else {
            false
        }
    }

    /// The private-chat table.
    #[must_use]
    pub fn private_chats(&self) -> &DashMap<u32, PrivateChat> {
        &self.private_chats
    }
}
