/**
 * Membership Registry
 *
 * Tracks which live channel connections exist, which user each one
 * announced, and which collab lists each one subscribed to. The
 * registry is a plain addressing index for fan-out; it holds no
 * authority over persisted membership (handlers re-check the store).
 *
 * Both maps live behind one `std::sync::Mutex` and every method holds
 * the lock for a short, bounded critical section with no I/O inside.
 * Connections are ephemeral: dropping one removes every trace of it,
 * and a reconnecting client re-announces and re-subscribes from
 * scratch.
 */

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Mutex;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::shared::event::ServerEvent;

/// Outbound buffer size per connection. A subscriber that falls this
/// far behind starts losing events rather than stalling fan-out.
pub const CONNECTION_BUFFER: usize = 64;

/// Opaque identifier for one channel connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

struct ConnectionEntry {
    user_id: Option<Uuid>,
    subscriptions: HashSet<Uuid>,
    sender: mpsc::Sender<ServerEvent>,
}

#[derive(Default)]
struct Tables {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    /// Reverse index: list id to the connections subscribed to it.
    subscribers: HashMap<Uuid, HashSet<ConnectionId>>,
}

/// Connection/subscription index for the event fan-out channel
#[derive(Default)]
pub struct MembershipRegistry {
    tables: Mutex<Tables>,
}

impl MembershipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection. Returns its id and the receiving end
    /// of its bounded outbound event queue.
    pub fn connect(&self) -> (ConnectionId, mpsc::Receiver<ServerEvent>) {
        let (sender, receiver) = mpsc::channel(CONNECTION_BUFFER);
        let id = ConnectionId::new();
        let mut tables = self.tables.lock().unwrap();
        tables.connections.insert(
            id,
            ConnectionEntry {
                user_id: None,
                subscriptions: HashSet::new(),
                sender,
            },
        );
        (id, receiver)
    }

    /// Bind a user identity to a connection. The identity is set once;
    /// a repeat announcement is ignored and reported as `false`.
    pub fn announce(&self, connection: ConnectionId, user_id: Uuid) -> bool {
        let mut tables = self.tables.lock().unwrap();
        match tables.connections.get_mut(&connection) {
            Some(entry) if entry.user_id.is_none() => {
                entry.user_id = Some(user_id);
                true
            }
            _ => false,
        }
    }

    /// Subscribe a connection to a list's events. Idempotent. Returns
    /// `false` for an unknown connection.
    pub fn subscribe(&self, connection: ConnectionId, list_id: Uuid) -> bool {
        let mut tables = self.tables.lock().unwrap();
        if let Some(entry) = tables.connections.get_mut(&connection) {
            entry.subscriptions.insert(list_id);
            tables
                .subscribers
                .entry(list_id)
                .or_default()
                .insert(connection);
            true
        } else {
            false
        }
    }

    /// Remove a connection and all of its subscriptions. Walks only the
    /// connection's own subscription set, not every list.
    pub fn disconnect(&self, connection: ConnectionId) {
        let mut tables = self.tables.lock().unwrap();
        if let Some(entry) = tables.connections.remove(&connection) {
            for list_id in entry.subscriptions {
                if let Some(subs) = tables.subscribers.get_mut(&list_id) {
                    subs.remove(&connection);
                    if subs.is_empty() {
                        tables.subscribers.remove(&list_id);
                    }
                }
            }
        }
    }

    /// Snapshot the outbound senders of every connection subscribed to
    /// a list. The lock is released before any send happens.
    pub fn senders_for(&self, list_id: Uuid) -> Vec<(ConnectionId, mpsc::Sender<ServerEvent>)> {
        let tables = self.tables.lock().unwrap();
        let Some(subs) = tables.subscribers.get(&list_id) else {
            return Vec::new();
        };
        subs.iter()
            .filter_map(|id| {
                tables
                    .connections
                    .get(id)
                    .map(|entry| (*id, entry.sender.clone()))
            })
            .collect()
    }

    /// The user a connection announced, if any.
    pub fn user_of(&self, connection: ConnectionId) -> Option<Uuid> {
        self.tables
            .lock()
            .unwrap()
            .connections
            .get(&connection)
            .and_then(|entry| entry.user_id)
    }

    pub fn connection_count(&self) -> usize {
        self.tables.lock().unwrap().connections.len()
    }

    pub fn subscriber_count(&self, list_id: Uuid) -> usize {
        self.tables
            .lock()
            .unwrap()
            .subscribers
            .get(&list_id)
            .map_or(0, |subs| subs.len())
    }
}
