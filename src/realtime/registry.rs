//! Room membership for realtime delivery.
//!
//! Each connection registers an outbound queue; rooms are sets of
//! connection ids. Nothing here is persisted: a restart drops every room.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use super::events::ServerEvent;
use crate::models::chatmodels::RoomId;

pub type ConnectionId = Uuid;

#[async_trait]
pub trait RoomRegistry: Send + Sync {
    async fn register(&self, connection_id: ConnectionId, outbound: mpsc::UnboundedSender<ServerEvent>);

    /// Returns false when the connection is unknown.
    async fn join(&self, connection_id: ConnectionId, room: RoomId) -> bool;

    /// Returns false when the connection was not in the room.
    async fn leave(&self, connection_id: ConnectionId, room: &RoomId) -> bool;

    /// Drops the connection and its membership in every room.
    async fn disconnect(&self, connection_id: ConnectionId);

    /// Best-effort fan-out. Returns how many connections accepted the event.
    async fn publish(&self, room: &RoomId, event: ServerEvent) -> usize;

    async fn members(&self, room: &RoomId) -> Vec<ConnectionId>;
}

#[derive(Debug)]
struct ConnectionEntry {
    outbound: mpsc::UnboundedSender<ServerEvent>,
    rooms: HashSet<RoomId>,
}

#[derive(Debug, Default)]
struct Rooms {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    rooms: HashMap<RoomId, HashSet<ConnectionId>>,
}

impl Rooms {
    fn remove_member(&mut self, room: &RoomId, connection_id: ConnectionId) -> bool {
        let Some(members) = self.rooms.get_mut(room) else {
            return false;
        };
        let removed = members.remove(&connection_id);
        if members.is_empty() {
            self.rooms.remove(room);
        }
        removed
    }
}

/// Single-process registry.
#[derive(Debug, Default)]
pub struct InMemoryRoomRegistry {
    inner: RwLock<Rooms>,
}

impl InMemoryRoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomRegistry for InMemoryRoomRegistry {
    async fn register(&self, connection_id: ConnectionId, outbound: mpsc::UnboundedSender<ServerEvent>) {
        let mut inner = self.inner.write().await;
        inner.connections.insert(
            connection_id,
            ConnectionEntry {
                outbound,
                rooms: HashSet::new(),
            },
        );
    }

    async fn join(&self, connection_id: ConnectionId, room: RoomId) -> bool {
        let mut inner = self.inner.write().await;
        let Some(entry) = inner.connections.get_mut(&connection_id) else {
            return false;
        };
        entry.rooms.insert(room.clone());
        inner.rooms.entry(room).or_default().insert(connection_id);
        true
    }

    async fn leave(&self, connection_id: ConnectionId, room: &RoomId) -> bool {
        let mut inner = self.inner.write().await;
        if let Some(entry) = inner.connections.get_mut(&connection_id) {
            entry.rooms.remove(room);
        }
        inner.remove_member(room, connection_id)
    }

    async fn disconnect(&self, connection_id: ConnectionId) {
        let mut inner = self.inner.write().await;
        let Some(entry) = inner.connections.remove(&connection_id) else {
            return;
        };
        for room in &entry.rooms {
            inner.remove_member(room, connection_id);
        }
    }

    async fn publish(&self, room: &RoomId, event: ServerEvent) -> usize {
        let inner = self.inner.read().await;
        let Some(members) = inner.rooms.get(room) else {
            return 0;
        };

        members
            .iter()
            .filter_map(|id| inner.connections.get(id))
            .filter(|entry| entry.outbound.send(event.clone()).is_ok())
            .count()
    }

    async fn members(&self, room: &RoomId) -> Vec<ConnectionId> {
        let inner = self.inner.read().await;
        inner
            .rooms
            .get(room)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }
}
