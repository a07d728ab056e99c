//! The room store: `RoomCode → RoomHandle`.

use std::collections::HashMap;

use duet_protocol::RoomCode;
use duet_transport::ConnectionId;
use tokio::sync::Mutex;

use crate::room::{ConnectionSender, RoomHandle, spawn_room};

/// Every live room, keyed by code.
///
/// The lock is only held for map operations. Callers clone a handle out
/// and talk to the room after the lock is released.
#[derive(Default)]
pub struct RoomStore {
    rooms: Mutex<HashMap<RoomCode, RoomHandle>>,
}

impl RoomStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns a room under `code` with `creator` in seat 1, unless the code
    /// is already live. The vacancy check and the insert happen under one
    /// lock, so two creators can never end up sharing a code.
    pub async fn insert_new(
        &self,
        code: RoomCode,
        creator: ConnectionId,
        sender: ConnectionSender,
        channel_size: usize,
    ) -> Option<RoomHandle> {
        let mut rooms = self.rooms.lock().await;
        if rooms.contains_key(&code) {
            return None;
        }
        let handle = spawn_room(code.clone(), creator, sender, channel_size);
        rooms.insert(code, handle.clone());
        Some(handle)
    }

    pub async fn get(&self, code: &RoomCode) -> Option<RoomHandle> {
        self.rooms.lock().await.get(code).cloned()
    }

    pub async fn remove(&self, code: &RoomCode) -> Option<RoomHandle> {
        self.rooms.lock().await.remove(code)
    }

    /// Cloned handles to every live room.
    pub async fn handles(&self) -> Vec<RoomHandle> {
        self.rooms.lock().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.rooms.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rooms.lock().await.is_empty()
    }
}
