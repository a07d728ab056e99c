//! Room manager: creates rooms, seats connections, and routes room events.

use duet_protocol::{GameState, RoomCode, Seat};
use duet_session::{ConnectionRegistry, SessionError};
use duet_transport::ConnectionId;
use tokio::sync::Mutex;

use crate::codes::{CodeGenerator, RandomCodes};
use crate::room::{Admission, ConnectionSender};
use crate::store::RoomStore;
use crate::{RoomConfig, RoomError, RoomHandle, RoomInfo};

/// Owns the room store and the connection registry.
///
/// This is the entry point for room operations from the connection
/// handlers and the reaper. A connection holds at most one seat on the
/// whole server (key invariant); the registry is the source of truth for
/// that, and the room actors are the source of truth for who sits where.
pub struct RoomManager {
    store: RoomStore,
    registry: Mutex<ConnectionRegistry>,
    codes: Box<dyn CodeGenerator>,
    config: RoomConfig,
}

impl RoomManager {
    /// Creates a manager that draws random room codes.
    pub fn new(config: RoomConfig) -> Self {
        Self::with_codes(config, RandomCodes)
    }

    /// Creates a manager with a custom code source.
    pub fn with_codes(config: RoomConfig, codes: impl CodeGenerator + 'static) -> Self {
        Self {
            store: RoomStore::new(),
            registry: Mutex::new(ConnectionRegistry::new()),
            codes: Box::new(codes),
            config,
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Records a new, unseated connection.
    pub async fn register_connection(&self, conn: ConnectionId) {
        self.registry.lock().await.register(conn);
    }

    /// Forgets a connection entirely. Call [`remove_connection`] first so
    /// its seat is vacated.
    ///
    /// [`remove_connection`]: Self::remove_connection
    pub async fn unregister_connection(&self, conn: ConnectionId) {
        if let Some(m) = self.registry.lock().await.unregister(conn) {
            tracing::warn!(%conn, room = %m.room, "unregistered a seated connection");
        }
    }

    /// Vacates the connection's seat, if it holds one, and keeps the room
    /// in the store even when it is left empty.
    ///
    /// The remaining occupant (if any) gets `playerLeft`. Returns the room
    /// and seat that were vacated.
    pub async fn remove_connection(&self, conn: ConnectionId) -> Option<(RoomCode, Seat)> {
        let membership = self.registry.lock().await.unbind(conn)?;
        let room = membership.room;

        let Some(handle) = self.store.get(&room).await else {
            tracing::warn!(%conn, %room, "seated connection's room is gone");
            return None;
        };
        match handle.leave(conn).await {
            Ok(seat) => {
                tracing::debug!(
                    %conn,
                    %room,
                    seated_ms = membership.joined_at.elapsed().as_millis() as u64,
                    "seat released"
                );
                Some((room, seat))
            }
            Err(e) => {
                tracing::warn!(%conn, %room, error = %e, "failed to vacate seat");
                None
            }
        }
    }

    /// Opens a new room under a fresh code and seats `conn` in seat 1.
    ///
    /// # Errors
    /// - [`RoomError::Registry`] if `conn` was never registered.
    /// - [`RoomError::AlreadySeated`] if `conn` already holds a seat.
    /// - [`RoomError::IdentifierExhaustion`] if every candidate code
    ///   collided with a live room.
    pub async fn create_room(
        &self,
        conn: ConnectionId,
        sender: ConnectionSender,
    ) -> Result<(RoomCode, Seat), RoomError> {
        self.ensure_can_sit(conn).await?;

        let attempts = self.config.max_code_attempts;
        for attempt in 1..=attempts {
            let code = self.codes.next_code();
            let Some(handle) = self
                .store
                .insert_new(code.clone(), conn, sender.clone(), self.config.channel_size)
                .await
            else {
                tracing::debug!(%code, attempt, "room code collision");
                continue;
            };

            self.bind_or_rollback(&handle, conn, Seat::One).await?;
            tracing::info!(room = %code, %conn, "room created");
            return Ok((code, Seat::One));
        }

        tracing::error!(attempts, "room code space exhausted");
        Err(RoomError::IdentifierExhaustion(attempts))
    }

    /// Seats `conn` in the lowest vacant seat of room `code`.
    ///
    /// # Errors
    /// - [`RoomError::Registry`] if `conn` was never registered.
    /// - [`RoomError::AlreadySeated`] if `conn` already holds a seat.
    /// - [`RoomError::NotFound`] / [`RoomError::Unavailable`] if no live
    ///   room has this code (or it was reaped mid-request).
    /// - [`RoomError::RoomFull`] if both seats are taken.
    pub async fn join_room(
        &self,
        code: &RoomCode,
        conn: ConnectionId,
        sender: ConnectionSender,
    ) -> Result<Admission, RoomError> {
        self.ensure_can_sit(conn).await?;

        let handle = self
            .store
            .get(code)
            .await
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;

        let admission = handle.join(conn, sender).await?;
        self.bind_or_rollback(&handle, conn, admission.seat).await?;
        handle.announce(admission.seat).await?;
        Ok(admission)
    }

    /// Starts the game in the caller's room.
    pub async fn start_game(
        &self,
        conn: ConnectionId,
        game_state: GameState,
    ) -> Result<(), RoomError> {
        self.room_of(conn).await?.start(conn, game_state).await
    }

    /// Relays an action from the caller to the other seat of its room.
    pub async fn relay_action(
        &self,
        conn: ConnectionId,
        action: serde_json::Value,
        game_state: Option<GameState>,
    ) -> Result<Seat, RoomError> {
        self.room_of(conn).await?.action(conn, action, game_state).await
    }

    /// Broadcasts a chat line to every seat of the caller's room.
    pub async fn chat(&self, conn: ConnectionId, message: String) -> Result<Seat, RoomError> {
        self.room_of(conn).await?.chat(conn, message).await
    }

    /// Deletes every room with no occupied seat. Returns the reaped codes.
    ///
    /// The emptiness check runs inside each room actor, so a join that
    /// lands first keeps the room alive and a join that lands after sees
    /// the room as gone.
    pub async fn sweep(&self) -> Vec<RoomCode> {
        let mut reaped = Vec::new();
        for handle in self.store.handles().await {
            let code = handle.code().clone();
            match handle.reap().await {
                Ok(false) => continue,
                Ok(true) => tracing::info!(room = %code, "room reaped"),
                Err(e) => tracing::warn!(room = %code, error = %e, "dropping dead room"),
            }
            self.store.remove(&code).await;
            reaped.push(code);
        }
        reaped
    }

    /// Returns a snapshot of room `code`.
    pub async fn room_info(&self, code: &RoomCode) -> Result<RoomInfo, RoomError> {
        let handle = self
            .store
            .get(code)
            .await
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;
        handle.get_info().await
    }

    /// Number of live rooms, empty ones awaiting the reaper included.
    pub async fn room_count(&self) -> usize {
        self.store.len().await
    }

    /// The caller's room and seat, if it holds one.
    pub async fn membership(&self, conn: ConnectionId) -> Option<(RoomCode, Seat)> {
        self.registry
            .lock()
            .await
            .lookup(conn)
            .map(|m| (m.room.clone(), m.seat))
    }

    /// Rejects unknown or already seated connections before any room is
    /// touched, so a doomed request never spawns or seats anything.
    async fn ensure_can_sit(&self, conn: ConnectionId) -> Result<(), RoomError> {
        let registry = self.registry.lock().await;
        if !registry.is_registered(conn) {
            return Err(SessionError::NotRegistered(conn).into());
        }
        match registry.lookup(conn) {
            Some(_) => Err(RoomError::AlreadySeated(conn)),
            None => Ok(()),
        }
    }

    /// Records the new seat in the registry. If that fails the seat is
    /// withdrawn, silently since nobody has been told about it yet, so the
    /// room never holds a connection the registry doesn't know about.
    async fn bind_or_rollback(
        &self,
        handle: &RoomHandle,
        conn: ConnectionId,
        seat: Seat,
    ) -> Result<(), RoomError> {
        let bound = self
            .registry
            .lock()
            .await
            .bind(conn, handle.code().clone(), seat);

        if let Err(e) = bound {
            tracing::warn!(room = %handle.code(), %conn, error = %e, "rolling back seat");
            let _ = handle.withdraw(conn).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn room_of(&self, conn: ConnectionId) -> Result<RoomHandle, RoomError> {
        let room = self
            .registry
            .lock()
            .await
            .lookup(conn)
            .map(|m| m.room.clone())
            .ok_or(RoomError::NotSeated(conn))?;

        self.store
            .get(&room)
            .await
            .ok_or(RoomError::NotFound(room))
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}
