//! The connection registry: `ConnectionId → Membership`.
//!
//! # Concurrency note
//!
//! `ConnectionRegistry` is a plain `HashMap` and is not thread-safe by
//! itself. The room manager owns it behind a mutex and only touches it
//! in short critical sections, never across an await on a room.

use std::collections::HashMap;
use std::time::Instant;

use duet_protocol::{RoomCode, Seat};
use duet_transport::ConnectionId;

use crate::membership::Entry;
use crate::{Membership, SessionError};

/// Maps every live connection to its room membership, if it has one.
///
/// ## Lifecycle
///
/// ```text
/// register() ──→ bind() ──→ unbind() / unregister()
///     │             │
///     ▼             ▼
///  [unbound]     [bound: room + seat]
/// ```
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    entries: HashMap<ConnectionId, Entry>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a freshly connected, unbound connection.
    ///
    /// Registering an id twice keeps the existing entry.
    pub fn register(&mut self, conn: ConnectionId) {
        self.entries.entry(conn).or_insert_with(|| Entry {
            connected_at: Instant::now(),
            membership: None,
        });
        tracing::debug!(%conn, "connection registered");
    }

    /// Seats a registered connection in `room` at `seat`.
    ///
    /// # Errors
    /// - [`SessionError::NotRegistered`] if the connection is unknown.
    /// - [`SessionError::AlreadyBound`] if it already holds a seat.
    pub fn bind(
        &mut self,
        conn: ConnectionId,
        room: RoomCode,
        seat: Seat,
    ) -> Result<(), SessionError> {
        let entry = self
            .entries
            .get_mut(&conn)
            .ok_or(SessionError::NotRegistered(conn))?;

        if let Some(existing) = &entry.membership {
            return Err(SessionError::AlreadyBound(conn, existing.room.clone()));
        }

        tracing::debug!(%conn, %room, %seat, "connection bound");
        entry.membership = Some(Membership::new(room, seat));
        Ok(())
    }

    /// Returns the connection's room and seat, or `None` if it is unknown
    /// or not seated anywhere.
    pub fn lookup(&self, conn: ConnectionId) -> Option<&Membership> {
        self.entries.get(&conn)?.membership.as_ref()
    }

    /// Clears the connection's seat but keeps it registered.
    ///
    /// Returns the membership that was cleared.
    pub fn unbind(&mut self, conn: ConnectionId) -> Option<Membership> {
        self.entries.get_mut(&conn)?.membership.take()
    }

    /// Removes the connection entirely. Returns its last membership, if
    /// it was seated.
    pub fn unregister(&mut self, conn: ConnectionId) -> Option<Membership> {
        let entry = self.entries.remove(&conn)?;
        tracing::debug!(
            %conn,
            connected_ms = entry.connected_at.elapsed().as_millis() as u64,
            "connection unregistered"
        );
        entry.membership
    }

    /// Returns `true` if the connection has an entry (bound or not).
    pub fn is_registered(&self, conn: ConnectionId) -> bool {
        self.entries.contains_key(&conn)
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================
