//! What the registry stores about each connection.
//!
//! A connection is either *unbound* (it has live transport but hasn't
//! created or joined a room yet) or *bound* to exactly one room and seat.

use std::time::Instant;

use duet_protocol::{RoomCode, Seat};

/// A connection's seat assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    /// The room the connection is seated in.
    pub room: RoomCode,

    /// Which seat it holds.
    pub seat: Seat,

    /// When the seat was taken. Monotonic; used for logging how long a
    /// participant stayed.
    pub joined_at: Instant,
}

impl Membership {
    /// A membership that starts now.
    pub fn new(room: RoomCode, seat: Seat) -> Self {
        Self {
            room,
            seat,
            joined_at: Instant::now(),
        }
    }
}

/// A registry entry: created on connect, removed on disconnect.
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub(crate) connected_at: Instant,
    pub(crate) membership: Option<Membership>,
}
