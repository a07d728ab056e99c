//! Error types for the connection registry.

use duet_protocol::RoomCode;
use duet_transport::ConnectionId;

/// Errors returned by [`ConnectionRegistry`](crate::ConnectionRegistry).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The connection was never registered, or has already been
    /// unregistered.
    #[error("connection {0} is not registered")]
    NotRegistered(ConnectionId),

    /// The connection is already seated in a room. A connection holds at
    /// most one seat at a time.
    #[error("connection {0} is already bound to room {1}")]
    AlreadyBound(ConnectionId, RoomCode),
}
