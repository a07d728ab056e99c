//! Error types for the room layer.

use duet_protocol::{ErrorCode, RoomCode};
use duet_session::SessionError;
use duet_transport::ConnectionId;

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// No live room has this code.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// Both seats are taken.
    #[error("room {0} is full")]
    RoomFull(RoomCode),

    /// The connection already holds a seat (in this room or another).
    #[error("connection {0} is already seated")]
    AlreadySeated(ConnectionId),

    /// The connection holds no seat, so room events from it are dropped.
    #[error("connection {0} is not seated in any room")]
    NotSeated(ConnectionId),

    /// `startGame` needs both seats filled.
    #[error("room {0} needs two seats to start")]
    NotReady(RoomCode),

    /// Every generated code collided with a live room.
    #[error("no free room code after {0} attempts")]
    IdentifierExhaustion(u32),

    /// The room's actor has stopped (it was reaped) or its queue is gone.
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),

    /// The connection registry refused the operation.
    #[error(transparent)]
    Registry(#[from] SessionError),
}

impl RoomError {
    /// The wire code reported to a caller in a failed `roomAck`, if this
    /// error is one a caller is told about.
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Self::NotFound(_) | Self::Unavailable(_) => Some(ErrorCode::RoomNotFound),
            Self::RoomFull(_) => Some(ErrorCode::RoomFull),
            Self::AlreadySeated(_) | Self::Registry(SessionError::AlreadyBound(..)) => {
                Some(ErrorCode::AlreadySeated)
            }
            Self::IdentifierExhaustion(_) => Some(ErrorCode::IdentifierExhaustion),
            Self::NotSeated(_) | Self::NotReady(_) | Self::Registry(_) => None,
        }
    }
}
