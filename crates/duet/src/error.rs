//! Unified error type for the Duet relay.

use duet_protocol::ProtocolError;
use duet_room::RoomError;
use duet_session::SessionError;
use duet_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum DuetError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A registry error (unknown or already-bound connection).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (full, not found, not seated).
    #[error(transparent)]
    Room(#[from] RoomError),
}

#[cfg(test)]
mod tests {
    use duet_protocol::RoomCode;
    use duet_transport::ConnectionId;

    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let duet_err: DuetError = err.into();
        assert!(matches!(duet_err, DuetError::Transport(_)));
        assert!(duet_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let bad = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let duet_err: DuetError = ProtocolError::Decode(bad).into();
        assert!(matches!(duet_err, DuetError::Protocol(_)));
        assert!(duet_err.to_string().contains("decode failed"));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::NotRegistered(ConnectionId::new(3));
        let duet_err: DuetError = err.into();
        assert!(matches!(duet_err, DuetError::Session(_)));
        assert!(duet_err.to_string().contains("conn-3"));
    }

    #[test]
    fn test_from_room_error() {
        let err = RoomError::NotFound(RoomCode::new("ABC123"));
        let duet_err: DuetError = err.into();
        assert!(matches!(duet_err, DuetError::Room(_)));
        assert!(duet_err.to_string().contains("ABC123"));
    }
}
