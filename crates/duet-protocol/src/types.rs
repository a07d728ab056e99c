//! Core protocol types for the relay's wire format.
//!
//! Everything in this module travels on the wire as JSON. Field names are
//! camelCase and every event carries a `"type"` tag, so a browser client
//! can switch on `msg.event.type` directly.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A human-shareable room identifier, e.g. `"K3Q9ZA"`.
///
/// Generated codes are [`RoomCode::LEN`] characters drawn from
/// [`RoomCode::ALPHABET`]. Codes arriving from clients are taken verbatim;
/// a malformed one simply never matches a live room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Length of a generated code.
    pub const LEN: usize = 6;

    /// Uppercase base-36 digits.
    pub const ALPHABET: &'static [u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

    /// Wraps a raw string without validating it.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if this looks like a code the server could have
    /// generated.
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == Self::LEN
            && self.0.bytes().all(|b| Self::ALPHABET.contains(&b))
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A connection's position within a room.
///
/// Serialized as the plain number `1` or `2`. What a seat *means* (who
/// moves first, which colour) is up to the game client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Seat {
    One,
    Two,
}

impl Seat {
    /// Both seats in assignment order.
    pub const ALL: [Seat; 2] = [Seat::One, Seat::Two];

    /// The 1-based seat number.
    pub fn number(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }

    /// Zero-based index, for array storage.
    pub fn index(self) -> usize {
        usize::from(self.number() - 1)
    }
}

impl From<Seat> for u8 {
    fn from(seat: Seat) -> u8 {
        seat.number()
    }
}

impl TryFrom<u8> for Seat {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            other => Err(format!("seat must be 1 or 2, got {other}")),
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Opaque game-state payload. The relay stores and forwards it without
/// looking inside.
pub type GameState = serde_json::Value;

/// Milliseconds since the Unix epoch, used for server-assigned timestamps.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who in a room should receive an outbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Every seated connection, the sender included.
    All,

    /// Every seated connection except the given seat.
    AllExcept(Seat),
}

impl Recipient {
    /// Returns `true` if the connection in `seat` should get the event.
    pub fn includes(self, seat: Seat) -> bool {
        match self {
            Self::All => true,
            Self::AllExcept(excluded) => seat != excluded,
        }
    }
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Events a client may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Open a new room and take seat 1. Acknowledged with `roomAck`.
    CreateRoom,

    /// Take a seat in an existing room. Acknowledged with `roomAck`.
    JoinRoom { room_id: RoomCode },

    /// Start (or restart) the game with an initial state.
    StartGame { game_state: GameState },

    /// A discrete move, optionally with the sender's new view of the state.
    GameAction {
        action: serde_json::Value,
        #[serde(default)]
        game_state: Option<GameState>,
    },

    /// A chat line for the room.
    ChatMessage { message: String },

    /// Liveness probe. Always answered with `pong`.
    Ping,
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Why a `createRoom` or `joinRoom` request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    RoomNotFound,
    RoomFull,
    AlreadySeated,
    IdentifierExhaustion,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RoomNotFound => "RoomNotFound",
            Self::RoomFull => "RoomFull",
            Self::AlreadySeated => "AlreadySeated",
            Self::IdentifierExhaustion => "IdentifierExhaustion",
        };
        f.write_str(name)
    }
}

/// Events the server sends.
///
/// `RoomAck` and `Pong` are direct replies and echo the request's `seq` in
/// `replyTo`. The rest are room broadcasts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Result of `createRoom` / `joinRoom`.
    RoomAck {
        reply_to: u64,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_id: Option<RoomCode>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        seat: Option<Seat>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<ErrorCode>,
    },

    /// Reply to `ping`.
    Pong { reply_to: u64 },

    /// Someone took a seat. Sent to every occupant.
    PlayerJoined { seat: Seat, seat_count: usize },

    /// The game started. Sent to every occupant, the starter included.
    GameStarted { game_state: GameState },

    /// A move from the other seat.
    GameAction {
        action: serde_json::Value,
        game_state: Option<GameState>,
        seat: Seat,
        timestamp: u64,
    },

    /// A chat line. Sent to every occupant, the author included.
    ChatMessage {
        seat: Seat,
        message: String,
        timestamp: u64,
    },

    /// A seat was vacated by a disconnect.
    PlayerLeft { seat: Seat },
}

impl ServerEvent {
    /// A successful `roomAck`.
    pub fn room_joined(reply_to: u64, room_id: RoomCode, seat: Seat) -> Self {
        Self::RoomAck {
            reply_to,
            success: true,
            room_id: Some(room_id),
            seat: Some(seat),
            error: None,
        }
    }

    /// A failed `roomAck`.
    pub fn room_failed(reply_to: u64, error: ErrorCode) -> Self {
        Self::RoomAck {
            reply_to,
            success: false,
            room_id: None,
            seat: None,
            error: Some(error),
        }
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The top-level frame. Every message on the wire is an `Envelope`.
///
/// ```text
/// { "seq": 4, "timestamp": 1718000000000, "event": { "type": "ping" } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<E> {
    /// Sender-chosen sequence number. Replies echo it as `replyTo`.
    pub seq: u64,

    /// Milliseconds since the Unix epoch. Clients may omit it.
    #[serde(default)]
    pub timestamp: u64,

    /// The event itself.
    pub event: E,
}

/// A frame sent by a client.
pub type ClientEnvelope = Envelope<ClientEvent>;

/// A frame sent by the server.
pub type ServerEnvelope = Envelope<ServerEvent>;

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The JSON shapes here are what browser clients code against, so
    //! these tests pin them down field by field.

    use serde_json::json;

    use super::*;

    // =====================================================================
    // RoomCode, Seat
    // =====================================================================

    #[test]
    fn test_room_code_serializes_as_plain_string() {
        let json = serde_json::to_string(&RoomCode::new("ABC123")).unwrap();
        assert_eq!(json, "\"ABC123\"");
    }

    #[test]
    fn test_room_code_well_formed() {
        assert!(RoomCode::new("ABC123").is_well_formed());
        assert!(!RoomCode::new("abc123").is_well_formed());
        assert!(!RoomCode::new("ABC12").is_well_formed());
        assert!(!RoomCode::new("ABC-23").is_well_formed());
    }

    #[test]
    fn test_seat_serializes_as_number() {
        assert_eq!(serde_json::to_string(&Seat::One).unwrap(), "1");
        assert_eq!(serde_json::to_string(&Seat::Two).unwrap(), "2");
    }

    #[test]
    fn test_seat_rejects_out_of_range() {
        assert!(serde_json::from_str::<Seat>("0").is_err());
        assert!(serde_json::from_str::<Seat>("3").is_err());
        assert_eq!(serde_json::from_str::<Seat>("2").unwrap(), Seat::Two);
    }

    #[test]
    fn test_seat_index() {
        assert_eq!(Seat::One.index(), 0);
        assert_eq!(Seat::Two.index(), 1);
    }

    #[test]
    fn test_recipient_includes() {
        assert!(Recipient::All.includes(Seat::One));
        assert!(Recipient::AllExcept(Seat::One).includes(Seat::Two));
        assert!(!Recipient::AllExcept(Seat::One).includes(Seat::One));
    }

    // =====================================================================
    // ClientEvent
    // =====================================================================

    #[test]
    fn test_client_create_room_parses_without_fields() {
        let env: ClientEnvelope =
            serde_json::from_str(r#"{"seq":1,"event":{"type":"createRoom"}}"#).unwrap();
        assert_eq!(env.seq, 1);
        assert_eq!(env.timestamp, 0);
        assert_eq!(env.event, ClientEvent::CreateRoom);
    }

    #[test]
    fn test_client_join_room_uses_camel_case_field() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"joinRoom","roomId":"ABC123"}"#).unwrap();
        assert_eq!(
            event,
            ClientEvent::JoinRoom {
                room_id: RoomCode::new("ABC123")
            }
        );
    }

    #[test]
    fn test_client_game_action_state_is_optional() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"gameAction","action":{"tile":5}}"#).unwrap();
        assert_eq!(
            event,
            ClientEvent::GameAction {
                action: json!({"tile": 5}),
                game_state: None,
            }
        );

        let event: ClientEvent = serde_json::from_str(
            r#"{"type":"gameAction","action":"draw","gameState":{"turn":2}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            ClientEvent::GameAction {
                action: json!("draw"),
                game_state: Some(json!({"turn": 2})),
            }
        );
    }

    #[test]
    fn test_client_game_action_null_state_is_absent() {
        let event: ClientEvent = serde_json::from_str(
            r#"{"type":"gameAction","action":"pass","gameState":null}"#,
        )
        .unwrap();
        assert!(matches!(event, ClientEvent::GameAction { game_state: None, .. }));
    }

    #[test]
    fn test_client_start_game_accepts_any_payload() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"startGame","gameState":[1,2,3]}"#).unwrap();
        assert_eq!(
            event,
            ClientEvent::StartGame {
                game_state: json!([1, 2, 3])
            }
        );
    }

    #[test]
    fn test_client_unknown_event_type_is_rejected() {
        let result: Result<ClientEvent, _> =
            serde_json::from_str(r#"{"type":"flyToMoon"}"#);
        assert!(result.is_err());
    }

    // =====================================================================
    // ServerEvent
    // =====================================================================

    #[test]
    fn test_room_ack_success_json_format() {
        let event = ServerEvent::room_joined(3, RoomCode::new("ABC123"), Seat::Two);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            json!({
                "type": "roomAck",
                "replyTo": 3,
                "success": true,
                "roomId": "ABC123",
                "seat": 2
            })
        );
    }

    #[test]
    fn test_room_ack_failure_json_format() {
        let event = ServerEvent::room_failed(9, ErrorCode::RoomFull);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            json!({
                "type": "roomAck",
                "replyTo": 9,
                "success": false,
                "error": "RoomFull"
            })
        );
    }

    #[test]
    fn test_player_joined_json_format() {
        let event = ServerEvent::PlayerJoined {
            seat: Seat::Two,
            seat_count: 2,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json, json!({"type": "playerJoined", "seat": 2, "seatCount": 2}));
    }

    #[test]
    fn test_game_action_keeps_null_state() {
        let event = ServerEvent::GameAction {
            action: json!("pass"),
            game_state: None,
            seat: Seat::One,
            timestamp: 42,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "gameAction");
        assert!(json["gameState"].is_null());
        assert_eq!(json["seat"], 1);
        assert_eq!(json["timestamp"], 42);
    }

    #[test]
    fn test_server_envelope_json_format() {
        let env = ServerEnvelope {
            seq: 5,
            timestamp: 1000,
            event: ServerEvent::PlayerLeft { seat: Seat::One },
        };
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(
            json,
            json!({
                "seq": 5,
                "timestamp": 1000,
                "event": {"type": "playerLeft", "seat": 1}
            })
        );
    }

    #[test]
    fn test_error_code_display_matches_wire() {
        for code in [
            ErrorCode::RoomNotFound,
            ErrorCode::RoomFull,
            ErrorCode::AlreadySeated,
            ErrorCode::IdentifierExhaustion,
        ] {
            let wire = serde_json::to_value(code).unwrap();
            assert_eq!(wire, json!(code.to_string()));
        }
    }

    #[test]
    fn test_decode_garbage_returns_error() {
        let result: Result<ClientEnvelope, _> = serde_json::from_slice(b"not json at all");
        assert!(result.is_err());
    }

    #[test]
    fn test_unix_millis_is_recent() {
        // 2020-01-01 in millis.
        assert!(unix_millis() > 1_577_836_800_000);
    }
}
