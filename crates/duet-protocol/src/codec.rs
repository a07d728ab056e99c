//! Codec trait and the JSON implementation.
//!
//! The handler never calls `serde_json` directly; it goes through a
//! [`Codec`] so the framing format stays swappable.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to bytes and decodes them back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the bytes are malformed or
    /// don't match the expected shape.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`.
///
/// ```rust
/// use duet_protocol::{ClientEnvelope, ClientEvent, Codec, JsonCodec};
///
/// let codec = JsonCodec;
/// let frame = br#"{"seq":1,"event":{"type":"ping"}}"#;
/// let envelope: ClientEnvelope = codec.decode(frame).unwrap();
/// assert_eq!(envelope.event, ClientEvent::Ping);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClientEnvelope, ServerEnvelope, ServerEvent};

    #[test]
    fn test_encode_produces_json_text() {
        let env = ServerEnvelope {
            seq: 1,
            timestamp: 7,
            event: ServerEvent::Pong { reply_to: 4 },
        };
        let bytes = JsonCodec.encode(&env).unwrap();
        let text = std::str::from_utf8(&bytes).unwrap();
        assert!(text.contains(r#""type":"pong""#));
        assert!(text.contains(r#""replyTo":4"#));
    }

    #[test]
    fn test_decode_error_is_protocol_decode() {
        let result: Result<ClientEnvelope, _> = JsonCodec.decode(b"{");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
