//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The frame is not valid JSON or doesn't match any known event.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
