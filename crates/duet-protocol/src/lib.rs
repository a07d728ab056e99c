//! Wire protocol for the Duet relay.
//!
//! - **Types** ([`Envelope`], [`ClientEvent`], [`ServerEvent`], [`RoomCode`],
//!   [`Seat`]): the frames that travel between clients and the relay.
//! - **Codec** ([`Codec`], [`JsonCodec`]): how frames become bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Rooms (seats, broadcasts)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    ClientEnvelope, ClientEvent, Envelope, ErrorCode, GameState, Recipient, RoomCode, Seat,
    ServerEnvelope, ServerEvent, unix_millis,
};
