//! # Duet
//!
//! A relay server for two-player browser games.
//!
//! Clients open a room, share its six-character code, and the relay seats
//! up to two connections per room, forwards moves and chat between them,
//! and keeps the last game state. The relay never interprets game state.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use duet::prelude::*;
//!
//! # async fn start() -> Result<(), DuetError> {
//! let server = DuetServer::builder()
//!     .bind("0.0.0.0:3000")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::DuetError;
pub use server::{DEFAULT_HANDSHAKE_TIMEOUT, DEFAULT_IDLE_TIMEOUT, DuetServer, DuetServerBuilder};

pub mod prelude {
    pub use crate::{
        DEFAULT_HANDSHAKE_TIMEOUT, DEFAULT_IDLE_TIMEOUT, DuetError, DuetServer, DuetServerBuilder,
    };
    pub use duet_protocol::{
        ClientEnvelope, ClientEvent, Codec, Envelope, ErrorCode, GameState, JsonCodec, RoomCode,
        Seat, ServerEnvelope, ServerEvent,
    };
    pub use duet_room::{RoomConfig, RoomInfo, RoomManager, RoomPhase};
}
