//! Room lifecycle management for Duet.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! two seats and the last game state. The [`RoomManager`] maps codes to
//! rooms and connections to seats, and the reaper deletes rooms that have
//! sat empty through a sweep.
//!
//! # Key types
//!
//! - [`RoomManager`]: creates rooms, seats connections, routes events
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`RoomPhase`]: lifecycle state machine
//! - [`RoomConfig`]: sweep period, code attempts, channel size
//! - [`CodeGenerator`]: where room codes come from

mod codes;
mod config;
mod error;
mod manager;
mod reaper;
mod room;
mod store;

pub use codes::{CodeGenerator, RandomCodes};
pub use config::{RoomConfig, RoomPhase};
pub use error::RoomError;
pub use manager::RoomManager;
pub use reaper::spawn_reaper;
pub use room::{Admission, ConnectionSender, RoomHandle, RoomInfo};
pub use store::RoomStore;
