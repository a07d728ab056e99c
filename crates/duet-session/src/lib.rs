//! Connection registry for the Duet relay.
//!
//! Tracks which live connection sits in which room and seat. It's the
//! reverse index of each room's seat list: the room layer keeps the two
//! in agreement, this crate only stores the associations.
//!
//! ```text
//! Room layer (above)  ← keeps seats and registry entries consistent
//!     ↕
//! Registry (this crate)  ← ConnectionId → Membership
//!     ↕
//! Transport / Protocol (below)  ← ConnectionId, RoomCode, Seat
//! ```

mod error;
mod membership;
mod registry;

pub use error::SessionError;
pub use membership::Membership;
pub use registry::ConnectionRegistry;
