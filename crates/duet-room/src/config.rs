//! Room configuration and the lifecycle state machine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Tunables shared by every room on a server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// How often the reaper sweeps for seat-less rooms. This is also the
    /// worst-case grace period an emptied room survives.
    pub sweep_interval: Duration,

    /// How many fresh codes `create_room` tries before giving up with
    /// `IdentifierExhaustion`.
    pub max_code_attempts: u32,

    /// Capacity of each room actor's command channel.
    pub channel_size: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(60),
            max_code_attempts: 16,
            channel_size: 64,
        }
    }
}

// ---------------------------------------------------------------------------
// RoomPhase
// ---------------------------------------------------------------------------

/// The lifecycle phase of a room.
///
/// ```text
///            join             start
/// Waiting ─────────→ Ready ─────────→ InProgress
///    ↑  ↖              │                   │
///    │    └── leave ───┘                   │ leave
///    │ join                                ▼
///  Empty ←──────── leave (last seat) ── Partial ── join ──→ Ready
/// ```
///
/// - **Waiting**: one seat taken, game never started (or abandoned before
///   starting).
/// - **Ready**: both seats taken, waiting for `startGame`.
/// - **InProgress**: a game is running. Another `startGame` restarts it.
/// - **Partial**: a seat was vacated mid-game; one occupant remains.
/// - **Empty**: no seats. The next reaper sweep deletes the room unless
///   someone joins first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomPhase {
    Waiting,
    Ready,
    InProgress,
    Partial,
    Empty,
}

impl RoomPhase {
    /// The phase after a seat is taken, given the seat count afterwards.
    pub fn after_join(self, seats: usize) -> Self {
        if seats >= 2 { Self::Ready } else { Self::Waiting }
    }

    /// The phase after a seat is vacated, given the seat count afterwards.
    pub fn after_leave(self, seats: usize) -> Self {
        match (self, seats) {
            (_, 0) => Self::Empty,
            (Self::InProgress | Self::Partial, _) => Self::Partial,
            _ => Self::Waiting,
        }
    }

    /// Returns `true` if `startGame` is allowed in this phase.
    pub fn can_start(self) -> bool {
        matches!(self, Self::Ready | Self::InProgress)
    }

    /// Returns `true` if the reaper may delete a room in this phase.
    pub fn is_reapable(self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns `true` if moving to `target` is a legal edge of the state
    /// machine above.
    pub fn can_transition_to(self, target: Self) -> bool {
        use RoomPhase::*;
        matches!(
            (self, target),
            (Waiting, Ready)
                | (Waiting, Empty)
                | (Ready, InProgress)
                | (Ready, Waiting)
                | (Ready, Empty)
                | (InProgress, InProgress)
                | (InProgress, Partial)
                | (InProgress, Empty)
                | (Partial, Ready)
                | (Partial, Empty)
                | (Empty, Waiting)
        )
    }
}

impl std::fmt::Display for RoomPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Waiting => write!(f, "Waiting"),
            Self::Ready => write!(f, "Ready"),
            Self::InProgress => write!(f, "InProgress"),
            Self::Partial => write!(f, "Partial"),
            Self::Empty => write!(f, "Empty"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_after_join_fills_to_ready() {
        assert_eq!(RoomPhase::Waiting.after_join(2), RoomPhase::Ready);
        assert_eq!(RoomPhase::Partial.after_join(2), RoomPhase::Ready);
        assert_eq!(RoomPhase::Empty.after_join(1), RoomPhase::Waiting);
    }

    #[test]
    fn test_after_leave_depends_on_whether_game_started() {
        assert_eq!(RoomPhase::Ready.after_leave(1), RoomPhase::Waiting);
        assert_eq!(RoomPhase::InProgress.after_leave(1), RoomPhase::Partial);
        assert_eq!(RoomPhase::Partial.after_leave(0), RoomPhase::Empty);
        assert_eq!(RoomPhase::Waiting.after_leave(0), RoomPhase::Empty);
    }

    #[test]
    fn test_every_derived_transition_is_legal() {
        let phases = [
            RoomPhase::Waiting,
            RoomPhase::Ready,
            RoomPhase::InProgress,
            RoomPhase::Partial,
            RoomPhase::Empty,
        ];
        // Seat counts each phase can actually be in before the event.
        let seats_in = |p: RoomPhase| match p {
            RoomPhase::Waiting | RoomPhase::Partial => 1,
            RoomPhase::Ready | RoomPhase::InProgress => 2,
            RoomPhase::Empty => 0,
        };
        for p in phases {
            let n = seats_in(p);
            if n < 2 {
                assert!(p.can_transition_to(p.after_join(n + 1)), "{p} join");
            }
            if n > 0 {
                assert!(p.can_transition_to(p.after_leave(n - 1)), "{p} leave");
            }
        }
    }

    #[test]
    fn test_can_start_only_with_full_room() {
        assert!(!RoomPhase::Waiting.can_start());
        assert!(RoomPhase::Ready.can_start());
        assert!(RoomPhase::InProgress.can_start());
        assert!(!RoomPhase::Partial.can_start());
        assert!(!RoomPhase::Empty.can_start());
    }

    #[test]
    fn test_only_empty_is_reapable() {
        assert!(RoomPhase::Empty.is_reapable());
        assert!(!RoomPhase::Waiting.is_reapable());
        assert!(!RoomPhase::Partial.is_reapable());
    }

    #[test]
    fn test_illegal_transitions_rejected() {
        assert!(!RoomPhase::Waiting.can_transition_to(RoomPhase::InProgress));
        assert!(!RoomPhase::Empty.can_transition_to(RoomPhase::Ready));
        assert!(!RoomPhase::Partial.can_transition_to(RoomPhase::InProgress));
    }

    #[test]
    fn test_room_config_default() {
        let config = RoomConfig::default();
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
        assert_eq!(config.max_code_attempts, 16);
        assert_eq!(config.channel_size, 64);
    }
}
