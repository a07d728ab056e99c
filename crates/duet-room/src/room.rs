//! Room actor: an isolated Tokio task that owns one room's state.
//!
//! Every mutation of a room (seating, starting, relaying, leaving, the
//! reaper's emptiness check) is a command on the actor's channel, so
//! commands for one room are applied one at a time while other rooms run
//! in parallel.

use std::time::Instant;

use duet_protocol::{GameState, Recipient, RoomCode, Seat, ServerEvent, unix_millis};
use duet_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};

use crate::{RoomError, RoomPhase};

/// Channel sender for delivering outbound events to one connection.
///
/// Unbounded so a slow client never stalls the room actor.
pub type ConnectionSender = mpsc::UnboundedSender<ServerEvent>;

/// Result of a successful seat admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// The seat that was assigned.
    pub seat: Seat,
    /// How many seats are taken now, including the new one.
    pub seat_count: usize,
}

/// Commands sent to a room actor through its channel.
pub(crate) enum RoomCommand {
    Join {
        conn: ConnectionId,
        sender: ConnectionSender,
        reply: oneshot::Sender<Result<Admission, RoomError>>,
    },

    Start {
        conn: ConnectionId,
        game_state: GameState,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    Action {
        conn: ConnectionId,
        action: serde_json::Value,
        game_state: Option<GameState>,
        reply: oneshot::Sender<Result<Seat, RoomError>>,
    },

    Chat {
        conn: ConnectionId,
        message: String,
        reply: oneshot::Sender<Result<Seat, RoomError>>,
    },

    /// Tell the other seat that `seat` has been filled.
    Announce {
        seat: Seat,
        reply: oneshot::Sender<()>,
    },

    Leave {
        conn: ConnectionId,
        reply: oneshot::Sender<Result<Seat, RoomError>>,
    },

    /// Undo a join nobody has heard about yet. No `playerLeft` goes out.
    Withdraw {
        conn: ConnectionId,
        reply: oneshot::Sender<Result<Seat, RoomError>>,
    },

    /// Stop the actor if (and only if) no seat is taken. Replies `true`
    /// when the room was reaped.
    Reap { reply: oneshot::Sender<bool> },

    GetInfo { reply: oneshot::Sender<RoomInfo> },
}

/// A snapshot of a room.
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub code: RoomCode,
    pub phase: RoomPhase,
    /// Occupied seats, in seat order.
    pub seats: Vec<Seat>,
    /// Who sits in each occupied seat, in seat order.
    pub occupants: Vec<(ConnectionId, Seat)>,
    /// Last stored game state, if any.
    pub game_state: Option<GameState>,
    pub created_at: Instant,
}

impl RoomInfo {
    /// Number of occupied seats.
    pub fn seat_count(&self) -> usize {
        self.seats.len()
    }
}

/// Handle to a running room actor.
///
/// Cheap to clone; the room store keeps one per room and callers clone it
/// out so they never hold the store lock while talking to a room.
#[derive(Clone)]
pub struct RoomHandle {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// Returns the room's code.
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Sends a command and waits for the actor's reply.
    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(make(reply_tx))
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }

    /// Asks the room to seat a connection in its lowest vacant seat.
    ///
    /// The other occupant is not told until [`announce`](Self::announce)
    /// is called, so a join can still be withdrawn silently.
    pub async fn join(
        &self,
        conn: ConnectionId,
        sender: ConnectionSender,
    ) -> Result<Admission, RoomError> {
        self.request(|reply| RoomCommand::Join {
            conn,
            sender,
            reply,
        })
        .await?
    }

    /// Starts the game with `game_state`.
    pub async fn start(
        &self,
        conn: ConnectionId,
        game_state: GameState,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Start {
            conn,
            game_state,
            reply,
        })
        .await?
    }

    /// Relays an action to the other seat. Returns the sender's seat.
    pub async fn action(
        &self,
        conn: ConnectionId,
        action: serde_json::Value,
        game_state: Option<GameState>,
    ) -> Result<Seat, RoomError> {
        self.request(|reply| RoomCommand::Action {
            conn,
            action,
            game_state,
            reply,
        })
        .await?
    }

    /// Broadcasts a chat line. Returns the author's seat.
    pub async fn chat(
        &self,
        conn: ConnectionId,
        message: String,
    ) -> Result<Seat, RoomError> {
        self.request(|reply| RoomCommand::Chat {
            conn,
            message,
            reply,
        })
        .await?
    }

    /// Sends `playerJoined` for `seat` to the other occupant. Does nothing
    /// if the seat has been vacated since.
    pub async fn announce(&self, seat: Seat) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Announce { seat, reply })
            .await
    }

    /// Vacates the connection's seat. Returns the seat it held.
    pub async fn leave(&self, conn: ConnectionId) -> Result<Seat, RoomError> {
        self.request(|reply| RoomCommand::Leave { conn, reply })
            .await?
    }

    /// Vacates an unannounced seat without notifying anyone.
    pub async fn withdraw(&self, conn: ConnectionId) -> Result<Seat, RoomError> {
        self.request(|reply| RoomCommand::Withdraw { conn, reply })
            .await?
    }

    /// Asks the room to shut down if it is empty.
    pub async fn reap(&self) -> Result<bool, RoomError> {
        self.request(|reply| RoomCommand::Reap { reply }).await
    }

    /// Requests a snapshot of the room.
    pub async fn get_info(&self) -> Result<RoomInfo, RoomError> {
        self.request(|reply| RoomCommand::GetInfo { reply }).await
    }
}

/// A seated connection and its outbound channel.
struct Occupant {
    conn: ConnectionId,
    sender: ConnectionSender,
}

/// The internal room state. Runs inside a Tokio task.
struct RoomActor {
    code: RoomCode,
    phase: RoomPhase,
    /// Indexed by `Seat::index()`.
    seats: [Option<Occupant>; 2],
    game_state: Option<GameState>,
    created_at: Instant,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    /// Runs the actor loop until the room is reaped or every handle is
    /// dropped.
    async fn run(mut self) {
        tracing::debug!(room = %self.code, "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::Join {
                    conn,
                    sender,
                    reply,
                } => {
                    let _ = reply.send(self.handle_join(conn, sender));
                }
                RoomCommand::Start {
                    conn,
                    game_state,
                    reply,
                } => {
                    let _ = reply.send(self.handle_start(conn, game_state));
                }
                RoomCommand::Action {
                    conn,
                    action,
                    game_state,
                    reply,
                } => {
                    let _ = reply.send(self.handle_action(conn, action, game_state));
                }
                RoomCommand::Chat {
                    conn,
                    message,
                    reply,
                } => {
                    let _ = reply.send(self.handle_chat(conn, message));
                }
                RoomCommand::Announce { seat, reply } => {
                    self.handle_announce(seat);
                    let _ = reply.send(());
                }
                RoomCommand::Leave { conn, reply } => {
                    let _ = reply.send(self.handle_leave(conn, true));
                }
                RoomCommand::Withdraw { conn, reply } => {
                    let _ = reply.send(self.handle_leave(conn, false));
                }
                RoomCommand::Reap { reply } => {
                    let empty = self.phase.is_reapable();
                    let _ = reply.send(empty);
                    if empty {
                        break;
                    }
                }
                RoomCommand::GetInfo { reply } => {
                    let _ = reply.send(self.info());
                }
            }
        }

        tracing::debug!(room = %self.code, "room actor stopped");
    }

    fn handle_join(
        &mut self,
        conn: ConnectionId,
        sender: ConnectionSender,
    ) -> Result<Admission, RoomError> {
        if self.seat_of(conn).is_some() {
            return Err(RoomError::AlreadySeated(conn));
        }
        let seat = Seat::ALL
            .into_iter()
            .find(|s| self.seats[s.index()].is_none())
            .ok_or_else(|| RoomError::RoomFull(self.code.clone()))?;

        self.seats[seat.index()] = Some(Occupant { conn, sender });
        let seat_count = self.seat_count();
        self.set_phase(self.phase.after_join(seat_count));

        tracing::info!(
            room = %self.code,
            %conn,
            %seat,
            seats = seat_count,
            "player joined"
        );

        Ok(Admission { seat, seat_count })
    }

    /// The joiner hears about itself after its ack, from the handler.
    fn handle_announce(&self, seat: Seat) {
        if self.seats[seat.index()].is_none() {
            return;
        }
        self.broadcast(
            Recipient::AllExcept(seat),
            ServerEvent::PlayerJoined {
                seat,
                seat_count: self.seat_count(),
            },
        );
    }

    fn handle_start(
        &mut self,
        conn: ConnectionId,
        game_state: GameState,
    ) -> Result<(), RoomError> {
        let seat = self.seat_of(conn).ok_or(RoomError::NotSeated(conn))?;
        if self.seat_count() < 2 || !self.phase.can_start() {
            return Err(RoomError::NotReady(self.code.clone()));
        }

        self.game_state = Some(game_state.clone());
        self.set_phase(RoomPhase::InProgress);
        tracing::info!(room = %self.code, %seat, "game started");

        self.broadcast(Recipient::All, ServerEvent::GameStarted { game_state });
        Ok(())
    }

    fn handle_action(
        &mut self,
        conn: ConnectionId,
        action: serde_json::Value,
        game_state: Option<GameState>,
    ) -> Result<Seat, RoomError> {
        let seat = self.seat_of(conn).ok_or(RoomError::NotSeated(conn))?;

        // Last writer wins: the sender's view replaces the stored state.
        if let Some(state) = &game_state {
            self.game_state = Some(state.clone());
        }

        tracing::debug!(room = %self.code, %seat, %action, "relaying action");
        self.broadcast(
            Recipient::AllExcept(seat),
            ServerEvent::GameAction {
                action,
                game_state,
                seat,
                timestamp: unix_millis(),
            },
        );
        Ok(seat)
    }

    fn handle_chat(
        &mut self,
        conn: ConnectionId,
        message: String,
    ) -> Result<Seat, RoomError> {
        let seat = self.seat_of(conn).ok_or(RoomError::NotSeated(conn))?;
        self.broadcast(
            Recipient::All,
            ServerEvent::ChatMessage {
                seat,
                message,
                timestamp: unix_millis(),
            },
        );
        Ok(seat)
    }

    fn handle_leave(&mut self, conn: ConnectionId, notify: bool) -> Result<Seat, RoomError> {
        let seat = self.seat_of(conn).ok_or(RoomError::NotSeated(conn))?;
        self.seats[seat.index()] = None;

        let seat_count = self.seat_count();
        self.set_phase(self.phase.after_leave(seat_count));

        tracing::info!(
            room = %self.code,
            %conn,
            %seat,
            seats = seat_count,
            "player left"
        );
        if seat_count == 0 {
            tracing::info!(room = %self.code, "room is empty, pending reap");
        }

        if notify {
            self.broadcast(Recipient::All, ServerEvent::PlayerLeft { seat });
        }
        Ok(seat)
    }

    fn set_phase(&mut self, next: RoomPhase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "illegal room transition {} -> {}",
            self.phase,
            next
        );
        self.phase = next;
    }

    fn seat_of(&self, conn: ConnectionId) -> Option<Seat> {
        Seat::ALL.into_iter().find(|s| {
            self.seats[s.index()]
                .as_ref()
                .is_some_and(|o| o.conn == conn)
        })
    }

    fn seat_count(&self) -> usize {
        self.seats.iter().flatten().count()
    }

    /// Pushes an event to every matching occupant. A closed receiver just
    /// means that connection is on its way out.
    fn broadcast(&self, recipient: Recipient, event: ServerEvent) {
        for seat in Seat::ALL {
            if !recipient.includes(seat) {
                continue;
            }
            if let Some(occupant) = &self.seats[seat.index()] {
                let _ = occupant.sender.send(event.clone());
            }
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            code: self.code.clone(),
            phase: self.phase,
            seats: Seat::ALL
                .into_iter()
                .filter(|s| self.seats[s.index()].is_some())
                .collect(),
            occupants: Seat::ALL
                .into_iter()
                .filter_map(|s| self.seats[s.index()].as_ref().map(|o| (o.conn, s)))
                .collect(),
            game_state: self.game_state.clone(),
            created_at: self.created_at,
        }
    }
}

/// Spawns a room actor with `creator` already in seat 1.
pub(crate) fn spawn_room(
    code: RoomCode,
    creator: ConnectionId,
    sender: ConnectionSender,
    channel_size: usize,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size);

    let actor = RoomActor {
        code: code.clone(),
        phase: RoomPhase::Waiting,
        seats: [
            Some(Occupant {
                conn: creator,
                sender,
            }),
            None,
        ],
        game_state: None,
        created_at: Instant::now(),
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle { code, sender: tx }
}
