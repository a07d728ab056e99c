//! Per-connection handler: registration, event dispatch, and cleanup.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   0. Complete the WebSocket upgrade within the handshake timeout
//!   1. Register the connection and spawn its writer task
//!   2. Loop: receive envelopes → dispatch room or heartbeat events
//!   3. On close, error, or idle timeout: vacate the seat, unregister
//!
//! Every outbound event, direct replies included, goes through the
//! connection's channel so replies and room broadcasts reach the client
//! in the order they were produced.

use std::sync::Arc;

use duet_protocol::{
    ClientEnvelope, ClientEvent, Codec, ErrorCode, ServerEnvelope, ServerEvent, unix_millis,
};
use duet_room::{ConnectionSender, RoomError};
use duet_transport::{
    Connection, ConnectionId, IncomingSocket, Transport, TransportError, WebSocketConnection,
    WebSocketTransport,
};
use tokio::sync::mpsc;

use crate::DuetError;
use crate::server::ServerState;

/// Drop guard that vacates a connection's seat and unregisters it when the
/// handler exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the async work.
struct ConnectionGuard<C: Codec> {
    conn_id: ConnectionId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for ConnectionGuard<C> {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            // The seat must be looked up before the registry entry goes.
            if let Some((room, seat)) = state.rooms.remove_connection(conn_id).await {
                tracing::info!(%conn_id, %room, %seat, "seat vacated on disconnect");
            }
            state.rooms.unregister_connection(conn_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    incoming: IncomingSocket,
    state: Arc<ServerState<C>>,
) -> Result<(), DuetError> {
    let peer = incoming.peer_addr();
    let conn = match WebSocketTransport::upgrade(incoming, state.handshake_timeout).await {
        Ok(conn) => Arc::new(conn),
        Err(e) => {
            tracing::debug!(%peer, error = %e, "handshake failed");
            return Ok(());
        }
    };
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    state.rooms.register_connection(conn_id).await;
    let _guard = ConnectionGuard {
        conn_id,
        state: Arc::clone(&state),
    };

    let (tx, rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_loop(Arc::clone(&conn), rx, Arc::clone(&state)));

    let result = read_loop(&conn, &state, &tx).await;

    writer.abort();
    if let Err(e) = conn.close().await {
        tracing::trace!(%conn_id, error = %e, "close after disconnect");
    }

    // _guard drops here → seat vacated, registry entry removed.
    result
}

/// Receives and dispatches envelopes until the peer goes away.
async fn read_loop<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
    tx: &ConnectionSender,
) -> Result<(), DuetError> {
    let conn_id = conn.id();

    loop {
        let data = match tokio::time::timeout(state.idle_timeout, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                return Ok(());
            }
            Ok(Err(e)) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                return Ok(());
            }
            Err(_) => {
                tracing::info!(%conn_id, "connection idle, dropping");
                return Ok(());
            }
        };

        let envelope: ClientEnvelope = match state.codec.decode(&data) {
            Ok(env) => env,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode envelope");
                continue;
            }
        };

        dispatch(conn_id, state, tx, envelope).await?;
    }
}

/// Applies one client event.
///
/// `createRoom`, `joinRoom` and `ping` are always answered. Room events
/// from a connection that may not send them are dropped after a debug log.
async fn dispatch<C: Codec>(
    conn_id: ConnectionId,
    state: &ServerState<C>,
    tx: &ConnectionSender,
    envelope: ClientEnvelope,
) -> Result<(), DuetError> {
    let seq = envelope.seq;

    match envelope.event {
        ClientEvent::CreateRoom => {
            let ack = match state.rooms.create_room(conn_id, tx.clone()).await {
                Ok((room, seat)) => ServerEvent::room_joined(seq, room, seat),
                Err(e) => failed_ack(conn_id, seq, e),
            };
            reply(tx, ack)?;
        }

        ClientEvent::JoinRoom { room_id } => {
            match state.rooms.join_room(&room_id, conn_id, tx.clone()).await {
                Ok(admission) => {
                    reply(tx, ServerEvent::room_joined(seq, room_id, admission.seat))?;
                    // The room told the other seat; the joiner hears it
                    // after its ack.
                    reply(
                        tx,
                        ServerEvent::PlayerJoined {
                            seat: admission.seat,
                            seat_count: admission.seat_count,
                        },
                    )?;
                }
                Err(e) => reply(tx, failed_ack(conn_id, seq, e))?,
            }
        }

        ClientEvent::StartGame { game_state } => {
            if let Err(e) = state.rooms.start_game(conn_id, game_state).await {
                tracing::debug!(%conn_id, error = %e, "startGame dropped");
            }
        }

        ClientEvent::GameAction { action, game_state } => {
            if let Err(e) = state.rooms.relay_action(conn_id, action, game_state).await {
                tracing::debug!(%conn_id, error = %e, "gameAction dropped");
            }
        }

        ClientEvent::ChatMessage { message } => {
            if let Err(e) = state.rooms.chat(conn_id, message).await {
                tracing::debug!(%conn_id, error = %e, "chatMessage dropped");
            }
        }

        ClientEvent::Ping => reply(tx, ServerEvent::Pong { reply_to: seq })?,
    }

    Ok(())
}

/// Builds a failed `roomAck`. Faults with no wire code (a registry
/// inconsistency) are reported as `RoomNotFound`.
fn failed_ack(conn_id: ConnectionId, seq: u64, err: RoomError) -> ServerEvent {
    let code = err.error_code().unwrap_or_else(|| {
        tracing::warn!(%conn_id, error = %err, "room request failed unexpectedly");
        ErrorCode::RoomNotFound
    });
    tracing::debug!(%conn_id, %code, "room request refused");
    ServerEvent::room_failed(seq, code)
}

/// Queues an event for this connection. Fails only once the writer has
/// stopped, which means the socket is gone.
fn reply(tx: &ConnectionSender, event: ServerEvent) -> Result<(), DuetError> {
    tx.send(event)
        .map_err(|_| TransportError::ConnectionClosed("writer stopped".into()).into())
}

/// Drains the outbound channel into the socket, stamping each event with
/// the server's sequence number and clock.
async fn write_loop<C: Codec>(
    conn: Arc<WebSocketConnection>,
    mut rx: mpsc::UnboundedReceiver<ServerEvent>,
    state: Arc<ServerState<C>>,
) {
    let conn_id = conn.id();
    let mut seq: u64 = 1;

    while let Some(event) = rx.recv().await {
        let envelope = ServerEnvelope {
            seq: next_seq(&mut seq),
            timestamp: unix_millis(),
            event,
        };
        let bytes = match state.codec.encode(&envelope) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%conn_id, error = %e, "failed to encode event");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(%conn_id, error = %e, "send failed, stopping writer");
            break;
        }
    }
}

/// Increments and returns the next sequence number.
fn next_seq(seq: &mut u64) -> u64 {
    let current = *seq;
    *seq += 1;
    current
}
