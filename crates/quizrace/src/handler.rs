//! Per-connection handler: request dispatch and snapshot forwarding.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The task waits on two things at once:
//!   1. Incoming frames → decode → dispatch to the target room
//!   2. Snapshots from the room it joined → forward as `state`
//!
//! Replies (`joined`, `rejected`, `error`) go only to this connection;
//! `state` messages reach every connection subscribed to the room.

use std::sync::Arc;

use quizrace_protocol::{ClientMessage, Codec, Player, RoomId, ServerMessage, Snapshot};
use quizrace_room::{RoomError, RoomHandle};
use quizrace_transport::{Connection, ConnectionId, TransportError, WebSocketConnection};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{Instant, timeout_at};

use crate::QuizraceError;
use crate::channels::RoomChannels;
use crate::server::ServerState;

/// The room a connection is watching.
///
/// A connection follows one room at a time; joining another room
/// switches the feed.
struct RoomFeed {
    room_id: RoomId,
    receiver: broadcast::Receiver<Snapshot>,
}

/// What came in on the socket.
enum Inbound {
    Frame(Vec<u8>),
    Closed,
    Failed(TransportError),
    Idle,
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), QuizraceError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let mut feed: Option<RoomFeed> = None;
    let mut last_frame = Instant::now();

    loop {
        tokio::select! {
            inbound = recv_frame(&conn, &state, last_frame) => match inbound {
                Inbound::Frame(data) => {
                    last_frame = Instant::now();
                    handle_frame(&conn, &state, &mut feed, &data).await?;
                }
                Inbound::Closed => {
                    tracing::debug!(%conn_id, "connection closed cleanly");
                    break;
                }
                Inbound::Failed(e) => {
                    tracing::debug!(%conn_id, error = %e, "recv error");
                    break;
                }
                Inbound::Idle => {
                    tracing::info!(%conn_id, "connection idle, closing");
                    let _ = conn.close().await;
                    break;
                }
            },
            message = next_update(&mut feed) => {
                send(&conn, &state.codec, &message).await?;
            }
        }
    }

    Ok(())
}

/// Waits for the next frame, honoring the idle timeout if one is set.
async fn recv_frame<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
    last_frame: Instant,
) -> Inbound {
    let received = match state.idle_timeout {
        Some(idle) => match timeout_at(last_frame + idle, conn.recv()).await {
            Ok(received) => received,
            Err(_) => return Inbound::Idle,
        },
        None => conn.recv().await,
    };
    match received {
        Ok(Some(data)) => Inbound::Frame(data),
        Ok(None) => Inbound::Closed,
        Err(e) => Inbound::Failed(e),
    }
}

/// Waits for the next snapshot of the watched room. Pends forever while
/// the connection hasn't joined anything.
async fn next_update(feed: &mut Option<RoomFeed>) -> ServerMessage {
    loop {
        let Some(current) = feed.as_mut() else {
            return std::future::pending().await;
        };
        let received = current.receiver.recv().await;
        match received {
            Ok(snapshot) => {
                return ServerMessage::State {
                    room_id: current.room_id.clone(),
                    snapshot,
                };
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(
                    room_id = %current.room_id,
                    skipped,
                    "subscriber lagged, skipping to newest snapshot"
                );
            }
            Err(RecvError::Closed) => *feed = None,
        }
    }
}

/// Decodes one frame and dispatches it to its room.
async fn handle_frame<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
    feed: &mut Option<RoomFeed>,
    data: &[u8],
) -> Result<(), QuizraceError> {
    let conn_id = conn.id();
    let msg: ClientMessage = match state.codec.decode(data) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::debug!(%conn_id, error = %e, "failed to decode request");
            return send_error(conn, &state.codec, 400, &format!("invalid message: {e}")).await;
        }
    };

    let room_id = msg
        .room_id()
        .cloned()
        .unwrap_or_else(|| state.default_room.clone());

    // Lock only for the lookup, drop before talking to the room.
    let room = state.rooms.lock().await.room(&room_id);

    let result = match msg {
        ClientMessage::Join { name, color, .. } => {
            match join_room(&room, &state.channels, feed, name, color, conn_id).await {
                Ok(player) => {
                    tracing::debug!(%conn_id, %room_id, player_id = %player.id, "joined");
                    let joined = ServerMessage::Joined {
                        room_id: room_id.clone(),
                        player,
                    };
                    return send(conn, &state.codec, &joined).await;
                }
                Err(e) => Err(e),
            }
        }
        ClientMessage::Start { .. } => room.start().await,
        ClientMessage::Next { .. } => room.next().await.map(|_| ()),
        ClientMessage::Reset { .. } => room.reset().await,
        ClientMessage::Answer {
            player_id,
            choice_index,
            ..
        } => room.answer(player_id, choice_index).await.map(|_| ()),
    };

    match result {
        Ok(()) => Ok(()),
        Err(RoomError::Rejected(reason)) => {
            tracing::debug!(%conn_id, %room_id, %reason, "request rejected");
            let rejected = ServerMessage::Rejected {
                room_id,
                reason: reason.to_string(),
            };
            send(conn, &state.codec, &rejected).await
        }
        Err(e @ RoomError::Unavailable(_)) => {
            tracing::warn!(%conn_id, error = %e, "room unavailable");
            send_error(conn, &state.codec, 503, &e.to_string()).await
        }
    }
}

/// Adds a player to `room` and, once that succeeds, points `feed` at it.
///
/// The subscription is taken before the join so the snapshot announcing
/// the player reaches the joiner too. A failed join leaves `feed` alone.
async fn join_room(
    room: &RoomHandle,
    channels: &RoomChannels,
    feed: &mut Option<RoomFeed>,
    name: Option<String>,
    color: Option<String>,
    conn_id: ConnectionId,
) -> Result<Player, RoomError> {
    let room_id = room.room_id().clone();
    let receiver = channels.subscribe(&room_id);
    let player = room.join(name, color, Some(conn_id)).await?;
    *feed = Some(RoomFeed { room_id, receiver });
    Ok(player)
}

async fn send(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    message: &ServerMessage,
) -> Result<(), QuizraceError> {
    let bytes = codec.encode(message)?;
    conn.send(&bytes).await?;
    Ok(())
}

/// Sends a `ServerMessage::Error` to the client.
async fn send_error(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    code: u16,
    message: &str,
) -> Result<(), QuizraceError> {
    let error = ServerMessage::Error {
        code,
        message: message.to_string(),
    };
    send(conn, codec, &error).await
}
