//! WebSocket upgrade handler and per-connection event loop.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::{routing::get, Router};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tokio::time;

use crate::auth::identity::Identity;
use crate::AppState;

use super::events::{ClientEvent, ServerEvent};
use super::fanout::{Envelope, RoomId};
use super::handler;
use super::presence::PresenceEntry;
use super::session::ConnectionSession;

/// Close codes (4000-range for application-level).
const CLOSE_BAD_PAYLOAD: u16 = 4000;
const CLOSE_AUTH_REQUIRED: u16 = 4003;
const CLOSE_AUTH_REJECTED: u16 = 4004;
const CLOSE_TIMED_OUT: u16 = 4009;

/// Window for the first `auth` frame, credential verification included
/// (seconds).
const AUTH_TIMEOUT_SECS: u64 = 10;

/// Server ping cadence. A connection with no inbound frame for a full
/// interval is closed at the next tick.
const PING_INTERVAL_SECS: u64 = 30;

type WsSink = SplitSink<WebSocket, Message>;
type WsStream = SplitStream<WebSocket>;

pub fn router() -> Router<AppState> {
    Router::new().route("/gateway", get(upgrade_handler))
}

async fn upgrade_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve_connection(socket, state))
}

async fn serve_connection(socket: WebSocket, state: AppState) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Step 1: handshake. The timeout covers verification as well, so a
    // hung verifier cannot park connections in limbo.
    let handshake = time::timeout(
        Duration::from_secs(AUTH_TIMEOUT_SECS),
        authenticate(&state, &mut ws_rx),
    )
    .await;

    let identity = match handshake {
        Ok(Ok(identity)) => identity,
        Ok(Err((code, reason))) => {
            tracing::debug!(%reason, "gateway handshake failed");
            let _ = send_close(&mut ws_tx, code, &reason).await;
            return;
        }
        Err(_elapsed) => {
            let _ = send_close(&mut ws_tx, CLOSE_TIMED_OUT, "Handshake timeout").await;
            return;
        }
    };

    // Step 2: admission. Subscribe before announcing so this connection
    // sees its own `users:online` broadcast.
    let mut session = ConnectionSession::new(identity);
    let broadcast_rx = state.broadcast.subscribe();

    state.presence.admit(
        PresenceEntry::new(&session.identity, &session.connection_id),
        &state.broadcast,
    );

    tracing::info!(
        connection_id = %session.connection_id,
        user_id = %session.identity.user_id,
        name = %session.identity.name,
        "gateway connection established"
    );

    session_loop(&state, &mut session, ws_tx, ws_rx, broadcast_rx).await;

    // Step 3: teardown. A superseded connection no longer owns its entry
    // and leaves quietly, with no announcement.
    state.presence.retire(&session.identity.user_id, &session.connection_id, &state.broadcast);

    tracing::info!(
        connection_id = %session.connection_id,
        user_id = %session.identity.user_id,
        "gateway connection closed"
    );
}

/// Reads until the client's first text frame, which must be a parseable
/// `auth` event carrying a verifiable token.
async fn authenticate(state: &AppState, ws_rx: &mut WsStream) -> Result<Identity, (u16, String)> {
    let text = next_text_frame(ws_rx).await?;

    let event: ClientEvent = serde_json::from_str(&text)
        .map_err(|_| (CLOSE_BAD_PAYLOAD, "Invalid JSON".to_string()))?;
    let ClientEvent::Auth(payload) = event else {
        return Err((CLOSE_AUTH_REQUIRED, "Expected auth".to_string()));
    };

    state.verifier.verify(&payload.token).await.map_err(|err| {
        tracing::debug!(%err, "gateway auth refused");
        (CLOSE_AUTH_REJECTED, err.to_string())
    })
}

/// Skips control and binary frames. Errors when the client goes away first.
async fn next_text_frame(ws_rx: &mut WsStream) -> Result<Utf8Bytes, (u16, String)> {
    while let Some(frame) = ws_rx.next().await {
        match frame {
            Ok(Message::Text(text)) => return Ok(text),
            Ok(Message::Close(_)) => {
                return Err((CLOSE_AUTH_REJECTED, "client closed".to_string()))
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(?e, "ws read error during auth");
                return Err((CLOSE_AUTH_REJECTED, "read error".to_string()));
            }
        }
    }
    Err((CLOSE_AUTH_REJECTED, "connection closed before auth".to_string()))
}

/// Main session loop: dispatch client frames, forward hub payloads this
/// connection should see, and enforce liveness with transport pings.
async fn session_loop(
    state: &AppState,
    session: &mut ConnectionSession,
    mut ws_tx: WsSink,
    mut ws_rx: WsStream,
    mut broadcast_rx: broadcast::Receiver<Arc<Envelope>>,
) {
    let mut ping_timer = time::interval(Duration::from_secs(PING_INTERVAL_SECS));
    ping_timer.tick().await; // First tick fires immediately; skip it.
    let mut alive = true;

    loop {
        tokio::select! {
            // Client frame.
            frame = ws_rx.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        alive = true;
                        let event: ClientEvent = match serde_json::from_str(&text) {
                            Ok(event) => event,
                            Err(e) => {
                                // One bad frame must not take the connection down.
                                tracing::debug!(
                                    ?e,
                                    connection_id = %session.connection_id,
                                    "ignoring unparseable client event"
                                );
                                continue;
                            }
                        };

                        if let Some(reply) = dispatch_client_event(state, session, event).await {
                            let json = serde_json::to_string(&reply).unwrap();
                            if ws_tx.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                        alive = true;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(?e, connection_id = %session.connection_id, "ws read error");
                        break;
                    }
                    _ => continue,
                }
            }

            // Fanout hub payload.
            recv = broadcast_rx.recv() => {
                match recv {
                    Ok(payload) => {
                        if !session.should_receive(&payload) {
                            continue;
                        }

                        let json = serde_json::to_string(&payload.event).unwrap();
                        if ws_tx.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(
                            connection_id = %session.connection_id,
                            skipped = n,
                            "gateway session lagged behind broadcast"
                        );
                        // The missed events are gone; the session stays up.
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }

            // Liveness check.
            _ = ping_timer.tick() => {
                if !alive {
                    tracing::debug!(
                        connection_id = %session.connection_id,
                        "ping timeout, closing connection"
                    );
                    let _ = send_close(&mut ws_tx, CLOSE_TIMED_OUT, "Ping timeout").await;
                    break;
                }
                alive = false;
                if ws_tx.send(Message::Ping(Default::default())).await.is_err() {
                    break;
                }
            }
        }
    }
}

/// Route one parsed client frame. Returns the event to write back to the
/// originating connection, if any.
async fn dispatch_client_event(
    state: &AppState,
    session: &mut ConnectionSession,
    event: ClientEvent,
) -> Option<ServerEvent> {
    match event {
        ClientEvent::Auth(_) => {
            // Already authenticated; nothing to re-verify.
            tracing::debug!(
                connection_id = %session.connection_id,
                "auth after admission ignored"
            );
            None
        }
        ClientEvent::CommunityJoin(community_id) => {
            let room = RoomId::Community(community_id);
            tracing::debug!(user = %session.identity.name, %room, "joined room");
            session.join(room);
            None
        }
        ClientEvent::CommunityLeave(community_id) => {
            let room = RoomId::Community(community_id);
            tracing::debug!(user = %session.identity.name, %room, "left room");
            session.leave(&room);
            None
        }
        ClientEvent::MessageSend(payload) => handler::message_send(state, session, payload).await,
        ClientEvent::MessagePrivate(payload) => {
            handler::message_private(state, session, payload).await
        }
        ClientEvent::TypingStart(payload) => {
            handler::typing(state, session, payload, true);
            None
        }
        ClientEvent::TypingStop(payload) => {
            handler::typing(state, session, payload, false);
            None
        }
        ClientEvent::MessageRead(payload) => {
            handler::message_read(state, session, payload).await;
            None
        }
        ClientEvent::NotificationSend(payload) => {
            handler::notification_send(state, payload);
            None
        }
    }
}

/// Writes a close frame. The send may fail if the peer is already gone.
async fn send_close(ws_tx: &mut WsSink, code: u16, reason: &str) -> Result<(), axum::Error> {
    let frame = CloseFrame {
        code,
        reason: reason.to_string().into(),
    };
    ws_tx.send(Message::Close(Some(frame))).await
}
