//! Per-event handlers: persistence, relay, and receipts.
//!
//! Handlers return the event to write back to the originating connection,
//! if any. Everything aimed at other connections goes through the hub.

use std::future::Future;
use std::time::Duration;

use tokio::time;

use crate::error::StoreError;
use crate::gateway::events::{
    NotificationPayload, PrivateMessagePayload, ReadReceipt, ReadReceiptPayload,
    SendMessagePayload, ServerEvent, TypingBroadcast, TypingEnded, TypingPayload,
};
use crate::gateway::fanout::{Recipients, RoomId};
use crate::gateway::session::ConnectionSession;
use crate::models::message::{MessageDraft, MessageTarget};
use crate::AppState;

/// Upper bound on any single store call. An elapsed timer is the same
/// failure class as a store error.
const STORE_CALL_TIMEOUT: Duration = Duration::from_secs(5);

async fn with_timeout<T, F>(fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match time::timeout(STORE_CALL_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout),
    }
}

/// Handles `message:send`: persist to the community, then fan `message:new`
/// out to the room, sender included. A store failure is reported to the
/// sender alone and nothing is broadcast.
pub async fn message_send(
    state: &AppState,
    session: &ConnectionSession,
    payload: SendMessagePayload,
) -> Option<ServerEvent> {
    let draft = MessageDraft {
        target: MessageTarget::Community {
            community: payload.community_id.clone(),
        },
        content: payload.content,
        kind: payload.kind,
    };

    match with_timeout(state.messages.create(&session.identity, draft)).await {
        Ok(message) => {
            state.broadcast.dispatch(
                Recipients::Room(RoomId::Community(payload.community_id)),
                ServerEvent::MessageNew(message),
            );
            None
        }
        Err(err) => {
            tracing::warn!(
                %err,
                user_id = %session.identity.user_id,
                community_id = %payload.community_id,
                "community message rejected"
            );
            Some(ServerEvent::error(err.to_string()))
        }
    }
}

/// Handles `message:private`: persist, deliver `message:private:new` to the
/// receiver's personal room, and hand `message:private:sent` back to the
/// originating connection only. The sender's other devices see neither.
pub async fn message_private(
    state: &AppState,
    session: &ConnectionSession,
    payload: PrivateMessagePayload,
) -> Option<ServerEvent> {
    let draft = MessageDraft {
        target: MessageTarget::Direct {
            receiver: payload.receiver_id.clone(),
        },
        content: payload.content,
        kind: payload.kind,
    };

    match with_timeout(state.messages.create(&session.identity, draft)).await {
        Ok(message) => {
            state.broadcast.dispatch(
                Recipients::Room(RoomId::User(payload.receiver_id)),
                ServerEvent::MessagePrivateNew(message.clone()),
            );
            Some(ServerEvent::MessagePrivateSent(message))
        }
        Err(err) => {
            tracing::warn!(
                %err,
                user_id = %session.identity.user_id,
                receiver_id = %payload.receiver_id,
                "private message rejected"
            );
            Some(ServerEvent::error(err.to_string()))
        }
    }
}

/// Handles `typing:start` and `typing:stop`. Ephemeral relay, never
/// persisted. Community indicators go to the room minus the typer's own
/// connection; direct indicators go to the receiver's personal room. A
/// payload with no scope is dropped.
pub fn typing(
    state: &AppState,
    session: &ConnectionSession,
    payload: TypingPayload,
    started: bool,
) {
    let recipients = if let Some(community_id) = payload.community_id {
        Recipients::RoomExcept(
            RoomId::Community(community_id),
            session.connection_id.clone(),
        )
    } else if let Some(receiver_id) = payload.receiver_id {
        Recipients::Room(RoomId::User(receiver_id))
    } else {
        return;
    };

    let event = if started {
        ServerEvent::TypingStart(TypingBroadcast {
            user_id: session.identity.user_id.clone(),
            user_name: session.identity.name.clone(),
        })
    } else {
        ServerEvent::TypingStop(TypingEnded {
            user_id: session.identity.user_id.clone(),
        })
    };

    state.broadcast.dispatch(recipients, event);
}

/// Handles `message:read`, a best-effort receipt. On success the original
/// sender's personal room hears `message:read`; on failure the reader hears
/// nothing.
pub async fn message_read(
    state: &AppState,
    session: &ConnectionSession,
    payload: ReadReceiptPayload,
) {
    match with_timeout(state.messages.mark_read(&payload.message_id)).await {
        Ok(message) => {
            state.broadcast.dispatch(
                Recipients::Room(RoomId::User(message.sender.id)),
                ServerEvent::MessageRead(ReadReceipt {
                    message_id: payload.message_id,
                    read_by: session.identity.user_id.clone(),
                }),
            );
        }
        Err(err) => {
            tracing::warn!(
                %err,
                message_id = %payload.message_id,
                read_by = %session.identity.user_id,
                "read receipt dropped"
            );
        }
    }
}

/// Handles `notification:send`, a pure relay into the target's personal
/// room. The REST layer owns notification persistence; the payload passes
/// through untouched.
pub fn notification_send(state: &AppState, payload: NotificationPayload) {
    state.broadcast.dispatch(
        Recipients::Room(RoomId::User(payload.user_id)),
        ServerEvent::NotificationNew(payload.notification),
    );
}
