//! Wire protocol: the event envelopes exchanged with clients.
//!
//! Every frame is JSON of the form `{"event": <name>, "data": <payload>}`.
//! The event names are the compatibility surface existing frontends are
//! built against and must not change.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::message::{MessageKind, StoredMessage};

use super::presence::PresenceEntry;

/// A frame received from a client.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// Handshake credential. Only meaningful as a connection's first frame.
    #[serde(rename = "auth")]
    Auth(AuthPayload),
    #[serde(rename = "community:join")]
    CommunityJoin(String),
    #[serde(rename = "community:leave")]
    CommunityLeave(String),
    #[serde(rename = "message:send")]
    MessageSend(SendMessagePayload),
    #[serde(rename = "message:private")]
    MessagePrivate(PrivateMessagePayload),
    #[serde(rename = "typing:start")]
    TypingStart(TypingPayload),
    #[serde(rename = "typing:stop")]
    TypingStop(TypingPayload),
    #[serde(rename = "message:read")]
    MessageRead(ReadReceiptPayload),
    #[serde(rename = "notification:send")]
    NotificationSend(NotificationPayload),
}

#[derive(Debug, Deserialize)]
pub struct AuthPayload {
    #[serde(default)]
    pub token: String,
}

/// `message:send` payload. A missing `content` is handed to the store as
/// empty and rejected there, so the sender still gets a `message:error`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    pub community_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateMessagePayload {
    pub receiver_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
}

/// Typing indicator scope. Exactly one of the two fields is expected;
/// `communityId` wins when both are present.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    #[serde(default)]
    pub community_id: Option<String>,
    #[serde(default)]
    pub receiver_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadReceiptPayload {
    pub message_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub user_id: String,
    pub notification: Value,
}

/// A frame sent to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "users:online")]
    UsersOnline(Vec<PresenceEntry>),
    #[serde(rename = "message:new")]
    MessageNew(StoredMessage),
    #[serde(rename = "message:private:new")]
    MessagePrivateNew(StoredMessage),
    #[serde(rename = "message:private:sent")]
    MessagePrivateSent(StoredMessage),
    #[serde(rename = "typing:start")]
    TypingStart(TypingBroadcast),
    #[serde(rename = "typing:stop")]
    TypingStop(TypingEnded),
    #[serde(rename = "message:read")]
    MessageRead(ReadReceipt),
    #[serde(rename = "message:error")]
    MessageError(ErrorReport),
    #[serde(rename = "notification:new")]
    NotificationNew(Value),
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::MessageError(ErrorReport {
            message: message.into(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingBroadcast {
    pub user_id: String,
    pub user_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingEnded {
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadReceipt {
    pub message_id: String,
    pub read_by: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub message: String,
}
