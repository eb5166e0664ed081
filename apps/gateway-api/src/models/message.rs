use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::Role;

/// Content type of a message. Anything beyond plain text carries a URL in
/// `content`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
    File,
    Link,
}

/// Where a message goes. A message is addressed to exactly one of a
/// community room or a single user; the two cases cannot be mixed.
///
/// Serialized untagged so the stored document keeps a flat `community` or
/// `receiver` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageTarget {
    Community { community: String },
    Direct { receiver: String },
}

impl MessageTarget {
    pub fn is_direct(&self) -> bool {
        matches!(self, MessageTarget::Direct { .. })
    }

    pub fn community_id(&self) -> Option<&str> {
        match self {
            MessageTarget::Community { community } => Some(community),
            MessageTarget::Direct { .. } => None,
        }
    }

    pub fn receiver_id(&self) -> Option<&str> {
        match self {
            MessageTarget::Community { .. } => None,
            MessageTarget::Direct { receiver } => Some(receiver),
        }
    }
}

/// Sender display fields denormalized onto every stored message, so history
/// reads never need a second lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageSender {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub role: Role,
}

/// A message as handed to the store, before it has an id or timestamps.
#[derive(Debug, Clone)]
pub struct MessageDraft {
    pub target: MessageTarget,
    pub content: String,
    pub kind: MessageKind,
}

/// A persisted message. This is the exact shape clients see, both in
/// gateway events and in history responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    pub id: String,
    pub sender: MessageSender,
    #[serde(flatten)]
    pub target: MessageTarget,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub is_private: bool,
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender() -> MessageSender {
        MessageSender {
            id: "usr_1".into(),
            name: "Asha".into(),
            avatar: String::new(),
            role: Role::Alumni,
        }
    }

    #[test]
    fn community_message_keeps_flat_wire_shape() {
        let message = StoredMessage {
            id: "msg_1".into(),
            sender: sender(),
            target: MessageTarget::Community {
                community: "com_1".into(),
            },
            content: "hello".into(),
            kind: MessageKind::Text,
            is_private: false,
            read: false,
            read_at: None,
            created_at: Utc::now(),
        };

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["community"], "com_1");
        assert!(value.get("receiver").is_none());
        assert_eq!(value["type"], "text");
        assert_eq!(value["isPrivate"], false);
        assert!(value.get("readAt").is_none());
        assert!(value.get("createdAt").is_some());
    }

    #[test]
    fn direct_message_round_trips() {
        let message = StoredMessage {
            id: "msg_2".into(),
            sender: sender(),
            target: MessageTarget::Direct {
                receiver: "usr_2".into(),
            },
            content: "https://example.com/doc.pdf".into(),
            kind: MessageKind::File,
            is_private: true,
            read: true,
            read_at: Some(Utc::now()),
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&message).unwrap();
        let back: StoredMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.target.receiver_id(), Some("usr_2"));
        assert!(back.target.is_direct());
        assert_eq!(back.kind, MessageKind::File);
        assert!(back.read_at.is_some());
    }
}
