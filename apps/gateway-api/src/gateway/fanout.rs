//! Broadcast hub for relaying events to connected sessions.
//!
//! One `tokio::sync::broadcast` channel serves the whole process. Every
//! connection task subscribes and filters payloads locally against its own
//! room membership. This holds as long as the gateway runs as a single
//! process; spreading connections over several processes would need a
//! shared pub/sub backplane in front of this hub.

use std::fmt;
use std::sync::Arc;

use tokio::sync::broadcast;

use super::events::ServerEvent;

/// Capacity of the broadcast channel. Slow consumers past this lag are
/// dropped from the stream and warned about, not blocked on.
const BROADCAST_CAPACITY: usize = 4096;

/// A named broadcast group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoomId {
    /// A community's shared chat room.
    Community(String),
    /// A user's personal room, used for events targeted at one person.
    User(String),
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomId::Community(id) => write!(f, "community:{id}"),
            RoomId::User(id) => write!(f, "user:{id}"),
        }
    }
}

/// Which connections a payload is meant for.
#[derive(Debug, Clone)]
pub enum Recipients {
    /// Every connected client.
    All,
    /// Every member of a room.
    Room(RoomId),
    /// Every member of a room except one connection. Used for typing
    /// indicators, which never echo back to their origin.
    RoomExcept(RoomId, String),
}

/// What the hub hands every session task: the event plus who it's for.
#[derive(Debug)]
pub struct Envelope {
    pub recipients: Recipients,
    pub event: ServerEvent,
}

/// The process-wide broadcast hub.
#[derive(Clone)]
pub struct BroadcastHub {
    tx: broadcast::Sender<Arc<Envelope>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Envelope>> {
        self.tx.subscribe()
    }

    /// Dispatch an event. A send error only means nobody is connected.
    pub fn dispatch(&self, recipients: Recipients, event: ServerEvent) {
        let _ = self.tx.send(Arc::new(Envelope { recipients, event }));
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_ids_render_with_their_prefix() {
        assert_eq!(RoomId::Community("com_1".into()).to_string(), "community:com_1");
        assert_eq!(RoomId::User("usr_1".into()).to_string(), "user:usr_1");
    }

    #[test]
    fn dispatch_without_subscribers_does_not_panic() {
        let hub = BroadcastHub::new();
        hub.dispatch(Recipients::All, ServerEvent::error("nobody listening"));
    }

    #[tokio::test]
    async fn subscribers_receive_dispatched_payloads() {
        let hub = BroadcastHub::new();
        let mut rx = hub.subscribe();

        hub.dispatch(
            Recipients::Room(RoomId::Community("com_1".into())),
            ServerEvent::error("hello"),
        );

        let payload = rx.recv().await.unwrap();
        assert!(matches!(
            &payload.recipients,
            Recipients::Room(RoomId::Community(id)) if id == "com_1"
        ));
        assert!(matches!(&payload.event, ServerEvent::MessageError(report) if report.message == "hello"));
    }

    #[tokio::test]
    async fn subscribers_only_see_payloads_after_subscribing() {
        let hub = BroadcastHub::new();
        hub.dispatch(Recipients::All, ServerEvent::error("before"));

        let mut rx = hub.subscribe();
        hub.dispatch(Recipients::All, ServerEvent::error("after"));

        let payload = rx.recv().await.unwrap();
        assert!(matches!(&payload.event, ServerEvent::MessageError(report) if report.message == "after"));
    }
}
