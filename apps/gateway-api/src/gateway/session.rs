//! Per-connection session state.

use std::collections::HashSet;

use alumnet_common::id::{mint, prefix};

use crate::auth::identity::Identity;

use super::fanout::{Envelope, Recipients, RoomId};

/// State for one admitted connection.
///
/// Owned by the connection's task. Room membership only changes in response
/// to that connection's own frames, so none of this needs locking.
pub struct ConnectionSession {
    pub connection_id: String,
    pub identity: Identity,
    rooms: HashSet<RoomId>,
}

impl ConnectionSession {
    /// Tag a connection with its verified identity. Every session starts
    /// as a member of its user's personal room.
    pub fn new(identity: Identity) -> Self {
        let mut rooms = HashSet::new();
        rooms.insert(RoomId::User(identity.user_id.clone()));
        Self {
            connection_id: mint(prefix::CONNECTION),
            identity,
            rooms,
        }
    }

    pub fn join(&mut self, room: RoomId) {
        self.rooms.insert(room);
    }

    pub fn leave(&mut self, room: &RoomId) {
        self.rooms.remove(room);
    }

    pub fn is_member(&self, room: &RoomId) -> bool {
        self.rooms.contains(room)
    }

    /// Whether a hub payload should be written to this connection.
    pub fn should_receive(&self, payload: &Envelope) -> bool {
        match &payload.recipients {
            Recipients::All => true,
            Recipients::Room(room) => self.rooms.contains(room),
            Recipients::RoomExcept(room, excluded) => {
                self.rooms.contains(room) && *excluded != self.connection_id
            }
        }
    }
}
