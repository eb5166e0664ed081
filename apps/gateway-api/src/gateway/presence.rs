//! In-memory presence tracking.
//!
//! One entry per online user, keyed by user id. A second connection for the
//! same user overwrites the first entry, so the map never counts a user
//! twice. The registry also owns the `users:online` announcements that go
//! with every roster change. Entries are process-local; a multi-process
//! deployment would move this registry into a shared store.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::Serialize;

use crate::auth::identity::Identity;

use super::events::ServerEvent;
use super::fanout::{BroadcastHub, Recipients};

/// One currently-connected user, as broadcast in `users:online`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEntry {
    pub user_id: String,
    pub connection_id: String,
    pub name: String,
    pub avatar: String,
}

impl PresenceEntry {
    pub fn new(identity: &Identity, connection_id: &str) -> Self {
        Self {
            user_id: identity.user_id.clone(),
            connection_id: connection_id.to_string(),
            name: identity.name.clone(),
            avatar: identity.avatar.clone(),
        }
    }
}

/// Thread-safe presence registry shared by all connection tasks.
///
/// Roster changes and the broadcasts that announce them happen under one
/// write lock, so announcements go out in mutation order, each carrying
/// the roster as of its own mutation.
pub struct PresenceRegistry {
    entries: RwLock<HashMap<String, PresenceEntry>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or overwrite the entry for a user and announce the updated
    /// roster to every connection.
    pub fn admit(&self, entry: PresenceEntry, hub: &BroadcastHub) {
        let mut entries = self.entries.write();
        entries.insert(entry.user_id.clone(), entry);
        hub.dispatch(
            Recipients::All,
            ServerEvent::UsersOnline(Self::roster(&entries)),
        );
    }

    /// Remove a user's entry and announce the shrunk roster, but only if
    /// the entry still belongs to the given connection. A connection that
    /// was superseded by a newer one must not evict its successor, and
    /// nothing is announced for it. Returns whether an entry was removed.
    pub fn retire(&self, user_id: &str, connection_id: &str, hub: &BroadcastHub) -> bool {
        let mut entries = self.entries.write();
        let owned = entries
            .get(user_id)
            .is_some_and(|entry| entry.connection_id == connection_id);
        if owned {
            entries.remove(user_id);
            hub.dispatch(
                Recipients::All,
                ServerEvent::UsersOnline(Self::roster(&entries)),
            );
        }
        owned
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.entries.read().contains_key(user_id)
    }

    /// Snapshot of everyone currently online.
    pub fn snapshot(&self) -> Vec<PresenceEntry> {
        Self::roster(&self.entries.read())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn roster(entries: &HashMap<String, PresenceEntry>) -> Vec<PresenceEntry> {
        entries.values().cloned().collect()
    }
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::broadcast;
    use tokio::sync::broadcast::error::TryRecvError;

    use super::*;
    use crate::gateway::fanout::Envelope;
    use crate::models::user::Role;

    fn identity(user_id: &str, name: &str) -> Identity {
        Identity {
            user_id: user_id.into(),
            name: name.into(),
            avatar: String::new(),
            role: Role::Student,
        }
    }

    fn entry(user_id: &str, name: &str, connection_id: &str) -> PresenceEntry {
        PresenceEntry::new(&identity(user_id, name), connection_id)
    }

    /// Pull the next broadcast off the hub and unwrap its roster.
    fn next_roster(rx: &mut broadcast::Receiver<Arc<Envelope>>) -> Vec<PresenceEntry> {
        let payload = rx.try_recv().expect("expected a roster broadcast");
        assert!(matches!(payload.recipients, Recipients::All));
        match &payload.event {
            ServerEvent::UsersOnline(users) => users.clone(),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn admit_announces_the_updated_roster() {
        let registry = PresenceRegistry::new();
        let hub = BroadcastHub::new();
        let mut rx = hub.subscribe();

        registry.admit(entry("usr_1", "Asha", "conn_1"), &hub);
        let roster = next_roster(&mut rx);
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].user_id, "usr_1");

        registry.admit(entry("usr_2", "Ben", "conn_2"), &hub);
        assert_eq!(next_roster(&mut rx).len(), 2);
        assert!(registry.contains("usr_1"));
        assert!(registry.contains("usr_2"));
    }

    #[test]
    fn second_connection_overwrites_the_first() {
        let registry = PresenceRegistry::new();
        let hub = BroadcastHub::new();

        let asha = identity("usr_1", "Asha");
        registry.admit(PresenceEntry::new(&asha, "conn_1"), &hub);
        registry.admit(PresenceEntry::new(&asha, "conn_2"), &hub);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.snapshot()[0].connection_id, "conn_2");
    }

    #[test]
    fn retire_announces_only_for_the_owning_connection() {
        let registry = PresenceRegistry::new();
        let hub = BroadcastHub::new();
        registry.admit(entry("usr_1", "Asha", "conn_1"), &hub);

        let mut rx = hub.subscribe();
        assert!(!registry.retire("usr_1", "conn_0", &hub));
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
        assert!(registry.contains("usr_1"));

        assert!(registry.retire("usr_1", "conn_1", &hub));
        assert!(next_roster(&mut rx).is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn superseded_connection_cannot_evict_its_successor() {
        let registry = PresenceRegistry::new();
        let hub = BroadcastHub::new();
        let asha = identity("usr_1", "Asha");
        registry.admit(PresenceEntry::new(&asha, "conn_1"), &hub);
        registry.admit(PresenceEntry::new(&asha, "conn_2"), &hub);

        assert!(!registry.retire("usr_1", "conn_1", &hub));
        assert!(registry.contains("usr_1"));
        assert_eq!(registry.snapshot()[0].connection_id, "conn_2");

        assert!(registry.retire("usr_1", "conn_2", &hub));
        assert!(!registry.contains("usr_1"));
    }

    #[test]
    fn retire_unknown_user_is_a_no_op() {
        let registry = PresenceRegistry::new();
        let hub = BroadcastHub::new();
        let mut rx = hub.subscribe();

        assert!(!registry.retire("usr_9", "conn_9", &hub));
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn announcements_carry_the_roster_of_their_mutation() {
        let registry = PresenceRegistry::new();
        let hub = BroadcastHub::new();
        let mut rx = hub.subscribe();

        registry.admit(entry("usr_1", "Asha", "conn_1"), &hub);
        registry.retire("usr_1", "conn_1", &hub);
        registry.admit(entry("usr_1", "Asha", "conn_2"), &hub);

        assert_eq!(next_roster(&mut rx).len(), 1);
        assert!(next_roster(&mut rx).is_empty());
        let last = next_roster(&mut rx);
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].connection_id, "conn_2");
    }

    #[test]
    fn entries_serialize_with_camel_case_fields() {
        let entry = PresenceEntry::new(&identity("usr_1", "Asha"), "conn_1");
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["userId"], "usr_1");
        assert_eq!(value["connectionId"], "conn_1");
        assert_eq!(value["name"], "Asha");
    }
}
