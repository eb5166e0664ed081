//! User directory boundary.
//!
//! The platform's account service owns user records; the gateway only reads
//! them to resolve identities. Production deployments plug a real adapter
//! in behind [`UserDirectory`]; tests and local runs use the in-memory map.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::StoreError;
use crate::models::user::UserProfile;

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError>;
}

/// In-memory directory used in development and tests.
#[derive(Default)]
pub struct MemoryUserDirectory {
    users: RwLock<HashMap<String, UserProfile>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, profile: UserProfile) {
        self.users.write().insert(profile.id.clone(), profile);
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_id(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.users.read().get(user_id).cloned())
    }
}
