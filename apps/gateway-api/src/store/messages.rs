//! Message store boundary and the in-memory implementation.
//!
//! The gateway never assumes anything about the backing document store
//! beyond this trait. [`MemoryMessageStore`] keeps messages in insertion
//! order, which is ascending creation time, so listing needs no sort.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use alumnet_common::id::{mint, prefix};

use crate::auth::identity::Identity;
use crate::error::StoreError;
use crate::models::message::{MessageDraft, StoredMessage};

/// Window selector for history reads.
#[derive(Debug, Clone, Copy)]
pub struct PageParams {
    pub offset: u64,
    pub limit: u64,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a draft, stamping it with an id, the sender's display
    /// fields, and the creation time.
    async fn create(
        &self,
        sender: &Identity,
        draft: MessageDraft,
    ) -> Result<StoredMessage, StoreError>;

    /// Mark a message read, recording when. `NotFound` if the id is unknown.
    async fn mark_read(&self, message_id: &str) -> Result<StoredMessage, StoreError>;

    async fn find_by_id(&self, message_id: &str) -> Result<Option<StoredMessage>, StoreError>;

    /// A community's history, ascending by creation time.
    async fn list_community(
        &self,
        community_id: &str,
        page: PageParams,
    ) -> Result<Vec<StoredMessage>, StoreError>;

    /// Both directions of a private conversation, ascending by creation time.
    async fn list_private(
        &self,
        user_a: &str,
        user_b: &str,
        page: PageParams,
    ) -> Result<Vec<StoredMessage>, StoreError>;
}

/// In-memory store used in development and tests.
#[derive(Default)]
pub struct MemoryMessageStore {
    messages: RwLock<Vec<StoredMessage>>,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn page(items: impl Iterator<Item = StoredMessage>, page: PageParams) -> Vec<StoredMessage> {
        items
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect()
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn create(
        &self,
        sender: &Identity,
        draft: MessageDraft,
    ) -> Result<StoredMessage, StoreError> {
        let content = draft.content.trim();
        if content.is_empty() {
            return Err(StoreError::Rejected("Message content is required".into()));
        }

        let message = StoredMessage {
            id: mint(prefix::MESSAGE),
            sender: sender.into(),
            is_private: draft.target.is_direct(),
            target: draft.target,
            content: content.to_string(),
            kind: draft.kind,
            read: false,
            read_at: None,
            created_at: Utc::now(),
        };

        self.messages.write().push(message.clone());
        Ok(message)
    }

    async fn mark_read(&self, message_id: &str) -> Result<StoredMessage, StoreError> {
        let mut messages = self.messages.write();
        let message = messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or(StoreError::NotFound)?;

        message.read = true;
        message.read_at = Some(Utc::now());
        Ok(message.clone())
    }

    async fn find_by_id(&self, message_id: &str) -> Result<Option<StoredMessage>, StoreError> {
        Ok(self
            .messages
            .read()
            .iter()
            .find(|m| m.id == message_id)
            .cloned())
    }

    async fn list_community(
        &self,
        community_id: &str,
        page: PageParams,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        let messages = self.messages.read();
        let matching = messages
            .iter()
            .filter(|m| m.target.community_id() == Some(community_id))
            .cloned();
        Ok(Self::page(matching, page))
    }

    async fn list_private(
        &self,
        user_a: &str,
        user_b: &str,
        page: PageParams,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        let messages = self.messages.read();
        let matching = messages
            .iter()
            .filter(|m| {
                m.is_private
                    && ((m.sender.id == user_a && m.target.receiver_id() == Some(user_b))
                        || (m.sender.id == user_b && m.target.receiver_id() == Some(user_a)))
            })
            .cloned();
        Ok(Self::page(matching, page))
    }
}
