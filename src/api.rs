//! Collaborator interfaces
//!
//! The sync core never talks to the network itself. The host application
//! implements these traits on top of its GraphQL client; every method
//! resolves to the decoded payload or an [`Error`](crate::Error):
//! - [`Error::Network`](crate::Error::Network) for transport failures
//! - [`Error::Graph`](crate::Error::Graph) for server-reported errors
//! - [`Error::Conflict`](crate::Error::Conflict) for rejected creations

use crate::{
    gate::PageRequest,
    model::{Conversation, CreateMessageInput, Message, Post, SeenReceipt},
    Result,
};
use async_trait::async_trait;
use std::collections::BTreeSet;

/// Conversation queries and creation
#[async_trait]
pub trait ConversationApi: Send + Sync {
    /// One page of conversation summaries, in server order
    async fn fetch_conversations(&self, page: PageRequest) -> Result<Vec<Conversation>>;

    /// A single conversation by id
    async fn fetch_conversation(&self, id: &str) -> Result<Conversation>;

    /// One page of a conversation's history, oldest first within the page.
    /// Offset 0 is the newest page.
    async fn fetch_messages(&self, conversation_id: &str, page: PageRequest) -> Result<Vec<Message>>;

    /// Create a conversation with the given members
    async fn create_conversation(&self, member_ids: &BTreeSet<String>) -> Result<Conversation>;
}

/// Message sending and seen receipts
#[async_trait]
pub trait MessageApi: Send + Sync {
    /// Send a message; the result echoes `input.temp_message_id`
    async fn send_message(&self, input: &CreateMessageInput) -> Result<Message>;

    /// Mark every message of a conversation seen by the session user
    async fn mark_seen(&self, conversation_id: &str) -> Result<SeenReceipt>;
}

/// Home feed
#[async_trait]
pub trait FeedApi: Send + Sync {
    /// One page of feed posts, in server order
    async fn fetch_feed(&self, page: PageRequest) -> Result<Vec<Post>>;
}
