//! Real-time message synchronization
//!
//! This module reconciles asynchronous server events and local sends with
//! the [`ConversationStore`]:
//! - new messages (own echoes never count as unread)
//! - seen receipts, pushed or confirmed by the local user
//! - optimistic sends, confirmed in place or marked failed for retry
//! - typing indicators and list refetch requests
//!
//! Events are applied one at a time in delivery order, so mutations within a
//! conversation never interleave.

use crate::{
    api::MessageApi,
    events::RealtimeEvent,
    model::{Attachment, CreateMessageInput, Message, Typing},
    store::ConversationStore,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// A message the local user is about to send
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDraft {
    /// Target conversation
    pub conversation_id: String,
    /// Text body
    pub content: String,
    /// Already uploaded attachments
    pub attachments: Vec<Attachment>,
}

impl MessageDraft {
    /// A text-only draft
    pub fn text(conversation_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            content: content.into(),
            attachments: Vec::new(),
        }
    }
}

/// Applies real-time events and local sends to a [`ConversationStore`]
pub struct MessageSyncEngine {
    store: Arc<ConversationStore>,
    api: Arc<dyn MessageApi>,
}

impl MessageSyncEngine {
    /// Create an engine over `store`
    pub fn new(store: Arc<ConversationStore>, api: Arc<dyn MessageApi>) -> Self {
        Self { store, api }
    }

    /// The store this engine writes to
    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    /// Apply one real-time event
    pub async fn handle_event(&self, event: RealtimeEvent) {
        debug!("Handling {} event", event.name());
        match event {
            RealtimeEvent::Message(message) => self.message_received(message).await,
            RealtimeEvent::MessageSeen(receipt) => {
                self.message_seen(&receipt.conversation_id, &receipt.author_id).await;
            }
            RealtimeEvent::Typing(typing) => self.typing(typing).await,
            RealtimeEvent::ListRefetch => {
                let outcome = self.store.load_page(true).await;
                debug!("List refetch finished: {:?}", outcome);
            }
        }
    }

    /// Apply events from the real-time channel until it closes
    pub async fn run(&self, mut events: mpsc::Receiver<RealtimeEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
        info!("Real-time channel closed");
    }

    /// A message arrived from the server.
    ///
    /// It is prepended to the open timeline when it belongs there and put
    /// into its list entry, bumping the unread badge unless the local user
    /// wrote it.
    pub async fn message_received(&self, message: Message) {
        let own = message.author_id == self.store.local_user_id();
        let id = message.id.clone();
        let applied = self.store.apply_message(message, !own).await;
        debug!("Received message {}: {:?}", id, applied);
    }

    /// A member saw a conversation. Idempotent; the unread badge is untouched.
    pub async fn message_seen(&self, conversation_id: &str, author_id: &str) -> usize {
        let changed = self.store.apply_seen(conversation_id, author_id).await;
        debug!(
            "{} saw conversation {} ({} messages updated)",
            author_id, conversation_id, changed
        );
        changed
    }

    /// Tell the server the local user saw `conversation_id`, then clear the
    /// badge and mark every loaded message seen by the receipt's author.
    pub async fn mark_seen(&self, conversation_id: &str) -> bool {
        match self.api.mark_seen(conversation_id).await {
            Ok(receipt) => {
                self.store.apply_seen_confirmation(&receipt).await;
                info!("Marked conversation {} seen", conversation_id);
                true
            }
            Err(e) => {
                warn!("Failed to mark conversation {} seen: {}", conversation_id, e);
                self.store.set_seen_error(e.to_string()).await;
                false
            }
        }
    }

    /// Keyboard activity from a peer
    pub async fn typing(&self, typing: Typing) {
        if typing.author_id == self.store.local_user_id() {
            return;
        }
        self.store.set_typing(typing).await;
    }

    /// Show a local echo right away, before the server has seen it
    pub async fn message_send_optimistic(&self, message: Message) {
        let applied = self.store.apply_message(message, false).await;
        debug!("Optimistic message applied: {:?}", applied);
    }

    /// Swap a local echo for the server-confirmed message at the same index.
    ///
    /// A confirmation with no local echo left is inserted rather than
    /// dropped.
    pub async fn message_send_confirmed(&self, message: Message) {
        let temp_id = message.temp_message_id.clone().unwrap_or_default();
        let id = message.id.clone();
        let applied = self.store.apply_message(message, false).await;
        if applied.inserted_anywhere() {
            let violation = crate::Error::StateInvariant(format!(
                "no local echo {} for confirmed message {}",
                temp_id, id
            ));
            warn!("{}; inserted instead", violation);
        }
    }

    /// Send a draft: optimistic echo, server call, then confirmation.
    ///
    /// Returns the confirmed message. On failure the echo stays visible,
    /// marked failed, and can be passed to [`retry_send`](Self::retry_send).
    pub async fn send_message(&self, draft: MessageDraft) -> Option<Message> {
        let echo = Message::optimistic(
            draft.conversation_id,
            self.store.local_user_id(),
            draft.content,
            draft.attachments,
        );
        self.message_send_optimistic(echo.clone()).await;
        self.deliver(echo).await
    }

    /// Send a failed local echo again
    pub async fn retry_send(&self, conversation_id: &str, temp_id: &str) -> Option<Message> {
        let Some(echo) = self.store.mark_resending(conversation_id, temp_id).await else {
            warn!("No local echo {} to retry in {}", temp_id, conversation_id);
            return None;
        };
        info!("Retrying message {}", temp_id);
        self.deliver(echo).await
    }

    async fn deliver(&self, echo: Message) -> Option<Message> {
        let input = CreateMessageInput {
            content: echo.content.clone(),
            author_id: echo.author_id.clone(),
            conversation_id: echo.conversation_id.clone(),
            members: self.store.members_of(&echo.conversation_id).await,
            file_url: echo.file_url.clone(),
            temp_message_id: echo.id.clone(),
        };

        match self.api.send_message(&input).await {
            Ok(mut confirmed) => {
                if confirmed.temp_message_id.is_none() {
                    confirmed.temp_message_id = Some(echo.id.clone());
                }
                info!("Message {} confirmed as {}", echo.id, confirmed.id);
                self.message_send_confirmed(confirmed.clone()).await;
                Some(confirmed)
            }
            Err(e) => {
                warn!("Failed to send message {}: {}", echo.id, e);
                self.store
                    .mark_send_failed(&echo.conversation_id, &echo.id, e.to_string())
                    .await;
                None
            }
        }
    }
}
