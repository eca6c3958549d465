//! Chat messages and delivery status tracking

use crate::merge::Identified;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Client-side delivery status of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DeliveryStatus {
    /// Optimistic local echo, not yet confirmed by the server
    Sending,
    /// Confirmed by the server (every fetched or pushed message)
    #[default]
    Sent,
    /// Send failed; the local echo stays visible so it can be retried
    Failed,
}

/// Media kind of an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    /// Still image
    Photo,
    /// Video clip
    Video,
}

/// Uploaded media attached to a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Client asset id
    pub id: String,
    /// Uploaded URLs, one per quality level
    pub urls: Vec<String>,
    /// Media kind
    #[serde(rename = "type")]
    pub kind: AttachmentKind,
}

/// A chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Server id, or the temporary client id before confirmation
    pub id: String,
    /// Temporary client id this confirmed message replaces
    #[serde(default)]
    pub temp_message_id: Option<String>,
    /// Owning conversation
    pub conversation_id: String,
    /// Sender
    pub author_id: String,
    /// Text body
    pub content: String,
    /// Attachments
    #[serde(default)]
    pub file_url: Vec<Attachment>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Users who have seen the message; only ever grows
    #[serde(default)]
    pub seen_by: BTreeSet<String>,
    /// Local delivery state, never sent by the server
    #[serde(skip, default)]
    pub delivery_status: DeliveryStatus,
}

impl Message {
    /// Create a confirmed message
    pub fn new(
        id: impl Into<String>,
        conversation_id: impl Into<String>,
        author_id: impl Into<String>,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            temp_message_id: None,
            conversation_id: conversation_id.into(),
            author_id: author_id.into(),
            content: content.into(),
            file_url: Vec::new(),
            created_at,
            seen_by: BTreeSet::new(),
            delivery_status: DeliveryStatus::Sent,
        }
    }

    /// Create an optimistic local echo with a fresh temporary id
    pub fn optimistic(
        conversation_id: impl Into<String>,
        author_id: impl Into<String>,
        content: impl Into<String>,
        file_url: Vec<Attachment>,
    ) -> Self {
        let author_id = author_id.into();
        let mut seen_by = BTreeSet::new();
        seen_by.insert(author_id.clone());
        Self {
            id: format!("temp-{}", uuid::Uuid::new_v4()),
            temp_message_id: None,
            conversation_id: conversation_id.into(),
            author_id,
            content: content.into(),
            file_url,
            created_at: Utc::now(),
            seen_by,
            delivery_status: DeliveryStatus::Sending,
        }
    }

    /// Add `user_id` to `seen_by`. Returns `true` if it was not there yet.
    pub fn mark_seen_by(&mut self, user_id: &str) -> bool {
        if self.seen_by.contains(user_id) {
            return false;
        }
        self.seen_by.insert(user_id.to_string())
    }

    /// Whether `user_id` has seen this message
    pub fn is_seen_by(&self, user_id: &str) -> bool {
        self.seen_by.contains(user_id)
    }

    /// Whether this is an unconfirmed local echo
    pub fn is_pending(&self) -> bool {
        self.delivery_status == DeliveryStatus::Sending
    }

    /// Mark the local echo as failed
    pub fn mark_failed(&mut self) {
        self.delivery_status = DeliveryStatus::Failed;
    }

    /// Mark the local echo as sending again (retry)
    pub fn mark_sending(&mut self) {
        self.delivery_status = DeliveryStatus::Sending;
    }

    /// Short status indicator for the message bubble
    pub fn status_indicator(&self) -> &str {
        match self.delivery_status {
            DeliveryStatus::Sending => "↻",
            DeliveryStatus::Sent if self.seen_by.len() > 1 => "✓✓",
            DeliveryStatus::Sent => "✓",
            DeliveryStatus::Failed => "✗",
        }
    }
}

impl Identified for Message {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Where a message ended up in a newest-first list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Replaced the optimistic entry named by `temp_message_id`
    Reconciled(usize),
    /// Replaced an entry with the same id
    Replaced(usize),
    /// Inserted as the newest entry
    Inserted,
}

/// Put `message` into a newest-first list without creating a duplicate.
///
/// Matching by `temp_message_id` first means a confirmed message takes the
/// slot of its local echo; matching by id makes redelivery idempotent.
/// `seen_by` of a replaced entry is carried over.
pub(crate) fn place_message(messages: &mut Vec<Message>, mut message: Message) -> Placement {
    let reconciled = message
        .temp_message_id
        .as_deref()
        .and_then(|temp_id| messages.iter().position(|m| m.id == temp_id));
    let (index, placement) = match reconciled {
        Some(index) => (index, Placement::Reconciled(index)),
        None => match messages.iter().position(|m| m.id == message.id) {
            Some(index) => (index, Placement::Replaced(index)),
            None => {
                messages.insert(0, message);
                return Placement::Inserted;
            }
        },
    };
    let previous = &messages[index];
    message.seen_by.extend(previous.seen_by.iter().cloned());
    messages[index] = message;
    placement
}

/// Input for the message-send API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageInput {
    /// Text body
    pub content: String,
    /// Sender (local user)
    pub author_id: String,
    /// Target conversation
    pub conversation_id: String,
    /// Conversation member ids, for fan-out
    pub members: Vec<String>,
    /// Attachments, already uploaded
    pub file_url: Vec<Attachment>,
    /// Client id of the optimistic echo, returned on the confirmed message
    pub temp_message_id: String,
}

/// Result of a seen-receipt call or event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeenReceipt {
    /// Conversation whose messages were seen
    pub conversation_id: String,
    /// User who saw them
    pub author_id: String,
}
