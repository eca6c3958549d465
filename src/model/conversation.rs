//! Conversation summaries

use crate::{
    merge::Identified,
    model::message::{place_message, Message, Placement},
    model::User,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A conversation as shown in the conversation list.
///
/// `messages` holds the few most recent messages the server embeds in the
/// summary, newest first, plus anything pushed in real time since.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Conversation id
    pub id: String,
    /// Group conversation flag
    #[serde(default)]
    pub is_group: bool,
    /// The peer, for one-to-one conversations
    #[serde(default)]
    pub user: Option<User>,
    /// Group title
    #[serde(default)]
    pub group_name: Option<String>,
    /// Member user ids, including the local user
    #[serde(default)]
    pub members: Vec<String>,
    /// Recent messages, newest first
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Content of the newest message
    #[serde(default)]
    pub last_message_content: Option<String>,
    /// Creation time of the newest message; `None` until the first message
    #[serde(default)]
    pub last_message_created_at: Option<DateTime<Utc>>,
    /// Messages the local user has not seen
    #[serde(default)]
    pub total_unread_messages_count: u32,
}

impl Conversation {
    /// Create an empty one-to-one conversation
    pub fn new(id: impl Into<String>, user: Option<User>, members: Vec<String>) -> Self {
        Self {
            id: id.into(),
            is_group: false,
            user,
            group_name: None,
            members,
            messages: Vec::new(),
            last_message_content: None,
            last_message_created_at: None,
            total_unread_messages_count: 0,
        }
    }

    /// Name shown in the list and matched by search
    pub fn display_name(&self) -> Option<&str> {
        self.user
            .as_ref()
            .map(|u| u.name.as_str())
            .or(self.group_name.as_deref())
    }

    /// Whether the conversation has any message yet
    pub fn has_activity(&self) -> bool {
        self.last_message_created_at.is_some()
    }

    /// Whether the member set equals `member_ids`
    pub fn has_members(&self, member_ids: &BTreeSet<String>) -> bool {
        let members: BTreeSet<&str> = self.members.iter().map(String::as_str).collect();
        members.len() == member_ids.len() && member_ids.iter().all(|id| members.contains(id.as_str()))
    }

    /// Put a message into the embedded list and refresh the last-message fields
    pub fn place_message(&mut self, message: Message) -> Placement {
        let placement = place_message(&mut self.messages, message);
        self.sync_last_message();
        placement
    }

    /// Add `user_id` to `seen_by` of every embedded message. Returns how many changed.
    pub fn mark_seen_by(&mut self, user_id: &str) -> usize {
        self.messages
            .iter_mut()
            .map(|m| m.mark_seen_by(user_id))
            .filter(|changed| *changed)
            .count()
    }

    /// Drop the unread badge
    pub fn clear_unread(&mut self) {
        self.total_unread_messages_count = 0;
    }

    /// Copy the newest embedded message into the last-message fields
    pub fn sync_last_message(&mut self) {
        if let Some(newest) = self.messages.first() {
            self.last_message_content = Some(newest.content.clone());
            self.last_message_created_at = Some(newest.created_at);
        }
    }

    /// Copy the newest message of an external newest-first list (the open
    /// timeline) into the last-message fields
    pub fn sync_last_message_from(&mut self, messages: &[Message]) {
        if let Some(newest) = messages.first() {
            self.last_message_content = Some(newest.content.clone());
            self.last_message_created_at = Some(newest.created_at);
        }
    }
}

impl Identified for Conversation {
    fn id(&self) -> &str {
        &self.id
    }
}
