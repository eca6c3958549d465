//! Typing indicator

use serde::{Deserialize, Serialize};

/// A peer's keyboard activity in a conversation.
///
/// Held in a single slot by the store: a newer event overwrites it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Typing {
    /// Conversation the peer is typing in
    pub conversation_id: String,
    /// Typing peer
    pub author_id: String,
    /// `false` once the peer stops typing
    pub typing: bool,
    /// Whether the conversation is a group
    #[serde(default)]
    pub is_group: bool,
}
