//! Real-time channel events
//!
//! The socket delivers named events with a JSON payload. Ordering is only
//! guaranteed within one emitting source, so every event is self-contained.

use crate::{
    model::{Message, SeenReceipt, Typing},
    Error, Result,
};
use serde_json::Value;

/// Event name for a new message
pub const MESSAGE: &str = "conversation_message";
/// Event name for a seen receipt
pub const MESSAGE_SEEN: &str = "conversation_message_seen";
/// Event name for keyboard activity
pub const TYPING: &str = "conversation_user_keyboard_pressing";
/// Event name asking the client to reload the conversation list
pub const LIST_REFETCH: &str = "conversation_list_refetch";

/// A decoded real-time event
#[derive(Debug, Clone, PartialEq)]
pub enum RealtimeEvent {
    /// A message was posted to a conversation
    Message(Message),
    /// A member saw a conversation's messages
    MessageSeen(SeenReceipt),
    /// A member started or stopped typing
    Typing(Typing),
    /// The conversation list changed server-side
    ListRefetch,
}

impl RealtimeEvent {
    /// Decode a named event and its payload
    pub fn decode(name: &str, payload: Value) -> Result<Self> {
        let event = match name {
            MESSAGE => RealtimeEvent::Message(serde_json::from_value(payload)?),
            MESSAGE_SEEN => RealtimeEvent::MessageSeen(serde_json::from_value(payload)?),
            TYPING => RealtimeEvent::Typing(serde_json::from_value(payload)?),
            LIST_REFETCH => RealtimeEvent::ListRefetch,
            other => return Err(Error::UnknownEvent(other.to_string())),
        };
        Ok(event)
    }

    /// Wire name of this event
    pub fn name(&self) -> &'static str {
        match self {
            RealtimeEvent::Message(_) => MESSAGE,
            RealtimeEvent::MessageSeen(_) => MESSAGE_SEEN,
            RealtimeEvent::Typing(_) => TYPING,
            RealtimeEvent::ListRefetch => LIST_REFETCH,
        }
    }

    /// Conversation the event belongs to, if any
    pub fn conversation_id(&self) -> Option<&str> {
        match self {
            RealtimeEvent::Message(m) => Some(&m.conversation_id),
            RealtimeEvent::MessageSeen(r) => Some(&r.conversation_id),
            RealtimeEvent::Typing(t) => Some(&t.conversation_id),
            RealtimeEvent::ListRefetch => None,
        }
    }
}
