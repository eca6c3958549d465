//! Client data model
//!
//! Shapes mirror the server's GraphQL payloads (camelCase on the wire):
//! - `user` - peer profile summary
//! - `message` - chat messages, attachments and delivery status
//! - `conversation` - conversation summaries with embedded recent messages
//! - `typing` - transient typing indicator
//! - `post` - home feed posts

pub mod conversation;
pub mod message;
pub mod post;
pub mod typing;
pub mod user;

pub use conversation::Conversation;
pub use message::{Attachment, AttachmentKind, CreateMessageInput, DeliveryStatus, Message, SeenReceipt};
pub use post::Post;
pub use typing::Typing;
pub use user::User;
