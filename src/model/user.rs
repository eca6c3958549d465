//! Peer profile summary

use serde::{Deserialize, Serialize};

/// Public profile of another user, as embedded in conversations and posts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// User id
    pub id: String,
    /// Unique handle
    pub username: String,
    /// Display name
    pub name: String,
    /// Avatar URL
    #[serde(default)]
    pub profile_picture: Option<String>,
}

impl User {
    /// Create a user with no profile picture
    pub fn new(id: impl Into<String>, username: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            name: name.into(),
            profile_picture: None,
        }
    }
}
