//! Home feed posts

use crate::{merge::Identified, model::User};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A feed post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Post id
    pub id: String,
    /// Caption text
    pub content: String,
    /// Author
    pub user: User,
    /// Media URLs
    #[serde(default)]
    pub file_url: Vec<String>,
    /// Number of likes
    #[serde(default)]
    pub like_count: u32,
    /// Number of comments
    #[serde(default)]
    pub comment_count: u32,
    /// Whether the local user liked the post
    #[serde(default)]
    pub is_liked: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Identified for Post {
    fn id(&self) -> &str {
        &self.id
    }
}
