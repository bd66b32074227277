//! Comment models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{models::UserProfile, validation};

/// Comment as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: i64,
    pub card_id: i64,
    pub user_id: i64,
    pub content: String,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub author: UserProfile,
}

/// Validated comment ready for insertion
#[derive(Debug, Clone, PartialEq)]
pub struct NewComment {
    pub card_id: i64,
    pub user_id: i64,
    pub content: String,
    pub images: Vec<String>,
}

/// Request for comment creation
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub images: Vec<String>,
}

impl CreateCommentRequest {
    pub fn into_new_comment(self, card_id: i64, user_id: i64) -> Result<NewComment, String> {
        let content = self.content.trim().to_string();

        validation::validate_comment(&content, &self.images)?;

        Ok(NewComment {
            card_id,
            user_id,
            content,
            images: self.images,
        })
    }
}
