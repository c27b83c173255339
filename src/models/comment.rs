use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub author_username: String, // Joined from users
    pub parent_id: Option<Uuid>, // None for top-level comments
    pub body: String,
    pub score: i64,
    pub upvotes: i64,
    pub downvotes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommentRequest {
    pub body: String,
    pub parent_id: Option<Uuid>, // Reply to another comment
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub parent_id: Option<Uuid>,
    pub body: String,
    pub score: i64,
    pub upvotes: i64,
    pub downvotes: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub my_vote: Option<i16>,
    pub created_at: DateTime<Utc>,
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            post_id: comment.post_id,
            author_id: comment.author_id,
            author_username: comment.author_username,
            parent_id: comment.parent_id,
            body: comment.body,
            score: comment.score,
            upvotes: comment.upvotes,
            downvotes: comment.downvotes,
            my_vote: None,
            created_at: comment.created_at,
        }
    }
}
