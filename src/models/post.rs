use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub community_id: Uuid,
    pub community_name: String, // Joined from communities
    pub author_id: Uuid,
    pub author_username: String, // Joined from users
    pub title: String,
    pub body: String,
    pub score: i64, // Recomputed from votes on every vote write
    pub upvotes: i64,
    pub downvotes: i64,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub community_id: Uuid,
    pub community_name: String,
    pub author_id: Uuid,
    pub author_username: String,
    pub title: String,
    pub body: String,
    pub score: i64,
    pub upvotes: i64,
    pub downvotes: i64,
    pub comment_count: i64,
    /// The reader's own vote: 1, -1 or 0. Absent for guests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub my_vote: Option<i16>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            community_id: post.community_id,
            community_name: post.community_name,
            author_id: post.author_id,
            author_username: post.author_username,
            title: post.title,
            body: post.body,
            score: post.score,
            upvotes: post.upvotes,
            downvotes: post.downvotes,
            comment_count: post.comment_count,
            my_vote: None,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}
