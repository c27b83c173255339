use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Community {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub creator_id: Uuid,
    pub member_count: i64,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommunityRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub creator_id: Uuid,
    pub member_count: i64,
    pub created_at: DateTime<Utc>,
    /// Only present for authenticated readers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_member: Option<bool>,
}

impl From<Community> for CommunityResponse {
    fn from(community: Community) -> Self {
        Self {
            id: community.id,
            name: community.name,
            description: community.description,
            creator_id: community.creator_id,
            member_count: community.member_count,
            created_at: community.created_at,
            is_member: None,
        }
    }
}

/// A membership row joined with the member's username
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MemberResponse {
    pub user_id: Uuid,
    pub username: String,
    pub joined_at: DateTime<Utc>,
}
