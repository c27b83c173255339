// Repository trait abstractions for database operations
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Comment, Community, Post, Session, TargetKind, User, VoteTally, VoteValue};
use crate::models::community::MemberResponse;
use crate::pagination::{KeysetPage, OffsetParams};
use crate::Result;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the username or email is taken (case-insensitive)
    async fn create_user(&self, user: &User) -> Result<User>;
    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>>;
    /// Case-insensitive match on username or email
    async fn get_user_by_login(&self, login: &str) -> Result<Option<User>>;
    async fn get_karma(&self, user_id: Uuid) -> Result<i64>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create_session(&self, session: &Session) -> Result<Session>;
    async fn get_session_by_token_hash(&self, refresh_token_hash: &str) -> Result<Option<Session>>;
    /// Swap the stored refresh hash, only if `current_hash` still matches.
    /// Returns false when another request rotated or revoked it first.
    async fn rotate_refresh_token(
        &self,
        session_id: Uuid,
        current_hash: &str,
        new_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool>;
    async fn revoke_session(&self, session_id: Uuid) -> Result<()>;
    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64>;
}

#[async_trait]
pub trait CommunityRepository: Send + Sync {
    /// Inserts the community and the creator's membership together
    async fn create_community(&self, community: &Community) -> Result<Community>;
    async fn get_community_by_name(&self, name: &str) -> Result<Option<Community>>;
    async fn list_communities(&self, params: &OffsetParams) -> Result<(Vec<Community>, i64)>;
    /// Fails with `Conflict` when already a member; increments member_count
    async fn add_member(&self, community_id: Uuid, user_id: Uuid) -> Result<Community>;
    /// Fails with `NotFound` when not a member; decrements member_count
    async fn remove_member(&self, community_id: Uuid, user_id: Uuid) -> Result<Community>;
    async fn is_member(&self, community_id: Uuid, user_id: Uuid) -> Result<bool>;
    async fn list_members(&self, community_id: Uuid, params: &OffsetParams) -> Result<(Vec<MemberResponse>, i64)>;
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create_post(&self, post: &Post) -> Result<Post>;
    /// Soft-deleted posts are not returned
    async fn get_post_by_id(&self, id: Uuid) -> Result<Option<Post>>;
    /// Returns up to `page.fetch_limit()` live posts past the cursor
    async fn list_posts_in_community(&self, community_id: Uuid, page: &KeysetPage) -> Result<Vec<Post>>;
    async fn list_posts_by_author(&self, author_id: Uuid, page: &KeysetPage) -> Result<Vec<Post>>;
    async fn soft_delete_post(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Inserts the comment and increments the post's comment_count atomically
    async fn create_comment(&self, comment: &Comment) -> Result<Comment>;
    async fn get_comment_by_id(&self, id: Uuid) -> Result<Option<Comment>>;
    async fn list_comments_for_post(&self, post_id: Uuid, page: &KeysetPage) -> Result<Vec<Comment>>;
    /// Soft-deletes the comment and decrements the post's comment_count atomically
    async fn soft_delete_comment(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait VoteRepository: Send + Sync {
    /// Set (Some) or clear (None) the voter's vote on a live target, then
    /// recompute and store the target's score from the vote rows, all in one
    /// transaction. Fails with `NotFound` if the target is missing or deleted.
    async fn apply_vote(
        &self,
        voter_id: Uuid,
        kind: TargetKind,
        target_id: Uuid,
        value: Option<VoteValue>,
    ) -> Result<VoteTally>;
    /// The voter's current votes on the given targets; absent means no vote
    async fn get_user_votes(
        &self,
        voter_id: Uuid,
        kind: TargetKind,
        target_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, VoteValue>>;
}
