// In-memory repository implementations for local development and tests.
// One lock guards every table so multi-row writes (vote + score, comment +
// comment_count) are atomic, the same guarantee a Postgres transaction gives.
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::repository::{
    CommentRepository, CommunityRepository, PostRepository, SessionRepository, UserRepository, VoteRepository,
};
use crate::models::community::MemberResponse;
use crate::models::{Comment, Community, Post, Session, TargetKind, User, Vote, VoteTally, VoteValue};
use crate::pagination::{select_keyset, KeysetPage, OffsetParams};
use crate::{AppError, Result};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    sessions: HashMap<Uuid, Session>,
    communities: HashMap<Uuid, Community>,
    memberships: HashMap<(Uuid, Uuid), DateTime<Utc>>, // (community_id, user_id) -> joined_at
    posts: HashMap<Uuid, Post>,
    comments: HashMap<Uuid, Comment>,
    votes: HashMap<(Uuid, TargetKind, Uuid), Vote>, // (voter_id, kind, target_id)
}

impl Tables {
    fn post_is_live(&self, post_id: Uuid) -> bool {
        self.posts.get(&post_id).map_or(false, |p| p.deleted_at.is_none())
    }

    // A comment under a deleted post is gone with it
    fn comment_is_live(&self, comment: &Comment) -> bool {
        comment.deleted_at.is_none() && self.post_is_live(comment.post_id)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn offset_slice<T: Clone>(rows: &[T], params: &OffsetParams) -> Vec<T> {
    rows.iter()
        .skip(params.offset as usize)
        .take(params.limit as usize)
        .cloned()
        .collect()
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create_user(&self, user: &User) -> Result<User> {
        let mut tables = self.tables.write().await;

        let username = user.username.to_lowercase();
        let email = user.email.to_lowercase();
        for existing in tables.users.values() {
            if existing.username.to_lowercase() == username {
                return Err(AppError::Conflict("Username is already taken".to_string()));
            }
            if existing.email.to_lowercase() == email {
                return Err(AppError::Conflict("Email is already registered".to_string()));
            }
        }

        tables.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).cloned())
    }

    async fn get_user_by_login(&self, login: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        let login = login.to_lowercase();
        Ok(tables
            .users
            .values()
            .find(|u| u.username.to_lowercase() == login || u.email.to_lowercase() == login)
            .cloned())
    }

    async fn get_karma(&self, user_id: Uuid) -> Result<i64> {
        let tables = self.tables.read().await;
        let post_karma: i64 = tables
            .posts
            .values()
            .filter(|p| p.author_id == user_id && p.deleted_at.is_none())
            .map(|p| p.score)
            .sum();
        let comment_karma: i64 = tables
            .comments
            .values()
            .filter(|c| c.author_id == user_id && tables.comment_is_live(c))
            .map(|c| c.score)
            .sum();
        Ok(post_karma + comment_karma)
    }
}

#[async_trait]
impl SessionRepository for InMemoryStore {
    async fn create_session(&self, session: &Session) -> Result<Session> {
        let mut tables = self.tables.write().await;
        tables.sessions.insert(session.id, session.clone());
        Ok(session.clone())
    }

    async fn get_session_by_token_hash(&self, refresh_token_hash: &str) -> Result<Option<Session>> {
        let tables = self.tables.read().await;
        Ok(tables
            .sessions
            .values()
            .find(|s| s.refresh_token_hash == refresh_token_hash)
            .cloned())
    }

    async fn rotate_refresh_token(
        &self,
        session_id: Uuid,
        current_hash: &str,
        new_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match tables.sessions.get_mut(&session_id) {
            Some(session) if session.refresh_token_hash == current_hash && session.revoked_at.is_none() => {
                session.refresh_token_hash = new_hash.to_string();
                session.expires_at = expires_at;
                session.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_session(&self, session_id: Uuid) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(session) = tables.sessions.get_mut(&session_id) {
            if session.revoked_at.is_none() {
                let now = Utc::now();
                session.revoked_at = Some(now);
                session.updated_at = now;
            }
        }
        Ok(())
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.sessions.len();
        tables.sessions.retain(|_, s| s.expires_at > now);
        Ok((before - tables.sessions.len()) as u64)
    }
}

#[async_trait]
impl CommunityRepository for InMemoryStore {
    async fn create_community(&self, community: &Community) -> Result<Community> {
        let mut tables = self.tables.write().await;

        let name = community.name.to_lowercase();
        if tables.communities.values().any(|c| c.name.to_lowercase() == name) {
            return Err(AppError::Conflict(format!("Community '{}' already exists", community.name)));
        }

        let mut stored = community.clone();
        stored.member_count = 1;
        tables.communities.insert(stored.id, stored.clone());
        tables.memberships.insert((stored.id, stored.creator_id), stored.created_at);
        Ok(stored)
    }

    async fn get_community_by_name(&self, name: &str) -> Result<Option<Community>> {
        let tables = self.tables.read().await;
        let name = name.to_lowercase();
        Ok(tables
            .communities
            .values()
            .find(|c| c.deleted_at.is_none() && c.name.to_lowercase() == name)
            .cloned())
    }

    async fn list_communities(&self, params: &OffsetParams) -> Result<(Vec<Community>, i64)> {
        let tables = self.tables.read().await;
        let mut live: Vec<Community> = tables
            .communities
            .values()
            .filter(|c| c.deleted_at.is_none())
            .cloned()
            .collect();
        // Largest communities first, name as tiebreak
        live.sort_by(|a, b| b.member_count.cmp(&a.member_count).then_with(|| a.name.cmp(&b.name)));
        Ok((offset_slice(&live, params), live.len() as i64))
    }

    async fn add_member(&self, community_id: Uuid, user_id: Uuid) -> Result<Community> {
        let mut tables = self.tables.write().await;
        if tables.memberships.contains_key(&(community_id, user_id)) {
            return Err(AppError::Conflict("Already a member of this community".to_string()));
        }
        let community = tables
            .communities
            .get_mut(&community_id)
            .filter(|c| c.deleted_at.is_none())
            .ok_or_else(|| AppError::NotFound("Community not found".to_string()))?;
        community.member_count += 1;
        let updated = community.clone();
        tables.memberships.insert((community_id, user_id), Utc::now());
        Ok(updated)
    }

    async fn remove_member(&self, community_id: Uuid, user_id: Uuid) -> Result<Community> {
        let mut tables = self.tables.write().await;
        if tables.memberships.remove(&(community_id, user_id)).is_none() {
            return Err(AppError::NotFound("Not a member of this community".to_string()));
        }
        let community = tables
            .communities
            .get_mut(&community_id)
            .ok_or_else(|| AppError::NotFound("Community not found".to_string()))?;
        community.member_count = (community.member_count - 1).max(0);
        Ok(community.clone())
    }

    async fn is_member(&self, community_id: Uuid, user_id: Uuid) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(tables.memberships.contains_key(&(community_id, user_id)))
    }

    async fn list_members(&self, community_id: Uuid, params: &OffsetParams) -> Result<(Vec<MemberResponse>, i64)> {
        let tables = self.tables.read().await;
        let mut members: Vec<MemberResponse> = tables
            .memberships
            .iter()
            .filter(|((cid, _), _)| *cid == community_id)
            .filter_map(|((_, uid), joined_at)| {
                tables.users.get(uid).map(|u| MemberResponse {
                    user_id: u.id,
                    username: u.username.clone(),
                    joined_at: *joined_at,
                })
            })
            .collect();
        members.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then_with(|| a.user_id.cmp(&b.user_id)));
        Ok((offset_slice(&members, params), members.len() as i64))
    }
}

#[async_trait]
impl PostRepository for InMemoryStore {
    async fn create_post(&self, post: &Post) -> Result<Post> {
        let mut tables = self.tables.write().await;
        tables.posts.insert(post.id, post.clone());
        Ok(post.clone())
    }

    async fn get_post_by_id(&self, id: Uuid) -> Result<Option<Post>> {
        let tables = self.tables.read().await;
        Ok(tables.posts.get(&id).filter(|p| p.deleted_at.is_none()).cloned())
    }

    async fn list_posts_in_community(&self, community_id: Uuid, page: &KeysetPage) -> Result<Vec<Post>> {
        let tables = self.tables.read().await;
        let live = tables
            .posts
            .values()
            .filter(|p| p.community_id == community_id && p.deleted_at.is_none());
        Ok(select_keyset(live, page))
    }

    async fn list_posts_by_author(&self, author_id: Uuid, page: &KeysetPage) -> Result<Vec<Post>> {
        let tables = self.tables.read().await;
        let live = tables
            .posts
            .values()
            .filter(|p| p.author_id == author_id && p.deleted_at.is_none());
        Ok(select_keyset(live, page))
    }

    async fn soft_delete_post(&self, id: Uuid) -> Result<()> {
        let mut tables = self.tables.write().await;
        let post = tables
            .posts
            .get_mut(&id)
            .filter(|p| p.deleted_at.is_none())
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;
        let now = Utc::now();
        post.deleted_at = Some(now);
        post.updated_at = now;
        Ok(())
    }
}

#[async_trait]
impl CommentRepository for InMemoryStore {
    async fn create_comment(&self, comment: &Comment) -> Result<Comment> {
        let mut tables = self.tables.write().await;
        let post = tables
            .posts
            .get_mut(&comment.post_id)
            .filter(|p| p.deleted_at.is_none())
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;
        post.comment_count += 1;
        tables.comments.insert(comment.id, comment.clone());
        Ok(comment.clone())
    }

    async fn get_comment_by_id(&self, id: Uuid) -> Result<Option<Comment>> {
        let tables = self.tables.read().await;
        Ok(tables.comments.get(&id).filter(|c| tables.comment_is_live(c)).cloned())
    }

    async fn list_comments_for_post(&self, post_id: Uuid, page: &KeysetPage) -> Result<Vec<Comment>> {
        let tables = self.tables.read().await;
        let live = tables
            .comments
            .values()
            .filter(|c| c.post_id == post_id && c.deleted_at.is_none());
        Ok(select_keyset(live, page))
    }

    async fn soft_delete_comment(&self, id: Uuid) -> Result<()> {
        let mut tables = self.tables.write().await;
        let comment = tables
            .comments
            .get_mut(&id)
            .filter(|c| c.deleted_at.is_none())
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;
        let now = Utc::now();
        comment.deleted_at = Some(now);
        comment.updated_at = now;
        let post_id = comment.post_id;

        if let Some(post) = tables.posts.get_mut(&post_id) {
            post.comment_count = (post.comment_count - 1).max(0);
        }
        Ok(())
    }
}

#[async_trait]
impl VoteRepository for InMemoryStore {
    async fn apply_vote(
        &self,
        voter_id: Uuid,
        kind: TargetKind,
        target_id: Uuid,
        value: Option<VoteValue>,
    ) -> Result<VoteTally> {
        let mut tables = self.tables.write().await;

        let target_live = match kind {
            TargetKind::Post => tables.post_is_live(target_id),
            TargetKind::Comment => tables.comments.get(&target_id).map_or(false, |c| tables.comment_is_live(c)),
        };
        if !target_live {
            return Err(kind.not_found());
        }

        let key = (voter_id, kind, target_id);
        let now = Utc::now();
        match value {
            Some(value) => {
                tables
                    .votes
                    .entry(key)
                    .and_modify(|vote| {
                        if vote.value != value {
                            vote.value = value;
                            vote.updated_at = now;
                        }
                    })
                    .or_insert(Vote {
                        voter_id,
                        target_kind: kind,
                        target_id,
                        value,
                        created_at: now,
                        updated_at: now,
                    });
            }
            None => {
                tables.votes.remove(&key);
            }
        }

        let tally = VoteTally::from_values(
            target_id,
            tables
                .votes
                .values()
                .filter(|v| v.target_kind == kind && v.target_id == target_id)
                .map(|v| v.value),
            value,
        );

        match kind {
            TargetKind::Post => {
                if let Some(post) = tables.posts.get_mut(&target_id) {
                    post.score = tally.score;
                    post.upvotes = tally.upvotes;
                    post.downvotes = tally.downvotes;
                }
            }
            TargetKind::Comment => {
                if let Some(comment) = tables.comments.get_mut(&target_id) {
                    comment.score = tally.score;
                    comment.upvotes = tally.upvotes;
                    comment.downvotes = tally.downvotes;
                }
            }
        }

        Ok(tally)
    }

    async fn get_user_votes(
        &self,
        voter_id: Uuid,
        kind: TargetKind,
        target_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, VoteValue>> {
        let tables = self.tables.read().await;
        Ok(target_ids
            .iter()
            .filter_map(|id| tables.votes.get(&(voter_id, kind, *id)).map(|v| (*id, v.value)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(author_id: Uuid) -> Post {
        let now = Utc::now();
        Post {
            id: Uuid::new_v4(),
            community_id: Uuid::new_v4(),
            community_name: "rustaceans".to_string(),
            author_id,
            author_username: "author".to_string(),
            title: "Hello".to_string(),
            body: String::new(),
            score: 0,
            upvotes: 0,
            downvotes: 0,
            comment_count: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn comment(post_id: Uuid, author_id: Uuid) -> Comment {
        let now = Utc::now();
        Comment {
            id: Uuid::new_v4(),
            post_id,
            author_id,
            author_username: "author".to_string(),
            parent_id: None,
            body: "first".to_string(),
            score: 0,
            upvotes: 0,
            downvotes: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[tokio::test]
    async fn test_comment_under_deleted_post_is_gone() {
        let store = InMemoryStore::new();
        let author = Uuid::new_v4();
        let voter = Uuid::new_v4();
        let post = store.create_post(&post(author)).await.unwrap();
        let comment = store.create_comment(&comment(post.id, author)).await.unwrap();

        store.apply_vote(voter, TargetKind::Comment, comment.id, Some(VoteValue::Up)).await.unwrap();
        assert_eq!(store.get_karma(author).await.unwrap(), 1);

        store.soft_delete_post(post.id).await.unwrap();

        assert!(store.get_comment_by_id(comment.id).await.unwrap().is_none());
        assert_eq!(store.get_karma(author).await.unwrap(), 0);
        match store.apply_vote(voter, TargetKind::Comment, comment.id, Some(VoteValue::Down)).await {
            Err(AppError::NotFound(message)) => assert_eq!(message, "Comment not found"),
            other => panic!("expected not found, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_vote_on_missing_post_uses_capitalised_message() {
        let store = InMemoryStore::new();
        match store.apply_vote(Uuid::new_v4(), TargetKind::Post, Uuid::new_v4(), None).await {
            Err(AppError::NotFound(message)) => assert_eq!(message, "Post not found"),
            other => panic!("expected not found, got {:?}", other),
        }
    }
}
