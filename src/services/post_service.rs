use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::auth::Claims;
use crate::db::repository::{PostRepository, UserRepository};
use crate::models::post::{CreatePostRequest, PostResponse};
use crate::models::{Post, TargetKind};
use crate::pagination::{CursorPage, CursorParams, PostSort, SortOrder};
use crate::services::{CommunityService, VoteService};
use crate::utils::validation::{validate_text, POST_BODY_MAX, POST_TITLE_MAX};
use crate::{AppError, Result};

pub struct PostService {
    post_repo: Arc<dyn PostRepository>,
    user_repo: Arc<dyn UserRepository>,
    community_service: Arc<CommunityService>,
    vote_service: Arc<VoteService>,
}

impl PostService {
    pub fn new(
        post_repo: Arc<dyn PostRepository>,
        user_repo: Arc<dyn UserRepository>,
        community_service: Arc<CommunityService>,
        vote_service: Arc<VoteService>,
    ) -> Self {
        Self { post_repo, user_repo, community_service, vote_service }
    }

    /// Only members of the community may post in it
    pub async fn create_post(&self, community_name: &str, author: &Claims, request: CreatePostRequest) -> Result<PostResponse> {
        let title = validate_text("Title", &request.title, 1, POST_TITLE_MAX)?;
        let body = validate_text("Body", &request.body, 0, POST_BODY_MAX)?;

        let community = self.community_service.find_by_name(community_name).await?;
        if !self.community_service.is_member(community.id, author.user_id).await? {
            return Err(AppError::Forbidden(format!("Join c/{} before posting", community.name)));
        }

        let now = Utc::now();
        let post = Post {
            id: Uuid::new_v4(),
            community_id: community.id,
            community_name: community.name,
            author_id: author.user_id,
            author_username: author.username.clone(),
            title,
            body,
            score: 0,
            upvotes: 0,
            downvotes: 0,
            comment_count: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let created = self.post_repo.create_post(&post).await?;
        tracing::info!("📝 POST: {} created post {} in c/{}", author.username, created.id, created.community_name);
        Ok(PostResponse::from(created))
    }

    pub async fn get_post(&self, post_id: Uuid, viewer: Option<Uuid>) -> Result<PostResponse> {
        let post = self
            .post_repo
            .get_post_by_id(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        let votes = self.vote_service.my_votes(viewer, TargetKind::Post, &[post.id]).await?;
        let mut response = PostResponse::from(post);
        if viewer.is_some() {
            response.my_vote = Some(votes.get(&response.id).copied().unwrap_or(0));
        }
        Ok(response)
    }

    pub async fn list_community_posts(
        &self,
        community_name: &str,
        sort: PostSort,
        params: CursorParams,
        viewer: Option<Uuid>,
    ) -> Result<CursorPage<PostResponse>> {
        let page = params.into_keyset(SortOrder::from(sort))?;
        let community = self.community_service.find_by_name(community_name).await?;

        let rows = self.post_repo.list_posts_in_community(community.id, &page).await?;
        self.with_my_votes(CursorPage::from_rows(rows, &page), viewer).await
    }

    /// A user's live posts, newest first
    pub async fn list_user_posts(&self, author_id: Uuid, params: CursorParams, viewer: Option<Uuid>) -> Result<CursorPage<PostResponse>> {
        let page = params.into_keyset(SortOrder::Newest)?;
        if self.user_repo.get_user_by_id(author_id).await?.is_none() {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        let rows = self.post_repo.list_posts_by_author(author_id, &page).await?;
        self.with_my_votes(CursorPage::from_rows(rows, &page), viewer).await
    }

    /// Soft delete. Allowed for the author and site admins.
    pub async fn delete_post(&self, post_id: Uuid, actor: &Claims) -> Result<()> {
        let post = self
            .post_repo
            .get_post_by_id(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        if post.author_id != actor.user_id && !actor.is_admin() {
            return Err(AppError::Forbidden("Only the author or an admin can delete this post".to_string()));
        }

        self.post_repo.soft_delete_post(post_id).await?;
        tracing::info!("🗑️ POST: {} deleted post {}", actor.username, post_id);
        Ok(())
    }

    async fn with_my_votes(&self, page: CursorPage<Post>, viewer: Option<Uuid>) -> Result<CursorPage<PostResponse>> {
        let ids: Vec<Uuid> = page.items.iter().map(|post| post.id).collect();
        let votes = self.vote_service.my_votes(viewer, TargetKind::Post, &ids).await?;

        Ok(page.map(|post| {
            let mut response = PostResponse::from(post);
            if viewer.is_some() {
                response.my_vote = Some(votes.get(&response.id).copied().unwrap_or(0));
            }
            response
        }))
    }
}
