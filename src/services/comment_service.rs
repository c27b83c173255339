use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::auth::Claims;
use crate::db::repository::{CommentRepository, PostRepository};
use crate::models::comment::{CommentResponse, CreateCommentRequest};
use crate::models::{Comment, TargetKind};
use crate::pagination::{CursorPage, CursorParams, SortOrder};
use crate::services::VoteService;
use crate::utils::validation::{validate_text, COMMENT_BODY_MAX};
use crate::{AppError, Result};

/// Flat comment threads: replies keep `parent_id`, listing is oldest first
pub struct CommentService {
    comment_repo: Arc<dyn CommentRepository>,
    post_repo: Arc<dyn PostRepository>,
    vote_service: Arc<VoteService>,
}

impl CommentService {
    pub fn new(
        comment_repo: Arc<dyn CommentRepository>,
        post_repo: Arc<dyn PostRepository>,
        vote_service: Arc<VoteService>,
    ) -> Self {
        Self { comment_repo, post_repo, vote_service }
    }

    pub async fn create_comment(&self, post_id: Uuid, author: &Claims, request: CreateCommentRequest) -> Result<CommentResponse> {
        let body = validate_text("Comment", &request.body, 1, COMMENT_BODY_MAX)?;

        if self.post_repo.get_post_by_id(post_id).await?.is_none() {
            return Err(AppError::NotFound("Post not found".to_string()));
        }

        if let Some(parent_id) = request.parent_id {
            let parent = self
                .comment_repo
                .get_comment_by_id(parent_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Parent comment not found".to_string()))?;
            if parent.post_id != post_id {
                return Err(AppError::ValidationError("Parent comment belongs to a different post".to_string()));
            }
        }

        let now = Utc::now();
        let comment = Comment {
            id: Uuid::new_v4(),
            post_id,
            author_id: author.user_id,
            author_username: author.username.clone(),
            parent_id: request.parent_id,
            body,
            score: 0,
            upvotes: 0,
            downvotes: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let created = self.comment_repo.create_comment(&comment).await?;
        tracing::info!("💬 COMMENT: {} commented {} on post {}", author.username, created.id, post_id);
        Ok(CommentResponse::from(created))
    }

    pub async fn list_comments(&self, post_id: Uuid, params: CursorParams, viewer: Option<Uuid>) -> Result<CursorPage<CommentResponse>> {
        let page = params.into_keyset(SortOrder::Oldest)?;
        if self.post_repo.get_post_by_id(post_id).await?.is_none() {
            return Err(AppError::NotFound("Post not found".to_string()));
        }

        let rows = self.comment_repo.list_comments_for_post(post_id, &page).await?;
        let page = CursorPage::from_rows(rows, &page);

        let ids: Vec<Uuid> = page.items.iter().map(|comment| comment.id).collect();
        let votes = self.vote_service.my_votes(viewer, TargetKind::Comment, &ids).await?;

        Ok(page.map(|comment| {
            let mut response = CommentResponse::from(comment);
            if viewer.is_some() {
                response.my_vote = Some(votes.get(&response.id).copied().unwrap_or(0));
            }
            response
        }))
    }

    /// Soft delete. Allowed for the author and site admins.
    pub async fn delete_comment(&self, comment_id: Uuid, actor: &Claims) -> Result<()> {
        let comment = self
            .comment_repo
            .get_comment_by_id(comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

        if comment.author_id != actor.user_id && !actor.is_admin() {
            return Err(AppError::Forbidden("Only the author or an admin can delete this comment".to_string()));
        }

        self.comment_repo.soft_delete_comment(comment_id).await?;
        tracing::info!("🗑️ COMMENT: {} deleted comment {}", actor.username, comment_id);
        Ok(())
    }
}
