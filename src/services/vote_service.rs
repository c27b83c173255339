use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::db::repository::{CommentRepository, PostRepository, VoteRepository};
use crate::models::{TargetKind, VoteTally, VoteValue};
use crate::{AppError, Result};

/// Service for post and comment up/down votes
pub struct VoteService {
    vote_repo: Arc<dyn VoteRepository>,
    post_repo: Arc<dyn PostRepository>,
    comment_repo: Arc<dyn CommentRepository>,
}

impl VoteService {
    pub fn new(
        vote_repo: Arc<dyn VoteRepository>,
        post_repo: Arc<dyn PostRepository>,
        comment_repo: Arc<dyn CommentRepository>,
    ) -> Self {
        Self { vote_repo, post_repo, comment_repo }
    }

    /// Cast, switch or clear (`value == 0`) a vote and return the fresh tally.
    /// Re-sending the current value changes nothing.
    pub async fn cast_vote(&self, voter_id: Uuid, kind: TargetKind, target_id: Uuid, value: i16) -> Result<VoteTally> {
        let value = VoteValue::from_i16(value)?;

        let author_id = self.target_author(kind, target_id).await?;
        if author_id == voter_id {
            return Err(AppError::Forbidden(format!("You cannot vote on your own {}", kind.as_str())));
        }

        let tally = self.vote_repo.apply_vote(voter_id, kind, target_id, value).await?;
        tracing::info!(
            "🗳️ VOTE: {} voted {} on {} {} -> score {}",
            voter_id,
            tally.my_vote,
            kind.as_str(),
            target_id,
            tally.score
        );
        Ok(tally)
    }

    /// Remove the voter's vote. Succeeds when there was none.
    pub async fn clear_vote(&self, voter_id: Uuid, kind: TargetKind, target_id: Uuid) -> Result<VoteTally> {
        self.cast_vote(voter_id, kind, target_id, 0).await
    }

    /// The viewer's votes among `target_ids`, as +1/-1. Guests get an empty map.
    pub async fn my_votes(&self, viewer: Option<Uuid>, kind: TargetKind, target_ids: &[Uuid]) -> Result<HashMap<Uuid, i16>> {
        let Some(voter_id) = viewer else {
            return Ok(HashMap::new());
        };
        let votes = self.vote_repo.get_user_votes(voter_id, kind, target_ids).await?;
        Ok(votes.into_iter().map(|(id, value)| (id, value.as_i16())).collect())
    }

    async fn target_author(&self, kind: TargetKind, target_id: Uuid) -> Result<Uuid> {
        match kind {
            TargetKind::Post => self
                .post_repo
                .get_post_by_id(target_id)
                .await?
                .map(|post| post.author_id)
                .ok_or_else(|| kind.not_found()),
            TargetKind::Comment => self
                .comment_repo
                .get_comment_by_id(target_id)
                .await?
                .map(|comment| comment.author_id)
                .ok_or_else(|| kind.not_found()),
        }
    }
}
