use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppError, Result};

/// Direction of a single user's vote on a post or comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoteValue {
    Up,
    Down,
}

impl VoteValue {
    pub fn as_i16(self) -> i16 {
        match self {
            VoteValue::Up => 1,
            VoteValue::Down => -1,
        }
    }

    /// Decode the wire/storage value. `0` means "no vote" and maps to `None`.
    pub fn from_i16(value: i16) -> Result<Option<Self>> {
        match value {
            1 => Ok(Some(VoteValue::Up)),
            -1 => Ok(Some(VoteValue::Down)),
            0 => Ok(None),
            other => Err(AppError::ValidationError(format!(
                "Invalid vote value {}: must be 1, -1 or 0",
                other
            ))),
        }
    }
}

/// What a vote points at. Stored in the `target_kind` column as "post" / "comment".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Post,
    Comment,
}

impl TargetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetKind::Post => "post",
            TargetKind::Comment => "comment",
        }
    }

    pub fn not_found(self) -> AppError {
        match self {
            TargetKind::Post => AppError::NotFound("Post not found".to_string()),
            TargetKind::Comment => AppError::NotFound("Comment not found".to_string()),
        }
    }
}

/// One row per (voter, target). Clearing a vote deletes the row.
#[derive(Debug, Clone)]
pub struct Vote {
    pub voter_id: Uuid,
    pub target_kind: TargetKind,
    pub target_id: Uuid,
    pub value: VoteValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for `PUT .../vote`
#[derive(Debug, Clone, Deserialize)]
pub struct CastVoteRequest {
    /// 1 = upvote, -1 = downvote, 0 = clear
    pub value: i16,
}

/// Aggregate state of a target after a vote write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub target_id: Uuid,
    pub score: i64,
    pub upvotes: i64,
    pub downvotes: i64,
    /// The caller's vote after the write: 1, -1 or 0
    pub my_vote: i16,
}

impl VoteTally {
    /// Recompute the aggregate from the full set of vote values on a target.
    /// `score == upvotes - downvotes` always holds.
    pub fn from_values<I>(target_id: Uuid, values: I, my_vote: Option<VoteValue>) -> Self
    where
        I: IntoIterator<Item = VoteValue>,
    {
        let (upvotes, downvotes) = values.into_iter().fold((0i64, 0i64), |(up, down), value| match value {
            VoteValue::Up => (up + 1, down),
            VoteValue::Down => (up, down + 1),
        });

        Self {
            target_id,
            score: upvotes - downvotes,
            upvotes,
            downvotes,
            my_vote: my_vote.map_or(0, VoteValue::as_i16),
        }
    }
}
