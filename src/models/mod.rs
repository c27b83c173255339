pub mod user;
pub mod session;
pub mod community;
pub mod post;
pub mod comment;
pub mod vote;

// Re-export models for convenience
pub use user::User;
pub use session::Session;
pub use community::Community;
pub use post::Post;
pub use comment::Comment;
pub use vote::{Vote, VoteValue, TargetKind, VoteTally, CastVoteRequest};
