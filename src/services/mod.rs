pub mod user_service;
pub mod session_service;
pub mod community_service;
pub mod post_service;
pub mod comment_service;
pub mod vote_service;

// Re-export services for convenience
pub use user_service::UserService;
pub use session_service::SessionService;
pub use community_service::CommunityService;
pub use post_service::PostService;
pub use comment_service::CommentService;
pub use vote_service::VoteService;
