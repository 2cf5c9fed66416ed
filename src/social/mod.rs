//! Consultants, their posts, and the likes/comments/follows around them.
//!
//! Every operation takes a borrowed connection plus explicit actor data;
//! nothing here reads request or session state directly.

pub mod consultants;
pub mod feed;
pub mod posts;
pub mod relations;

pub use consultants::{ConsultantDetails, ConsultantProfile, PostStats, ProfilePost};
pub use feed::{FeedEntry, FeedQuery};
pub use posts::PostDraft;
pub use relations::{FollowState, LikeState};
