//! Display-ready shapes handed to templates.

use chrono::{NaiveDateTime, Utc};

use crate::db::models::{Comment, Consultant, MediaKind, Post};
use crate::media;
use crate::social::{FeedEntry, PostStats, ProfilePost};

pub struct CommentView {
    pub body: String,
    pub created_at: String,
    pub anonymous: bool,
}

impl From<&Comment> for CommentView {
    fn from(comment: &Comment) -> Self {
        Self {
            body: comment.body.clone(),
            created_at: parse_and_format_time(&comment.created_at),
            anonymous: comment.user_id.is_none(),
        }
    }
}

pub struct PostView {
    pub id: i64,
    pub content: String,
    pub media_url: Option<String>,
    pub is_video: bool,
    pub created_at: String,
    pub like_count: i64,
    pub comment_count: i64,
    pub comments: Vec<CommentView>,
}

impl PostView {
    fn new(post: &Post, like_count: i64, comment_count: i64, comments: &[Comment]) -> Self {
        Self {
            id: post.id,
            content: post.content.clone(),
            media_url: post.media_path.as_deref().map(media::url_for),
            is_video: post.media_type == Some(MediaKind::Video),
            created_at: parse_and_format_time(&post.created_at),
            like_count,
            comment_count,
            comments: comments.iter().map(CommentView::from).collect(),
        }
    }
}

impl From<&PostStats> for PostView {
    fn from(stats: &PostStats) -> Self {
        PostView::new(&stats.post, stats.like_count, stats.comment_count, &[])
    }
}

impl From<&ProfilePost> for PostView {
    fn from(item: &ProfilePost) -> Self {
        PostView::new(
            &item.post,
            item.like_count,
            item.comments.len() as i64,
            &item.comments,
        )
    }
}

pub struct ConsultantView {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub specialization: String,
    pub bio: String,
    pub picture_url: Option<String>,
}

impl From<&Consultant> for ConsultantView {
    fn from(c: &Consultant) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
            email: c.email.clone(),
            specialization: c.specialization.clone(),
            bio: c.bio.clone().unwrap_or_default(),
            picture_url: c.media_path.as_deref().map(media::url_for),
        }
    }
}

pub struct FeedItemView {
    pub post: PostView,
    pub consultant: ConsultantView,
    pub follower_count: i64,
}

impl From<&FeedEntry> for FeedItemView {
    fn from(entry: &FeedEntry) -> Self {
        Self {
            post: PostView::new(
                &entry.post,
                entry.like_count,
                entry.comments.len() as i64,
                &entry.comments,
            ),
            consultant: ConsultantView::from(&entry.consultant),
            follower_count: entry.follower_count,
        }
    }
}

// --- Time formatting ---

pub fn parse_and_format_time(db_time: &str) -> String {
    NaiveDateTime::parse_from_str(db_time, "%Y-%m-%d %H:%M:%S")
        .map(|dt| format_relative_time(&dt))
        .unwrap_or_else(|_| db_time.to_string())
}

pub fn format_relative_time(dt: &NaiveDateTime) -> String {
    let diff = Utc::now().naive_utc().signed_duration_since(*dt);

    match diff.num_seconds() {
        s if s < 60 => "just now".to_string(),
        s if s < 3600 => format!("{}m ago", diff.num_minutes()),
        s if s < 86_400 => format!("{}h ago", diff.num_hours()),
        s if s < 7 * 86_400 => format!("{}d ago", diff.num_days()),
        _ => dt.format("%b %-d, %Y").to_string(),
    }
}
