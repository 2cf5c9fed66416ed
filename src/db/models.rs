use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// Kind of an uploaded media object, derived from its file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "webm"];

impl MediaKind {
    /// Classify a stored reference (or original file name) by extension.
    /// Anything that is not a known video container is treated as an image.
    pub fn classify(name: &str) -> Self {
        let ext = std::path::Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext {
            Some(ext) if VIDEO_EXTENSIONS.contains(&ext.as_str()) => MediaKind::Video,
            _ => MediaKind::Image,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }
}

fn media_kind_at(row: &Row, idx: usize) -> rusqlite::Result<Option<MediaKind>> {
    let raw: Option<String> = row.get(idx)?;
    Ok(raw.as_deref().and_then(MediaKind::parse))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: String,
}

impl User {
    pub const COLUMNS: &'static str = "id, email, password_hash, created_at";

    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            password_hash: row.get(2)?,
            created_at: row.get(3)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consultant {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub specialization: String,
    pub bio: Option<String>,
    pub media_path: Option<String>,
    pub media_type: Option<MediaKind>,
    pub created_at: String,
}

impl Consultant {
    pub const COLUMNS: &'static str =
        "c.id, c.name, c.email, c.specialization, c.bio, c.media_path, c.media_type, c.created_at";
    pub const WIDTH: usize = 8;

    /// Read a consultant whose columns start at `base` in the result row.
    pub fn from_row_at(row: &Row, base: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(base)?,
            name: row.get(base + 1)?,
            email: row.get(base + 2)?,
            specialization: row.get(base + 3)?,
            bio: row.get(base + 4)?,
            media_path: row.get(base + 5)?,
            media_type: media_kind_at(row, base + 6)?,
            created_at: row.get(base + 7)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub consultant_id: i64,
    pub title: Option<String>,
    pub content: String,
    pub media_path: Option<String>,
    pub media_type: Option<MediaKind>,
    pub created_at: String,
    pub updated_at: String,
}

impl Post {
    pub const COLUMNS: &'static str =
        "p.id, p.consultant_id, p.title, p.content, p.media_path, p.media_type, p.created_at, p.updated_at";
    pub const WIDTH: usize = 8;

    pub fn from_row_at(row: &Row, base: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(base)?,
            consultant_id: row.get(base + 1)?,
            title: row.get(base + 2)?,
            content: row.get(base + 3)?,
            media_path: row.get(base + 4)?,
            media_type: media_kind_at(row, base + 5)?,
            created_at: row.get(base + 6)?,
            updated_at: row.get(base + 7)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub user_id: Option<i64>,
    pub post_id: i64,
    pub consultant_id: i64,
    pub body: String,
    pub created_at: String,
}

impl Comment {
    pub const COLUMNS: &'static str = "id, user_id, post_id, consultant_id, body, created_at";

    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            post_id: row.get(2)?,
            consultant_id: row.get(3)?,
            body: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthQuiz {
    pub id: i64,
    pub user_id: i64,
    pub consultant_id: Option<i64>,
    pub question_1: String,
    pub question_2: String,
    pub question_3: Option<String>,
    pub image_path: Option<String>,
    pub created_at: String,
}

impl HealthQuiz {
    pub const COLUMNS: &'static str =
        "id, user_id, consultant_id, question_1, question_2, question_3, image_path, created_at";

    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            consultant_id: row.get(2)?,
            question_1: row.get(3)?,
            question_2: row.get(4)?,
            question_3: row.get(5)?,
            image_path: row.get(6)?,
            created_at: row.get(7)?,
        })
    }
}
