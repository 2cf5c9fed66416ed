use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::db::models::{Comment, Consultant, MediaKind, Post};
use crate::error::{AppError, AppResult};
use crate::media::{MediaStore, Upload};
use crate::social::relations;

/// Profile fields submitted at consultant registration.
#[derive(Debug, Clone)]
pub struct ConsultantDetails {
    pub name: String,
    pub email: String,
    pub specialization: String,
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostStats {
    pub post: Post,
    pub like_count: i64,
    pub comment_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfilePost {
    pub post: Post,
    pub like_count: i64,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsultantProfile {
    pub consultant: Consultant,
    pub posts: Vec<ProfilePost>,
    pub follower_count: i64,
}

pub fn find_consultant(conn: &Connection, id: i64) -> AppResult<Option<Consultant>> {
    let consultant = conn
        .query_row(
            &format!("SELECT {} FROM consultants c WHERE c.id = ?1", Consultant::COLUMNS),
            params![id],
            |row| Consultant::from_row_at(row, 0),
        )
        .optional()?;
    Ok(consultant)
}

/// Consultant emails are not unique; the oldest matching record wins.
pub fn find_consultant_by_email(conn: &Connection, email: &str) -> AppResult<Option<Consultant>> {
    let consultant = conn
        .query_row(
            &format!(
                "SELECT {} FROM consultants c WHERE c.email = ?1 ORDER BY c.id ASC LIMIT 1",
                Consultant::COLUMNS
            ),
            params![email.trim()],
            |row| Consultant::from_row_at(row, 0),
        )
        .optional()?;
    Ok(consultant)
}

/// Create a consultant, or update the one already registered under the
/// same email. A new picture replaces (and releases) the previous one.
pub fn register_consultant(
    conn: &Connection,
    media: &MediaStore,
    details: &ConsultantDetails,
    picture: Option<&Upload>,
) -> AppResult<Consultant> {
    let name = details.name.trim();
    let email = details.email.trim();
    let specialization = details.specialization.trim();
    if name.is_empty() || email.is_empty() || specialization.is_empty() {
        return Err(AppError::BadRequest(
            "Name, email and specialization are required".into(),
        ));
    }
    let bio = details
        .bio
        .as_deref()
        .map(str::trim)
        .filter(|b| !b.is_empty());

    let stored = match picture {
        Some(upload) => Some(media.store_upload(upload)?),
        None => None,
    };

    let existing = find_consultant_by_email(conn, email)?;
    let written = match &existing {
        Some(current) => {
            let updated = match &stored {
                Some(reference) => conn.execute(
                    "UPDATE consultants
                     SET name = ?2, specialization = ?3, bio = ?4, media_path = ?5, media_type = ?6
                     WHERE id = ?1",
                    params![
                        current.id,
                        name,
                        specialization,
                        bio,
                        reference,
                        MediaKind::Image.as_str()
                    ],
                ),
                None => conn.execute(
                    "UPDATE consultants SET name = ?2, specialization = ?3, bio = ?4 WHERE id = ?1",
                    params![current.id, name, specialization, bio],
                ),
            };
            updated.map(|_| current.id)
        }
        None => conn
            .execute(
                "INSERT INTO consultants (name, email, specialization, bio, media_path, media_type)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    name,
                    email,
                    specialization,
                    bio,
                    stored,
                    stored.as_ref().map(|_| MediaKind::Image.as_str())
                ],
            )
            .map(|_| conn.last_insert_rowid()),
    };

    let id = match written {
        Ok(id) => id,
        Err(e) => {
            if let Some(reference) = &stored {
                media.release(reference);
            }
            return Err(e.into());
        }
    };

    if stored.is_some() {
        if let Some(old) = existing.as_ref().and_then(|c| c.media_path.as_deref()) {
            media.release(old);
        }
    }

    match existing {
        Some(_) => tracing::info!("Updated consultant {} ({})", id, email),
        None => tracing::info!("Registered consultant {} ({})", id, email),
    }
    find_consultant(conn, id)?
        .ok_or_else(|| AppError::Internal("Consultant vanished after write".into()))
}

/// A consultant's own posts, newest first, with engagement counts.
pub fn consultant_posts(conn: &Connection, consultant_id: i64) -> AppResult<Vec<PostStats>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {},
                (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id),
                (SELECT COUNT(*) FROM comments m WHERE m.post_id = p.id)
         FROM consultant_posts p
         WHERE p.consultant_id = ?1
         ORDER BY p.created_at DESC, p.id DESC",
        Post::COLUMNS
    ))?;

    let posts = stmt
        .query_map(params![consultant_id], |row| {
            Ok(PostStats {
                post: Post::from_row_at(row, 0)?,
                like_count: row.get(Post::WIDTH)?,
                comment_count: row.get(Post::WIDTH + 1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(posts)
}

/// Public profile: the consultant, their posts with comments, and how many
/// followers they have.
pub fn consultant_profile(conn: &Connection, consultant_id: i64) -> AppResult<ConsultantProfile> {
    let consultant = find_consultant(conn, consultant_id)?.ok_or(AppError::NotFound)?;

    let posts = consultant_posts(conn, consultant_id)?
        .into_iter()
        .map(|stats| {
            Ok(ProfilePost {
                comments: relations::comments_for_post(conn, stats.post.id)?,
                like_count: stats.like_count,
                post: stats.post,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ConsultantProfile {
        follower_count: relations::follower_count(conn, consultant.id)?,
        consultant,
        posts,
    })
}
