use rusqlite::{params, Connection, OptionalExtension};

use crate::auth::session::{ConsultantIdentity, IdentityContext};
use crate::db::models::{MediaKind, Post};
use crate::error::{AppError, AppResult};
use crate::media::{MediaStore, Upload};
use crate::social::consultants;

/// Content submitted for a new or edited post.
#[derive(Debug, Clone, Default)]
pub struct PostDraft {
    pub content: String,
    pub media: Option<Upload>,
}

pub fn find_post(conn: &Connection, post_id: i64) -> AppResult<Option<Post>> {
    let post = conn
        .query_row(
            &format!("SELECT {} FROM consultant_posts p WHERE p.id = ?1", Post::COLUMNS),
            params![post_id],
            |row| Post::from_row_at(row, 0),
        )
        .optional()?;
    Ok(post)
}

fn require_consultant(identity: &IdentityContext) -> AppResult<&ConsultantIdentity> {
    identity.consultant.as_ref().ok_or(AppError::Unauthorized)
}

/// Load a post and check that the calling consultant owns it.
fn owned_post(conn: &Connection, identity: &IdentityContext, post_id: i64) -> AppResult<Post> {
    let consultant = require_consultant(identity)?;
    let post = find_post(conn, post_id)?.ok_or(AppError::NotFound)?;
    if post.consultant_id != consultant.id {
        tracing::warn!(
            "Consultant {} tried to modify post {} owned by {}",
            consultant.id,
            post.id,
            post.consultant_id
        );
        return Err(AppError::Forbidden);
    }
    Ok(post)
}

pub fn create_post(
    conn: &Connection,
    media: &MediaStore,
    identity: &IdentityContext,
    draft: PostDraft,
) -> AppResult<Post> {
    let consultant = require_consultant(identity)?;
    if consultants::find_consultant(conn, consultant.id)?.is_none() {
        return Err(AppError::Unauthorized);
    }

    let stored = match &draft.media {
        Some(upload) => Some(media.store_upload(upload)?),
        None => None,
    };
    let kind = stored.as_deref().map(MediaKind::classify);

    let inserted = conn.execute(
        "INSERT INTO consultant_posts (consultant_id, content, media_path, media_type)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            consultant.id,
            draft.content,
            stored,
            kind.map(|k| k.as_str())
        ],
    );
    if let Err(e) = inserted {
        if let Some(reference) = &stored {
            media.release(reference);
        }
        return Err(e.into());
    }

    let post_id = conn.last_insert_rowid();
    tracing::info!("Consultant {} created post {}", consultant.id, post_id);
    find_post(conn, post_id)?.ok_or_else(|| AppError::Internal("Post vanished after insert".into()))
}

/// Replace a post's text and, when a new upload is given, its media.
///
/// The new object is written before the row is updated and the old one is
/// released only after the update succeeds, so the row never points at a
/// missing file.
pub fn edit_post(
    conn: &Connection,
    media: &MediaStore,
    identity: &IdentityContext,
    post_id: i64,
    draft: PostDraft,
) -> AppResult<Post> {
    let post = owned_post(conn, identity, post_id)?;

    let updated = match &draft.media {
        Some(upload) => {
            let reference = media.store_upload(upload)?;
            let kind = MediaKind::classify(&reference);
            let result = conn.execute(
                "UPDATE consultant_posts
                 SET content = ?2, media_path = ?3, media_type = ?4, updated_at = datetime('now')
                 WHERE id = ?1",
                params![post.id, draft.content, reference, kind.as_str()],
            );
            match result {
                Ok(_) => {
                    if let Some(old) = &post.media_path {
                        media.release(old);
                    }
                    Ok(())
                }
                Err(e) => {
                    media.release(&reference);
                    Err(e)
                }
            }
        }
        None => conn
            .execute(
                "UPDATE consultant_posts SET content = ?2, updated_at = datetime('now') WHERE id = ?1",
                params![post.id, draft.content],
            )
            .map(|_| ()),
    };
    updated?;

    tracing::info!("Post {} edited", post.id);
    find_post(conn, post.id)?.ok_or(AppError::NotFound)
}

/// Delete a post owned by the caller. Likes and comments go with it via
/// cascade; the media object is released afterwards.
pub fn delete_post(
    conn: &Connection,
    media: &MediaStore,
    identity: &IdentityContext,
    post_id: i64,
) -> AppResult<()> {
    let post = owned_post(conn, identity, post_id)?;

    conn.execute("DELETE FROM consultant_posts WHERE id = ?1", params![post.id])?;
    if let Some(reference) = &post.media_path {
        media.release(reference);
    }

    tracing::info!("Post {} deleted", post.id);
    Ok(())
}
