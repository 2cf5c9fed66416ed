use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::Serialize;

use crate::db::models::Comment;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeState {
    pub liked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FollowState {
    pub following: bool,
}

/// Flip the like of `actor` (or the anonymous slot) on a post.
///
/// Read and write happen in one IMMEDIATE transaction so two concurrent
/// toggles cannot both observe "absent" and insert twice.
pub fn toggle_like(conn: &mut Connection, post_id: i64, actor: Option<i64>) -> AppResult<LikeState> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let existing: Option<i64> = tx
        .query_row(
            "SELECT id FROM likes WHERE post_id = ?1 AND user_id IS ?2",
            params![post_id, actor],
            |r| r.get(0),
        )
        .optional()?;

    let liked = match existing {
        Some(like_id) => {
            tx.execute("DELETE FROM likes WHERE id = ?1", params![like_id])?;
            false
        }
        None => {
            let consultant_id: i64 = tx
                .query_row(
                    "SELECT consultant_id FROM consultant_posts WHERE id = ?1",
                    params![post_id],
                    |r| r.get(0),
                )
                .optional()?
                .ok_or(AppError::NotFound)?;

            tx.execute(
                "INSERT INTO likes (user_id, post_id, consultant_id) VALUES (?1, ?2, ?3)",
                params![actor, post_id, consultant_id],
            )?;
            true
        }
    };

    tx.commit()?;
    Ok(LikeState { liked })
}

/// Flip whether `actor` follows a consultant. Same transaction discipline
/// as [`toggle_like`].
pub fn toggle_follow(
    conn: &mut Connection,
    consultant_id: i64,
    actor: Option<i64>,
) -> AppResult<FollowState> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let existing: Option<i64> = tx
        .query_row(
            "SELECT id FROM followers WHERE consultant_id = ?1 AND user_id IS ?2",
            params![consultant_id, actor],
            |r| r.get(0),
        )
        .optional()?;

    let following = match existing {
        Some(follow_id) => {
            tx.execute("DELETE FROM followers WHERE id = ?1", params![follow_id])?;
            false
        }
        None => {
            let exists: bool = tx.query_row(
                "SELECT COUNT(*) > 0 FROM consultants WHERE id = ?1",
                params![consultant_id],
                |r| r.get(0),
            )?;
            if !exists {
                return Err(AppError::NotFound);
            }

            tx.execute(
                "INSERT INTO followers (user_id, consultant_id) VALUES (?1, ?2)",
                params![actor, consultant_id],
            )?;
            true
        }
    };

    tx.commit()?;
    Ok(FollowState { following })
}

/// Append a comment to a post.
///
/// Blank text is dropped without error and yields `Ok(None)`; callers
/// treat that the same as success.
pub fn add_comment(
    conn: &Connection,
    post_id: i64,
    actor: Option<i64>,
    text: &str,
) -> AppResult<Option<Comment>> {
    let body = text.trim();
    if body.is_empty() {
        return Ok(None);
    }

    let consultant_id: i64 = conn
        .query_row(
            "SELECT consultant_id FROM consultant_posts WHERE id = ?1",
            params![post_id],
            |r| r.get(0),
        )
        .optional()?
        .ok_or(AppError::NotFound)?;

    conn.execute(
        "INSERT INTO comments (user_id, post_id, consultant_id, body) VALUES (?1, ?2, ?3, ?4)",
        params![actor, post_id, consultant_id, body],
    )?;

    let comment = conn.query_row(
        &format!("SELECT {} FROM comments WHERE id = ?1", Comment::COLUMNS),
        params![conn.last_insert_rowid()],
        Comment::from_row,
    )?;
    Ok(Some(comment))
}

/// Comments on a post, oldest first.
pub fn comments_for_post(conn: &Connection, post_id: i64) -> AppResult<Vec<Comment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM comments WHERE post_id = ?1 ORDER BY created_at ASC, id ASC",
        Comment::COLUMNS
    ))?;
    let comments = stmt
        .query_map(params![post_id], Comment::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(comments)
}

pub fn like_count(conn: &Connection, post_id: i64) -> AppResult<i64> {
    let n = conn.query_row(
        "SELECT COUNT(*) FROM likes WHERE post_id = ?1",
        params![post_id],
        |r| r.get(0),
    )?;
    Ok(n)
}

pub fn follower_count(conn: &Connection, consultant_id: i64) -> AppResult<i64> {
    let n = conn.query_row(
        "SELECT COUNT(*) FROM followers WHERE consultant_id = ?1",
        params![consultant_id],
        |r| r.get(0),
    )?;
    Ok(n)
}
