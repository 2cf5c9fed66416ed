use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::User;
use crate::error::{AppError, AppResult};

/// Emails are compared trimmed and case-folded.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Salted bcrypt hash of the trimmed password.
pub fn hash_password(password: &str, cost: u32) -> AppResult<String> {
    bcrypt::hash(password.trim(), cost)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

pub fn verify_password(candidate: &str, hash: &str) -> bool {
    bcrypt::verify(candidate.trim(), hash).unwrap_or(false)
}

/// Create a user account. Fails with `DuplicateEmail` if the normalized
/// email is already registered.
pub fn register(conn: &Connection, email: &str, password: &str, cost: u32) -> AppResult<User> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(AppError::BadRequest("Email is required".into()));
    }

    if find_user_by_email(conn, &email)?.is_some() {
        return Err(AppError::DuplicateEmail);
    }

    let hash = hash_password(password, cost)?;
    conn.execute(
        "INSERT INTO users (email, password_hash) VALUES (?1, ?2)",
        params![email, hash],
    )
    .map_err(|e| {
        // Lost a race with a concurrent signup for the same address
        if AppError::is_unique_violation(&e) {
            AppError::DuplicateEmail
        } else {
            e.into()
        }
    })?;

    let id = conn.last_insert_rowid();
    tracing::info!("Registered user {} ({})", id, email);
    find_user(conn, id)?.ok_or_else(|| AppError::Internal("User vanished after insert".into()))
}

/// Check credentials. Unknown email and wrong password both yield `None`.
pub fn authenticate(conn: &Connection, email: &str, password: &str) -> AppResult<Option<User>> {
    let user = find_user_by_email(conn, email)?;
    Ok(user.filter(|u| verify_password(password, &u.password_hash)))
}

pub fn find_user(conn: &Connection, id: i64) -> AppResult<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", User::COLUMNS),
            params![id],
            User::from_row,
        )
        .optional()?;
    Ok(user)
}

pub fn find_user_by_email(conn: &Connection, email: &str) -> AppResult<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE email = ?1", User::COLUMNS),
            params![normalize_email(email)],
            User::from_row,
        )
        .optional()?;
    Ok(user)
}
