use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::error::AppResult;
use crate::social::consultants;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserIdentity {
    pub id: i64,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsultantIdentity {
    pub id: i64,
    pub email: String,
}

/// Who is making a request. Both slots may be filled at once: a browser
/// can be signed in as a member and as a consultant simultaneously.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IdentityContext {
    pub user: Option<UserIdentity>,
    pub consultant: Option<ConsultantIdentity>,
}

impl IdentityContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_anonymous(&self) -> bool {
        self.user.is_none() && self.consultant.is_none()
    }

    /// Acting user for likes, comments and follows; `None` when anonymous.
    pub fn user_id(&self) -> Option<i64> {
        self.user.as_ref().map(|u| u.id)
    }
}

/// Create an empty session and return its token.
pub fn create_session(conn: &Connection, hours: u64) -> AppResult<String> {
    let token = generate_token();
    conn.execute(
        "INSERT INTO sessions (token, expires_at) VALUES (?1, datetime('now', ?2))",
        params![token, format!("+{} hours", hours)],
    )?;
    Ok(token)
}

/// Reuse the caller's session when it is still live, otherwise start a new
/// one. Returns the token to put in the cookie.
pub fn open_session(conn: &Connection, existing: Option<&str>, hours: u64) -> AppResult<String> {
    if let Some(token) = existing {
        if is_live(conn, token)? {
            return Ok(token.to_string());
        }
    }
    create_session(conn, hours)
}

fn is_live(conn: &Connection, token: &str) -> AppResult<bool> {
    let live = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sessions WHERE token = ?1 AND expires_at > datetime('now')",
        params![token],
        |row| row.get(0),
    )?;
    Ok(live)
}

struct SessionRow {
    user_id: Option<i64>,
    user_email: Option<String>,
    consultant_id: Option<i64>,
    consultant_email: Option<String>,
}

/// Resolve a token to its identity. `None` means the token is unknown or
/// expired.
pub fn resolve(conn: &Connection, token: &str) -> AppResult<Option<IdentityContext>> {
    let row = conn
        .query_row(
            "SELECT user_id, user_email, consultant_id, consultant_email FROM sessions
             WHERE token = ?1 AND expires_at > datetime('now')",
            params![token],
            |r| {
                Ok(SessionRow {
                    user_id: r.get(0)?,
                    user_email: r.get(1)?,
                    consultant_id: r.get(2)?,
                    consultant_email: r.get(3)?,
                })
            },
        )
        .optional()?;

    let Some(row) = row else {
        return Ok(None);
    };

    let user = match (row.user_id, row.user_email) {
        (Some(id), Some(email)) => Some(UserIdentity { id, email }),
        _ => None,
    };

    let consultant = match (row.consultant_id, row.consultant_email) {
        (Some(id), email) => Some(ConsultantIdentity {
            id,
            email: email.unwrap_or_default(),
        }),
        // Only the email survived (e.g. the id was nulled out); look the
        // consultant up and pin the id back onto the session.
        (None, Some(email)) => match consultants::find_consultant_by_email(conn, &email)? {
            Some(found) => {
                let identity = ConsultantIdentity {
                    id: found.id,
                    email: found.email,
                };
                set_consultant(conn, token, &identity)?;
                Some(identity)
            }
            None => None,
        },
        (None, None) => None,
    };

    Ok(Some(IdentityContext { user, consultant }))
}

pub fn set_user(conn: &Connection, token: &str, user: &UserIdentity) -> AppResult<()> {
    conn.execute(
        "UPDATE sessions SET user_id = ?2, user_email = ?3 WHERE token = ?1",
        params![token, user.id, user.email],
    )?;
    Ok(())
}

pub fn set_consultant(
    conn: &Connection,
    token: &str,
    consultant: &ConsultantIdentity,
) -> AppResult<()> {
    conn.execute(
        "UPDATE sessions SET consultant_id = ?2, consultant_email = ?3 WHERE token = ?1",
        params![token, consultant.id, consultant.email],
    )?;
    Ok(())
}

/// Forget every identity attached to the token.
pub fn delete_session(conn: &Connection, token: &str) -> AppResult<()> {
    conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(())
}

pub fn purge_expired(conn: &Connection) -> AppResult<usize> {
    let removed = conn.execute(
        "DELETE FROM sessions WHERE expires_at <= datetime('now')",
        [],
    )?;
    Ok(removed)
}

/// Generate a cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[test]
    fn generate_token_is_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generate_token_is_unique() {
        assert_ne!(generate_token(), generate_token());
    }

    #[test]
    fn fresh_session_is_anonymous() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let token = create_session(&conn, 1).unwrap();
        let ctx = resolve(&conn, &token).unwrap().unwrap();
        assert!(ctx.is_anonymous());
        assert_eq!(ctx.user_id(), None);
    }

    #[test]
    fn unknown_token_resolves_to_none() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        assert!(resolve(&conn, "nope").unwrap().is_none());
    }

    #[test]
    fn expired_session_is_ignored_and_replaced() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        conn.execute(
            "INSERT INTO sessions (token, expires_at) VALUES ('old', datetime('now', '-1 hours'))",
            [],
        )
        .unwrap();

        assert!(resolve(&conn, "old").unwrap().is_none());
        let token = open_session(&conn, Some("old"), 1).unwrap();
        assert_ne!(token, "old");
        assert_eq!(purge_expired(&conn).unwrap(), 1);
    }

    #[test]
    fn open_session_reuses_live_token() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let token = create_session(&conn, 1).unwrap();
        assert_eq!(open_session(&conn, Some(&token), 1).unwrap(), token);
    }

    #[test]
    fn user_and_consultant_slots_are_independent() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        conn.execute_batch(
            "INSERT INTO users (id, email, password_hash) VALUES (7, 'u@x.io', 'h');
             INSERT INTO consultants (id, name, email, specialization) VALUES (3, 'C', 'c@x.io', 'Sleep');",
        )
        .unwrap();

        let token = create_session(&conn, 1).unwrap();
        set_user(&conn, &token, &UserIdentity { id: 7, email: "u@x.io".into() }).unwrap();
        set_consultant(&conn, &token, &ConsultantIdentity { id: 3, email: "c@x.io".into() })
            .unwrap();

        let ctx = resolve(&conn, &token).unwrap().unwrap();
        assert_eq!(ctx.user_id(), Some(7));
        assert_eq!(ctx.consultant.as_ref().map(|c| c.id), Some(3));

        delete_session(&conn, &token).unwrap();
        assert!(resolve(&conn, &token).unwrap().is_none());
    }

    #[test]
    fn consultant_falls_back_to_email_lookup() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        conn.execute(
            "INSERT INTO consultants (id, name, email, specialization) VALUES (5, 'C', 'c@x.io', 'Sleep')",
            [],
        )
        .unwrap();
        let token = create_session(&conn, 1).unwrap();
        conn.execute(
            "UPDATE sessions SET consultant_email = 'c@x.io' WHERE token = ?1",
            params![token],
        )
        .unwrap();

        let ctx = resolve(&conn, &token).unwrap().unwrap();
        assert_eq!(ctx.consultant.map(|c| c.id), Some(5));

        let pinned: Option<i64> = conn
            .query_row(
                "SELECT consultant_id FROM sessions WHERE token = ?1",
                params![token],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(pinned, Some(5));
    }
}
