use rand::Rng;
use rusqlite::{params, OptionalExtension};

use crate::db::models::{User, UserId};
use crate::social::ServiceResult;
use crate::state::DbPool;

/// Create a new session for a user. Returns the session token.
pub fn create_session(pool: &DbPool, user_id: UserId, hours: u64) -> ServiceResult<String> {
    let conn = pool.get()?;
    let token = generate_token();

    conn.execute(
        "INSERT INTO sessions (token, user_id, expires_at) VALUES (?1, ?2, datetime('now', ?3))",
        params![token, user_id, format!("+{} hours", hours)],
    )?;

    Ok(token)
}

/// The user a live session token belongs to.
pub fn user_for_token(pool: &DbPool, token: &str) -> ServiceResult<Option<User>> {
    let conn = pool.get()?;
    let user = conn
        .query_row(
            "SELECT u.id, u.username, u.bio, u.profile_image, u.created_at
             FROM sessions s JOIN users u ON u.id = s.user_id
             WHERE s.token = ?1 AND s.expires_at > datetime('now')",
            params![token],
            User::from_row,
        )
        .optional()?;
    Ok(user)
}

/// Delete a session by token.
pub fn delete_session(pool: &DbPool, token: &str) -> ServiceResult<()> {
    let conn = pool.get()?;
    conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(())
}

/// Drop sessions that have run out. Returns how many were removed.
pub fn purge_expired(pool: &DbPool) -> ServiceResult<usize> {
    let conn = pool.get()?;
    let removed = conn.execute(
        "DELETE FROM sessions WHERE expires_at <= datetime('now')",
        [],
    )?;
    Ok(removed)
}

/// Generate a cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, run_migrations};
    use crate::social::identity::register;

    fn pool() -> (tempfile::TempDir, DbPool) {
        let tmp = tempfile::tempdir().unwrap();
        let pool = create_pool(&tmp.path().join("test.db")).unwrap();
        run_migrations(&pool).unwrap();
        (tmp, pool)
    }

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
    fn session_resolves_to_user_until_deleted() {
        let (_tmp, pool) = pool();
        let id = register(&pool, "alice", "pw", 4).unwrap();
        let token = create_session(&pool, id, 1).unwrap();

        let user = user_for_token(&pool, &token).unwrap().unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.username, "alice");

        delete_session(&pool, &token).unwrap();
        assert!(user_for_token(&pool, &token).unwrap().is_none());
    }

    #[test]
    fn expired_sessions_do_not_resolve() {
        let (_tmp, pool) = pool();
        let id = register(&pool, "alice", "pw", 4).unwrap();
        let conn = pool.get().unwrap();
        conn.execute(
            "INSERT INTO sessions (token, user_id, expires_at) VALUES ('old', ?1, datetime('now', '-1 hours'))",
            params![id],
        )
        .unwrap();

        assert!(user_for_token(&pool, "old").unwrap().is_none());
        assert_eq!(purge_expired(&pool).unwrap(), 1);
    }
}
