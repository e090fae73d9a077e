use rusqlite::{params, OptionalExtension};

use crate::db::is_unique_violation;
use crate::db::models::{User, UserId};
use crate::social::error::{ServiceError, ServiceResult};
use crate::state::DbPool;

const INVALID_CREDENTIALS: &str = "Invalid credentials.";

/// Create an account. Uniqueness is left to the UNIQUE constraint so two
/// racing registrations cannot both succeed.
pub fn register(
    pool: &DbPool,
    username: &str,
    password: &str,
    cost: u32,
) -> ServiceResult<UserId> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(ServiceError::Validation(
            "Please provide username and password.".into(),
        ));
    }

    let hash = bcrypt::hash(password, cost)?;
    let conn = pool.get()?;
    match conn.execute(
        "INSERT INTO users (username, password) VALUES (?1, ?2)",
        params![username, hash],
    ) {
        Ok(_) => {
            let id = conn.last_insert_rowid();
            tracing::info!(user_id = id, "Registered user {}", username);
            Ok(id)
        }
        Err(e) if is_unique_violation(&e) => {
            Err(ServiceError::Duplicate("Username already taken.".into()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Check a username/password pair. Unknown users and wrong passwords are
/// indistinguishable to the caller.
pub fn authenticate(pool: &DbPool, username: &str, password: &str) -> ServiceResult<UserId> {
    let conn = pool.get()?;
    let row: Option<(UserId, String)> = conn
        .query_row(
            "SELECT id, password FROM users WHERE username = ?1",
            params![username.trim()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let (id, hash) = row.ok_or_else(|| ServiceError::Auth(INVALID_CREDENTIALS.into()))?;
    match bcrypt::verify(password, &hash) {
        Ok(true) => Ok(id),
        Ok(false) => Err(ServiceError::Auth(INVALID_CREDENTIALS.into())),
        Err(e) => {
            tracing::warn!(user_id = id, "Stored password hash unreadable: {}", e);
            Err(ServiceError::Auth(INVALID_CREDENTIALS.into()))
        }
    }
}

pub fn find_by_id(pool: &DbPool, id: UserId) -> ServiceResult<Option<User>> {
    let conn = pool.get()?;
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", User::COLUMNS),
            params![id],
            User::from_row,
        )
        .optional()?;
    Ok(user)
}

pub fn find_by_username(pool: &DbPool, username: &str) -> ServiceResult<Option<User>> {
    let conn = pool.get()?;
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE username = ?1", User::COLUMNS),
            params![username],
            User::from_row,
        )
        .optional()?;
    Ok(user)
}

/// Replace the bio and, when given, the profile image.
pub fn update_profile(
    pool: &DbPool,
    id: UserId,
    bio: &str,
    profile_image: Option<&str>,
) -> ServiceResult<()> {
    let conn = pool.get()?;
    let changed = match profile_image {
        Some(image) => conn.execute(
            "UPDATE users SET bio = ?1, profile_image = ?2 WHERE id = ?3",
            params![bio, image, id],
        )?,
        None => conn.execute(
            "UPDATE users SET bio = ?1 WHERE id = ?2",
            params![bio, id],
        )?,
    };

    if changed == 0 {
        return Err(ServiceError::NotFound("User not found.".into()));
    }
    Ok(())
}

/// Users whose name contains `query`, shortest names first.
pub fn search_users(pool: &DbPool, query: &str, limit: u32) -> ServiceResult<Vec<User>> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let conn = pool.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM users WHERE username LIKE ?1 ESCAPE '\\'
         ORDER BY length(username), username LIMIT ?2",
        User::COLUMNS
    ))?;
    let users = stmt
        .query_map(params![like_pattern(query), limit], User::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

/// `%query%` with LIKE wildcards in `query` escaped.
pub(crate) fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, run_migrations};

    fn pool() -> (tempfile::TempDir, DbPool) {
        let tmp = tempfile::tempdir().unwrap();
        let pool = create_pool(&tmp.path().join("test.db")).unwrap();
        run_migrations(&pool).unwrap();
        (tmp, pool)
    }

    #[test]
    fn register_then_authenticate() {
        let (_tmp, pool) = pool();
        let id = register(&pool, "alice", "hunter22", 4).unwrap();
        assert_eq!(authenticate(&pool, "alice", "hunter22").unwrap(), id);
    }

    #[test]
    fn password_is_not_stored_in_plaintext() {
        let (_tmp, pool) = pool();
        register(&pool, "alice", "hunter22", 4).unwrap();
        let stored: String = pool
            .get()
            .unwrap()
            .query_row("SELECT password FROM users WHERE username = 'alice'", [], |r| r.get(0))
            .unwrap();
        assert_ne!(stored, "hunter22");
        assert!(stored.starts_with("$2"));
    }

    #[test]
    fn register_trims_username_and_requires_fields() {
        let (_tmp, pool) = pool();
        assert!(matches!(
            register(&pool, "   ", "pw", 4),
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            register(&pool, "bob", "", 4),
            Err(ServiceError::Validation(_))
        ));
        register(&pool, "  bob  ", "pw", 4).unwrap();
        assert!(find_by_username(&pool, "bob").unwrap().is_some());
    }

    #[test]
    fn duplicate_registration_keeps_first_row() {
        let (_tmp, pool) = pool();
        let id = register(&pool, "alice", "first", 4).unwrap();
        let err = register(&pool, "alice", "second", 4).unwrap_err();
        assert!(matches!(err, ServiceError::Duplicate(_)));
        assert_eq!(authenticate(&pool, "alice", "first").unwrap(), id);
        assert!(authenticate(&pool, "alice", "second").is_err());
    }

    #[test]
    fn usernames_are_case_sensitive() {
        let (_tmp, pool) = pool();
        register(&pool, "Alice", "pw", 4).unwrap();
        register(&pool, "alice", "pw", 4).unwrap();
    }

    #[test]
    fn bad_credentials_are_auth_errors() {
        let (_tmp, pool) = pool();
        register(&pool, "alice", "pw", 4).unwrap();
        assert!(matches!(
            authenticate(&pool, "alice", "nope"),
            Err(ServiceError::Auth(_))
        ));
        assert!(matches!(
            authenticate(&pool, "nobody", "pw"),
            Err(ServiceError::Auth(_))
        ));
    }

    #[test]
    fn update_profile_keeps_image_when_none_given() {
        let (_tmp, pool) = pool();
        let id = register(&pool, "alice", "pw", 4).unwrap();
        update_profile(&pool, id, "hello", Some("/uploads/a.png")).unwrap();
        update_profile(&pool, id, "updated", None).unwrap();

        let user = find_by_id(&pool, id).unwrap().unwrap();
        assert_eq!(user.bio, "updated");
        assert_eq!(user.profile_image, "/uploads/a.png");
    }

    #[test]
    fn search_users_escapes_wildcards() {
        let (_tmp, pool) = pool();
        register(&pool, "a_b", "pw", 4).unwrap();
        register(&pool, "axb", "pw", 4).unwrap();

        let hits = search_users(&pool, "_", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].username, "a_b");
        assert!(search_users(&pool, "  ", 10).unwrap().is_empty());
    }
}
