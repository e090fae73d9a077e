use rusqlite::params;

use crate::db::models::UserId;
use crate::social::error::{ServiceError, ServiceResult};
use crate::state::DbPool;

/// Follow `followed`. Repeated calls are no-ops via `INSERT OR IGNORE`.
/// Following yourself is refused and writes nothing.
pub fn follow(pool: &DbPool, follower: UserId, followed: UserId) -> ServiceResult<()> {
    if follower == followed {
        return Err(ServiceError::Validation("You can't follow yourself.".into()));
    }

    let conn = pool.get()?;
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE id = ?1",
        params![followed],
        |row| row.get(0),
    )?;
    if !exists {
        return Err(ServiceError::NotFound("User not found.".into()));
    }

    let inserted = conn.execute(
        "INSERT OR IGNORE INTO follows (follower_id, followed_id) VALUES (?1, ?2)",
        params![follower, followed],
    )?;
    if inserted > 0 {
        tracing::debug!(follower, followed, "Follow edge created");
    }
    Ok(())
}

/// Remove the edge if present.
pub fn unfollow(pool: &DbPool, follower: UserId, followed: UserId) -> ServiceResult<()> {
    let conn = pool.get()?;
    conn.execute(
        "DELETE FROM follows WHERE follower_id = ?1 AND followed_id = ?2",
        params![follower, followed],
    )?;
    Ok(())
}

pub fn is_following(pool: &DbPool, follower: UserId, followed: UserId) -> ServiceResult<bool> {
    let conn = pool.get()?;
    let following = conn.query_row(
        "SELECT COUNT(*) > 0 FROM follows WHERE follower_id = ?1 AND followed_id = ?2",
        params![follower, followed],
        |row| row.get(0),
    )?;
    Ok(following)
}

pub fn follower_count(pool: &DbPool, user: UserId) -> ServiceResult<i64> {
    let conn = pool.get()?;
    let count = conn.query_row(
        "SELECT COUNT(*) FROM follows WHERE followed_id = ?1",
        params![user],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn following_count(pool: &DbPool, user: UserId) -> ServiceResult<i64> {
    let conn = pool.get()?;
    let count = conn.query_row(
        "SELECT COUNT(*) FROM follows WHERE follower_id = ?1",
        params![user],
        |row| row.get(0),
    )?;
    Ok(count)
}
