use rusqlite::{params, OptionalExtension, TransactionBehavior};

use crate::db::models::{PostId, Reaction, UserId};
use crate::social::emoji::Emoji;
use crate::social::error::{ServiceError, ServiceResult};
use crate::state::DbPool;

/// What a call to [`react`] did to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactOutcome {
    /// First reaction by this user; the post's counter went up by one.
    Added,
    /// The user's existing reaction was relabelled; counter untouched.
    Changed,
}

/// Record `user`'s reaction to `post`.
///
/// Insert-if-absent and the counter bump share one IMMEDIATE transaction,
/// so concurrent first reactions from different users each count once.
pub fn react(pool: &DbPool, user: UserId, post: PostId, emoji: Emoji) -> ServiceResult<ReactOutcome> {
    let mut conn = pool.get()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let exists: bool = tx.query_row(
        "SELECT COUNT(*) > 0 FROM posts WHERE id = ?1",
        params![post],
        |row| row.get(0),
    )?;
    if !exists {
        return Err(ServiceError::NotFound("Post not found.".into()));
    }

    let inserted = tx.execute(
        "INSERT INTO post_smiles (user_id, post_id, reaction_emoji) VALUES (?1, ?2, ?3)
         ON CONFLICT (user_id, post_id) DO NOTHING",
        params![user, post, emoji.as_str()],
    )?;

    let outcome = if inserted == 1 {
        tx.execute(
            "UPDATE posts SET smiles = smiles + 1 WHERE id = ?1",
            params![post],
        )?;
        ReactOutcome::Added
    } else {
        tx.execute(
            "UPDATE post_smiles SET reaction_emoji = ?1 WHERE user_id = ?2 AND post_id = ?3",
            params![emoji.as_str(), user, post],
        )?;
        ReactOutcome::Changed
    };

    tx.commit()?;
    tracing::debug!(user, post, emoji = emoji.as_str(), ?outcome, "Reaction recorded");
    Ok(outcome)
}

pub fn find_reaction(pool: &DbPool, user: UserId, post: PostId) -> ServiceResult<Option<Reaction>> {
    let conn = pool.get()?;
    let reaction = conn
        .query_row(
            "SELECT user_id, post_id, reaction_emoji FROM post_smiles
             WHERE user_id = ?1 AND post_id = ?2",
            params![user, post],
            |row| {
                Ok(Reaction {
                    user_id: row.get(0)?,
                    post_id: row.get(1)?,
                    emoji: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(reaction)
}

/// Number of reaction rows for a post.
pub fn reaction_rows(pool: &DbPool, post: PostId) -> ServiceResult<i64> {
    let conn = pool.get()?;
    let count = conn.query_row(
        "SELECT COUNT(*) FROM post_smiles WHERE post_id = ?1",
        params![post],
        |row| row.get(0),
    )?;
    Ok(count)
}
