use std::sync::Arc;

use rusqlite::{params, OptionalExtension, TransactionBehavior};

use crate::db::models::{Post, PostId, UserId};
use crate::media::{images, sentiment};
use crate::social::error::{ServiceError, ServiceResult};
use crate::state::{AppState, DbPool};

const EMPTY_POST: &str = "Please include something in your post (content, link, or image).";

/// A file picked in the post or profile form.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// What the author submitted, before moderation and media handling.
#[derive(Debug, Clone, Default)]
pub struct Draft {
    pub text: String,
    pub link: String,
    pub image: Option<Upload>,
}

impl Draft {
    fn is_empty(&self) -> bool {
        self.text.is_empty() && self.link.is_empty() && self.image.is_none()
    }
}

/// Moderate, resolve media and store a post.
///
/// Network and image work happens before any database write, so no
/// transaction is held open across the link preview fetch.
pub async fn publish(state: &AppState, author: UserId, draft: Draft) -> ServiceResult<PostId> {
    let draft = Draft {
        text: draft.text.trim().to_string(),
        link: draft.link.trim().to_string(),
        image: draft.image.filter(|u| !u.filename.is_empty() && !u.bytes.is_empty()),
    };
    if draft.is_empty() {
        return Err(ServiceError::Validation(EMPTY_POST.into()));
    }
    if !draft.link.is_empty() && !is_web_link(&draft.link) {
        return Err(ServiceError::Validation(
            "Links must start with http:// or https://.".into(),
        ));
    }

    let threshold = state.config.moderation.negativity_threshold;
    let scorer = Arc::clone(&state.scorer);
    let text = draft.text.clone();
    let allowed =
        tokio::task::spawn_blocking(move || sentiment::allows(scorer.as_ref(), &text, threshold))
            .await?;
    if !allowed {
        tracing::info!(author, "Rejected negative post");
        return Err(ServiceError::ContentRejected);
    }

    let image = match draft.image {
        Some(upload) => images::store_upload(
            state.config.uploads_path(),
            upload.filename,
            upload.bytes,
            state.config.storage.post_image_max,
        )
        .await
        .unwrap_or_default(),
        None if !draft.link.is_empty() => state
            .previewer
            .preview_image(&draft.link)
            .await
            .unwrap_or_default(),
        None => String::new(),
    };

    create_post(&state.db, author, &draft.text, &image, &draft.link)
}

fn is_web_link(link: &str) -> bool {
    url::Url::parse(link).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

/// Store a post whose media is already resolved.
pub fn create_post(
    pool: &DbPool,
    author: UserId,
    text: &str,
    image: &str,
    link: &str,
) -> ServiceResult<PostId> {
    if text.is_empty() && image.is_empty() && link.is_empty() {
        return Err(ServiceError::Validation(EMPTY_POST.into()));
    }

    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO posts (user_id, content, image, link) VALUES (?1, ?2, ?3, ?4)",
        params![author, text, image, link],
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(post_id = id, author, "Post created");
    Ok(id)
}

pub fn find_post(pool: &DbPool, id: PostId) -> ServiceResult<Option<Post>> {
    let conn = pool.get()?;
    let post = conn
        .query_row(
            &format!("SELECT {} FROM posts WHERE posts.id = ?1", Post::COLUMNS),
            params![id],
            Post::from_row,
        )
        .optional()?;
    Ok(post)
}

/// Delete a post and its reactions together. Only the author may do this.
/// Returns the deleted post so the caller can clean up its media.
pub fn delete_post(pool: &DbPool, id: PostId, requester: UserId) -> ServiceResult<Post> {
    let mut conn = pool.get()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let post = tx
        .query_row(
            &format!("SELECT {} FROM posts WHERE posts.id = ?1", Post::COLUMNS),
            params![id],
            Post::from_row,
        )
        .optional()?
        .ok_or_else(|| ServiceError::NotFound("Post not found.".into()))?;

    if post.user_id != requester {
        tracing::warn!(post_id = id, requester, "Refused to delete another user's post");
        return Err(ServiceError::Permission(
            "You can only delete your own posts.".into(),
        ));
    }

    tx.execute("DELETE FROM post_smiles WHERE post_id = ?1", params![id])?;
    tx.execute("DELETE FROM posts WHERE id = ?1", params![id])?;
    tx.commit()?;

    tracing::info!(post_id = id, "Post deleted");
    Ok(post)
}
