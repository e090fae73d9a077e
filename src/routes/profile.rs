use askama::Template;
use axum::extract::{Multipart, Path, State};
use axum::response::{Redirect, Response};
use axum::routing::{get, post};
use axum::Router;

use crate::db::models::{User, UserId};
use crate::error::{notice_redirect, AppError, AppResult, NoticeExt};
use crate::extractors::{CurrentUser, Flash, MaybeUser, Origin};
use crate::media::images;
use crate::routes::forms::MultipartForm;
use crate::routes::home::{page, Nav};
use crate::social::feed::{self, FeedMode, PostView};
use crate::social::{graph, identity, ServiceResult};
use crate::state::{AppState, DbPool};

#[derive(Template)]
#[template(path = "pages/profile.html")]
pub struct ProfileTemplate {
    pub nav: Nav,
    pub profile: User,
    pub followers: i64,
    pub following: i64,
    pub is_self: bool,
    pub is_following: bool,
    pub posts: Vec<PostView>,
}

#[derive(Template)]
#[template(path = "pages/edit_profile.html")]
pub struct EditProfileTemplate {
    pub nav: Nav,
    pub bio: String,
    pub profile_image: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/user/{username}", get(profile_page))
        .route("/edit-profile", get(edit_profile_page).post(edit_profile))
        .route("/follow/{user_id}", post(follow))
        .route("/unfollow/{user_id}", post(unfollow))
}

/// GET /user/{username}
pub async fn profile_page(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    flash: Flash,
    Path(username): Path<String>,
) -> AppResult<Response> {
    let profile = identity::find_by_username(&state.db, &username)?.ok_or(AppError::NotFound)?;

    let viewer = maybe_user.id();
    let is_self = viewer == Some(profile.id);
    let is_following = match viewer {
        Some(me) if !is_self => graph::is_following(&state.db, me, profile.id)?,
        _ => false,
    };

    let posts = feed::compose(
        &state.db,
        viewer,
        &FeedMode::Author(profile.id),
        state.config.feed.page_size,
    )?;

    let template = ProfileTemplate {
        nav: Nav::for_maybe(&maybe_user, &flash),
        followers: graph::follower_count(&state.db, profile.id)?,
        following: graph::following_count(&state.db, profile.id)?,
        is_self,
        is_following,
        posts,
        profile,
    };
    Ok(page(template, &flash))
}

/// GET /edit-profile
pub async fn edit_profile_page(
    State(state): State<AppState>,
    user: CurrentUser,
    flash: Flash,
) -> AppResult<Response> {
    let me = identity::find_by_id(&state.db, user.id)?.ok_or(AppError::LoginRequired)?;
    let nav = Nav::new(Some(&user), &flash);
    Ok(page(
        EditProfileTemplate {
            nav,
            bio: me.bio,
            profile_image: me.profile_image,
        },
        &flash,
    ))
}

/// POST /edit-profile (multipart: bio, image)
///
/// An image that cannot be stored leaves the current avatar in place.
pub async fn edit_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> AppResult<Response> {
    let form = MultipartForm::read(multipart, "image").await?;
    let bio = form.text("bio").trim().to_string();

    let image = match form.file {
        Some(upload) => {
            images::store_upload(
                state.config.uploads_path(),
                upload.filename,
                upload.bytes,
                state.config.storage.profile_image_max,
            )
            .await
        }
        None => None,
    };

    save_profile(
        &state.db,
        &state.config.uploads_path(),
        &user,
        &bio,
        image.as_deref(),
    )
    .or_notice("/edit-profile")?;
    tracing::info!(user_id = user.id, "Profile updated");

    Ok(notice_redirect(
        "Profile updated.",
        &crate::db::models::profile_path(&user.username),
    ))
}

/// Store the new bio and avatar. Whichever avatar file ends up unreferenced
/// is removed: the old one on success, the new one on failure.
fn save_profile(
    pool: &DbPool,
    uploads: &std::path::Path,
    user: &CurrentUser,
    bio: &str,
    image: Option<&str>,
) -> ServiceResult<()> {
    let saved = identity::update_profile(pool, user.id, bio, image);
    if let Some(new_image) = image {
        let unused = if saved.is_ok() {
            user.profile_image.as_str()
        } else {
            new_image
        };
        images::remove(uploads, unused);
    }
    saved
}

/// POST /follow/{user_id}
pub async fn follow(
    State(state): State<AppState>,
    user: CurrentUser,
    origin: Origin,
    Path(target): Path<UserId>,
) -> AppResult<Redirect> {
    let back = origin.back();
    graph::follow(&state.db, user.id, target).or_notice(&back)?;
    Ok(Redirect::to(&back))
}

/// POST /unfollow/{user_id}
pub async fn unfollow(
    State(state): State<AppState>,
    user: CurrentUser,
    origin: Origin,
    Path(target): Path<UserId>,
) -> AppResult<Redirect> {
    let back = origin.back();
    graph::unfollow(&state.db, user.id, target).or_notice(&back)?;
    Ok(Redirect::to(&back))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use tempfile::TempDir;

    fn setup() -> (TempDir, DbPool, std::path::PathBuf) {
        let tmp = TempDir::new().unwrap();
        let pool = db::create_pool(&tmp.path().join("test.db")).unwrap();
        db::run_migrations(&pool).unwrap();
        let uploads = tmp.path().join("uploads");
        std::fs::create_dir_all(&uploads).unwrap();
        (tmp, pool, uploads)
    }

    fn viewer(id: UserId, profile_image: &str) -> CurrentUser {
        CurrentUser {
            id,
            username: "alice".to_string(),
            profile_image: profile_image.to_string(),
        }
    }

    #[test]
    fn new_avatar_replaces_old_file() {
        let (_tmp, pool, uploads) = setup();
        let id = identity::register(&pool, "alice", "pw", 4).unwrap();
        std::fs::write(uploads.join("old.png"), b"old").unwrap();
        std::fs::write(uploads.join("new.png"), b"new").unwrap();

        let user = viewer(id, "/uploads/old.png");
        save_profile(&pool, &uploads, &user, "hello", Some("/uploads/new.png")).unwrap();

        assert!(!uploads.join("old.png").exists());
        assert!(uploads.join("new.png").exists());
        let me = identity::find_by_id(&pool, id).unwrap().unwrap();
        assert_eq!(me.profile_image, "/uploads/new.png");
        assert_eq!(me.bio, "hello");
    }

    #[test]
    fn failed_update_removes_the_new_avatar() {
        let (_tmp, pool, uploads) = setup();
        std::fs::write(uploads.join("old.png"), b"old").unwrap();
        std::fs::write(uploads.join("new.png"), b"new").unwrap();

        // No such user, so the update matches nothing.
        let user = viewer(999, "/uploads/old.png");
        let result = save_profile(&pool, &uploads, &user, "hi", Some("/uploads/new.png"));

        assert!(result.is_err());
        assert!(!uploads.join("new.png").exists());
        assert!(uploads.join("old.png").exists());
    }
}
