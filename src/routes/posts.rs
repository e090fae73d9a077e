use askama::Template;
use axum::extract::{Multipart, Path, State};
use axum::response::{Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;

use crate::db::models::{profile_path, PostId};
use crate::error::{notice_redirect, AppResult, NoticeExt};
use crate::extractors::{CurrentUser, Flash, MaybeUser, Origin};
use crate::media::images;
use crate::routes::forms::MultipartForm;
use crate::routes::home::{page, Nav};
use crate::social::content::{self, Draft};
use crate::social::feed::{self, PostView};
use crate::social::{reactions, Emoji};
use crate::state::AppState;

#[derive(Template)]
#[template(path = "pages/post_form.html")]
pub struct PostFormTemplate {
    pub nav: Nav,
}

#[derive(Template)]
#[template(path = "pages/post_view.html")]
pub struct PostViewTemplate {
    pub nav: Nav,
    pub post: PostView,
}

#[derive(Deserialize)]
pub struct SmileForm {
    #[serde(default)]
    pub reaction: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/post", get(new_post_page).post(create_post))
        .route("/delete-post/{id}", post(delete_post))
        .route("/smile/{id}", post(smile))
        .route("/view/{id}", get(view_post))
}

/// GET /post
pub async fn new_post_page(user: CurrentUser, flash: Flash) -> Response {
    let nav = Nav::new(Some(&user), &flash);
    page(PostFormTemplate { nav }, &flash)
}

/// POST /post (multipart: content, link, image)
pub async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> AppResult<Response> {
    let form = MultipartForm::read(multipart, "image").await?;
    let draft = Draft {
        text: form.text("content"),
        link: form.text("link"),
        image: form.file,
    };

    let id = content::publish(&state, user.id, draft)
        .await
        .or_notice("/post")?;
    tracing::info!(post_id = id, user_id = user.id, "Post shared");

    Ok(notice_redirect("Your post has been shared!", "/feed"))
}

/// POST /delete-post/{id}: authors only
pub async fn delete_post(
    State(state): State<AppState>,
    user: CurrentUser,
    origin: Origin,
    Path(id): Path<PostId>,
) -> AppResult<Response> {
    let removed = content::delete_post(&state.db, id, user.id).or_notice(&origin.back())?;
    images::remove(&state.config.uploads_path(), &removed.image);
    tracing::info!(post_id = id, user_id = user.id, "Post deleted");

    Ok(notice_redirect("Post deleted.", &profile_path(&user.username)))
}

/// POST /smile/{id}: unknown emoji fall back to the default smile
pub async fn smile(
    State(state): State<AppState>,
    user: CurrentUser,
    origin: Origin,
    Path(id): Path<PostId>,
    Form(form): Form<SmileForm>,
) -> AppResult<Redirect> {
    let emoji = Emoji::normalize(&form.reaction);
    let back = origin.back();
    let outcome = reactions::react(&state.db, user.id, id, emoji).or_notice(&back)?;
    tracing::debug!(post_id = id, user_id = user.id, ?outcome, "Reacted");

    Ok(Redirect::to(&back))
}

/// GET /view/{id}
pub async fn view_post(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    flash: Flash,
    Path(id): Path<PostId>,
) -> AppResult<Response> {
    let post = feed::single(&state.db, maybe_user.id(), id)?;
    let nav = Nav::for_maybe(&maybe_user, &flash);
    Ok(page(PostViewTemplate { nav, post }, &flash))
}
