use askama::Template;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::auth::cookies::{clear_cookie, FLASH_COOKIE};
use crate::extractors::{CurrentUser, Flash, MaybeUser};

/// Layout data shared by every page.
#[derive(Debug, Clone, Default)]
pub struct Nav {
    pub logged_in: bool,
    pub username: String,
    pub profile_path: String,
    pub flash: String,
}

impl Nav {
    pub fn new(user: Option<&CurrentUser>, flash: &Flash) -> Self {
        Self {
            logged_in: user.is_some(),
            username: user.map(|u| u.username.clone()).unwrap_or_default(),
            profile_path: user
                .map(|u| crate::db::models::profile_path(&u.username))
                .unwrap_or_default(),
            flash: flash.0.clone().unwrap_or_default(),
        }
    }

    pub fn for_maybe(user: &MaybeUser, flash: &Flash) -> Self {
        Self::new(user.0.as_ref(), flash)
    }
}

#[derive(Template)]
#[template(path = "pages/index.html")]
pub struct IndexTemplate {
    pub nav: Nav,
}

#[derive(Template, Default)]
#[template(path = "pages/404.html")]
pub struct NotFoundTemplate {
    pub nav: Nav,
}

/// Wrapper to render askama templates as axum responses
pub struct Html<T: Template>(pub T);

impl<T: Template> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Template render error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

/// Render a page, consuming the pending flash notice if one was shown.
pub fn page<T: Template>(template: T, flash: &Flash) -> Response {
    let mut response = Html(template).into_response();
    if flash.0.is_some() {
        if let Ok(value) = clear_cookie(FLASH_COOKIE).parse() {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    response
}

pub async fn index(maybe_user: MaybeUser, flash: Flash) -> Response {
    let nav = Nav::for_maybe(&maybe_user, &flash);
    page(IndexTemplate { nav }, &flash)
}

pub async fn not_found(maybe_user: MaybeUser, flash: Flash) -> Response {
    let nav = Nav::for_maybe(&maybe_user, &flash);
    let mut response = page(NotFoundTemplate { nav }, &flash);
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}
