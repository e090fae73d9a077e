use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use crate::auth::cookies::{decode_flash, get_cookie_value, FLASH_COOKIE};
use crate::auth::session;
use crate::db::models::UserId;
use crate::error::AppError;
use crate::state::AppState;

/// Represents the currently authenticated user.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: UserId,
    pub username: String,
    pub profile_image: String,
}

/// Extractor that requires authentication.
/// Anonymous requests are redirected to the login page.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = get_cookie_value(&parts.headers, &state.config.auth.cookie_name)
            .ok_or(AppError::LoginRequired)?;

        let user = session::user_for_token(&state.db, token)?.ok_or(AppError::LoginRequired)?;
        Ok(CurrentUser {
            id: user.id,
            username: user.username,
            profile_image: user.profile_image,
        })
    }
}

/// Optional user extractor: `None` instead of a redirect when anonymous.
pub struct MaybeUser(pub Option<CurrentUser>);

impl MaybeUser {
    pub fn id(&self) -> Option<UserId> {
        self.0.as_ref().map(|u| u.id)
    }
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match CurrentUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(MaybeUser(Some(user))),
            Err(AppError::LoginRequired) => Ok(MaybeUser(None)),
            Err(e) => Err(e),
        }
    }
}

/// The pending flash notice, if the previous response left one.
#[derive(Debug, Clone, Default)]
pub struct Flash(pub Option<String>);

impl<S: Send + Sync> FromRequestParts<S> for Flash {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Flash(
            get_cookie_value(&parts.headers, FLASH_COOKIE)
                .map(decode_flash)
                .filter(|m| !m.is_empty()),
        ))
    }
}

/// The `Host` and `Referer` headers, for same-origin redirects.
#[derive(Debug, Clone, Default)]
pub struct Origin {
    pub host: Option<String>,
    pub referer: Option<String>,
}

impl Origin {
    /// The referring page if it is on this site, else the feed.
    pub fn back(&self) -> String {
        crate::auth::redirect::safe_redirect(self.referer.as_deref(), self.host.as_deref())
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Origin {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header_str = |name: header::HeaderName| {
            parts
                .headers
                .get(name)
                .and_then(|h| h.to_str().ok())
                .map(str::to_string)
        };
        Ok(Origin {
            host: header_str(header::HOST),
            referer: header_str(header::REFERER),
        })
    }
}
