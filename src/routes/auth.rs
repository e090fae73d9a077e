use askama::Template;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{AppendHeaders, IntoResponse, Response};
use axum::routing::get;
use axum::{Form, Router};
use serde::Deserialize;

use crate::auth::captcha::Challenge;
use crate::auth::cookies::{
    captcha_cookie, clear_cookie, flash_cookie, get_cookie_value, session_cookie, CAPTCHA_COOKIE,
};
use crate::auth::redirect::safe_redirect;
use crate::auth::session;
use crate::error::{AppError, AppResult, NoticeExt};
use crate::extractors::{Flash, MaybeUser, Origin};
use crate::routes::home::{page, Nav};
use crate::social::identity;
use crate::state::AppState;

// -- Templates --

#[derive(Template)]
#[template(path = "pages/register.html")]
pub struct RegisterTemplate {
    pub nav: Nav,
    pub a: u32,
    pub b: u32,
}

#[derive(Template)]
#[template(path = "pages/login.html")]
pub struct LoginTemplate {
    pub nav: Nav,
    pub next: String,
}

// -- Request types --

#[derive(Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub captcha: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", get(register_page).post(register))
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
}

/// GET /register, with a fresh arithmetic captcha each time
pub async fn register_page(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    flash: Flash,
) -> Response {
    let challenge = Challenge::random();
    let id = state.captchas.lock().await.issue(challenge);

    let nav = Nav::for_maybe(&maybe_user, &flash);
    let mut response = page(
        RegisterTemplate {
            nav,
            a: challenge.a,
            b: challenge.b,
        },
        &flash,
    );
    if let Ok(value) = captcha_cookie(&id).parse() {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    response
}

/// POST /register
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<RegisterForm>,
) -> AppResult<Response> {
    if form.username.trim().is_empty() || form.password.is_empty() {
        return Err(AppError::notice(
            "Please provide username and password.",
            "/register",
        ));
    }

    let captcha_ok = match get_cookie_value(&headers, CAPTCHA_COOKIE) {
        Some(id) => state.captchas.lock().await.verify(id, &form.captcha),
        None => false,
    };
    if !captcha_ok {
        return Err(AppError::notice("Math captcha incorrect.", "/register"));
    }

    let pool = state.db.clone();
    let cost = state.config.auth.bcrypt_cost;
    tokio::task::spawn_blocking(move || {
        identity::register(&pool, &form.username, &form.password, cost)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))?
    .or_notice("/register")?;

    Ok((
        StatusCode::SEE_OTHER,
        AppendHeaders([
            (header::LOCATION, "/login".to_string()),
            (header::SET_COOKIE, flash_cookie("Registered. Please log in.")),
            (header::SET_COOKIE, clear_cookie(CAPTCHA_COOKIE)),
        ]),
    )
        .into_response())
}

/// GET /login
pub async fn login_page(
    maybe_user: MaybeUser,
    flash: Flash,
    Query(query): Query<LoginQuery>,
) -> Response {
    let nav = Nav::for_maybe(&maybe_user, &flash);
    let next = query.next.unwrap_or_default();
    page(LoginTemplate { nav, next }, &flash)
}

/// POST /login: starts a session and returns to `next` if it is on this site
pub async fn login(
    State(state): State<AppState>,
    origin: Origin,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let pool = state.db.clone();
    let (username, password) = (form.username, form.password);
    let user_id = tokio::task::spawn_blocking(move || {
        identity::authenticate(&pool, &username, &password)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))?
    .or_notice("/login")?;

    let token = session::create_session(&state.db, user_id, state.config.auth.session_hours)?;
    let target = safe_redirect(form.next.as_deref(), origin.host.as_deref());
    tracing::info!(user_id, "Logged in");

    Ok((
        StatusCode::SEE_OTHER,
        AppendHeaders([
            (header::LOCATION, target),
            (
                header::SET_COOKIE,
                session_cookie(
                    &state.config.auth.cookie_name,
                    &token,
                    state.config.auth.session_hours,
                ),
            ),
            (header::SET_COOKIE, flash_cookie("Logged in.")),
        ]),
    )
        .into_response())
}

/// GET /logout: delete session and go home
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    let cookie_name = &state.config.auth.cookie_name;
    if let Some(token) = get_cookie_value(&headers, cookie_name) {
        session::delete_session(&state.db, token)?;
    }

    Ok((
        StatusCode::SEE_OTHER,
        AppendHeaders([
            (header::LOCATION, "/".to_string()),
            (header::SET_COOKIE, clear_cookie(cookie_name)),
            (header::SET_COOKIE, flash_cookie("Logged out.")),
        ]),
    )
        .into_response())
}
