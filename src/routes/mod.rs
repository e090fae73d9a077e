pub mod assets;
pub mod auth;
pub mod feed;
pub mod forms;
pub mod home;
pub mod posts;
pub mod profile;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The whole site, ready to serve.
pub fn app(state: AppState) -> Router {
    let body_limit = state.config.storage.max_upload_bytes;

    Router::new()
        .route("/", get(home::index))
        .route("/assets/{*path}", get(assets::serve))
        .route("/uploads/{filename}", get(assets::uploads))
        .merge(auth::router())
        .merge(feed::router())
        .merge(posts::router())
        .merge(profile::router())
        .fallback(home::not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
