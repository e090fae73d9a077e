use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use rust_embed::Embed;

use crate::error::AppError;
use crate::media::images;
use crate::state::AppState;

#[derive(Embed)]
#[folder = "assets/"]
struct Assets;

/// GET /assets/{*path}: the embedded stylesheet and friends
pub async fn serve(Path(path): Path<String>) -> Response {
    match Assets::get(&path) {
        Some(file) => file_response(&path, file.data.to_vec(), "public, max-age=86400"),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// GET /uploads/{filename}: stored post images and avatars
pub async fn uploads(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    if !images::is_safe_name(&name) {
        return AppError::NotFound.into_response();
    }

    match tokio::fs::read(state.config.uploads_path().join(&name)).await {
        Ok(bytes) => file_response(&name, bytes, "public, max-age=604800, immutable"),
        Err(e) => {
            tracing::debug!("Upload {} not served: {}", name, e);
            AppError::NotFound.into_response()
        }
    }
}

fn file_response(path: &str, body: Vec<u8>, cache: &'static str) -> Response {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime.as_ref().to_string()),
            (header::CACHE_CONTROL, cache.to_string()),
        ],
        body,
    )
        .into_response()
}
