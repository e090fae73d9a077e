use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::auth::cookies::flash_cookie;
use crate::routes::home::{Html, NotFoundTemplate};
use crate::social::ServiceError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    #[error("Login required")]
    LoginRequired,

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Shown to the user as a flash notice on the page at `to`.
    #[error("{message}")]
    Notice { message: String, to: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Upload error: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn notice(message: impl Into<String>, to: impl Into<String>) -> Self {
        AppError::Notice {
            message: message.into(),
            to: to.into(),
        }
    }
}

/// Flash notice plus a 303 to `to`.
pub fn notice_redirect(message: &str, to: &str) -> Response {
    (
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, to.to_string()),
            (header::SET_COOKIE, flash_cookie(message)),
        ],
    )
        .into_response()
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(_) => AppError::NotFound,
            ServiceError::Auth(_) => AppError::LoginRequired,
            ServiceError::Database(e) => AppError::Database(e),
            ServiceError::Pool(e) => AppError::Pool(e),
            ServiceError::Hash(e) => AppError::Internal(e.to_string()),
            ServiceError::Task(e) => AppError::Internal(e.to_string()),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

/// Turn user-facing service errors into a notice on `to`.
pub trait NoticeExt<T> {
    fn or_notice(self, to: &str) -> Result<T, AppError>;
}

impl<T> NoticeExt<T> for Result<T, ServiceError> {
    fn or_notice(self, to: &str) -> Result<T, AppError> {
        self.map_err(|e| {
            if e.is_user_facing() {
                AppError::notice(e.to_string(), to)
            } else {
                e.into()
            }
        })
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound => {
                let mut response = Html(NotFoundTemplate::default()).into_response();
                *response.status_mut() = StatusCode::NOT_FOUND;
                return response;
            }
            AppError::LoginRequired => {
                return (StatusCode::SEE_OTHER, [(header::LOCATION, "/login")]).into_response();
            }
            AppError::Notice { message, to } => return notice_redirect(message, to),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Multipart(e) => {
                tracing::warn!("Multipart error: {}", e);
                (StatusCode::BAD_REQUEST, "Malformed upload".to_string())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, message).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn response_status(err: AppError) -> StatusCode {
        let response = err.into_response();
        response.status()
    }

    #[test]
    fn not_found_returns_404() {
        assert_eq!(response_status(AppError::NotFound), StatusCode::NOT_FOUND);
    }

    #[test]
    fn login_required_redirects_to_login() {
        let response = AppError::LoginRequired.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/login");
    }

    #[test]
    fn notice_sets_flash_and_redirects() {
        let response = AppError::notice("Username already taken.", "/register").into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/register");
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("chrpi_flash=Username+already+taken."));
    }

    #[test]
    fn bad_request_returns_400() {
        assert_eq!(
            response_status(AppError::BadRequest("oops".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn internal_returns_500() {
        assert_eq!(
            response_status(AppError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn user_facing_service_errors_become_notices() {
        let result: Result<(), ServiceError> = Err(ServiceError::ContentRejected);
        match result.or_notice("/post") {
            Err(AppError::Notice { to, message }) => {
                assert_eq!(to, "/post");
                assert!(message.contains("negative"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn storage_service_errors_stay_internal() {
        let result: Result<(), ServiceError> =
            Err(ServiceError::Database(rusqlite::Error::QueryReturnedNoRows));
        assert!(matches!(result.or_notice("/post"), Err(AppError::Database(_))));
    }
}
