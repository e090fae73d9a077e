use thiserror::Error;

/// Outcomes of social operations. The first six variants are user-facing
/// and carry the notice shown to the user; the rest are infrastructure.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Duplicate(String),

    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    Permission(String),

    #[error("That post seems a bit negative. Let's keep it uplifting!")]
    ContentRejected,

    #[error("{0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Password hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ServiceError {
    /// Whether the error should be shown to the user as a notice rather
    /// than turned into a server error.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            ServiceError::Validation(_)
                | ServiceError::Duplicate(_)
                | ServiceError::Auth(_)
                | ServiceError::Permission(_)
                | ServiceError::ContentRejected
                | ServiceError::NotFound(_)
        )
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_are_user_facing() {
        assert!(ServiceError::Validation("x".into()).is_user_facing());
        assert!(ServiceError::ContentRejected.is_user_facing());
        assert!(ServiceError::NotFound("x".into()).is_user_facing());
    }

    #[test]
    fn storage_errors_are_not_user_facing() {
        let err = ServiceError::from(rusqlite::Error::QueryReturnedNoRows);
        assert!(!err.is_user_facing());
    }
}
