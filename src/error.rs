use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found")]
    NotFound,

    #[error("Username already exists")]
    DuplicateUsername,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Password hashing error: {0}")]
    Hashing(#[from] bcrypt::BcryptError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Transaction or connection failures. Nothing was committed; the caller may retry.
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, AppError::Database(_) | AppError::Pool(_))
    }

    /// Stable machine-readable code, used by the GraphQL error extensions.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::NotFound => "NOT_FOUND",
            AppError::DuplicateUsername => "DUPLICATE_USERNAME",
            AppError::Database(_) | AppError::Pool(_) => "STORAGE_UNAVAILABLE",
            AppError::Hashing(_) | AppError::Internal(_) => "INTERNAL",
        }
    }
}

/// Extended SQLite result code of a failed statement, if any.
pub(crate) fn sqlite_code(err: &rusqlite::Error) -> Option<std::os::raw::c_int> {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => Some(e.extended_code),
        _ => None,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Please log in to continue".to_string(),
            ),
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            AppError::DuplicateUsername => {
                (StatusCode::CONFLICT, "Username already exists".to_string())
            }
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
            AppError::Hashing(e) => {
                tracing::error!("Password hashing error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
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

impl async_graphql::ErrorExtensions for AppError {
    fn extend(&self) -> async_graphql::Error {
        let message = match self {
            AppError::Database(_) | AppError::Pool(_) | AppError::Hashing(_) => {
                tracing::error!("{}", self);
                "Internal server error".to_string()
            }
            AppError::Internal(_) => {
                tracing::error!("{}", self);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        let code = self.code();
        async_graphql::Error::new(message).extend_with(|_, e| e.set("code", code))
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
    fn invalid_input_returns_400() {
        assert_eq!(
            response_status(AppError::InvalidInput("oops".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn unauthorized_returns_401() {
        assert_eq!(
            response_status(AppError::Unauthorized),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn not_found_returns_404() {
        assert_eq!(response_status(AppError::NotFound), StatusCode::NOT_FOUND);
    }

    #[test]
    fn duplicate_username_returns_409() {
        assert_eq!(
            response_status(AppError::DuplicateUsername),
            StatusCode::CONFLICT
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
    fn storage_errors_are_classified() {
        let err = AppError::Database(rusqlite::Error::QueryReturnedNoRows);
        assert!(err.is_storage_unavailable());
        assert_eq!(err.code(), "STORAGE_UNAVAILABLE");
        assert!(!AppError::NotFound.is_storage_unavailable());
    }
}
