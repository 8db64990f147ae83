use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;
use validator::ValidationErrors;

use crate::{auth::error::AuthError, db::error::DatabaseError};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Database error")]
    Database(DatabaseError),

    #[error("Auth error")]
    Auth(AuthError),

    #[error("Validation error")]
    Validation(ValidationErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("Other error: {0}")]
    Other(anyhow::Error),
}

impl From<DatabaseError> for Error {
    fn from(value: DatabaseError) -> Self {
        Self::Database(value)
    }
}

impl From<AuthError> for Error {
    fn from(value: AuthError) -> Self {
        Self::Auth(value)
    }
}

fn message(status: StatusCode, msg: &str) -> axum::response::Response {
    (status, Json(json!({ "msg": msg }))).into_response()
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        match self {
            Error::Database(database_error) => match database_error {
                DatabaseError::DatabaseError(error) => {
                    tracing::error!(err.msg = %error, err.details = ?error, "Database Error");

                    message(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
                }
                DatabaseError::NotFound => message(StatusCode::NOT_FOUND, "Not found"),
            },
            Error::Auth(auth_error) => match auth_error {
                AuthError::JwtError(error) => {
                    tracing::error!(err.msg = %error, err.details = ?error, "JWT Error");

                    message(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
                }
                AuthError::PasswordError(error) => {
                    tracing::error!(err.msg = %error, err.details = ?error, "Password Hash Error");

                    message(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
                }
                AuthError::Unauthenticated => message(StatusCode::UNAUTHORIZED, "Unauthenticated"),
                AuthError::UserNotFound | AuthError::IncorrectCredential => {
                    message(StatusCode::UNAUTHORIZED, "Invalid email or password")
                }
                AuthError::Forbidden => message(StatusCode::FORBIDDEN, "Forbidden"),
            },
            Error::Validation(validation_error) => {
                tracing::warn!(err.msg = %validation_error, "Validation Error");

                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "msg": "Validation failed",
                        "detail": validation_error,
                    })),
                )
                    .into_response()
            }
            Error::BadRequest(msg) => message(StatusCode::BAD_REQUEST, &msg),
            Error::Other(error) => {
                tracing::error!(err.msg = %error, err.details = ?error, "Other Error");

                message(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}
