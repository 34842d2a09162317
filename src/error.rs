//! Defines the app level error type and its conversion to JSON error responses.

use std::fmt::Display;

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::{HeaderValue, StatusCode, header::WWW_AUTHENTICATE},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::validation::ValidationErrors;

/// The entity a foreign key points at.
///
/// Used to report which referenced row was missing when a write failed a
/// foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// The category does not exist, or belongs to another user.
    Category,
    /// The account does not exist, or belongs to another user.
    Account,
    /// The owning user does not exist.
    User,
    /// A constraint that has no dedicated domain error, named by `table.column`.
    Other(String),
}

impl Reference {
    /// Convert the missing reference into the error reported to callers.
    ///
    /// A missing owner means the caller itself no longer exists, which is
    /// reported as [Error::NotFound] rather than as a bad reference.
    pub fn into_error(self) -> Error {
        match self {
            Reference::User => Error::NotFound,
            reference => Error::InvalidReference(reference),
        }
    }
}

impl Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reference::Category => write!(f, "this category does not exist"),
            Reference::Account => write!(f, "this account does not exist"),
            Reference::User => write!(f, "this user does not exist"),
            Reference::Other(constraint) => write!(f, "reference does not exist: {constraint}"),
        }
    }
}

/// The ledger records that may not be changed through the normal operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectedEntity {
    /// The initial balance category cannot be updated or deleted.
    InitialCategory,
    /// Transactions cannot be created in, or moved to, the initial balance category.
    InitialCategoryUse,
    /// The opening transaction of an account cannot be deleted, or moved to
    /// another account or category.
    InitialTransaction,
    /// The opening transaction of an account cannot be refunded.
    InitialTransactionRefund,
    /// A category that transactions still refer to cannot be deleted.
    CategoryInUse,
}

impl Display for ProtectedEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            ProtectedEntity::InitialCategory => "can't modify the initial balance category",
            ProtectedEntity::InitialCategoryUse => {
                "can't create transaction with the initial balance category"
            }
            ProtectedEntity::InitialTransaction => "can't modify the initial balance transaction",
            ProtectedEntity::InitialTransactionRefund => {
                "can't refund the initial balance transaction"
            }
            ProtectedEntity::CategoryInUse => "can't delete a category that has transactions",
        };

        write!(f, "{message}")
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The requested resource was not found.
    ///
    /// This covers rows that do not exist, non-positive IDs, and rows owned by
    /// another user, so that callers cannot learn whether another user's
    /// resource exists.
    #[error("the requested resource could not be found")]
    NotFound,

    /// One or more fields failed validation.
    ///
    /// Holds every violation found, not just the first.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// A conditional update matched zero rows because another writer changed
    /// the row after it was read.
    ///
    /// The client should fetch the latest version and try again.
    #[error("unable to update the record due to an edit conflict")]
    EditConflict,

    /// A referenced category or account did not exist at write time.
    #[error("{0}")]
    InvalidReference(Reference),

    /// The operation targets an initial balance record or a category still in use.
    #[error("{0}")]
    Protected(ProtectedEntity),

    /// The request body or path could not be parsed.
    ///
    /// `status` is the status axum gives the rejection, e.g. `415` for a body
    /// without a JSON content type.
    #[error("{message}")]
    MalformedRequest {
        /// The status to respond with.
        status: StatusCode,
        /// Why the request was rejected.
        message: String,
    },

    /// The username is already taken.
    #[error("a user with this username already exists")]
    DuplicateUsername,

    /// The username and password do not match a registered user.
    #[error("invalid authentication credentials")]
    InvalidCredentials,

    /// The bearer token is missing, malformed, unknown or expired.
    #[error("invalid or missing authentication token")]
    InvalidToken,

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The operating system could not provide random bytes for a token.
    #[error("could not generate token: {0}")]
    TokenGeneration(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    && desc.ends_with("user.username") =>
            {
                Error::DuplicateUsername
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::MalformedRequest {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Error::MalformedRequest {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status_code, message) = match self {
            Error::NotFound => (
                StatusCode::NOT_FOUND,
                json!("The resource you're looking for doesn't exist."),
            ),
            Error::Validation(errors) => (StatusCode::UNPROCESSABLE_ENTITY, json!(errors)),
            Error::EditConflict => (
                StatusCode::CONFLICT,
                json!("Unable to update the record due to an edit conflict, please try again."),
            ),
            Error::InvalidReference(reference) => {
                (StatusCode::BAD_REQUEST, json!(reference.to_string()))
            }
            Error::Protected(ProtectedEntity::CategoryInUse) => (
                StatusCode::CONFLICT,
                json!(ProtectedEntity::CategoryInUse.to_string()),
            ),
            Error::Protected(entity) => (StatusCode::FORBIDDEN, json!(entity.to_string())),
            Error::MalformedRequest { status, message } => (status, json!(message)),
            Error::DuplicateUsername => (
                StatusCode::CONFLICT,
                json!({ "username": "A user with this username already exists" }),
            ),
            Error::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                json!("Invalid credentials. Verify your login information."),
            ),
            Error::InvalidToken => {
                let body = Json(json!({
                    "error": "Invalid or missing authentication token.",
                }));
                let mut response = (StatusCode::UNAUTHORIZED, body).into_response();
                response
                    .headers_mut()
                    .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));

                return response;
            }
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!("Something went wrong on our end. Please try again later."),
                )
            }
        };

        let body = Json(json!({
            "error": message,
        }));

        (status_code, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use crate::{
        Error, ProtectedEntity, Reference,
        validation::{ValidationErrors, Validator},
    };

    #[test]
    fn missing_owner_is_not_found() {
        assert_eq!(Reference::User.into_error(), Error::NotFound);
    }

    #[test]
    fn missing_category_is_invalid_reference() {
        assert_eq!(
            Reference::Category.into_error(),
            Error::InvalidReference(Reference::Category)
        );
    }

    #[test]
    fn status_codes() {
        let mut validator = Validator::new();
        validator.check(false, "name", "Must be provided");
        let errors = match validator.finish() {
            Err(Error::Validation(errors)) => errors,
            other => panic!("expected validation errors, got {other:?}"),
        };

        let cases = [
            (Error::NotFound, StatusCode::NOT_FOUND),
            (Error::Validation(errors), StatusCode::UNPROCESSABLE_ENTITY),
            (
                Error::Validation(ValidationErrors::default()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (Error::EditConflict, StatusCode::CONFLICT),
            (
                Error::InvalidReference(Reference::Account),
                StatusCode::BAD_REQUEST,
            ),
            (
                Error::Protected(ProtectedEntity::InitialCategory),
                StatusCode::FORBIDDEN,
            ),
            (
                Error::Protected(ProtectedEntity::CategoryInUse),
                StatusCode::CONFLICT,
            ),
            (
                Error::MalformedRequest {
                    status: StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    message: "Expected request with `Content-Type: application/json`".to_owned(),
                },
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ),
            (Error::DuplicateUsername, StatusCode::CONFLICT),
            (Error::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (Error::InvalidToken, StatusCode::UNAUTHORIZED),
            (Error::DatabaseLockError, StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, want_status) in cases {
            let description = error.to_string();
            let response = error.into_response();

            assert_eq!(response.status(), want_status, "{description}");
        }
    }

    #[test]
    fn invalid_token_sets_authenticate_header() {
        let response = Error::InvalidToken.into_response();

        assert_eq!(
            response.headers().get("www-authenticate").unwrap(),
            "Bearer"
        );
    }
}
