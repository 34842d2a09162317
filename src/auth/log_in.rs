//! Exchanging a username and password for a bearer token.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;
use time::Duration;

use crate::{
    Error,
    auth::{AuthState, Token, create_token},
    db::lock_connection,
    extract::JsonBody,
    get_user_by_username,
    validation::{Validator, non_zero},
};

/// The username and password entered at log-in.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    /// The username entered during log-in.
    pub username: String,
    /// The password entered during log-in.
    pub password: String,
}

/// Check the user's credentials and issue a token that is valid for `ttl`.
///
/// # Errors
///
/// This function will return a:
/// - [Error::Validation] if the username or password is empty,
/// - [Error::InvalidCredentials] if the username is unknown or the password is wrong,
/// - [Error::HashingError] if the password could not be verified.
pub fn log_in(
    username: &str,
    password: &str,
    ttl: Duration,
    connection: &Connection,
) -> Result<Token, Error> {
    let mut validator = Validator::new();
    validator.check(non_zero(&username), "username", "Must be provided");
    validator.check(non_zero(&password), "password", "Must be provided");
    validator.finish()?;

    let user = get_user_by_username(username, connection).map_err(|error| match error {
        Error::NotFound => Error::InvalidCredentials,
        error => error,
    })?;

    let password_is_correct = user
        .password_hash
        .verify(password)
        .map_err(|error| Error::HashingError(error.to_string()))?;

    if !password_is_correct {
        tracing::info!("failed log-in attempt for user {}", user.id);
        return Err(Error::InvalidCredentials);
    }

    create_token(user.id, ttl, connection)
}

/// Handler for log-in requests.
///
/// Responds with `201 Created` and the new token.
pub async fn log_in_endpoint(
    State(state): State<AuthState>,
    JsonBody(credentials): JsonBody<Credentials>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let token = log_in(
        &credentials.username,
        &credentials.password,
        state.token_duration,
        &connection,
    )?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "authentication_token": token })),
    )
        .into_response())
}


#[cfg(test)]
mod log_in_endpoint_tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use crate::{
        endpoints,
        test_utils::{must_create_test_server, must_register},
    };

    #[tokio::test]
    async fn log_in_returns_created_token() {
        let server = must_create_test_server();
        must_register(&server, "alice").await;

        let response = server
            .post(endpoints::LOG_IN)
            .json(&json!({ "username": "alice", "password": "averysafeandsecurepassword" }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        let token = body["authentication_token"]["token"].as_str().unwrap();
        assert_eq!(token.len(), 26);
        assert!(body["authentication_token"]["expiry"].is_string());
    }

    #[tokio::test]
    async fn log_in_with_wrong_password_is_unauthorized() {
        let server = must_create_test_server();
        must_register(&server, "alice").await;

        server
            .post(endpoints::LOG_IN)
            .json(&json!({ "username": "alice", "password": "notthepassword" }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }
}
