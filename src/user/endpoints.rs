//! Registration and the `/v1/users/me` endpoints.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde_json::json;

use crate::{
    AppState, Error,
    db::lock_connection,
    extract::JsonBody,
    user::{NewUser, UserId, UserPatch, create_user, delete_user, get_user_by_id, update_user},
};

/// The state needed for the user endpoints.
#[derive(Debug, Clone)]
pub struct UserState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The bcrypt cost for hashing new passwords.
    pub password_cost: u32,
}

impl FromRef<AppState> for UserState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            password_cost: state.password_cost,
        }
    }
}

/// Register a new user.
pub async fn register_user_endpoint(
    State(state): State<UserState>,
    JsonBody(new_user): JsonBody<NewUser>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let user = create_user(new_user, state.password_cost, &connection)?;

    Ok((StatusCode::CREATED, Json(json!({ "user": user }))).into_response())
}

/// Get the user making the request.
pub async fn get_current_user_endpoint(
    State(state): State<UserState>,
    Extension(user_id): Extension<UserId>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let user = get_user_by_id(user_id, &connection)?;

    Ok(Json(json!({ "user": user })).into_response())
}

/// Change the name and/or password of the user making the request.
pub async fn update_current_user_endpoint(
    State(state): State<UserState>,
    Extension(user_id): Extension<UserId>,
    JsonBody(patch): JsonBody<UserPatch>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let user = update_user(user_id, patch, state.password_cost, &connection)?;

    Ok(Json(json!({ "user": user })).into_response())
}

/// Delete the user making the request and everything they own.
pub async fn delete_current_user_endpoint(
    State(state): State<UserState>,
    Extension(user_id): Extension<UserId>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection)?;
    delete_user(user_id, &connection)?;

    Ok(Json(json!({ "message": "user successfully deleted" })).into_response())
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use crate::{endpoints, test_utils::{must_create_test_server, must_log_in, must_register}};

    #[tokio::test]
    async fn register_returns_created_user_without_password() {
        let server = must_create_test_server();

        let response = server
            .post(endpoints::USERS)
            .json(&json!({
                "username": "alice",
                "name": "Alice Smith",
                "password": "averysafeandsecurepassword",
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["user"]["username"], "alice");
        assert_eq!(body["user"]["version"], 1);
        assert!(body["user"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn register_with_invalid_fields_returns_field_errors() {
        let server = must_create_test_server();

        let response = server
            .post(endpoints::USERS)
            .json(&json!({ "username": "", "name": "Al", "password": "short" }))
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = response.json();
        assert_eq!(body["error"]["username"], "Must be provided");
        assert_eq!(body["error"]["password"], "Must be at least 8 bytes long");
        assert!(body["error"].get("name").is_none());
    }

    #[tokio::test]
    async fn register_duplicate_username_is_conflict() {
        let server = must_create_test_server();
        must_register(&server, "alice").await;

        let response = server
            .post(endpoints::USERS)
            .json(&json!({
                "username": "alice",
                "name": "Another Alice",
                "password": "averysafeandsecurepassword",
            }))
            .await;

        response.assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn current_user_round_trip() {
        let server = must_create_test_server();
        let token = must_log_in(&server, "alice").await;

        let response = server
            .get(endpoints::CURRENT_USER)
            .authorization_bearer(&token)
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["user"]["username"], "alice");

        let response = server
            .patch(endpoints::CURRENT_USER)
            .authorization_bearer(&token)
            .json(&json!({ "name": "Alice Jones", "version": 1 }))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["user"]["name"], "Alice Jones");
        assert_eq!(body["user"]["version"], 2);

        let response = server
            .patch(endpoints::CURRENT_USER)
            .authorization_bearer(&token)
            .json(&json!({ "name": "Alice Brown", "version": 1 }))
            .await;
        response.assert_status(StatusCode::CONFLICT);

        server
            .delete(endpoints::CURRENT_USER)
            .authorization_bearer(&token)
            .await
            .assert_status_ok();

        // Deleting the user also deletes their tokens.
        server
            .get(endpoints::CURRENT_USER)
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }
}
