//! Authentication middleware that resolves bearer tokens into user IDs.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use rusqlite::Connection;
use time::Duration;

use crate::{
    AppState, Error, UserId,
    auth::{get_user_for_token, token::validate_token_plaintext},
    db::lock_connection,
    validation::Validator,
};

/// The state needed for the auth middleware and log-in.
#[derive(Debug, Clone)]
pub struct AuthState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
    /// How long newly issued tokens are valid for.
    pub token_duration: Duration,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            token_duration: state.token_duration,
        }
    }
}

/// Middleware function that checks for a valid bearer token.
///
/// The user ID is placed into the request extensions and the request executed
/// normally if the token is valid, otherwise a `401 Unauthorized` response
/// with a `WWW-Authenticate: Bearer` header is returned.
///
/// **Note**: Route handlers can use the function argument `Extension(user_id): Extension<UserId>` to receive the user ID.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();

    let bearer =
        match TypedHeader::<Authorization<Bearer>>::from_request_parts(&mut parts, &state).await {
            Ok(TypedHeader(Authorization(bearer))) => bearer,
            Err(_) => return Error::InvalidToken.into_response(),
        };

    let user_id = match authenticate(bearer.token(), &state) {
        Ok(user_id) => user_id,
        Err(error) => return error.into_response(),
    };

    parts.extensions.insert(user_id);
    let request = Request::from_parts(parts, body);

    next.run(request).await
}

fn authenticate(plaintext: &str, state: &AuthState) -> Result<UserId, Error> {
    let mut validator = Validator::new();
    validate_token_plaintext(&mut validator, plaintext);
    if !validator.is_valid() {
        return Err(Error::InvalidToken);
    }

    let connection = lock_connection(&state.db_connection)?;

    match get_user_for_token(plaintext, &connection) {
        Ok(user) => Ok(user.id),
        Err(Error::NotFound) => Err(Error::InvalidToken),
        Err(error) => Err(error),
    }
}
