//! The `/v1/accounts` endpoints.

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
    AppState, Error, UserId,
    account::{
        AccountPatch, NewAccount, create_account, delete_account, get_account,
        get_account_balance, get_all_accounts, update_account,
    },
    database_id::AccountId,
    db::lock_connection,
    extract::{JsonBody, PathParam},
};

/// The state needed for the account endpoints.
#[derive(Debug, Clone)]
pub struct AccountState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AccountState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// List the caller's accounts.
pub async fn get_all_accounts_endpoint(
    State(state): State<AccountState>,
    Extension(user_id): Extension<UserId>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let accounts = get_all_accounts(user_id, &connection)?;

    Ok(Json(json!({ "accounts": accounts })).into_response())
}

/// Open an account.
pub async fn create_account_endpoint(
    State(state): State<AccountState>,
    Extension(user_id): Extension<UserId>,
    JsonBody(new_account): JsonBody<NewAccount>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let account = create_account(user_id, new_account, &connection)?;

    Ok((StatusCode::CREATED, Json(json!({ "account": account }))).into_response())
}

/// Get one of the caller's accounts.
pub async fn get_account_endpoint(
    State(state): State<AccountState>,
    Extension(user_id): Extension<UserId>,
    PathParam(account_id): PathParam<AccountId>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let account = get_account(account_id, user_id, &connection)?;

    Ok(Json(json!({ "account": account })).into_response())
}

/// Get the balance of one of the caller's accounts.
pub async fn get_account_balance_endpoint(
    State(state): State<AccountState>,
    Extension(user_id): Extension<UserId>,
    PathParam(account_id): PathParam<AccountId>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let balance_cents = get_account_balance(account_id, user_id, &connection)?;

    Ok(Json(json!({ "balance_cents": balance_cents })).into_response())
}

/// Rename or change the type of one of the caller's accounts.
pub async fn update_account_endpoint(
    State(state): State<AccountState>,
    Extension(user_id): Extension<UserId>,
    PathParam(account_id): PathParam<AccountId>,
    JsonBody(patch): JsonBody<AccountPatch>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let account = update_account(account_id, user_id, patch, &connection)?;

    Ok(Json(json!({ "account": account })).into_response())
}

/// Delete one of the caller's accounts and its transactions.
pub async fn delete_account_endpoint(
    State(state): State<AccountState>,
    Extension(user_id): Extension<UserId>,
    PathParam(account_id): PathParam<AccountId>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection)?;
    delete_account(account_id, user_id, &connection)?;

    Ok(Json(json!({ "message": "account successfully deleted" })).into_response())
}
