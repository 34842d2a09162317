//! The `/v1/transactions` endpoints and the transaction listing of an account.

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
    database_id::{AccountId, TransactionId},
    db::lock_connection,
    extract::{JsonBody, PathParam},
    transaction::{
        NewTransaction, RefundRequest, TransactionPatch, create_transaction, delete_transaction,
        get_account_transactions, get_all_transactions, get_transaction, refund_transaction,
        update_transaction,
    },
};

/// The state needed for the transaction endpoints.
#[derive(Debug, Clone)]
pub struct TransactionState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// List the caller's transactions.
pub async fn get_all_transactions_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserId>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let transactions = get_all_transactions(user_id, &connection)?;

    Ok(Json(json!({ "transactions": transactions })).into_response())
}

/// List the transactions of one of the caller's accounts.
pub async fn get_account_transactions_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserId>,
    PathParam(account_id): PathParam<AccountId>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let transactions = get_account_transactions(account_id, user_id, &connection)?;

    Ok(Json(json!({ "transactions": transactions })).into_response())
}

/// Record a transaction.
pub async fn create_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserId>,
    JsonBody(new_transaction): JsonBody<NewTransaction>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let transaction = create_transaction(user_id, new_transaction, &connection)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "transaction": transaction })),
    )
        .into_response())
}

/// Get one of the caller's transactions.
pub async fn get_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserId>,
    PathParam(transaction_id): PathParam<TransactionId>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let transaction = get_transaction(transaction_id, user_id, &connection)?;

    Ok(Json(json!({ "transaction": transaction })).into_response())
}

/// Partially update one of the caller's transactions.
pub async fn update_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserId>,
    PathParam(transaction_id): PathParam<TransactionId>,
    JsonBody(patch): JsonBody<TransactionPatch>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let transaction = update_transaction(transaction_id, user_id, patch, &connection)?;

    Ok(Json(json!({ "transaction": transaction })).into_response())
}

/// Delete one of the caller's transactions.
pub async fn delete_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserId>,
    PathParam(transaction_id): PathParam<TransactionId>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection)?;
    delete_transaction(transaction_id, user_id, &connection)?;

    Ok(Json(json!({ "message": "transaction successfully deleted" })).into_response())
}

/// Refund one of the caller's transactions.
///
/// The body with the refund reason may be omitted.
pub async fn refund_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserId>,
    PathParam(transaction_id): PathParam<TransactionId>,
    request: Option<JsonBody<RefundRequest>>,
) -> Result<Response, Error> {
    let request = request.map(|JsonBody(request)| request).unwrap_or_default();
    let connection = lock_connection(&state.db_connection)?;
    let refund = refund_transaction(transaction_id, user_id, request, &connection)?;

    Ok((StatusCode::CREATED, Json(json!({ "transaction": refund }))).into_response())
}
