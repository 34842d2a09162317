//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Json, Router, middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;

use crate::{
    AppState, Error,
    account::{
        create_account_endpoint, delete_account_endpoint, get_account_balance_endpoint,
        get_account_endpoint, get_all_accounts_endpoint, update_account_endpoint,
    },
    auth::{auth_guard, log_in_endpoint},
    category::{
        create_category_endpoint, delete_category_endpoint, get_all_categories_endpoint,
        get_category_endpoint, update_category_endpoint,
    },
    endpoints,
    logging::logging_middleware,
    recurring_transaction::{
        create_recurring_transaction_endpoint, get_all_recurring_transactions_endpoint,
    },
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint,
        get_account_transactions_endpoint, get_all_transactions_endpoint,
        get_transaction_endpoint, refund_transaction_endpoint, update_transaction_endpoint,
    },
    user::{
        delete_current_user_endpoint, get_current_user_endpoint, register_user_endpoint,
        update_current_user_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::PING, get(get_ping))
        .route(endpoints::USERS, post(register_user_endpoint))
        .route(endpoints::LOG_IN, post(log_in_endpoint));

    let protected_routes = Router::new()
        .route(
            endpoints::CURRENT_USER,
            get(get_current_user_endpoint)
                .patch(update_current_user_endpoint)
                .delete(delete_current_user_endpoint),
        )
        .route(
            endpoints::CATEGORIES,
            get(get_all_categories_endpoint).post(create_category_endpoint),
        )
        .route(
            endpoints::CATEGORY,
            get(get_category_endpoint)
                .patch(update_category_endpoint)
                .delete(delete_category_endpoint),
        )
        .route(
            endpoints::ACCOUNTS,
            get(get_all_accounts_endpoint).post(create_account_endpoint),
        )
        .route(
            endpoints::ACCOUNT,
            get(get_account_endpoint)
                .patch(update_account_endpoint)
                .delete(delete_account_endpoint),
        )
        .route(endpoints::ACCOUNT_BALANCE, get(get_account_balance_endpoint))
        .route(
            endpoints::ACCOUNT_TRANSACTIONS,
            get(get_account_transactions_endpoint),
        )
        .route(
            endpoints::TRANSACTIONS,
            get(get_all_transactions_endpoint).post(create_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTION,
            get(get_transaction_endpoint)
                .patch(update_transaction_endpoint)
                .delete(delete_transaction_endpoint),
        )
        .route(
            endpoints::REFUND_TRANSACTION,
            post(refund_transaction_endpoint),
        )
        .route(
            endpoints::RECURRING_TRANSACTIONS,
            get(get_all_recurring_transactions_endpoint).post(create_recurring_transaction_endpoint),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}

/// Report that the server is up.
async fn get_ping() -> Response {
    Json(json!({ "status": "available" })).into_response()
}

async fn get_404_not_found() -> Response {
    Error::NotFound.into_response()
}
