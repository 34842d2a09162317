//! The `/v1/recurring_transactions` endpoints.

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
    db::lock_connection,
    extract::JsonBody,
    recurring_transaction::{
        NewRecurringTransaction, create_recurring_transaction, get_all_recurring_transactions,
    },
};

/// The state needed for the recurring transaction endpoints.
#[derive(Debug, Clone)]
pub struct RecurringTransactionState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RecurringTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// List the caller's recurring transactions.
pub async fn get_all_recurring_transactions_endpoint(
    State(state): State<RecurringTransactionState>,
    Extension(user_id): Extension<UserId>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let recurring_transactions = get_all_recurring_transactions(user_id, &connection)?;

    Ok(Json(json!({ "recurring_transactions": recurring_transactions })).into_response())
}

/// Schedule a recurring transaction.
pub async fn create_recurring_transaction_endpoint(
    State(state): State<RecurringTransactionState>,
    Extension(user_id): Extension<UserId>,
    JsonBody(new_transaction): JsonBody<NewRecurringTransaction>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let recurring_transaction = create_recurring_transaction(user_id, new_transaction, &connection)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "recurring_transaction": recurring_transaction })),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use crate::{
        endpoints,
        test_utils::{must_create_test_server, must_log_in},
    };

    #[tokio::test]
    async fn create_and_list_recurring_transactions() {
        let server = must_create_test_server();
        let token = must_log_in(&server, "alice").await;
        let account_id = server
            .post(endpoints::ACCOUNTS)
            .authorization_bearer(&token)
            .json(&json!({ "name": "Everyday", "type": "debit" }))
            .await
            .json::<Value>()["account"]["id"]
            .as_i64()
            .unwrap();
        let category_id = server
            .post(endpoints::CATEGORIES)
            .authorization_bearer(&token)
            .json(&json!({ "name": "Housing", "color": "#333", "icon": "H" }))
            .await
            .json::<Value>()["category"]["id"]
            .as_i64()
            .unwrap();

        let response = server
            .post(endpoints::RECURRING_TRANSACTIONS)
            .authorization_bearer(&token)
            .json(&json!({
                "account_id": account_id,
                "category_id": category_id,
                "title": "Rent",
                "amount_cents": -150000,
                "frequency": "weekly",
                "interval": 2,
                "start_date": "2025-01-06",
                "day_of_week": 1,
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let created = response.json::<Value>()["recurring_transaction"].clone();
        assert_eq!(created["frequency"], "weekly");
        assert_eq!(created["start_date"], "2025-01-06");
        assert_eq!(created["end_date"], Value::Null);
        assert_eq!(created["is_active"], true);

        let response = server
            .get(endpoints::RECURRING_TRANSACTIONS)
            .authorization_bearer(&token)
            .await;
        response.assert_status_ok();
        response.assert_json(&json!({ "recurring_transactions": [created] }));
    }

    #[tokio::test]
    async fn unknown_frequency_is_unprocessable() {
        let server = must_create_test_server();
        let token = must_log_in(&server, "alice").await;
        let account_id = server
            .post(endpoints::ACCOUNTS)
            .authorization_bearer(&token)
            .json(&json!({ "name": "Everyday", "type": "debit" }))
            .await
            .json::<Value>()["account"]["id"]
            .as_i64()
            .unwrap();
        let category_id = server
            .post(endpoints::CATEGORIES)
            .authorization_bearer(&token)
            .json(&json!({ "name": "Housing", "color": "#333", "icon": "H" }))
            .await
            .json::<Value>()["category"]["id"]
            .as_i64()
            .unwrap();

        let response = server
            .post(endpoints::RECURRING_TRANSACTIONS)
            .authorization_bearer(&token)
            .json(&json!({
                "account_id": account_id,
                "category_id": category_id,
                "title": "Rent",
                "frequency": "hourly",
                "start_date": "2025-01-06",
            }))
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert!(response.json::<Value>()["error"]["frequency"].is_string());
    }
}
