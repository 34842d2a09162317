#![allow(missing_docs)]

//! Helpers for setting up the database and server in tests.

use axum_test::TestServer;
use rusqlite::Connection;
use serde_json::{Value, json};

use crate::{
    Account, AppState, Category, NewAccount, NewCategory, NewTransaction, PasswordHash,
    Transaction, User, UserId,
    app_state::DEFAULT_TOKEN_DURATION,
    build_router,
    database_id::{AccountId, CategoryId},
    endpoints, create_account, create_category, create_transaction,
    user::insert_user,
};

/// The password used by [must_register] and [must_log_in].
pub const TEST_PASSWORD: &str = "averysafeandsecurepassword";

/// The cheapest cost bcrypt accepts.
const TEST_PASSWORD_COST: u32 = 4;

pub fn must_create_test_connection() -> Connection {
    let connection =
        Connection::open_in_memory().expect("Could not open in-memory SQLite database.");
    crate::initialize_db(&connection).expect("Could not initialize database.");

    connection
}

pub fn must_create_user(username: &str, connection: &Connection) -> User {
    insert_user(
        username,
        "Test User",
        PasswordHash::new_unchecked("not a real hash"),
        connection,
    )
    .expect("Could not create test user.")
}

pub fn must_create_category(user_id: UserId, name: &str, connection: &Connection) -> Category {
    create_category(
        user_id,
        NewCategory {
            name: name.to_owned(),
            color: "#123abc".to_owned(),
            icon: "🏷".to_owned(),
        },
        connection,
    )
    .expect("Could not create test category.")
}

pub fn must_create_account(
    user_id: UserId,
    name: &str,
    initial_balance_cents: i64,
    connection: &Connection,
) -> Account {
    create_account(
        user_id,
        NewAccount {
            name: name.to_owned(),
            account_type: "debit".to_owned(),
            initial_balance_cents,
        },
        connection,
    )
    .expect("Could not create test account.")
}

pub fn must_create_transaction(
    user_id: UserId,
    account_id: AccountId,
    category_id: CategoryId,
    amount_cents: i64,
    connection: &Connection,
) -> Transaction {
    create_transaction(
        user_id,
        NewTransaction {
            account_id,
            category_id,
            amount_cents,
            title: "Test transaction".to_owned(),
            ..Default::default()
        },
        connection,
    )
    .expect("Could not create test transaction.")
}

pub fn must_create_test_server() -> TestServer {
    let connection =
        Connection::open_in_memory().expect("Could not open in-memory SQLite database.");
    let mut state =
        AppState::new(connection, DEFAULT_TOKEN_DURATION).expect("Could not create app state.");
    state.password_cost = TEST_PASSWORD_COST;

    TestServer::try_new(build_router(state)).expect("Could not create test server.")
}

/// Register `username` with [TEST_PASSWORD].
pub async fn must_register(server: &TestServer, username: &str) -> Value {
    let response = server
        .post(endpoints::USERS)
        .json(&json!({
            "username": username,
            "name": "Alice Smith",
            "password": TEST_PASSWORD,
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);

    response.json::<Value>()["user"].clone()
}

/// Register `username` and return a bearer token for it.
pub async fn must_log_in(server: &TestServer, username: &str) -> String {
    must_register(server, username).await;

    let response = server
        .post(endpoints::LOG_IN)
        .json(&json!({ "username": username, "password": TEST_PASSWORD }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);

    response.json::<Value>()["authentication_token"]["token"]
        .as_str()
        .expect("Log-in response did not contain a token.")
        .to_owned()
}
