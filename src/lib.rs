//! A personal finance ledger served as a JSON API.
//!
//! Users own accounts, categorize money movements, and record transactions
//! that keep each account's cached balance equal to the sum of its
//! transactions. Every mutation of the ledger runs inside a single SQLite
//! transaction so that rows and balances either change together or not at all.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum_server::Handle;
use tokio::signal;

mod account;
mod app_state;
mod auth;
mod category;
mod database_id;
mod db;
pub mod endpoints;
mod error;
mod extract;
mod logging;
mod password;
mod recurring_transaction;
mod routing;
mod transaction;
mod user;
pub mod validation;

#[cfg(test)]
mod test_utils;

pub use account::{
    Account, AccountPatch, AccountType, NewAccount, create_account, delete_account,
    get_account, get_account_balance, get_all_accounts, update_account,
};
pub use app_state::{AppState, DEFAULT_TOKEN_DURATION};
pub use auth::{Token, create_token, get_user_for_token, log_in};
pub use category::{
    Category, CategoryPatch, NewCategory, create_category, delete_category, get_all_categories,
    get_category, initial_category_id, update_category,
};
pub use database_id::{AccountId, CategoryId, RecurringTransactionId, TransactionId};
pub use db::initialize as initialize_db;
pub use error::{Error, ProtectedEntity, Reference};
pub use logging::logging_middleware;
pub use password::{PasswordHash, ValidatedPassword};
pub use recurring_transaction::{
    Frequency, NewRecurringTransaction, RecurringTransaction, create_recurring_transaction,
    get_all_recurring_transactions,
};
pub use routing::build_router;
pub use transaction::{
    NewTransaction, RefundRequest, Transaction, TransactionPatch, create_transaction,
    delete_transaction, get_account_transactions, get_all_transactions, get_transaction,
    refund_transaction, update_transaction,
};
pub use user::{
    NewUser, User, UserId, UserPatch, create_user, delete_user, get_user_by_id,
    get_user_by_username, update_user,
};
pub use validation::{ValidationErrors, Validator};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}
