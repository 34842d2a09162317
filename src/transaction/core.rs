//! Defines the transaction model and the single-row database queries for transactions.
//!
//! These functions do not touch account balances. The balance preserving
//! operations live in the ledger module and are built on top of these.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

use crate::{
    Error, UserId,
    database_id::{AccountId, CategoryId, TransactionId},
    db::map_write_error,
    validation::{Validator, non_zero},
};

const SELECT_TRANSACTION: &str = "SELECT id, user_id, account_id, category_id, amount_cents, title, date, attachment, note, version FROM \"transaction\"";

// ============================================================================
// MODELS
// ============================================================================

/// A movement of money into or out of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The owner of the account the transaction belongs to.
    pub user_id: UserId,
    /// The account whose balance the transaction contributes to.
    pub account_id: AccountId,
    /// The category the transaction is filed under.
    pub category_id: CategoryId,
    /// Positive values are income, negative values are expenses.
    pub amount_cents: i64,
    /// A short description of the transaction.
    pub title: String,
    /// When the transaction happened.
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    /// A link to a receipt or similar document.
    pub attachment: Option<String>,
    /// Free text notes.
    pub note: Option<String>,
    /// Incremented on every update.
    pub version: i64,
}

/// The fields needed to record a transaction.
///
/// Missing IDs deserialize to zero so that they are reported as validation
/// errors rather than as a malformed request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTransaction {
    /// The account to record the transaction against.
    #[serde(default)]
    pub account_id: AccountId,
    /// The category to file the transaction under.
    #[serde(default)]
    pub category_id: CategoryId,
    /// Zero is allowed.
    #[serde(default)]
    pub amount_cents: i64,
    /// Must not be empty.
    #[serde(default)]
    pub title: String,
    /// Defaults to the time the transaction is recorded.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub date: Option<OffsetDateTime>,
    /// A link to a receipt or similar document.
    #[serde(default)]
    pub attachment: Option<String>,
    /// Free text notes.
    #[serde(default)]
    pub note: Option<String>,
}

/// A partial update of a transaction.
///
/// For the nullable fields, `None` leaves the field unchanged and
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionPatch {
    /// Move the transaction to another account.
    pub account_id: Option<AccountId>,
    /// File the transaction under another category.
    pub category_id: Option<CategoryId>,
    /// The new amount.
    pub amount_cents: Option<i64>,
    /// The new title.
    pub title: Option<String>,
    /// The new date.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub date: Option<OffsetDateTime>,
    /// Replace or clear the attachment.
    #[serde(default, deserialize_with = "double_option")]
    pub attachment: Option<Option<String>>,
    /// Replace or clear the note.
    #[serde(default, deserialize_with = "double_option")]
    pub note: Option<Option<String>>,
    /// The version the caller last saw.
    pub version: Option<i64>,
}

impl TransactionPatch {
    /// Overwrite the fields of `transaction` that this patch sets.
    pub fn apply(self, transaction: &mut Transaction) {
        if let Some(account_id) = self.account_id {
            transaction.account_id = account_id;
        }
        if let Some(category_id) = self.category_id {
            transaction.category_id = category_id;
        }
        if let Some(amount_cents) = self.amount_cents {
            transaction.amount_cents = amount_cents;
        }
        if let Some(title) = self.title {
            transaction.title = title;
        }
        if let Some(date) = self.date {
            transaction.date = date;
        }
        if let Some(attachment) = self.attachment {
            transaction.attachment = attachment;
        }
        if let Some(note) = self.note {
            transaction.note = note;
        }
    }
}

/// Distinguishes an explicit `null` from a missing field.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub(super) fn validate_transaction(
    validator: &mut Validator,
    account_id: AccountId,
    category_id: CategoryId,
    title: &str,
) {
    validator.check(non_zero(&account_id), "account_id", "Must be provided");
    validator.check(non_zero(&category_id), "category_id", "Must be provided");
    validator.check(non_zero(&title), "title", "Must be provided");
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the transaction table.
///
/// Transactions go away with their account, but a category cannot be deleted
/// while transactions still refer to it.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES user(id) ON DELETE CASCADE,
            account_id INTEGER NOT NULL REFERENCES account(id) ON DELETE CASCADE,
            category_id INTEGER NOT NULL REFERENCES category(id),
            amount_cents INTEGER NOT NULL,
            title TEXT NOT NULL,
            date TEXT NOT NULL,
            attachment TEXT,
            note TEXT,
            version INTEGER NOT NULL DEFAULT 1
        );

        CREATE INDEX IF NOT EXISTS idx_transaction_user_id ON \"transaction\"(user_id);
        CREATE INDEX IF NOT EXISTS idx_transaction_account_id ON \"transaction\"(account_id);
        CREATE INDEX IF NOT EXISTS idx_transaction_category_id ON \"transaction\"(category_id);",
    )?;

    Ok(())
}

/// Insert a transaction row without validating it or touching the account balance.
///
/// # Errors
///
/// This function will return a:
/// - [Error::NotFound] if the user does not exist,
/// - [Error::InvalidReference] if the account or category does not exist,
/// - [Error::SqlError] if there is some other SQL error.
pub fn insert_transaction(
    user_id: UserId,
    new_transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let date = new_transaction.date.unwrap_or_else(OffsetDateTime::now_utc);

    connection
        .prepare(
            "INSERT INTO \"transaction\" (user_id, account_id, category_id, amount_cents, title, date, attachment, note)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            RETURNING id, user_id, account_id, category_id, amount_cents, title, date, attachment, note, version",
        )?
        .query_row(
            (
                user_id.as_i64(),
                new_transaction.account_id,
                new_transaction.category_id,
                new_transaction.amount_cents,
                &new_transaction.title,
                date,
                &new_transaction.attachment,
                &new_transaction.note,
            ),
            map_row,
        )
        .map_err(|error| {
            map_write_error(
                error,
                "transaction",
                &[
                    ("user_id", user_id.as_i64()),
                    ("account_id", new_transaction.account_id),
                    ("category_id", new_transaction.category_id),
                ],
                connection,
            )
        })
}

/// Retrieve every transaction owned by `user_id` in the order they were recorded.
pub fn get_all_transactions(
    user_id: UserId,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!("{SELECT_TRANSACTION} WHERE user_id = ?1 ORDER BY id ASC"))?
        .query_map([user_id.as_i64()], map_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
        .collect()
}

/// Retrieve the transactions of an account owned by `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if there are no such transactions. Every account
/// has an opening transaction, so this means the account does not exist or
/// belongs to another user.
pub fn get_account_transactions(
    account_id: AccountId,
    user_id: UserId,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let transactions = connection
        .prepare(&format!(
            "{SELECT_TRANSACTION} WHERE account_id = ?1 AND user_id = ?2 ORDER BY id ASC"
        ))?
        .query_map((account_id, user_id.as_i64()), map_row)?
        .collect::<Result<Vec<_>, _>>()?;

    if transactions.is_empty() {
        return Err(Error::NotFound);
    }

    Ok(transactions)
}

/// Retrieve a transaction owned by `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if the ID is not positive, does not exist, or
/// belongs to another user.
pub fn get_transaction(
    transaction_id: TransactionId,
    user_id: UserId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    if transaction_id < 1 {
        return Err(Error::NotFound);
    }

    connection
        .prepare(&format!("{SELECT_TRANSACTION} WHERE id = ?1 AND user_id = ?2"))?
        .query_row((transaction_id, user_id.as_i64()), map_row)
        .map_err(|error| error.into())
}

fn map_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        user_id: UserId::new(row.get(1)?),
        account_id: row.get(2)?,
        category_id: row.get(3)?,
        amount_cents: row.get(4)?,
        title: row.get(5)?,
        date: row.get(6)?,
        attachment: row.get(7)?,
        note: row.get(8)?,
        version: row.get(9)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================
