//! Database bootstrap and the helpers shared by the ledger modules.
//!
//! SQLite only reports that *a* foreign key failed, not which one. The
//! [FOREIGN_KEYS] table lists every foreign key in the schema together with the
//! domain error its violation should produce, and [classify_foreign_key_violation]
//! probes the parent tables to find the culprit.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{Connection, TransactionBehavior, ffi};

use crate::{
    Error, Reference,
    account::create_account_table,
    auth::create_token_table,
    category::create_category_table,
    recurring_transaction::create_recurring_transaction_table,
    transaction::create_transaction_table,
    user::create_user_table,
};

/// A foreign key column and the entity it points at.
#[derive(Debug)]
pub struct ForeignKey {
    /// The table holding the foreign key.
    pub table: &'static str,
    /// The foreign key column.
    pub column: &'static str,
    /// The table the column refers to.
    pub parent: &'static str,
    /// What to report when the referenced row is missing.
    pub reference: Reference,
}

/// Every foreign key in the schema.
pub const FOREIGN_KEYS: &[ForeignKey] = &[
    ForeignKey {
        table: "token",
        column: "user_id",
        parent: "user",
        reference: Reference::User,
    },
    ForeignKey {
        table: "category",
        column: "user_id",
        parent: "user",
        reference: Reference::User,
    },
    ForeignKey {
        table: "account",
        column: "user_id",
        parent: "user",
        reference: Reference::User,
    },
    ForeignKey {
        table: "transaction",
        column: "user_id",
        parent: "user",
        reference: Reference::User,
    },
    ForeignKey {
        table: "transaction",
        column: "account_id",
        parent: "account",
        reference: Reference::Account,
    },
    ForeignKey {
        table: "transaction",
        column: "category_id",
        parent: "category",
        reference: Reference::Category,
    },
    ForeignKey {
        table: "recurring_transaction",
        column: "user_id",
        parent: "user",
        reference: Reference::User,
    },
    ForeignKey {
        table: "recurring_transaction",
        column: "account_id",
        parent: "account",
        reference: Reference::Account,
    },
    ForeignKey {
        table: "recurring_transaction",
        column: "category_id",
        parent: "category",
        reference: Reference::Category,
    },
];

/// Create the application tables if they do not exist and turn on foreign key
/// enforcement for `connection`.
///
/// # Errors
///
/// Returns an [Error::SqlError] if any of the tables could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    // Has no effect inside a transaction, so it must come first.
    connection.pragma_update(None, "foreign_keys", true)?;

    let transaction =
        rusqlite::Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_token_table(&transaction)?;
    create_category_table(&transaction)?;
    create_account_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_recurring_transaction_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Lock the shared database connection.
///
/// # Errors
///
/// Returns [Error::DatabaseLockError] if the mutex was poisoned.
pub fn lock_connection(
    db_connection: &Arc<Mutex<Connection>>,
) -> Result<MutexGuard<'_, Connection>, Error> {
    db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })
}

/// Whether `error` is a failed foreign key constraint.
pub fn is_foreign_key_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(sql_error, _)
            if sql_error.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY
    )
}

/// Work out which foreign key of a write to `table` failed.
///
/// `values` holds the `(column, id)` pairs the failed statement tried to
/// write. The foreign keys of `table` are checked in [FOREIGN_KEYS] order and
/// the first whose parent row is missing decides the error. If every parent
/// exists, the error names the table.
pub fn classify_foreign_key_violation(
    table: &str,
    values: &[(&str, i64)],
    connection: &Connection,
) -> Error {
    for foreign_key in FOREIGN_KEYS.iter().filter(|key| key.table == table) {
        let Some((_, id)) = values
            .iter()
            .find(|(column, _)| *column == foreign_key.column)
        else {
            continue;
        };

        match parent_exists(foreign_key.parent, *id, connection) {
            Ok(true) => {}
            Ok(false) => return foreign_key.reference.clone().into_error(),
            Err(error) => return error.into(),
        }
    }

    Reference::Other(table.to_owned()).into_error()
}

/// Convert `error` from a write to `table`, classifying foreign key failures
/// with [classify_foreign_key_violation].
pub fn map_write_error(
    error: rusqlite::Error,
    table: &str,
    values: &[(&str, i64)],
    connection: &Connection,
) -> Error {
    if is_foreign_key_violation(&error) {
        classify_foreign_key_violation(table, values, connection)
    } else {
        error.into()
    }
}

fn parent_exists(parent: &str, id: i64, connection: &Connection) -> Result<bool, rusqlite::Error> {
    connection.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM \"{parent}\" WHERE id = ?1)"),
        [id],
        |row| row.get(0),
    )
}
