//! Defines the account model and the database queries for accounts.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};

use crate::{
    Error, UserId,
    category::initial_category_id,
    database_id::AccountId,
    db::map_write_error,
    transaction::{NewTransaction, insert_transaction},
    validation::{ValidationErrors, Validator, max_length, non_zero, permitted_value},
};

/// The title of the transaction that opens every account.
pub const INITIAL_BALANCE_TITLE: &str = "Initial balance";

const INVALID_ACCOUNT_TYPE: &str = "Invalid account type. Valid types are credit, debit, and cash";

const SELECT_ACCOUNT: &str = "SELECT id, user_id, name, type, balance_cents, version FROM account";

/// The kind of account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// A bank account with a debit card.
    Debit,
    /// Physical money.
    Cash,
    /// A credit card.
    Credit,
}

impl AccountType {
    /// The names accepted by [AccountType::from_str].
    pub const NAMES: [&'static str; 3] = ["debit", "cash", "credit"];

    /// The name of the account type as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Debit => "debit",
            AccountType::Cash => "cash",
            AccountType::Credit => "credit",
        }
    }
}

impl FromStr for AccountType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debit" => Ok(AccountType::Debit),
            "cash" => Ok(AccountType::Cash),
            "credit" => Ok(AccountType::Credit),
            _ => Err(Error::Validation(ValidationErrors::for_field(
                "type",
                INVALID_ACCOUNT_TYPE,
            ))),
        }
    }
}

impl Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ToSql for AccountType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for AccountType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|_: Error| FromSqlError::InvalidType)
    }
}

/// Money held somewhere, e.g. a bank account or a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    /// The id for the account.
    pub id: AccountId,
    /// The user that owns the account.
    pub user_id: UserId,
    /// At most 50 bytes.
    pub name: String,
    /// The kind of account.
    #[serde(rename = "type")]
    pub account_type: AccountType,
    /// Always equal to the sum of the account's transaction amounts.
    pub balance_cents: i64,
    /// Incremented on every update, including balance changes.
    pub version: i64,
}

/// The fields needed to open an account.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    /// At most 50 bytes.
    pub name: String,
    /// One of [AccountType::NAMES].
    #[serde(rename = "type")]
    pub account_type: String,
    /// The amount of the opening transaction.
    #[serde(default, alias = "initial_balance")]
    pub initial_balance_cents: i64,
}

/// A partial update of an account.
///
/// The balance can only change through transactions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountPatch {
    /// The new name.
    pub name: Option<String>,
    /// The new account type, one of [AccountType::NAMES].
    #[serde(rename = "type")]
    pub account_type: Option<String>,
    /// The version the caller last saw.
    pub version: Option<i64>,
}

fn validate_account(validator: &mut Validator, name: &str, account_type: &str) {
    validator.check(non_zero(&name), "name", "Must be provided");
    validator.check(
        max_length(name, 50),
        "name",
        "Must not be more than 50 bytes long",
    );

    validator.check(non_zero(&account_type), "type", "Must be provided");
    validator.check(
        permitted_value(&account_type, &AccountType::NAMES),
        "type",
        INVALID_ACCOUNT_TYPE,
    );
}

/// Create the account table.
pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS account (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES user(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            type TEXT NOT NULL CHECK (type IN ('debit', 'cash', 'credit')),
            balance_cents INTEGER NOT NULL DEFAULT 0,
            version INTEGER NOT NULL DEFAULT 1
        );

        CREATE INDEX IF NOT EXISTS idx_account_user_id ON account(user_id);",
    )?;

    Ok(())
}

/// Open an account for `user_id`.
///
/// The account and its opening transaction, filed under the user's initial
/// balance category, are created in one database transaction.
///
/// # Errors
///
/// This function will return a:
/// - [Error::Validation] holding every invalid field,
/// - [Error::NotFound] if the user does not exist,
/// - [Error::SqlError] if there is some other SQL error.
pub fn create_account(
    user_id: UserId,
    new_account: NewAccount,
    connection: &Connection,
) -> Result<Account, Error> {
    let mut validator = Validator::new();
    validate_account(&mut validator, &new_account.name, &new_account.account_type);
    validator.finish()?;

    let account_type: AccountType = new_account.account_type.parse()?;

    // Using unchecked_transaction because we only have &Connection from the MutexGuard.
    let transaction = connection.unchecked_transaction()?;

    let category_id = initial_category_id(user_id, &transaction)?;

    transaction
        .execute(
            "INSERT INTO account (user_id, name, type, balance_cents) VALUES (?1, ?2, ?3, ?4)",
            (
                user_id.as_i64(),
                &new_account.name,
                account_type,
                new_account.initial_balance_cents,
            ),
        )
        .map_err(|error| {
            map_write_error(error, "account", &[("user_id", user_id.as_i64())], &transaction)
        })?;

    let account = Account {
        id: transaction.last_insert_rowid(),
        user_id,
        name: new_account.name,
        account_type,
        balance_cents: new_account.initial_balance_cents,
        version: 1,
    };

    insert_transaction(
        user_id,
        NewTransaction {
            account_id: account.id,
            category_id,
            amount_cents: account.balance_cents,
            title: INITIAL_BALANCE_TITLE.to_owned(),
            date: None,
            attachment: None,
            note: None,
        },
        &transaction,
    )?;

    transaction.commit()?;

    tracing::info!("user {user_id} opened account {}", account.id);

    Ok(account)
}

/// Retrieve every account owned by `user_id` in the order they were created.
pub fn get_all_accounts(user_id: UserId, connection: &Connection) -> Result<Vec<Account>, Error> {
    connection
        .prepare(&format!("{SELECT_ACCOUNT} WHERE user_id = ?1 ORDER BY id ASC"))?
        .query_map([user_id.as_i64()], map_row)?
        .map(|maybe_account| maybe_account.map_err(|error| error.into()))
        .collect()
}

/// Retrieve an account owned by `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if the ID is not positive, does not exist, or
/// belongs to another user.
pub fn get_account(
    account_id: AccountId,
    user_id: UserId,
    connection: &Connection,
) -> Result<Account, Error> {
    if account_id < 1 {
        return Err(Error::NotFound);
    }

    connection
        .prepare(&format!("{SELECT_ACCOUNT} WHERE id = ?1 AND user_id = ?2"))?
        .query_row((account_id, user_id.as_i64()), map_row)
        .map_err(|error| error.into())
}

/// Get the cached balance of an account owned by `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if the account does not exist or belongs to another user.
pub fn get_account_balance(
    account_id: AccountId,
    user_id: UserId,
    connection: &Connection,
) -> Result<i64, Error> {
    if account_id < 1 {
        return Err(Error::NotFound);
    }

    connection
        .query_row(
            "SELECT balance_cents FROM account WHERE id = ?1 AND user_id = ?2",
            (account_id, user_id.as_i64()),
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Delete an account owned by `user_id` along with its transactions.
///
/// # Errors
///
/// Returns [Error::NotFound] if the account does not exist or belongs to another user.
pub fn delete_account(
    account_id: AccountId,
    user_id: UserId,
    connection: &Connection,
) -> Result<(), Error> {
    if account_id < 1 {
        return Err(Error::NotFound);
    }

    let rows_affected = connection.execute(
        "DELETE FROM account WHERE id = ?1 AND user_id = ?2",
        (account_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Apply `patch` to an account owned by `user_id`.
///
/// # Errors
///
/// This function will return a:
/// - [Error::NotFound] if the account does not exist or belongs to another user,
/// - [Error::Validation] if the patched account is invalid,
/// - [Error::EditConflict] if the account changed since it was read, or
///   since `patch.version`.
pub fn update_account(
    account_id: AccountId,
    user_id: UserId,
    patch: AccountPatch,
    connection: &Connection,
) -> Result<Account, Error> {
    let mut account = get_account(account_id, user_id, connection)?;
    let expected_version = patch.version.unwrap_or(account.version);

    if let Some(name) = patch.name {
        account.name = name;
    }
    let raw_type = patch
        .account_type
        .unwrap_or_else(|| account.account_type.as_str().to_owned());

    let mut validator = Validator::new();
    validate_account(&mut validator, &account.name, &raw_type);
    validator.finish()?;

    account.account_type = raw_type.parse()?;

    let rows_affected = connection.execute(
        "UPDATE account SET name = ?1, type = ?2, version = version + 1
        WHERE id = ?3 AND user_id = ?4 AND version = ?5",
        (
            &account.name,
            account.account_type,
            account.id,
            user_id.as_i64(),
            expected_version,
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::EditConflict);
    }

    account.version = expected_version + 1;

    Ok(account)
}

/// Add `delta_cents` to the balance of an account owned by `user_id`.
///
/// Callers must run this in the same database transaction as the transaction
/// write that caused the change.
///
/// # Errors
///
/// This function will return a:
/// - [Error::NotFound] if the account does not exist or belongs to another user,
/// - [Error::Validation] if the new balance does not fit in 64 bits.
pub fn adjust_balance(
    account_id: AccountId,
    user_id: UserId,
    delta_cents: i64,
    connection: &Connection,
) -> Result<(), Error> {
    apply_balance_delta(account_id, user_id, i128::from(delta_cents), connection)
}

/// Swap a transaction amount of `old_amount_cents` for `new_amount_cents` in
/// the balance of an account owned by `user_id`.
///
/// Only the final balance has to fit in 64 bits, so an update is not rejected
/// because reversing the old amount on its own would overflow. Pass `0` as
/// `new_amount_cents` to remove an amount from the balance.
///
/// # Errors
///
/// This function will return a:
/// - [Error::NotFound] if the account does not exist or belongs to another user,
/// - [Error::Validation] if the new balance does not fit in 64 bits.
pub fn replace_in_balance(
    account_id: AccountId,
    user_id: UserId,
    old_amount_cents: i64,
    new_amount_cents: i64,
    connection: &Connection,
) -> Result<(), Error> {
    let delta_cents = i128::from(new_amount_cents) - i128::from(old_amount_cents);

    apply_balance_delta(account_id, user_id, delta_cents, connection)
}

fn apply_balance_delta(
    account_id: AccountId,
    user_id: UserId,
    delta_cents: i128,
    connection: &Connection,
) -> Result<(), Error> {
    let balance = get_account_balance(account_id, user_id, connection)?;
    let new_balance = i64::try_from(i128::from(balance) + delta_cents).map_err(|_| {
        Error::Validation(ValidationErrors::for_field(
            "amount_cents",
            "Must not overflow the account balance",
        ))
    })?;

    let rows_affected = connection.execute(
        "UPDATE account SET balance_cents = ?1, version = version + 1
        WHERE id = ?2 AND user_id = ?3",
        (new_balance, account_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

fn map_row(row: &Row) -> Result<Account, rusqlite::Error> {
    Ok(Account {
        id: row.get(0)?,
        user_id: UserId::new(row.get(1)?),
        name: row.get(2)?,
        account_type: row.get(3)?,
        balance_cents: row.get(4)?,
        version: row.get(5)?,
    })
}
