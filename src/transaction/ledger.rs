//! The balance preserving transaction operations.
//!
//! Each operation runs in one database transaction: read and validate, check
//! ownership, write the transaction row, then adjust the affected account
//! balances. Returning early with an error drops the database transaction,
//! which rolls back every write made so far.

use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    Error, ProtectedEntity, Reference, UserId,
    account::{adjust_balance, get_account, replace_in_balance},
    category::{get_category, is_initial_category},
    database_id::{CategoryId, TransactionId},
    db::map_write_error,
    transaction::core::{
        NewTransaction, Transaction, TransactionPatch, get_transaction, insert_transaction,
        validate_transaction,
    },
    validation::{ValidationErrors, Validator},
};

/// The optional body of a refund request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefundRequest {
    /// Why the transaction is being refunded. Only logged.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Record a transaction and add its amount to the account balance.
///
/// # Errors
///
/// This function will return a:
/// - [Error::NotFound] if the category ID is not positive, or the account does
///   not exist or belongs to another user,
/// - [Error::Protected] if the category is an initial balance category,
/// - [Error::Validation] if the account ID, category ID or title is missing,
/// - [Error::InvalidReference] if the category does not exist or belongs to
///   another user,
/// - [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    user_id: UserId,
    new_transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    if new_transaction.category_id < 1 {
        return Err(Error::NotFound);
    }

    // Using unchecked_transaction because we only have &Connection from the MutexGuard.
    let db_transaction = connection.unchecked_transaction()?;

    if is_initial_category(new_transaction.category_id, &db_transaction)? {
        return Err(Error::Protected(ProtectedEntity::InitialCategoryUse));
    }

    let mut validator = Validator::new();
    validate_transaction(
        &mut validator,
        new_transaction.account_id,
        new_transaction.category_id,
        &new_transaction.title,
    );
    validator.finish()?;

    get_account(new_transaction.account_id, user_id, &db_transaction)?;
    check_category_owner(new_transaction.category_id, user_id, &db_transaction)?;

    let transaction = insert_transaction(user_id, new_transaction, &db_transaction)?;
    adjust_balance(
        transaction.account_id,
        user_id,
        transaction.amount_cents,
        &db_transaction,
    )?;

    db_transaction.commit()?;

    tracing::info!(
        "user {user_id} recorded transaction {} of {} cents on account {}",
        transaction.id,
        transaction.amount_cents,
        transaction.account_id
    );

    Ok(transaction)
}

/// Delete a transaction and remove its amount from the account balance.
///
/// # Errors
///
/// This function will return a:
/// - [Error::NotFound] if the transaction does not exist or belongs to another user,
/// - [Error::Protected] if it is the opening transaction of an account.
pub fn delete_transaction(
    transaction_id: TransactionId,
    user_id: UserId,
    connection: &Connection,
) -> Result<(), Error> {
    // Using unchecked_transaction because we only have &Connection from the MutexGuard.
    let db_transaction = connection.unchecked_transaction()?;

    let transaction = get_transaction(transaction_id, user_id, &db_transaction)?;

    if is_initial_category(transaction.category_id, &db_transaction)? {
        return Err(Error::Protected(ProtectedEntity::InitialTransaction));
    }

    let rows_affected = db_transaction.execute(
        "DELETE FROM \"transaction\" WHERE id = ?1 AND user_id = ?2",
        (transaction.id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    replace_in_balance(
        transaction.account_id,
        user_id,
        transaction.amount_cents,
        0,
        &db_transaction,
    )?;

    db_transaction.commit()?;

    tracing::info!("user {user_id} deleted transaction {transaction_id}");

    Ok(())
}

/// Apply `patch` to a transaction and move its contribution between balances.
///
/// The old amount is taken off the old account and the new amount is added to
/// the new account, so changing only the amount adjusts the balance by the
/// difference. The opening transaction of an account keeps its account and
/// category, but its other fields may change.
///
/// # Errors
///
/// This function will return a:
/// - [Error::NotFound] if the transaction or the new account does not exist or
///   belongs to another user,
/// - [Error::Protected] if the patch moves the transaction into an initial
///   balance category, or moves an opening transaction,
/// - [Error::Validation] if the patched transaction is invalid,
/// - [Error::InvalidReference] if the new category does not exist or belongs
///   to another user,
/// - [Error::EditConflict] if the transaction changed since it was read, or
///   since `patch.version`.
pub fn update_transaction(
    transaction_id: TransactionId,
    user_id: UserId,
    patch: TransactionPatch,
    connection: &Connection,
) -> Result<Transaction, Error> {
    // Using unchecked_transaction because we only have &Connection from the MutexGuard.
    let db_transaction = connection.unchecked_transaction()?;

    let mut transaction = get_transaction(transaction_id, user_id, &db_transaction)?;
    let expected_version = patch.version.unwrap_or(transaction.version);
    let old_account_id = transaction.account_id;
    let old_category_id = transaction.category_id;
    let old_amount_cents = transaction.amount_cents;

    let is_opening = is_initial_category(old_category_id, &db_transaction)?;
    patch.apply(&mut transaction);

    if is_opening {
        if transaction.account_id != old_account_id || transaction.category_id != old_category_id
        {
            return Err(Error::Protected(ProtectedEntity::InitialTransaction));
        }
    } else if is_initial_category(transaction.category_id, &db_transaction)? {
        return Err(Error::Protected(ProtectedEntity::InitialCategoryUse));
    }

    let mut validator = Validator::new();
    validate_transaction(
        &mut validator,
        transaction.account_id,
        transaction.category_id,
        &transaction.title,
    );
    validator.finish()?;

    get_account(transaction.account_id, user_id, &db_transaction)?;
    check_category_owner(transaction.category_id, user_id, &db_transaction)?;

    let rows_affected = db_transaction
        .execute(
            "UPDATE \"transaction\"
            SET account_id = ?1, category_id = ?2, amount_cents = ?3, title = ?4, date = ?5,
                attachment = ?6, note = ?7, version = version + 1
            WHERE id = ?8 AND user_id = ?9 AND version = ?10",
            (
                transaction.account_id,
                transaction.category_id,
                transaction.amount_cents,
                &transaction.title,
                transaction.date,
                &transaction.attachment,
                &transaction.note,
                transaction.id,
                user_id.as_i64(),
                expected_version,
            ),
        )
        .map_err(|error| {
            map_write_error(
                error,
                "transaction",
                &[
                    ("user_id", user_id.as_i64()),
                    ("account_id", transaction.account_id),
                    ("category_id", transaction.category_id),
                ],
                &db_transaction,
            )
        })?;

    if rows_affected == 0 {
        return Err(Error::EditConflict);
    }

    if old_account_id == transaction.account_id {
        replace_in_balance(
            old_account_id,
            user_id,
            old_amount_cents,
            transaction.amount_cents,
            &db_transaction,
        )?;
    } else {
        replace_in_balance(old_account_id, user_id, old_amount_cents, 0, &db_transaction)?;
        adjust_balance(
            transaction.account_id,
            user_id,
            transaction.amount_cents,
            &db_transaction,
        )?;
    }

    let updated = get_transaction(transaction_id, user_id, &db_transaction)?;

    db_transaction.commit()?;

    tracing::info!("user {user_id} updated transaction {transaction_id}");

    Ok(updated)
}

/// Record the reverse of a transaction.
///
/// The refund has the negated amount, the same account and category, and
/// copies the attachment and note. The original transaction is left as is.
///
/// # Errors
///
/// This function will return a:
/// - [Error::NotFound] if the transaction does not exist or belongs to another user,
/// - [Error::Protected] if it is the opening transaction of an account,
/// - [Error::Validation] if the amount cannot be negated.
pub fn refund_transaction(
    transaction_id: TransactionId,
    user_id: UserId,
    request: RefundRequest,
    connection: &Connection,
) -> Result<Transaction, Error> {
    // Using unchecked_transaction because we only have &Connection from the MutexGuard.
    let db_transaction = connection.unchecked_transaction()?;

    let original = get_transaction(transaction_id, user_id, &db_transaction)?;

    if is_initial_category(original.category_id, &db_transaction)? {
        return Err(Error::Protected(ProtectedEntity::InitialTransactionRefund));
    }

    let refund = insert_transaction(
        user_id,
        NewTransaction {
            account_id: original.account_id,
            category_id: original.category_id,
            amount_cents: negate(original.amount_cents)?,
            title: format!("[REFUND #{}] {}", original.id, original.title),
            date: None,
            attachment: original.attachment,
            note: original.note,
        },
        &db_transaction,
    )?;
    adjust_balance(
        refund.account_id,
        user_id,
        refund.amount_cents,
        &db_transaction,
    )?;

    db_transaction.commit()?;

    tracing::info!(
        "user {user_id} refunded transaction {transaction_id} with transaction {}, reason: {}",
        refund.id,
        request.reason.as_deref().unwrap_or("none given")
    );

    Ok(refund)
}

/// Map a missing or foreign category to [Reference::Category].
fn check_category_owner(
    category_id: CategoryId,
    user_id: UserId,
    connection: &Connection,
) -> Result<(), Error> {
    match get_category(category_id, user_id, connection) {
        Ok(_) => Ok(()),
        Err(Error::NotFound) => Err(Error::InvalidReference(Reference::Category)),
        Err(error) => Err(error),
    }
}

fn negate(amount_cents: i64) -> Result<i64, Error> {
    amount_cents.checked_neg().ok_or_else(|| {
        Error::Validation(ValidationErrors::for_field(
            "amount_cents",
            "Must be greater than the minimum amount",
        ))
    })
}
