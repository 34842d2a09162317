//! Defines the recurring transaction model and its database queries.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error, ProtectedEntity, Reference, UserId,
    account::get_account,
    category::{get_category, is_initial_category},
    database_id::{AccountId, CategoryId, RecurringTransactionId},
    db::map_write_error,
    validation::{ValidationErrors, Validator, non_zero, permitted_value},
};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

const INVALID_FREQUENCY: &str =
    "Invalid frequency. Valid frequencies are daily, weekly, monthly, and yearly";

const RECURRING_TRANSACTION_COLUMNS: &str = "id, user_id, account_id, category_id, title, amount_cents, note, frequency, interval, start_date, end_date, day_of_month, day_of_week, max_occurrences, is_active, version";

/// How often a recurring transaction repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// Every `interval` days.
    Daily,
    /// Every `interval` weeks.
    Weekly,
    /// Every `interval` months.
    Monthly,
    /// Every `interval` years.
    Yearly,
}

impl Frequency {
    /// The names accepted by [Frequency::from_str].
    pub const NAMES: [&'static str; 4] = ["daily", "weekly", "monthly", "yearly"];

    /// The name of the frequency as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Yearly => "yearly",
        }
    }
}

impl FromStr for Frequency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "yearly" => Ok(Frequency::Yearly),
            _ => Err(Error::Validation(ValidationErrors::for_field(
                "frequency",
                INVALID_FREQUENCY,
            ))),
        }
    }
}

impl Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ToSql for Frequency {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Frequency {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|_: Error| FromSqlError::InvalidType)
    }
}

/// A transaction that repeats on a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecurringTransaction {
    /// The ID of the recurring transaction.
    pub id: RecurringTransactionId,
    /// The owner of the schedule.
    pub user_id: UserId,
    /// The account each occurrence is recorded against.
    pub account_id: AccountId,
    /// The category each occurrence is filed under.
    pub category_id: CategoryId,
    /// The title of each occurrence.
    pub title: String,
    /// The amount of each occurrence.
    pub amount_cents: i64,
    /// Free text notes.
    pub note: Option<String>,
    /// The unit of `interval`.
    pub frequency: Frequency,
    /// How many `frequency` units pass between occurrences.
    pub interval: i64,
    /// The date of the first occurrence.
    #[serde(with = "iso_date")]
    pub start_date: Date,
    /// No occurrences happen after this date.
    #[serde(with = "iso_date::option")]
    pub end_date: Option<Date>,
    /// The day of the month monthly schedules fall on.
    pub day_of_month: Option<i64>,
    /// The day of the week weekly schedules fall on, with Sunday as 0.
    pub day_of_week: Option<i64>,
    /// Stop after this many occurrences.
    pub max_occurrences: Option<i64>,
    /// Whether occurrences are still being generated.
    pub is_active: bool,
    /// Incremented on every update.
    pub version: i64,
}

/// The fields needed to schedule a recurring transaction.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRecurringTransaction {
    /// The account each occurrence is recorded against.
    #[serde(default)]
    pub account_id: AccountId,
    /// The category each occurrence is filed under.
    #[serde(default)]
    pub category_id: CategoryId,
    /// Must not be empty.
    #[serde(default)]
    pub title: String,
    /// The amount of each occurrence.
    #[serde(default)]
    pub amount_cents: i64,
    /// Free text notes.
    #[serde(default)]
    pub note: Option<String>,
    /// One of [Frequency::NAMES].
    #[serde(default)]
    pub frequency: String,
    /// At least 1.
    #[serde(default = "default_interval")]
    pub interval: i64,
    /// The date of the first occurrence.
    #[serde(with = "iso_date")]
    pub start_date: Date,
    /// Must not be before `start_date`.
    #[serde(default, with = "iso_date::option")]
    pub end_date: Option<Date>,
    /// Between 1 and 31.
    #[serde(default)]
    pub day_of_month: Option<i64>,
    /// Between 0 (Sunday) and 6 (Saturday).
    #[serde(default)]
    pub day_of_week: Option<i64>,
    /// At least 1.
    #[serde(default)]
    pub max_occurrences: Option<i64>,
    /// Defaults to true.
    #[serde(default = "default_is_active")]
    pub is_active: bool,
}

fn default_interval() -> i64 {
    1
}

fn default_is_active() -> bool {
    true
}

fn validate_recurring_transaction(
    validator: &mut Validator,
    new_transaction: &NewRecurringTransaction,
) {
    validator.check(
        non_zero(&new_transaction.account_id),
        "account_id",
        "Must be provided",
    );
    validator.check(non_zero(&new_transaction.title), "title", "Must be provided");

    validator.check(
        non_zero(&new_transaction.frequency),
        "frequency",
        "Must be provided",
    );
    validator.check(
        permitted_value(&new_transaction.frequency.as_str(), &Frequency::NAMES),
        "frequency",
        INVALID_FREQUENCY,
    );

    validator.check(new_transaction.interval >= 1, "interval", "Must be at least 1");

    if let Some(end_date) = new_transaction.end_date {
        validator.check(
            end_date >= new_transaction.start_date,
            "end_date",
            "Must not be before the start date",
        );
    }
    if let Some(day_of_month) = new_transaction.day_of_month {
        validator.check(
            (1..=31).contains(&day_of_month),
            "day_of_month",
            "Must be between 1 and 31",
        );
    }
    if let Some(day_of_week) = new_transaction.day_of_week {
        validator.check(
            (0..=6).contains(&day_of_week),
            "day_of_week",
            "Must be between 0 and 6",
        );
    }
    if let Some(max_occurrences) = new_transaction.max_occurrences {
        validator.check(
            max_occurrences >= 1,
            "max_occurrences",
            "Must be at least 1",
        );
    }
}

/// Create the recurring transaction table.
pub fn create_recurring_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS recurring_transaction (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES user(id) ON DELETE CASCADE,
            account_id INTEGER NOT NULL REFERENCES account(id) ON DELETE CASCADE,
            category_id INTEGER NOT NULL REFERENCES category(id),
            title TEXT NOT NULL,
            amount_cents INTEGER NOT NULL,
            note TEXT,
            frequency TEXT NOT NULL CHECK (frequency IN ('daily', 'weekly', 'monthly', 'yearly')),
            interval INTEGER NOT NULL DEFAULT 1 CHECK (interval >= 1),
            start_date TEXT NOT NULL,
            end_date TEXT,
            day_of_month INTEGER CHECK (day_of_month BETWEEN 1 AND 31),
            day_of_week INTEGER CHECK (day_of_week BETWEEN 0 AND 6),
            max_occurrences INTEGER CHECK (max_occurrences >= 1),
            is_active INTEGER NOT NULL DEFAULT 1,
            version INTEGER NOT NULL DEFAULT 1
        );

        CREATE INDEX IF NOT EXISTS idx_recurring_transaction_user_id
            ON recurring_transaction(user_id);",
    )?;

    Ok(())
}

/// Schedule a recurring transaction for `user_id`.
///
/// # Errors
///
/// This function will return a:
/// - [Error::Protected] if the category is an initial balance category,
/// - [Error::InvalidReference] if the category ID is not positive, does not
///   exist, or belongs to another user,
/// - [Error::Validation] holding every invalid field,
/// - [Error::NotFound] if the account does not exist or belongs to another user,
/// - [Error::SqlError] if there is some other SQL error.
pub fn create_recurring_transaction(
    user_id: UserId,
    new_transaction: NewRecurringTransaction,
    connection: &Connection,
) -> Result<RecurringTransaction, Error> {
    if is_initial_category(new_transaction.category_id, connection)? {
        return Err(Error::Protected(ProtectedEntity::InitialCategoryUse));
    }
    if new_transaction.category_id < 1 {
        return Err(Error::InvalidReference(Reference::Category));
    }

    let mut validator = Validator::new();
    validate_recurring_transaction(&mut validator, &new_transaction);
    validator.finish()?;

    let frequency: Frequency = new_transaction.frequency.parse()?;

    get_account(new_transaction.account_id, user_id, connection)?;
    match get_category(new_transaction.category_id, user_id, connection) {
        Ok(_) => {}
        Err(Error::NotFound) => return Err(Error::InvalidReference(Reference::Category)),
        Err(error) => return Err(error),
    }

    let recurring_transaction = connection
        .prepare(&format!(
            "INSERT INTO recurring_transaction (user_id, account_id, category_id, title, amount_cents, note, frequency, interval, start_date, end_date, day_of_month, day_of_week, max_occurrences, is_active)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            RETURNING {RECURRING_TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            (
                user_id.as_i64(),
                new_transaction.account_id,
                new_transaction.category_id,
                &new_transaction.title,
                new_transaction.amount_cents,
                &new_transaction.note,
                frequency,
                new_transaction.interval,
                new_transaction.start_date,
                new_transaction.end_date,
                new_transaction.day_of_month,
                new_transaction.day_of_week,
                new_transaction.max_occurrences,
                new_transaction.is_active,
            ),
            map_row,
        )
        .map_err(|error| {
            map_write_error(
                error,
                "recurring_transaction",
                &[
                    ("user_id", user_id.as_i64()),
                    ("account_id", new_transaction.account_id),
                    ("category_id", new_transaction.category_id),
                ],
                connection,
            )
        })?;

    tracing::info!(
        "user {user_id} scheduled {frequency} recurring transaction {}",
        recurring_transaction.id
    );

    Ok(recurring_transaction)
}

/// Retrieve every recurring transaction owned by `user_id` in the order they were created.
pub fn get_all_recurring_transactions(
    user_id: UserId,
    connection: &Connection,
) -> Result<Vec<RecurringTransaction>, Error> {
    connection
        .prepare(&format!(
            "SELECT {RECURRING_TRANSACTION_COLUMNS} FROM recurring_transaction
            WHERE user_id = ?1 ORDER BY id ASC"
        ))?
        .query_map([user_id.as_i64()], map_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
        .collect()
}

fn map_row(row: &Row) -> Result<RecurringTransaction, rusqlite::Error> {
    Ok(RecurringTransaction {
        id: row.get(0)?,
        user_id: UserId::new(row.get(1)?),
        account_id: row.get(2)?,
        category_id: row.get(3)?,
        title: row.get(4)?,
        amount_cents: row.get(5)?,
        note: row.get(6)?,
        frequency: row.get(7)?,
        interval: row.get(8)?,
        start_date: row.get(9)?,
        end_date: row.get(10)?,
        day_of_month: row.get(11)?,
        day_of_week: row.get(12)?,
        max_occurrences: row.get(13)?,
        is_active: row.get(14)?,
        version: row.get(15)?,
    })
}
