//! Code for creating the user table and managing users in the database.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{
    Error, PasswordHash, ValidatedPassword,
    password::validate_password_plaintext,
    validation::{Validator, max_length, min_length, non_zero},
};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A user of the application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserId,
    /// The unique name the user logs in with.
    pub username: String,
    /// The name shown to the user.
    pub name: String,
    /// The user's password hash.
    #[serde(skip_serializing)]
    pub password_hash: PasswordHash,
    /// Incremented on every update.
    pub version: i64,
}

/// The details needed to register a user.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    /// Must be unique.
    pub username: String,
    /// The display name.
    pub name: String,
    /// The plaintext password, hashed before it is stored.
    pub password: String,
}

/// A partial update of a user. Fields that are `None` are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    /// The new display name.
    pub name: Option<String>,
    /// The new plaintext password.
    pub password: Option<String>,
    /// The version the caller last saw.
    pub version: Option<i64>,
}

fn validate_username(validator: &mut Validator, username: &str) {
    validator.check(non_zero(&username), "username", "Must be provided");
    validator.check(
        min_length(username, 2),
        "username",
        "Must be at least 2 bytes long",
    );
    validator.check(
        max_length(username, 20),
        "username",
        "Must not be more than 20 bytes long",
    );
}

fn validate_name(validator: &mut Validator, name: &str) {
    validator.check(non_zero(&name), "name", "Must be provided");
    validator.check(min_length(name, 2), "name", "Must be at least 2 bytes long");
    validator.check(
        max_length(name, 100),
        "name",
        "Must not be more than 100 bytes long",
    );
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                version INTEGER NOT NULL DEFAULT 1
                )",
        (),
    )?;

    Ok(())
}

/// Validate, hash the password of, and insert a new user.
///
/// `cost` is the bcrypt cost, see [PasswordHash::new].
///
/// # Errors
///
/// This function will return a:
/// - [Error::Validation] holding every invalid field,
/// - [Error::DuplicateUsername] if the username is taken,
/// - [Error::HashingError] if the password could not be hashed,
/// - [Error::SqlError] if there is some other SQL error.
pub fn create_user(new_user: NewUser, cost: u32, connection: &Connection) -> Result<User, Error> {
    let mut validator = Validator::new();
    validate_username(&mut validator, &new_user.username);
    validate_name(&mut validator, &new_user.name);
    validate_password_plaintext(&mut validator, &new_user.password);
    validator.finish()?;

    let password_hash =
        PasswordHash::new(ValidatedPassword::new_unchecked(&new_user.password), cost)?;

    let user = insert_user(&new_user.username, &new_user.name, password_hash, connection)?;
    tracing::info!("registered user {} ({})", user.id, user.username);

    Ok(user)
}

/// Insert a user without validating any of its fields.
pub fn insert_user(
    username: &str,
    name: &str,
    password_hash: PasswordHash,
    connection: &Connection,
) -> Result<User, Error> {
    connection.execute(
        "INSERT INTO user (username, name, password_hash) VALUES (?1, ?2, ?3)",
        (username, name, password_hash.as_ref()),
    )?;

    let id = UserId::new(connection.last_insert_rowid());

    Ok(User {
        id,
        username: username.to_owned(),
        name: name.to_owned(),
        password_hash,
        version: 1,
    })
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user.
/// - there was an error trying to access the store.
pub fn get_user_by_id(user_id: UserId, connection: &Connection) -> Result<User, Error> {
    if user_id.as_i64() < 1 {
        return Err(Error::NotFound);
    }

    connection
        .prepare(
            "SELECT id, username, name, password_hash, version FROM user WHERE id = :id",
        )?
        .query_row(&[(":id", &user_id.as_i64())], map_user_row)
        .map_err(|error| error.into())
}

/// Get the user registered with `username`.
///
/// # Errors
///
/// Returns [Error::NotFound] if no user has that username.
pub fn get_user_by_username(username: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(
            "SELECT id, username, name, password_hash, version FROM user WHERE username = :username",
        )?
        .query_row(&[(":username", &username)], map_user_row)
        .map_err(|error| error.into())
}

/// Change the name and/or password of a user.
///
/// The write only succeeds if the stored version still equals
/// `patch.version`, or the version read at the start of the call when the
/// caller did not send one.
///
/// # Errors
///
/// This function will return a:
/// - [Error::NotFound] if the user does not exist,
/// - [Error::Validation] if the new name or password is invalid,
/// - [Error::EditConflict] if the user was modified concurrently.
pub fn update_user(
    user_id: UserId,
    patch: UserPatch,
    cost: u32,
    connection: &Connection,
) -> Result<User, Error> {
    let mut user = get_user_by_id(user_id, connection)?;
    let expected_version = patch.version.unwrap_or(user.version);

    if let Some(name) = patch.name {
        user.name = name;
    }

    let mut validator = Validator::new();
    validate_name(&mut validator, &user.name);
    if let Some(password) = &patch.password {
        validate_password_plaintext(&mut validator, password);
    }
    validator.finish()?;

    if let Some(password) = patch.password {
        user.password_hash = PasswordHash::new(ValidatedPassword::new_unchecked(&password), cost)?;
    }

    let rows_affected = connection.execute(
        "UPDATE user SET name = ?1, password_hash = ?2, version = version + 1
        WHERE id = ?3 AND version = ?4",
        (
            &user.name,
            user.password_hash.as_ref(),
            user.id.as_i64(),
            expected_version,
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::EditConflict);
    }

    user.version = expected_version + 1;

    Ok(user)
}

/// Delete a user along with everything they own.
///
/// # Errors
///
/// Returns [Error::NotFound] if the user does not exist.
pub fn delete_user(user_id: UserId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM user WHERE id = ?1", [user_id.as_i64()])?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    tracing::info!("deleted user {user_id}");

    Ok(())
}

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    let raw_password_hash: String = row.get(3)?;

    Ok(User {
        id: UserId::new(row.get(0)?),
        username: row.get(1)?,
        name: row.get(2)?,
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
        version: row.get(4)?,
    })
}

#[cfg(test)]
mod user_tests {
    use crate::{
        Error,
        test_utils::{
            must_create_account, must_create_category, must_create_test_connection,
            must_create_transaction, must_create_user,
        },
        user::{NewUser, UserId, UserPatch, create_user, delete_user, get_user_by_id, update_user},
    };

    use super::get_user_by_username;

    const TEST_COST: u32 = 4;

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_owned(),
            name: "Alice Smith".to_owned(),
            password: "averysafeandsecurepassword".to_owned(),
        }
    }

    #[test]
    fn create_user_succeeds() {
        let connection = must_create_test_connection();

        let user = create_user(new_user("alice"), TEST_COST, &connection).unwrap();

        assert!(user.id.as_i64() > 0);
        assert_eq!(user.username, "alice");
        assert_eq!(user.version, 1);
        assert!(user.password_hash.verify("averysafeandsecurepassword").unwrap());
    }

    #[test]
    fn create_user_reports_every_invalid_field() {
        let connection = must_create_test_connection();
        let user = NewUser {
            username: "a".to_owned(),
            name: String::new(),
            password: "short".to_owned(),
        };

        let errors = match create_user(user, TEST_COST, &connection) {
            Err(Error::Validation(errors)) => errors,
            other => panic!("expected validation errors, got {other:?}"),
        };

        assert_eq!(errors.len(), 3);
        assert_eq!(errors.get("username"), Some("Must be at least 2 bytes long"));
        assert_eq!(errors.get("name"), Some("Must be provided"));
        assert_eq!(errors.get("password"), Some("Must be at least 8 bytes long"));
    }

    #[test]
    fn create_user_fails_on_duplicate_username() {
        let connection = must_create_test_connection();
        create_user(new_user("alice"), TEST_COST, &connection).unwrap();

        let result = create_user(new_user("alice"), TEST_COST, &connection);

        assert_eq!(result, Err(Error::DuplicateUsername));
    }

    #[test]
    fn get_user_fails_with_non_existent_id() {
        let connection = must_create_test_connection();

        assert_eq!(
            get_user_by_id(UserId::new(42), &connection),
            Err(Error::NotFound)
        );
        assert_eq!(
            get_user_by_id(UserId::new(0), &connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn get_user_succeeds_with_existing_id_and_username() {
        let connection = must_create_test_connection();
        let user = must_create_user("alice", &connection);

        assert_eq!(get_user_by_id(user.id, &connection), Ok(user.clone()));
        assert_eq!(get_user_by_username("alice", &connection), Ok(user));
    }

    #[test]
    fn update_user_changes_name_and_version() {
        let connection = must_create_test_connection();
        let user = must_create_user("alice", &connection);

        let patch = UserPatch {
            name: Some("Alice Jones".to_owned()),
            ..Default::default()
        };
        let updated = update_user(user.id, patch, TEST_COST, &connection).unwrap();

        assert_eq!(updated.name, "Alice Jones");
        assert_eq!(updated.version, user.version + 1);
        assert_eq!(get_user_by_id(user.id, &connection), Ok(updated));
    }

    #[test]
    fn update_user_changes_password() {
        let connection = must_create_test_connection();
        let user = must_create_user("alice", &connection);

        let patch = UserPatch {
            password: Some("anewandimprovedpassword".to_owned()),
            ..Default::default()
        };
        update_user(user.id, patch, TEST_COST, &connection).unwrap();

        let stored = get_user_by_id(user.id, &connection).unwrap();
        assert!(stored.password_hash.verify("anewandimprovedpassword").unwrap());
    }

    #[test]
    fn update_user_with_stale_version_is_edit_conflict() {
        let connection = must_create_test_connection();
        let user = must_create_user("alice", &connection);
        let patch = UserPatch {
            name: Some("Alice Jones".to_owned()),
            version: Some(user.version),
            ..Default::default()
        };
        update_user(user.id, patch.clone(), TEST_COST, &connection).unwrap();

        let result = update_user(user.id, patch, TEST_COST, &connection);

        assert_eq!(result, Err(Error::EditConflict));
    }

    #[test]
    fn delete_user_removes_user() {
        let connection = must_create_test_connection();
        let user = must_create_user("alice", &connection);

        assert_eq!(delete_user(user.id, &connection), Ok(()));
        assert_eq!(get_user_by_id(user.id, &connection), Err(Error::NotFound));
        assert_eq!(delete_user(user.id, &connection), Err(Error::NotFound));
    }

    #[test]
    fn delete_user_removes_everything_they_own() {
        let connection = must_create_test_connection();
        let user = must_create_user("alice", &connection);
        let account = must_create_account(user.id, "Everyday", 100, &connection);
        let category = must_create_category(user.id, "Groceries", &connection);
        must_create_transaction(user.id, account.id, category.id, -25, &connection);

        assert_eq!(delete_user(user.id, &connection), Ok(()));

        for table in ["category", "account", "\"transaction\""] {
            let count: i64 = connection
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
                .unwrap();
            assert_eq!(count, 0, "{table} still has rows");
        }
    }
}
