//! Opaque bearer tokens for authenticating API requests.
//!
//! A token is 16 random bytes encoded as 26 characters of unpadded base32.
//! Only the SHA-256 hash of the plaintext is stored, so a leaked database does
//! not leak usable tokens. The plaintext is returned once, when the token is
//! created.

use data_encoding::BASE32_NOPAD;
use rand_core::{OsRng, RngCore};
use rusqlite::Connection;
use serde::Serialize;
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};

use crate::{
    Error, User, UserId,
    db::map_write_error,
    get_user_by_id,
    validation::{Validator, non_zero},
};

const TOKEN_BYTES: usize = 16;

/// The length of a token's plaintext.
pub const TOKEN_PLAINTEXT_LENGTH: usize = 26;

/// A bearer token issued to a user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    /// The value the client sends in the `Authorization` header.
    #[serde(rename = "token")]
    pub plaintext: String,
    /// The SHA-256 hash of the plaintext.
    #[serde(skip)]
    pub hash: Vec<u8>,
    /// The user the token authenticates.
    #[serde(skip)]
    pub user_id: UserId,
    /// When the token stops being accepted.
    #[serde(with = "time::serde::rfc3339")]
    pub expiry: OffsetDateTime,
}

/// Create the token table.
pub fn create_token_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS token (
            hash BLOB PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES user(id) ON DELETE CASCADE,
            expiry INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_token_user_id ON token(user_id);",
    )?;

    Ok(())
}

fn hash_plaintext(plaintext: &str) -> Vec<u8> {
    Sha256::digest(plaintext.as_bytes()).to_vec()
}

fn generate_token(user_id: UserId, ttl: Duration) -> Result<Token, Error> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|error| Error::TokenGeneration(error.to_string()))?;

    let plaintext = BASE32_NOPAD.encode(&bytes);
    let hash = hash_plaintext(&plaintext);

    Ok(Token {
        plaintext,
        hash,
        user_id,
        expiry: OffsetDateTime::now_utc() + ttl,
    })
}

/// Issue and store a new token for `user_id` that expires after `ttl`.
///
/// # Errors
///
/// This function will return a:
/// - [Error::NotFound] if the user does not exist,
/// - [Error::TokenGeneration] if the OS random number generator failed,
/// - [Error::SqlError] if there is some other SQL error.
pub fn create_token(user_id: UserId, ttl: Duration, connection: &Connection) -> Result<Token, Error> {
    let token = generate_token(user_id, ttl)?;

    connection
        .execute(
            "INSERT INTO token (hash, user_id, expiry) VALUES (?1, ?2, ?3)",
            (
                &token.hash,
                token.user_id.as_i64(),
                token.expiry.unix_timestamp(),
            ),
        )
        .map_err(|error| {
            map_write_error(error, "token", &[("user_id", user_id.as_i64())], connection)
        })?;

    Ok(token)
}

/// Record a problem with `plaintext` in `validator` if it cannot be a token.
pub fn validate_token_plaintext(validator: &mut Validator, plaintext: &str) {
    validator.check(non_zero(&plaintext), "token", "Must be provided");
    validator.check(
        plaintext.len() == TOKEN_PLAINTEXT_LENGTH,
        "token",
        "Must be 26 bytes long",
    );
}

/// Get the user that owns the unexpired token `plaintext`.
///
/// # Errors
///
/// Returns [Error::NotFound] if the token is unknown or expired.
pub fn get_user_for_token(plaintext: &str, connection: &Connection) -> Result<User, Error> {
    let hash = hash_plaintext(plaintext);
    let now = OffsetDateTime::now_utc().unix_timestamp();

    let user_id: i64 = connection
        .prepare("SELECT user_id FROM token WHERE hash = ?1 AND expiry > ?2")?
        .query_row((&hash, now), |row| row.get(0))?;

    get_user_by_id(UserId::new(user_id), connection)
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use crate::{
        Error, UserId,
        test_utils::{must_create_test_connection, must_create_user},
        validation::Validator,
    };

    use super::{
        TOKEN_PLAINTEXT_LENGTH, create_token, get_user_for_token, hash_plaintext,
        validate_token_plaintext,
    };

    #[test]
    fn token_plaintext_is_26_base32_characters() {
        let connection = must_create_test_connection();
        let user = must_create_user("alice", &connection);

        let token = create_token(user.id, Duration::hours(24), &connection).unwrap();

        assert_eq!(token.plaintext.len(), TOKEN_PLAINTEXT_LENGTH);
        assert!(
            token
                .plaintext
                .chars()
                .all(|c| c.is_ascii_uppercase() || ('2'..='7').contains(&c)),
            "{} is not base32",
            token.plaintext
        );
        assert_eq!(token.hash, hash_plaintext(&token.plaintext));
    }

    #[test]
    fn tokens_are_unique() {
        let connection = must_create_test_connection();
        let user = must_create_user("alice", &connection);

        let first = create_token(user.id, Duration::hours(24), &connection).unwrap();
        let second = create_token(user.id, Duration::hours(24), &connection).unwrap();

        assert_ne!(first.plaintext, second.plaintext);
    }

    #[test]
    fn get_user_for_token_returns_owner() {
        let connection = must_create_test_connection();
        let user = must_create_user("alice", &connection);
        let token = create_token(user.id, Duration::hours(24), &connection).unwrap();

        assert_eq!(get_user_for_token(&token.plaintext, &connection), Ok(user));
    }

    #[test]
    fn expired_token_is_not_found() {
        let connection = must_create_test_connection();
        let user = must_create_user("alice", &connection);
        let token = create_token(user.id, Duration::hours(-1), &connection).unwrap();

        assert_eq!(
            get_user_for_token(&token.plaintext, &connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn unknown_token_is_not_found() {
        let connection = must_create_test_connection();

        assert_eq!(
            get_user_for_token("ABCDEFGHIJKLMNOPQRSTUVWXYZ", &connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn create_token_for_missing_user_is_not_found() {
        let connection = must_create_test_connection();

        let result = create_token(UserId::new(42), Duration::hours(24), &connection);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn validate_token_plaintext_checks_length() {
        let mut validator = Validator::new();
        validate_token_plaintext(&mut validator, "tooshort");
        assert!(!validator.is_valid());

        let mut validator = Validator::new();
        validate_token_plaintext(&mut validator, &"A".repeat(26));
        assert!(validator.is_valid());
    }
}
