//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use time::Duration;

use crate::{Error, PasswordHash, db::initialize};

/// How long bearer tokens are valid for unless configured otherwise.
pub const DEFAULT_TOKEN_DURATION: Duration = Duration::hours(24);

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,

    /// The duration for which newly issued bearer tokens are valid.
    pub token_duration: Duration,

    /// The bcrypt cost used when hashing passwords.
    pub password_cost: u32,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(db_connection: Connection, token_duration: Duration) -> Result<Self, Error> {
        initialize(&db_connection)?;

        Ok(Self {
            db_connection: Arc::new(Mutex::new(db_connection)),
            token_duration,
            password_cost: PasswordHash::DEFAULT_COST,
        })
    }
}
