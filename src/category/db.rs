//! Database operations for categories.

use rusqlite::{Connection, OptionalExtension, Row};

use crate::{
    Error, ProtectedEntity, UserId,
    category::domain::{
        Category, CategoryPatch, INITIAL_CATEGORY_COLOR, INITIAL_CATEGORY_ICON,
        INITIAL_CATEGORY_NAME, NewCategory, validate_category,
    },
    database_id::CategoryId,
    db::{is_foreign_key_violation, map_write_error},
    validation::Validator,
};

const SELECT_CATEGORY: &str =
    "SELECT id, user_id, name, color, icon, version, is_initial FROM category";

/// Initialize the category table and indexes.
///
/// A partial unique index allows at most one initial category per user.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES user(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            color TEXT NOT NULL,
            icon TEXT NOT NULL,
            is_initial INTEGER NOT NULL DEFAULT 0,
            version INTEGER NOT NULL DEFAULT 1
        );

        CREATE INDEX IF NOT EXISTS idx_category_user_id ON category(user_id);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_category_initial
            ON category(user_id) WHERE is_initial = 1;",
    )?;

    Ok(())
}

/// Validate and create a category owned by `user_id`.
///
/// # Errors
///
/// This function will return a:
/// - [Error::Validation] holding every invalid field,
/// - [Error::NotFound] if the user does not exist,
/// - [Error::SqlError] if there is some other SQL error.
pub fn create_category(
    user_id: UserId,
    new_category: NewCategory,
    connection: &Connection,
) -> Result<Category, Error> {
    let mut validator = Validator::new();
    validator.check(user_id.as_i64() > 0, "user_id", "Must be provided");
    validate_category(
        &mut validator,
        &new_category.name,
        &new_category.color,
        &new_category.icon,
    );
    validator.finish()?;

    connection
        .execute(
            "INSERT INTO category (user_id, name, color, icon) VALUES (?1, ?2, ?3, ?4)",
            (
                user_id.as_i64(),
                &new_category.name,
                &new_category.color,
                &new_category.icon,
            ),
        )
        .map_err(|error| {
            map_write_error(error, "category", &[("user_id", user_id.as_i64())], connection)
        })?;

    Ok(Category {
        id: connection.last_insert_rowid(),
        user_id,
        name: new_category.name,
        color: new_category.color,
        icon: new_category.icon,
        version: 1,
        is_initial: false,
    })
}

/// Retrieve every category owned by `user_id` in the order they were created.
pub fn get_all_categories(user_id: UserId, connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare(&format!("{SELECT_CATEGORY} WHERE user_id = ?1 ORDER BY id ASC"))?
        .query_map([user_id.as_i64()], map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Retrieve a single category owned by `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if the ID is not positive, does not exist, or
/// belongs to another user.
pub fn get_category(
    category_id: CategoryId,
    user_id: UserId,
    connection: &Connection,
) -> Result<Category, Error> {
    if category_id < 1 {
        return Err(Error::NotFound);
    }

    connection
        .prepare(&format!("{SELECT_CATEGORY} WHERE id = ?1 AND user_id = ?2"))?
        .query_row((category_id, user_id.as_i64()), map_row)
        .map_err(|error| error.into())
}

/// Delete a category owned by `user_id`.
///
/// # Errors
///
/// This function will return a:
/// - [Error::NotFound] if the category does not exist or belongs to another user,
/// - [Error::Protected] if it is the initial balance category of any user, or
///   transactions still refer to it.
pub fn delete_category(
    category_id: CategoryId,
    user_id: UserId,
    connection: &Connection,
) -> Result<(), Error> {
    if is_initial_category(category_id, connection)? {
        return Err(Error::Protected(ProtectedEntity::InitialCategory));
    }

    let rows_affected = connection
        .execute(
            "DELETE FROM category WHERE id = ?1 AND user_id = ?2",
            (category_id, user_id.as_i64()),
        )
        .map_err(|error| {
            if is_foreign_key_violation(&error) {
                Error::Protected(ProtectedEntity::CategoryInUse)
            } else {
                error.into()
            }
        })?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Apply `patch` to a category owned by `user_id`.
///
/// # Errors
///
/// This function will return a:
/// - [Error::NotFound] if the category does not exist or belongs to another user,
/// - [Error::Protected] if it is the initial balance category,
/// - [Error::Validation] if the patched category is invalid,
/// - [Error::EditConflict] if the category changed since it was read, or
///   since `patch.version`.
pub fn update_category(
    category_id: CategoryId,
    user_id: UserId,
    patch: CategoryPatch,
    connection: &Connection,
) -> Result<Category, Error> {
    if is_initial_category(category_id, connection)? {
        return Err(Error::Protected(ProtectedEntity::InitialCategory));
    }

    let mut category = get_category(category_id, user_id, connection)?;

    let expected_version = patch.version.unwrap_or(category.version);

    if let Some(name) = patch.name {
        category.name = name;
    }
    if let Some(color) = patch.color {
        category.color = color;
    }
    if let Some(icon) = patch.icon {
        category.icon = icon;
    }

    let mut validator = Validator::new();
    validate_category(&mut validator, &category.name, &category.color, &category.icon);
    validator.finish()?;

    let rows_affected = connection.execute(
        "UPDATE category SET name = ?1, color = ?2, icon = ?3, version = version + 1
        WHERE id = ?4 AND user_id = ?5 AND version = ?6",
        (
            &category.name,
            &category.color,
            &category.icon,
            category.id,
            user_id.as_i64(),
            expected_version,
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::EditConflict);
    }

    category.version = expected_version + 1;

    Ok(category)
}

/// Get the ID of the initial balance category of `user_id`, creating it on
/// first use.
///
/// # Errors
///
/// Returns [Error::NotFound] if the user does not exist.
pub fn initial_category_id(user_id: UserId, connection: &Connection) -> Result<CategoryId, Error> {
    let existing = connection
        .query_row(
            "SELECT id FROM category WHERE user_id = ?1 AND is_initial = 1",
            [user_id.as_i64()],
            |row| row.get(0),
        )
        .optional()?;

    if let Some(category_id) = existing {
        return Ok(category_id);
    }

    connection
        .execute(
            "INSERT INTO category (user_id, name, color, icon, is_initial)
            VALUES (?1, ?2, ?3, ?4, 1)",
            (
                user_id.as_i64(),
                INITIAL_CATEGORY_NAME,
                INITIAL_CATEGORY_COLOR,
                INITIAL_CATEGORY_ICON,
            ),
        )
        .map_err(|error| {
            map_write_error(error, "category", &[("user_id", user_id.as_i64())], connection)
        })?;

    let category_id = connection.last_insert_rowid();
    tracing::debug!("created initial balance category {category_id} for user {user_id}");

    Ok(category_id)
}

/// Whether `category_id` is the initial balance category of any user.
pub fn is_initial_category(category_id: CategoryId, connection: &Connection) -> Result<bool, Error> {
    connection
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM category WHERE id = ?1 AND is_initial = 1)",
            [category_id],
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    Ok(Category {
        id: row.get(0)?,
        user_id: UserId::new(row.get(1)?),
        name: row.get(2)?,
        color: row.get(3)?,
        icon: row.get(4)?,
        version: row.get(5)?,
        is_initial: row.get(6)?,
    })
}
