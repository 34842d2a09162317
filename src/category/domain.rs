//! Core category domain types.

use serde::{Deserialize, Serialize};

use crate::{
    UserId,
    database_id::CategoryId,
    validation::{Validator, hex_color, max_length, non_zero},
};

/// The name given to each user's initial balance category.
pub const INITIAL_CATEGORY_NAME: &str = "InitialBalance";
pub(super) const INITIAL_CATEGORY_COLOR: &str = "#123";
pub(super) const INITIAL_CATEGORY_ICON: &str = "B";

/// A label for transactions, e.g. 'Groceries', 'Salary'.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Hash)]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The user that owns the category.
    pub user_id: UserId,
    /// At most 20 bytes.
    pub name: String,
    /// A `#RGB` or `#RRGGBB` hex colour.
    pub color: String,
    /// Shown next to the name.
    pub icon: String,
    /// Incremented on every update.
    pub version: i64,
    /// Whether this is the owner's initial balance category.
    #[serde(skip)]
    pub is_initial: bool,
}

/// The fields needed to create a category.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    /// At most 20 bytes.
    pub name: String,
    /// A `#RGB` or `#RRGGBB` hex colour.
    pub color: String,
    /// Must not be empty.
    pub icon: String,
}

/// A partial update of a category.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryPatch {
    /// The new name.
    pub name: Option<String>,
    /// The new colour.
    pub color: Option<String>,
    /// The new icon.
    pub icon: Option<String>,
    /// The version the caller last saw.
    pub version: Option<i64>,
}

pub(super) fn validate_category(validator: &mut Validator, name: &str, color: &str, icon: &str) {
    validator.check(non_zero(&name), "name", "Must be provided");
    validator.check(
        max_length(name, 20),
        "name",
        "Must not be more than 20 bytes long",
    );

    validator.check(non_zero(&color), "color", "Must be provided");
    validator.check(hex_color(color), "color", "Must be valid Hex Color");

    validator.check(non_zero(&icon), "icon", "Must be provided");
}
