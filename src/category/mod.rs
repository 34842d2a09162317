//! Categories for classifying transactions, including each user's protected
//! initial balance category.

mod db;
mod domain;
mod endpoints;

pub use db::{
    create_category, create_category_table, delete_category, get_all_categories, get_category,
    initial_category_id, is_initial_category, update_category,
};
pub use domain::{Category, CategoryPatch, NewCategory};
pub use endpoints::{
    create_category_endpoint, delete_category_endpoint, get_all_categories_endpoint,
    get_category_endpoint, update_category_endpoint,
};
