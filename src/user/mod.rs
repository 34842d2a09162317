//! Registered users and the endpoints for managing the caller's own account.

mod core;
mod endpoints;

pub use core::{
    NewUser, User, UserId, UserPatch, create_user, create_user_table, delete_user,
    get_user_by_id, get_user_by_username, update_user,
};
pub use endpoints::{
    delete_current_user_endpoint, get_current_user_endpoint, register_user_endpoint,
    update_current_user_endpoint,
};

#[cfg(test)]
pub use core::insert_user;
