mod log_in;
mod middleware;
mod token;

pub use log_in::{log_in, log_in_endpoint};
pub use middleware::{AuthState, auth_guard};
pub use token::{Token, create_token, create_token_table, get_user_for_token};
