//! Accounts hold money and cache the sum of their transactions as a balance.

mod core;
mod endpoints;

pub use core::{
    Account, AccountPatch, AccountType, NewAccount, adjust_balance, create_account,
    create_account_table, delete_account, get_account, get_account_balance, get_all_accounts,
    replace_in_balance, update_account,
};
pub use endpoints::{
    create_account_endpoint, delete_account_endpoint, get_account_balance_endpoint,
    get_account_endpoint, get_all_accounts_endpoint, update_account_endpoint,
};
