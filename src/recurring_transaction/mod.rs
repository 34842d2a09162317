//! Schedules for transactions that repeat, e.g. rent or a salary.
//!
//! Only the schedules are stored here. Generating the transactions for each
//! occurrence is left to a separate job.

mod core;
mod endpoints;

pub use core::{
    Frequency, NewRecurringTransaction, RecurringTransaction, create_recurring_transaction,
    create_recurring_transaction_table, get_all_recurring_transactions,
};
pub use endpoints::{
    create_recurring_transaction_endpoint, get_all_recurring_transactions_endpoint,
};
