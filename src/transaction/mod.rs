//! Transactions and the operations that keep account balances equal to the
//! sum of their transactions.

mod core;
mod endpoints;
mod ledger;

pub use core::{
    NewTransaction, Transaction, TransactionPatch, create_transaction_table,
    get_account_transactions, get_all_transactions, get_transaction, insert_transaction,
};
pub use endpoints::{
    create_transaction_endpoint, delete_transaction_endpoint, get_account_transactions_endpoint,
    get_all_transactions_endpoint, get_transaction_endpoint, refund_transaction_endpoint,
    update_transaction_endpoint,
};
pub use ledger::{
    RefundRequest, create_transaction, delete_transaction, refund_transaction, update_transaction,
};
