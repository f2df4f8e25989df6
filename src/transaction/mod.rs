//! Defines the core data models and database queries for ledger
//! transactions.

mod core;

pub use core::{
    MonthlyTotals, Transaction, TransactionBuilder, TransactionKind, TransactionStatus,
    count_transactions, create_transaction, create_transaction_table, get_transaction,
    map_row_to_transaction, monthly_totals,
};
