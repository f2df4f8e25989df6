//! Accounts hold the money that transactions and transfers move around.
//!
//! Account CRUD lives in the user-facing app; this crate only reads accounts
//! as posting context and mutates balances through the transfer primitive.

mod core;

pub use core::{
    Account, AccountId, create_account, create_account_table, get_account, get_context_accounts,
    map_row_to_account,
};
