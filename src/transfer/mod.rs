//! Atomic money movement between two accounts of the same owner.
//!
//! A transfer debits one account, credits the other, records one
//! transfer-kind transaction per leg and a transfer row linking the legs,
//! all inside a single database transaction.

mod core;
mod endpoint;

pub use core::{
    Transfer, TransferRequest, create_transfer_table, execute_transfer, get_transfer,
};
pub use endpoint::{TransferForm, post_transfer};
