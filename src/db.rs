//! Database schema initialisation.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    Error, account::create_account_table, binding::create_channel_binding_table,
    category::create_category_table, transaction::create_transaction_table,
    transfer::create_transfer_table,
};

/// Create the tables for the application's domain models.
///
/// The tables are created inside a single exclusive transaction so that a
/// server racing another instance over the same database file sees either
/// the complete schema or none of it.
///
/// # Errors
/// Returns an error if a table cannot be created or there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_account_table(&transaction)?;
    create_category_table(&transaction)?;
    create_channel_binding_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_transfer_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
