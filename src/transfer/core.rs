//! The transfer record and the atomic transfer routine.

use rusqlite::{Connection, Row, TransactionBehavior};
use time::OffsetDateTime;

use crate::{
    Error,
    account::AccountId,
    database_id::{OwnerId, TransactionId, TransferId},
    transaction::{Transaction, TransactionKind, TransactionStatus, create_transaction},
};

/// A validated request to move money between two accounts of one owner.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    /// The owner both accounts must belong to.
    pub owner_id: OwnerId,
    /// The account the money leaves.
    pub from_account: AccountId,
    /// The account the money enters.
    pub to_account: AccountId,
    /// The amount to move, must be positive and finite.
    pub amount: f64,
    /// An optional note; defaults to "Internal transfer".
    pub description: Option<String>,
}

/// A completed transfer linking its debit and credit legs.
#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    /// The ID of the transfer.
    pub id: TransferId,
    /// The owner the transfer belongs to.
    pub owner_id: OwnerId,
    /// The account the money left.
    pub from_account_id: AccountId,
    /// The account the money entered.
    pub to_account_id: AccountId,
    /// The amount moved.
    pub amount: f64,
    /// The note attached to both legs.
    pub description: String,
    /// The transaction recording the debit leg.
    pub debit_transaction_id: TransactionId,
    /// The transaction recording the credit leg.
    pub credit_transaction_id: TransactionId,
}

/// Create the transfer table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transfer_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS transfer (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id INTEGER NOT NULL,
            from_account_id INTEGER NOT NULL,
            to_account_id INTEGER NOT NULL,
            amount REAL NOT NULL,
            description TEXT NOT NULL,
            debit_transaction_id INTEGER NOT NULL,
            credit_transaction_id INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(from_account_id) REFERENCES account(id),
            FOREIGN KEY(to_account_id) REFERENCES account(id),
            FOREIGN KEY(debit_transaction_id) REFERENCES \"transaction\"(id),
            FOREIGN KEY(credit_transaction_id) REFERENCES \"transaction\"(id)
            )",
        (),
    )?;

    Ok(())
}

fn map_row_to_transfer(row: &Row) -> Result<Transfer, rusqlite::Error> {
    Ok(Transfer {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        from_account_id: row.get(2)?,
        to_account_id: row.get(3)?,
        amount: row.get(4)?,
        description: row.get(5)?,
        debit_transaction_id: row.get(6)?,
        credit_transaction_id: row.get(7)?,
    })
}

const TRANSFER_COLUMNS: &str = "id, owner_id, from_account_id, to_account_id, amount, \
     description, debit_transaction_id, credit_transaction_id";

/// Retrieve a transfer from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transfer,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_transfer(id: TransferId, connection: &Connection) -> Result<Transfer, Error> {
    let transfer = connection
        .prepare(&format!(
            "SELECT {TRANSFER_COLUMNS} FROM transfer WHERE id = :id"
        ))?
        .query_one(&[(":id", &id)], map_row_to_transfer)?;

    Ok(transfer)
}

/// Move money between two of the owner's accounts atomically.
///
/// Validation happens in a fixed order so the caller gets the most specific
/// error first: amount, distinct accounts, ownership of both accounts,
/// sufficiency. The debit then re-verifies sufficiency inside the database
/// transaction with a guarded UPDATE, so a concurrent spend between the
/// pre-check and the write still cannot overdraw the account.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] if `amount` is not positive and finite,
/// - [Error::SameAccount] if both sides name the same account,
/// - [Error::Unauthorized] if either account does not belong to `owner_id`,
/// - [Error::InsufficientFunds] if the source balance cannot cover `amount`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn execute_transfer(
    request: &TransferRequest,
    connection: &Connection,
) -> Result<Transfer, Error> {
    if !(request.amount > 0.0) || !request.amount.is_finite() {
        return Err(Error::InvalidAmount);
    }

    if request.from_account == request.to_account {
        return Err(Error::SameAccount);
    }

    // Both accounts must exist and belong to the caller. A single count
    // keeps "missing" and "not yours" indistinguishable.
    let owned_count: i64 = connection
        .prepare(
            "SELECT COUNT(id) FROM account
             WHERE owner_id = ?1 AND id IN (?2, ?3)",
        )?
        .query_one(
            (request.owner_id, request.from_account, request.to_account),
            |row| row.get(0),
        )?;

    if owned_count != 2 {
        return Err(Error::Unauthorized);
    }

    let source_balance: f64 = connection
        .prepare("SELECT balance FROM account WHERE id = :id")?
        .query_one(&[(":id", &request.from_account)], |row| row.get(0))?;

    if source_balance < request.amount {
        return Err(Error::InsufficientFunds);
    }

    let description = request
        .description
        .clone()
        .unwrap_or_else(|| "Internal transfer".to_owned());
    let today = OffsetDateTime::now_utc().date();

    let sql_transaction =
        rusqlite::Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    // Guarded debit: the WHERE clause re-checks the balance so the update
    // writes nothing if funds were spent since the pre-check.
    let debited = sql_transaction.execute(
        "UPDATE account SET balance = balance - ?1 WHERE id = ?2 AND balance >= ?1",
        (request.amount, request.from_account),
    )?;

    if debited == 0 {
        return Err(Error::InsufficientFunds);
    }

    sql_transaction.execute(
        "UPDATE account SET balance = balance + ?1 WHERE id = ?2",
        (request.amount, request.to_account),
    )?;

    let debit_leg = create_transaction(
        Transaction::build(
            request.owner_id,
            TransactionKind::Transfer,
            request.amount,
            today,
            &description,
        )
        .account_id(Some(request.from_account))
        .status(TransactionStatus::Confirmed),
        &sql_transaction,
    )?;

    let credit_leg = create_transaction(
        Transaction::build(
            request.owner_id,
            TransactionKind::Transfer,
            request.amount,
            today,
            &description,
        )
        .account_id(Some(request.to_account))
        .status(TransactionStatus::Confirmed),
        &sql_transaction,
    )?;

    let transfer = sql_transaction
        .prepare(&format!(
            "INSERT INTO transfer (owner_id, from_account_id, to_account_id, amount, \
             description, debit_transaction_id, credit_transaction_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             RETURNING {TRANSFER_COLUMNS}"
        ))?
        .query_one(
            (
                request.owner_id,
                request.from_account,
                request.to_account,
                request.amount,
                &description,
                debit_leg.id,
                credit_leg.id,
                today,
            ),
            map_row_to_transfer,
        )?;

    sql_transaction.commit()?;

    Ok(transfer)
}
