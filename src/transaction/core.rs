//! The transaction model, its builder, and the database queries that read
//! and write transaction rows.

use rusqlite::{
    Connection, Row, named_params,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use time::Date;

use crate::{
    Error,
    account::AccountId,
    category::CategoryId,
    database_id::{DatabaseId, OwnerId, TransactionId},
};

// ============================================================================
// MODELS
// ============================================================================

/// The direction of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    /// Money leaving an account.
    Expense,
    /// Money entering an account.
    Income,
    /// One leg of an internal transfer between two accounts.
    Transfer,
}

impl TransactionKind {
    /// The string stored in the database for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Expense => "expense",
            TransactionKind::Income => "income",
            TransactionKind::Transfer => "transfer",
        }
    }
}

impl ToSql for TransactionKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for TransactionKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "expense" => Ok(TransactionKind::Expense),
            "income" => Ok(TransactionKind::Income),
            "transfer" => Ok(TransactionKind::Transfer),
            other => Err(FromSqlError::Other(
                format!("unknown transaction kind {other:?}").into(),
            )),
        }
    }
}

/// Whether a transaction has settled.
///
/// Status transitions happen in the CRUD screens, not in this crate;
/// chat-originated transactions post as [TransactionStatus::Confirmed].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Recorded but not yet settled.
    Pending,
    /// Settled.
    Confirmed,
}

impl TransactionStatus {
    /// The string stored in the database for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Confirmed => "confirmed",
        }
    }
}

impl ToSql for TransactionStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for TransactionStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "pending" => Ok(TransactionStatus::Pending),
            "confirmed" => Ok(TransactionStatus::Confirmed),
            other => Err(FromSqlError::Other(
                format!("unknown transaction status {other:?}").into(),
            )),
        }
    }
}

/// The atomic unit of the ledger: money spent, earned, or moved.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The owner the transaction belongs to.
    pub owner_id: OwnerId,
    /// The direction of the transaction.
    pub kind: TransactionKind,
    /// The amount of money moved, always positive. The sign is implied by
    /// [Transaction::kind] and, for transfer legs, by which side of the
    /// transfer record the transaction sits on.
    pub amount: f64,
    /// A text description of what the transaction was for.
    pub description: String,
    /// When the transaction takes effect.
    pub date: Date,
    /// The account the transaction posts against, if any.
    pub account_id: Option<AccountId>,
    /// The credit card the transaction posts against, if any. Card rows are
    /// created by the CRUD screens only.
    pub card_id: Option<DatabaseId>,
    /// The category the transaction is classified under, if any.
    pub category_id: Option<CategoryId>,
    /// Whether the transaction has settled.
    pub status: TransactionStatus,
    /// This transaction's position in its installment group, starting at 1.
    pub installment_index: Option<u32>,
    /// The total number of installments in the group.
    pub installment_total: Option<u32>,
    /// The identifier shared by every transaction in the installment group.
    pub installment_group_id: Option<String>,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(
        owner_id: OwnerId,
        kind: TransactionKind,
        amount: f64,
        date: Date,
        description: &str,
    ) -> TransactionBuilder {
        TransactionBuilder {
            owner_id,
            kind,
            amount,
            date,
            description: description.to_owned(),
            account_id: None,
            card_id: None,
            category_id: None,
            status: TransactionStatus::Confirmed,
            installment: None,
        }
    }
}

/// A builder for creating [Transaction] instances.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionBuilder {
    /// The owner the transaction belongs to.
    pub owner_id: OwnerId,
    /// The direction of the transaction.
    pub kind: TransactionKind,
    /// The amount of money moved, always positive.
    pub amount: f64,
    /// When the transaction takes effect.
    pub date: Date,
    /// A text description of what the transaction was for.
    pub description: String,
    /// The account the transaction posts against, if any.
    pub account_id: Option<AccountId>,
    /// The credit card the transaction posts against, if any.
    pub card_id: Option<DatabaseId>,
    /// The category the transaction is classified under, if any.
    pub category_id: Option<CategoryId>,
    /// Whether the transaction has settled. Defaults to confirmed.
    pub status: TransactionStatus,
    /// Installment linkage as `(index, total, group id)`.
    pub installment: Option<(u32, u32, String)>,
}

impl TransactionBuilder {
    /// Set the account the transaction posts against.
    pub fn account_id(mut self, account_id: Option<AccountId>) -> Self {
        self.account_id = account_id;
        self
    }

    /// Set the credit card the transaction posts against.
    pub fn card_id(mut self, card_id: Option<DatabaseId>) -> Self {
        self.card_id = card_id;
        self
    }

    /// Set the category the transaction is classified under.
    pub fn category_id(mut self, category_id: Option<CategoryId>) -> Self {
        self.category_id = category_id;
        self
    }

    /// Set the settlement status.
    pub fn status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        self
    }

    /// Link the transaction into an installment group.
    pub fn installment(mut self, index: u32, total: u32, group_id: &str) -> Self {
        self.installment = Some((index, total, group_id.to_owned()));
        self
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id INTEGER NOT NULL,
                kind TEXT NOT NULL CHECK(kind IN ('expense', 'income', 'transfer')),
                amount REAL NOT NULL,
                description TEXT NOT NULL,
                date TEXT NOT NULL,
                account_id INTEGER,
                card_id INTEGER,
                category_id INTEGER,
                status TEXT NOT NULL DEFAULT 'confirmed'
                    CHECK(status IN ('pending', 'confirmed')),
                installment_index INTEGER,
                installment_total INTEGER,
                installment_group_id TEXT,
                FOREIGN KEY(account_id) REFERENCES account(id),
                FOREIGN KEY(category_id) REFERENCES category(id)
                )",
        (),
    )?;

    // Composite index used by the monthly report aggregate.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_owner_date
         ON \"transaction\"(owner_id, date);",
        (),
    )?;

    Ok(())
}

const TRANSACTION_COLUMNS: &str = "id, owner_id, kind, amount, description, date, account_id, \
     card_id, category_id, status, installment_index, installment_total, installment_group_id";

/// Map a database row to a [Transaction].
pub fn map_row_to_transaction(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        kind: row.get(2)?,
        amount: row.get(3)?,
        description: row.get(4)?,
        date: row.get(5)?,
        account_id: row.get(6)?,
        card_id: row.get(7)?,
        category_id: row.get(8)?,
        status: row.get(9)?,
        installment_index: row.get(10)?,
        installment_total: row.get(11)?,
        installment_group_id: row.get(12)?,
    })
}

/// Create a new transaction in the database from a builder.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn create_transaction(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let (installment_index, installment_total, installment_group_id) = match &builder.installment {
        Some((index, total, group_id)) => (Some(*index), Some(*total), Some(group_id.as_str())),
        None => (None, None, None),
    };

    let transaction = connection
        .prepare(&format!(
            "INSERT INTO \"transaction\" (owner_id, kind, amount, description, date, account_id, \
             card_id, category_id, status, installment_index, installment_total, \
             installment_group_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_one(
            (
                builder.owner_id,
                builder.kind,
                builder.amount,
                &builder.description,
                builder.date,
                builder.account_id,
                builder.card_id,
                builder.category_id,
                builder.status,
                installment_index,
                installment_total,
                installment_group_id,
            ),
            map_row_to_transaction,
        )?;

    Ok(transaction)
}

/// Retrieve a transaction from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE id = :id"
        ))?
        .query_one(&[(":id", &id)], map_row_to_transaction)?;

    Ok(transaction)
}

/// Get the total number of transactions in the database.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn count_transactions(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| {
            row.get(0)
        })
        .map_err(|error| error.into())
}

/// Income and expense totals for one calendar month.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlyTotals {
    /// The sum of income amounts.
    pub income: f64,
    /// The sum of expense amounts.
    pub expenses: f64,
}

/// Sum the owner's income and expense amounts from `month_start` onwards.
///
/// Transfer legs are excluded: moving money between two of the owner's own
/// accounts is neither income nor an expense.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn monthly_totals(
    owner_id: OwnerId,
    month_start: Date,
    connection: &Connection,
) -> Result<MonthlyTotals, Error> {
    let totals = connection
        .prepare(
            "SELECT
                COALESCE(SUM(CASE WHEN kind = 'income' THEN amount ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN kind = 'expense' THEN amount ELSE 0 END), 0)
             FROM \"transaction\"
             WHERE owner_id = :owner_id AND date >= :month_start",
        )?
        .query_one(
            named_params! {":owner_id": owner_id, ":month_start": month_start},
            |row| {
                Ok(MonthlyTotals {
                    income: row.get(0)?,
                    expenses: row.get(1)?,
                })
            },
        )?;

    Ok(totals)
}

// ============================================================================
// TESTS
// ============================================================================
