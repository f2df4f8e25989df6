//! Defines the account model and its database queries.

use rusqlite::{Connection, Row, named_params};
use time::{Date, OffsetDateTime};

use crate::{Error, database_id::OwnerId};

/// The ID of an account.
pub type AccountId = i64;

/// A place money sits: a bank account, a wallet, or an external account.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// The ID of the account.
    pub id: AccountId,
    /// The owner the account belongs to.
    pub owner_id: OwnerId,
    /// The display name of the account.
    pub name: String,
    /// A free-form type tag, e.g. "checking", "savings", "wallet".
    ///
    /// The vocabulary is owned by the account CRUD screens; this crate treats
    /// the tag as opaque.
    pub kind: String,
    /// The current balance in currency units.
    pub balance: f64,
    /// Whether the account is open for new postings.
    pub is_active: bool,
    /// When the account was created.
    pub created_at: Date,
}

/// Create the account table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            balance REAL NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
            )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_account_owner ON account(owner_id, created_at);",
        (),
    )?;

    Ok(())
}

/// Map a database row to an [Account].
pub fn map_row_to_account(row: &Row) -> Result<Account, rusqlite::Error> {
    let id = row.get(0)?;
    let owner_id = row.get(1)?;
    let name = row.get(2)?;
    let kind = row.get(3)?;
    let balance = row.get(4)?;
    let is_active = row.get(5)?;
    let created_at = row.get(6)?;

    Ok(Account {
        id,
        owner_id,
        name,
        kind,
        balance,
        is_active,
        created_at,
    })
}

/// Create a new account for `owner_id` with an opening `balance`.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn create_account(
    owner_id: OwnerId,
    name: &str,
    kind: &str,
    balance: f64,
    connection: &Connection,
) -> Result<Account, Error> {
    let created_at = OffsetDateTime::now_utc().date();

    let account = connection
        .prepare(
            "INSERT INTO account (owner_id, name, kind, balance, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id, owner_id, name, kind, balance, is_active, created_at",
        )?
        .query_one(
            (owner_id, name, kind, balance, created_at),
            map_row_to_account,
        )?;

    Ok(account)
}

/// Retrieve an account from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid account,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_account(id: AccountId, connection: &Connection) -> Result<Account, Error> {
    let account = connection
        .prepare(
            "SELECT id, owner_id, name, kind, balance, is_active, created_at
             FROM account WHERE id = :id",
        )?
        .query_one(&[(":id", &id)], map_row_to_account)?;

    Ok(account)
}

/// Load the small page of active accounts used as context for inbound chat
/// messages.
///
/// Accounts are ordered most-recently-created first, so the newest account
/// silently receives chat-originated postings. Ties on the creation date are
/// broken by the row ID, newest first, to keep the ordering deterministic.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn get_context_accounts(
    owner_id: OwnerId,
    limit: u32,
    connection: &Connection,
) -> Result<Vec<Account>, Error> {
    connection
        .prepare(
            "SELECT id, owner_id, name, kind, balance, is_active, created_at
             FROM account
             WHERE owner_id = :owner_id AND is_active = 1
             ORDER BY created_at DESC, id DESC
             LIMIT :limit",
        )?
        .query_map(
            named_params! {":owner_id": owner_id, ":limit": limit},
            map_row_to_account,
        )?
        .map(|maybe_account| maybe_account.map_err(Error::from))
        .collect()
}

#[cfg(test)]
mod account_tests {
    use rusqlite::Connection;

    use crate::{Error, db::initialize};

    use super::{create_account, get_account, get_context_accounts};

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    #[test]
    fn create_and_get_account() {
        let conn = get_test_connection();

        let inserted = create_account(1, "Main", "checking", 100.0, &conn).unwrap();
        let selected = get_account(inserted.id, &conn).unwrap();

        assert_eq!(inserted, selected);
        assert!(selected.is_active);
        assert_eq!(selected.balance, 100.0);
    }

    #[test]
    fn get_account_fails_with_invalid_id() {
        let conn = get_test_connection();

        let result = get_account(1337, &conn);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn context_accounts_are_newest_first() {
        let conn = get_test_connection();
        let first = create_account(1, "Old", "checking", 0.0, &conn).unwrap();
        let second = create_account(1, "New", "wallet", 0.0, &conn).unwrap();

        let accounts = get_context_accounts(1, 5, &conn).unwrap();

        assert_eq!(
            accounts.iter().map(|a| a.id).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );
    }

    #[test]
    fn context_accounts_are_capped_and_owner_scoped() {
        let conn = get_test_connection();
        for i in 0..7 {
            create_account(1, &format!("Account {i}"), "checking", 0.0, &conn).unwrap();
        }
        create_account(2, "Someone else's", "checking", 0.0, &conn).unwrap();

        let accounts = get_context_accounts(1, 5, &conn).unwrap();

        assert_eq!(accounts.len(), 5);
        assert!(accounts.iter().all(|account| account.owner_id == 1));
    }

    #[test]
    fn context_accounts_skip_inactive() {
        let conn = get_test_connection();
        let account = create_account(1, "Closed", "checking", 0.0, &conn).unwrap();
        conn.execute("UPDATE account SET is_active = 0 WHERE id = ?1", (account.id,))
            .unwrap();

        let accounts = get_context_accounts(1, 5, &conn).unwrap();

        assert!(accounts.is_empty());
    }
}
