//! Defines the category model and its database queries.

use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};

use crate::{Error, database_id::OwnerId};

/// The ID of a category.
pub type CategoryId = i64;

/// Whether a category classifies money going out or coming in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryKind {
    /// The category classifies expenses.
    Expense,
    /// The category classifies income.
    Income,
}

impl CategoryKind {
    /// The string stored in the database for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryKind::Expense => "expense",
            CategoryKind::Income => "income",
        }
    }
}

impl ToSql for CategoryKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for CategoryKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "expense" => Ok(CategoryKind::Expense),
            "income" => Ok(CategoryKind::Income),
            other => Err(FromSqlError::Other(
                format!("unknown category kind {other:?}").into(),
            )),
        }
    }
}

/// A label with a polarity, e.g. "Alimentação" (expense) or "Salário"
/// (income).
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The owner the category belongs to.
    pub owner_id: OwnerId,
    /// The display name of the category.
    pub name: String,
    /// Whether the category is for expenses or income.
    pub kind: CategoryKind,
}

/// Create the category table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            kind TEXT NOT NULL CHECK(kind IN ('expense', 'income'))
            )",
        (),
    )?;

    Ok(())
}

/// Map a database row to a [Category].
pub fn map_row_to_category(row: &Row) -> Result<Category, rusqlite::Error> {
    let id = row.get(0)?;
    let owner_id = row.get(1)?;
    let name = row.get(2)?;
    let kind = row.get(3)?;

    Ok(Category {
        id,
        owner_id,
        name,
        kind,
    })
}

/// Create a new category for `owner_id`.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn create_category(
    owner_id: OwnerId,
    name: &str,
    kind: CategoryKind,
    connection: &Connection,
) -> Result<Category, Error> {
    let category = connection
        .prepare(
            "INSERT INTO category (owner_id, name, kind)
             VALUES (?1, ?2, ?3)
             RETURNING id, owner_id, name, kind",
        )?
        .query_one((owner_id, name, kind), map_row_to_category)?;

    Ok(category)
}

/// Retrieve all categories belonging to `owner_id`.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn get_categories(owner_id: OwnerId, connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare("SELECT id, owner_id, name, kind FROM category WHERE owner_id = :owner_id")?
        .query_map(&[(":owner_id", &owner_id)], map_row_to_category)?
        .map(|maybe_category| maybe_category.map_err(Error::from))
        .collect()
}

/// Find the first expense category whose name contains `hint`
/// (case-insensitive substring match).
///
/// This is a best-effort lookup: chat messages carry free-text category
/// hints, so no match is not an error and the caller must treat the result
/// as "uncategorized".
pub fn find_expense_category<'a>(categories: &'a [Category], hint: &str) -> Option<&'a Category> {
    let hint = hint.to_lowercase();

    categories.iter().find(|category| {
        category.kind == CategoryKind::Expense && category.name.to_lowercase().contains(&hint)
    })
}
