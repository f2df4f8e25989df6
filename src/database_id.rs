//! Database ID type definitions.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseId = i64;

/// The ID of the owner that every ledger entity is scoped by.
///
/// Owners are managed by the (out of scope) user-facing app; this crate only
/// ever receives an owner ID from a channel binding or a verified bearer
/// token.
pub type OwnerId = DatabaseId;

/// The ID of a ledger transaction.
pub type TransactionId = DatabaseId;

/// The ID of a transfer record linking two transactions.
pub type TransferId = DatabaseId;
