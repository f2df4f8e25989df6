//! Maps chat-channel identifiers to ledger owners.
//!
//! A chat can post to the ledger only after the owner has bound it from the
//! app. Inactive bindings behave exactly like missing ones, so deactivating
//! the bot in the app immediately stops the chat from posting.

use rusqlite::{Connection, OptionalExtension, Row};

use crate::{Error, database_id::OwnerId};

/// A one-to-one mapping from a chat-channel identifier to an owner.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelBinding {
    /// The chat-channel identifier, stored as text.
    pub chat_id: String,
    /// The owner the chat posts as.
    pub owner_id: OwnerId,
    /// Whether the binding currently resolves.
    pub is_active: bool,
}

/// Create the channel binding table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_channel_binding_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS channel_binding (
            chat_id TEXT PRIMARY KEY,
            owner_id INTEGER NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1
            )",
        (),
    )?;

    Ok(())
}

fn map_row_to_binding(row: &Row) -> Result<ChannelBinding, rusqlite::Error> {
    Ok(ChannelBinding {
        chat_id: row.get(0)?,
        owner_id: row.get(1)?,
        is_active: row.get(2)?,
    })
}

/// Bind `chat_id` to `owner_id`, replacing any existing binding for the chat.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn bind_chat(
    chat_id: &str,
    owner_id: OwnerId,
    is_active: bool,
    connection: &Connection,
) -> Result<ChannelBinding, Error> {
    let binding = connection
        .prepare(
            "INSERT OR REPLACE INTO channel_binding (chat_id, owner_id, is_active)
             VALUES (?1, ?2, ?3)
             RETURNING chat_id, owner_id, is_active",
        )?
        .query_one((chat_id, owner_id, is_active), map_row_to_binding)?;

    Ok(binding)
}

/// Resolve `chat_id` to the bound owner.
///
/// Returns `Ok(None)` when the chat has no binding or the binding is
/// inactive; the dispatcher turns this into a "not configured" reply rather
/// than an error.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn resolve_owner(chat_id: &str, connection: &Connection) -> Result<Option<OwnerId>, Error> {
    let owner_id = connection
        .prepare(
            "SELECT owner_id FROM channel_binding
             WHERE chat_id = :chat_id AND is_active = 1",
        )?
        .query_one(&[(":chat_id", &chat_id)], |row| row.get(0))
        .optional()?;

    Ok(owner_id)
}
