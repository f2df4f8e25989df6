//! Implements a struct that holds the state of the REST server.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use rusqlite::Connection;

use crate::{Error, auth::IdentityVerifier, db::initialize};

/// How long the webhook dispatcher waits for a reply before giving up and
/// answering with a generic "try again" message.
pub const DEFAULT_REPLY_DEADLINE: Duration = Duration::from_secs(5);

/// The state of the REST server.
#[derive(Clone)]
pub struct AppState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,

    /// Verifies bearer tokens on the transfer endpoint and resolves them to
    /// an owner ID.
    pub verifier: Arc<dyn IdentityVerifier>,

    /// The per-request deadline for the webhook dispatcher.
    pub reply_deadline: Duration,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for
    /// the domain models.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(
        db_connection: Connection,
        verifier: Arc<dyn IdentityVerifier>,
    ) -> Result<Self, Error> {
        initialize(&db_connection)?;

        Ok(Self {
            db_connection: Arc::new(Mutex::new(db_connection)),
            verifier,
            reply_deadline: DEFAULT_REPLY_DEADLINE,
        })
    }
}
